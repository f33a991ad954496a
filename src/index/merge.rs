//! Folding the working generation and removal logs into a new durable file.
//!
//! The new generation is written to `<index>.tmp` and renamed over the
//! durable file only after it is complete and flushed. Any failure before the
//! rename removes the temporary file and leaves the old generation untouched.

use crate::error::{IndexError, Result};
use crate::index::entry::TermEntry;
use crate::index::format::IncludeRecord;
use crate::index::reader::DurableIndexReader;
use crate::index::refs::RefList;
use crate::index::removal::RemovalLog;
use crate::index::types::{DocNumber, EntryId, IncludeEdge, NO_DOCUMENT};
use crate::index::working::WorkingIndex;
use crate::index::writer::DurableIndexWriter;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a merge produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub documents: u32,
    pub words: u32,
    pub includes: u32,
    pub dropped_documents: u32,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Temporary file a merge writes before the swap
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Merge `working` and the durable file at `target` into a new generation
/// that replaces `target`.
pub fn merge(
    target: &Path,
    working: &WorkingIndex,
    removals: &RemovalLog,
    sync: bool,
) -> Result<MergeSummary> {
    let start = Instant::now();
    let tmp = temp_path(target);

    let mut summary = match build(target, &tmp, working, removals, sync) {
        Ok(summary) => summary,
        Err(e) => {
            discard(&tmp);
            return Err(IndexError::Merge(Box::new(e)));
        }
    };

    if let Err(e) = install(&tmp, target) {
        discard(&tmp);
        return Err(IndexError::Merge(Box::new(e.into())));
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Write the new generation to `tmp`. The durable reader is dropped on return
/// so platforms that forbid renaming over an open file can swap afterwards.
fn build(
    target: &Path,
    tmp: &Path,
    working: &WorkingIndex,
    removals: &RemovalLog,
    sync: bool,
) -> Result<MergeSummary> {
    let durable = if target.exists() {
        Some(DurableIndexReader::open(target)?)
    } else {
        None
    };
    write_generation(durable.as_ref(), working, removals, tmp, sync)
}

fn install(tmp: &Path, target: &Path) -> io::Result<()> {
    #[cfg(windows)]
    if target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(tmp, target)
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "could not remove temporary index file");
        }
    }
}

fn write_generation(
    durable: Option<&DurableIndexReader>,
    working: &WorkingIndex,
    removals: &RemovalLog,
    tmp: &Path,
    sync: bool,
) -> Result<MergeSummary> {
    let mut writer = DurableIndexWriter::create(tmp)?;
    let mut summary = MergeSummary::default();
    let mut next: DocNumber = 1;

    // Documents: durable generation first, then the working one
    let mut durable_remap = vec![NO_DOCUMENT; durable.map_or(0, |r| r.num_documents()) as usize + 1];
    if let Some(reader) = durable {
        for doc in reader.documents() {
            let doc = doc?;
            if doc.number == NO_DOCUMENT || doc.number as usize >= durable_remap.len() {
                return Err(IndexError::corrupt(
                    reader.path(),
                    format!("document number {} out of range", doc.number),
                ));
            }
            if removals.is_tombstoned(&doc.path) {
                summary.dropped_documents += 1;
                continue;
            }
            writer.add_document(next, &doc.path)?;
            durable_remap[doc.number as usize] = next;
            next += 1;
        }
    }

    let mut working_remap = vec![NO_DOCUMENT; working.documents().max_number() as usize + 1];
    for doc in working.documents().all() {
        if removals.drops_working(&doc.path, doc.number) {
            summary.dropped_documents += 1;
            continue;
        }
        writer.add_document(next, &doc.path)?;
        working_remap[doc.number as usize] = next;
        next += 1;
    }
    summary.documents = next - 1;
    debug!(
        documents = summary.documents,
        dropped = summary.dropped_documents,
        "merge: documents renumbered"
    );

    // Postings
    let durable_words = durable.map(|r| r.words()).into_iter().flatten();
    merge_sorted(
        durable_words,
        working.words().sorted(),
        |w| w.term.as_str(),
        |e| e.term(),
        |side| {
            let (on_disk, in_memory) = side.into_parts();
            let term = match (&on_disk, in_memory) {
                (Some(w), _) => w.term.as_str(),
                (None, Some(e)) => e.term(),
                (None, None) => return Ok(()),
            };

            let mut refs = RefList::new();
            if let Some(w) = &on_disk {
                refs.add_refs(remapped(&w.refs, &durable_remap).as_slice());
            }
            if let Some(e) = in_memory {
                refs.add_refs(remapped(e.refs().as_slice(), &working_remap).as_slice());
            }
            if refs.is_empty() {
                return Ok(());
            }

            writer.add_word(term, refs.as_slice())?;
            summary.words += 1;
            Ok(())
        },
    )?;
    debug!(words = summary.words, "merge: postings written");

    // Dependency entries. Counterpart ids point at positions in the new
    // sorted sequence, so the merged entries are collected before writing.
    let durable_includes: Vec<IncludeRecord> = match durable {
        Some(reader) => reader.includes().collect::<Result<_>>()?,
        None => Vec::new(),
    };
    let durable_name = |id: Option<EntryId>| {
        id.and_then(|i| durable_includes.get(i as usize))
            .map(|r| r.name.as_str())
    };
    let working_name = |id: Option<EntryId>| {
        id.and_then(|i| working.includes().get(i))
            .map(|e| e.name())
    };

    let mut pending: Vec<PendingInclude<'_>> = Vec::new();
    merge_sorted(
        durable_includes.iter().map(Ok),
        working.includes().sorted(),
        |r| r.name.as_str(),
        |e| e.name(),
        |side| {
            let (on_disk, in_memory) = side.into_parts();
            let name = match (on_disk, in_memory) {
                (Some(r), _) => r.name.as_str(),
                (None, Some(e)) => e.name(),
                (None, None) => return Ok(()),
            };

            let mut entry = PendingInclude::new(name);
            if let Some(r) = on_disk {
                entry.absorb(&r.refs, &r.parents, &r.children, &durable_remap, &durable_name);
            }
            if let Some(e) = in_memory {
                entry.absorb(
                    e.refs().as_slice(),
                    e.parents(),
                    e.children(),
                    &working_remap,
                    &working_name,
                );
            }
            if !entry.refs.is_empty() || entry.has_edges() {
                pending.push(entry);
            }
            Ok(())
        },
    )?;

    let ids: FxHashMap<&str, EntryId> = pending
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name, i as EntryId))
        .collect();
    let resolve = |edges: &[PendingEdge<'_>]| -> Vec<IncludeEdge> {
        edges
            .iter()
            .map(|e| {
                IncludeEdge::new(e.document, e.counterpart.and_then(|n| ids.get(n).copied()))
            })
            .collect()
    };
    for entry in &pending {
        writer.add_include(
            entry.name,
            entry.refs.as_slice(),
            &resolve(&entry.parents),
            &resolve(&entry.children),
        )?;
        summary.includes += 1;
    }
    debug!(includes = summary.includes, "merge: dependency entries written");

    summary.bytes = writer.finish(sync)?;
    Ok(summary)
}

/// `refs` rewritten through `table`, sorted, without removed documents
fn remapped(refs: &[DocNumber], table: &[DocNumber]) -> RefList {
    let mut list = RefList::new();
    list.add_refs(refs);
    list.map_refs(table);
    list
}

/// Include edge whose counterpart is identified by name until ids are final
struct PendingEdge<'a> {
    document: DocNumber,
    counterpart: Option<&'a str>,
}

struct PendingInclude<'a> {
    name: &'a str,
    refs: RefList,
    parents: Vec<PendingEdge<'a>>,
    children: Vec<PendingEdge<'a>>,
}

impl<'a> PendingInclude<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            refs: RefList::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    fn absorb<F>(
        &mut self,
        refs: &[DocNumber],
        parents: &[IncludeEdge],
        children: &[IncludeEdge],
        table: &[DocNumber],
        name_of: &F,
    ) where
        F: Fn(Option<EntryId>) -> Option<&'a str>,
    {
        self.refs.add_refs(remapped(refs, table).as_slice());
        pending_edges(&mut self.parents, parents, table, name_of);
        pending_edges(&mut self.children, children, table, name_of);
    }

    fn has_edges(&self) -> bool {
        !self.parents.is_empty() || !self.children.is_empty()
    }
}

fn pending_edges<'a, F>(
    out: &mut Vec<PendingEdge<'a>>,
    edges: &[IncludeEdge],
    table: &[DocNumber],
    name_of: &F,
) where
    F: Fn(Option<EntryId>) -> Option<&'a str>,
{
    for edge in edges {
        let document = table
            .get(edge.document as usize)
            .copied()
            .unwrap_or(NO_DOCUMENT);
        if document != NO_DOCUMENT {
            out.push(PendingEdge {
                document,
                counterpart: name_of(edge.counterpart),
            });
        }
    }
}

/// One key of a merge-join: present on the left, the right, or both
enum Side<L, R> {
    Left(L),
    Right(R),
    Both(L, R),
}

impl<L, R> Side<L, R> {
    fn into_parts(self) -> (Option<L>, Option<R>) {
        match self {
            Side::Left(l) => (Some(l), None),
            Side::Right(r) => (None, Some(r)),
            Side::Both(l, r) => (Some(l), Some(r)),
        }
    }
}

/// Walk two key-ordered sequences together, emitting each key once.
fn merge_sorted<L, R, LI, RI, LK, RK, E>(
    left: LI,
    right: RI,
    left_key: LK,
    right_key: RK,
    mut emit: E,
) -> Result<()>
where
    LI: IntoIterator<Item = Result<L>>,
    RI: IntoIterator<Item = R>,
    LK: Fn(&L) -> &str,
    RK: Fn(&R) -> &str,
    E: FnMut(Side<L, R>) -> Result<()>,
{
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    let mut l = left.next().transpose()?;
    let mut r = right.next();

    loop {
        match (l.take(), r.take()) {
            (None, None) => return Ok(()),
            (Some(a), None) => {
                emit(Side::Left(a))?;
                l = left.next().transpose()?;
            }
            (None, Some(b)) => {
                emit(Side::Right(b))?;
                r = right.next();
            }
            (Some(a), Some(b)) => match left_key(&a).cmp(right_key(&b)) {
                Ordering::Less => {
                    emit(Side::Left(a))?;
                    l = left.next().transpose()?;
                    r = Some(b);
                }
                Ordering::Greater => {
                    emit(Side::Right(b))?;
                    r = right.next();
                    l = Some(a);
                }
                Ordering::Equal => {
                    emit(Side::Both(a, b))?;
                    l = left.next().transpose()?;
                    r = right.next();
                }
            },
        }
    }
}
