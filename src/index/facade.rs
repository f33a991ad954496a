//! The public index surface: writes go to the working generation, queries
//! read the durable file, and a small state machine decides when to merge.

use crate::error::Result;
use crate::index::format::IncludeRecord;
use crate::index::merge::{self, MergeSummary};
use crate::index::pattern::TermMatcher;
use crate::index::reader::DurableIndexReader;
use crate::index::removal::RemovalLog;
use crate::index::types::{
    DocNumber, Document, IndexConfig, IndexEntry, IndexStats, MergeState, QueryHit,
    RecoveryEvent,
};
use crate::index::working::WorkingIndex;
use crate::index::writer::DurableIndexWriter;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Writes one document's terms and dependencies into the working index
pub trait Extractor {
    fn extract(&self, session: &mut WriteSession<'_>) -> Result<()>;
}

impl<F> Extractor for F
where
    F: Fn(&mut WriteSession<'_>) -> Result<()>,
{
    fn extract(&self, session: &mut WriteSession<'_>) -> Result<()> {
        self(session)
    }
}

/// Handle for recording the contents of a freshly added document
pub struct WriteSession<'a> {
    working: &'a mut WorkingIndex,
    document: Document,
}

impl WriteSession<'_> {
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The document contains `term`
    pub fn add_ref(&mut self, term: &str) {
        self.working.add_ref(self.document.number, term);
    }

    /// The document includes the file `name`
    pub fn add_include_ref(&mut self, name: &str) {
        self.working.add_include_ref(self.document.number, name);
    }

    /// While extracting this document, `including` was seen to include `included`
    pub fn add_relatives(&mut self, included: &str, including: &str) {
        self.working
            .add_relatives(self.document.number, included, including);
    }
}

/// A disk-backed source index with an in-memory working generation.
///
/// Mutation needs `&mut Index`; queries only read the durable file, so
/// documents added since the last merge are invisible until [`save`](Self::save).
pub struct Index {
    path: PathBuf,
    config: IndexConfig,
    working: WorkingIndex,
    removals: RemovalLog,
    state: MergeState,
    recovery: Option<RecoveryEvent>,
}

impl Index {
    /// Open the durable file at `path`, creating an empty one if needed.
    ///
    /// A corrupt file is replaced by an empty index when
    /// `config.recover_corrupt` is set; the discarded state is reported through
    /// [`recovery`](Self::recovery).
    pub fn open(path: impl Into<PathBuf>, config: IndexConfig) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let leftover = merge::temp_path(&path);
        if leftover.is_file() {
            warn!(path = %leftover.display(), "removing leftover temporary index file");
            fs::remove_file(&leftover)?;
        }

        let recovery = Self::prepare(&path, &config)?;
        Ok(Self {
            path,
            config,
            working: WorkingIndex::new(),
            removals: RemovalLog::new(),
            state: MergeState::Merged,
            recovery,
        })
    }

    fn prepare(path: &Path, config: &IndexConfig) -> Result<Option<RecoveryEvent>> {
        if !path.exists() {
            DurableIndexWriter::create_empty(path, config.sync_on_merge)?;
            debug!(path = %path.display(), "created empty index");
            return Ok(None);
        }

        let opened = if config.verify_on_open {
            DurableIndexReader::open_verified(path)
        } else {
            DurableIndexReader::open(path)
        };

        match opened {
            Ok(reader) => {
                debug!(
                    path = %path.display(),
                    documents = reader.num_documents(),
                    words = reader.num_words(),
                    "opened index"
                );
                Ok(None)
            }
            Err(e) if e.is_corrupt() && config.recover_corrupt => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "index file is corrupt; discarding all indexed content"
                );
                fs::remove_file(path)?;
                DurableIndexWriter::create_empty(path, config.sync_on_merge)?;
                Ok(Some(RecoveryEvent {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                    at: SystemTime::now(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Register a new version of `path`, retiring any previous one
    pub fn add(&mut self, path: &str) -> WriteSession<'_> {
        self.retire(path);
        let document = self.working.add_document(path);
        self.state = MergeState::CanMerge;
        debug!(path, number = document.number, "document added");

        WriteSession {
            working: &mut self.working,
            document,
        }
    }

    /// Add `path` and let `extractor` fill in its contents, then merge if
    /// the working generation has grown past the configured footprint.
    ///
    /// If the extractor fails, the previous version of `path` stays current
    /// and the partially extracted document is never merged.
    pub fn add_document<E>(&mut self, path: &str, extractor: &E) -> Result<Document>
    where
        E: Extractor + ?Sized,
    {
        let previous = self.working.get_document(path).map(|d| d.number);
        let prior_removals = self.removals.snapshot(path);
        let prior_state = self.state;

        let mut session = self.add(path);
        let extracted = extractor.extract(&mut session);
        let document = session.document;
        if let Err(e) = extracted {
            self.working.revert_document(path, previous);
            self.removals.discard_working(document.number);
            self.removals.restore(path, prior_removals);
            self.state = prior_state;
            debug!(path, number = document.number, error = %e, "extraction failed; document discarded");
            return Err(e);
        }

        self.merge_if_needed()?;
        Ok(document)
    }

    pub fn remove(&mut self, path: &str) {
        self.retire(path);
        self.state = MergeState::CanMerge;
        debug!(path, "document removed");
    }

    /// Route the current version of `path` to the matching removal log
    fn retire(&mut self, path: &str) {
        match self.working.get_document(path) {
            Some(doc) => self.removals.remove_working(path, doc.number),
            None => self.removals.remove_durable(path),
        }
    }

    pub fn has_changed(&self) -> bool {
        self.state == MergeState::CanMerge
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Merge pending changes, if there are any
    pub fn save(&mut self) -> Result<Option<MergeSummary>> {
        if !self.has_changed() {
            return Ok(None);
        }
        self.merge().map(Some)
    }

    /// Merge once the working footprint reaches `config.max_footprint`
    pub fn merge_if_needed(&mut self) -> Result<Option<MergeSummary>> {
        if self.working.footprint() < self.config.max_footprint {
            return Ok(None);
        }
        debug!(
            footprint = self.working.footprint(),
            threshold = self.config.max_footprint,
            "footprint threshold reached"
        );
        self.merge().map(Some)
    }

    fn merge(&mut self) -> Result<MergeSummary> {
        match merge::merge(
            &self.path,
            &self.working,
            &self.removals,
            self.config.sync_on_merge,
        ) {
            Ok(summary) => {
                self.working.reset();
                self.removals.clear();
                self.state = MergeState::Merged;
                info!(
                    documents = summary.documents,
                    words = summary.words,
                    includes = summary.includes,
                    dropped = summary.dropped_documents,
                    bytes = summary.bytes,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "merged index"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "merge failed; pending changes kept");
                Err(e)
            }
        }
    }

    fn reader(&self) -> Result<DurableIndexReader> {
        DurableIndexReader::open(&self.path)
    }

    /// Documents holding exactly `term`
    pub fn query(&self, term: &str) -> Result<Vec<QueryHit>> {
        let reader = self.reader()?;
        let Some(word) = reader.find_word(term)? else {
            return Ok(Vec::new());
        };
        let table = reader.document_table()?;
        Ok(table
            .resolve(&word.refs)
            .into_iter()
            .map(|doc| QueryHit {
                path: doc.path,
                term: word.term.clone(),
            })
            .collect())
    }

    pub fn query_prefix(&self, prefix: &str, case_sensitive: bool) -> Result<Vec<IndexEntry>> {
        let reader = self.reader()?;
        let words = reader.find_words(&TermMatcher::prefix(prefix, case_sensitive))?;
        resolve_entries(&reader, words.into_iter().map(|w| (w.term, w.refs)))
    }

    /// Terms matching a glob-style wildcard pattern
    pub fn query_pattern(&self, pattern: &str, case_sensitive: bool) -> Result<Vec<IndexEntry>> {
        let matcher = TermMatcher::pattern(pattern, case_sensitive)?;
        let reader = self.reader()?;
        let words = reader.find_words(&matcher)?;
        resolve_entries(&reader, words.into_iter().map(|w| (w.term, w.refs)))
    }

    /// Documents that include the file `name`
    pub fn query_includes(&self, name: &str) -> Result<Vec<IndexEntry>> {
        let reader = self.reader()?;
        let includes = reader.find_include(name)?;
        resolve_entries(&reader, includes.into_iter().map(|r| (r.name, r.refs)))
    }

    pub fn query_include_prefix(&self, prefix: &str) -> Result<Vec<IndexEntry>> {
        let reader = self.reader()?;
        let includes = reader.find_includes(&TermMatcher::prefix(prefix, true))?;
        resolve_entries(&reader, includes.into_iter().map(|r| (r.name, r.refs)))
    }

    /// Files related to `path` through include relationships: what it
    /// includes, what includes it, and relatives recorded on its edges.
    pub fn file_dependencies(&self, path: &str) -> Result<Vec<String>> {
        let reader = self.reader()?;
        let number = reader.document_by_path(path)?.map(|d| d.number);
        let includes: Vec<IncludeRecord> = reader.includes().collect::<Result<_>>()?;

        let mut related = BTreeSet::new();
        for record in &includes {
            if number.is_some_and(|n| record.refs.binary_search(&n).is_ok()) {
                related.insert(record.name.clone());
            }
            if record.name != path {
                continue;
            }

            let table = reader.document_table()?;
            related.extend(table.resolve(&record.refs).into_iter().map(|d| d.path));
            for edge in record.parents.iter().chain(&record.children) {
                let counterpart = edge
                    .counterpart
                    .and_then(|id| includes.get(id as usize));
                if let Some(other) = counterpart {
                    related.insert(other.name.clone());
                }
            }
        }

        related.remove(path);
        Ok(related.into_iter().collect())
    }

    pub fn index_file(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Set when `open` had to discard a corrupt durable file
    pub fn recovery(&self) -> Option<&RecoveryEvent> {
        self.recovery.as_ref()
    }

    pub fn num_documents(&self) -> Result<u32> {
        Ok(self.reader()?.num_documents())
    }

    pub fn num_words(&self) -> Result<u32> {
        Ok(self.reader()?.num_words())
    }

    pub fn num_includes(&self) -> Result<u32> {
        Ok(self.reader()?.num_includes())
    }

    /// Durable documents in number order
    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.reader()?.document_table()?.all().to_vec())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let reader = self.reader()?;
        Ok(IndexStats {
            path: self.path.clone(),
            version: reader.header().version,
            documents: reader.num_documents(),
            words: reader.num_words(),
            includes: reader.num_includes(),
            size_bytes: reader.size_bytes(),
            pending_documents: self.working.num_documents(),
            footprint: self.working.footprint(),
        })
    }
}

fn resolve_entries<I>(reader: &DurableIndexReader, records: I) -> Result<Vec<IndexEntry>>
where
    I: IntoIterator<Item = (String, Vec<DocNumber>)>,
{
    let mut records = records.into_iter().peekable();
    if records.peek().is_none() {
        return Ok(Vec::new());
    }

    let table = reader.document_table()?;
    Ok(records
        .map(|(term, refs)| IndexEntry {
            documents: table.resolve(&refs),
            term,
        })
        .collect())
}
