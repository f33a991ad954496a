use crate::error::{IndexError, Result};
use crate::index::format::{self, Header, HEADER_LEN};
use crate::index::types::{DocNumber, IncludeEdge, NO_DOCUMENT};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Sections are written strictly in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Documents,
    Words,
    Includes,
}

/// Streaming writer for a durable index file.
///
/// Documents, then postings, then dependency entries; terms within a section
/// must arrive in byte order. The header is patched on [`finish`](Self::finish).
pub struct DurableIndexWriter {
    path: PathBuf,
    file: BufWriter<File>,
    header: Header,
    hasher: crc32fast::Hasher,
    offset: u64,
    section: Section,
    last_term: Option<String>,
    scratch: Vec<u8>,
}

impl DurableIndexWriter {
    /// Create (or truncate) `path` and reserve room for the header
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&[0u8; HEADER_LEN])?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header: Header::default(),
            hasher: crc32fast::Hasher::new(),
            offset: HEADER_LEN as u64,
            section: Section::Documents,
            last_term: None,
            scratch: Vec::with_capacity(256),
        })
    }

    /// Write an index file with no documents
    pub fn create_empty(path: &Path, sync: bool) -> Result<u64> {
        Self::create(path)?.finish(sync)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_document(&mut self, number: DocNumber, path: &str) -> Result<()> {
        self.enter(Section::Documents)?;
        self.scratch.clear();
        format::encode_document(number, path, &mut self.scratch);
        self.flush_record()?;
        self.header.doc_count += 1;
        Ok(())
    }

    pub fn add_word(&mut self, term: &str, refs: &[DocNumber]) -> Result<()> {
        self.enter(Section::Words)?;
        check_refs(term, refs)?;
        self.check_order(term)?;
        self.scratch.clear();
        format::encode_word(term, refs, &mut self.scratch);
        self.flush_record()?;
        self.header.word_count += 1;
        Ok(())
    }

    pub fn add_include(
        &mut self,
        name: &str,
        refs: &[DocNumber],
        parents: &[IncludeEdge],
        children: &[IncludeEdge],
    ) -> Result<()> {
        self.enter(Section::Includes)?;
        check_refs(name, refs)?;
        self.check_order(name)?;
        self.scratch.clear();
        format::encode_include(name, refs, parents, children, &mut self.scratch);
        self.flush_record()?;
        self.header.include_count += 1;
        Ok(())
    }

    /// Patch the header, flush, and optionally fsync. Returns the file size.
    pub fn finish(mut self, sync: bool) -> Result<u64> {
        self.enter(Section::Includes)?;
        self.header.checksum = self.hasher.clone().finalize();

        self.file.flush()?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.header.encode())?;
        file.flush()?;
        if sync {
            file.sync_all()?;
        }

        Ok(self.offset)
    }

    /// Advance to `next`, recording section offsets on the way
    fn enter(&mut self, next: Section) -> Result<()> {
        if next < self.section {
            return Err(IndexError::invalid_operation(format!(
                "{:?} written after {:?}",
                next, self.section
            )));
        }
        if self.section < Section::Words && next >= Section::Words {
            self.header.words_at = self.offset;
            self.last_term = None;
        }
        if self.section < Section::Includes && next >= Section::Includes {
            self.header.includes_at = self.offset;
            self.last_term = None;
        }
        self.section = next;
        Ok(())
    }

    fn check_order(&mut self, term: &str) -> Result<()> {
        if let Some(last) = &self.last_term {
            if term <= last.as_str() {
                return Err(IndexError::invalid_operation(format!(
                    "term '{}' not after '{}'",
                    term, last
                )));
            }
        }
        self.last_term = Some(term.to_string());
        Ok(())
    }

    fn flush_record(&mut self) -> Result<()> {
        self.file.write_all(&self.scratch)?;
        self.hasher.update(&self.scratch);
        self.offset += self.scratch.len() as u64;
        Ok(())
    }
}

/// Refs are delta-encoded, so they must be strictly increasing and nonzero
fn check_refs(term: &str, refs: &[DocNumber]) -> Result<()> {
    let mut prev = NO_DOCUMENT;
    for &doc in refs {
        if doc <= prev {
            return Err(IndexError::invalid_operation(format!(
                "refs of '{}' not strictly increasing at {}",
                term, doc
            )));
        }
        prev = doc;
    }
    Ok(())
}
