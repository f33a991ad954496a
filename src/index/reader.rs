use crate::error::{IndexError, Result};
use crate::index::format::{ByteCursor, Header, IncludeRecord, WordRecord, HEADER_LEN};
use crate::index::pattern::TermMatcher;
use crate::index::types::{DocNumber, Document};
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Bytes of an opened durable file
#[derive(Debug)]
enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(map) => &map[..],
            Backing::Owned(bytes) => &bytes[..],
        }
    }
}

/// Read-only view of one durable index generation.
///
/// Each query opens its own reader; the mapping keeps the generation it was
/// opened on readable even if a merge renames a new file into place.
#[derive(Debug)]
pub struct DurableIndexReader {
    path: PathBuf,
    data: Backing,
    header: Header,
}

impl DurableIndexReader {
    /// Memory-map `path` and validate its header
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_LEN as u64 {
            return Err(IndexError::corrupt(path, "file shorter than header"));
        }

        // SAFETY: durable files are never modified in place; merges write a
        // new file and rename it over this one.
        let map = unsafe { Mmap::map(&file)? };
        Self::from_backing(path.to_path_buf(), Backing::Mapped(map))
    }

    /// Open and additionally verify the body checksum
    pub fn open_verified(path: &Path) -> Result<Self> {
        let reader = Self::open(path)?;
        reader.verify()?;
        Ok(reader)
    }

    /// Read an index held in memory (tests, fuzzing)
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_backing(PathBuf::from("<memory>"), Backing::Owned(bytes))
    }

    fn from_backing(path: PathBuf, data: Backing) -> Result<Self> {
        let header = Header::decode(&data, &path)?;
        Ok(Self { path, data, header })
    }

    /// Check the CRC32 of everything after the header
    pub fn verify(&self) -> Result<()> {
        let actual = crc32fast::hash(&self.data[HEADER_LEN..]);
        if actual != self.header.checksum {
            return Err(IndexError::corrupt(
                &self.path,
                format!(
                    "checksum mismatch (stored {:08x}, computed {:08x})",
                    self.header.checksum, actual
                ),
            ));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn num_documents(&self) -> u32 {
        self.header.doc_count
    }

    pub fn num_words(&self) -> u32 {
        self.header.word_count
    }

    pub fn num_includes(&self) -> u32 {
        self.header.include_count
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Documents in file order
    pub fn documents(&self) -> RecordCursor<'_, Document> {
        self.cursor(
            HEADER_LEN,
            self.header.words_at as usize,
            self.header.doc_count,
            ByteCursor::document,
        )
    }

    /// Postings in term order
    pub fn words(&self) -> RecordCursor<'_, WordRecord> {
        self.cursor(
            self.header.words_at as usize,
            self.header.includes_at as usize,
            self.header.word_count,
            ByteCursor::word,
        )
    }

    /// Dependency entries in name order; an entry's id is its position here
    pub fn includes(&self) -> RecordCursor<'_, IncludeRecord> {
        self.cursor(
            self.header.includes_at as usize,
            self.data.len(),
            self.header.include_count,
            ByteCursor::include,
        )
    }

    fn cursor<'a, T>(
        &'a self,
        start: usize,
        end: usize,
        count: u32,
        decode: fn(&mut ByteCursor<'a>) -> Option<T>,
    ) -> RecordCursor<'a, T> {
        RecordCursor {
            path: &self.path,
            cursor: ByteCursor::new(&self.data[..end], start),
            remaining: count,
            decode,
        }
    }

    /// Exact lookup by forward scan, stopping once past `term` in sort order
    pub fn find_word(&self, term: &str) -> Result<Option<WordRecord>> {
        Ok(self.find_words(&TermMatcher::exact(term))?.pop())
    }

    pub fn find_words(&self, matcher: &TermMatcher) -> Result<Vec<WordRecord>> {
        scan(self.words(), matcher, |r| &r.term)
    }

    pub fn find_include(&self, name: &str) -> Result<Option<IncludeRecord>> {
        Ok(self.find_includes(&TermMatcher::exact(name))?.pop())
    }

    pub fn find_includes(&self, matcher: &TermMatcher) -> Result<Vec<IncludeRecord>> {
        scan(self.includes(), matcher, |r| &r.name)
    }

    /// Linear scan of the documents section; the last match wins
    pub fn document_by_path(&self, path: &str) -> Result<Option<Document>> {
        let mut found = None;
        for doc in self.documents() {
            let doc = doc?;
            if doc.path == path {
                found = Some(doc);
            }
        }
        Ok(found)
    }

    /// Load the documents section for resolving numbers to paths
    pub fn document_table(&self) -> Result<DocumentTable> {
        let mut documents = self.documents().collect::<Result<Vec<_>>>()?;
        documents.sort_by_key(|d| d.number);
        Ok(DocumentTable { documents })
    }
}

fn scan<T, F>(records: RecordCursor<'_, T>, matcher: &TermMatcher, key: F) -> Result<Vec<T>>
where
    F: Fn(&T) -> &String,
{
    let mut selected = Vec::new();
    for record in records {
        let record = record?;
        let term = key(&record);
        if matcher.is_past(term) {
            break;
        }
        if matcher.matches(term) {
            selected.push(record);
        }
    }
    Ok(selected)
}

/// Sequential decoder over one section of a durable file
pub struct RecordCursor<'a, T> {
    path: &'a Path,
    cursor: ByteCursor<'a>,
    remaining: u32,
    decode: fn(&mut ByteCursor<'a>) -> Option<T>,
}

impl<T> Iterator for RecordCursor<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let at = self.cursor.pos();
        match (self.decode)(&mut self.cursor) {
            Some(record) => {
                self.remaining -= 1;
                Some(Ok(record))
            }
            None => {
                self.remaining = 0;
                Some(Err(IndexError::corrupt(
                    self.path,
                    format!("undecodable record at offset {}", at),
                )))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

/// Documents of one generation, addressable by number
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    documents: Vec<Document>,
}

impl DocumentTable {
    pub fn get(&self, number: DocNumber) -> Option<&Document> {
        self.documents
            .binary_search_by_key(&number, |d| d.number)
            .ok()
            .map(|i| &self.documents[i])
    }

    /// Documents for `refs`, skipping numbers with no document
    pub fn resolve(&self, refs: &[DocNumber]) -> Vec<Document> {
        refs.iter().filter_map(|&n| self.get(n)).cloned().collect()
    }

    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
