//! In-memory working generation: documents, postings and dependencies added
//! since the last merge.

use crate::index::entry::TermEntry;
use crate::index::registry::{DocumentRegistry, DOCUMENT_OVERHEAD};
use crate::index::table::{DependencyTable, PostingTable};
use crate::index::types::{DocNumber, Document};

/// Mutable working set folded into the durable index on merge
#[derive(Debug, Default)]
pub struct WorkingIndex {
    documents: DocumentRegistry,
    words: PostingTable,
    includes: DependencyTable,
    /// Estimated bytes; only used to decide when a merge is due
    footprint: usize,
}

impl WorkingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, path: &str) -> Document {
        self.footprint += DOCUMENT_OVERHEAD + 2 * path.len();
        self.documents.add(path)
    }

    /// Record that `doc` contains `term`
    pub fn add_ref(&mut self, doc: DocNumber, term: &str) {
        self.footprint += self.words.add_ref(term, doc);
    }

    /// Record that `doc` includes the file `name`
    pub fn add_include_ref(&mut self, doc: DocNumber, name: &str) {
        self.footprint += self.includes.add_ref(name, doc);
    }

    /// Record the edge "`including` includes `included`" observed while
    /// extracting `doc`, on both entries.
    pub fn add_relatives(&mut self, doc: DocNumber, included: &str, including: &str) {
        let (included_id, created_included) = self.includes.entry_id(included);
        let (including_id, created_including) = self.includes.entry_id(including);
        self.footprint += created_included + created_including;

        if let Some(entry) = self.includes.get_mut(included_id) {
            self.footprint += entry.add_parent(doc, Some(including_id));
        }
        if let Some(entry) = self.includes.get_mut(including_id) {
            self.footprint += entry.add_child(doc, Some(included_id));
        }
    }

    /// Make `previous` the current document of `path` again
    pub fn revert_document(&mut self, path: &str, previous: Option<DocNumber>) {
        self.documents.revert(path, previous);
    }

    pub fn footprint(&self) -> usize {
        self.footprint
    }

    /// Drop every table and zero the footprint
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.words.is_empty() && self.includes.is_empty()
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn words(&self) -> &PostingTable {
        &self.words
    }

    pub fn includes(&self) -> &DependencyTable {
        &self.includes
    }

    pub fn get_document(&self, path: &str) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    /// Terms recorded for `doc` (linear; used by diagnostics and tests)
    pub fn terms_of(&self, doc: DocNumber) -> Vec<&str> {
        self.words
            .sorted()
            .filter(|e| e.refs().contains(doc))
            .map(|e| e.term())
            .collect()
    }
}
