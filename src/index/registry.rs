use crate::index::types::{DocNumber, Document};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Fixed per-document bookkeeping cost used for footprint estimates
pub const DOCUMENT_OVERHEAD: usize = 40;

/// Assigns document numbers for paths within one working generation.
///
/// Adding a path twice yields a second number; the first document stays in
/// [`all`](Self::all). Removing superseded documents is the facade's job.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
    /// path -> latest number assigned to it
    by_path: FxHashMap<String, DocNumber>,
    /// Indices into `documents` ordered by path; rebuilt after any add
    sorted: OnceLock<Vec<usize>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under the next unused number
    pub fn add(&mut self, path: &str) -> Document {
        let number = self.documents.len() as DocNumber + 1;
        let doc = Document::new(path, number);
        self.documents.push(doc.clone());
        self.by_path.insert(path.to_string(), number);
        self.sorted.take();
        doc
    }

    /// Latest document registered for `path`
    pub fn get(&self, path: &str) -> Option<&Document> {
        self.by_path
            .get(path)
            .and_then(|&number| self.get_by_number(number))
    }

    /// Point `path` back at an earlier number, or at nothing. The newer
    /// documents stay in [`all`](Self::all).
    pub fn revert(&mut self, path: &str, previous: Option<DocNumber>) {
        match previous {
            Some(number) => {
                self.by_path.insert(path.to_string(), number);
            }
            None => {
                self.by_path.remove(path);
            }
        }
    }

    pub fn get_by_number(&self, number: DocNumber) -> Option<&Document> {
        number
            .checked_sub(1)
            .and_then(|i| self.documents.get(i as usize))
    }

    /// All documents in number order
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// All documents ordered by path (ties by number)
    pub fn sorted(&self) -> impl Iterator<Item = &Document> {
        let order = self.sorted.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.documents.len()).collect();
            order.sort_by(|&a, &b| {
                let (a, b) = (&self.documents[a], &self.documents[b]);
                a.path.cmp(&b.path).then(a.number.cmp(&b.number))
            });
            order
        });
        order.iter().map(|&i| &self.documents[i])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Highest number assigned so far (0 when empty)
    pub fn max_number(&self) -> DocNumber {
        self.documents.len() as DocNumber
    }
}
