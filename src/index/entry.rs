//! Posting and dependency entries stored in the working tables.

use crate::index::refs::RefList;
use crate::index::types::{DocNumber, EntryId, IncludeEdge, NO_DOCUMENT};
use std::mem::size_of;

const EDGE_SIZE: usize = size_of::<IncludeEdge>();

/// Common surface of the entries an [`EntryTable`](crate::index::table::EntryTable) holds
pub trait TermEntry {
    fn with_term(term: &str) -> Self;
    fn term(&self) -> &str;
    fn refs(&self) -> &RefList;
    fn refs_mut(&mut self) -> &mut RefList;

    /// Estimated heap bytes held by the entry
    fn footprint(&self) -> usize {
        self.term().len() + self.refs().footprint()
    }
}

/// Term -> documents containing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    term: String,
    refs: RefList,
}

impl TermEntry for WordEntry {
    fn with_term(term: &str) -> Self {
        Self {
            term: term.to_string(),
            refs: RefList::new(),
        }
    }

    fn term(&self) -> &str {
        &self.term
    }

    fn refs(&self) -> &RefList {
        &self.refs
    }

    fn refs_mut(&mut self) -> &mut RefList {
        &mut self.refs
    }
}

/// Included file name -> documents including it, plus include edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    name: String,
    refs: RefList,
    parents: Vec<IncludeEdge>,
    children: Vec<IncludeEdge>,
}

impl IncludeEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries including this one
    pub fn parents(&self) -> &[IncludeEdge] {
        &self.parents
    }

    /// Entries this one includes
    pub fn children(&self) -> &[IncludeEdge] {
        &self.children
    }

    /// Record that `parent` included this file while `doc` was extracted.
    /// Append-only: re-inclusion produces another edge.
    pub fn add_parent(&mut self, doc: DocNumber, parent: Option<EntryId>) -> usize {
        push_edge(&mut self.parents, IncludeEdge::new(doc, parent))
    }

    /// Record that this file included `child` while `doc` was extracted.
    pub fn add_child(&mut self, doc: DocNumber, child: Option<EntryId>) -> usize {
        push_edge(&mut self.children, IncludeEdge::new(doc, child))
    }

    /// Rewrite edge documents through `remap`, dropping edges of removed documents.
    pub fn map_edges(&mut self, remap: &[DocNumber]) {
        remap_edges(&mut self.parents, remap);
        remap_edges(&mut self.children, remap);
    }

    pub fn has_edges(&self) -> bool {
        !self.parents.is_empty() || !self.children.is_empty()
    }
}

impl TermEntry for IncludeEntry {
    fn with_term(term: &str) -> Self {
        Self {
            name: term.to_string(),
            refs: RefList::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    fn term(&self) -> &str {
        &self.name
    }

    fn refs(&self) -> &RefList {
        &self.refs
    }

    fn refs_mut(&mut self) -> &mut RefList {
        &mut self.refs
    }

    fn footprint(&self) -> usize {
        self.name.len()
            + self.refs.footprint()
            + (self.parents.capacity() + self.children.capacity()) * EDGE_SIZE
    }
}

fn push_edge(edges: &mut Vec<IncludeEdge>, edge: IncludeEdge) -> usize {
    let before = edges.capacity();
    edges.push(edge);
    (edges.capacity() - before) * EDGE_SIZE
}

pub(crate) fn remap_edges(edges: &mut Vec<IncludeEdge>, remap: &[DocNumber]) {
    for edge in edges.iter_mut() {
        edge.document = remap
            .get(edge.document as usize)
            .copied()
            .unwrap_or(NO_DOCUMENT);
    }
    edges.retain(|e| e.document != NO_DOCUMENT);
}
