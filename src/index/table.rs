//! Hash-addressed term tables with a lazily cached sorted view.

use crate::index::entry::{IncludeEntry, TermEntry, WordEntry};
use crate::index::pattern::TermMatcher;
use crate::index::types::{DocNumber, EntryId};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Fixed per-entry bookkeeping cost (hash slot + vector slot)
const ENTRY_OVERHEAD: usize = 48;

/// Term -> posting entries
pub type PostingTable = EntryTable<WordEntry>;

/// Included file name -> dependency entries
pub type DependencyTable = EntryTable<IncludeEntry>;

/// Entries addressed by term, with stable ids in insertion order
#[derive(Debug)]
pub struct EntryTable<E> {
    entries: Vec<E>,
    ids: FxHashMap<String, EntryId>,
    /// Entry ids ordered by term; rebuilt after any insertion
    sorted: OnceLock<Vec<EntryId>>,
}

impl<E> Default for EntryTable<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ids: FxHashMap::default(),
            sorted: OnceLock::new(),
        }
    }
}

impl<E: TermEntry> EntryTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up or create the entry for `term`.
    /// Returns its id and the footprint cost of creating it (0 if it existed).
    pub fn entry_id(&mut self, term: &str) -> (EntryId, usize) {
        if let Some(&id) = self.ids.get(term) {
            return (id, 0);
        }

        let id = self.entries.len() as EntryId;
        self.entries.push(E::with_term(term));
        self.ids.insert(term.to_string(), id);
        self.sorted.take();
        (id, ENTRY_OVERHEAD + 2 * term.len())
    }

    /// Record `doc` under `term`. Returns the marginal footprint.
    pub fn add_ref(&mut self, term: &str, doc: DocNumber) -> usize {
        let (id, created) = self.entry_id(term);
        created + self.entries[id as usize].refs_mut().add_ref(doc)
    }

    /// Merge an ordered run of documents into `term`'s entry.
    pub fn add_refs(&mut self, term: &str, docs: &[DocNumber]) -> usize {
        let (id, created) = self.entry_id(term);
        created + self.entries[id as usize].refs_mut().add_refs(docs)
    }

    pub fn get(&self, id: EntryId) -> Option<&E> {
        self.entries.get(id as usize)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut E> {
        self.entries.get_mut(id as usize)
    }

    pub fn id_of(&self, term: &str) -> Option<EntryId> {
        self.ids.get(term).copied()
    }

    /// Entries in insertion (id) order
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Entries ordered by term
    pub fn sorted(&self) -> impl Iterator<Item = &E> {
        let order = self.sorted.get_or_init(|| {
            let mut order: Vec<EntryId> = (0..self.entries.len() as EntryId).collect();
            order.sort_unstable_by(|&a, &b| {
                self.entries[a as usize]
                    .term()
                    .cmp(self.entries[b as usize].term())
            });
            order
        });
        order.iter().map(|&id| &self.entries[id as usize])
    }

    pub fn find_exact(&self, term: &str) -> Option<&E> {
        self.id_of(term).and_then(|id| self.get(id))
    }

    pub fn find_prefix(&self, prefix: &str, case_sensitive: bool) -> Vec<&E> {
        self.find(&TermMatcher::prefix(prefix, case_sensitive))
    }

    /// Scan the sorted view with an already compiled matcher.
    pub fn find(&self, matcher: &TermMatcher) -> Vec<&E> {
        matcher.select(self.sorted(), |e| e.term())
    }

    /// Rewrite every entry through `remap` (old -> new | 0).
    pub fn map_refs(&mut self, remap: &[DocNumber]) {
        for entry in &mut self.entries {
            entry.refs_mut().map_refs(remap);
        }
    }

    /// Estimated bytes held by all entries
    pub fn footprint(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.footprint() + ENTRY_OVERHEAD)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ref_dedup_and_footprint() {
        let mut table = PostingTable::new();
        let first = table.add_ref("foo", 1);
        assert!(first >= ENTRY_OVERHEAD);
        assert_eq!(table.add_ref("foo", 1), 0);
        table.add_ref("foo", 2);
        table.add_ref("foo", 2);

        let entry = table.find_exact("foo").unwrap();
        assert_eq!(entry.refs().as_slice(), &[1, 2]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sorted_view_is_invalidated_by_insert() {
        let mut table = PostingTable::new();
        table.add_ref("zeta", 1);
        table.add_ref("alpha", 1);
        let terms: Vec<_> = table.sorted().map(|e| e.term().to_string()).collect();
        assert_eq!(terms, vec!["alpha", "zeta"]);

        table.add_ref("mid", 2);
        let terms: Vec<_> = table.sorted().map(|e| e.term().to_string()).collect();
        assert_eq!(terms, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_find_prefix_boundary() {
        let mut table = PostingTable::new();
        table.add_ref("foo", 1);
        table.add_ref("foobar", 2);
        table.add_ref("zzz", 3);

        let terms: Vec<_> = table
            .find_prefix("foo", true)
            .into_iter()
            .map(|e| e.term())
            .collect();
        assert_eq!(terms, vec!["foo", "foobar"]);
    }

    #[test]
    fn test_find_matching() {
        let mut table = PostingTable::new();
        for (term, doc) in [("getName", 1), ("getname", 2), ("setName", 3)] {
            table.add_ref(term, doc);
        }
        let matcher = TermMatcher::pattern("get?ame", false).unwrap();
        assert_eq!(table.find(&matcher).len(), 2);
        let matcher = TermMatcher::pattern("?etName", true).unwrap();
        assert_eq!(table.find(&matcher).len(), 2);
    }

    #[test]
    fn test_add_refs_and_map_refs() {
        let mut table = PostingTable::new();
        table.add_refs("x", &[1, 3, 5]);
        table.add_refs("x", &[2, 3]);
        assert_eq!(table.find_exact("x").unwrap().refs().as_slice(), &[1, 2, 3, 5]);

        table.map_refs(&[0, 1, 0, 2, 0, 3]);
        assert_eq!(table.find_exact("x").unwrap().refs().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_dependency_entry_ids_are_stable() {
        let mut table = DependencyTable::new();
        let (a, _) = table.entry_id("a.h");
        let (b, _) = table.entry_id("b.h");
        assert_eq!(table.entry_id("a.h").0, a);
        assert_ne!(a, b);
        assert_eq!(table.get(b).unwrap().name(), "b.h");
    }
}
