//! Sorted, deduplicated document reference lists.
//!
//! Capacity grows 1 -> 4 -> 8 -> 16 -> ... so the common append (a strictly
//! larger number at the tail) is amortized O(1). Every mutation reports the
//! number of bytes it newly reserved, which feeds the working index footprint.

use crate::index::types::{DocNumber, NO_DOCUMENT};
use std::mem::size_of;

const REF_SIZE: usize = size_of::<DocNumber>();

#[inline]
fn next_capacity(current: usize) -> usize {
    match current {
        0 => 1,
        1 => 4,
        n => n * 2,
    }
}

/// Ordered set of document numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefList {
    refs: Vec<DocNumber>,
}

impl RefList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a list that is already strictly increasing and free of zeros.
    pub fn from_sorted(refs: Vec<DocNumber>) -> Self {
        debug_assert!(refs.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(!refs.contains(&NO_DOCUMENT));
        Self { refs }
    }

    pub fn as_slice(&self) -> &[DocNumber] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.refs.capacity()
    }

    pub fn contains(&self, doc: DocNumber) -> bool {
        self.refs.binary_search(&doc).is_ok()
    }

    /// Estimated heap bytes held by this list
    pub fn footprint(&self) -> usize {
        self.refs.capacity() * REF_SIZE
    }

    /// Add one document. Returns the bytes newly reserved (0 when no growth).
    pub fn add_ref(&mut self, doc: DocNumber) -> usize {
        if doc == NO_DOCUMENT {
            return 0;
        }

        let insert_at = match self.refs.last() {
            Some(&last) if last == doc => return 0,
            Some(&last) if last > doc => match self.refs.binary_search(&doc) {
                Ok(_) => return 0,
                Err(pos) => pos,
            },
            _ => self.refs.len(),
        };

        let grown = self.reserve_one();
        self.refs.insert(insert_at, doc);
        grown
    }

    fn reserve_one(&mut self) -> usize {
        let before = self.refs.capacity();
        if self.refs.len() < before {
            return 0;
        }
        let target = next_capacity(before);
        self.refs.reserve_exact(target - self.refs.len());
        (self.refs.capacity() - before) * REF_SIZE
    }

    /// Merge an ordered sequence into this list, dropping zeros and duplicates.
    ///
    /// `other` must be sorted ascending; zeros may appear anywhere.
    pub fn add_refs(&mut self, other: &[DocNumber]) -> usize {
        if other.is_empty() {
            return 0;
        }

        let before = self.refs.capacity();
        let mut merged = Vec::with_capacity(self.refs.len() + other.len());
        let (mut i, mut j) = (0, 0);

        while i < self.refs.len() || j < other.len() {
            let next = match (self.refs.get(i), other.get(j)) {
                (Some(&a), Some(&b)) if a <= b => {
                    i += 1;
                    if a == b {
                        j += 1;
                    }
                    a
                }
                (Some(_), Some(&b)) => {
                    j += 1;
                    b
                }
                (Some(&a), None) => {
                    i += 1;
                    a
                }
                (None, Some(&b)) => {
                    j += 1;
                    b
                }
                (None, None) => break,
            };
            if next != NO_DOCUMENT && merged.last() != Some(&next) {
                merged.push(next);
            }
        }

        self.refs = merged;
        self.refs.capacity().saturating_sub(before) * REF_SIZE
    }

    /// Rewrite every reference through `remap` (old -> new | 0).
    ///
    /// Numbers outside the table or mapped to 0 are dropped. The result is
    /// re-sorted, deduplicated and shrunk to its exact size.
    pub fn map_refs(&mut self, remap: &[DocNumber]) {
        for r in self.refs.iter_mut() {
            *r = remap.get(*r as usize).copied().unwrap_or(NO_DOCUMENT);
        }
        self.refs.retain(|&r| r != NO_DOCUMENT);
        self.refs.sort_unstable();
        self.refs.dedup();
        self.refs.shrink_to_fit();
    }

    pub fn into_vec(self) -> Vec<DocNumber> {
        self.refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_growth_sequence() {
        let mut refs = RefList::new();
        let mut capacities = Vec::new();
        for doc in 1..=17 {
            refs.add_ref(doc);
            capacities.push(refs.capacity());
        }
        assert!(capacities[0] >= 1);
        assert!(capacities[1] >= 4);
        assert!(capacities[4] >= 8);
        assert!(capacities[8] >= 16);
        assert!(capacities[16] >= 32);
    }

    #[test]
    fn test_add_ref_reports_growth_only_on_realloc() {
        let mut refs = RefList::new();
        assert!(refs.add_ref(1) > 0);
        assert!(refs.add_ref(2) > 0); // 1 -> 4
        assert_eq!(refs.add_ref(3), 0);
        assert_eq!(refs.add_ref(4), 0);
        assert!(refs.add_ref(5) > 0); // 4 -> 8
    }

    #[test]
    fn test_repeated_refs_are_stored_once() {
        let mut refs = RefList::new();
        for doc in [3, 3, 3, 5, 5, 3, 1, 5, 1] {
            refs.add_ref(doc);
        }
        assert_eq!(refs.as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn test_zero_is_ignored() {
        let mut refs = RefList::new();
        assert_eq!(refs.add_ref(NO_DOCUMENT), 0);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_add_refs_linear_merge() {
        let mut refs = RefList::from_sorted(vec![1, 4, 9]);
        refs.add_refs(&[0, 2, 4, 10, 0]);
        assert_eq!(refs.as_slice(), &[1, 2, 4, 9, 10]);
    }

    #[test]
    fn test_add_refs_into_empty() {
        let mut refs = RefList::new();
        refs.add_refs(&[2, 2, 7]);
        assert_eq!(refs.as_slice(), &[2, 7]);
    }

    #[test]
    fn test_map_refs_drops_removed_and_resorts() {
        let mut refs = RefList::from_sorted(vec![1, 2, 3, 4]);
        // 1 -> 3, 2 -> removed, 3 -> 1, 4 -> 3 (collides with 1)
        let remap = [0, 3, 0, 1, 3];
        refs.map_refs(&remap);
        assert_eq!(refs.as_slice(), &[1, 3]);
        assert_eq!(refs.capacity(), 2);
    }

    #[test]
    fn test_map_refs_out_of_range_is_dropped() {
        let mut refs = RefList::from_sorted(vec![1, 8]);
        refs.map_refs(&[0, 5]);
        assert_eq!(refs.as_slice(), &[5]);
    }
}
