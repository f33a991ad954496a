use crate::index::types::DocNumber;
use rustc_hash::{FxHashMap, FxHashSet};

/// Removal state of one path, as captured by [`RemovalLog::snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRemovals {
    working: Option<DocNumber>,
    tombstoned: bool,
}

/// Removals recorded since the last merge.
///
/// A path may be removed and re-added several times within one working
/// generation; only the highest removed number matters, and every working
/// document numbered at or below it is dropped at merge time. Documents whose
/// extraction failed are dropped individually by number.
#[derive(Debug, Default)]
pub struct RemovalLog {
    in_working: FxHashMap<String, DocNumber>,
    in_durable: FxHashSet<String>,
    discarded: FxHashSet<DocNumber>,
}

impl RemovalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove working document `number` of `path`, keeping the highest number seen
    pub fn remove_working(&mut self, path: &str, number: DocNumber) {
        self.in_working
            .entry(path.to_string())
            .and_modify(|n| *n = (*n).max(number))
            .or_insert(number);
    }

    /// Tombstone the durable copy of `path`
    pub fn remove_durable(&mut self, path: &str) {
        self.in_durable.insert(path.to_string());
    }

    /// Highest working number removed for `path`
    pub fn latest_removal(&self, path: &str) -> Option<DocNumber> {
        self.in_working.get(path).copied()
    }

    /// Drop working document `number` alone, leaving older versions of its path
    pub fn discard_working(&mut self, number: DocNumber) {
        self.discarded.insert(number);
    }

    /// Whether working document `number` of `path` is superseded by a removal
    pub fn drops_working(&self, path: &str, number: DocNumber) -> bool {
        self.discarded.contains(&number)
            || self.latest_removal(path).is_some_and(|removed| number <= removed)
    }

    pub fn snapshot(&self, path: &str) -> PathRemovals {
        PathRemovals {
            working: self.latest_removal(path),
            tombstoned: self.is_tombstoned(path),
        }
    }

    /// Put the entries for `path` back to a previous [`snapshot`](Self::snapshot)
    pub fn restore(&mut self, path: &str, prior: PathRemovals) {
        match prior.working {
            Some(number) => {
                self.in_working.insert(path.to_string(), number);
            }
            None => {
                self.in_working.remove(path);
            }
        }
        if prior.tombstoned {
            self.in_durable.insert(path.to_string());
        } else {
            self.in_durable.remove(path);
        }
    }

    pub fn is_tombstoned(&self, path: &str) -> bool {
        self.in_durable.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.in_working.is_empty() && self.in_durable.is_empty() && self.discarded.is_empty()
    }

    pub fn len(&self) -> usize {
        self.in_working.len() + self.in_durable.len() + self.discarded.len()
    }

    pub fn clear(&mut self) {
        self.in_working.clear();
        self.in_durable.clear();
        self.discarded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_removal_wins() {
        let mut log = RemovalLog::new();
        log.remove_working("a.c", 3);
        log.remove_working("a.c", 1);
        assert_eq!(log.latest_removal("a.c"), Some(3));
        log.remove_working("a.c", 7);
        assert_eq!(log.latest_removal("a.c"), Some(7));
    }

    #[test]
    fn test_drops_working_up_to_latest() {
        let mut log = RemovalLog::new();
        log.remove_working("a.c", 4);
        assert!(log.drops_working("a.c", 2));
        assert!(log.drops_working("a.c", 4));
        assert!(!log.drops_working("a.c", 5));
        assert!(!log.drops_working("b.c", 1));
    }

    #[test]
    fn test_tombstones_and_clear() {
        let mut log = RemovalLog::new();
        log.remove_durable("old.c");
        log.remove_working("new.c", 1);
        assert!(log.is_tombstoned("old.c"));
        assert!(!log.is_tombstoned("new.c"));
        assert_eq!(log.len(), 2);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.latest_removal("new.c"), None);
    }

    #[test]
    fn test_discard_drops_one_number_only() {
        let mut log = RemovalLog::new();
        log.discard_working(3);
        assert!(log.drops_working("a.c", 3));
        assert!(!log.drops_working("a.c", 2));
        assert!(!log.drops_working("a.c", 4));
    }

    #[test]
    fn test_restore_undoes_later_entries() {
        let mut log = RemovalLog::new();
        log.remove_working("a.c", 2);
        let prior = log.snapshot("a.c");
        log.remove_working("a.c", 5);
        log.remove_durable("a.c");
        log.restore("a.c", prior);
        assert_eq!(log.latest_removal("a.c"), Some(2));
        assert!(!log.is_tombstoned("a.c"));

        let fresh = log.snapshot("b.c");
        log.remove_durable("b.c");
        log.restore("b.c", fresh);
        assert!(!log.is_tombstoned("b.c"));
        assert_eq!(log.latest_removal("b.c"), None);
    }
}
