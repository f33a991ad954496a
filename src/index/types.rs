use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Number of a document within one index generation (1-based)
pub type DocNumber = u32;

/// Position of an entry within a posting or dependency table
pub type EntryId = u32;

/// Sentinel meaning "no document" or "removed"
pub const NO_DOCUMENT: DocNumber = 0;

/// An indexed source file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    pub path: String,
    pub number: DocNumber,
}

impl Document {
    pub fn new(path: impl Into<String>, number: DocNumber) -> Self {
        Self {
            path: path.into(),
            number,
        }
    }
}

/// Whether the working index holds changes that a merge would fold in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeState {
    #[default]
    Merged,
    CanMerge,
}

/// One directed include edge as seen from one side of the relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeEdge {
    /// Document whose extraction recorded the edge
    pub document: DocNumber,
    /// Entry on the other end of the edge, if it is known
    pub counterpart: Option<EntryId>,
}

impl IncludeEdge {
    pub fn new(document: DocNumber, counterpart: Option<EntryId>) -> Self {
        Self {
            document,
            counterpart,
        }
    }
}

/// Exact query hit: one document holding one term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHit {
    pub path: String,
    pub term: String,
}

/// A term (or include name) together with the documents that hold it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub term: String,
    pub documents: Vec<Document>,
}

impl IndexEntry {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.path.as_str())
    }

    pub fn numbers(&self) -> impl Iterator<Item = DocNumber> + '_ {
        self.documents.iter().map(|d| d.number)
    }
}

/// Emitted when a corrupt durable file was discarded and reinitialized
#[derive(Debug, Clone)]
pub struct RecoveryEvent {
    pub path: PathBuf,
    pub reason: String,
    pub at: SystemTime,
}

/// Summary of the durable generation plus pending working state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub path: PathBuf,
    pub version: u32,
    pub documents: u32,
    pub words: u32,
    pub includes: u32,
    pub size_bytes: u64,
    /// Documents added since the last merge
    pub pending_documents: usize,
    pub footprint: usize,
}

/// Configuration for one index instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Estimated working-set bytes at which a merge is triggered
    pub max_footprint: usize,
    /// Replace a corrupt durable file with an empty one instead of failing
    pub recover_corrupt: bool,
    /// Check the durable file's checksum when the index is opened
    pub verify_on_open: bool,
    /// fsync the new durable file before it replaces the old one
    pub sync_on_merge: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_footprint: 10_000_000,
            recover_corrupt: true,
            verify_on_open: true,
            sync_on_merge: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: IndexConfig = serde_json::from_str(r#"{"max_footprint": 1024}"#).unwrap();
        assert_eq!(config.max_footprint, 1024);
        assert!(config.recover_corrupt);
        assert!(config.verify_on_open);
        assert!(config.sync_on_merge);
    }

    #[test]
    fn test_merge_state_starts_merged() {
        assert_eq!(MergeState::default(), MergeState::Merged);
    }
}
