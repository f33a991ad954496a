//! Error types for the index engine.
//!
//! Every fallible operation in the library returns [`Result`], whose error is
//! the [`IndexError`] enum. The binary wraps these in `anyhow` for context.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the index engine.
#[derive(Error, Debug)]
pub enum IndexError {
    /// File could not be read, written, renamed or removed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Durable file failed validation or decoding
    #[error("corrupt index file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Durable file was written by an incompatible format version
    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Wildcard pattern could not be compiled
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// Writer API used out of order (e.g. documents after postings)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Merge aborted; the previous durable file is still authoritative
    #[error("merge failed: {0}")]
    Merge(#[source] Box<IndexError>),
}

impl IndexError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// True for errors that mean the durable file itself cannot be trusted.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            IndexError::Corrupt { .. } | IndexError::UnsupportedVersion { .. }
        )
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, IndexError>;
