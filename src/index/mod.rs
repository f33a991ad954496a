pub mod build;
pub mod entry;
pub mod facade;
pub mod format;
pub mod merge;
pub mod pattern;
pub mod reader;
pub mod refs;
pub mod registry;
pub mod removal;
pub mod stats;
pub mod table;
pub mod types;
pub mod working;
pub mod writer;

pub use facade::{Extractor, Index, WriteSession};
pub use merge::MergeSummary;
pub use reader::DurableIndexReader;
pub use types::*;
pub use writer::DurableIndexWriter;
