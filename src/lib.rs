//! # srcdex - incremental source index
//!
//! srcdex records, per source file, which identifiers it contains and which
//! files it includes, and answers exact, prefix and wildcard lookups against
//! that corpus.
//!
//! ## Architecture
//!
//! Writes land in an in-memory working generation; once it grows past a
//! footprint threshold (or on [`Index::save`](index::Index::save)) it is
//! merged with the on-disk durable file into a new durable file that replaces
//! the old one atomically. Queries only ever read the durable file.
//!
//! - [`index`] - Working index, durable format, merge engine and the facade
//! - [`extract`] - Built-in identifier and include extractor
//! - [`output`] - Result formatting
//! - [`utils`] - Encoding, tokenizing, app data directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use srcdex::index::{Index, IndexConfig, WriteSession};
//!
//! let mut index = Index::open("/tmp/demo.sdx", IndexConfig::default())?;
//! index.add_document("src/main.c", &|s: &mut WriteSession<'_>| -> srcdex::Result<()> {
//!     s.add_ref("main");
//!     s.add_include_ref("util.h");
//!     Ok(())
//! })?;
//! index.save()?;
//!
//! for hit in index.query("main")? {
//!     println!("{}", hit.path);
//! }
//! # Ok::<(), srcdex::error::IndexError>(())
//! ```

pub mod error;
pub mod extract;
pub mod index;
pub mod output;
pub mod utils;

pub use error::{IndexError, Result};
pub use index::{Index, IndexConfig};
