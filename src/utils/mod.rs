//! Utility functions shared by the engine and the command-line front end.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory, config and per-root metadata
//! - [`encoding`] - Varint, delta and fixed-width integer encoding
//! - [`progress`] - Progress bars (no-op without the `progress` feature)
//! - [`tokenizer`] - Identifier extraction and binary sniffing
//!
//! ```no_run
//! use srcdex::utils::extract_identifiers;
//!
//! let idents = extract_identifiers("int getUserById(int id);");
//! assert!(idents.contains("getUserById"));
//! ```

pub mod app_data;
pub mod encoding;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use encoding::*;
pub use tokenizer::*;
