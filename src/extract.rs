//! Built-in extractor used by the command-line front end: identifier tokens
//! plus `#include`/`#import`/`import` lines.

use crate::error::{IndexError, Result};
use crate::index::facade::{Extractor, WriteSession};
use crate::utils::{extract_identifiers, is_binary};
use regex::Regex;

const INCLUDE_PATTERN: &str =
    r#"(?m)^[ \t]*(?:#[ \t]*(?:include|import)[ \t]*[<"]([^>"\r\n]+)[>"]|import[ \t]+["']([^"'\r\n]+)["'])"#;

/// Terms and dependencies of one file, computed off the writer thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Path relative to the indexed root, with `/` separators
    pub path: String,
    pub identifiers: Vec<String>,
    pub includes: Vec<String>,
}

impl Extractor for ExtractedFile {
    fn extract(&self, session: &mut WriteSession<'_>) -> Result<()> {
        for ident in &self.identifiers {
            session.add_ref(ident);
        }
        for name in &self.includes {
            session.add_include_ref(name);
            session.add_relatives(name, &self.path);
        }
        Ok(())
    }
}

/// Scans source text for identifiers and include directives
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    include_re: Regex,
}

impl SourceExtractor {
    pub fn new() -> Result<Self> {
        let include_re = Regex::new(INCLUDE_PATTERN).map_err(|e| IndexError::Pattern {
            pattern: INCLUDE_PATTERN.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { include_re })
    }

    /// Extract from raw file bytes; binary or non-UTF-8 content yields `None`
    pub fn extract_bytes(&self, path: &str, content: &[u8]) -> Option<ExtractedFile> {
        if is_binary(content) {
            return None;
        }
        let text = std::str::from_utf8(content).ok()?;
        Some(self.extract_text(path, text))
    }

    pub fn extract_text(&self, path: &str, text: &str) -> ExtractedFile {
        let mut identifiers: Vec<String> = extract_identifiers(text).into_iter().collect();
        identifiers.sort_unstable();

        let mut includes: Vec<String> = self
            .include_re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        includes.sort_unstable();
        includes.dedup();

        ExtractedFile {
            path: path.to_string(),
            identifiers,
            includes,
        }
    }
}
