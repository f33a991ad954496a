//! Term matching for exact, prefix and wildcard lookups.
//!
//! Tables and the durable file both keep terms in byte order, so a
//! case-sensitive scan can stop as soon as it passes the last term that could
//! possibly match. Case-insensitive scans have no such boundary.

use crate::error::{IndexError, Result};
use globset::{GlobBuilder, GlobMatcher};

/// Characters that start a wildcard construct in a pattern
const WILDCARD_CHARS: &[char] = &['*', '?', '[', '{', '\\'];

/// Compiled lookup predicate
#[derive(Debug, Clone)]
pub enum TermMatcher {
    Exact(String),
    Prefix {
        prefix: String,
        case_sensitive: bool,
    },
    /// Glob syntax: `*`, `?`, `[abc]`, `[a-z]`, `{a,b}`
    Pattern {
        glob: GlobMatcher,
        literal: String,
        case_sensitive: bool,
    },
}

impl TermMatcher {
    pub fn exact(term: &str) -> Self {
        TermMatcher::Exact(term.to_string())
    }

    pub fn prefix(prefix: &str, case_sensitive: bool) -> Self {
        let prefix = if case_sensitive {
            prefix.to_string()
        } else {
            prefix.to_lowercase()
        };
        TermMatcher::Prefix {
            prefix,
            case_sensitive,
        }
    }

    pub fn pattern(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| IndexError::Pattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?
            .compile_matcher();

        Ok(TermMatcher::Pattern {
            glob,
            literal: literal_prefix(pattern).to_string(),
            case_sensitive,
        })
    }

    pub fn matches(&self, term: &str) -> bool {
        match self {
            TermMatcher::Exact(t) => term == t,
            TermMatcher::Prefix {
                prefix,
                case_sensitive: true,
            } => term.starts_with(prefix.as_str()),
            TermMatcher::Prefix { prefix, .. } => term.to_lowercase().starts_with(prefix.as_str()),
            TermMatcher::Pattern { glob, .. } => glob.is_match(term),
        }
    }

    /// True once a byte-ordered scan has moved past every possible match.
    pub fn is_past(&self, term: &str) -> bool {
        match self {
            TermMatcher::Exact(t) => term > t.as_str(),
            TermMatcher::Prefix {
                prefix,
                case_sensitive: true,
            } => past_literal(term, prefix),
            TermMatcher::Pattern {
                literal,
                case_sensitive: true,
                ..
            } => !literal.is_empty() && past_literal(term, literal),
            _ => false,
        }
    }

    /// Keep the items whose key matches, stopping at the sort boundary.
    pub fn select<T, I, F>(&self, sorted: I, key: F) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> &str,
    {
        let mut selected = Vec::new();
        for item in sorted {
            let term = key(&item);
            if self.is_past(term) {
                break;
            }
            if self.matches(term) {
                selected.push(item);
            }
        }
        selected
    }
}

#[inline]
fn past_literal(term: &str, literal: &str) -> bool {
    term > literal && !term.starts_with(literal)
}

/// Longest leading run of a pattern that contains no wildcard syntax
fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(WILDCARD_CHARS) {
        Some(pos) => &pattern[..pos],
        None => pattern,
    }
}
