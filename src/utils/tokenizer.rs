use rustc_hash::FxHashSet;

/// Maximum identifier length to store in the index.
/// Longer runs are likely base64, hex dumps, or other non-searchable content.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8192;

/// Extract identifiers (complete symbols) from code.
/// Case is preserved; identifiers never start with a digit and must be at
/// least two characters long.
pub fn extract_identifiers(content: &str) -> FxHashSet<String> {
    let bytes = content.as_bytes();
    let mut identifiers = FxHashSet::default();
    let mut start: Option<usize> = None;

    for (i, &byte) in bytes.iter().enumerate() {
        if byte.is_ascii_alphanumeric() || byte == b'_' {
            if start.is_none() && !byte.is_ascii_digit() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            push_identifier(&mut identifiers, &content[s..i]);
        }
    }
    if let Some(s) = start {
        push_identifier(&mut identifiers, &content[s..]);
    }

    identifiers
}

fn push_identifier(identifiers: &mut FxHashSet<String>, ident: &str) {
    if ident.len() >= 2 && ident.len() <= MAX_IDENTIFIER_LENGTH {
        identifiers.insert(ident.to_string());
    }
}

/// NUL byte near the start of the file
pub fn is_binary(content: &[u8]) -> bool {
    let head = &content[..content.len().min(BINARY_SNIFF_LEN)];
    memchr::memchr(0, head).is_some()
}
