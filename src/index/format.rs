//! Durable file layout.
//!
//! ```text
//! header (40 bytes, little-endian)
//!   0  magic          "SDX\0"
//!   4  version        u32
//!   8  doc_count      u32
//!   12 word_count     u32
//!   16 include_count  u32
//!   20 checksum       u32   CRC32 of every byte after the header
//!   24 words_at       u64   offset of the postings section
//!   32 includes_at    u64   offset of the dependency section
//! documents  { varint number, varint len, path }*          emission order
//! postings   { varint len, term, varint n, delta refs }*   sorted by term
//! includes   { varint len, name, varint n, delta refs,
//!              varint np, { varint doc, varint counterpart + 1 }*,
//!              varint nc, { varint doc, varint counterpart + 1 }* }*   sorted
//! ```
//!
//! A counterpart of 0 on disk means "unknown entry".

use crate::error::{IndexError, Result};
use crate::index::types::{DocNumber, Document, IncludeEdge};
use crate::utils::{decode_varint, delta_decode, delta_encode, encode_bytes, encode_varint};
use crate::utils::{read_u32_le, read_u64_le};
use std::path::Path;

pub const MAGIC: [u8; 4] = *b"SDX\0";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 40;

/// Fixed-size file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub doc_count: u32,
    pub word_count: u32,
    pub include_count: u32,
    pub checksum: u32,
    pub words_at: u64,
    pub includes_at: u64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            doc_count: 0,
            word_count: 0,
            include_count: 0,
            checksum: 0,
            words_at: HEADER_LEN as u64,
            includes_at: HEADER_LEN as u64,
        }
    }
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.doc_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.word_count.to_le_bytes());
        out[16..20].copy_from_slice(&self.include_count.to_le_bytes());
        out[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        out[24..32].copy_from_slice(&self.words_at.to_le_bytes());
        out[32..40].copy_from_slice(&self.includes_at.to_le_bytes());
        out
    }

    /// Parse and validate a header against the total file length.
    pub fn decode(buf: &[u8], path: &Path) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(IndexError::corrupt(path, "file shorter than header"));
        }
        if buf[0..4] != MAGIC {
            return Err(IndexError::corrupt(path, "bad magic"));
        }

        let field = |at| read_u32_le(buf, at).unwrap_or_default();
        let version = field(4);
        if version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let header = Self {
            version,
            doc_count: field(8),
            word_count: field(12),
            include_count: field(16),
            checksum: field(20),
            words_at: read_u64_le(buf, 24).unwrap_or_default(),
            includes_at: read_u64_le(buf, 32).unwrap_or_default(),
        };

        let len = buf.len() as u64;
        if header.words_at < HEADER_LEN as u64
            || header.includes_at < header.words_at
            || header.includes_at > len
        {
            return Err(IndexError::corrupt(path, "section offsets out of range"));
        }

        Ok(header)
    }
}

/// A posting as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    pub term: String,
    pub refs: Vec<DocNumber>,
}

/// A dependency entry as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRecord {
    pub name: String,
    pub refs: Vec<DocNumber>,
    pub parents: Vec<IncludeEdge>,
    pub children: Vec<IncludeEdge>,
}

pub fn encode_document(number: DocNumber, path: &str, buf: &mut Vec<u8>) {
    encode_varint(number, buf);
    encode_bytes(path.as_bytes(), buf);
}

pub fn encode_word(term: &str, refs: &[DocNumber], buf: &mut Vec<u8>) {
    encode_bytes(term.as_bytes(), buf);
    encode_refs(refs, buf);
}

pub fn encode_include(
    name: &str,
    refs: &[DocNumber],
    parents: &[IncludeEdge],
    children: &[IncludeEdge],
    buf: &mut Vec<u8>,
) {
    encode_bytes(name.as_bytes(), buf);
    encode_refs(refs, buf);
    encode_edges(parents, buf);
    encode_edges(children, buf);
}

fn encode_refs(refs: &[DocNumber], buf: &mut Vec<u8>) {
    encode_varint(refs.len() as u32, buf);
    delta_encode(refs, buf);
}

fn encode_edges(edges: &[IncludeEdge], buf: &mut Vec<u8>) {
    encode_varint(edges.len() as u32, buf);
    for edge in edges {
        encode_varint(edge.document, buf);
        encode_varint(edge.counterpart.map_or(0, |id| id + 1), buf);
    }
}

/// Forward-only decoder over a byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn varint(&mut self) -> Option<u32> {
        let (value, consumed) = decode_varint(self.buf.get(self.pos..)?)?;
        self.pos += consumed;
        Some(value)
    }

    pub fn bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.varint()? as usize;
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn string(&mut self) -> Option<String> {
        std::str::from_utf8(self.bytes()?).ok().map(str::to_string)
    }

    pub fn refs(&mut self) -> Option<Vec<DocNumber>> {
        let count = self.varint()? as usize;
        let (refs, consumed) = delta_decode(self.buf.get(self.pos..)?, count)?;
        self.pos += consumed;
        Some(refs)
    }

    pub fn edges(&mut self) -> Option<Vec<IncludeEdge>> {
        let count = self.varint()? as usize;
        let mut edges = Vec::with_capacity(count.min(self.buf.len()));
        for _ in 0..count {
            let document = self.varint()?;
            let counterpart = match self.varint()? {
                0 => None,
                id => Some(id - 1),
            };
            edges.push(IncludeEdge::new(document, counterpart));
        }
        Some(edges)
    }

    pub fn document(&mut self) -> Option<Document> {
        let number = self.varint()?;
        let path = self.string()?;
        Some(Document::new(path, number))
    }

    pub fn word(&mut self) -> Option<WordRecord> {
        let term = self.string()?;
        let refs = self.refs()?;
        Some(WordRecord { term, refs })
    }

    pub fn include(&mut self) -> Option<IncludeRecord> {
        let name = self.string()?;
        let refs = self.refs()?;
        let parents = self.edges()?;
        let children = self.edges()?;
        Some(IncludeRecord {
            name,
            refs,
            parents,
            children,
        })
    }
}
