//! Document types: the stored form returned by backends and the input form
//! accepted by writable backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KopisError, Result};

/// Identifier of a document within a backend.
///
/// Doc-ids are strictly positive; `0` never identifies a document. In a
/// multi-database the id is the remapped global id.
pub type DocId = u64;

/// A term position within a document (word offset, 1-based).
pub type TermPos = u32;

/// A retrievable document as stored by a backend.
///
/// A document carries an opaque data blob plus a sparse mapping from small
/// key numbers to opaque byte strings. Key values drive result collapsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque payload set by the indexer.
    pub data: Vec<u8>,
    /// Numbered keys; absent numbers read as the empty value.
    pub keys: BTreeMap<u32, Vec<u8>>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Get the value of a numbered key, or the empty value if unset.
    pub fn key(&self, key_no: u32) -> &[u8] {
        self.keys.get(&key_no).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The input side of a document, handed to a writable backend.
///
/// Postings are accumulated with [`DocumentContents::add_posting`]; adding
/// the same term again raises its within-document frequency even when the
/// position repeats. The document length is the sum of all wdfs.
#[derive(Debug, Clone, Default)]
pub struct DocumentContents {
    /// Opaque payload to store.
    pub data: Vec<u8>,
    /// Numbered keys to store.
    pub keys: BTreeMap<u32, Vec<u8>>,
    terms: BTreeMap<String, TermEntry>,
}

#[derive(Debug, Clone, Default)]
struct TermEntry {
    wdf: u64,
    positions: Vec<TermPos>,
}

impl DocumentContents {
    /// Create empty contents.
    pub fn new() -> Self {
        DocumentContents::default()
    }

    /// Set the data payload.
    pub fn set_data<D: Into<Vec<u8>>>(&mut self, data: D) {
        self.data = data.into();
    }

    /// Set a numbered key.
    pub fn set_key<V: Into<Vec<u8>>>(&mut self, key_no: u32, value: V) {
        self.keys.insert(key_no, value.into());
    }

    /// Record one occurrence of `term` at `position`.
    ///
    /// Terms must be non-empty. Repeating a (term, position) pair still
    /// increments the wdf; the position list stays deduplicated.
    pub fn add_posting<S: Into<String>>(&mut self, term: S, position: TermPos) -> Result<()> {
        let term = term.into();
        if term.is_empty() {
            return Err(KopisError::invalid_argument("empty term in posting"));
        }
        let entry = self.terms.entry(term).or_default();
        entry.wdf += 1;
        if let Err(at) = entry.positions.binary_search(&position) {
            entry.positions.insert(at, position);
        }
        Ok(())
    }

    /// The document length: the sum of all within-document frequencies.
    pub fn length(&self) -> u64 {
        self.terms.values().map(|e| e.wdf).sum()
    }

    /// Iterate the accumulated terms as (name, wdf, sorted positions).
    pub fn terms(&self) -> impl Iterator<Item = (&str, u64, &[TermPos])> {
        self.terms
            .iter()
            .map(|(name, e)| (name.as_str(), e.wdf, e.positions.as_slice()))
    }

    /// The stored form of these contents.
    pub fn to_document(&self) -> Document {
        Document {
            data: self.data.clone(),
            keys: self.keys.clone(),
        }
    }
}
