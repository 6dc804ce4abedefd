//! In-memory reference backend.
//!
//! Stores postings, positions, term lists and documents in process memory
//! behind a `parking_lot` lock. Cursors snapshot the data they traverse at
//! open time, so an evaluation sees a consistent view even if the database
//! is written to afterwards.

use ahash::AHashMap;
use log::debug;
use parking_lot::RwLock;

use crate::backend::{Database, PostingCursor, TermCursor, WritableDatabase};
use crate::document::{DocId, Document, DocumentContents, TermPos};
use crate::error::{KopisError, Result};

#[derive(Debug, Clone)]
struct PostingEntry {
    doc_id: DocId,
    wdf: u64,
    doc_length: u64,
    positions: Vec<TermPos>,
}

#[derive(Debug)]
struct StoredDoc {
    document: Document,
    length: u64,
    /// (term, wdf) pairs in lexicographic term order.
    terms: Vec<(String, u64)>,
}

#[derive(Debug, Default)]
struct Inner {
    /// term -> postings in increasing doc-id order.
    postings: AHashMap<String, Vec<PostingEntry>>,
    docs: Vec<StoredDoc>,
    total_length: u64,
    session_open: bool,
}

/// An in-memory document collection, both readable and writable.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    inner: RwLock<Inner>,
}

impl InMemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        InMemoryDatabase::default()
    }

    fn stored(&self, doc: DocId) -> Result<()> {
        let inner = self.inner.read();
        if doc == 0 || doc as usize > inner.docs.len() {
            return Err(KopisError::invalid_argument(format!("no such document {doc}")));
        }
        Ok(())
    }
}

impl Database for InMemoryDatabase {
    fn doc_count(&self) -> u64 {
        self.inner.read().docs.len() as u64
    }

    fn avg_length(&self) -> f64 {
        let inner = self.inner.read();
        if inner.docs.is_empty() {
            0.0
        } else {
            inner.total_length as f64 / inner.docs.len() as f64
        }
    }

    fn term_freq(&self, term: &str) -> u64 {
        self.inner
            .read()
            .postings
            .get(term)
            .map(|entries| entries.len() as u64)
            .unwrap_or(0)
    }

    fn postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>> {
        Ok(self.snapshot_postings(term, false))
    }

    fn positional_postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>> {
        Ok(self.snapshot_postings(term, true))
    }

    fn term_list(&self, doc: DocId) -> Result<Box<dyn TermCursor>> {
        self.stored(doc)?;
        let inner = self.inner.read();
        let stored = &inner.docs[doc as usize - 1];
        let entries = stored
            .terms
            .iter()
            .map(|(term, wdf)| TermEntry {
                term: term.clone(),
                wdf: *wdf,
                term_freq: inner
                    .postings
                    .get(term)
                    .map(|p| p.len() as u64)
                    .unwrap_or(0),
            })
            .collect();
        Ok(Box::new(InMemoryTermCursor {
            entries,
            index: 0,
            started: false,
        }))
    }

    fn document(&self, doc: DocId) -> Result<Document> {
        self.stored(doc)?;
        Ok(self.inner.read().docs[doc as usize - 1].document.clone())
    }
}

impl InMemoryDatabase {
    fn snapshot_postings(&self, term: &str, with_positions: bool) -> Option<Box<dyn PostingCursor>> {
        let inner = self.inner.read();
        let entries = inner.postings.get(term)?;
        let snapshot: Vec<PostingEntry> = entries
            .iter()
            .map(|e| PostingEntry {
                doc_id: e.doc_id,
                wdf: e.wdf,
                doc_length: e.doc_length,
                positions: if with_positions { e.positions.clone() } else { Vec::new() },
            })
            .collect();
        Some(Box::new(InMemoryPostingCursor {
            entries: snapshot,
            index: 0,
            started: false,
            with_positions,
        }))
    }
}

impl WritableDatabase for InMemoryDatabase {
    fn begin_session(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.session_open {
            return Err(KopisError::invalid_argument("session already open"));
        }
        inner.session_open = true;
        Ok(())
    }

    fn end_session(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.session_open {
            inner.session_open = false;
            debug!("closed write session with {} documents", inner.docs.len());
        }
        Ok(())
    }

    fn add_document(&self, contents: &DocumentContents) -> Result<DocId> {
        let mut inner = self.inner.write();
        inner.session_open = true;

        let doc_id = inner.docs.len() as DocId + 1;
        let length = contents.length();

        let mut term_pairs = Vec::new();
        for (term, wdf, positions) in contents.terms() {
            term_pairs.push((term.to_string(), wdf));
            inner.postings.entry(term.to_string()).or_default().push(PostingEntry {
                doc_id,
                wdf,
                doc_length: length,
                positions: positions.to_vec(),
            });
        }

        inner.docs.push(StoredDoc {
            document: contents.to_document(),
            length,
            terms: term_pairs,
        });
        inner.total_length += length;
        Ok(doc_id)
    }
}

impl Drop for InMemoryDatabase {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.session_open {
            inner.session_open = false;
            debug!("implicitly closed write session on drop");
        }
    }
}

#[derive(Debug)]
struct InMemoryPostingCursor {
    entries: Vec<PostingEntry>,
    index: usize,
    started: bool,
    with_positions: bool,
}

impl PostingCursor for InMemoryPostingCursor {
    fn doc_id(&self) -> DocId {
        self.entries[self.index].doc_id
    }

    fn wdf(&self) -> u64 {
        self.entries[self.index].wdf
    }

    fn doc_length(&self) -> u64 {
        self.entries[self.index].doc_length
    }

    fn positions(&self) -> Option<&[TermPos]> {
        if self.with_positions {
            Some(&self.entries[self.index].positions)
        } else {
            None
        }
    }

    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
        } else if self.index < self.entries.len() {
            self.index += 1;
        }
        Ok(self.index < self.entries.len())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.started = true;
        self.index += self.entries[self.index..].partition_point(|e| e.doc_id < target);
        Ok(self.index < self.entries.len())
    }

    fn at_end(&self) -> bool {
        self.started && self.index >= self.entries.len()
    }
}

#[derive(Debug)]
struct TermEntry {
    term: String,
    wdf: u64,
    term_freq: u64,
}

#[derive(Debug)]
struct InMemoryTermCursor {
    entries: Vec<TermEntry>,
    index: usize,
    started: bool,
}

impl TermCursor for InMemoryTermCursor {
    fn term(&self) -> &str {
        &self.entries[self.index].term
    }

    fn wdf(&self) -> u64 {
        self.entries[self.index].wdf
    }

    fn term_freq(&self) -> u64 {
        self.entries[self.index].term_freq
    }

    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
        } else if self.index < self.entries.len() {
            self.index += 1;
        }
        Ok(self.index < self.entries.len())
    }

    fn at_end(&self) -> bool {
        self.started && self.index >= self.entries.len()
    }
}
