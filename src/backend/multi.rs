//! Multi-database fan-out.
//!
//! Presents N component backends as one collection. Doc-ids interleave:
//! component `i` (0-based) maps its local id `l` to `(l - 1) * N + i + 1`,
//! so no two components ever share a mapped id. Statistics merge: document
//! counts and term frequencies sum, the average length is weighted by
//! component size.

use std::fmt::Debug;
use std::sync::Arc;

use crate::backend::{Database, PostingCursor, TermCursor};
use crate::document::{DocId, Document, TermPos};
use crate::error::{KopisError, Result};

/// N component backends behind the single-collection interface.
#[derive(Debug, Clone)]
pub struct MultiDatabase {
    subs: Vec<Arc<dyn Database>>,
}

impl MultiDatabase {
    /// Combine component backends. At least one is required.
    pub fn new(subs: Vec<Arc<dyn Database>>) -> Result<Self> {
        if subs.is_empty() {
            return Err(KopisError::invalid_argument(
                "a multi-database needs at least one component",
            ));
        }
        Ok(MultiDatabase { subs })
    }

    fn stride(&self) -> u64 {
        self.subs.len() as u64
    }

    /// Map a component-local id to the interleaved global id.
    pub fn global_id(&self, sub: usize, local: DocId) -> DocId {
        (local - 1) * self.stride() + sub as u64 + 1
    }

    /// Split a global id into (component index, local id).
    pub fn split_id(&self, doc: DocId) -> (usize, DocId) {
        let n = self.stride();
        (((doc - 1) % n) as usize, (doc - 1) / n + 1)
    }

    fn check_id(&self, doc: DocId) -> Result<(usize, DocId)> {
        if doc == 0 {
            return Err(KopisError::invalid_argument("document id 0"));
        }
        Ok(self.split_id(doc))
    }

    fn merged_postings(
        &self,
        term: &str,
        positional: bool,
    ) -> Result<Option<Box<dyn PostingCursor>>> {
        let mut parts = Vec::new();
        for (index, sub) in self.subs.iter().enumerate() {
            let cursor = if positional {
                sub.positional_postings(term)?
            } else {
                sub.postings(term)?
            };
            match cursor {
                Some(cursor) => parts.push(SubCursor {
                    cursor,
                    sub: index,
                    positioned: false,
                    done: false,
                }),
                None if positional && sub.term_freq(term) > 0 => {
                    // One component without positional support poisons the
                    // positional view of the whole collection.
                    return Ok(None);
                }
                None => {}
            }
        }
        if parts.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(MultiPostingCursor {
            parts,
            stride: self.stride(),
            current: None,
            started: false,
        })))
    }
}

impl Database for MultiDatabase {
    fn doc_count(&self) -> u64 {
        self.subs.iter().map(|s| s.doc_count()).sum()
    }

    fn avg_length(&self) -> f64 {
        let total_docs = self.doc_count();
        if total_docs == 0 {
            return 0.0;
        }
        let total_length: f64 = self
            .subs
            .iter()
            .map(|s| s.doc_count() as f64 * s.avg_length())
            .sum();
        total_length / total_docs as f64
    }

    fn term_freq(&self, term: &str) -> u64 {
        self.subs.iter().map(|s| s.term_freq(term)).sum()
    }

    fn postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>> {
        self.merged_postings(term, false)
    }

    fn positional_postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>> {
        self.merged_postings(term, true)
    }

    fn term_list(&self, doc: DocId) -> Result<Box<dyn TermCursor>> {
        let (sub, local) = self.check_id(doc)?;
        self.subs[sub].term_list(local)
    }

    fn document(&self, doc: DocId) -> Result<Document> {
        let (sub, local) = self.check_id(doc)?;
        self.subs[sub].document(local)
    }

    fn sub_db_count(&self) -> usize {
        self.subs.len()
    }

    fn sub_db_of(&self, doc: DocId) -> usize {
        self.split_id(doc).0
    }
}

#[derive(Debug)]
struct SubCursor {
    cursor: Box<dyn PostingCursor>,
    sub: usize,
    positioned: bool,
    done: bool,
}

impl SubCursor {
    fn global(&self, stride: u64) -> DocId {
        (self.cursor.doc_id() - 1) * stride + self.sub as u64 + 1
    }

    fn advance(&mut self) -> Result<()> {
        if !self.done {
            self.positioned = self.cursor.advance()?;
            self.done = !self.positioned;
        }
        Ok(())
    }

    fn skip_to(&mut self, local_target: DocId) -> Result<()> {
        if !self.done {
            self.positioned = self.cursor.skip_to(local_target)?;
            self.done = !self.positioned;
        }
        Ok(())
    }
}

/// K-way merge of component posting cursors with remapped ids.
#[derive(Debug)]
struct MultiPostingCursor {
    parts: Vec<SubCursor>,
    stride: u64,
    /// Index into `parts` of the component at the current document.
    current: Option<usize>,
    started: bool,
}

impl MultiPostingCursor {
    fn reposition(&mut self) {
        self.current = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.positioned)
            .min_by_key(|(_, p)| p.global(self.stride))
            .map(|(i, _)| i);
    }

    fn part(&self) -> &SubCursor {
        debug_assert!(self.current.is_some(), "cursor not positioned");
        &self.parts[self.current.unwrap_or(0)]
    }
}

impl PostingCursor for MultiPostingCursor {
    fn doc_id(&self) -> DocId {
        self.part().global(self.stride)
    }

    fn wdf(&self) -> u64 {
        self.part().cursor.wdf()
    }

    fn doc_length(&self) -> u64 {
        self.part().cursor.doc_length()
    }

    fn positions(&self) -> Option<&[TermPos]> {
        self.part().cursor.positions()
    }

    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            for part in &mut self.parts {
                part.advance()?;
            }
        } else if let Some(at) = self.current {
            self.parts[at].advance()?;
        }
        self.reposition();
        Ok(self.current.is_some())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.started = true;
        for sub in 0..self.parts.len() {
            let local = self.local_target_for(sub, target);
            let part = &mut self.parts[sub];
            if !part.positioned || part.global(self.stride) < target {
                part.skip_to(local)?;
            }
        }
        self.reposition();
        Ok(self.current.is_some())
    }

    fn at_end(&self) -> bool {
        self.started && self.current.is_none()
    }
}

impl MultiPostingCursor {
    fn local_target_for(&self, part: usize, target: DocId) -> DocId {
        let sub = self.parts[part].sub as u64;
        let past = target.saturating_sub(sub + 1);
        past.div_ceil(self.stride) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryDatabase, WritableDatabase};
    use crate::document::DocumentContents;

    fn db_with(terms_per_doc: &[&[&str]]) -> Arc<dyn Database> {
        let db = InMemoryDatabase::new();
        for terms in terms_per_doc {
            let mut contents = DocumentContents::new();
            for (i, term) in terms.iter().enumerate() {
                contents.add_posting(*term, i as u32 + 1).unwrap();
            }
            db.add_document(&contents).unwrap();
        }
        Arc::new(db)
    }

    #[test]
    fn test_id_remapping_round_trips() {
        let multi = MultiDatabase::new(vec![db_with(&[&["a"]]), db_with(&[&["a"]])]).unwrap();
        assert_eq!(multi.global_id(0, 1), 1);
        assert_eq!(multi.global_id(1, 1), 2);
        assert_eq!(multi.global_id(0, 2), 3);
        assert_eq!(multi.global_id(1, 3), 6);
        for doc in 1..=8 {
            let (sub, local) = multi.split_id(doc);
            assert_eq!(multi.global_id(sub, local), doc);
        }
    }

    #[test]
    fn test_merged_statistics() {
        let a = db_with(&[&["x", "y"], &["x"]]);
        let b = db_with(&[&["x", "y", "z", "w"]]);
        let multi = MultiDatabase::new(vec![a, b]).unwrap();

        assert_eq!(multi.doc_count(), 3);
        assert_eq!(multi.term_freq("x"), 3);
        assert_eq!(multi.term_freq("y"), 2);
        assert_eq!(multi.term_freq("z"), 1);
        // (2 docs of avg 1.5) + (1 doc of length 4) over 3 docs.
        assert!((multi.avg_length() - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_merged_cursor_interleaves() {
        let a = db_with(&[&["x"], &["y"], &["x"]]);
        let b = db_with(&[&["x"], &["x"]]);
        let multi = MultiDatabase::new(vec![a, b]).unwrap();

        let mut cursor = multi.postings("x").unwrap().unwrap();
        let mut seen = Vec::new();
        while cursor.advance().unwrap() {
            seen.push(cursor.doc_id());
        }
        // sub0 locals {1, 3} -> {1, 5}; sub1 locals {1, 2} -> {2, 4}.
        assert_eq!(seen, vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_merged_cursor_skip_to() {
        let a = db_with(&[&["x"], &["x"], &["x"]]);
        let b = db_with(&[&["x"], &["x"], &["x"]]);
        let multi = MultiDatabase::new(vec![a, b]).unwrap();

        let mut cursor = multi.postings("x").unwrap().unwrap();
        assert!(cursor.skip_to(3).unwrap());
        assert_eq!(cursor.doc_id(), 3);
        assert!(cursor.skip_to(3).unwrap());
        assert_eq!(cursor.doc_id(), 3);
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.doc_id(), 4);
        assert!(!cursor.skip_to(7).unwrap());
        assert!(cursor.at_end());
    }

    #[test]
    fn test_document_routing() {
        let a = InMemoryDatabase::new();
        let mut contents = DocumentContents::new();
        contents.set_data("first");
        contents.add_posting("a", 1).unwrap();
        a.add_document(&contents).unwrap();

        let b = InMemoryDatabase::new();
        let mut contents = DocumentContents::new();
        contents.set_data("second");
        contents.add_posting("b", 1).unwrap();
        b.add_document(&contents).unwrap();

        let multi = MultiDatabase::new(vec![
            Arc::new(a) as Arc<dyn Database>,
            Arc::new(b) as Arc<dyn Database>,
        ])
        .unwrap();

        assert_eq!(multi.document(1).unwrap().data, b"first");
        assert_eq!(multi.document(2).unwrap().data, b"second");
        assert_eq!(multi.sub_db_of(1), 0);
        assert_eq!(multi.sub_db_of(2), 1);
    }
}
