//! Leaf posting list: a backend cursor paired with a term weight.

use crate::backend::PostingCursor;
use crate::document::{DocId, TermPos};
use crate::error::Result;
use crate::postings::PostList;
use crate::weight::Weight;

/// Reads one term's postings from a backend and scores them.
#[derive(Debug)]
pub struct LeafPostList {
    cursor: Box<dyn PostingCursor>,
    weight: Box<dyn Weight>,
    term_freq: u64,
    max_weight: f64,
}

impl LeafPostList {
    /// Wrap a backend cursor with its weighting.
    pub fn new(cursor: Box<dyn PostingCursor>, weight: Box<dyn Weight>, term_freq: u64) -> Self {
        let max_weight = weight.max_weight();
        LeafPostList {
            cursor,
            weight,
            term_freq,
            max_weight,
        }
    }
}

impl PostList for LeafPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.term_freq
    }

    fn max_weight(&self) -> f64 {
        self.max_weight
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.max_weight
    }

    fn doc_id(&self) -> DocId {
        self.cursor.doc_id()
    }

    fn weight(&self) -> f64 {
        self.weight
            .posting_weight(self.cursor.wdf(), self.cursor.doc_length())
    }

    fn at_end(&self) -> bool {
        self.cursor.at_end()
    }

    fn next(&mut self, _min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        self.cursor.advance()?;
        Ok(None)
    }

    fn skip_to(&mut self, target: DocId, _min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        self.cursor.skip_to(target)?;
        Ok(None)
    }

    fn positions(&self) -> Option<&[TermPos]> {
        self.cursor.positions()
    }
}
