//! Boolean filtering of a weighted posting list.

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, PostList};

/// Intersection like AND, but only the left side contributes weight; the
/// right side is a pure boolean mask.
#[derive(Debug)]
pub struct FilterPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    ended: bool,
}

impl FilterPostList {
    /// Combine a weighted subtree with a boolean mask.
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>) -> Self {
        FilterPostList {
            left,
            right,
            started: false,
            ended: false,
        }
    }

    fn align(&mut self, min_weight: f64) -> Result<()> {
        loop {
            if self.left.at_end() {
                self.ended = true;
                return Ok(());
            }
            let target = self.left.doc_id();
            skip_or_replace(&mut self.right, target, 0.0)?;
            if self.right.at_end() {
                self.ended = true;
                return Ok(());
            }
            let rdoc = self.right.doc_id();
            if rdoc == target {
                return Ok(());
            }
            skip_or_replace(&mut self.left, rdoc, min_weight)?;
        }
    }
}

impl PostList for FilterPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left
            .termfreq_estimate()
            .min(self.right.termfreq_estimate())
    }

    fn max_weight(&self) -> f64 {
        self.left.max_weight()
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.left.recalc_max_weight()
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id()
    }

    fn weight(&self) -> f64 {
        self.left.weight()
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        self.started = true;
        next_or_replace(&mut self.left, min_weight)?;
        self.align(min_weight)?;
        Ok(None)
    }

    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && !self.left.at_end() && self.left.doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        skip_or_replace(&mut self.left, target, min_weight)?;
        self.align(min_weight)?;
        Ok(None)
    }
}
