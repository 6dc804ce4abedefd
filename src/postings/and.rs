//! Conjunction of two posting lists.

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, PostList};

/// Yields documents present in both sides; weights sum.
///
/// Alignment is by repeated `skip_to`: the right side is only ever skipped
/// forward, so a right child positioned ahead of the left is picked up
/// without losing its current document.
#[derive(Debug)]
pub struct AndPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    /// The left child is positioned at a document not yet emitted, so the
    /// next advance must consider it instead of moving past it.
    pending_left: bool,
    ended: bool,
    lmax: f64,
    rmax: f64,
    static_max: f64,
}

impl AndPostList {
    /// Combine two fresh subtrees.
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>) -> Self {
        let lmax = left.max_weight();
        let rmax = right.max_weight();
        AndPostList {
            left,
            right,
            started: false,
            pending_left: false,
            ended: false,
            lmax,
            rmax,
            static_max: lmax + rmax,
        }
    }

    /// Adopt two subtrees already positioned mid-stream, as happens when an
    /// OR node decays under min-weight pressure.
    pub(crate) fn from_parts(
        left: Box<dyn PostList>,
        right: Box<dyn PostList>,
        pending_left: bool,
    ) -> Self {
        let lmax = left.max_weight();
        let rmax = right.max_weight();
        AndPostList {
            left,
            right,
            started: true,
            pending_left,
            ended: false,
            lmax,
            rmax,
            static_max: lmax + rmax,
        }
    }

    fn align(&mut self, min_weight: f64) -> Result<()> {
        loop {
            if self.left.at_end() {
                self.ended = true;
                return Ok(());
            }
            let target = self.left.doc_id();
            skip_or_replace(&mut self.right, target, min_weight - self.lmax)?;
            if self.right.at_end() {
                self.ended = true;
                return Ok(());
            }
            let rdoc = self.right.doc_id();
            if rdoc == target {
                return Ok(());
            }
            skip_or_replace(&mut self.left, rdoc, min_weight - self.rmax)?;
        }
    }
}

impl PostList for AndPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left
            .termfreq_estimate()
            .min(self.right.termfreq_estimate())
    }

    fn max_weight(&self) -> f64 {
        self.static_max
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.lmax = self.left.recalc_max_weight();
        self.rmax = self.right.recalc_max_weight();
        self.lmax + self.rmax
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id()
    }

    fn weight(&self) -> f64 {
        self.left.weight() + self.right.weight()
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            next_or_replace(&mut self.left, min_weight - self.rmax)?;
        } else if self.pending_left {
            self.pending_left = false;
        } else {
            next_or_replace(&mut self.left, min_weight - self.rmax)?;
        }
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
        self.pending_left = false;
        skip_or_replace(&mut self.left, target, min_weight - self.rmax)?;
        self.align(min_weight)?;
        Ok(None)
    }
}
