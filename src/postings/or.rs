//! Disjunction of two posting lists.

use log::trace;

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{
    next_or_replace, skip_or_replace, AndMaybePostList, AndPostList, EmptyPostList, PostList,
};

/// Merge of both sides; a document on both sides is emitted once with the
/// summed weight.
///
/// The node prunes itself two ways. A side that exhausts hands the survivor
/// back as a replacement. And when the caller's minimum useful weight rises
/// above what one side can contribute alone, the OR decays into an
/// AND-MAYBE (or a full AND) over its children mid-stream.
#[derive(Debug)]
pub struct OrPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    ended: bool,
    lmax: f64,
    rmax: f64,
    minmax: f64,
    static_max: f64,
}

impl OrPostList {
    /// Combine two fresh subtrees.
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>) -> Self {
        let lmax = left.max_weight();
        let rmax = right.max_weight();
        OrPostList {
            left,
            right,
            started: false,
            ended: false,
            lmax,
            rmax,
            minmax: lmax.min(rmax),
            static_max: lmax + rmax,
        }
    }

    fn take_left(&mut self) -> Box<dyn PostList> {
        std::mem::replace(&mut self.left, Box::new(EmptyPostList::new()))
    }

    fn take_right(&mut self) -> Box<dyn PostList> {
        std::mem::replace(&mut self.right, Box::new(EmptyPostList::new()))
    }

    /// After advancing, collapse onto a surviving side or report the end.
    fn settle(&mut self) -> Result<Option<Box<dyn PostList>>> {
        match (self.left.at_end(), self.right.at_end()) {
            (true, true) => {
                self.ended = true;
                Ok(None)
            }
            (true, false) => Ok(Some(self.take_right())),
            (false, true) => Ok(Some(self.take_left())),
            (false, false) => Ok(None),
        }
    }

    /// The caller's threshold exceeds what one side can reach alone:
    /// restructure into the equivalent stricter node and continue there.
    fn decay(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        let lhead = self.left.doc_id();
        let rhead = self.right.doc_id();
        let current = lhead.min(rhead);
        let left = self.take_left();
        let right = self.take_right();

        let mut replacement: Box<dyn PostList> = if min_weight > self.lmax && min_weight > self.rmax
        {
            trace!("or decays to and at doc {current}");
            Box::new(AndPostList::from_parts(left, right, lhead > current))
        } else if min_weight > self.lmax {
            trace!("or decays to and-maybe (right required) at doc {current}");
            Box::new(AndMaybePostList::from_parts(right, left, rhead > current))
        } else {
            trace!("or decays to and-maybe (left required) at doc {current}");
            Box::new(AndMaybePostList::from_parts(left, right, lhead > current))
        };
        if let Some(inner) = replacement.next(min_weight)? {
            replacement = inner;
        }
        Ok(Some(replacement))
    }
}

impl PostList for OrPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left.termfreq_estimate() + self.right.termfreq_estimate()
    }

    fn max_weight(&self) -> f64 {
        self.static_max
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.lmax = self.left.recalc_max_weight();
        self.rmax = self.right.recalc_max_weight();
        self.minmax = self.lmax.min(self.rmax);
        self.lmax + self.rmax
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id().min(self.right.doc_id())
    }

    fn weight(&self) -> f64 {
        let lhead = self.left.doc_id();
        let rhead = self.right.doc_id();
        if lhead == rhead {
            self.left.weight() + self.right.weight()
        } else if lhead < rhead {
            self.left.weight()
        } else {
            self.right.weight()
        }
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && min_weight > self.minmax {
            return self.decay(min_weight);
        }
        if !self.started {
            self.started = true;
            next_or_replace(&mut self.left, min_weight - self.rmax)?;
            next_or_replace(&mut self.right, min_weight - self.lmax)?;
        } else {
            let lhead = self.left.doc_id();
            let rhead = self.right.doc_id();
            if lhead <= rhead {
                next_or_replace(&mut self.left, min_weight - self.rmax)?;
            }
            if rhead <= lhead {
                next_or_replace(&mut self.right, min_weight - self.lmax)?;
            }
        }
        self.settle()
    }

    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && self.doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        skip_or_replace(&mut self.left, target, min_weight - self.rmax)?;
        skip_or_replace(&mut self.right, target, min_weight - self.lmax)?;
        self.settle()
    }
}
