//! Positional operators: PHRASE and NEAR.
//!
//! Both intersect their children's documents like a k-way AND and then
//! verify positions. PHRASE demands a strictly increasing selection of
//! positions, one per child in query order; NEAR accepts any assignment of
//! pairwise-distinct positions. Either way the selected span must satisfy
//! `last - first < window`.

use crate::document::{DocId, TermPos};
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, PostList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionalMode {
    Ordered,
    Unordered,
}

/// Document intersection of positional term leaves with a window check.
#[derive(Debug)]
pub struct PositionalPostList {
    children: Vec<Box<dyn PostList>>,
    window: u32,
    mode: PositionalMode,
    started: bool,
    ended: bool,
}

impl PositionalPostList {
    /// A PHRASE node: children must appear in order within the window.
    pub fn phrase(children: Vec<Box<dyn PostList>>, window: u32) -> Self {
        PositionalPostList::build(children, window, PositionalMode::Ordered)
    }

    /// A NEAR node: children must appear within the window in any order.
    pub fn near(children: Vec<Box<dyn PostList>>, window: u32) -> Self {
        PositionalPostList::build(children, window, PositionalMode::Unordered)
    }

    fn build(children: Vec<Box<dyn PostList>>, window: u32, mode: PositionalMode) -> Self {
        debug_assert!(children.len() >= 2);
        PositionalPostList {
            children,
            window,
            mode,
            started: false,
            ended: false,
        }
    }

    /// Advance from the lead child until all children sit on one document
    /// whose positions satisfy the window, or the stream runs out.
    fn find_match(&mut self) -> Result<()> {
        'candidates: loop {
            if self.children[0].at_end() {
                self.ended = true;
                return Ok(());
            }
            let mut target = self.children[0].doc_id();
            loop {
                let mut moved = false;
                for child in &mut self.children {
                    skip_or_replace(child, target, 0.0)?;
                    if child.at_end() {
                        self.ended = true;
                        return Ok(());
                    }
                    if child.doc_id() > target {
                        target = child.doc_id();
                        moved = true;
                    }
                }
                if !moved {
                    break;
                }
            }
            if self.positions_match() {
                return Ok(());
            }
            next_or_replace(&mut self.children[0], 0.0)?;
            continue 'candidates;
        }
    }

    fn positions_match(&self) -> bool {
        let mut lists: Vec<&[TermPos]> = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match child.positions() {
                Some(positions) if !positions.is_empty() => lists.push(positions),
                _ => return false,
            }
        }
        match self.mode {
            PositionalMode::Ordered => ordered_within(&lists, self.window),
            PositionalMode::Unordered => unordered_within(&lists, self.window),
        }
    }
}

/// Is there a strictly increasing selection, one position per list in
/// order, spanning less than `window`?
fn ordered_within(lists: &[&[TermPos]], window: u32) -> bool {
    'starts: for &start in lists[0] {
        let mut prev = start;
        for list in &lists[1..] {
            let after = list.partition_point(|&p| p <= prev);
            match list.get(after) {
                Some(&p) => prev = p,
                None => continue 'starts,
            }
        }
        if prev - start < window {
            return true;
        }
    }
    false
}

/// Is there an assignment of pairwise-distinct positions, one per list in
/// any order, spanning less than `window`?
fn unordered_within(lists: &[&[TermPos]], window: u32) -> bool {
    let mut order: Vec<usize> = (0..lists.len()).collect();
    order.sort_by_key(|&i| lists[i].len());
    let mut chosen = Vec::with_capacity(lists.len());
    assign(lists, &order, window, &mut chosen)
}

fn assign(lists: &[&[TermPos]], order: &[usize], window: u32, chosen: &mut Vec<TermPos>) -> bool {
    let Some((&list_index, rest)) = order.split_first() else {
        return true;
    };
    for &p in lists[list_index] {
        if chosen.contains(&p) {
            continue;
        }
        let lo = chosen.iter().copied().min().unwrap_or(p).min(p);
        let hi = chosen.iter().copied().max().unwrap_or(p).max(p);
        if hi - lo >= window {
            continue;
        }
        chosen.push(p);
        if assign(lists, rest, window, chosen) {
            return true;
        }
        chosen.pop();
    }
    false
}

impl PostList for PositionalPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.children
            .iter()
            .map(|c| c.termfreq_estimate())
            .min()
            .unwrap_or(0)
    }

    fn max_weight(&self) -> f64 {
        self.children.iter().map(|c| c.max_weight()).sum()
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.children
            .iter_mut()
            .map(|c| c.recalc_max_weight())
            .sum()
    }

    fn doc_id(&self) -> DocId {
        self.children[0].doc_id()
    }

    fn weight(&self) -> f64 {
        self.children.iter().map(|c| c.weight()).sum()
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, _min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        self.started = true;
        next_or_replace(&mut self.children[0], 0.0)?;
        self.find_match()?;
        Ok(None)
    }

    fn skip_to(&mut self, target: DocId, _min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && !self.children[0].at_end() && self.children[0].doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        skip_or_replace(&mut self.children[0], target, 0.0)?;
        self.find_match()?;
        Ok(None)
    }
}
