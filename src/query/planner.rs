//! Posting-tree synthesis from a canonical query.

use std::collections::BTreeMap;

use log::debug;

use crate::backend::{Database, PostingCursor};
use crate::enquire::RSet;
use crate::error::{KopisError, Result};
use crate::matcher::mset::TermInfo;
use crate::postings::{
    AndNotPostList, AndPostList, EmptyPostList, FilterPostList, LeafPostList, OrPostList,
    PositionalPostList, PostList, XorPostList,
};
use crate::query::{Op, Query, QueryNode};
use crate::weight::{BoolWeight, TermStats, TradWeight, Weight};

/// A synthesized evaluation tree plus the per-term statistics the match
/// set reports.
pub struct PlannedQuery {
    /// Root of the posting-list tree.
    pub root: Box<dyn PostList>,
    /// Per-query-term (termfreq, termweight), keyed by term name.
    pub term_info: BTreeMap<String, TermInfo>,
}

/// Builds posting-list trees bottom-up against one backend snapshot.
pub struct QueryPlanner<'a> {
    db: &'a dyn Database,
    rset: Option<&'a RSet>,
    max_or_terms: Option<u32>,
}

impl<'a> QueryPlanner<'a> {
    /// Create a planner for one evaluation.
    pub fn new(db: &'a dyn Database, rset: Option<&'a RSet>, max_or_terms: Option<u32>) -> Self {
        QueryPlanner {
            db,
            rset,
            max_or_terms,
        }
    }

    /// Synthesize the tree for `query`.
    pub fn plan(&self, query: &Query) -> Result<PlannedQuery> {
        if query.is_empty() {
            return Err(KopisError::invalid_argument("cannot evaluate an empty query"));
        }
        let boolean = query.is_bool();
        let query_length = query.len();
        let root = self.build(query.node(), boolean, query_length)?;
        let term_info = self.gather_term_info(query, boolean, query_length)?;
        Ok(PlannedQuery { root, term_info })
    }

    fn build(
        &self,
        node: &QueryNode,
        boolean: bool,
        query_length: u32,
    ) -> Result<Box<dyn PostList>> {
        match node {
            QueryNode::Empty => Err(KopisError::invalid_argument(
                "empty query as an operand of a compound",
            )),
            QueryNode::Term { name, wqf, .. } => {
                self.build_term(name, *wqf, boolean, query_length)
            }
            QueryNode::Compound {
                op,
                children,
                window,
            } => self.build_compound(*op, children, *window, boolean, query_length),
        }
    }

    fn build_compound(
        &self,
        op: Op,
        children: &[Query],
        window: u32,
        boolean: bool,
        query_length: u32,
    ) -> Result<Box<dyn PostList>> {
        match op {
            Op::Or => {
                let mut lists = children
                    .iter()
                    .map(|c| self.build(c.node(), boolean, query_length))
                    .collect::<Result<Vec<_>>>()?;
                if let Some(cap) = self.max_or_terms {
                    let cap = cap as usize;
                    if cap == 0 {
                        return Ok(Box::new(EmptyPostList::new()));
                    }
                    if lists.len() > cap {
                        debug!("capping OR fan-out from {} to {cap} operands", lists.len());
                        lists.sort_by(|a, b| b.max_weight().total_cmp(&a.max_weight()));
                        lists.truncate(cap);
                    }
                }
                Ok(combine(lists, |l, r| Box::new(OrPostList::new(l, r))))
            }
            Op::And => {
                let lists = children
                    .iter()
                    .map(|c| self.build(c.node(), boolean, query_length))
                    .collect::<Result<Vec<_>>>()?;
                Ok(combine(lists, |l, r| Box::new(AndPostList::new(l, r))))
            }
            Op::AndNot => {
                let left = self.build(children[0].node(), boolean, query_length)?;
                let right = self.build(children[1].node(), true, query_length)?;
                Ok(Box::new(AndNotPostList::new(left, right)))
            }
            Op::Filter => {
                let left = self.build(children[0].node(), boolean, query_length)?;
                let right = self.build(children[1].node(), true, query_length)?;
                Ok(Box::new(FilterPostList::new(left, right)))
            }
            Op::Xor => {
                let left = self.build(children[0].node(), boolean, query_length)?;
                let right = self.build(children[1].node(), boolean, query_length)?;
                Ok(Box::new(XorPostList::new(left, right)))
            }
            Op::Phrase | Op::Near => {
                let mut leaves: Vec<Box<dyn PostList>> = Vec::with_capacity(children.len());
                for child in children {
                    let QueryNode::Term { name, wqf, .. } = child.node() else {
                        // Positional matching needs term leaves; anything
                        // else carries no positions.
                        return Ok(Box::new(EmptyPostList::new()));
                    };
                    match self.build_positional_term(name, *wqf, boolean, query_length)? {
                        Some(leaf) => leaves.push(leaf),
                        None => return Ok(Box::new(EmptyPostList::new())),
                    }
                }
                Ok(Box::new(match op {
                    Op::Phrase => PositionalPostList::phrase(leaves, window),
                    _ => PositionalPostList::near(leaves, window),
                }))
            }
        }
    }

    fn build_term(
        &self,
        name: &str,
        wqf: u32,
        boolean: bool,
        query_length: u32,
    ) -> Result<Box<dyn PostList>> {
        self.check_term(name, wqf)?;
        match self.db.postings(name)? {
            Some(cursor) => self.make_leaf(cursor, name, wqf, boolean, query_length),
            None => Ok(Box::new(EmptyPostList::new())),
        }
    }

    /// Build a positional leaf, or `None` when the term is absent or the
    /// backend has no positions; the caller then empties the whole node.
    fn build_positional_term(
        &self,
        name: &str,
        wqf: u32,
        boolean: bool,
        query_length: u32,
    ) -> Result<Option<Box<dyn PostList>>> {
        self.check_term(name, wqf)?;
        match self.db.positional_postings(name)? {
            Some(cursor) => self.make_leaf(cursor, name, wqf, boolean, query_length).map(Some),
            None => Ok(None),
        }
    }

    fn make_leaf(
        &self,
        cursor: Box<dyn PostingCursor>,
        name: &str,
        wqf: u32,
        boolean: bool,
        query_length: u32,
    ) -> Result<Box<dyn PostList>> {
        let weight: Box<dyn Weight> = if boolean {
            Box::new(BoolWeight)
        } else {
            Box::new(TradWeight::new(&self.term_stats(name, wqf, query_length)?))
        };
        let term_freq = self.db.term_freq(name);
        Ok(Box::new(LeafPostList::new(cursor, weight, term_freq)))
    }

    fn check_term(&self, name: &str, wqf: u32) -> Result<()> {
        if name.is_empty() {
            return Err(KopisError::invalid_argument("empty term name in query"));
        }
        if wqf == 0 {
            return Err(KopisError::invalid_argument(format!(
                "term `{name}` has zero wqf"
            )));
        }
        Ok(())
    }

    fn term_stats(&self, name: &str, wqf: u32, query_length: u32) -> Result<TermStats> {
        let (rel_term_freq, rset_size) = match self.rset {
            Some(rset) if !rset.is_empty() => {
                (self.rel_term_freq(name, rset)?, rset.len() as u64)
            }
            _ => (0, 0),
        };
        Ok(TermStats {
            term_freq: self.db.term_freq(name),
            doc_count: self.db.doc_count(),
            avg_length: self.db.avg_length(),
            wqf,
            query_length,
            rel_term_freq,
            rset_size,
        })
    }

    /// How many judged-relevant documents contain `name`.
    fn rel_term_freq(&self, name: &str, rset: &RSet) -> Result<u64> {
        let Some(mut cursor) = self.db.postings(name)? else {
            return Ok(0);
        };
        let mut count = 0;
        for doc in rset.iter() {
            if !cursor.skip_to(doc)? {
                break;
            }
            if cursor.doc_id() == doc {
                count += 1;
            }
        }
        Ok(count)
    }

    fn gather_term_info(
        &self,
        query: &Query,
        boolean: bool,
        query_length: u32,
    ) -> Result<BTreeMap<String, TermInfo>> {
        let mut total_wqf: BTreeMap<String, u32> = BTreeMap::new();
        collect_leaf_wqf(query.node(), &mut total_wqf);

        let mut info = BTreeMap::new();
        for (name, wqf) in total_wqf {
            let term_freq = self.db.term_freq(&name);
            let term_weight = if boolean {
                0.0
            } else {
                TradWeight::new(&self.term_stats(&name, wqf, query_length)?).term_weight()
            };
            info.insert(
                name,
                TermInfo {
                    term_freq,
                    term_weight,
                },
            );
        }
        Ok(info)
    }
}

fn combine<F>(lists: Vec<Box<dyn PostList>>, join: F) -> Box<dyn PostList>
where
    F: Fn(Box<dyn PostList>, Box<dyn PostList>) -> Box<dyn PostList>,
{
    let mut iter = lists.into_iter();
    match iter.next() {
        Some(first) => iter.fold(first, |acc, next| join(acc, next)),
        None => Box::new(EmptyPostList::new()),
    }
}

fn collect_leaf_wqf(node: &QueryNode, out: &mut BTreeMap<String, u32>) {
    match node {
        QueryNode::Empty => {}
        QueryNode::Term { name, wqf, .. } => {
            *out.entry(name.clone()).or_insert(0) += *wqf;
        }
        QueryNode::Compound { children, .. } => {
            for child in children {
                collect_leaf_wqf(child.node(), out);
            }
        }
    }
}
