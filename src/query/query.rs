//! The user-facing query tree.
//!
//! Queries canonicalise at construction: associative operators flatten,
//! duplicate OR operands at the same term position merge by summing wqf,
//! and ill-formed compositions (empty operands, boolean sub-queries under a
//! weighted operator) are rejected before any evaluation starts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::TermPos;
use crate::error::{KopisError, Result};

/// Query tree operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Documents matching any child; weights sum where children coincide.
    Or,
    /// Documents matching every child; weights sum.
    And,
    /// Documents matching the left child but not the right.
    AndNot,
    /// Documents matching the left child, filtered by the right as a pure
    /// boolean mask.
    Filter,
    /// Documents matching exactly one child.
    Xor,
    /// Children in order within a position window.
    Phrase,
    /// Children in any order within a position window.
    Near,
}

impl Op {
    fn token(self) -> &'static str {
        match self {
            Op::Or => "OR",
            Op::And => "AND",
            Op::AndNot => "AND_NOT",
            Op::Filter => "FILTER",
            Op::Xor => "XOR",
            Op::Phrase => "PHRASE",
            Op::Near => "NEAR",
        }
    }

    fn is_associative(self) -> bool {
        matches!(self, Op::Or | Op::And)
    }

    fn is_binary(self) -> bool {
        matches!(self, Op::AndNot | Op::Filter | Op::Xor)
    }
}

/// The shape of one query node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// Matches nothing; only valid as a whole (unset) query.
    Empty,
    /// A single term with its within-query frequency and term position.
    Term {
        /// Stemmed term name.
        name: String,
        /// Within-query frequency.
        wqf: u32,
        /// Term position used to collapse duplicates and order terms.
        position: TermPos,
    },
    /// An operator over sub-queries.
    Compound {
        /// The operator.
        op: Op,
        /// Canonicalised children.
        children: Vec<Query>,
        /// Position window for [`Op::Phrase`] and [`Op::Near`].
        window: u32,
    },
}

/// A user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    node: QueryNode,
    boolean: bool,
    length_override: Option<u32>,
}

impl Default for Query {
    fn default() -> Self {
        Query::empty()
    }
}

impl Query {
    /// The empty query. Invalid as an operand and invalid to evaluate.
    pub fn empty() -> Self {
        Query {
            node: QueryNode::Empty,
            boolean: false,
            length_override: None,
        }
    }

    /// A single-term query with wqf 1 at position 1.
    pub fn term<S: Into<String>>(name: S) -> Self {
        Query::term_at(name, 1, 1)
    }

    /// A single-term query with an explicit wqf and term position.
    pub fn term_at<S: Into<String>>(name: S, wqf: u32, position: TermPos) -> Self {
        Query {
            node: QueryNode::Term {
                name: name.into(),
                wqf,
                position,
            },
            boolean: false,
            length_override: None,
        }
    }

    /// Combine sub-queries under `op` (window 0).
    pub fn compound(op: Op, children: Vec<Query>) -> Result<Self> {
        Query::compound_with_window(op, children, 0)
    }

    /// Combine sub-queries under `op` with a position window; the window
    /// only matters for [`Op::Phrase`] and [`Op::Near`].
    pub fn compound_with_window(op: Op, children: Vec<Query>, window: u32) -> Result<Self> {
        if children.is_empty() {
            return Ok(Query::empty());
        }
        for child in &children {
            if child.is_empty() {
                return Err(KopisError::invalid_argument(format!(
                    "empty query as an operand of {}",
                    op.token()
                )));
            }
            if child.boolean && op != Op::Filter {
                return Err(KopisError::invalid_argument(format!(
                    "boolean sub-query under {}",
                    op.token()
                )));
            }
        }
        if op.is_binary() && children.len() != 2 {
            return Err(KopisError::invalid_argument(format!(
                "{} takes exactly two operands, got {}",
                op.token(),
                children.len()
            )));
        }

        let mut children = children;
        if op.is_associative() {
            children = flatten(op, children);
        }
        if op == Op::Or {
            children = collapse_positions(children);
        }
        if children.len() == 1 {
            return Ok(children.remove(0));
        }
        Ok(Query {
            node: QueryNode::Compound {
                op,
                children,
                window,
            },
            boolean: false,
            length_override: None,
        })
    }

    /// Convenience for the common two-operand case.
    pub fn pair(op: Op, left: Query, right: Query) -> Result<Self> {
        Query::compound(op, vec![left, right])
    }

    /// Whether this is the empty query.
    pub fn is_empty(&self) -> bool {
        matches!(self.node, QueryNode::Empty)
    }

    /// The canonicalised tree.
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    /// Mark the query pure-boolean: every posting weighs 0 and the match
    /// set's maximum possible weight is 0.
    pub fn set_bool(&mut self, boolean: bool) {
        self.boolean = boolean;
    }

    /// Whether the query is marked pure-boolean.
    pub fn is_bool(&self) -> bool {
        self.boolean
    }

    /// Query length: the sum of wqf over the leaves, unless overridden.
    pub fn len(&self) -> u32 {
        self.length_override.unwrap_or_else(|| self.node.leaf_length())
    }

    /// Override the query length used by weighting.
    pub fn set_length(&mut self, length: u32) {
        self.length_override = Some(length);
    }

    /// Unique leaf terms, ordered by term position.
    pub fn terms(&self) -> Vec<String> {
        let mut leaves = Vec::new();
        self.node.collect_leaves(&mut leaves);
        leaves.sort_by_key(|(position, _)| *position);
        let mut seen = std::collections::HashSet::new();
        leaves
            .into_iter()
            .filter(|(_, name)| seen.insert(name.clone()))
            .map(|(_, name)| name)
            .collect()
    }

    /// Diagnostic rendering of the canonical tree.
    pub fn description(&self) -> String {
        format!("Query({})", self.node)
    }
}

impl QueryNode {
    fn leaf_length(&self) -> u32 {
        match self {
            QueryNode::Empty => 0,
            QueryNode::Term { wqf, .. } => *wqf,
            QueryNode::Compound { children, .. } => {
                children.iter().map(|c| c.node.leaf_length()).sum()
            }
        }
    }

    fn collect_leaves(&self, out: &mut Vec<(TermPos, String)>) {
        match self {
            QueryNode::Empty => {}
            QueryNode::Term { name, position, .. } => out.push((*position, name.clone())),
            QueryNode::Compound { children, .. } => {
                for child in children {
                    child.node.collect_leaves(out);
                }
            }
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Empty => Ok(()),
            QueryNode::Term { name, wqf, .. } => {
                if *wqf == 1 {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}#{wqf}")
                }
            }
            QueryNode::Compound {
                op,
                children,
                window,
            } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        match op {
                            Op::Phrase | Op::Near => write!(f, " {}/{} ", op.token(), window)?,
                            _ => write!(f, " {} ", op.token())?,
                        }
                    }
                    write!(f, "{}", child.node)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Splice same-operator children into their parent. Children are already
/// canonical, so one level of splicing is complete.
fn flatten(op: Op, children: Vec<Query>) -> Vec<Query> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child.node {
            QueryNode::Compound {
                op: child_op,
                children: grandchildren,
                ..
            } if child_op == op => flat.extend(grandchildren),
            _ => flat.push(child),
        }
    }
    flat
}

/// Merge OR operands that are the same term at the same position by
/// summing their wqf.
fn collapse_positions(children: Vec<Query>) -> Vec<Query> {
    let mut merged: Vec<Query> = Vec::with_capacity(children.len());
    for child in children {
        if let QueryNode::Term { name, wqf, position } = &child.node {
            if let Some(existing) = merged.iter_mut().find(|q| {
                matches!(&q.node, QueryNode::Term { name: n, position: p, .. }
                    if n == name && p == position)
            }) {
                if let QueryNode::Term { wqf: total, .. } = &mut existing.node {
                    *total += *wqf;
                }
                continue;
            }
        }
        merged.push(child);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_has_length_zero() {
        assert_eq!(Query::empty().len(), 0);
        assert!(Query::empty().is_empty());
    }

    #[test]
    fn test_query_length_sums_leaf_wqf() {
        let query = Query::pair(
            Op::And,
            Query::pair(Op::Or, Query::term("foo"), Query::term("bar")).unwrap(),
            Query::pair(Op::Or, Query::term("wibble"), Query::term("spoon")).unwrap(),
        )
        .unwrap();
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_query_length_override() {
        let mut query = Query::term("word");
        assert_eq!(query.len(), 1);
        query.set_length(2);
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_or_flattening() {
        let nested = Query::compound(
            Op::Or,
            vec![
                Query::term("wibble"),
                Query::term("wobble"),
                Query::pair(Op::Or, Query::term("jelly"), Query::term("belly")).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(
            nested.description(),
            "Query((wibble OR wobble OR jelly OR belly))"
        );
    }

    #[test]
    fn test_and_flattening() {
        let nested = Query::compound(
            Op::And,
            vec![
                Query::pair(Op::And, Query::term("jelly"), Query::term("belly")).unwrap(),
                Query::term("wibble"),
                Query::term("wobble"),
            ],
        )
        .unwrap();
        assert_eq!(
            nested.description(),
            "Query((jelly AND belly AND wibble AND wobble))"
        );
    }

    #[test]
    fn test_phrase_is_not_flattened() {
        let inner = Query::compound_with_window(
            Op::Phrase,
            vec![Query::term("one"), Query::term("two")],
            2,
        )
        .unwrap();
        let outer = Query::compound_with_window(
            Op::Phrase,
            vec![inner.clone(), Query::term("three")],
            2,
        )
        .unwrap();
        match outer.node() {
            QueryNode::Compound { children, .. } => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], inner);
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn test_position_collapse_sums_wqf() {
        let collapsed = Query::pair(
            Op::Or,
            Query::term_at("thi", 1, 1),
            Query::term_at("thi", 1, 1),
        )
        .unwrap();
        assert_eq!(collapsed, Query::term_at("thi", 2, 1));
        assert_eq!(collapsed.len(), 2);
    }

    #[test]
    fn test_same_term_different_positions_not_collapsed() {
        let query = Query::pair(
            Op::Or,
            Query::term_at("thi", 1, 1),
            Query::term_at("thi", 1, 2),
        )
        .unwrap();
        match query.node() {
            QueryNode::Compound { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected compound, got {other:?}"),
        }
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_empty_operand_rejected() {
        let result = Query::pair(Op::Or, Query::term("bar"), Query::empty());
        assert!(matches!(result, Err(KopisError::InvalidArgument(_))));
        let result = Query::pair(Op::Filter, Query::empty(), Query::term("thi"));
        assert!(matches!(result, Err(KopisError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_children_vector_gives_empty_query() {
        let query = Query::compound(Op::Or, vec![]).unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_boolean_subquery_rejected_outside_filter() {
        let mut boolean = Query::term("foo");
        boolean.set_bool(true);
        let result = Query::pair(Op::Or, Query::term("bar"), boolean.clone());
        assert!(matches!(result, Err(KopisError::InvalidArgument(_))));

        // FILTER accepts a boolean mask.
        let filtered = Query::pair(Op::Filter, Query::term("bar"), boolean);
        assert!(filtered.is_ok());
    }

    #[test]
    fn test_binary_operators_require_two_operands() {
        let children = vec![Query::term("a"), Query::term("b"), Query::term("c")];
        assert!(Query::compound(Op::AndNot, children.clone()).is_err());
        assert!(Query::compound(Op::Xor, children).is_err());
    }

    #[test]
    fn test_terms_ordered_by_position() {
        let query = Query::pair(
            Op::Or,
            Query::pair(
                Op::And,
                Query::term_at("one", 1, 1),
                Query::term_at("three", 1, 3),
            )
            .unwrap(),
            Query::pair(
                Op::Or,
                Query::term_at("four", 1, 4),
                Query::term_at("two", 1, 2),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(query.terms(), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_query_serialization_round_trip() {
        let query = Query::pair(Op::Or, Query::term("alpha"), Query::term("beta")).unwrap();
        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(query, back);
    }
}
