//! Weighting schemes.
//!
//! A [`Weight`] turns posting statistics into a relevance score and
//! supplies the upper bound the evaluator prunes with. Schemes must be
//! monotone: more within-document or within-query occurrences never lower
//! the score, and documents longer than average are never rewarded for it.

use std::fmt::Debug;

/// Collection and query statistics a term weight is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermStats {
    /// Documents containing the term (n).
    pub term_freq: u64,
    /// Documents in the collection (N).
    pub doc_count: u64,
    /// Average document length over the collection.
    pub avg_length: f64,
    /// Within-query frequency of the term.
    pub wqf: u32,
    /// Total query length (sum of wqf over the query's leaves).
    pub query_length: u32,
    /// Relevant documents containing the term (r).
    pub rel_term_freq: u64,
    /// Size of the relevance set (R).
    pub rset_size: u64,
}

/// Per-term scoring seam.
pub trait Weight: Send + Debug {
    /// Score contribution of one posting.
    fn posting_weight(&self, wdf: u64, doc_length: u64) -> f64;

    /// Supremum of [`posting_weight`] over all reachable postings.
    ///
    /// [`posting_weight`]: Weight::posting_weight
    fn max_weight(&self) -> f64;

    /// The query-side term weight reported in match-set statistics.
    fn term_weight(&self) -> f64;
}

/// The traditional probabilistic scheme.
///
/// The term weight is `wqf * rsj(r, R, n, N)` with the Robertson/Sparck
/// Jones relevance form; without relevance judgements (`r = R = 0`) it
/// degenerates to `ln((N - n + 0.5) / (n + 0.5))`. Each posting is then
/// saturated by `wdf / (wdf + dlen/avlen)`, so the term weight itself is
/// the upper bound. Query length arrives with the statistics but this
/// scheme does not fold it into the score.
#[derive(Debug, Clone)]
pub struct TradWeight {
    term_weight: f64,
    avg_length: f64,
}

impl TradWeight {
    /// Build the weight for one query term.
    pub fn new(stats: &TermStats) -> Self {
        TradWeight {
            term_weight: stats.wqf as f64 * rsj_weight(stats),
            avg_length: stats.avg_length,
        }
    }
}

impl Weight for TradWeight {
    fn posting_weight(&self, wdf: u64, doc_length: u64) -> f64 {
        if wdf == 0 {
            return 0.0;
        }
        let norm_length = if self.avg_length > 0.0 {
            doc_length as f64 / self.avg_length
        } else {
            1.0
        };
        self.term_weight * wdf as f64 / (wdf as f64 + norm_length)
    }

    fn max_weight(&self) -> f64 {
        self.term_weight
    }

    fn term_weight(&self) -> f64 {
        self.term_weight
    }
}

/// The zero scheme used for pure-boolean queries: every posting scores 0
/// and nothing is prunable on weight.
#[derive(Debug, Clone, Default)]
pub struct BoolWeight;

impl Weight for BoolWeight {
    fn posting_weight(&self, _wdf: u64, _doc_length: u64) -> f64 {
        0.0
    }

    fn max_weight(&self) -> f64 {
        0.0
    }

    fn term_weight(&self) -> f64 {
        0.0
    }
}

/// The Robertson/Sparck Jones relevance weight over (r, R, n, N).
///
/// The raw ratio gets the classic small-argument adjustment (arguments
/// below 2 map to `x/2 + 1`, floored at 1) so the logarithm is finite and
/// non-negative even for terms present in most of the collection.
pub fn rsj_weight(stats: &TermStats) -> f64 {
    let r = stats.rel_term_freq as f64;
    let big_r = stats.rset_size as f64;
    let n = stats.term_freq as f64;
    let big_n = stats.doc_count as f64;

    let numerator = (r + 0.5) * (big_n - n - big_r + r + 0.5);
    let denominator = (n - r + 0.5) * (big_r - r + 0.5);

    let mut x = numerator / denominator;
    if x < 2.0 {
        x = x / 2.0 + 1.0;
    }
    if x < 1.0 {
        x = 1.0;
    }
    x.ln()
}

/// The expand scoring function over the accumulated (r, R, n, N).
pub fn expand_weight(rel_term_freq: u64, rset_size: u64, term_freq: u64, doc_count: u64) -> f64 {
    rsj_weight(&TermStats {
        term_freq,
        doc_count,
        rel_term_freq,
        rset_size,
        ..TermStats::default()
    })
}
