//! The match collector: drives the root posting list and keeps the best
//! candidates under the caller's constraints.

use ahash::AHashMap;
use log::debug;

use crate::backend::Database;
use crate::document::DocId;
use crate::enquire::MatchDecider;
use crate::error::Result;
use crate::matcher::mset::{MSet, MSetItem};
use crate::postings::{next_or_replace, PostList};
use crate::query::PlannedQuery;
use crate::settings::MatchOptions;

/// Collects the ranked match set for one evaluation.
pub struct MatchCollector<'a> {
    db: &'a dyn Database,
    options: &'a MatchOptions,
    decider: Option<&'a dyn MatchDecider>,
}

impl<'a> MatchCollector<'a> {
    /// Create a collector for one evaluation.
    pub fn new(
        db: &'a dyn Database,
        options: &'a MatchOptions,
        decider: Option<&'a dyn MatchDecider>,
    ) -> Self {
        MatchCollector {
            db,
            options,
            decider,
        }
    }

    /// Traverse the planned tree and produce the result window
    /// `[first, first + max_items)`.
    pub fn collect(&self, planned: PlannedQuery, first: usize, max_items: usize) -> Result<MSet> {
        let PlannedQuery {
            mut root,
            term_info,
        } = planned;

        let capacity = first + max_items;
        let forward = self.options.sort_forward;
        let max_possible = root.max_weight();
        let cutoff_floor = self.options.percent_cutoff as f64 * max_possible / 100.0;

        let mut pool: Vec<MSetItem> = Vec::with_capacity(capacity.min(4096));
        let mut collapse_map: AHashMap<Vec<u8>, usize> = AHashMap::new();
        let mut threshold = cutoff_floor;
        let mut mbound = 0u64;
        let mut max_attained = 0.0f64;

        loop {
            next_or_replace(&mut root, threshold)?;
            if root.at_end() {
                break;
            }
            let doc_id = root.doc_id();
            let weight = root.weight();

            let mut document = None;
            if let Some(decider) = self.decider {
                let doc = self.db.document(doc_id)?;
                if !decider.accept(&doc) {
                    continue;
                }
                document = Some(doc);
            }
            mbound += 1;
            if weight > max_attained {
                max_attained = weight;
            }

            if self.options.percent_cutoff > 0
                && weight * 100.0 < self.options.percent_cutoff as f64 * max_possible
            {
                continue;
            }
            if capacity == 0 {
                continue;
            }

            // Collapse handling: one result per non-empty key value.
            let mut collapse_key = Vec::new();
            if let Some(key_no) = self.options.collapse_key {
                let doc = match document {
                    Some(doc) => doc,
                    None => self.db.document(doc_id)?,
                };
                collapse_key = doc.key(key_no).to_vec();
                if !collapse_key.is_empty() {
                    if let Some(&at) = collapse_map.get(&collapse_key) {
                        let held = &pool[at];
                        if !better(weight, doc_id, held.weight, held.doc_id, forward) {
                            continue;
                        }
                        remove_item(&mut pool, &mut collapse_map, at);
                    }
                }
            }

            if pool.len() >= capacity {
                let worst = worst_index(&pool, forward);
                let held = &pool[worst];
                if !better(weight, doc_id, held.weight, held.doc_id, forward) {
                    continue;
                }
                remove_item(&mut pool, &mut collapse_map, worst);
            }

            if !collapse_key.is_empty() {
                collapse_map.insert(collapse_key.clone(), pool.len());
            }
            pool.push(MSetItem {
                doc_id,
                weight,
                collapse_key,
            });

            if pool.len() == capacity {
                let worst = worst_index(&pool, forward);
                let new_threshold = pool[worst].weight.max(cutoff_floor);
                if new_threshold > threshold {
                    threshold = new_threshold;
                    if threshold > root.recalc_max_weight() {
                        debug!(
                            "match loop stops early: threshold {threshold} above remaining bound"
                        );
                        break;
                    }
                }
            }
        }

        pool.sort_by(|a, b| {
            b.weight.total_cmp(&a.weight).then_with(|| {
                if forward {
                    a.doc_id.cmp(&b.doc_id)
                } else {
                    b.doc_id.cmp(&a.doc_id)
                }
            })
        });
        let items = if first >= pool.len() {
            Vec::new()
        } else {
            pool.split_off(first)
        };
        debug!(
            "collected {} of {mbound} candidates (max attained {max_attained})",
            items.len()
        );
        Ok(MSet::new(
            items,
            first,
            mbound,
            max_attained,
            max_possible,
            term_info,
        ))
    }
}

/// Rank order: higher weight wins, doc-id breaks ties in the configured
/// direction.
fn better(a_weight: f64, a_doc: DocId, b_weight: f64, b_doc: DocId, forward: bool) -> bool {
    if a_weight != b_weight {
        return a_weight > b_weight;
    }
    if forward {
        a_doc < b_doc
    } else {
        a_doc > b_doc
    }
}

/// Index of the pool entry every other entry beats.
fn worst_index(pool: &[MSetItem], forward: bool) -> usize {
    let mut worst = 0;
    for (index, item) in pool.iter().enumerate().skip(1) {
        let held = &pool[worst];
        if better(held.weight, held.doc_id, item.weight, item.doc_id, forward) {
            worst = index;
        }
    }
    worst
}

/// Swap-remove a pool entry, keeping the collapse map's indices straight.
fn remove_item(pool: &mut Vec<MSetItem>, collapse_map: &mut AHashMap<Vec<u8>, usize>, at: usize) {
    let removed = pool.swap_remove(at);
    if !removed.collapse_key.is_empty() {
        collapse_map.remove(&removed.collapse_key);
    }
    if at < pool.len() {
        let moved = &pool[at];
        if !moved.collapse_key.is_empty() {
            collapse_map.insert(moved.collapse_key.clone(), at);
        }
    }
}
