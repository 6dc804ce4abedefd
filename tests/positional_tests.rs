//! PHRASE and NEAR window behavior on a positional fixture.

use std::sync::Arc;

use kopis::backend::{InMemoryDatabase, WritableDatabase};
use kopis::document::DocumentContents;
use kopis::enquire::Enquire;
use kopis::matcher::MSet;
use kopis::query::{Op, Query};

/// Position layout:
///   doc 1: "phrase" at 1, "near" at 3   (ordered, span 2)
///   doc 2: "phrase" at 1, "near" at 6   (ordered, span 5)
///   doc 3: "near" at 2, "phrase" at 3   (reversed, span 1)
///   doc 4: "leav" 1, "fridg" 2, "on" 3  (ordered triple)
///   doc 5: "on" 1, "leav" 2, "fridg" 3  (rotated triple)
fn phrase_database() -> Arc<InMemoryDatabase> {
    let db = InMemoryDatabase::new();
    let layouts: &[&[(&str, u32)]] = &[
        &[("phrase", 1), ("filler", 2), ("near", 3)],
        &[("phrase", 1), ("stuff", 3), ("near", 6)],
        &[("near", 2), ("phrase", 3)],
        &[("leav", 1), ("fridg", 2), ("on", 3)],
        &[("on", 1), ("leav", 2), ("fridg", 3)],
    ];
    for layout in layouts {
        let mut contents = DocumentContents::new();
        for (term, position) in *layout {
            contents.add_posting(*term, *position).unwrap();
        }
        db.add_document(&contents).unwrap();
    }
    Arc::new(db)
}

fn positional_mset(op: Op, terms: &[&str], window: u32) -> MSet {
    let children = terms.iter().map(|term| Query::term(*term)).collect();
    let mut query = Query::compound_with_window(op, children, window).unwrap();
    query.set_bool(true);

    let mut enquire = Enquire::new(phrase_database());
    enquire.set_query(&query);
    enquire.get_mset(0, 10, None, None, None).unwrap()
}

fn doc_ids(mset: &MSet) -> Vec<u64> {
    mset.items.iter().map(|item| item.doc_id).collect()
}

#[test]
fn test_phrase_window_boundaries() {
    assert_eq!(doc_ids(&positional_mset(Op::Phrase, &["phrase", "near"], 2)), Vec::<u64>::new());
    assert_eq!(doc_ids(&positional_mset(Op::Phrase, &["phrase", "near"], 3)), vec![1]);
    assert_eq!(doc_ids(&positional_mset(Op::Phrase, &["phrase", "near"], 5)), vec![1]);
    assert_eq!(
        doc_ids(&positional_mset(Op::Phrase, &["phrase", "near"], 6)),
        vec![1, 2]
    );
}

#[test]
fn test_near_window_boundaries() {
    assert_eq!(doc_ids(&positional_mset(Op::Near, &["phrase", "near"], 2)), vec![3]);
    assert_eq!(
        doc_ids(&positional_mset(Op::Near, &["phrase", "near"], 3)),
        vec![1, 3]
    );
    assert_eq!(
        doc_ids(&positional_mset(Op::Near, &["phrase", "near"], 6)),
        vec![1, 2, 3]
    );
}

#[test]
fn test_phrase_of_three_terms_requires_order() {
    assert_eq!(
        doc_ids(&positional_mset(Op::Phrase, &["leav", "fridg", "on"], 3)),
        vec![4]
    );
    // A huge window still cannot fix the rotated document.
    assert_eq!(
        doc_ids(&positional_mset(Op::Phrase, &["leav", "fridg", "on"], 999_999_999)),
        vec![4]
    );
}

#[test]
fn test_near_of_three_terms_allows_any_order() {
    assert_eq!(
        doc_ids(&positional_mset(Op::Near, &["leav", "fridg", "on"], 3)),
        vec![4, 5]
    );
    assert_eq!(
        doc_ids(&positional_mset(Op::Near, &["leav", "fridg", "on"], 2)),
        Vec::<u64>::new()
    );
}

#[test]
fn test_phrase_over_operators_reduces_to_empty() {
    // Positional children must be plain terms; anything else carries no
    // positions and empties the whole node.
    let inner = Query::pair(Op::And, Query::term("phrase"), Query::term("near")).unwrap();
    let mut query =
        Query::compound_with_window(Op::Phrase, vec![inner, Query::term("filler")], 5).unwrap();
    query.set_bool(true);

    let mut enquire = Enquire::new(phrase_database());
    enquire.set_query(&query);
    let mset = enquire.get_mset(0, 10, None, None, None).unwrap();
    assert!(mset.items.is_empty());
}

#[test]
fn test_phrase_with_absent_term_is_empty() {
    assert_eq!(
        doc_ids(&positional_mset(Op::Phrase, &["phrase", "flibble"], 5)),
        Vec::<u64>::new()
    );
}

#[test]
fn test_weighted_phrase_scores_like_a_conjunction() {
    let children = vec![Query::term("phrase"), Query::term("near")];
    let query = Query::compound_with_window(Op::Phrase, children, 3).unwrap();

    let mut enquire = Enquire::new(phrase_database());
    enquire.set_query(&query);
    let mset = enquire.get_mset(0, 10, None, None, None).unwrap();

    assert_eq!(doc_ids(&mset), vec![1]);
    assert!(mset.items[0].weight > 0.0);
    assert!(mset.items[0].weight <= mset.max_possible);
}
