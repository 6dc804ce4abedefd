//! Expand-engine behavior: ranking, deciders, query-term handling, and
//! multi-database term-frequency modes.

use std::sync::Arc;

use kopis::backend::{Database, InMemoryDatabase, MultiDatabase, WritableDatabase};
use kopis::document::DocumentContents;
use kopis::enquire::{Enquire, RSet};
use kopis::expand::{ESet, ExpandDecider};
use kopis::query::Query;
use kopis::settings::Settings;

fn populate(db: &InMemoryDatabase, docs: &[&[&str]]) {
    for terms in docs {
        let mut contents = DocumentContents::new();
        for (i, term) in terms.iter().enumerate() {
            contents.add_posting(*term, i as u32 + 1).unwrap();
        }
        db.add_document(&contents).unwrap();
    }
}

fn database(docs: &[&[&str]]) -> Arc<dyn Database> {
    let db = InMemoryDatabase::new();
    populate(&db, docs);
    Arc::new(db)
}

const SIMPLE_DOCS: &[&[&str]] = &[
    &["thi", "is", "a", "test", "paragraph"],
    &["thi", "paragraph", "mention", "word"],
    &["thi", "is", "anoth", "paragraph", "entir"],
    &["thi", "paragraph", "talk", "about", "word"],
    &["thi", "one", "is", "anoth", "simpl"],
    &["thi", "final", "paragraph", "is", "last"],
];

fn simple_enquire() -> Enquire {
    Enquire::new(database(SIMPLE_DOCS))
}

fn rset_of(docs: &[u64]) -> RSet {
    let mut rset = RSet::new();
    for &doc in docs {
        rset.add_document(doc);
    }
    rset
}

#[test]
fn test_expand_max_items() {
    let enquire = simple_enquire();
    let eset = enquire.get_eset(1, &rset_of(&[1, 2]), None, None).unwrap();
    assert_eq!(eset.items.len(), 1);
}

#[test]
fn test_expand_prefers_terms_shared_by_relevant_docs() {
    let enquire = simple_enquire();
    let eset = enquire.get_eset(100, &rset_of(&[3, 5]), None, None).unwrap();
    assert!(!eset.items.is_empty());

    // "anoth" is in both relevant documents and in no others; it must
    // outrank every term occurring in only one of them.
    assert_eq!(eset.items[0].term, "anoth");
    for pair in eset.items.windows(2) {
        assert!(pair[0].weight >= pair[1].weight);
        if pair[0].weight == pair[1].weight {
            assert!(pair[0].term < pair[1].term);
        }
    }
}

struct EvenByteSum;

impl ExpandDecider for EvenByteSum {
    fn accept(&self, term: &str) -> bool {
        let sum: u32 = term.bytes().map(u32::from).sum();
        sum % 2 == 0
    }
}

#[test]
fn test_expand_decider_equals_hand_filtering() {
    let enquire = simple_enquire();
    let rset = rset_of(&[1, 2]);
    let functor = EvenByteSum;

    let unfiltered = enquire.get_eset(1000, &rset, None, None).unwrap();
    let expected: Vec<_> = unfiltered
        .items
        .iter()
        .filter(|item| functor.accept(&item.term))
        .cloned()
        .collect();

    let filtered = enquire
        .get_eset(expected.len(), &rset, None, Some(&functor))
        .unwrap();
    assert_eq!(filtered.items, expected);
}

#[test]
fn test_expand_can_drop_query_terms() {
    let mut enquire = simple_enquire();
    enquire.set_query(&Query::term("thi"));
    let rset = rset_of(&[1, 2]);

    let with_query_terms = enquire.get_eset(1000, &rset, None, None).unwrap();
    assert!(with_query_terms.items.iter().any(|item| item.term == "thi"));

    let mut settings = Settings::new();
    settings.set("expand_use_query_terms", false);
    let without = enquire
        .get_eset(1000, &rset, Some(&settings), None)
        .unwrap();
    assert!(without.items.iter().all(|item| item.term != "thi"));
}

#[test]
fn test_term_weight_stable_across_equivalent_rsets() {
    // "anoth" appears in documents 3 and 5; judging either one alone
    // produces the same statistics and hence the same weight.
    let enquire = simple_enquire();
    let eset_a = enquire.get_eset(1000, &rset_of(&[3]), None, None).unwrap();
    let eset_b = enquire.get_eset(1000, &rset_of(&[5]), None, None).unwrap();

    let weight_of = |eset: &ESet| {
        eset.items
            .iter()
            .find(|item| item.term == "anoth")
            .map(|item| item.weight)
            .unwrap()
    };
    let wa = weight_of(&eset_a);
    let wb = weight_of(&eset_b);
    assert!(wa > 0.0);
    assert_eq!(wa, wb);
}

const SUB_A: &[&[&str]] = &[&["shared", "alpha"], &["shared", "beta"]];
const SUB_B: &[&[&str]] = &[&["shared", "gamma"], &["delta", "alpha"]];

/// Union ids: A1=1, A2=2, B1=3, B2=4. Multi (stride 2): A1=1, B1=2,
/// A2=3, B2=4.
fn multi_pair() -> Arc<dyn Database> {
    Arc::new(MultiDatabase::new(vec![database(SUB_A), database(SUB_B)]).unwrap())
}

fn union_db() -> Arc<dyn Database> {
    let db = InMemoryDatabase::new();
    populate(&db, SUB_A);
    populate(&db, SUB_B);
    Arc::new(db)
}

#[test]
fn test_exact_termfreq_matches_single_collection() {
    let union_enquire = Enquire::new(union_db());
    let union_eset = union_enquire
        .get_eset(1000, &rset_of(&[1, 3]), None, None)
        .unwrap();

    let mut settings = Settings::new();
    settings.set("expand_use_exact_termfreq", true);
    let multi_enquire = Enquire::new(multi_pair());
    let exact_eset = multi_enquire
        .get_eset(1000, &rset_of(&[1, 2]), Some(&settings), None)
        .unwrap();

    assert_eq!(union_eset.items.len(), exact_eset.items.len());
    for (a, b) in union_eset.items.iter().zip(exact_eset.items.iter()) {
        assert_eq!(a.term, b.term);
        assert_eq!(a.weight, b.weight);
    }
}

#[test]
fn test_approximate_termfreq_differs_but_covers_the_same_terms() {
    let union_enquire = Enquire::new(union_db());
    let union_eset = union_enquire
        .get_eset(1000, &rset_of(&[1, 3]), None, None)
        .unwrap();

    let multi_enquire = Enquire::new(multi_pair());
    let approx_eset = multi_enquire
        .get_eset(1000, &rset_of(&[1, 2]), None, None)
        .unwrap();

    assert_eq!(union_eset.items.len(), approx_eset.items.len());

    let mut union_terms: Vec<_> = union_eset.items.iter().map(|i| i.term.clone()).collect();
    let mut approx_terms: Vec<_> = approx_eset.items.iter().map(|i| i.term.clone()).collect();
    union_terms.sort();
    approx_terms.sort();
    assert_eq!(union_terms, approx_terms);

    // "alpha" was contributed only through component 0, but also exists
    // in component 1, so its approximate frequency undercounts and the
    // weight shifts.
    let weight_of = |eset: &ESet, term: &str| {
        eset.items
            .iter()
            .find(|item| item.term == term)
            .map(|item| item.weight)
            .unwrap()
    };
    assert_ne!(
        weight_of(&union_eset, "alpha"),
        weight_of(&approx_eset, "alpha")
    );
    // "shared" is contributed from both components; its sum is exact.
    assert_eq!(
        weight_of(&union_eset, "shared"),
        weight_of(&approx_eset, "shared")
    );
}
