//! Algebraic properties of record merging: idempotence, commutativity,
//! associativity, and monotone confidence. These are what make partial,
//! out-of-order, and retried finding arrival safe.

use dossier::{merge_all, merge_records, Normalizer, PersonRecord, RawFinding, ScoringPolicy};
use serde_json::json;

fn policy() -> ScoringPolicy {
    ScoringPolicy::default()
}

fn finding(source: &str, person: serde_json::Value) -> RawFinding {
    RawFinding::new(source, "person_search", json!({ "persons": [person] }))
}

fn normalize_one(finding: &RawFinding) -> PersonRecord {
    let records = Normalizer::new(policy()).normalize(finding);
    assert_eq!(records.len(), 1);
    records.into_iter().next().unwrap()
}

fn sample_records() -> (PersonRecord, PersonRecord, PersonRecord) {
    let a = normalize_one(&finding(
        "truepeoplesearch",
        json!({
            "name": "John Smith",
            "age": 43,
            "location": "Austin, TX",
            "addresses": ["123 Main St, Austin, TX 78701"],
            "relatives": ["Jane Smith"]
        }),
    ));
    let b = normalize_one(&finding(
        "fastpeoplesearch",
        json!({
            "name": "John Smith",
            "age": 42,
            "location": "Austin, TX",
            "phones": ["512-555-0100"],
            "emails": ["jsmith@example.com"]
        }),
    ));
    let c = normalize_one(&finding(
        "whitepages",
        json!({
            "name": "John Smith",
            "location": "Austin, TX",
            "addresses": ["123 MAIN ST, Austin, TX"],
            "relatives": ["jane smith", "Robert Smith"]
        }),
    ));
    (a, b, c)
}

fn sorted_keys(record: &PersonRecord) -> (Vec<String>, Vec<String>, Vec<String>, Vec<String>) {
    let mut addresses: Vec<String> = record
        .addresses
        .iter()
        .map(dossier::Address::location_key)
        .collect();
    addresses.sort();
    let mut phones: Vec<String> = record.phones.iter().map(|p| p.number.clone()).collect();
    phones.sort();
    let mut emails: Vec<String> = record.emails.iter().map(dossier::Email::key).collect();
    emails.sort();
    let mut relatives: Vec<String> = record
        .relatives
        .iter()
        .map(|r| r.to_lowercase())
        .collect();
    relatives.sort();
    (addresses, phones, emails, relatives)
}

#[test]
fn merge_with_self_is_identity_on_content() {
    let (a, _, _) = sample_records();
    let merged = merge_records(vec![a.clone(), a.clone()], &policy()).unwrap();

    assert_eq!(sorted_keys(&merged), sorted_keys(&a));
    assert_eq!(merged.distinct_source_count(), a.distinct_source_count());

    let mut solo = a;
    dossier::recompute_scores(&mut solo, &policy());
    assert!(
        (merged.scores.overall_confidence.value() - solo.scores.overall_confidence.value()).abs()
            < f32::EPSILON
    );
}

#[test]
fn merge_is_commutative_on_outcome() {
    let (a, b, _) = sample_records();
    let ab = merge_records(vec![a.clone(), b.clone()], &policy()).unwrap();
    let ba = merge_records(vec![b, a], &policy()).unwrap();

    assert_eq!(sorted_keys(&ab), sorted_keys(&ba));
    assert_eq!(ab.id, ba.id);
    assert_eq!(ab.age, ba.age);
    assert!(
        (ab.scores.overall_confidence.value() - ba.scores.overall_confidence.value()).abs() < 1e-6
    );
}

#[test]
fn merge_is_associative_on_outcome() {
    let (a, b, c) = sample_records();

    let ab_then_c = merge_records(
        vec![
            merge_records(vec![a.clone(), b.clone()], &policy()).unwrap(),
            c.clone(),
        ],
        &policy(),
    )
    .unwrap();
    let bc_then_a = merge_records(
        vec![merge_records(vec![b, c], &policy()).unwrap(), a],
        &policy(),
    )
    .unwrap();

    assert_eq!(sorted_keys(&ab_then_c), sorted_keys(&bc_then_a));
    assert_eq!(ab_then_c.id, bc_then_a.id);
    assert!(
        (ab_then_c.scores.overall_confidence.value()
            - bc_then_a.scores.overall_confidence.value())
        .abs()
            < 1e-6
    );
}

#[test]
fn arrival_order_does_not_change_merge_all_outcome() {
    let (a, b, c) = sample_records();

    let forward = merge_all(vec![a.clone(), b.clone(), c.clone()], &policy());
    let backward = merge_all(vec![c, b, a], &policy());

    assert_eq!(forward.len(), 1);
    assert_eq!(backward.len(), 1);
    assert_eq!(sorted_keys(&forward[0]), sorted_keys(&backward[0]));
    assert_eq!(forward[0].id, backward[0].id);
}

#[test]
fn corroborating_sources_only_raise_confidence() {
    let (a, b, c) = sample_records();

    let mut solo = a.clone();
    dossier::recompute_scores(&mut solo, &policy());
    let one = solo.scores.overall_confidence.value();

    let two = merge_records(vec![a.clone(), b.clone()], &policy())
        .unwrap()
        .scores
        .overall_confidence
        .value();
    let three = merge_records(vec![a, b, c], &policy())
        .unwrap()
        .scores
        .overall_confidence
        .value();

    assert!(two >= one);
    assert!(three >= two);
}

#[test]
fn dedup_is_case_and_whitespace_insensitive() {
    let (a, _, c) = sample_records();
    // a and c both carry 123 Main St, Austin with differing case.
    let merged = merge_records(vec![a, c], &policy()).unwrap();
    let count = merged
        .addresses
        .iter()
        .filter(|addr| addr.location_key() == "123 main st|austin")
        .count();
    assert_eq!(count, 1);
    // "Jane Smith" vs "jane smith" collapse to one relative.
    assert_eq!(
        merged
            .relatives
            .iter()
            .filter(|r| r.to_lowercase() == "jane smith")
            .count(),
        1
    );
}
