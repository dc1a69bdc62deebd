//! Record merging.
//!
//! Records bucketed under the same identity key are folded into one,
//! deduplicating every collection by its natural key and unioning source
//! attribution. The outcome is a pure function of the merged evidence:
//! associative, commutative, and idempotent, which is what makes
//! out-of-order arrival and retried findings safe.

use std::collections::BTreeSet;

use crate::matching::{identity_key, merge_compatible};
use crate::policy::ScoringPolicy;
use crate::record::{normalize_key, PersonRecord, RecordId};
use crate::score;

/// Folds `other` into `acc`, preserving every dedup invariant.
///
/// Scores are not finalized here; [`merge_records`] recomputes them once
/// the whole bucket is folded.
fn merge_pair(mut acc: PersonRecord, other: PersonRecord, _policy: &ScoringPolicy) -> PersonRecord {
    // Earliest creation wins so re-merges are stable.
    if other.created_at < acc.created_at {
        acc.created_at = other.created_at;
    }

    for (source, reference) in other.source_ids {
        acc.source_ids.entry(source).or_insert(reference);
    }

    match (&acc.name.middle, &other.name.middle) {
        (None, Some(middle)) => acc.name.middle = Some(middle.clone()),
        (Some(current), Some(candidate)) => {
            // Prefer the more specific middle name, deterministically.
            if candidate.len() > current.len()
                || (candidate.len() == current.len() && candidate < current)
            {
                acc.name.middle = Some(candidate.clone());
            }
        }
        _ => {}
    }
    for alias in &other.name.aliases {
        acc.name.add_alias(alias.clone());
    }
    if acc.name.full().to_lowercase() != other.name.full().to_lowercase() {
        acc.name.add_alias(other.name.full());
    }

    // Ages disagree across sources; take the smallest reported value so
    // the outcome does not depend on merge order.
    match (acc.age, other.age) {
        (None, Some(age)) => {
            acc.age = Some(age);
        }
        (Some(current), Some(candidate)) if candidate < current => {
            acc.age = Some(candidate);
        }
        _ => {}
    }
    if let Some(age) = acc.age {
        acc.age_band = Some(crate::record::AgeBand::from_age(age));
    }

    acc.current_location = match (acc.current_location.take(), other.current_location) {
        (Some(a), Some(b)) => {
            let a_rank = (a.confidence.value(), normalize_key(&a.city));
            let b_rank = (b.confidence.value(), normalize_key(&b.city));
            if b_rank.0 > a_rank.0 || (b_rank.0 == a_rank.0 && b_rank.1 < a_rank.1) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (location, None) => location,
        (None, location) => location,
    };

    for address in other.addresses {
        acc.push_address(address);
    }
    for phone in other.phones {
        acc.push_phone(phone);
    }
    for email in other.emails {
        acc.push_email(email);
    }
    for profile in other.social_profiles {
        acc.push_social_profile(profile);
    }
    for relative in other.relatives {
        acc.push_relative(relative);
    }
    for co_resident in other.co_residents {
        acc.push_co_resident(co_resident);
    }

    acc
}

/// Merges a set of records already bucketed as the same identity.
///
/// Returns `None` for an empty set. A multi-record merge gets the
/// deterministic id for its identity bucket, so re-running the pipeline
/// over the same findings reproduces the same merged id.
#[must_use]
pub fn merge_records(records: Vec<PersonRecord>, policy: &ScoringPolicy) -> Option<PersonRecord> {
    let mut iter = records.into_iter();
    let first = iter.next()?;
    let merged_any = iter.len() > 0;
    let mut merged = iter.fold(first, |acc, record| merge_pair(acc, record, policy));
    if merged_any {
        merged.id = RecordId::for_identity(&bucket_discriminator(&merged));
    }
    score::recompute_scores(&mut merged, policy);
    Some(merged)
}

/// Buckets records by identity key and merges each bucket.
///
/// Buckets whose members carry conflicting city evidence with no shared
/// phone, email, or address are split rather than force-merged: both
/// candidates survive as separate, lower-confidence results.
#[must_use]
pub fn merge_all(records: Vec<PersonRecord>, policy: &ScoringPolicy) -> Vec<PersonRecord> {
    let mut buckets: Vec<(String, Vec<PersonRecord>)> = Vec::new();
    for record in records {
        let key = identity_key(&record);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(record),
            None => buckets.push((key, vec![record])),
        }
    }

    let mut merged = Vec::new();
    for (_, bucket) in buckets {
        for group in split_incompatible(bucket) {
            if let Some(record) = merge_records(group, policy) {
                merged.push(record);
            }
        }
    }
    merged
}

fn split_incompatible(bucket: Vec<PersonRecord>) -> Vec<Vec<PersonRecord>> {
    let mut groups: Vec<Vec<PersonRecord>> = Vec::new();
    for record in bucket {
        let target = groups
            .iter_mut()
            .find(|group| group.iter().all(|member| merge_compatible(member, &record)));
        match target {
            Some(group) => group.push(record),
            None => groups.push(vec![record]),
        }
    }
    groups
}

/// Identity key plus the smallest known city, so split buckets of a
/// common name never collide on the same deterministic id.
fn bucket_discriminator(record: &PersonRecord) -> String {
    let cities: BTreeSet<String> = record
        .addresses
        .iter()
        .map(|a| normalize_key(&a.city))
        .chain(
            record
                .current_location
                .iter()
                .map(|l| normalize_key(&l.city)),
        )
        .collect();
    let city = cities.into_iter().next().unwrap_or_default();
    format!("{}|{}", identity_key(record), city)
}
