//! Candidate matching.
//!
//! Two different notions of "same person" live here, deliberately kept
//! apart:
//!
//! - [`identity_key`] is the coarse key used to bucket records for merging.
//!   It is cheap and intentionally blunt; common names can collide, which
//!   is why [`merge_compatible`] guards the bucket with location evidence.
//! - [`match_score`] is the continuous ranking score used to order
//!   candidates against a search query. It never merges anything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::policy::ScoringPolicy;
use crate::record::{normalize_key, Address, Email, PersonRecord};

/// An inclusive age range in a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    /// Creates a validated age range.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidAgeRange` if min exceeds max.
    pub fn new(min: u8, max: u8) -> Result<Self, ValidationError> {
        if min > max {
            return Err(ValidationError::InvalidAgeRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Returns true if the age falls inside the range.
    #[must_use]
    pub const fn contains(&self, age: u8) -> bool {
        age >= self.min && age <= self.max
    }

    /// Distance in years from the nearest range boundary (0 inside).
    #[must_use]
    pub const fn distance(&self, age: u8) -> u8 {
        if age < self.min {
            self.min - age
        } else if age > self.max {
            age - self.max
        } else {
            0
        }
    }
}

/// A search request that triggers a graph build or enrichment round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,

    #[serde(default)]
    pub known_relatives: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Maximum candidates returned by ranking.
    pub limit: usize,
}

impl PersonQuery {
    /// Starts building a query.
    #[must_use]
    pub fn builder() -> PersonQueryBuilder {
        PersonQueryBuilder::new()
    }
}

/// Builder for search queries.
///
/// A query with no name, phone, or email has nothing to fan out on and is
/// rejected before any lookup happens.
#[derive(Debug, Clone, Default)]
pub struct PersonQueryBuilder {
    first_name: Option<String>,
    last_name: Option<String>,
    middle_name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    age_range: Option<(u8, u8)>,
    known_relatives: Vec<String>,
    phone: Option<String>,
    email: Option<String>,
    limit: Option<usize>,
}

impl PersonQueryBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first name.
    #[must_use]
    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = some_nonempty(value);
        self
    }

    /// Sets the last name.
    #[must_use]
    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = some_nonempty(value);
        self
    }

    /// Sets the middle name.
    #[must_use]
    pub fn middle_name(mut self, value: impl Into<String>) -> Self {
        self.middle_name = some_nonempty(value);
        self
    }

    /// Sets the city.
    #[must_use]
    pub fn city(mut self, value: impl Into<String>) -> Self {
        self.city = some_nonempty(value);
        self
    }

    /// Sets the state.
    #[must_use]
    pub fn state(mut self, value: impl Into<String>) -> Self {
        self.state = some_nonempty(value);
        self
    }

    /// Sets the inclusive age range.
    #[must_use]
    pub fn age_range(mut self, min: u8, max: u8) -> Self {
        self.age_range = Some((min, max));
        self
    }

    /// Adds a known relative name.
    #[must_use]
    pub fn known_relative(mut self, name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        if !name.is_empty() {
            self.known_relatives.push(name);
        }
        self
    }

    /// Sets a phone number signal.
    #[must_use]
    pub fn phone(mut self, value: impl Into<String>) -> Self {
        self.phone = some_nonempty(value);
        self
    }

    /// Sets an email signal.
    #[must_use]
    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = some_nonempty(value);
        self
    }

    /// Sets the maximum number of ranked candidates (default: 10).
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds the query.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingQuerySignal` when no name, phone,
    /// or email is present, and `ValidationError::InvalidAgeRange` for an
    /// inverted range.
    pub fn build(self) -> Result<PersonQuery, ValidationError> {
        if self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
        {
            return Err(ValidationError::MissingQuerySignal);
        }
        let age_range = self
            .age_range
            .map(|(min, max)| AgeRange::new(min, max))
            .transpose()?;
        Ok(PersonQuery {
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            city: self.city,
            state: self.state,
            age_range,
            known_relatives: self.known_relatives,
            phone: self.phone,
            email: self.email,
            limit: self.limit.unwrap_or(10),
        })
    }
}

fn some_nonempty(value: impl Into<String>) -> Option<String> {
    let value = value.into().trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// The coarse identity key used to bucket records for merging:
/// normalized lowercase `first_last`.
#[must_use]
pub fn identity_key(record: &PersonRecord) -> String {
    key_from_parts(&record.name.first, &record.name.last)
}

/// Identity key for a freeform full-name string, using the positional
/// first-token/last-token heuristic.
#[must_use]
pub fn identity_key_for(full_name: &str) -> String {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => String::new(),
        [only] => key_from_parts(only, ""),
        [first, .., last] => key_from_parts(first, last),
    }
}

fn key_from_parts(first: &str, last: &str) -> String {
    format!("{}_{}", normalize_key(first), normalize_key(last))
}

/// Continuous [0,1] ranking score of a candidate record against a query.
///
/// Monotone in evidence: corroboration and agreement only ever add.
#[must_use]
pub fn match_score(record: &PersonRecord, query: &PersonQuery, policy: &ScoringPolicy) -> f32 {
    let w = &policy.match_weights;

    let mut name_location = w.base;
    if let Some(first) = query.first_name.as_deref() {
        let candidate = record.name.first.as_str();
        if candidate.eq_ignore_ascii_case(first) {
            name_location += w.first_name_exact;
        } else if prefix_matches(candidate, first) {
            name_location += w.first_name_prefix;
        }
    }
    if let Some(last) = query.last_name.as_deref() {
        if record.name.last.eq_ignore_ascii_case(last) {
            name_location += w.last_name_exact;
        }
    }
    if let Some(city) = query.city.as_deref() {
        if record_cities(record).contains(&normalize_key(city)) {
            name_location += w.city;
        }
    }
    if let Some(state) = query.state.as_deref() {
        if record_states(record).contains(&normalize_key(state)) {
            name_location += w.state;
        }
    }
    let extra_sources = record.distinct_source_count().saturating_sub(1);
    #[allow(clippy::cast_precision_loss)]
    let corroboration = (w.per_extra_source * extra_sources as f32).min(w.extra_source_cap);
    name_location = (name_location + corroboration).clamp(0.0, 1.0);

    let age_band = match (query.age_range, record.age) {
        (Some(range), Some(age)) => {
            if range.contains(age) {
                1.0
            } else {
                (1.0 - w.age_decay_per_year * f32::from(range.distance(age))).max(0.0)
            }
        }
        _ => w.age_unknown_component,
    };

    let blended = w.blend_name_location * name_location
        + w.blend_age_band * age_band
        + w.blend_baseline * w.base;
    blended.clamp(0.0, 1.0)
}

fn prefix_matches(a: &str, b: &str) -> bool {
    let a: String = a.chars().take(3).collect::<String>().to_lowercase();
    let b: String = b.chars().take(3).collect::<String>().to_lowercase();
    !a.is_empty() && a.len() == 3 && a == b
}

fn record_cities(record: &PersonRecord) -> BTreeSet<String> {
    let mut cities: BTreeSet<String> = record
        .addresses
        .iter()
        .map(|a| normalize_key(&a.city))
        .collect();
    if let Some(location) = &record.current_location {
        cities.insert(normalize_key(&location.city));
    }
    cities
}

fn record_states(record: &PersonRecord) -> BTreeSet<String> {
    let mut states: BTreeSet<String> = record
        .addresses
        .iter()
        .filter_map(|a| a.state.as_deref())
        .map(normalize_key)
        .collect();
    if let Some(state) = record
        .current_location
        .as_ref()
        .and_then(|l| l.state.as_deref())
    {
        states.insert(normalize_key(state));
    }
    states
}

/// A candidate ranked against a query.
#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub record: &'a PersonRecord,
    pub score: f32,
}

/// Ranks candidate records against a query, best first, truncated to the
/// query's limit. Ties break on identity key for determinism.
#[must_use]
pub fn rank_candidates<'a>(
    records: &'a [PersonRecord],
    query: &PersonQuery,
    policy: &ScoringPolicy,
) -> Vec<RankedCandidate<'a>> {
    let mut ranked: Vec<RankedCandidate<'a>> = records
        .iter()
        .map(|record| RankedCandidate {
            record,
            score: match_score(record, query, policy),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| identity_key(a.record).cmp(&identity_key(b.record)))
    });
    ranked.truncate(query.limit);
    ranked
}

/// Guard against false merges of common names.
///
/// Records sharing an identity key may still be clearly distinct people:
/// conflicting city evidence with no shared phone, email, or address means
/// they stay separate and are returned as competing lower-confidence
/// candidates instead of being forced together.
#[must_use]
pub fn merge_compatible(a: &PersonRecord, b: &PersonRecord) -> bool {
    let a_cities = record_cities(a);
    let b_cities = record_cities(b);
    if a_cities.is_empty() || b_cities.is_empty() {
        return true;
    }
    if a_cities.intersection(&b_cities).next().is_some() {
        return true;
    }
    shares_hard_key(a, b)
}

fn shares_hard_key(a: &PersonRecord, b: &PersonRecord) -> bool {
    let b_phones: BTreeSet<&str> = b.phones.iter().map(|p| p.number.as_str()).collect();
    if a.phones.iter().any(|p| b_phones.contains(p.number.as_str())) {
        return true;
    }
    let b_emails: BTreeSet<String> = b.emails.iter().map(Email::key).collect();
    if a.emails.iter().any(|e| b_emails.contains(&e.key())) {
        return true;
    }
    let b_addresses: BTreeSet<String> = b.addresses.iter().map(Address::location_key).collect();
    a.addresses
        .iter()
        .any(|addr| b_addresses.contains(&addr.location_key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::Confidence;
    use crate::record::PersonName;

    fn record(first: &str, last: &str, city: Option<&str>) -> PersonRecord {
        let mut rec = PersonRecord::new(PersonName::new(first, last).unwrap());
        if let Some(city) = city {
            rec.current_location = Some(crate::record::CurrentLocation {
                city: city.to_string(),
                state: Some("TX".to_string()),
                country: None,
                confidence: Confidence::clamped(0.6),
            });
        }
        rec
    }

    fn query(first: &str, last: &str) -> PersonQuery {
        PersonQuery::builder()
            .first_name(first)
            .last_name(last)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_a_signal() {
        let err = PersonQuery::builder().city("Austin").build();
        assert!(matches!(err, Err(ValidationError::MissingQuerySignal)));

        assert!(PersonQuery::builder().phone("512-555-0100").build().is_ok());
        assert!(PersonQuery::builder().email("a@b.c").build().is_ok());
        assert!(PersonQuery::builder().last_name("Smith").build().is_ok());
    }

    #[test]
    fn test_builder_rejects_inverted_age_range() {
        let err = PersonQuery::builder()
            .first_name("Sam")
            .age_range(40, 30)
            .build();
        assert!(matches!(err, Err(ValidationError::InvalidAgeRange { .. })));
    }

    #[test]
    fn test_builder_default_limit() {
        let q = query("John", "Smith");
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn test_identity_key_normalizes() {
        let rec = record("John", "Smith", None);
        assert_eq!(identity_key(&rec), "john_smith");
    }

    #[test]
    fn test_identity_key_for_full_name() {
        assert_eq!(identity_key_for("John Jacob Smith"), "john_smith");
        assert_eq!(identity_key_for("Cher"), "cher_");
        assert_eq!(identity_key_for(""), "");
    }

    #[test]
    fn test_age_range_distance() {
        let range = AgeRange::new(30, 35).unwrap();
        assert_eq!(range.distance(32), 0);
        assert_eq!(range.distance(28), 2);
        assert_eq!(range.distance(40), 5);
    }

    #[test]
    fn test_exact_full_match_scores_top_tier() {
        let policy = ScoringPolicy::default();
        let rec = record("John", "Smith", Some("Austin"));
        let q = PersonQuery::builder()
            .first_name("John")
            .last_name("Smith")
            .city("Austin")
            .state("TX")
            .build()
            .unwrap();
        let score = match_score(&rec, &q, &policy);
        assert!(score >= 0.8, "expected top-tier score, got {score}");
    }

    #[test]
    fn test_prefix_match_scores_between() {
        let policy = ScoringPolicy::default();
        let exact = match_score(&record("John", "Smith", None), &query("John", "Smith"), &policy);
        let prefix =
            match_score(&record("Johnathan", "Smith", None), &query("John", "Smith"), &policy);
        let miss = match_score(&record("Peter", "Smith", None), &query("John", "Smith"), &policy);
        assert!(exact > prefix);
        assert!(prefix > miss);
    }

    #[test]
    fn test_age_outside_range_is_penalized_not_rejected() {
        let policy = ScoringPolicy::default();
        let mut rec = record("Sam", "Lee", None);
        rec.set_age(28);
        let q = PersonQuery::builder()
            .first_name("Sam")
            .last_name("Lee")
            .age_range(30, 35)
            .build()
            .unwrap();
        let penalized = match_score(&rec, &q, &policy);

        let mut in_range = record("Sam", "Lee", None);
        in_range.set_age(32);
        let full = match_score(&in_range, &q, &policy);

        assert!(penalized < full);
        assert!(penalized > 0.0);
    }

    #[test]
    fn test_corroborating_sources_never_lower_score() {
        let policy = ScoringPolicy::default();
        let q = query("John", "Smith");
        let mut rec = record("John", "Smith", None);
        let single = match_score(&rec, &q, &policy);
        rec.add_source_ref("truepeoplesearch", "a");
        rec.add_source_ref("fastpeoplesearch", "b");
        rec.add_source_ref("whitepages", "c");
        let multi = match_score(&rec, &q, &policy);
        assert!(multi >= single);
    }

    #[test]
    fn test_multi_source_bonus_is_capped() {
        let policy = ScoringPolicy::default();
        let q = query("John", "Smith");
        let mut four = record("John", "Smith", None);
        for name in ["a", "b", "c", "d"] {
            four.add_source_ref(name, "ref");
        }
        let mut eight = four.clone();
        for name in ["e", "f", "g", "h"] {
            eight.add_source_ref(name, "ref");
        }
        let four_score = match_score(&four, &q, &policy);
        let eight_score = match_score(&eight, &q, &policy);
        assert!((four_score - eight_score).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rank_candidates_orders_and_limits() {
        let policy = ScoringPolicy::default();
        let records = vec![
            record("Peter", "Smith", None),
            record("John", "Smith", None),
            record("Johnathan", "Smith", None),
        ];
        let q = PersonQuery::builder()
            .first_name("John")
            .last_name("Smith")
            .limit(2)
            .build()
            .unwrap();
        let ranked = rank_candidates(&records, &q, &policy);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].record.name.first, "John");
        assert_eq!(ranked[1].record.name.first, "Johnathan");
    }

    #[test]
    fn test_merge_compatible_same_city() {
        let a = record("John", "Smith", Some("Austin"));
        let b = record("John", "Smith", Some("Austin"));
        assert!(merge_compatible(&a, &b));
    }

    #[test]
    fn test_merge_incompatible_on_conflicting_cities() {
        let a = record("John", "Smith", Some("Austin"));
        let b = record("John", "Smith", Some("Boston"));
        assert!(!merge_compatible(&a, &b));
    }

    #[test]
    fn test_merge_compatible_when_location_unknown() {
        let a = record("John", "Smith", Some("Austin"));
        let b = record("John", "Smith", None);
        assert!(merge_compatible(&a, &b));
    }

    #[test]
    fn test_shared_email_overrides_city_conflict() {
        let mut a = record("John", "Smith", Some("Austin"));
        let mut b = record("John", "Smith", Some("Boston"));
        let email = crate::record::Email {
            address: "jsmith@example.com".to_string(),
            is_current: true,
            source: "holehe".to_string(),
            confidence: Confidence::clamped(0.6),
            email_type: None,
        };
        a.push_email(email.clone());
        b.push_email(email);
        assert!(merge_compatible(&a, &b));
    }

    #[test]
    fn test_query_serde_roundtrip() {
        let q = PersonQuery::builder()
            .first_name("Jane")
            .last_name("Doe")
            .age_range(30, 40)
            .known_relative("John Doe")
            .build()
            .unwrap();
        let json = serde_json::to_string(&q).unwrap();
        let back: PersonQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }
}
