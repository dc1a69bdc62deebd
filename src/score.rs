//! Confidence and tier scoring.
//!
//! Person-level scores are recomputed from the record's merged state, so
//! they are a pure function of the evidence regardless of the order it
//! arrived in. Relationship tiers run through a small state machine over
//! the evidence, checked confirmed-first; `Possible` is the terminal
//! fallback bucket.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::policy::ScoringPolicy;
use crate::record::{normalize_key, PersonRecord};
use crate::source::SourceKind;

/// Discrete confidence bucket for a relationship claim.
///
/// Ordered most-confirmed first so sorting ascending puts confirmed links
/// at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Confirmed,
    Likely,
    Possible,
}

impl Tier {
    /// Returns a short stable identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Likely => "likely",
            Self::Possible => "possible",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Linear completeness index in [0,1]: one presence indicator per
/// attribute family.
#[must_use]
pub fn data_completeness(record: &PersonRecord, policy: &ScoringPolicy) -> f32 {
    let w = &policy.completeness;
    let mut completeness = 0.0;
    if !record.name.first.is_empty() || !record.name.last.is_empty() {
        completeness += w.name;
    }
    if !record.addresses.is_empty() {
        completeness += w.address;
    }
    if !record.phones.is_empty() {
        completeness += w.phone;
    }
    if !record.emails.is_empty() {
        completeness += w.email;
    }
    if !record.social_profiles.is_empty() {
        completeness += w.social;
    }
    completeness.clamp(0.0, 1.0)
}

/// Recomputes every derived score on the record from its current state.
///
/// Overall confidence is the completeness fallback plus the corroboration
/// bonus for each distinct source beyond the first, capped. Because it
/// reads only the merged state, any merge order yields the same result.
pub fn recompute_scores(record: &mut PersonRecord, policy: &ScoringPolicy) {
    let completeness = data_completeness(record, policy);
    record.scores.data_completeness = Confidence::clamped(completeness);

    #[allow(clippy::cast_precision_loss)]
    let corroboration =
        policy.corroboration_bonus * record.distinct_source_count().saturating_sub(1) as f32;
    let overall = policy.completeness_base + completeness * policy.completeness_weight
        + corroboration;
    record.scores.overall_confidence = Confidence::clamped(overall.min(policy.confidence_cap));

    record.scores.current_us_presence = Confidence::clamped(us_presence(record, policy));
    record.scores.global_presence = Confidence::clamped(global_presence(record, policy));
}

fn us_presence(record: &PersonRecord, policy: &ScoringPolicy) -> f32 {
    let in_us = |country: Option<&str>| {
        country.map_or(true, |c| {
            let c = normalize_key(c);
            c == "us" || c == "usa" || c == "united states"
        })
    };
    if record
        .addresses
        .iter()
        .any(|a| a.is_current && in_us(a.country.as_deref()))
    {
        return policy.address_current_score;
    }
    let has_us_trace = record.addresses.iter().any(|a| in_us(a.country.as_deref()))
        || record
            .current_location
            .as_ref()
            .is_some_and(|l| in_us(l.country.as_deref()));
    if has_us_trace {
        policy.address_unknown_score
    } else {
        0.0
    }
}

fn global_presence(record: &PersonRecord, policy: &ScoringPolicy) -> f32 {
    let existing = record
        .social_profiles
        .iter()
        .filter(|profile| profile.exists)
        .count();
    if existing == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let presence = policy.global_presence_base + policy.global_presence_per_profile * existing as f32;
    presence.min(policy.confidence_cap)
}

/// Evidence summary for one relative link, fed to the tier state machine.
#[derive(Debug, Clone, Copy)]
pub struct RelativeEvidence<'a> {
    /// Source names that independently reported this relative.
    pub sources: &'a [String],
    /// Accumulated relationship confidence.
    pub relationship_confidence: f32,
    /// Shared-address count between subject and relative.
    pub co_residence_addresses: usize,
    /// Known overlapping years at shared addresses.
    pub co_residence_years: f32,
}

// Tolerance for accumulated bonus rounding when confidence sums land on a
// tier threshold.
const CONF_TOLERANCE: f32 = 1e-6;

/// Assigns the tier for a relative link.
///
/// Conditions are evaluated confirmed → likely → possible; the first match
/// wins, and nothing ever demotes within a pass.
#[must_use]
pub fn relative_tier(evidence: &RelativeEvidence<'_>, policy: &ScoringPolicy) -> Tier {
    let t = &policy.tiering;
    let distinct: BTreeSet<String> = evidence.sources.iter().map(|s| normalize_key(s)).collect();
    let multi_source = distinct.len() >= 2;
    let kinds: BTreeSet<SourceKind> = evidence
        .sources
        .iter()
        .map(|s| SourceKind::classify(s))
        .collect();
    let has_people_search = kinds.contains(&SourceKind::PeopleSearch);
    let has_web_or_social =
        kinds.contains(&SourceKind::WebSearch) || kinds.contains(&SourceKind::Social);
    let conf = evidence.relationship_confidence + CONF_TOLERANCE;

    let confirmed = (multi_source && conf >= t.confirmed_multi_source_confidence)
        || (has_people_search && has_web_or_social && conf >= t.confirmed_cross_kind_confidence)
        || evidence.co_residence_addresses >= t.confirmed_co_residence_addresses
        || evidence.co_residence_years >= t.confirmed_co_residence_years;
    if confirmed {
        return Tier::Confirmed;
    }

    let likely = (multi_source && conf >= t.likely_multi_source_confidence)
        || (has_people_search && conf >= t.likely_people_search_confidence);
    if likely {
        return Tier::Likely;
    }

    Tier::Possible
}
