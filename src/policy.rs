//! Scoring policy configuration.
//!
//! Every score delta, weight, cap, and bound used by the matcher, merger,
//! scorer, graph builder, and enrichment planner lives here. The defaults
//! reproduce the reference behavior; a tuned policy can be deserialized and
//! passed in wherever the defaults don't fit.
//!
//! Policies are intentionally *pure* data so a graph build can be
//! reproduced deterministically given the same finding set.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Additive weights for the candidate ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    /// Starting score before any evidence is considered.
    pub base: f32,
    /// Bonus for a case-insensitive exact first-name match.
    pub first_name_exact: f32,
    /// Bonus for a 3-character first-name prefix match (instead of exact).
    pub first_name_prefix: f32,
    /// Bonus for a case-insensitive exact last-name match.
    pub last_name_exact: f32,
    /// Bonus for a city match.
    pub city: f32,
    /// Bonus for a state match.
    pub state: f32,
    /// Bonus per corroborating source beyond the first.
    pub per_extra_source: f32,
    /// Cap on the total multi-source bonus.
    pub extra_source_cap: f32,
    /// Linear decay per year of distance from the query age range.
    pub age_decay_per_year: f32,
    /// Age component used when either side lacks age evidence.
    pub age_unknown_component: f32,
    /// Blend weight of the name/location component.
    pub blend_name_location: f32,
    /// Blend weight of the age-band component.
    pub blend_age_band: f32,
    /// Blend weight of the constant baseline.
    pub blend_baseline: f32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            first_name_exact: 0.2,
            first_name_prefix: 0.1,
            last_name_exact: 0.15,
            city: 0.1,
            state: 0.05,
            per_extra_source: 0.1,
            extra_source_cap: 0.3,
            age_decay_per_year: 0.1,
            age_unknown_component: 0.5,
            blend_name_location: 0.6,
            blend_age_band: 0.2,
            blend_baseline: 0.2,
        }
    }
}

/// Thresholds of the relative-link tiering state machine.
///
/// Conditions are evaluated confirmed-first; `Possible` is the fallback
/// bucket, never a transition target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Confirmed: multi-source links need at least this confidence.
    pub confirmed_multi_source_confidence: f32,
    /// Confirmed: people-search + web/social links need at least this.
    pub confirmed_cross_kind_confidence: f32,
    /// Confirmed: shared-address count that confirms on its own.
    pub confirmed_co_residence_addresses: usize,
    /// Confirmed: co-residence years that confirm on their own.
    pub confirmed_co_residence_years: f32,
    /// Likely: two-source links need at least this confidence.
    pub likely_multi_source_confidence: f32,
    /// Likely: a single people-search link needs at least this.
    pub likely_people_search_confidence: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            confirmed_multi_source_confidence: 0.8,
            confirmed_cross_kind_confidence: 0.7,
            confirmed_co_residence_addresses: 2,
            confirmed_co_residence_years: 5.0,
            likely_multi_source_confidence: 0.6,
            likely_people_search_confidence: 0.65,
        }
    }
}

/// Presence-indicator weights for the completeness index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessWeights {
    pub name: f32,
    pub address: f32,
    pub phone: f32,
    pub email: f32,
    pub social: f32,
}

impl Default for CompletenessWeights {
    fn default() -> Self {
        Self {
            name: 0.2,
            address: 0.2,
            phone: 0.2,
            email: 0.2,
            social: 0.2,
        }
    }
}

/// The full scoring policy threaded through matcher, merger, scorer,
/// graph builder, and enrichment planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Per-field confidence cap for a single unconfirmed source.
    pub single_source_field_cap: f32,
    /// Per-field confidence assumed when a source provides no hint.
    pub default_field_confidence: f32,
    /// Global cap: no derived confidence exceeds this.
    pub confidence_cap: f32,
    /// Overall-confidence bonus per extra distinct corroborating source.
    pub corroboration_bonus: f32,
    /// Seed confidence for a relative named by the subject's own sources.
    pub relative_seed_confidence: f32,
    /// Seed confidence for a co-resident discovered via property records.
    pub co_resident_seed_confidence: f32,
    /// Relationship-confidence bonus when a people-search source
    /// independently lists the same relative.
    pub relative_people_search_bonus: f32,
    /// Relationship-confidence bonus for a corroborating web snippet.
    pub relative_web_search_bonus: f32,
    /// Relationship-confidence bonus per address shared with the subject.
    pub co_residence_bonus: f32,
    /// Cap on relationship confidence.
    pub relative_confidence_cap: f32,
    /// Currentness score for an address its source marks current.
    pub address_current_score: f32,
    /// Currentness score for an address of unknown currentness.
    pub address_unknown_score: f32,
    /// Base of the completeness-derived overall confidence.
    pub completeness_base: f32,
    /// Weight of completeness in the overall-confidence fallback.
    pub completeness_weight: f32,
    /// Base global-presence score when any social profile exists.
    pub global_presence_base: f32,
    /// Global-presence increment per existing social profile.
    pub global_presence_per_profile: f32,
    /// Maximum relative names enriched per planning call.
    pub max_relatives_enriched: usize,

    pub match_weights: MatchWeights,
    pub tiering: TierThresholds,
    pub completeness: CompletenessWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            single_source_field_cap: 0.7,
            default_field_confidence: 0.6,
            confidence_cap: 0.95,
            corroboration_bonus: 0.1,
            relative_seed_confidence: 0.5,
            co_resident_seed_confidence: 0.4,
            relative_people_search_bonus: 0.15,
            relative_web_search_bonus: 0.1,
            co_residence_bonus: 0.15,
            relative_confidence_cap: 0.95,
            address_current_score: 0.9,
            address_unknown_score: 0.5,
            completeness_base: 0.5,
            completeness_weight: 0.4,
            global_presence_base: 0.2,
            global_presence_per_profile: 0.15,
            max_relatives_enriched: 5,
            match_weights: MatchWeights::default(),
            tiering: TierThresholds::default(),
            completeness: CompletenessWeights::default(),
        }
    }
}

impl ScoringPolicy {
    /// Validates that every weight and cap is in range.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPolicy` naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let unit_fields = [
            ("single_source_field_cap", self.single_source_field_cap),
            ("default_field_confidence", self.default_field_confidence),
            ("confidence_cap", self.confidence_cap),
            ("corroboration_bonus", self.corroboration_bonus),
            ("relative_seed_confidence", self.relative_seed_confidence),
            ("co_resident_seed_confidence", self.co_resident_seed_confidence),
            ("relative_people_search_bonus", self.relative_people_search_bonus),
            ("relative_web_search_bonus", self.relative_web_search_bonus),
            ("co_residence_bonus", self.co_residence_bonus),
            ("relative_confidence_cap", self.relative_confidence_cap),
            ("address_current_score", self.address_current_score),
            ("address_unknown_score", self.address_unknown_score),
            ("completeness_base", self.completeness_base),
            ("completeness_weight", self.completeness_weight),
            ("global_presence_base", self.global_presence_base),
            ("global_presence_per_profile", self.global_presence_per_profile),
            ("match_weights.base", self.match_weights.base),
            ("match_weights.first_name_exact", self.match_weights.first_name_exact),
            ("match_weights.first_name_prefix", self.match_weights.first_name_prefix),
            ("match_weights.last_name_exact", self.match_weights.last_name_exact),
            ("match_weights.city", self.match_weights.city),
            ("match_weights.state", self.match_weights.state),
            ("match_weights.per_extra_source", self.match_weights.per_extra_source),
            ("match_weights.extra_source_cap", self.match_weights.extra_source_cap),
            ("match_weights.age_decay_per_year", self.match_weights.age_decay_per_year),
            ("match_weights.age_unknown_component", self.match_weights.age_unknown_component),
            (
                "tiering.confirmed_multi_source_confidence",
                self.tiering.confirmed_multi_source_confidence,
            ),
            (
                "tiering.confirmed_cross_kind_confidence",
                self.tiering.confirmed_cross_kind_confidence,
            ),
            (
                "tiering.likely_multi_source_confidence",
                self.tiering.likely_multi_source_confidence,
            ),
            (
                "tiering.likely_people_search_confidence",
                self.tiering.likely_people_search_confidence,
            ),
        ];
        for (name, value) in unit_fields {
            if value.is_nan() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidPolicy {
                    reason: format!("{name} must be in [0.0, 1.0], got {value}"),
                });
            }
        }

        let blend_sum = self.match_weights.blend_name_location
            + self.match_weights.blend_age_band
            + self.match_weights.blend_baseline;
        if (blend_sum - 1.0).abs() > 1e-4 {
            return Err(ValidationError::InvalidPolicy {
                reason: format!("match blend weights must sum to 1.0, got {blend_sum}"),
            });
        }

        let completeness_sum = self.completeness.name
            + self.completeness.address
            + self.completeness.phone
            + self.completeness.email
            + self.completeness.social;
        if (completeness_sum - 1.0).abs() > 1e-4 {
            return Err(ValidationError::InvalidPolicy {
                reason: format!("completeness weights must sum to 1.0, got {completeness_sum}"),
            });
        }

        Ok(())
    }
}
