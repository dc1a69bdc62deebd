//! Enrichment loop control.
//!
//! Facts discovered in one search round (usernames, relative names,
//! emails) seed the next round of lookups. The planner decides which
//! enrichment sources fire and with what targets; the ledger records what
//! has already been tried per person so repeated calls are incremental and
//! the loop provably converges. Results coming back are folded into the
//! subject through the same merge rules as any other finding.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::{identity_key, merge_compatible};
use crate::merge;
use crate::normalize::{FindingPayload, Normalizer, RawFinding};
use crate::parse::normalize_phone;
use crate::policy::ScoringPolicy;
use crate::record::{PersonRecord, SocialProfile};
use crate::score;

/// An enrichment lookup family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSource {
    IdCrawl,
    Sherlock,
    EmailIntel,
    PhoneLookup,
    PropertyRecords,
    RelativeSearch,
    /// Shorthand for every concrete source.
    All,
}

impl EnrichmentSource {
    /// Every concrete source, in dispatch order.
    pub const CONCRETE: [Self; 6] = [
        Self::IdCrawl,
        Self::Sherlock,
        Self::EmailIntel,
        Self::PhoneLookup,
        Self::PropertyRecords,
        Self::RelativeSearch,
    ];

    /// Returns a short stable identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdCrawl => "idcrawl",
            Self::Sherlock => "sherlock",
            Self::EmailIntel => "email_intel",
            Self::PhoneLookup => "phone_lookup",
            Self::PropertyRecords => "property_records",
            Self::RelativeSearch => "relative_search",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for EnrichmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The explicit visited set for enrichment: `(person identity key, source)`
/// pairs that have already fired.
///
/// The caller threads this through planning calls (and may persist it
/// between rounds); the planner never re-dispatches a recorded pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentLedger {
    entries: BTreeSet<(String, String)>,
}

impl EnrichmentLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a source fired for a person. Returns false if the pair
    /// was already present.
    pub fn record(&mut self, person_key: &str, source: EnrichmentSource) -> bool {
        self.entries
            .insert((person_key.to_string(), source.as_str().to_string()))
    }

    /// Returns true if the source already fired for the person.
    #[must_use]
    pub fn contains(&self, person_key: &str, source: EnrichmentSource) -> bool {
        self.entries
            .contains(&(person_key.to_string(), source.as_str().to_string()))
    }

    /// Number of recorded pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has fired yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The next-round dispatch set for one person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentPlan {
    /// Identity key of the person this plan enriches.
    pub person_key: String,
    /// Sources that fire this round.
    pub sources: Vec<EnrichmentSource>,
    /// Requested sources suppressed because they already fired.
    pub already_tried: Vec<EnrichmentSource>,
    /// Username candidates for existence checks.
    pub usernames: Vec<String>,
    /// Email addresses for intelligence lookups.
    pub emails: Vec<String>,
    /// Phone numbers for reverse lookups.
    pub phones: Vec<String>,
    /// Address strings for property lookups.
    pub addresses: Vec<String>,
    /// Relative full names for one-hop relative searches, bounded.
    pub relative_names: Vec<String>,
}

impl EnrichmentPlan {
    /// Returns true when nothing fires.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Plans enrichment rounds under one scoring policy.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentPlanner {
    policy: ScoringPolicy,
}

impl EnrichmentPlanner {
    /// Creates a planner with the given policy.
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Decides which sources fire for the subject and with what targets.
    ///
    /// A source fires only if requested (directly or via `All`) and not
    /// already recorded in the ledger for this person; firing sources are
    /// recorded immediately. Relative fan-out is one hop, bounded by the
    /// policy.
    #[must_use]
    pub fn plan(
        &self,
        subject: &PersonRecord,
        requested: &[EnrichmentSource],
        ledger: &mut EnrichmentLedger,
    ) -> EnrichmentPlan {
        let person_key = identity_key(subject);
        let expand_all = requested.contains(&EnrichmentSource::All);
        let mut plan = EnrichmentPlan {
            person_key: person_key.clone(),
            ..EnrichmentPlan::default()
        };

        for source in EnrichmentSource::CONCRETE {
            if !expand_all && !requested.contains(&source) {
                continue;
            }
            if !ledger.record(&person_key, source) {
                debug!(person = %person_key, source = %source, "enrichment source already tried");
                plan.already_tried.push(source);
                continue;
            }
            plan.sources.push(source);
        }

        if plan
            .sources
            .iter()
            .any(|s| matches!(s, EnrichmentSource::IdCrawl | EnrichmentSource::Sherlock))
        {
            plan.usernames = username_candidates(subject);
        }
        if plan.sources.contains(&EnrichmentSource::EmailIntel) {
            plan.emails = subject.emails.iter().map(|e| e.key()).collect();
        }
        if plan.sources.contains(&EnrichmentSource::PhoneLookup) {
            plan.phones = subject
                .phones
                .iter()
                .filter_map(|p| normalize_phone(&p.number))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
        }
        if plan.sources.contains(&EnrichmentSource::PropertyRecords) {
            plan.addresses = subject
                .addresses
                .iter()
                .map(|a| format!("{}, {}", a.street, a.city))
                .collect();
        }
        if plan.sources.contains(&EnrichmentSource::RelativeSearch) {
            plan.relative_names = subject
                .relatives
                .iter()
                .take(self.policy.max_relatives_enriched)
                .cloned()
                .collect();
        }

        plan
    }

    /// Folds enrichment results back into the subject.
    ///
    /// Records that normalize to the subject's identity merge through the
    /// standard rules. Nameless payloads attach directly: carrier detail to
    /// the matching phone, breach/profile detail to the matching email,
    /// existence probes as social profiles, and property co-occupants as
    /// co-residents rather than name-sourced relatives. A failed or absent
    /// enrichment result simply contributes nothing.
    #[must_use]
    pub fn fold_findings(
        &self,
        subject: &PersonRecord,
        findings: &[RawFinding],
        normalizer: &Normalizer,
    ) -> PersonRecord {
        let original_id = subject.id;
        let subject_key = identity_key(subject);
        let mut merged = subject.clone();

        for finding in findings {
            for record in normalizer.normalize(finding) {
                if identity_key(&record) == subject_key && merge_compatible(&merged, &record) {
                    merged = merge::merge_records(vec![merged, record], &self.policy)
                        .expect("merging two records yields a record");
                }
            }
            self.attach_nameless(&mut merged, finding);
        }

        merged.id = original_id;
        score::recompute_scores(&mut merged, &self.policy);
        merged
    }

    fn attach_nameless(&self, subject: &mut PersonRecord, finding: &RawFinding) {
        let Ok(payload) = finding.decode() else {
            return;
        };
        match payload {
            FindingPayload::PhoneLookup(lookup) if lookup.name.is_none() => {
                let Some(digits) = lookup.number.as_deref().and_then(normalize_phone) else {
                    return;
                };
                for phone in &mut subject.phones {
                    if normalize_phone(&phone.number).as_deref() == Some(digits.as_str()) {
                        if phone.carrier.is_none() {
                            phone.carrier = lookup.carrier.clone();
                        }
                        if phone.phone_type.is_none() {
                            phone.phone_type = lookup.line_type.clone();
                        }
                        subject
                            .source_ids
                            .entry(finding.source_name.clone())
                            .or_insert_with(|| finding.agent_type.clone());
                    }
                }
            }
            FindingPayload::EmailIntel(intel) if intel.name.is_none() => {
                let Some(address) = intel.address.as_deref() else {
                    return;
                };
                let key = address.trim().to_lowercase();
                let known = subject.emails.iter().any(|e| e.key() == key);
                if !known {
                    return;
                }
                if intel.breach_count.is_some_and(|count| count > 0) {
                    if let Some(email) = subject.emails.iter_mut().find(|e| e.key() == key) {
                        email.email_type.get_or_insert_with(|| "breached".to_string());
                    }
                }
                for profile in &intel.profiles {
                    subject.push_social_profile(SocialProfile {
                        platform: profile.platform.clone(),
                        username: profile.username.clone(),
                        url: profile.url.clone(),
                        exists: true,
                        source: finding.source_name.clone(),
                    });
                }
                subject
                    .source_ids
                    .entry(finding.source_name.clone())
                    .or_insert_with(|| finding.agent_type.clone());
            }
            FindingPayload::SocialCheck(check) => {
                subject.push_social_profile(SocialProfile {
                    platform: check.platform,
                    username: check.username,
                    url: check.url,
                    exists: check.exists,
                    source: finding.source_name.clone(),
                });
                subject
                    .source_ids
                    .entry(finding.source_name.clone())
                    .or_insert_with(|| finding.agent_type.clone());
            }
            FindingPayload::PropertyRecords(property) => {
                let subject_full = subject.name.full();
                for occupant in &property.occupants {
                    if !occupant.trim().eq_ignore_ascii_case(subject_full.trim()) {
                        subject.push_co_resident(occupant.clone());
                    }
                }
            }
            _ => {}
        }
    }
}

/// Username candidates from name permutations, observed social handles,
/// and email local-parts, lowercased and deduplicated in dispatch order.
#[must_use]
pub fn username_candidates(record: &PersonRecord) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        let candidate = candidate.trim().to_lowercase();
        if !candidate.is_empty() && seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    };

    let first = record.name.first.to_lowercase();
    let last = record.name.last.to_lowercase();
    if !first.is_empty() && !last.is_empty() {
        push(format!("{first}{last}"));
        push(format!("{first}.{last}"));
        push(format!("{first}_{last}"));
        if let Some(initial) = first.chars().next() {
            push(format!("{initial}{last}"));
        }
    }
    for profile in &record.social_profiles {
        if let Some(username) = &profile.username {
            push(username.clone());
        }
    }
    for email in &record.emails {
        if let Some(local) = email.local_part() {
            push(local.to_string());
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::Confidence;
    use crate::record::{Email, PersonName, Phone};
    use serde_json::json;

    fn subject() -> PersonRecord {
        let mut rec = PersonRecord::new(PersonName::new("John", "Smith").unwrap());
        rec.add_source_ref("truepeoplesearch", "ref");
        rec.push_phone(Phone {
            number: "512-555-0100".to_string(),
            phone_type: None,
            is_current: true,
            source: "truepeoplesearch".to_string(),
            confidence: Confidence::clamped(0.6),
            carrier: None,
        });
        rec.push_email(Email {
            address: "johnny.s@example.com".to_string(),
            is_current: true,
            source: "truepeoplesearch".to_string(),
            confidence: Confidence::clamped(0.6),
            email_type: None,
        });
        rec
    }

    #[test]
    fn test_username_candidates_permutations() {
        let candidates = username_candidates(&subject());
        assert!(candidates.contains(&"johnsmith".to_string()));
        assert!(candidates.contains(&"john.smith".to_string()));
        assert!(candidates.contains(&"john_smith".to_string()));
        assert!(candidates.contains(&"jsmith".to_string()));
        assert!(candidates.contains(&"johnny.s".to_string()));
    }

    #[test]
    fn test_username_candidates_dedup() {
        let mut rec = subject();
        rec.push_social_profile(SocialProfile {
            platform: "github".to_string(),
            username: Some("JohnSmith".to_string()),
            url: None,
            exists: true,
            source: "sherlock".to_string(),
        });
        let candidates = username_candidates(&rec);
        let count = candidates.iter().filter(|c| *c == "johnsmith").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_plan_fires_only_requested_sources() {
        let planner = EnrichmentPlanner::default();
        let mut ledger = EnrichmentLedger::new();
        let plan = planner.plan(&subject(), &[EnrichmentSource::Sherlock], &mut ledger);
        assert_eq!(plan.sources, vec![EnrichmentSource::Sherlock]);
        assert!(!plan.usernames.is_empty());
        assert!(plan.emails.is_empty());
        assert!(plan.phones.is_empty());
    }

    #[test]
    fn test_plan_all_expands_to_every_concrete_source() {
        let planner = EnrichmentPlanner::default();
        let mut ledger = EnrichmentLedger::new();
        let plan = planner.plan(&subject(), &[EnrichmentSource::All], &mut ledger);
        assert_eq!(plan.sources.len(), EnrichmentSource::CONCRETE.len());
        assert_eq!(plan.phones, vec!["5125550100".to_string()]);
        assert_eq!(plan.emails, vec!["johnny.s@example.com".to_string()]);
    }

    #[test]
    fn test_repeated_plans_are_incremental() {
        let planner = EnrichmentPlanner::default();
        let mut ledger = EnrichmentLedger::new();
        let person = subject();

        let first = planner.plan(&person, &[EnrichmentSource::All], &mut ledger);
        assert!(!first.is_empty());

        let second = planner.plan(&person, &[EnrichmentSource::All], &mut ledger);
        assert!(second.is_empty());
        assert_eq!(second.already_tried.len(), EnrichmentSource::CONCRETE.len());
    }

    #[test]
    fn test_ledger_is_per_person() {
        let planner = EnrichmentPlanner::default();
        let mut ledger = EnrichmentLedger::new();
        planner.plan(&subject(), &[EnrichmentSource::Sherlock], &mut ledger);

        let other = PersonRecord::new(PersonName::new("Jane", "Doe").unwrap());
        let plan = planner.plan(&other, &[EnrichmentSource::Sherlock], &mut ledger);
        assert_eq!(plan.sources, vec![EnrichmentSource::Sherlock]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_relative_fan_out_is_bounded() {
        let planner = EnrichmentPlanner::default();
        let mut ledger = EnrichmentLedger::new();
        let mut person = subject();
        for i in 0..10 {
            person.push_relative(format!("Relative Number{i}"));
        }
        let plan = planner.plan(&person, &[EnrichmentSource::RelativeSearch], &mut ledger);
        assert_eq!(
            plan.relative_names.len(),
            ScoringPolicy::default().max_relatives_enriched
        );
    }

    #[test]
    fn test_fold_merges_matching_identity() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let person = subject();
        let finding = RawFinding::new(
            "fastpeoplesearch",
            "person_search",
            json!({"persons": [{
                "name": "John Smith",
                "addresses": ["123 Main St, Austin, TX 78701"],
                "relatives": ["Jane Smith"]
            }]}),
        );
        let folded = planner.fold_findings(&person, &[finding], &normalizer);
        assert_eq!(folded.id, person.id);
        assert_eq!(folded.addresses.len(), 1);
        assert_eq!(folded.relatives, vec!["Jane Smith".to_string()]);
        assert_eq!(folded.distinct_source_count(), 2);
        assert!(
            folded.scores.overall_confidence.value()
                >= person.scores.overall_confidence.value()
        );
    }

    #[test]
    fn test_fold_attaches_carrier_to_matching_phone() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "phone_lookup",
            "phone_lookup",
            json!({"number": "+1 (512) 555-0100", "carrier": "T-Mobile", "line_type": "mobile"}),
        );
        let folded = planner.fold_findings(&subject(), &[finding], &normalizer);
        assert_eq!(folded.phones[0].carrier.as_deref(), Some("T-Mobile"));
        assert_eq!(folded.phones[0].phone_type.as_deref(), Some("mobile"));
        assert!(folded.source_ids.contains_key("phone_lookup"));
    }

    #[test]
    fn test_fold_marks_breached_email_and_profiles() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "holehe",
            "email_intel",
            json!({
                "address": "Johnny.S@example.com",
                "breach_count": 2,
                "profiles": [{"platform": "github", "username": "johnnys"}]
            }),
        );
        let folded = planner.fold_findings(&subject(), &[finding], &normalizer);
        assert_eq!(folded.emails[0].email_type.as_deref(), Some("breached"));
        assert_eq!(folded.social_profiles.len(), 1);
    }

    #[test]
    fn test_fold_ignores_unknown_email() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "holehe",
            "email_intel",
            json!({"address": "stranger@example.com", "breach_count": 5}),
        );
        let folded = planner.fold_findings(&subject(), &[finding], &normalizer);
        assert!(folded.emails[0].email_type.is_none());
        assert!(!folded.source_ids.contains_key("holehe"));
    }

    #[test]
    fn test_fold_property_occupants_become_co_residents() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "property_records",
            "property_records",
            json!({
                "street": "77 Lake Dr",
                "city": "Austin",
                "occupants": ["John Smith", "Pat Lodger"]
            }),
        );
        let folded = planner.fold_findings(&subject(), &[finding], &normalizer);
        assert_eq!(folded.co_residents, vec!["Pat Lodger".to_string()]);
        assert!(folded.relatives.is_empty());
        // Subject appeared as an occupant, so the address merged in too.
        assert_eq!(folded.addresses.len(), 1);
    }

    #[test]
    fn test_fold_social_check() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "sherlock",
            "social_check",
            json!({"platform": "github", "username": "jsmith", "exists": true}),
        );
        let folded = planner.fold_findings(&subject(), &[finding], &normalizer);
        assert_eq!(folded.social_profiles.len(), 1);
        assert!(folded.social_profiles[0].exists);
    }

    #[test]
    fn test_fold_same_finding_twice_is_idempotent() {
        let planner = EnrichmentPlanner::default();
        let normalizer = Normalizer::default();
        let finding = RawFinding::new(
            "fastpeoplesearch",
            "person_search",
            json!({"persons": [{
                "name": "John Smith",
                "addresses": ["123 Main St, Austin, TX 78701"]
            }]}),
        );
        let once = planner.fold_findings(&subject(), &[finding.clone()], &normalizer);
        let twice = planner.fold_findings(&subject(), &[finding.clone(), finding], &normalizer);
        assert_eq!(once.addresses.len(), twice.addresses.len());
        assert_eq!(once.distinct_source_count(), twice.distinct_source_count());
        assert!(
            (once.scores.overall_confidence.value()
                - twice.scores.overall_confidence.value())
            .abs()
                < f32::EPSILON
        );
    }

    #[test]
    fn test_ledger_serde_roundtrip() {
        let mut ledger = EnrichmentLedger::new();
        ledger.record("john_smith", EnrichmentSource::Sherlock);
        let json = serde_json::to_string(&ledger).unwrap();
        let back: EnrichmentLedger = serde_json::from_str(&json).unwrap();
        assert!(back.contains("john_smith", EnrichmentSource::Sherlock));
    }
}
