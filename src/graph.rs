//! Person graph building.
//!
//! The graph is a view: given one merged subject, the other records, and
//! the full finding set, it produces tiered relative links, household
//! address clusters, and aggregate statistics. It is recomputed from
//! scratch on every call (nothing here persists), so tiers can change across
//! passes as findings arrive or disappear, but never within one pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::matching::{identity_key, identity_key_for};
use crate::normalize::{FindingPayload, RawFinding};
use crate::policy::ScoringPolicy;
use crate::record::{normalize_key, PersonName, PersonRecord, RecordId};
use crate::score::{self, RelativeEvidence, Tier};

/// Heuristic relationship label. Never asserted as certain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipHint {
    /// Shared surname: sibling, parent, or child.
    SiblingOrParent,
    /// Named as a relative without a surname match.
    PossibleRelative,
    /// Shared an address per property records; may be unrelated.
    CoResident,
}

impl std::fmt::Display for RelationshipHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SiblingOrParent => "sibling_or_parent",
            Self::PossibleRelative => "possible_relative",
            Self::CoResident => "co_resident",
        };
        write!(f, "{label}")
    }
}

/// Scores attached to one relative link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeScore {
    pub relationship_confidence: Confidence,
    pub co_residence_years: f32,
    pub co_residence_addresses: usize,
    pub multi_source_confirmed: bool,
}

/// A scored edge from the subject to a candidate relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativeLink {
    /// The relative's (possibly thin) record.
    pub person: PersonRecord,
    pub relationship: RelationshipHint,
    /// Source names that independently reported this relative.
    pub sources: Vec<String>,
    pub score: RelativeScore,
    pub tier: Tier,
}

/// Scores attached to one address cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterScores {
    pub address_currentness: Confidence,
    pub multi_source_confirmed: bool,
}

/// A household grouping: one normalized address and the people known to
/// have lived there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCluster {
    /// Deterministic id: the normalized street+city key.
    pub id: String,
    pub street: String,
    pub city: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    pub household_members: Vec<RecordId>,
    pub is_primary_household: bool,
    pub scores: ClusterScores,
}

/// Aggregate statistics over one built graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_relatives: usize,
    pub confirmed_relatives: usize,
    pub likely_relatives: usize,
    pub possible_relatives: usize,
    pub average_relationship_confidence: f32,
    pub total_addresses: usize,
    pub shared_addresses: usize,
    pub data_sources: usize,
    pub subject_completeness: f32,
}

/// The merged subject plus relatives, households, and statistics for one
/// investigation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonGraph {
    pub subject: PersonRecord,
    pub relatives: Vec<RelativeLink>,
    pub addresses: Vec<AddressCluster>,
    pub statistics: GraphStatistics,
}

/// Builds person graphs under one scoring policy.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    policy: ScoringPolicy,
}

impl GraphBuilder {
    /// Creates a builder with the given policy.
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Builds the graph for one subject.
    ///
    /// `records` are all other normalized/merged records available for the
    /// investigation; `findings` is the full raw finding set, scanned for
    /// corroboration. Missing or malformed data degrades to an emptier
    /// graph rather than an error.
    #[must_use]
    pub fn build(
        &self,
        subject: &PersonRecord,
        records: &[PersonRecord],
        findings: &[RawFinding],
    ) -> PersonGraph {
        let mut links = self.seed_links(subject, records);
        for link in &mut links {
            self.corroborate(subject, link, findings);
            self.attach_co_residence(subject, link);
            let evidence = RelativeEvidence {
                sources: &link.sources,
                relationship_confidence: link.score.relationship_confidence.value(),
                co_residence_addresses: link.score.co_residence_addresses,
                co_residence_years: link.score.co_residence_years,
            };
            link.score.multi_source_confirmed = distinct_count(&link.sources) >= 2;
            link.tier = score::relative_tier(&evidence, &self.policy);
        }

        links.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| {
                    b.person
                        .scores
                        .overall_confidence
                        .value()
                        .partial_cmp(&a.person.scores.overall_confidence.value())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.person.name.full().cmp(&b.person.name.full()))
        });

        let clusters = self.build_clusters(subject, &links);
        let statistics = self.statistics(subject, &links, &clusters);

        PersonGraph {
            subject: subject.clone(),
            relatives: links,
            addresses: clusters,
            statistics,
        }
    }

    fn seed_links(&self, subject: &PersonRecord, records: &[PersonRecord]) -> Vec<RelativeLink> {
        let subject_key = identity_key(subject);
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut links = Vec::new();

        let named = subject
            .relatives
            .iter()
            .map(|name| (name.clone(), false))
            .chain(
                subject
                    .co_residents
                    .iter()
                    .map(|name| (name.clone(), true)),
            );
        for (name, is_co_resident) in named {
            let key = identity_key_for(&name);
            if key.is_empty() || key == subject_key || !seen.insert(key.clone()) {
                continue;
            }
            let person = resolve_relative(&name, &key, subject, records);
            let relationship = if is_co_resident {
                RelationshipHint::CoResident
            } else if normalize_key(&person.name.last) == normalize_key(&subject.name.last)
                && !subject.name.last.is_empty()
            {
                RelationshipHint::SiblingOrParent
            } else {
                RelationshipHint::PossibleRelative
            };
            let seed_confidence = if is_co_resident {
                self.policy.co_resident_seed_confidence
            } else {
                self.policy.relative_seed_confidence
            };
            links.push(RelativeLink {
                person,
                relationship,
                sources: seed_sources(subject),
                score: RelativeScore {
                    relationship_confidence: Confidence::clamped(seed_confidence),
                    co_residence_years: 0.0,
                    co_residence_addresses: 0,
                    multi_source_confirmed: false,
                },
                tier: Tier::Possible,
            });
        }
        links
    }

    fn corroborate(&self, subject: &PersonRecord, link: &mut RelativeLink, findings: &[RawFinding]) {
        let relative_name = normalize_key(&link.person.name.full());
        let subject_name = normalize_key(&subject.name.full());

        for finding in findings {
            if link
                .sources
                .iter()
                .any(|s| normalize_key(s) == normalize_key(&finding.source_name))
            {
                continue;
            }
            let Ok(payload) = finding.decode() else {
                continue;
            };
            match payload {
                FindingPayload::PersonSearch(search)
                    if crate::source::SourceKind::classify(&finding.source_name)
                        .is_people_search() =>
                {
                    let mentions = search.persons.iter().any(|entry| {
                        entry
                            .name
                            .as_deref()
                            .is_some_and(|n| normalize_key(n) == relative_name)
                            || entry
                                .relatives
                                .iter()
                                .any(|r| normalize_key(r) == relative_name)
                    });
                    if mentions {
                        link.sources.push(finding.source_name.clone());
                        link.score.relationship_confidence =
                            link.score.relationship_confidence.boosted(
                                self.policy.relative_people_search_bonus,
                                self.policy.relative_confidence_cap,
                            );
                    }
                }
                FindingPayload::WebSearch(web) => {
                    let mentions = web.snippets.iter().any(|snippet| {
                        let text = normalize_key(&format!("{} {}", snippet.title, snippet.text));
                        text.contains(&relative_name) && text.contains(&subject_name)
                    });
                    if mentions {
                        link.sources.push(finding.source_name.clone());
                        link.score.relationship_confidence =
                            link.score.relationship_confidence.boosted(
                                self.policy.relative_web_search_bonus,
                                self.policy.relative_confidence_cap,
                            );
                    }
                }
                _ => {}
            }
        }
    }

    fn attach_co_residence(&self, subject: &PersonRecord, link: &mut RelativeLink) {
        let subject_addresses: Vec<_> = subject.addresses.iter().collect();
        let mut shared = 0usize;
        let mut years = 0.0f32;
        for relative_address in &link.person.addresses {
            let key = relative_address.location_key();
            let Some(subject_address) = subject_addresses
                .iter()
                .find(|a| a.location_key() == key)
            else {
                continue;
            };
            shared += 1;
            if let (Some(f1), Some(t1), Some(f2), Some(t2)) = (
                subject_address.from_year,
                subject_address.to_year,
                relative_address.from_year,
                relative_address.to_year,
            ) {
                let overlap = t1.min(t2).saturating_sub(f1.max(f2));
                years += f32::from(overlap);
            }
        }
        link.score.co_residence_addresses = shared;
        link.score.co_residence_years = years;
        if shared > 0 {
            #[allow(clippy::cast_precision_loss)]
            let bonus = self.policy.co_residence_bonus * shared as f32;
            link.score.relationship_confidence = link
                .score
                .relationship_confidence
                .boosted(bonus, self.policy.relative_confidence_cap);
        }
    }

    fn build_clusters(
        &self,
        subject: &PersonRecord,
        links: &[RelativeLink],
    ) -> Vec<AddressCluster> {
        let mut clusters: Vec<AddressCluster> = Vec::new();
        for address in &subject.addresses {
            let key = address.location_key();
            if clusters.iter().any(|c| c.id == key) {
                continue;
            }
            clusters.push(AddressCluster {
                id: key,
                street: address.street.clone(),
                city: address.city.clone(),
                state: address.state.clone(),
                zip: address.zip.clone(),
                household_members: vec![subject.id],
                is_primary_household: address.is_current,
                scores: ClusterScores {
                    address_currentness: Confidence::clamped(if address.is_current {
                        self.policy.address_current_score
                    } else {
                        self.policy.address_unknown_score
                    }),
                    multi_source_confirmed: false,
                },
            });
        }

        for link in links {
            for address in &link.person.addresses {
                let key = address.location_key();
                if let Some(cluster) = clusters.iter_mut().find(|c| c.id == key) {
                    if !cluster.household_members.contains(&link.person.id) {
                        cluster.household_members.push(link.person.id);
                    }
                }
            }
        }

        for cluster in &mut clusters {
            cluster.scores.multi_source_confirmed = cluster.household_members.len() >= 2;
        }

        clusters.sort_by(|a, b| {
            b.is_primary_household
                .cmp(&a.is_primary_household)
                .then_with(|| b.household_members.len().cmp(&a.household_members.len()))
                .then_with(|| a.street.cmp(&b.street))
        });

        // Exactly one primary household whenever any cluster exists.
        let mut primary_seen = false;
        for cluster in &mut clusters {
            if cluster.is_primary_household {
                if primary_seen {
                    cluster.is_primary_household = false;
                } else {
                    primary_seen = true;
                }
            }
        }
        if !primary_seen {
            if let Some(first) = clusters.first_mut() {
                first.is_primary_household = true;
            }
        }

        clusters
    }

    fn statistics(
        &self,
        subject: &PersonRecord,
        links: &[RelativeLink],
        clusters: &[AddressCluster],
    ) -> GraphStatistics {
        let confirmed = links.iter().filter(|l| l.tier == Tier::Confirmed).count();
        let likely = links.iter().filter(|l| l.tier == Tier::Likely).count();
        let possible = links.iter().filter(|l| l.tier == Tier::Possible).count();

        let average = if links.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let total: f32 = links
                .iter()
                .map(|l| l.score.relationship_confidence.value())
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let count = links.len() as f32;
            total / count
        };

        let mut sources: BTreeSet<String> = subject
            .source_names()
            .iter()
            .map(|s| normalize_key(s))
            .collect();
        for link in links {
            for source in &link.sources {
                sources.insert(normalize_key(source));
            }
        }

        GraphStatistics {
            total_relatives: links.len(),
            confirmed_relatives: confirmed,
            likely_relatives: likely,
            possible_relatives: possible,
            average_relationship_confidence: average,
            total_addresses: clusters.len(),
            shared_addresses: clusters
                .iter()
                .filter(|c| c.household_members.len() >= 2)
                .count(),
            data_sources: sources.len(),
            subject_completeness: score::data_completeness(subject, &self.policy),
        }
    }
}

/// Sources credited with the seed of a relative link: the subject's
/// people-search sources when any exist, otherwise every subject source.
fn seed_sources(subject: &PersonRecord) -> Vec<String> {
    let names = subject.source_names();
    let people_search: Vec<String> = names
        .iter()
        .filter(|name| crate::source::SourceKind::classify(name).is_people_search())
        .cloned()
        .collect();
    if people_search.is_empty() {
        names
    } else {
        people_search
    }
}

fn resolve_relative(
    name: &str,
    key: &str,
    subject: &PersonRecord,
    records: &[PersonRecord],
) -> PersonRecord {
    records
        .iter()
        .find(|record| record.id != subject.id && identity_key(record) == key)
        .cloned()
        .unwrap_or_else(|| thin_record(name))
}

fn thin_record(full_name: &str) -> PersonRecord {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    let (first, last) = match tokens.as_slice() {
        [] => ("", ""),
        [only] => (*only, ""),
        [first, .., last] => (*first, *last),
    };
    let name = PersonName::new(first, last)
        .unwrap_or_else(|_| PersonName::new("unknown", "").expect("non-empty fallback name"));
    PersonRecord::new(name)
}

fn distinct_count(sources: &[String]) -> usize {
    sources
        .iter()
        .map(|s| normalize_key(s))
        .collect::<BTreeSet<_>>()
        .len()
}
