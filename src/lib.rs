//! # dossier - OSINT person-graph resolution core
//!
//! dossier is the entity-resolution and confidence-scoring core of an
//! open-source-intelligence aggregation platform. Scraper adapters fan out
//! to external lookup services and hand their raw findings to this crate,
//! which normalizes them into a common record shape, decides which records
//! describe the same real person, merges them without duplication, scores
//! every merged fact and relationship, and assembles a tiered person graph.
//!
//! ## Core Concepts
//!
//! - **RawFinding**: one result from a single external lookup, as tagged JSON
//! - **PersonRecord**: one candidate description of a person, deduplicated by natural keys
//! - **Identity key vs match score**: coarse merge bucketing vs continuous ranking
//! - **PersonGraph**: the merged subject plus tiered relatives and household clusters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dossier::{
//!     GraphBuilder, Normalizer, PersonQuery, RawFinding, ScoringPolicy, merge_all,
//! };
//!
//! let policy = ScoringPolicy::default();
//! let normalizer = Normalizer::new(policy.clone());
//!
//! let query = PersonQuery::builder()
//!     .first_name("John")
//!     .last_name("Smith")
//!     .city("Austin")
//!     .build()?;
//!
//! let findings: Vec<RawFinding> = gather(&query); // external collaborators
//! let records = normalizer.normalize_all(&findings);
//! let merged = merge_all(records, &policy);
//!
//! let subject = &merged[0];
//! let graph = GraphBuilder::new(policy).build(subject, &merged, &findings);
//! ```
//!
//! The crate does no I/O: every operation is a pure, synchronous
//! transformation, so findings can arrive partially, out of order, or
//! twice without changing the outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod confidence;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod matching;
pub mod merge;
pub mod normalize;
pub mod parse;
pub mod policy;
pub mod record;
pub mod score;
pub mod source;

// Re-export primary types at crate root for convenience
pub use confidence::Confidence;
pub use enrich::{
    username_candidates, EnrichmentLedger, EnrichmentPlan, EnrichmentPlanner, EnrichmentSource,
};
pub use error::{DossierError, DossierResult, NormalizeError, ValidationError};
pub use graph::{
    AddressCluster, ClusterScores, GraphBuilder, GraphStatistics, PersonGraph, RelationshipHint,
    RelativeLink, RelativeScore,
};
pub use matching::{
    identity_key, identity_key_for, match_score, merge_compatible, rank_candidates, AgeRange,
    PersonQuery, PersonQueryBuilder, RankedCandidate,
};
pub use merge::{merge_all, merge_records};
pub use normalize::{FindingPayload, Normalizer, RawFinding};
pub use parse::{
    normalize_phone, AddressParser, AddressParts, CommaAddressParser, NameParser, NameParts,
    PositionalNameParser,
};
pub use policy::{CompletenessWeights, MatchWeights, ScoringPolicy, TierThresholds};
pub use record::{
    Address, AgeBand, CurrentLocation, Email, PersonName, PersonRecord, PersonScores, Phone,
    RecordId, SocialProfile,
};
pub use score::{data_completeness, recompute_scores, relative_tier, RelativeEvidence, Tier};
pub use source::SourceKind;
