//! Source taxonomy for external lookup services.
//!
//! Every fact carries the name of the source that reported it. Knowing
//! what *kind* of service a source is matters for scoring: people-search
//! corroboration is weighted differently from a web-search snippet or a
//! social-platform existence probe.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of an external lookup service.
///
/// Names arriving from the scraper layer are free-form strings; `classify`
/// maps the known adapters onto a kind and falls back to substring
/// heuristics for unknown ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Aggregated people-search sites (TruePeopleSearch and kin).
    PeopleSearch,
    /// General web-search snippets.
    WebSearch,
    /// Social-platform existence checks and profile crawlers.
    Social,
    /// Credential breach databases.
    BreachDb,
    /// Email intelligence lookups.
    EmailIntel,
    /// Reverse phone lookups.
    PhoneLookup,
    /// Property and occupancy records.
    PropertyRecords,
    /// Voter registration rolls.
    VoterRolls,
    /// Business and corporate registries.
    BusinessRegistry,
    /// Geocoding services.
    Geocode,
    /// Anything we cannot classify.
    Unknown,
}

impl SourceKind {
    /// Classifies a source name reported by the scraper layer.
    #[must_use]
    pub fn classify(source_name: &str) -> Self {
        let name = source_name.trim().to_ascii_lowercase();
        match name.as_str() {
            "truepeoplesearch" | "fastpeoplesearch" | "whitepages" | "spokeo" | "beenverified"
            | "radaris" | "zabasearch" => Self::PeopleSearch,
            "web_search" | "google" | "bing" | "duckduckgo" | "brave_search" => Self::WebSearch,
            "sherlock" | "idcrawl" | "social_searcher" | "maigret" => Self::Social,
            "leakcheck" | "haveibeenpwned" | "hibp" | "breachdirectory" | "dehashed" => {
                Self::BreachDb
            }
            "holehe" | "email_intel" | "hunter" | "emailrep" => Self::EmailIntel,
            "phone_lookup" | "numverify" | "truecaller" | "callerid" => Self::PhoneLookup,
            "property_records" | "county_assessor" | "propwire" => Self::PropertyRecords,
            "voter_rolls" | "voterrecords" => Self::VoterRolls,
            "opencorporates" | "business_registry" | "sec_edgar" => Self::BusinessRegistry,
            "nominatim" | "geocode" | "geocodio" => Self::Geocode,
            _ => Self::classify_fuzzy(&name),
        }
    }

    fn classify_fuzzy(name: &str) -> Self {
        if name.contains("peoplesearch") || name.contains("people_search") {
            Self::PeopleSearch
        } else if name.contains("search") {
            Self::WebSearch
        } else if name.contains("social") {
            Self::Social
        } else if name.contains("breach") || name.contains("leak") {
            Self::BreachDb
        } else if name.contains("email") {
            Self::EmailIntel
        } else if name.contains("phone") {
            Self::PhoneLookup
        } else if name.contains("property") {
            Self::PropertyRecords
        } else if name.contains("voter") {
            Self::VoterRolls
        } else if name.contains("business") || name.contains("corporate") {
            Self::BusinessRegistry
        } else if name.contains("geo") {
            Self::Geocode
        } else {
            Self::Unknown
        }
    }

    /// Returns a short stable identifier suitable for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PeopleSearch => "people_search",
            Self::WebSearch => "web_search",
            Self::Social => "social",
            Self::BreachDb => "breach_db",
            Self::EmailIntel => "email_intel",
            Self::PhoneLookup => "phone_lookup",
            Self::PropertyRecords => "property_records",
            Self::VoterRolls => "voter_rolls",
            Self::BusinessRegistry => "business_registry",
            Self::Geocode => "geocode",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for people-search aggregators.
    #[must_use]
    pub const fn is_people_search(&self) -> bool {
        matches!(self, Self::PeopleSearch)
    }

    /// Returns true for web-search sources.
    #[must_use]
    pub const fn is_web_search(&self) -> bool {
        matches!(self, Self::WebSearch)
    }

    /// Returns true for social-platform sources.
    #[must_use]
    pub const fn is_social(&self) -> bool {
        matches!(self, Self::Social)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counts the distinct source kinds present in a list of source names.
#[must_use]
pub fn kinds_of(source_names: &[String]) -> Vec<SourceKind> {
    let mut kinds: Vec<SourceKind> = source_names
        .iter()
        .map(|name| SourceKind::classify(name))
        .collect();
    kinds.sort_by_key(SourceKind::as_str);
    kinds.dedup();
    kinds
}
