//! Person records, the unit of evidence in dossier.
//!
//! A `PersonRecord` is one candidate description of a real person, produced
//! by normalizing a single source's finding or by merging several matched
//! records. Every attribute collection is deduplicated by its natural key
//! at all times; merging re-establishes that invariant.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::error::ValidationError;

/// Namespace for deterministic merged-record ids.
const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x8c9d_1f42_7b3a_4e06_9d50_2ab1_c377_e019);

/// Opaque identifier for a person record instance.
///
/// Fresh records get a random id; merged records get a deterministic id
/// derived from their identity bucket so re-runs over the same findings
/// produce the same merged id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives the deterministic ID for an identity bucket.
    #[must_use]
    pub fn for_identity(bucket_key: &str) -> Self {
        Self(Uuid::new_v5(&RECORD_NAMESPACE, bucket_key.as_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercases and collapses internal whitespace; the basis of every
/// natural dedup key.
pub(crate) fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A person's name as assembled from source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,

    pub last: String,

    /// Alternate spellings and nicknames seen across sources.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl PersonName {
    /// Creates a name from first and last parts.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyName` if both parts are blank.
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Result<Self, ValidationError> {
        let first = first.into().trim().to_string();
        let last = last.into().trim().to_string();
        if first.is_empty() && last.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            first,
            middle: None,
            last,
            aliases: Vec::new(),
        })
    }

    /// Sets the middle name.
    #[must_use]
    pub fn with_middle(mut self, middle: impl Into<String>) -> Self {
        let middle = middle.into().trim().to_string();
        if !middle.is_empty() {
            self.middle = Some(middle);
        }
        self
    }

    /// Returns "First Last".
    #[must_use]
    pub fn full(&self) -> String {
        match (self.first.is_empty(), self.last.is_empty()) {
            (false, false) => format!("{} {}", self.first, self.last),
            (false, true) => self.first.clone(),
            _ => self.last.clone(),
        }
    }

    /// Adds an alias, deduplicating case-insensitively.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into().trim().to_string();
        if alias.is_empty() || normalize_key(&alias) == normalize_key(&self.full()) {
            return;
        }
        let key = normalize_key(&alias);
        if !self.aliases.iter().any(|a| normalize_key(a) == key) {
            self.aliases.push(alias);
        }
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full())
    }
}

/// A 5-year age bucket.
///
/// Ages are never exact across sources, so matching prefers band overlap
/// to exact comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub lower: u8,
    pub upper: u8,
}

impl AgeBand {
    /// Buckets an age into its 5-year band (`floor(age/5)*5 ..= +4`).
    #[must_use]
    pub const fn from_age(age: u8) -> Self {
        let lower = (age / 5) * 5;
        Self {
            lower,
            upper: lower + 4,
        }
    }

    /// Returns true if the age falls inside this band.
    #[must_use]
    pub const fn contains(&self, age: u8) -> bool {
        age >= self.lower && age <= self.upper
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

/// Best-guess current city/state, independent of any street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocation {
    pub city: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    pub confidence: Confidence,
}

/// One known address, current or historical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    pub is_current: bool,
    pub source: String,
    pub confidence: Confidence,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_year: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_year: Option<u16>,
}

impl Address {
    /// Natural dedup key: normalized street+city.
    #[must_use]
    pub fn location_key(&self) -> String {
        format!("{}|{}", normalize_key(&self.street), normalize_key(&self.city))
    }

    /// Years this address is known to have been occupied, when both
    /// bounds are present.
    #[must_use]
    pub fn occupancy_years(&self) -> Option<u16> {
        match (self.from_year, self.to_year) {
            (Some(from), Some(to)) if to >= from => Some(to - from),
            _ => None,
        }
    }
}

/// One known phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phone {
    pub number: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<String>,

    pub is_current: bool,
    pub source: String,
    pub confidence: Confidence,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// One known email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub address: String,
    pub is_current: bool,
    pub source: String,
    pub confidence: Confidence,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
}

impl Email {
    /// Natural dedup key: lowercased address.
    #[must_use]
    pub fn key(&self) -> String {
        self.address.trim().to_lowercase()
    }

    /// The part before the `@`, a common username candidate.
    #[must_use]
    pub fn local_part(&self) -> Option<&str> {
        self.address.split('@').next().filter(|part| !part.is_empty())
    }
}

/// An existence check or profile discovered on a social platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub platform: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub exists: bool,
    pub source: String,
}

impl SocialProfile {
    /// Natural dedup key: platform plus username (or url when anonymous).
    #[must_use]
    pub fn key(&self) -> String {
        let handle = self
            .username
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default();
        format!("{}|{}", normalize_key(&self.platform), normalize_key(handle))
    }
}

/// Derived scores for a person record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonScores {
    pub overall_confidence: Confidence,
    pub current_us_presence: Confidence,
    pub global_presence: Confidence,
    pub data_completeness: Confidence,
}

/// One candidate description of a person from one source or merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: RecordId,

    /// When this record was created in the pipeline.
    pub created_at: DateTime<Utc>,

    /// Source name → that source's reference for this record.
    /// Grows monotonically as records merge.
    #[serde(default)]
    pub source_ids: BTreeMap<String, String>,

    pub name: PersonName,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_band: Option<AgeBand>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<CurrentLocation>,

    #[serde(default)]
    pub addresses: Vec<Address>,

    #[serde(default)]
    pub phones: Vec<Phone>,

    #[serde(default)]
    pub emails: Vec<Email>,

    /// Loosely identified relative names, not yet resolved to records.
    #[serde(default)]
    pub relatives: Vec<String>,

    /// Co-occupants discovered via property records. Kept separate from
    /// name-sourced relatives so the graph builder can assign them the
    /// weaker `co_resident` relationship hint.
    #[serde(default)]
    pub co_residents: Vec<String>,

    #[serde(default)]
    pub social_profiles: Vec<SocialProfile>,

    #[serde(default)]
    pub scores: PersonScores,
}

impl PersonRecord {
    /// Creates an empty record for a named person.
    #[must_use]
    pub fn new(name: PersonName) -> Self {
        Self {
            id: RecordId::new(),
            created_at: Utc::now(),
            source_ids: BTreeMap::new(),
            name,
            age: None,
            age_band: None,
            current_location: None,
            addresses: Vec::new(),
            phones: Vec::new(),
            emails: Vec::new(),
            relatives: Vec::new(),
            co_residents: Vec::new(),
            social_profiles: Vec::new(),
            scores: PersonScores::default(),
        }
    }

    /// Sets the age and its derived 5-year band.
    pub fn set_age(&mut self, age: u8) {
        self.age = Some(age);
        self.age_band = Some(AgeBand::from_age(age));
    }

    /// Records this source's reference for the record.
    /// A repeated source key is overwritten (last write wins).
    pub fn add_source_ref(&mut self, source: impl Into<String>, reference: impl Into<String>) {
        self.source_ids.insert(source.into(), reference.into());
    }

    /// Names of every source that contributed to this record.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.source_ids.keys().cloned().collect()
    }

    /// Number of distinct sources that contributed.
    #[must_use]
    pub fn distinct_source_count(&self) -> usize {
        self.source_ids.len()
    }

    /// Adds an address, deduplicating by normalized street+city.
    ///
    /// On a key collision the higher-confidence entry's fields win; the
    /// current flag and occupancy bounds are unioned so corroborating
    /// detail is never dropped. Returns true if a new entry was added.
    pub fn push_address(&mut self, address: Address) -> bool {
        let key = address.location_key();
        if let Some(existing) = self.addresses.iter_mut().find(|a| a.location_key() == key) {
            let is_current = existing.is_current || address.is_current;
            let from_year = merge_min(existing.from_year, address.from_year);
            let to_year = merge_max(existing.to_year, address.to_year);
            if address.confidence.value() > existing.confidence.value() {
                *existing = address;
            } else {
                if existing.state.is_none() {
                    existing.state = address.state;
                }
                if existing.zip.is_none() {
                    existing.zip = address.zip;
                }
                if existing.country.is_none() {
                    existing.country = address.country;
                }
            }
            existing.is_current = is_current;
            existing.from_year = from_year;
            existing.to_year = to_year;
            return false;
        }
        self.addresses.push(address);
        true
    }

    /// Adds a phone, deduplicating by the raw number string.
    pub fn push_phone(&mut self, phone: Phone) -> bool {
        if let Some(existing) = self.phones.iter_mut().find(|p| p.number == phone.number) {
            let is_current = existing.is_current || phone.is_current;
            if phone.confidence.value() > existing.confidence.value() {
                *existing = phone;
            } else {
                if existing.carrier.is_none() {
                    existing.carrier = phone.carrier;
                }
                if existing.phone_type.is_none() {
                    existing.phone_type = phone.phone_type;
                }
            }
            existing.is_current = is_current;
            return false;
        }
        self.phones.push(phone);
        true
    }

    /// Adds an email, deduplicating by lowercased address.
    pub fn push_email(&mut self, email: Email) -> bool {
        let key = email.key();
        if let Some(existing) = self.emails.iter_mut().find(|e| e.key() == key) {
            let is_current = existing.is_current || email.is_current;
            if email.confidence.value() > existing.confidence.value() {
                *existing = email;
            } else if existing.email_type.is_none() {
                existing.email_type = email.email_type;
            }
            existing.is_current = is_current;
            return false;
        }
        self.emails.push(email);
        true
    }

    /// Adds a social profile, deduplicating by platform+handle.
    pub fn push_social_profile(&mut self, profile: SocialProfile) -> bool {
        let key = profile.key();
        if let Some(existing) = self
            .social_profiles
            .iter_mut()
            .find(|p| p.key() == key)
        {
            existing.exists = existing.exists || profile.exists;
            if existing.url.is_none() {
                existing.url = profile.url;
            }
            return false;
        }
        self.social_profiles.push(profile);
        true
    }

    /// Adds a relative name, deduplicating case-insensitively.
    pub fn push_relative(&mut self, name: impl Into<String>) -> bool {
        push_name(&mut self.relatives, name)
    }

    /// Adds a co-resident name, deduplicating case-insensitively.
    /// A name already listed as a relative is not duplicated here.
    pub fn push_co_resident(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let key = normalize_key(&name);
        if self.relatives.iter().any(|r| normalize_key(r) == key) {
            return false;
        }
        push_name(&mut self.co_residents, name)
    }
}

fn push_name(list: &mut Vec<String>, name: impl Into<String>) -> bool {
    let name = name.into().trim().to_string();
    if name.is_empty() {
        return false;
    }
    let key = normalize_key(&name);
    if list.iter().any(|existing| normalize_key(existing) == key) {
        return false;
    }
    list.push(name);
    true
}

fn merge_min(a: Option<u16>, b: Option<u16>) -> Option<u16> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn merge_max(a: Option<u16>, b: Option<u16>) -> Option<u16> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

impl PartialEq for PersonRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PersonRecord {}

impl std::hash::Hash for PersonRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
