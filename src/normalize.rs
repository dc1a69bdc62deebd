//! Raw finding normalization.
//!
//! A raw finding is one result returned by a single external lookup. Its
//! payload shape depends on the adapter that produced it, so findings enter
//! the pipeline as tagged JSON and are decoded into one variant per known
//! adapter family. An unrecognized shape degrades to zero extractable
//! records; a malformed one is logged and skipped, never fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::confidence::Confidence;
use crate::error::NormalizeError;
use crate::parse::{
    AddressParser, CommaAddressParser, NameParser, NameParts, PositionalNameParser,
};
use crate::policy::ScoringPolicy;
use crate::record::{
    Address, CurrentLocation, Email, PersonName, PersonRecord, Phone, SocialProfile,
};
use crate::score;

/// One raw result from a single external lookup for a single target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    /// Name of the source that produced this finding.
    pub source_name: String,

    /// Adapter family tag; selects the payload shape.
    pub agent_type: String,

    /// Source-specific payload, untouched.
    pub payload: Value,

    /// Optional adapter-supplied confidence for the whole finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_hint: Option<f32>,
}

impl RawFinding {
    /// Creates a finding.
    #[must_use]
    pub fn new(
        source_name: impl Into<String>,
        agent_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            agent_type: agent_type.into(),
            payload,
            confidence_hint: None,
        }
    }

    /// Sets the adapter's confidence hint.
    #[must_use]
    pub fn with_confidence_hint(mut self, hint: f32) -> Self {
        self.confidence_hint = Some(hint);
        self
    }

    /// Stable content fingerprint over source, agent type, and payload.
    ///
    /// A retried fetch of the same data produces the same fingerprint, so
    /// callers can drop byte-identical duplicates before normalizing.
    /// (Payload maps serialize with sorted keys, so the hash is
    /// insertion-order independent.)
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source_name.as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.agent_type.as_bytes());
        hasher.update(b"\x00");
        let payload = serde_json::to_string(&self.payload).unwrap_or_default();
        hasher.update(payload.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Decodes the payload into its adapter-family variant.
    ///
    /// # Errors
    ///
    /// Returns `NormalizeError::PayloadShapeMismatch` when a known agent
    /// type carries a payload that does not deserialize to its shape.
    pub fn decode(&self) -> Result<FindingPayload, NormalizeError> {
        FindingPayload::classify(&self.source_name, &self.agent_type, self.payload.clone())
    }
}

/// A person entry inside a people-search result list.
///
/// Adapters disagree on field presence, so everything except the payload
/// container itself is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonEntry {
    pub name: Option<String>,
    pub age: Option<u8>,
    /// "City, ST" display location.
    pub location: Option<String>,
    pub addresses: Vec<AddressEntry>,
    pub phones: Vec<PhoneEntry>,
    pub emails: Vec<String>,
    pub relatives: Vec<String>,
    pub url: Option<String>,
}

/// An address inside a people-search entry: either a display string or a
/// structured object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressEntry {
    Text(String),
    Structured {
        street: String,
        city: String,
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        zip: Option<String>,
        #[serde(default)]
        is_current: bool,
        #[serde(default)]
        from_year: Option<u16>,
        #[serde(default)]
        to_year: Option<u16>,
    },
}

/// A phone inside a people-search entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhoneEntry {
    Text(String),
    Structured {
        number: String,
        #[serde(default)]
        phone_type: Option<String>,
        #[serde(default)]
        carrier: Option<String>,
        #[serde(default)]
        is_current: bool,
    },
}

/// People-search result list (TruePeopleSearch-style).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonSearchPayload {
    pub persons: Vec<PersonEntry>,
}

/// Reverse phone lookup response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneLookupPayload {
    pub number: Option<String>,
    pub name: Option<String>,
    pub carrier: Option<String>,
    pub line_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// A profile reported by an email-intelligence lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub platform: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Email intelligence response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailIntelPayload {
    pub address: Option<String>,
    pub name: Option<String>,
    pub breach_count: Option<u32>,
    pub profiles: Vec<ProfileEntry>,
}

/// Social-platform existence probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialCheckPayload {
    pub platform: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub exists: bool,
}

/// One web-search snippet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snippet {
    pub title: String,
    pub url: Option<String>,
    pub text: String,
}

/// Web-search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchPayload {
    pub snippets: Vec<Snippet>,
}

/// Property / occupancy records response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecordsPayload {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub occupants: Vec<String>,
    pub owner: Option<String>,
}

/// Tagged union of every known adapter payload shape.
///
/// The tag is the finding's `agent_type`; anything unrecognized lands in
/// `Unknown` and yields no extractable records.
#[derive(Debug, Clone)]
pub enum FindingPayload {
    PersonSearch(PersonSearchPayload),
    PhoneLookup(PhoneLookupPayload),
    EmailIntel(EmailIntelPayload),
    SocialCheck(SocialCheckPayload),
    WebSearch(WebSearchPayload),
    PropertyRecords(PropertyRecordsPayload),
    Unknown(Value),
}

impl FindingPayload {
    /// Decodes a payload for the given agent type.
    ///
    /// # Errors
    ///
    /// Returns `NormalizeError::PayloadShapeMismatch` when the agent type
    /// is known but the payload does not match its shape.
    pub fn classify(
        source_name: &str,
        agent_type: &str,
        payload: Value,
    ) -> Result<Self, NormalizeError> {
        let mismatch = |reason: String| NormalizeError::PayloadShapeMismatch {
            source_name: source_name.to_string(),
            agent_type: agent_type.to_string(),
            reason,
        };
        match agent_type {
            "person_search" | "people_search" => serde_json::from_value(payload)
                .map(Self::PersonSearch)
                .map_err(|e| mismatch(e.to_string())),
            "phone_lookup" => serde_json::from_value(payload)
                .map(Self::PhoneLookup)
                .map_err(|e| mismatch(e.to_string())),
            "email_intel" => serde_json::from_value(payload)
                .map(Self::EmailIntel)
                .map_err(|e| mismatch(e.to_string())),
            "social_check" => serde_json::from_value(payload)
                .map(Self::SocialCheck)
                .map_err(|e| mismatch(e.to_string())),
            "web_search" => serde_json::from_value(payload)
                .map(Self::WebSearch)
                .map_err(|e| mismatch(e.to_string())),
            "property_records" => serde_json::from_value(payload)
                .map(Self::PropertyRecords)
                .map_err(|e| mismatch(e.to_string())),
            _ => Ok(Self::Unknown(payload)),
        }
    }
}

/// Converts raw findings into person records.
///
/// Pure transformation: no I/O, no shared state. Parser strategies are
/// pluggable; the defaults use the positional heuristics.
pub struct Normalizer {
    policy: ScoringPolicy,
    name_parser: Box<dyn NameParser + Send + Sync>,
    address_parser: Box<dyn AddressParser + Send + Sync>,
}

impl Normalizer {
    /// Creates a normalizer with the default positional parsers.
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            name_parser: Box::new(PositionalNameParser),
            address_parser: Box::new(CommaAddressParser),
        }
    }

    /// Creates a normalizer with custom parser strategies.
    #[must_use]
    pub fn with_parsers(
        policy: ScoringPolicy,
        name_parser: Box<dyn NameParser + Send + Sync>,
        address_parser: Box<dyn AddressParser + Send + Sync>,
    ) -> Self {
        Self {
            policy,
            name_parser,
            address_parser,
        }
    }

    /// The policy this normalizer scores fields with.
    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Normalizes one finding into zero or more person records.
    ///
    /// Malformed payloads contribute nothing; the skip is logged so the
    /// rest of the batch is unaffected.
    #[must_use]
    pub fn normalize(&self, finding: &RawFinding) -> Vec<PersonRecord> {
        let payload = match finding.decode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    source = %finding.source_name,
                    agent_type = %finding.agent_type,
                    %err,
                    "skipping malformed finding"
                );
                return Vec::new();
            }
        };

        match payload {
            FindingPayload::PersonSearch(search) => self.from_person_search(finding, &search),
            FindingPayload::PhoneLookup(lookup) => self.from_phone_lookup(finding, &lookup),
            FindingPayload::EmailIntel(intel) => self.from_email_intel(finding, &intel),
            FindingPayload::PropertyRecords(property) => self.from_property(finding, &property),
            // Existence probes and search snippets carry no standalone
            // person; they corroborate or enrich an existing subject.
            FindingPayload::SocialCheck(_) | FindingPayload::WebSearch(_) => Vec::new(),
            FindingPayload::Unknown(_) => {
                warn!(
                    source = %finding.source_name,
                    agent_type = %finding.agent_type,
                    "no extractor for agent type, ignoring finding"
                );
                Vec::new()
            }
        }
    }

    /// Normalizes a batch of findings, in arrival order.
    #[must_use]
    pub fn normalize_all<'a>(
        &self,
        findings: impl IntoIterator<Item = &'a RawFinding>,
    ) -> Vec<PersonRecord> {
        findings
            .into_iter()
            .flat_map(|finding| self.normalize(finding))
            .collect()
    }

    fn field_confidence(&self, finding: &RawFinding) -> Confidence {
        Confidence::from_hint(
            finding.confidence_hint,
            self.policy.default_field_confidence,
            self.policy.single_source_field_cap,
        )
    }

    fn parse_person_name(&self, raw: &str) -> Option<PersonName> {
        let NameParts {
            first,
            middle,
            last,
            suffix,
        } = self.name_parser.parse_name(raw)?;
        let mut name = PersonName::new(first, last).ok()?;
        if let Some(middle) = middle {
            name = name.with_middle(middle);
        }
        if let Some(suffix) = suffix {
            let suffixed = format!("{} {suffix}", name.full());
            name.add_alias(suffixed);
        }
        Some(name)
    }

    fn from_person_search(
        &self,
        finding: &RawFinding,
        search: &PersonSearchPayload,
    ) -> Vec<PersonRecord> {
        let confidence = self.field_confidence(finding);
        search
            .persons
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                self.person_from_entry(finding, entry, index, confidence)
            })
            .collect()
    }

    fn person_from_entry(
        &self,
        finding: &RawFinding,
        entry: &PersonEntry,
        index: usize,
        confidence: Confidence,
    ) -> Option<PersonRecord> {
        let name = self.parse_person_name(entry.name.as_deref()?)?;
        let mut record = PersonRecord::new(name);

        let reference = entry
            .url
            .clone()
            .unwrap_or_else(|| format!("{}#{index}", finding.agent_type));
        record.add_source_ref(&finding.source_name, reference);

        if let Some(age) = entry.age {
            record.set_age(age);
        }
        if let Some(location) = entry.location.as_deref() {
            record.current_location = self.parse_location(location, confidence);
        }
        for address in &entry.addresses {
            if let Some(address) = self.address_from_entry(address, finding, confidence) {
                record.push_address(address);
            }
        }
        for phone in &entry.phones {
            record.push_phone(phone_from_entry(phone, &finding.source_name, confidence));
        }
        for email in &entry.emails {
            if email.contains('@') {
                record.push_email(Email {
                    address: email.trim().to_lowercase(),
                    is_current: false,
                    source: finding.source_name.clone(),
                    confidence,
                    email_type: None,
                });
            }
        }
        for relative in &entry.relatives {
            record.push_relative(relative.clone());
        }

        score::recompute_scores(&mut record, &self.policy);
        Some(record)
    }

    fn parse_location(&self, raw: &str, confidence: Confidence) -> Option<CurrentLocation> {
        let mut segments = raw.split(',').map(str::trim);
        let city = segments.next().filter(|city| !city.is_empty())?;
        let state = segments
            .next()
            .filter(|state| !state.is_empty())
            .map(str::to_uppercase);
        Some(CurrentLocation {
            city: city.to_string(),
            state,
            country: None,
            confidence,
        })
    }

    fn address_from_entry(
        &self,
        entry: &AddressEntry,
        finding: &RawFinding,
        confidence: Confidence,
    ) -> Option<Address> {
        match entry {
            AddressEntry::Text(raw) => {
                let parts = self.address_parser.parse_address(raw)?;
                Some(Address {
                    street: parts.street,
                    city: parts.city,
                    state: parts.state,
                    zip: parts.zip,
                    country: None,
                    is_current: false,
                    source: finding.source_name.clone(),
                    confidence,
                    from_year: None,
                    to_year: None,
                })
            }
            AddressEntry::Structured {
                street,
                city,
                state,
                zip,
                is_current,
                from_year,
                to_year,
            } => Some(Address {
                street: street.clone(),
                city: city.clone(),
                state: state.clone(),
                zip: zip.clone(),
                country: None,
                is_current: *is_current,
                source: finding.source_name.clone(),
                confidence,
                from_year: *from_year,
                to_year: *to_year,
            }),
        }
    }

    fn from_phone_lookup(
        &self,
        finding: &RawFinding,
        lookup: &PhoneLookupPayload,
    ) -> Vec<PersonRecord> {
        // Without a subscriber name there is no person to describe; the
        // carrier detail still reaches a subject via enrichment fold.
        let Some(name) = lookup
            .name
            .as_deref()
            .and_then(|raw| self.parse_person_name(raw))
        else {
            return Vec::new();
        };
        let confidence = self.field_confidence(finding);
        let mut record = PersonRecord::new(name);
        record.add_source_ref(&finding.source_name, finding.agent_type.clone());
        if let Some(number) = lookup.number.clone() {
            record.push_phone(Phone {
                number,
                phone_type: lookup.line_type.clone(),
                is_current: true,
                source: finding.source_name.clone(),
                confidence,
                carrier: lookup.carrier.clone(),
            });
        }
        if let Some(city) = lookup.city.clone() {
            record.current_location = Some(CurrentLocation {
                city,
                state: lookup.state.clone().map(|s| s.to_uppercase()),
                country: None,
                confidence,
            });
        }
        score::recompute_scores(&mut record, &self.policy);
        vec![record]
    }

    fn from_email_intel(
        &self,
        finding: &RawFinding,
        intel: &EmailIntelPayload,
    ) -> Vec<PersonRecord> {
        let Some(name) = intel
            .name
            .as_deref()
            .and_then(|raw| self.parse_person_name(raw))
        else {
            return Vec::new();
        };
        let confidence = self.field_confidence(finding);
        let mut record = PersonRecord::new(name);
        record.add_source_ref(&finding.source_name, finding.agent_type.clone());
        if let Some(address) = intel.address.clone() {
            record.push_email(Email {
                address: address.trim().to_lowercase(),
                is_current: true,
                source: finding.source_name.clone(),
                confidence,
                email_type: intel.breach_count.map(|_| "breached".to_string()),
            });
        }
        for profile in &intel.profiles {
            record.push_social_profile(SocialProfile {
                platform: profile.platform.clone(),
                username: profile.username.clone(),
                url: profile.url.clone(),
                exists: true,
                source: finding.source_name.clone(),
            });
        }
        score::recompute_scores(&mut record, &self.policy);
        vec![record]
    }

    fn from_property(
        &self,
        finding: &RawFinding,
        property: &PropertyRecordsPayload,
    ) -> Vec<PersonRecord> {
        let (Some(street), Some(city)) = (property.street.as_ref(), property.city.as_ref()) else {
            return Vec::new();
        };
        let confidence = self.field_confidence(finding);
        property
            .occupants
            .iter()
            .filter_map(|occupant| {
                let name = self.parse_person_name(occupant)?;
                let full = name.full();
                let mut record = PersonRecord::new(name);
                record.add_source_ref(&finding.source_name, finding.agent_type.clone());
                record.push_address(Address {
                    street: street.clone(),
                    city: city.clone(),
                    state: property.state.clone(),
                    zip: property.zip.clone(),
                    country: None,
                    is_current: true,
                    source: finding.source_name.clone(),
                    confidence,
                    from_year: None,
                    to_year: None,
                });
                for other in &property.occupants {
                    if !other.trim().eq_ignore_ascii_case(full.trim()) {
                        record.push_co_resident(other.clone());
                    }
                }
                score::recompute_scores(&mut record, &self.policy);
                Some(record)
            })
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn phone_from_entry(entry: &PhoneEntry, source: &str, confidence: Confidence) -> Phone {
    match entry {
        PhoneEntry::Text(number) => Phone {
            number: number.trim().to_string(),
            phone_type: None,
            is_current: false,
            source: source.to_string(),
            confidence,
            carrier: None,
        },
        PhoneEntry::Structured {
            number,
            phone_type,
            carrier,
            is_current,
        } => Phone {
            number: number.trim().to_string(),
            phone_type: phone_type.clone(),
            is_current: *is_current,
            source: source.to_string(),
            confidence,
            carrier: carrier.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        Normalizer::default()
    }

    fn person_search_finding() -> RawFinding {
        RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({
                "persons": [{
                    "name": "John Smith",
                    "age": 42,
                    "location": "Austin, TX",
                    "addresses": ["123 Main St, Austin, TX 78701"],
                    "phones": ["512-555-0100"],
                    "emails": ["jsmith@example.com"],
                    "relatives": ["Jane Smith"],
                    "url": "https://tps.example/john-smith"
                }]
            }),
        )
    }

    #[test]
    fn test_person_search_extraction() {
        let records = normalizer().normalize(&person_search_finding());
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name.full(), "John Smith");
        assert_eq!(record.age, Some(42));
        assert_eq!(record.addresses.len(), 1);
        assert_eq!(record.addresses[0].state.as_deref(), Some("TX"));
        assert_eq!(record.phones[0].number, "512-555-0100");
        assert_eq!(record.emails[0].address, "jsmith@example.com");
        assert_eq!(record.relatives, vec!["Jane Smith".to_string()]);
        assert_eq!(
            record.source_ids.get("truepeoplesearch").map(String::as_str),
            Some("https://tps.example/john-smith")
        );
        assert!(record.scores.data_completeness.value() > 0.0);
    }

    #[test]
    fn test_multiple_persons_yield_multiple_records() {
        let finding = RawFinding::new(
            "fastpeoplesearch",
            "person_search",
            json!({
                "persons": [
                    {"name": "John Smith", "location": "Austin, TX"},
                    {"name": "John Smith", "location": "Boston, MA"}
                ]
            }),
        );
        let records = normalizer().normalize(&finding);
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn test_malformed_person_search_yields_nothing() {
        // The expected persons array is missing entirely.
        let finding = RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({"results": []}),
        );
        assert!(normalizer().normalize(&finding).is_empty());
    }

    #[test]
    fn test_malformed_finding_does_not_poison_batch() {
        let malformed = RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({"persons": "not-an-array"}),
        );
        let good = person_search_finding();
        let records = normalizer().normalize_all([&malformed, &good]);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_unknown_agent_type_degrades_quietly() {
        let finding = RawFinding::new("mystery", "quantum_probe", json!({"anything": 1}));
        assert!(matches!(
            finding.decode().unwrap(),
            FindingPayload::Unknown(_)
        ));
        assert!(normalizer().normalize(&finding).is_empty());
    }

    #[test]
    fn test_confidence_hint_is_capped() {
        let finding = person_search_finding().with_confidence_hint(0.99);
        let records = normalizer().normalize(&finding);
        let policy = ScoringPolicy::default();
        assert!(
            records[0].addresses[0].confidence.value() <= policy.single_source_field_cap
        );
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let finding = RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({"persons": [{"name": "John Smith"}]}),
        );
        let record = &normalizer().normalize(&finding)[0];
        assert!(record.age.is_none());
        assert!(record.current_location.is_none());
        assert!(record.addresses.is_empty());
        assert!(record.phones.is_empty());
        assert!(record.emails.is_empty());
    }

    #[test]
    fn test_phone_lookup_with_name() {
        let finding = RawFinding::new(
            "phone_lookup",
            "phone_lookup",
            json!({
                "number": "512-555-0100",
                "name": "John Smith",
                "carrier": "T-Mobile",
                "line_type": "mobile",
                "city": "Austin",
                "state": "tx"
            }),
        );
        let records = normalizer().normalize(&finding);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phones[0].carrier.as_deref(), Some("T-Mobile"));
        assert_eq!(
            records[0]
                .current_location
                .as_ref()
                .and_then(|l| l.state.as_deref()),
            Some("TX")
        );
    }

    #[test]
    fn test_phone_lookup_without_name_yields_nothing() {
        let finding = RawFinding::new(
            "phone_lookup",
            "phone_lookup",
            json!({"number": "512-555-0100", "carrier": "T-Mobile"}),
        );
        assert!(normalizer().normalize(&finding).is_empty());
    }

    #[test]
    fn test_email_intel_profiles() {
        let finding = RawFinding::new(
            "holehe",
            "email_intel",
            json!({
                "address": "JSmith@Example.com",
                "name": "John Smith",
                "breach_count": 3,
                "profiles": [{"platform": "github", "username": "jsmith"}]
            }),
        );
        let records = normalizer().normalize(&finding);
        assert_eq!(records[0].emails[0].address, "jsmith@example.com");
        assert_eq!(records[0].emails[0].email_type.as_deref(), Some("breached"));
        assert_eq!(records[0].social_profiles.len(), 1);
    }

    #[test]
    fn test_property_records_yield_co_residents() {
        let finding = RawFinding::new(
            "property_records",
            "property_records",
            json!({
                "street": "77 Lake Dr",
                "city": "Austin",
                "state": "TX",
                "occupants": ["Jane Doe", "John Doe"]
            }),
        );
        let records = normalizer().normalize(&finding);
        assert_eq!(records.len(), 2);
        let jane = records
            .iter()
            .find(|r| r.name.first == "Jane")
            .expect("jane record");
        assert_eq!(jane.co_residents, vec!["John Doe".to_string()]);
        assert!(jane.addresses[0].is_current);
    }

    #[test]
    fn test_social_check_yields_no_standalone_record() {
        let finding = RawFinding::new(
            "sherlock",
            "social_check",
            json!({"platform": "github", "username": "jsmith", "exists": true}),
        );
        assert!(normalizer().normalize(&finding).is_empty());
    }

    #[test]
    fn test_fingerprint_stable_across_key_order() {
        let a = RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({"persons": [], "page": 1}),
        );
        let b = RawFinding::new(
            "truepeoplesearch",
            "person_search",
            json!({"page": 1, "persons": []}),
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_by_source() {
        let a = RawFinding::new("truepeoplesearch", "person_search", json!({"persons": []}));
        let b = RawFinding::new("fastpeoplesearch", "person_search", json!({"persons": []}));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_raw_finding_serde_roundtrip() {
        let finding = person_search_finding().with_confidence_hint(0.5);
        let json = serde_json::to_string(&finding).unwrap();
        let back: RawFinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_name, "truepeoplesearch");
        assert_eq!(back.fingerprint(), finding.fingerprint());
    }
}
