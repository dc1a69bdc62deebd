//! Freeform name and address parsing.
//!
//! Sources report names and addresses as display strings. The parsers here
//! split them into structured parts with positional heuristics: first token
//! is the first name, last token is the last name; addresses split on
//! commas with a state/zip tail. Both heuristics are lossy for compound
//! surnames and international formats, so they sit behind strategy traits
//! and a better implementation can be swapped in without touching the
//! matcher or merger.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured parts of a parsed person name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub first: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,

    pub last: String,

    /// Generational suffix (Jr, Sr, II–IV) stripped from the tail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Structured parts of a parsed postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    pub street: String,
    pub city: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

/// Strategy seam for name parsing.
pub trait NameParser {
    /// Parses a freeform full-name string, or `None` if nothing usable.
    fn parse_name(&self, raw: &str) -> Option<NameParts>;
}

/// Strategy seam for address parsing.
pub trait AddressParser {
    /// Parses a freeform address string, or `None` if nothing usable.
    fn parse_address(&self, raw: &str) -> Option<AddressParts>;
}

const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

/// Positional name parser: first token → first name, last token → last
/// name, middle tokens joined → middle name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalNameParser;

impl NameParser for PositionalNameParser {
    fn parse_name(&self, raw: &str) -> Option<NameParts> {
        let mut tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }

        let mut suffix = None;
        if tokens.len() > 1 {
            let tail = tokens[tokens.len() - 1].trim_end_matches('.');
            if SUFFIXES.contains(&tail.to_ascii_lowercase().as_str()) {
                suffix = Some(tail.to_string());
                tokens.pop();
            }
        }

        let first = (*tokens.first()?).to_string();
        let last = if tokens.len() > 1 {
            (*tokens.last()?).to_string()
        } else {
            String::new()
        };
        let middle = if tokens.len() > 2 {
            Some(tokens[1..tokens.len() - 1].join(" "))
        } else {
            None
        };

        Some(NameParts {
            first,
            middle,
            last,
            suffix,
        })
    }
}

fn state_zip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(.*?)[\s,]+)?([A-Za-z]{2})(?:\s+(\d{5}(?:-\d{4})?))?$")
            .expect("state/zip regex is valid")
    })
}

/// Comma-splitting address parser for US-style address strings
/// ("123 Main St, Austin, TX 78701").
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaAddressParser;

impl AddressParser for CommaAddressParser {
    fn parse_address(&self, raw: &str) -> Option<AddressParts> {
        let segments: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.len() < 2 {
            return None;
        }

        let street = segments[0].to_string();
        if segments.len() == 2 {
            // "street, City ST 78701" or just "street, City".
            if let Some(caps) = state_zip_re().captures(segments[1]) {
                let city = caps.get(1).map(|m| m.as_str().trim().to_string());
                if let Some(city) = city.filter(|c| !c.is_empty()) {
                    return Some(AddressParts {
                        street,
                        city,
                        state: caps.get(2).map(|m| m.as_str().to_uppercase()),
                        zip: caps.get(3).map(|m| m.as_str().to_string()),
                    });
                }
            }
            return Some(AddressParts {
                street,
                city: segments[1].to_string(),
                state: None,
                zip: None,
            });
        }

        let city = segments[1].to_string();
        let tail = segments[2..].join(" ");
        let (state, zip) = match state_zip_re().captures(tail.trim()) {
            Some(caps) if caps.get(1).map_or(true, |m| m.as_str().trim().is_empty()) => (
                caps.get(2).map(|m| m.as_str().to_uppercase()),
                caps.get(3).map(|m| m.as_str().to_string()),
            ),
            _ => (None, None),
        };

        Some(AddressParts {
            street,
            city,
            state,
            zip,
        })
    }
}

/// Reduces a phone string to bare digits, stripping a leading US country
/// code. Returns `None` when fewer than seven digits remain.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.len() {
        11 if digits.starts_with('1') => digits[1..].to_string(),
        _ => digits,
    };
    if digits.len() < 7 {
        return None;
    }
    Some(digits)
}
