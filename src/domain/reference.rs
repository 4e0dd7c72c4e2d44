use crate::error::{Result, TrackerError};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const SERVICE_REQUEST_PREFIX: &str = "ICBB";
pub const REGISTRATION_PREFIX: &str = "TR";
pub const CONTACT_PREFIX: &str = "MSG";

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TOKEN_LEN: usize = 6;

static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*-\d{4}-[A-Z0-9]{6}$").expect("Invalid reference regex")
});

/// Human-readable reference such as `ICBB-2402-7QK2ZD`.
///
/// Distinct from the internal storage id. Once assigned to a record it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceCode(String);

impl ReferenceCode {
    /// Parses a reference typed by a client. Case and surrounding whitespace are ignored.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        if REFERENCE_PATTERN.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(TrackerError::validation(
                "reference",
                format!("'{value}' is not a valid reference code"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl fmt::Display for ReferenceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReferenceCode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferenceCode {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ReferenceCode> for String {
    fn from(code: ReferenceCode) -> Self {
        code.0
    }
}

/// Builds `{PREFIX}-{YY}{MM}-{RANDOM6}` with a uniformly drawn base-36 token.
///
/// The result is not unique by construction; the store's uniqueness check is what
/// makes a reference unique, and callers regenerate on collision.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    prefix: &str,
    date: NaiveDate,
) -> Result<ReferenceCode> {
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(TrackerError::validation(
            "prefix",
            "prefix must be non-empty and alphanumeric",
        ));
    }
    if !prefix.as_bytes()[0].is_ascii_alphabetic() {
        return Err(TrackerError::validation(
            "prefix",
            "prefix must start with a letter",
        ));
    }

    let token: String = (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    Ok(ReferenceCode(format!(
        "{}-{:02}{:02}-{}",
        prefix.to_ascii_uppercase(),
        date.year().rem_euclid(100),
        date.month(),
        token
    )))
}

/// Source of fresh reference codes.
pub trait ReferenceSource: Send + Sync {
    fn next(&self, prefix: &str, date: NaiveDate) -> Result<ReferenceCode>;
}

/// Draws tokens from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReferences;

impl ReferenceSource for RandomReferences {
    fn next(&self, prefix: &str, date: NaiveDate) -> Result<ReferenceCode> {
        generate(&mut rand::thread_rng(), prefix, date)
    }
}
