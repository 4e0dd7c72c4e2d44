//! Format checks intrinsic to the domain's own invariants.
//!
//! Anything richer (sanitization, length limits, file scanning) belongs to the
//! transport layer.

use crate::error::{Result, TrackerError};
use regex::Regex;
use std::sync::LazyLock;

/// Ghanaian mobile number: `0` followed by a network digit (2, 3 or 5) and eight digits.
static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0[235]\d{8}$").expect("Invalid mobile regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

/// Trims `value` and rejects it when nothing is left.
pub fn non_empty(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(TrackerError::validation(field, "is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Canonical form of an email address, as stored and as compared.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns the email trimmed and lowercased.
pub fn email(field: &'static str, value: &str) -> Result<String> {
    let normalized = normalize_email(value);
    if EMAIL_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(TrackerError::validation(
            field,
            format!("'{value}' is not a valid email address"),
        ))
    }
}

pub fn mobile_number(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if MOBILE_PATTERN.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(TrackerError::validation(
            field,
            format!("'{value}' is not a valid mobile number (expected 0[235]XXXXXXXX)"),
        ))
    }
}

/// Normalizes an optional free-text field: blank becomes `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
