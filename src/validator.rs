// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Field-level validation for form submissions and query parameters.
//!
//! All checks are pure and fail fast: nothing here performs I/O, and a
//! violation surfaces as a classified VALIDATION error before any network
//! call is made.

use crate::error::{ApiError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// French phone numbers: +33 / 0033 / 0 prefix, then nine digits in pairs
/// with optional separators.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?:\+|00)33|0)\s*[1-9](?:[\s.\-]*\d{2}){4}$").expect("phone pattern"));

/// Tracking numbers are 8 to 14 alphanumeric characters.
pub fn is_valid_tracking_number(value: &str) -> bool {
    (8..=14).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// French postal codes are exactly five digits.
pub fn is_valid_postal_code(value: &str) -> bool {
    value.len() == 5 && value.chars().all(|c| c.is_ascii_digit())
}

/// Reject coordinates outside the WGS84 domain.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::validation("coordinates out of valid range")
            .with_details(json!({ "latitude": "-90 to 90", "longitude": "-180 to 180" })));
    }
    Ok(())
}

/// Collect required fields that are missing or blank.
///
/// Reports all of them at once in `details.missingFields` rather than
/// failing on the first.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("required fields are missing")
            .with_details(json!({ "missingFields": missing })))
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::validation("invalid email format").with_details(json!({ "field": "email" })))
    }
}

/// Phone is optional on most forms; `None` passes, a present value must
/// match the French format.
pub fn validate_optional_phone(phone: Option<&str>) -> Result<()> {
    match phone {
        None => Ok(()),
        Some(p) if p.trim().is_empty() => Ok(()),
        Some(p) if PHONE_RE.is_match(p) => Ok(()),
        Some(_) => {
            Err(ApiError::validation("invalid phone number format")
                .with_details(json!({ "field": "phone" })))
        }
    }
}

pub fn validate_min_length(field: &str, value: &str, min: usize) -> Result<()> {
    if value.len() < min {
        Err(
            ApiError::validation(format!("field {field} must be at least {min} characters"))
                .with_details(json!({ "field": field })),
        )
    } else {
        Ok(())
    }
}
