//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute so bad input
//! is rejected at parse time. Domain parsing rules stay in [`crate::domain`];
//! these only adapt them to clap's `Result<T, String>` shape.

use crate::domain::{EntityKind, MAX_TITLE_LENGTH, RelationshipType};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Parse an entity kind (`feature`, `test`, `code_file`, ...).
pub fn parse_entity_kind(s: &str) -> Result<EntityKind, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

/// Parse a relationship type (`tests`, `depends_on`, ...).
pub fn parse_relationship_type(s: &str) -> Result<RelationshipType, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

/// Validate an explicit entity ID: non-empty, no whitespace.
pub fn validate_entity_id(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Entity ID cannot be empty".to_string());
    }
    if s.chars().any(char::is_whitespace) {
        return Err(format!("Entity ID '{s}' cannot contain whitespace"));
    }
    Ok(s.to_string())
}

/// Validate a title: non-empty after trimming and within the length limit.
pub fn validate_title(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    let len = s.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters (got {len})"
        ));
    }
    Ok(s.to_string())
}

/// Validate an edge weight in `[0, 1]`.
pub fn validate_weight(s: &str) -> Result<f64, String> {
    let weight: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid weight '{s}': expected a number"))?;
    if !(0.0..=1.0).contains(&weight) {
        return Err(format!("Weight must be between 0 and 1, got {weight}"));
    }
    Ok(weight)
}

/// Parse a timestamp as RFC 3339 or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid timestamp '{s}': expected RFC 3339 or YYYY-MM-DD"))
}

/// Parse a JSON argument.
pub fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("Invalid JSON: {e}"))
}
