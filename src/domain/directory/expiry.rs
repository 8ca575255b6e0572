//! Parsing of directory expiry timestamps

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::DomainError;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a directory expiry value
///
/// Absent, empty and the literal `"null"` mean "never expires". RFC 3339 is
/// expected; timestamps without an offset are read as UTC.
pub fn parse_expiry(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, DomainError> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| DomainError::decode(format!("Invalid expiry '{}': {}", raw, e)))
}
