// crates/auth-analytics-core/src/time.rs
// ============================================================================
// Module: Canonical Instant
// Description: UTC instant representation with flexible coercion from epoch
// seconds, epoch milliseconds, or ISO-8601 strings.
// Purpose: Give every other module one second-precision, UTC, `Z`-suffixed
// timestamp type instead of ad hoc string handling.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The pipeline never reads wall-clock time implicitly inside pure
//! functions; callers that need "now" (risk decay, `created_at`,
//! `updated_at`) pass it in explicitly or call [`Instant::now`] once at a
//! well-defined boundary (the orchestrator, the registry). This keeps
//! normalization and detection deterministic and replayable from fixed
//! inputs, since callers supply timestamps rather than having core logic
//! read the system clock itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Instant
// ============================================================================

/// A UTC instant with second precision, printed as ISO-8601 with a `Z`
/// suffix (e.g. `2026-07-28T05:00:00Z`).
///
/// # Invariants
/// - Always UTC.
/// - Serializes and is hashed for canonical encoding at second precision;
///   sub-second components are truncated, never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(OffsetDateTime);

impl Instant {
    /// Wraps an [`OffsetDateTime`], truncating to second precision and UTC.
    #[must_use]
    pub fn from_offset_date_time(value: OffsetDateTime) -> Self {
        let value = value.to_offset(time::UtcOffset::UTC);
        let truncated = value.replace_nanosecond(0).unwrap_or(value);
        Self(truncated)
    }

    /// Returns the current instant (the process's one wall-clock read
    /// boundary; never called from inside the normalizer or detector).
    #[must_use]
    pub fn now() -> Self {
        Self::from_offset_date_time(OffsetDateTime::now_utc())
    }

    /// Returns the underlying [`OffsetDateTime`].
    #[must_use]
    pub const fn as_offset_date_time(&self) -> OffsetDateTime {
        self.0
    }

    /// Returns the canonical ISO-8601 UTC string, second precision, `Z` suffix.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        let formatted = self
            .0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
        // Rfc3339 renders a zero UTC offset as "+00:00"; the canonical
        // encoding (and the wire format) always uses the `Z` suffix.
        if let Some(stripped) = formatted.strip_suffix("+00:00") {
            format!("{stripped}Z")
        } else {
            formatted
        }
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Whole hours elapsed between `earlier` and `self`, as a float, for
    /// decay computations. Negative when `self` precedes `earlier`.
    #[must_use]
    pub fn hours_since(&self, earlier: &Instant) -> f64 {
        (self.unix_seconds() - earlier.unix_seconds()) as f64 / 3600.0
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl Serialize for Instant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_iso8601(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while coercing a raw timestamp value into an [`Instant`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// The value's JSON shape is not a number or a string.
    #[error("timestamp must be a number or string, got: {0}")]
    UnsupportedShape(String),
    /// The value could not be parsed as an instant.
    #[error("could not parse timestamp: {0}")]
    Unparseable(String),
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Heuristic boundary distinguishing epoch seconds from epoch milliseconds:
/// any magnitude above this is treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Coerces a raw JSON value into a canonical [`Instant`].
///
/// Accepts integer epoch seconds, integer/float epoch milliseconds
/// (`abs(value) > 1e11` is treated as milliseconds), or any string
/// parseable as ISO-8601/RFC-3339.
///
/// # Errors
///
/// Returns [`TimestampError`] when the value's shape is unsupported or it
/// fails to parse.
pub fn coerce_timestamp(value: &Value) -> Result<Instant, TimestampError> {
    match value {
        Value::Number(number) => coerce_numeric(number),
        Value::String(raw) => parse_iso8601(raw).map_err(TimestampError::Unparseable),
        other => Err(TimestampError::UnsupportedShape(other.to_string())),
    }
}

fn coerce_numeric(number: &serde_json::Number) -> Result<Instant, TimestampError> {
    let as_f64 = number
        .as_f64()
        .ok_or_else(|| TimestampError::UnsupportedShape(number.to_string()))?;
    let seconds = if as_f64.abs() > EPOCH_MILLIS_THRESHOLD {
        as_f64 / 1000.0
    } else {
        as_f64
    };
    let nanos = (seconds * 1_000_000_000.0).round() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map(Instant::from_offset_date_time)
        .map_err(|err| TimestampError::Unparseable(err.to_string()))
}

/// Parses a string as ISO-8601/RFC-3339, or as a date-only string
/// (`YYYY-MM-DD`, treated as midnight UTC).
///
/// # Errors
///
/// Returns a human-readable error string when no supported format matches.
pub fn parse_iso8601(raw: &str) -> Result<Instant, String> {
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(Instant::from_offset_date_time(parsed));
    }
    // Accept a bare date with no time component by appending midnight UTC.
    if raw.len() == 10 && raw.as_bytes().get(4) == Some(&b'-') {
        let with_time = format!("{raw}T00:00:00Z");
        if let Ok(parsed) = OffsetDateTime::parse(&with_time, &Rfc3339) {
            return Ok(Instant::from_offset_date_time(parsed));
        }
    }
    Err(format!("unrecognized timestamp format: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_epoch_seconds() {
        let got = coerce_timestamp(&json!(1_700_000_000)).expect("should coerce");
        assert_eq!(got.to_canonical_string(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn coerces_epoch_millis_by_magnitude() {
        let seconds = coerce_timestamp(&json!(1_700_000_000)).expect("seconds");
        let millis = coerce_timestamp(&json!(1_700_000_000_000i64)).expect("millis");
        assert_eq!(seconds, millis);
    }

    #[test]
    fn coerces_iso8601_string() {
        let got = coerce_timestamp(&json!("2026-07-28T05:00:00Z")).expect("should coerce");
        assert_eq!(got.to_canonical_string(), "2026-07-28T05:00:00Z");
    }

    #[test]
    fn coerces_iso8601_with_offset() {
        let got = coerce_timestamp(&json!("2026-07-28T07:00:00+02:00")).expect("should coerce");
        assert_eq!(got.to_canonical_string(), "2026-07-28T05:00:00Z");
    }

    #[test]
    fn rejects_garbage_string() {
        assert!(coerce_timestamp(&json!("not-a-date")).is_err());
    }

    #[test]
    fn rejects_unsupported_shape() {
        assert!(coerce_timestamp(&json!(null)).is_err());
        assert!(coerce_timestamp(&json!(true)).is_err());
    }

    #[test]
    fn truncates_sub_second_precision() {
        let got = coerce_timestamp(&json!("2026-07-28T05:00:00.999Z")).expect("should coerce");
        assert_eq!(got.to_canonical_string(), "2026-07-28T05:00:00Z");
    }

    #[test]
    fn hours_since_is_signed() {
        let a = parse_iso8601("2026-07-28T05:00:00Z").expect("a");
        let b = parse_iso8601("2026-07-29T05:00:00Z").expect("b");
        assert!((b.hours_since(&a) - 24.0).abs() < 1e-9);
        assert!((a.hours_since(&b) + 24.0).abs() < 1e-9);
    }
}
