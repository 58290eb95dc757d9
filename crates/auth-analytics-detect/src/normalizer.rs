// crates/auth-analytics-detect/src/normalizer.rs
// ============================================================================
// Module: Normalizer
// Description: Applies a mapping profile, coerces timestamps, drops
// telemetry, validates, and sorts a raw batch into the canonical schema.
// Purpose: The single place unstructured JSON is frozen into
// `NormalizedEvent`; nothing past this module ever sees a raw event.
// Dependencies: auth-analytics-core, crate::mapping
// ============================================================================

//! ## Overview
//! Steps run in a fixed order with no branching shortcuts: resolve,
//! drop telemetry, coerce timestamp, translate result, validate, sort.
//! Per-event failures are collected, never fatal to the batch; a batch
//! with zero survivors still produces an (empty) normalized sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use auth_analytics_core::error::CoreError;
use auth_analytics_core::normalized::NormalizedEvent;
use auth_analytics_core::raw::RawEvent;

use crate::mapping::CanonicalField;
use crate::mapping::MappingConfig;

// ============================================================================
// SECTION: Telemetry Blacklist
// ============================================================================

/// Event types dropped silently regardless of profile.
pub const TELEMETRY_BLACKLIST: &[&str] = &[
    "heartbeat",
    "health_check",
    "ping",
    "keepalive",
    "metrics",
];

// ============================================================================
// SECTION: Rejection
// ============================================================================

/// One per-event normalization failure, never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEvent {
    /// Index of the event within the original input batch.
    pub original_index: usize,
    /// Structured rejection reason.
    pub reason: CoreError,
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    /// Surviving events, sorted by timestamp ascending (original index
    /// breaking ties).
    pub kept: Vec<NormalizedEvent>,
    /// Per-event failures, in original batch order.
    pub rejected: Vec<RejectedEvent>,
    /// Count of events silently dropped as telemetry (tracked separately
    /// from `rejected` since telemetry drops are not errors).
    pub telemetry_dropped: usize,
}

// ============================================================================
// SECTION: Normalize
// ============================================================================

/// Normalizes a raw batch against `mapping`, optionally forcing every event
/// to resolve against `source_hint`'s profile instead of per-event
/// inference.
#[must_use]
pub fn normalize_batch(
    raw_batch: &[RawEvent],
    mapping: &MappingConfig,
    source_hint: Option<&str>,
) -> NormalizeOutcome {
    let mut kept = Vec::new();
    let mut rejected = Vec::new();
    let mut telemetry_dropped = 0usize;

    for (original_index, raw_event) in raw_batch.iter().enumerate() {
        match normalize_one(raw_event, mapping, source_hint, original_index) {
            Ok(Some(event)) => kept.push(event),
            Ok(None) => telemetry_dropped += 1,
            Err(reason) => rejected.push(RejectedEvent {
                original_index,
                reason,
            }),
        }
    }

    // Step 6: stable sort by timestamp ascending; `sort_by_key` is a
    // stable sort, so ties preserve original input order (original_index
    // order is what was pushed above).
    kept.sort_by_key(|event| event.timestamp);

    NormalizeOutcome {
        kept,
        rejected,
        telemetry_dropped,
    }
}

/// Normalizes one event. Returns `Ok(None)` when the event is telemetry and
/// silently dropped, `Ok(Some(_))` on success, `Err(_)` on a structured
/// rejection.
fn normalize_one(
    raw_event: &RawEvent,
    mapping: &MappingConfig,
    source_hint: Option<&str>,
    original_index: usize,
) -> Result<Option<NormalizedEvent>, CoreError> {
    // Step 1: resolve source and profile.
    let resolved_source = source_hint
        .map(str::to_string)
        .or_else(|| mapping.resolve(None).resolve_field_string(raw_event, CanonicalField::Source));
    let profile = mapping.resolve(resolved_source.as_deref());

    let event_type = profile
        .resolve_field_string(raw_event, CanonicalField::EventType)
        .ok_or_else(|| CoreError::MissingRequired {
            field: CanonicalField::EventType.to_string(),
        })?
        .to_lowercase();

    // Step 2: telemetry rejection (global blacklist + profile-declared).
    if TELEMETRY_BLACKLIST.contains(&event_type.as_str()) || profile.rejects_event_type(&event_type)
    {
        return Ok(None);
    }

    // Step 3: coerce timestamp.
    let timestamp_value =
        profile
            .resolve_field(raw_event, CanonicalField::Timestamp)
            .ok_or_else(|| CoreError::MissingRequired {
                field: CanonicalField::Timestamp.to_string(),
            })?;
    let timestamp = auth_analytics_core::time::coerce_timestamp(timestamp_value).map_err(|err| {
        CoreError::TimestampParse {
            reason: err.to_string(),
        }
    })?;

    // Step 4: translate result.
    let raw_result = profile
        .resolve_field_string(raw_event, CanonicalField::Result)
        .ok_or_else(|| CoreError::MissingRequired {
            field: CanonicalField::Result.to_string(),
        })?;
    let result = profile.translate_result(&raw_result);

    // Step 5: validate against the canonical schema. The required fields
    // above already guarantee shape; this step exists as the single place
    // future structural invariants are enforced without reordering steps.
    if event_type.is_empty() {
        return Err(CoreError::SchemaInvalid {
            reason: "event_type resolved to an empty string".to_string(),
        });
    }

    let source_ip = profile.resolve_field_string(raw_event, CanonicalField::SourceIp);
    let username = profile.resolve_field_string(raw_event, CanonicalField::Username);
    let reason = profile.resolve_field_string(raw_event, CanonicalField::Reason);
    let user_agent = profile.resolve_field_string(raw_event, CanonicalField::UserAgent);
    let source = resolved_source;

    Ok(Some(NormalizedEvent {
        timestamp,
        event_type,
        result,
        source_ip,
        username,
        reason,
        user_agent,
        source,
        original_index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingConfig;
    use auth_analytics_core::normalized::Outcome;
    use serde_json::json;

    const YAML: &str = r#"
_default:
  aliases:
    timestamp: [timestamp]
    event_type: [event_type]
    result: [result]
    source_ip: [source_ip]
    username: [username]
  result_map:
    failed: failure
    ok: success
"#;

    fn raw(value: serde_json::Value) -> RawEvent {
        value.as_object().expect("object fixture").clone()
    }

    #[test]
    fn drops_telemetry_event_types_silently() {
        let mapping = MappingConfig::load(YAML).expect("loads");
        let batch = vec![raw(json!({
            "timestamp": "2026-07-28T05:00:00Z",
            "event_type": "heartbeat",
            "result": "ok"
        }))];
        let outcome = normalize_batch(&batch, &mapping, None);
        assert!(outcome.kept.is_empty());
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.telemetry_dropped, 1);
    }

    #[test]
    fn zero_survivors_still_produces_an_outcome() {
        let mapping = MappingConfig::load(YAML).expect("loads");
        let batch = vec![raw(json!({"event_type": "login"}))];
        let outcome = normalize_batch(&batch, &mapping, None);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn per_event_failures_do_not_abort_the_batch() {
        let mapping = MappingConfig::load(YAML).expect("loads");
        let batch = vec![
            raw(json!({"timestamp": "not-a-date", "event_type": "login", "result": "failed"})),
            raw(json!({
                "timestamp": "2026-07-28T05:00:01Z",
                "event_type": "login",
                "result": "failed"
            })),
        ];
        let outcome = normalize_batch(&batch, &mapping, None);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].original_index, 0);
        assert!(matches!(
            outcome.rejected[0].reason,
            CoreError::TimestampParse { .. }
        ));
    }

    #[test]
    fn kept_events_sort_by_timestamp_with_stable_tie_break() {
        let mapping = MappingConfig::load(YAML).expect("loads");
        let batch = vec![
            raw(json!({
                "timestamp": "2026-07-28T05:00:05Z",
                "event_type": "login",
                "result": "ok"
            })),
            raw(json!({
                "timestamp": "2026-07-28T05:00:00Z",
                "event_type": "login",
                "result": "failed"
            })),
            raw(json!({
                "timestamp": "2026-07-28T05:00:00Z",
                "event_type": "login",
                "result": "failed",
                "username": "second-at-same-instant"
            })),
        ];
        let outcome = normalize_batch(&batch, &mapping, None);
        assert_eq!(outcome.kept.len(), 3);
        assert_eq!(outcome.kept[0].original_index, 1);
        assert_eq!(outcome.kept[1].original_index, 2);
        assert_eq!(outcome.kept[2].original_index, 0);
    }

    #[test]
    fn translates_result_via_profile_map() {
        let mapping = MappingConfig::load(YAML).expect("loads");
        let batch = vec![raw(json!({
            "timestamp": "2026-07-28T05:00:00Z",
            "event_type": "login",
            "result": "failed",
            "source_ip": "203.0.113.10"
        }))];
        let outcome = normalize_batch(&batch, &mapping, None);
        assert_eq!(outcome.kept[0].result, Outcome::Failure);
        assert_eq!(outcome.kept[0].source_ip.as_deref(), Some("203.0.113.10"));
    }
}
