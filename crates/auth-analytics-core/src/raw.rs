// crates/auth-analytics-core/src/raw.rs
// ============================================================================
// Module: Raw Event
// Description: Opaque, unstructured event representation at the ingest
// boundary.
// Purpose: Keep the raw layer a tagged JSON tree until the normalizer
// freezes it into the canonical schema; nothing downstream of the
// normalizer ever sees a [`RawEvent`].
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`RawEvent`] is a JSON object with no required shape. The mapping
//! loader's resolver walks it by alias and optional dot-path; the
//! normalizer is the only consumer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Raw Event
// ============================================================================

/// An opaque mapping from string keys to JSON-scalar or nested JSON values.
pub type RawEvent = Map<String, Value>;

/// Looks up a dotted path (`"a.b.c"`) inside a raw event, descending through
/// nested objects. A bare key with no dots is a direct top-level lookup.
#[must_use]
pub fn get_path<'a>(event: &'a RawEvent, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = event.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Coerces a JSON value into a trimmed string, for fields that accept
/// scalars loosely (numbers and booleans render as their literal text).
#[must_use]
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> RawEvent {
        value.as_object().expect("object fixture").clone()
    }

    #[test]
    fn get_path_resolves_top_level_key() {
        let event = event(json!({"event_type": "login"}));
        assert_eq!(
            get_path(&event, "event_type"),
            Some(&Value::String("login".into()))
        );
    }

    #[test]
    fn get_path_resolves_nested_dot_path() {
        let event = event(json!({"detail": {"outcome": {"code": "failure"}}}));
        assert_eq!(
            get_path(&event, "detail.outcome.code"),
            Some(&Value::String("failure".into()))
        );
    }

    #[test]
    fn get_path_returns_none_for_missing_segment() {
        let event = event(json!({"detail": {"outcome": "failure"}}));
        assert_eq!(get_path(&event, "detail.missing.code"), None);
    }

    #[test]
    fn value_as_string_coerces_scalars() {
        assert_eq!(value_as_string(&json!(42)), Some("42".to_string()));
        assert_eq!(value_as_string(&json!(true)), Some("true".to_string()));
        assert_eq!(value_as_string(&json!(null)), None);
    }
}
