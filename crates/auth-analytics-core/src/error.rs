// crates/auth-analytics-core/src/error.rs
// ============================================================================
// Module: Shared Core Errors
// Description: Cross-cutting error taxonomy shared by the mapping loader,
// normalizer, and detector.
// Purpose: Give every per-event rejection a stable, structured reason
// instead of an opaque string, so metrics counters can key on it.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Per-event failures are recovered locally and never abort a batch; see
//! `auth-analytics-detect::normalizer`. This enum is the stable vocabulary
//! those rejections use, matching the taxonomy's `event_rejected{reason}`
//! shape.

use thiserror::Error;

/// Cross-cutting core errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling and counter labeling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A required canonical field could not be resolved from the raw event.
    #[error("missing_required:{field}")]
    MissingRequired {
        /// The canonical field name that could not be resolved.
        field: String,
    },
    /// The event's timestamp could not be parsed.
    #[error("timestamp_parse:{reason}")]
    TimestampParse {
        /// Human-readable parse failure reason.
        reason: String,
    },
    /// The event failed canonical schema validation.
    #[error("schema:{reason}")]
    SchemaInvalid {
        /// Human-readable validation failure reason.
        reason: String,
    },
}

impl CoreError {
    /// Returns the stable counter label for this rejection reason, used by
    /// `events_rejected_total{reason}`.
    #[must_use]
    pub fn counter_label(&self) -> &'static str {
        match self {
            Self::MissingRequired { .. } => "missing_required",
            Self::TimestampParse { .. } => "timestamp_parse",
            Self::SchemaInvalid { .. } => "schema",
        }
    }
}
