// crates/auth-analytics-core/src/normalized.rs
// ============================================================================
// Module: Normalized Event
// Description: Canonical post-normalization event schema.
// Purpose: Give the detector a fixed, validated shape so it never needs to
// branch on source-specific fields.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`NormalizedEvent`] is the only shape the detector ever sees. It is
//! ephemeral: it lives for the duration of one run and is never persisted
//! outside the run's `normalized.json` artifact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::time::Instant;

// ============================================================================
// SECTION: Result Outcome
// ============================================================================

/// Canonical authentication outcome.
///
/// # Invariants
/// - Variants are stable for serialization and detector grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The authentication attempt succeeded.
    Success,
    /// The authentication attempt failed.
    Failure,
    /// Any outcome not mapped to success or failure.
    Other,
}

impl Outcome {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Other => "other",
        }
    }
}

// ============================================================================
// SECTION: Normalized Event
// ============================================================================

/// Canonical event shape produced by the normalizer.
///
/// # Invariants
/// - `timestamp` is a valid UTC instant.
/// - `event_type` is lower-cased.
/// - `result` is one of the enumerated [`Outcome`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Event instant, UTC, second precision.
    pub timestamp: Instant,
    /// Lower-cased event type identifier.
    pub event_type: String,
    /// Canonical outcome.
    pub result: Outcome,
    /// Textual source IP (v4 or v6), if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// Username, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Free-text reason, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Free-text user agent, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Short identifier of the originating system, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Index of this event within the original input batch, preserved for
    /// stable tie-breaking and for deduplicating evidence timelines.
    pub original_index: usize,
}
