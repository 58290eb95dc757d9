// crates/auth-analytics-core/src/identifiers.rs
// ============================================================================
// Module: Canonical Identifiers
// Description: Opaque, validated identifiers for runs, incidents, and
// risk-scored entities.
// Purpose: Keep identifier shapes out of stringly-typed code so invalid
// identifiers cannot be constructed and forwarded silently.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers here are opaque newtypes with validated constructors. They
//! serialize as plain strings on the wire so the HTTP surface and the
//! on-disk artifact layout stay human-readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Run Identifier
// ============================================================================

/// Run identifier, always of the shape `run-<32 lowercase hex chars>`.
///
/// # Invariants
/// - Always matches `^run-[0-9a-f]{32}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Validates and wraps a run identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRunId`] when `raw` does not match the expected shape.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidRunId> {
        let raw = raw.into();
        if is_valid_run_id(&raw) {
            Ok(Self(raw))
        } else {
            Err(InvalidRunId(raw))
        }
    }

    /// Builds a run identifier from 32 already-validated lowercase hex chars.
    #[must_use]
    pub fn from_hex32(hex32: &str) -> Self {
        debug_assert!(hex32.len() == 32 && hex32.bytes().all(|b| b.is_ascii_hexdigit()));
        Self(format!("run-{hex32}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error raised when a run identifier does not match `^run-[0-9a-f]{32}$`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid run id: {0}")]
pub struct InvalidRunId(pub String);

fn is_valid_run_id(raw: &str) -> bool {
    raw.strip_prefix("run-")
        .is_some_and(|hex| hex.len() == 32 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

// ============================================================================
// SECTION: Incident Identifier
// ============================================================================

/// Incident identifier, always of the shape `inc_<24 lowercase hex chars>`.
///
/// # Invariants
/// - Always matches `^inc_[0-9a-f]{24}$`.
/// - Constructed only from the canonical hash in [`crate::hashing`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(String);

impl IncidentId {
    /// Validates and wraps an incident identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIncidentId`] when `raw` does not match the expected shape.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidIncidentId> {
        let raw = raw.into();
        if is_valid_incident_id(&raw) {
            Ok(Self(raw))
        } else {
            Err(InvalidIncidentId(raw))
        }
    }

    /// Builds an incident identifier from 24 already-validated hex chars.
    #[must_use]
    pub(crate) fn from_hex24(hex24: &str) -> Self {
        debug_assert!(hex24.len() == 24 && hex24.bytes().all(|b| b.is_ascii_hexdigit()));
        Self(format!("inc_{hex24}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error raised when an incident identifier does not match `^inc_[0-9a-f]{24}$`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid incident id: {0}")]
pub struct InvalidIncidentId(pub String);

fn is_valid_incident_id(raw: &str) -> bool {
    raw.strip_prefix("inc_")
        .is_some_and(|hex| hex.len() == 24 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

// ============================================================================
// SECTION: Entity Kind
// ============================================================================

/// Kind of entity the risk engine scores.
///
/// # Invariants
/// - Variants are stable for serialization and query filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A username, scoped globally (not per source system).
    Username,
    /// A source IP address, textual (v4 or v6).
    SourceIp,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::SourceIp => f.write_str("source_ip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_accepts_well_formed_values() {
        let id = RunId::parse(format!("run-{}", "a".repeat(32))).expect("should parse");
        assert_eq!(id.as_str(), format!("run-{}", "a".repeat(32)));
    }

    #[test]
    fn run_id_rejects_wrong_length() {
        assert!(RunId::parse("run-abc").is_err());
    }

    #[test]
    fn run_id_rejects_path_traversal() {
        assert!(RunId::parse("run-../../etc/passwd").is_err());
        assert!(RunId::parse("../run-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_err());
    }

    #[test]
    fn run_id_rejects_uppercase_hex() {
        assert!(RunId::parse(format!("run-{}", "A".repeat(32))).is_err());
    }

    #[test]
    fn incident_id_round_trips() {
        let id = IncidentId::from_hex24(&"b".repeat(24));
        let id2 = IncidentId::parse(id.as_str()).expect("should parse");
        assert_eq!(id, id2);
    }

    #[test]
    fn incident_id_rejects_bad_shape() {
        assert!(IncidentId::parse("inc_short").is_err());
        assert!(IncidentId::parse(format!("bad_{}", "a".repeat(24))).is_err());
    }
}
