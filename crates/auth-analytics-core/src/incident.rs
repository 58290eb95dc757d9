// crates/auth-analytics-core/src/incident.rs
// ============================================================================
// Module: Incident
// Description: Content-addressed incident record, its evidence, lifecycle
// status, and the fixed templates used to summarize it.
// Purpose: Give the registry, the risk engine, and the HTTP surface one
// shared, serializable incident shape.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! An incident is created once, by the detector, and then only mutated —
//! by registry merges and by lifecycle transitions. This module defines the
//! shape and the deterministic, locale-free templates; the merge and
//! transition *behavior* lives in `auth-analytics-store`, which is the
//! component that owns the registry lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::IncidentId;
use crate::time::Instant;

// ============================================================================
// SECTION: Incident Type & MITRE Mapping
// ============================================================================

/// Detector rule that produced an incident.
///
/// # Invariants
/// - Variants are stable for serialization and identity hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    /// Rule 1: repeated failures against one `(source_ip, username)` pair.
    BruteForce,
    /// Rule 2: failures against many usernames from one `source_ip`.
    CredentialAbuse,
}

impl IncidentType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "brute_force",
            Self::CredentialAbuse => "credential_abuse",
        }
    }

    /// Returns the derived MITRE ATT&CK mapping for this incident type.
    #[must_use]
    pub const fn mitre(self) -> MitreRef {
        match self {
            Self::BruteForce => MitreRef {
                tactic: "credential-access",
                technique: "T1110",
                technique_name: "Brute Force",
            },
            Self::CredentialAbuse => MitreRef {
                tactic: "credential-access",
                technique: "T1110.003",
                technique_name: "Password Spraying",
            },
        }
    }

    /// Returns the fixed, ordered list of recommended actions for this type.
    #[must_use]
    pub const fn recommended_actions(self) -> [&'static str; 4] {
        match self {
            Self::BruteForce => [
                "Lock or reset credentials for the affected account",
                "Block or rate-limit the source IP address",
                "Review recent successful logins for the affected account",
                "Enable or verify multi-factor authentication for the account",
            ],
            Self::CredentialAbuse => [
                "Block or rate-limit the source IP address",
                "Audit affected accounts for any successful authentication",
                "Enforce multi-factor authentication across the affected tenant",
                "Review password policy and credential-stuffing defenses",
            ],
        }
    }
}

/// MITRE ATT&CK reference derived from an incident's type.
///
/// # Invariants
/// - Always derived from [`IncidentType::mitre`]; never constructed ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitreRef {
    /// ATT&CK tactic identifier.
    pub tactic: &'static str,
    /// ATT&CK technique identifier.
    pub technique: &'static str,
    /// Human-readable technique name.
    pub technique_name: &'static str,
}

// ============================================================================
// SECTION: Severity & Status
// ============================================================================

/// Incident severity.
///
/// # Invariants
/// - Ordinal order (`Low < Medium < High < Critical`) is used by merges to
///   pick the "stronger" of two severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Lowest severity tier.
    Low,
    /// Medium severity tier.
    Medium,
    /// High severity tier.
    High,
    /// Critical severity tier.
    Critical,
}

impl Severity {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Incident lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and transition validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly created or reopened; awaiting triage.
    Open,
    /// Triaged and under active handling.
    Acknowledged,
    /// Resolved, with a recorded resolution reason.
    Closed,
}

impl IncidentStatus {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Closed => "closed",
        }
    }
}

// ============================================================================
// SECTION: Subject & Evidence
// ============================================================================

/// The entity or entities an incident is about.
///
/// # Invariants
/// - `username` is always `None` for [`IncidentType::CredentialAbuse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Source IP address the incident is keyed on.
    pub source_ip: String,
    /// Username the incident is keyed on, absent for credential abuse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A single timeline entry referenced by an incident's evidence.
///
/// # Invariants
/// - `(timestamp, event_type, username)` is the dedup key used on merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Event instant.
    pub timestamp: Instant,
    /// Event type identifier.
    pub event_type: String,
    /// Username associated with the event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Evidence counts backing an incident.
///
/// # Invariants
/// - `failures` is at least the triggering rule's threshold.
/// - `distinct_users` is present (and `>= 5`) only for credential abuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCounts {
    /// Number of failure events backing the incident.
    pub failures: u64,
    /// Number of distinct usernames observed, for credential abuse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_users: Option<u64>,
}

/// Evidence backing an incident.
///
/// # Invariants
/// - `window_start <= window_end`.
/// - `events` and `timeline` are deduplicated by `(timestamp, event_type,
///   username)` across merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Start of the detection window.
    pub window_start: Instant,
    /// End of the detection window.
    pub window_end: Instant,
    /// Evidence counts.
    pub counts: EvidenceCounts,
    /// Chronological timeline entries.
    pub timeline: Vec<TimelineEntry>,
    /// Raw event indices (within the triggering run) backing the incident.
    pub events: Vec<TimelineEntry>,
    /// Entities affected by this incident (source IPs and/or usernames).
    pub affected_entities: Vec<String>,
}

// ============================================================================
// SECTION: Incident
// ============================================================================

/// A detected, content-addressed incident.
///
/// # Invariants
/// - `incident_id` is a pure function of `(type, subject, window_start,
///   window_end, counts)` — see [`crate::hashing`].
/// - `first_seen <= last_seen`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Content-addressed incident identifier.
    pub incident_id: IncidentId,
    /// Detector rule that produced this incident.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Derived MITRE ATT&CK mapping.
    pub mitre: MitreRef,
    /// Subject entities.
    pub subject: Subject,
    /// Current severity.
    pub severity: Severity,
    /// Current confidence, an integer percent in `[0, 100]`.
    pub confidence: u8,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Evidence backing the incident.
    pub evidence: Evidence,
    /// Deterministic templated summary string.
    pub summary: String,
    /// Fixed, ordered recommended actions for this incident's type.
    pub recommended_actions: [&'static str; 4],
    /// Instant of the first contributing event.
    pub first_seen: Instant,
    /// Instant of the most recent contributing event.
    pub last_seen: Instant,
    /// Instant the incident was first created.
    pub created_at: Instant,
    /// Instant of the most recent mutation.
    pub updated_at: Instant,
    /// Resolution reason, required to close, cleared on reopen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_reason: Option<String>,
}

impl Incident {
    /// Renders the deterministic, locale-free summary for an incident.
    ///
    /// Parameterized only by `type`, the failure/user count, the subject,
    /// and the window bounds — no locale formatting, no randomness.
    #[must_use]
    pub fn render_summary(
        incident_type: IncidentType,
        source_ip: &str,
        username: Option<&str>,
        failure_count: u64,
        distinct_user_count: Option<u64>,
        window_start: &Instant,
        window_end: &Instant,
    ) -> String {
        match incident_type {
            IncidentType::BruteForce => format!(
                "{failure_count} failed login attempts for user '{}' from {source_ip} between {window_start} and {window_end}",
                username.unwrap_or("unknown"),
            ),
            IncidentType::CredentialAbuse => format!(
                "{failure_count} failed login attempts across {} distinct usernames from {source_ip} between {window_start} and {window_end}",
                distinct_user_count.unwrap_or(0),
            ),
        }
    }

    /// Returns `true` when this incident is stale: still open and its
    /// `last_seen` is more than seven days before `now`.
    #[must_use]
    pub fn is_stale(&self, now: &Instant) -> bool {
        const STALE_SECONDS: i64 = 7 * 24 * 3600;
        matches!(self.status, IncidentStatus::Open)
            && now.unix_seconds() - self.last_seen.unix_seconds() > STALE_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mitre_mapping_is_derived_from_type() {
        assert_eq!(IncidentType::BruteForce.mitre().technique, "T1110");
        assert_eq!(
            IncidentType::CredentialAbuse.mitre().technique,
            "T1110.003"
        );
    }

    #[test]
    fn recommended_actions_has_exactly_four_entries_per_type() {
        assert_eq!(IncidentType::BruteForce.recommended_actions().len(), 4);
        assert_eq!(IncidentType::CredentialAbuse.recommended_actions().len(), 4);
    }

    #[test]
    fn severity_ordinal_orders_as_specified() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn summary_is_deterministic_for_identical_inputs() {
        let start = crate::time::parse_iso8601("2026-07-28T05:00:00Z").expect("start");
        let end = crate::time::parse_iso8601("2026-07-28T05:00:04Z").expect("end");
        let a = Incident::render_summary(
            IncidentType::BruteForce,
            "203.0.113.10",
            Some("alice"),
            5,
            None,
            &start,
            &end,
        );
        let b = Incident::render_summary(
            IncidentType::BruteForce,
            "203.0.113.10",
            Some("alice"),
            5,
            None,
            &start,
            &end,
        );
        assert_eq!(a, b);
    }
}
