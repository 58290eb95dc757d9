// crates/auth-analytics-core/src/hashing.rs
// ============================================================================
// Module: Canonical Incident Hashing
// Description: Deterministic content-addressed identity for incidents.
// Purpose: Make incident identity a pure function of evidence, never of
// clock time or process state, so replays and re-ingests of the same
// evidence always produce the same incident id.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Incident identity is computed by hashing a `|`-separated canonical
//! string built only from: type, source IP, optional username, window
//! bounds, and counts. Every field is
//! rendered with a fixed, locale-independent encoding before joining so the
//! same evidence always canonicalizes identically across implementations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

use crate::identifiers::IncidentId;
use crate::time::Instant;

// ============================================================================
// SECTION: Hex Helpers
// ============================================================================

/// Hex-encodes bytes as lowercase ASCII.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Returns the first `len` hex characters of the SHA-256 digest of `input`.
#[must_use]
fn sha256_hex_prefix(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let full = hex_encode(&digest);
    full[..len].to_string()
}

// ============================================================================
// SECTION: Canonical Parameter Encoding
// ============================================================================

/// Joins canonical parameter fields with `|`, the wire encoding hashed for
/// incident identity. Every field must canonicalize identically: ISO-8601
/// UTC second precision, `|`-separated fields, no locale-dependent
/// formatting, empty string for absent optional fields.
#[must_use]
pub fn canonical_join(parts: &[&str]) -> String {
    parts.join("|")
}

// ============================================================================
// SECTION: Incident Identity
// ============================================================================

/// Computes the deterministic brute-force incident identity.
///
/// `canonical_params = ("brute_force", source_ip, username, window_start,
/// window_end, failure_count)`.
#[must_use]
pub fn brute_force_incident_id(
    source_ip: &str,
    username: &str,
    window_start: &Instant,
    window_end: &Instant,
    failure_count: u64,
) -> IncidentId {
    let failure_count = failure_count.to_string();
    let canonical = canonical_join(&[
        "brute_force",
        source_ip,
        username,
        &window_start.to_canonical_string(),
        &window_end.to_canonical_string(),
        &failure_count,
    ]);
    IncidentId::from_hex24(&sha256_hex_prefix(&canonical, 24))
}

/// Computes the deterministic credential-abuse incident identity.
///
/// `canonical_params = ("credential_abuse", source_ip, window_start,
/// window_end, failure_count, distinct_user_count)`. There is no
/// `username` field for credential abuse (the subject has no username).
#[must_use]
pub fn credential_abuse_incident_id(
    source_ip: &str,
    window_start: &Instant,
    window_end: &Instant,
    failure_count: u64,
    distinct_user_count: u64,
) -> IncidentId {
    let failure_count = failure_count.to_string();
    let distinct_user_count = distinct_user_count.to_string();
    let canonical = canonical_join(&[
        "credential_abuse",
        source_ip,
        &window_start.to_canonical_string(),
        &window_end.to_canonical_string(),
        &failure_count,
        &distinct_user_count,
    ]);
    IncidentId::from_hex24(&sha256_hex_prefix(&canonical, 24))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> Instant {
        crate::time::parse_iso8601(raw).expect("valid fixture timestamp")
    }

    #[test]
    fn brute_force_identity_is_stable() {
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:00:04Z");
        let a = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        let b = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn brute_force_identity_changes_with_failure_count() {
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:00:04Z");
        let five = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        let six = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 6);
        assert_ne!(five, six);
    }

    #[test]
    fn credential_abuse_identity_has_no_username_component() {
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:01:00Z");
        let id = credential_abuse_incident_id("198.51.100.4", &start, &end, 10, 6);
        assert_eq!(id.as_str().len(), 28); // "inc_" + 24 hex chars
    }

    #[test]
    fn identity_depends_only_on_evidence_not_clock_time() {
        // Calling twice, even with wall-clock drift between calls, must not
        // change the identity: hashing never reads Instant::now().
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:00:04Z");
        let before = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let after = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        assert_eq!(before, after);
    }
}
