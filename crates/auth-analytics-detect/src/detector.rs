// crates/auth-analytics-detect/src/detector.rs
// ============================================================================
// Module: Sliding-Window Detector
// Description: Rule 1 (brute force, T1110) and Rule 2 (credential abuse,
// T1110.003) over a chronologically sorted normalized event sequence.
// Purpose: Turn a normalized batch into content-addressed incident
// candidates, deterministically and without reading the wall clock.
// Dependencies: auth-analytics-core, crate::config
// ============================================================================

//! ## Overview
//! Both rules key a FIFO sliding window of width `window_seconds` over
//! failures only. Rule 1 groups by `(source_ip, username)`; Rule 2 groups
//! by `source_ip` alone and additionally tracks distinct usernames in the
//! window. While a window stays continuously above threshold (no eviction
//! shrinks its front), the detector tracks one pending candidate per
//! grouping key and only finalizes it — pushes it to the output — when the
//! window's front genuinely shifts (eviction) or the batch ends. Growing a
//! window by appending more failures updates the pending candidate in
//! place rather than emitting a new one, so one sustained burst yields one
//! incident carrying its final evidence, not one incident per threshold
//! crossing — one incident per contiguous cluster (see `DESIGN.md`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use auth_analytics_core::hashing::brute_force_incident_id;
use auth_analytics_core::hashing::credential_abuse_incident_id;
use auth_analytics_core::incident::Evidence;
use auth_analytics_core::incident::EvidenceCounts;
use auth_analytics_core::incident::Incident;
use auth_analytics_core::incident::IncidentStatus;
use auth_analytics_core::incident::IncidentType;
use auth_analytics_core::incident::Severity;
use auth_analytics_core::incident::Subject;
use auth_analytics_core::incident::TimelineEntry;
use auth_analytics_core::normalized::NormalizedEvent;
use auth_analytics_core::normalized::Outcome;
use auth_analytics_core::time::Instant;

use crate::config::DetectorThresholds;

// ============================================================================
// SECTION: Severity Tables
// ============================================================================

/// Severity/confidence for a brute-force candidate, by failure count.
#[must_use]
fn brute_force_severity(failure_count: u64) -> (Severity, u8) {
    match failure_count {
        0..=9 => (Severity::Low, 70),
        10..=19 => (Severity::Medium, 85),
        _ => (Severity::High, 95),
    }
}

/// Severity/confidence for a credential-abuse candidate, by distinct user
/// count.
#[must_use]
fn credential_abuse_severity(distinct_user_count: u64) -> (Severity, u8) {
    if distinct_user_count > 15 {
        (Severity::Critical, 90)
    } else {
        (Severity::High, 90)
    }
}

// ============================================================================
// SECTION: Window State
// ============================================================================

type BruteForceKey = (String, String);

struct BruteForceWindow {
    events: VecDeque<NormalizedEvent>,
    /// Candidate built from the window's current state, not yet pushed to
    /// the output; replaced in place as the window grows, finalized
    /// (pushed) on eviction or at the end of the batch.
    pending: Option<Incident>,
}

struct CredentialAbuseWindow {
    events: VecDeque<NormalizedEvent>,
    pending: Option<Incident>,
}

/// Evicts expired entries from the front of `deque`, returning `true` when
/// at least one entry was evicted (a genuine window shift, as opposed to
/// growth-only from appending new failures).
fn evict_expired<T>(deque: &mut VecDeque<T>, lower_bound: i64) -> bool
where
    T: WindowedTimestamp,
{
    let mut evicted = false;
    while let Some(front) = deque.front() {
        if front.timestamp().unix_seconds() < lower_bound {
            deque.pop_front();
            evicted = true;
        } else {
            break;
        }
    }
    evicted
}

trait WindowedTimestamp {
    fn timestamp(&self) -> Instant;
}

impl WindowedTimestamp for NormalizedEvent {
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

// ============================================================================
// SECTION: Detect
// ============================================================================

/// Runs both detection rules over `events`, which must already be sorted
/// chronologically (the normalizer's output contract). `now` stamps
/// `created_at`/`updated_at` on every emitted candidate.
#[must_use]
pub fn detect(
    events: &[NormalizedEvent],
    thresholds: &DetectorThresholds,
    now: Instant,
) -> Vec<Incident> {
    let mut brute_force_windows: BTreeMap<BruteForceKey, BruteForceWindow> = BTreeMap::new();
    let mut credential_windows: BTreeMap<String, CredentialAbuseWindow> = BTreeMap::new();
    let mut incidents = Vec::new();

    for event in events {
        if event.result != Outcome::Failure {
            continue;
        }
        let Some(source_ip) = event.source_ip.clone() else {
            continue;
        };
        let lower_bound = event.timestamp.unix_seconds() - thresholds.window_seconds as i64;

        if let Some(username) = event.username.clone() {
            let key = (source_ip.clone(), username.clone());
            let window = brute_force_windows.entry(key).or_insert_with(|| BruteForceWindow {
                events: VecDeque::new(),
                pending: None,
            });
            if evict_expired(&mut window.events, lower_bound) {
                if let Some(finalized) = window.pending.take() {
                    incidents.push(finalized);
                }
            }
            window.events.push_back(event.clone());

            let failure_count = window.events.len() as u64;
            if failure_count >= thresholds.brute_force_min {
                let window_start = window.events.front().expect("non-empty").timestamp;
                let window_end = event.timestamp;
                window.pending = Some(build_brute_force_incident(
                    &source_ip,
                    &username,
                    &window.events,
                    failure_count,
                    window_start,
                    window_end,
                    now,
                ));
            }
        }

        let credential_window = credential_windows
            .entry(source_ip.clone())
            .or_insert_with(|| CredentialAbuseWindow {
                events: VecDeque::new(),
                pending: None,
            });
        if evict_expired(&mut credential_window.events, lower_bound) {
            if let Some(finalized) = credential_window.pending.take() {
                incidents.push(finalized);
            }
        }
        credential_window.events.push_back(event.clone());

        let failure_count = credential_window.events.len() as u64;
        let distinct_users: HashSet<&str> = credential_window
            .events
            .iter()
            .filter_map(|e| e.username.as_deref())
            .collect();
        let distinct_user_count = distinct_users.len() as u64;

        if failure_count >= thresholds.cred_abuse_min_fails
            && distinct_user_count >= thresholds.cred_abuse_min_users
        {
            let window_start = credential_window.events.front().expect("non-empty").timestamp;
            let window_end = event.timestamp;
            credential_window.pending = Some(build_credential_abuse_incident(
                &source_ip,
                &credential_window.events,
                failure_count,
                distinct_user_count,
                window_start,
                window_end,
                now,
            ));
        }
    }

    // Finalize every grouping key's still-open pending candidate, in
    // sorted key order (BTreeMap) so output order never depends on
    // processing/hashing order — the same batch always finalizes
    // identically regardless of how it was shuffled before sorting.
    for window in brute_force_windows.into_values() {
        if let Some(pending) = window.pending {
            incidents.push(pending);
        }
    }
    for window in credential_windows.into_values() {
        if let Some(pending) = window.pending {
            incidents.push(pending);
        }
    }

    incidents
}

fn timeline_from(events: &VecDeque<NormalizedEvent>) -> Vec<TimelineEntry> {
    events
        .iter()
        .map(|e| TimelineEntry {
            timestamp: e.timestamp,
            event_type: e.event_type.clone(),
            username: e.username.clone(),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_brute_force_incident(
    source_ip: &str,
    username: &str,
    window: &VecDeque<NormalizedEvent>,
    failure_count: u64,
    window_start: Instant,
    window_end: Instant,
    now: Instant,
) -> Incident {
    let incident_id =
        brute_force_incident_id(source_ip, username, &window_start, &window_end, failure_count);
    let (severity, confidence) = brute_force_severity(failure_count);
    let timeline = timeline_from(window);
    let summary = Incident::render_summary(
        IncidentType::BruteForce,
        source_ip,
        Some(username),
        failure_count,
        None,
        &window_start,
        &window_end,
    );

    Incident {
        incident_id,
        incident_type: IncidentType::BruteForce,
        mitre: IncidentType::BruteForce.mitre(),
        subject: Subject {
            source_ip: source_ip.to_string(),
            username: Some(username.to_string()),
        },
        severity,
        confidence,
        status: IncidentStatus::Open,
        evidence: Evidence {
            window_start,
            window_end,
            counts: EvidenceCounts {
                failures: failure_count,
                distinct_users: None,
            },
            timeline: timeline.clone(),
            events: timeline,
            affected_entities: vec![source_ip.to_string(), username.to_string()],
        },
        summary,
        recommended_actions: IncidentType::BruteForce.recommended_actions(),
        first_seen: window_start,
        last_seen: window_end,
        created_at: now,
        updated_at: now,
        resolution_reason: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_credential_abuse_incident(
    source_ip: &str,
    window: &VecDeque<NormalizedEvent>,
    failure_count: u64,
    distinct_user_count: u64,
    window_start: Instant,
    window_end: Instant,
    now: Instant,
) -> Incident {
    let incident_id = credential_abuse_incident_id(
        source_ip,
        &window_start,
        &window_end,
        failure_count,
        distinct_user_count,
    );
    let (severity, confidence) = credential_abuse_severity(distinct_user_count);
    let timeline = timeline_from(window);
    let summary = Incident::render_summary(
        IncidentType::CredentialAbuse,
        source_ip,
        None,
        failure_count,
        Some(distinct_user_count),
        &window_start,
        &window_end,
    );

    let mut affected_entities: Vec<String> = vec![source_ip.to_string()];
    let mut usernames: Vec<String> = window
        .iter()
        .filter_map(|e| e.username.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    usernames.sort();
    affected_entities.extend(usernames);

    Incident {
        incident_id,
        incident_type: IncidentType::CredentialAbuse,
        mitre: IncidentType::CredentialAbuse.mitre(),
        subject: Subject {
            source_ip: source_ip.to_string(),
            username: None,
        },
        severity,
        confidence,
        status: IncidentStatus::Open,
        evidence: Evidence {
            window_start,
            window_end,
            counts: EvidenceCounts {
                failures: failure_count,
                distinct_users: Some(distinct_user_count),
            },
            timeline: timeline.clone(),
            events: timeline,
            affected_entities,
        },
        summary,
        recommended_actions: IncidentType::CredentialAbuse.recommended_actions(),
        first_seen: window_start,
        last_seen: window_end,
        created_at: now,
        updated_at: now,
        resolution_reason: None,
    }
}
