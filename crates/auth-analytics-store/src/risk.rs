// crates/auth-analytics-store/src/risk.rs
// ============================================================================
// Module: Entity Risk Engine
// Description: Weighted, exponentially decayed per-entity risk accumulator.
// Purpose: Turn the incident stream into a ranked view of which usernames
// and source IPs are currently the riskiest, without re-scanning incidents
// on every read.
// Dependencies: auth-analytics-core, std::sync
// ============================================================================

//! ## Overview
//! Each entity accumulates a `stored_score` at the instant of its last
//! update; reads decay that score lazily to the caller-supplied `now`
//! rather than running a background timer. A 24-hour half-life means an
//! entity untouched for 24 hours shows half its last stored score, for 48
//! hours a quarter, and so on. Contributions are idempotent per
//! `(incident_id, entity)` pair so re-ingesting or re-upserting the same
//! incident never double-counts it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;

use auth_analytics_core::identifiers::EntityKind;
use auth_analytics_core::identifiers::IncidentId;
use auth_analytics_core::incident::Incident;
use auth_analytics_core::incident::IncidentStatus;
use auth_analytics_core::incident::IncidentType;
use auth_analytics_core::interfaces::EntityRiskEngine;
use auth_analytics_core::interfaces::EntityRiskSnapshot;
use auth_analytics_core::time::Instant;

/// Half-life of the decay curve, in hours.
const DECAY_HALF_LIFE_HOURS: f64 = 24.0;

/// Per-incident-type weight applied to every contributing entity.
#[must_use]
fn weight_for(incident_type: IncidentType) -> f64 {
    match incident_type {
        IncidentType::BruteForce => 10.0,
        IncidentType::CredentialAbuse => 25.0,
    }
}

// ============================================================================
// SECTION: Accumulator
// ============================================================================

#[derive(Debug, Clone)]
struct Accumulator {
    stored_score: f64,
    last_update: Instant,
    total_incidents: u64,
    open_incidents: u64,
    highest_confidence: u8,
    last_seen: Instant,
    contributed: HashSet<IncidentId>,
}

impl Accumulator {
    fn decayed_score(&self, now: Instant) -> f64 {
        let hours = now.hours_since(&self.last_update).max(0.0);
        self.stored_score * 0.5_f64.powf(hours / DECAY_HALF_LIFE_HOURS)
    }
}

// ============================================================================
// SECTION: Entities Contributing to an Incident
// ============================================================================

fn entities_of(incident: &Incident) -> Vec<(EntityKind, String)> {
    let mut entities = vec![(EntityKind::SourceIp, incident.subject.source_ip.clone())];
    match &incident.subject.username {
        Some(username) => entities.push((EntityKind::Username, username.clone())),
        None => {
            for entity in &incident.evidence.affected_entities {
                if *entity != incident.subject.source_ip {
                    entities.push((EntityKind::Username, entity.clone()));
                }
            }
        }
    }
    entities
}

// ============================================================================
// SECTION: In-Memory Risk Engine
// ============================================================================

/// In-memory, mutex-protected [`EntityRiskEngine`].
#[derive(Debug, Default)]
pub struct InMemoryRiskEngine {
    entities: Mutex<HashMap<(EntityKind, String), Accumulator>>,
}

impl InMemoryRiskEngine {
    /// Creates an empty risk engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityRiskEngine for InMemoryRiskEngine {
    fn record_incident(&self, incident: &Incident, now: Instant) {
        let mut guard = self.entities.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (kind, value) in entities_of(incident) {
            let accumulator = guard.entry((kind, value)).or_insert_with(|| Accumulator {
                stored_score: 0.0,
                last_update: now,
                total_incidents: 0,
                open_incidents: 0,
                highest_confidence: 0,
                last_seen: incident.first_seen,
                contributed: HashSet::new(),
            });

            if !accumulator.contributed.insert(incident.incident_id.clone()) {
                continue;
            }

            let decayed = accumulator.decayed_score(now);
            accumulator.stored_score = decayed + weight_for(incident.incident_type);
            accumulator.last_update = now;
            accumulator.total_incidents += 1;
            if matches!(incident.status, IncidentStatus::Open | IncidentStatus::Acknowledged) {
                accumulator.open_incidents += 1;
            }
            accumulator.highest_confidence = accumulator.highest_confidence.max(incident.confidence);
            if incident.last_seen > accumulator.last_seen {
                accumulator.last_seen = incident.last_seen;
            }
        }
    }

    fn get_all(&self, now: Instant) -> Vec<EntityRiskSnapshot> {
        let guard = self.entities.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut snapshots: Vec<EntityRiskSnapshot> = guard
            .iter()
            .map(|((kind, value), accumulator)| EntityRiskSnapshot {
                entity_kind: *kind,
                entity_value: value.clone(),
                score: accumulator.decayed_score(now),
                stored_score: accumulator.stored_score,
                total_incidents: accumulator.total_incidents,
                open_incidents: accumulator.open_incidents,
                highest_confidence: accumulator.highest_confidence,
                last_seen: accumulator.last_seen,
            })
            .collect();

        snapshots.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.open_incidents.cmp(&a.open_incidents))
                .then(b.last_seen.cmp(&a.last_seen))
        });
        snapshots
    }

    fn reset(&self) {
        self.entities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_analytics_core::incident::Evidence;
    use auth_analytics_core::incident::EvidenceCounts;
    use auth_analytics_core::incident::Subject;
    use auth_analytics_core::identifiers::IncidentId;

    fn t(raw: &str) -> Instant {
        auth_analytics_core::time::parse_iso8601(raw).expect("fixture timestamp")
    }

    fn incident(incident_type: IncidentType, username: Option<&str>, hash_seed: &str) -> Incident {
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:01:00Z");
        Incident {
            incident_id: IncidentId::parse(format!("inc_{}", hash_seed.repeat(24)))
                .expect("fixture hash seed is valid hex"),
            incident_type,
            mitre: incident_type.mitre(),
            subject: Subject {
                source_ip: "203.0.113.10".to_string(),
                username: username.map(str::to_string),
            },
            severity: auth_analytics_core::incident::Severity::Low,
            confidence: 70,
            status: IncidentStatus::Open,
            evidence: Evidence {
                window_start: start,
                window_end: end,
                counts: EvidenceCounts {
                    failures: 5,
                    distinct_users: None,
                },
                timeline: vec![],
                events: vec![],
                affected_entities: vec!["203.0.113.10".to_string()],
            },
            summary: "test".to_string(),
            recommended_actions: incident_type.recommended_actions(),
            first_seen: start,
            last_seen: end,
            created_at: start,
            updated_at: start,
            resolution_reason: None,
        }
    }

    #[test]
    fn weight_is_applied_once_per_incident_and_entity() {
        let engine = InMemoryRiskEngine::new();
        let inc = incident(IncidentType::BruteForce, Some("alice"), "1");
        let now = t("2026-07-28T05:01:00Z");
        engine.record_incident(&inc, now);
        engine.record_incident(&inc, now);
        let snapshots = engine.get_all(now);
        let alice = snapshots
            .iter()
            .find(|s| s.entity_value == "alice")
            .expect("alice present");
        assert_eq!(alice.stored_score, 10.0);
        assert_eq!(alice.total_incidents, 1);
    }

    #[test]
    fn score_decays_monotonically_with_elapsed_time() {
        let engine = InMemoryRiskEngine::new();
        let inc = incident(IncidentType::BruteForce, Some("alice"), "2");
        let recorded_at = t("2026-07-28T05:01:00Z");
        engine.record_incident(&inc, recorded_at);

        let at_zero = engine.get_all(recorded_at)[0].score;
        let at_24h = engine.get_all(t("2026-07-29T05:01:00Z"))[0].score;
        let at_48h = engine.get_all(t("2026-07-30T05:01:00Z"))[0].score;

        assert!(at_24h < at_zero);
        assert!(at_48h < at_24h);
        assert!((at_24h - at_zero / 2.0).abs() < 1e-9);
    }

    #[test]
    fn credential_abuse_credits_every_affected_username() {
        let engine = InMemoryRiskEngine::new();
        let mut inc = incident(IncidentType::CredentialAbuse, None, "3");
        inc.evidence.affected_entities = vec![
            "203.0.113.10".to_string(),
            "alice".to_string(),
            "bob".to_string(),
        ];
        let now = t("2026-07-28T05:01:00Z");
        engine.record_incident(&inc, now);
        let snapshots = engine.get_all(now);
        assert!(snapshots.iter().any(|s| s.entity_value == "alice"));
        assert!(snapshots.iter().any(|s| s.entity_value == "bob"));
        assert!(snapshots.iter().any(|s| s.entity_value == "203.0.113.10"));
    }

    #[test]
    fn reset_clears_all_accumulated_state() {
        let engine = InMemoryRiskEngine::new();
        let inc = incident(IncidentType::BruteForce, Some("alice"), "4");
        let now = t("2026-07-28T05:01:00Z");
        engine.record_incident(&inc, now);
        engine.reset();
        assert!(engine.get_all(now).is_empty());
    }
}
