// crates/auth-analytics-store/src/registry.rs
// ============================================================================
// Module: Incident Registry
// Description: Single persisted JSON file plus in-memory map of
// `incident_id -> incident`, merge-on-upsert, and the lifecycle transition
// state machine.
// Purpose: Own the one piece of state every other component reads through:
// the durable record of what has been detected and how it has been triaged.
// Dependencies: auth-analytics-core, crate::persistence, std::sync
// ============================================================================

//! ## Overview
//! Every mutating call takes the registry's single `RwLock` in write mode
//! for its whole duration, merges in memory, then flushes the entire
//! mapping to disk atomically before returning — so a reader taking the
//! lock in read mode never observes a partially merged incident, and a
//! crash mid-write never corrupts the previous durable state. Unknown
//! top-level fields on a stored incident (from a future schema version)
//! are captured in [`PersistedIncident::unknown`] and re-emitted verbatim
//! on the next write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;

use auth_analytics_core::identifiers::IncidentId;
use auth_analytics_core::incident::Incident;
use auth_analytics_core::incident::IncidentStatus;
use auth_analytics_core::incident::TimelineEntry;
use auth_analytics_core::interfaces::IncidentFilter;
use auth_analytics_core::interfaces::IncidentRegistry;
use auth_analytics_core::interfaces::RegistryError;
use auth_analytics_core::time::Instant;
use serde::Deserialize;
use serde::Serialize;

use crate::persistence::read_json_opt;
use crate::persistence::write_json_atomic;

/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 1;

// ============================================================================
// SECTION: Persisted Shape
// ============================================================================

/// One incident as stored on disk: the typed fields plus anything this
/// build of the schema does not recognize.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedIncident {
    #[serde(flatten)]
    incident: Incident,
    #[serde(flatten)]
    unknown: serde_json::Map<String, serde_json::Value>,
}

/// The whole registry file: `{version, incidents: {incident_id: incident}}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedFile {
    version: u32,
    incidents: BTreeMap<String, PersistedIncident>,
}

// ============================================================================
// SECTION: File-Backed Registry
// ============================================================================

struct State {
    incidents: BTreeMap<String, PersistedIncident>,
}

/// File-backed [`IncidentRegistry`], durable to a single JSON file.
pub struct FileIncidentRegistry {
    path: PathBuf,
    state: RwLock<State>,
}

impl FileIncidentRegistry {
    /// Opens (and, if present, rehydrates) the registry at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] when the existing file cannot
    /// be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let loaded: Option<PersistedFile> =
            read_json_opt(&path).map_err(|err| RegistryError::Persistence(err.to_string()))?;
        let incidents = loaded.map(|file| file.incidents).unwrap_or_default();
        Ok(Self {
            path,
            state: RwLock::new(State { incidents }),
        })
    }

    /// Returns every incident currently held, in `created_at` order, for
    /// boot-time replay into the risk engine.
    #[must_use]
    pub fn all_by_created_at(&self) -> Vec<Incident> {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut incidents: Vec<Incident> =
            guard.incidents.values().map(|p| p.incident.clone()).collect();
        incidents.sort_by_key(|incident| incident.created_at);
        incidents
    }

    fn persist_locked(&self, incidents: &BTreeMap<String, PersistedIncident>) -> Result<(), RegistryError> {
        let file = PersistedFile {
            version: SCHEMA_VERSION,
            incidents: incidents.clone(),
        };
        write_json_atomic(&self.path, &file).map_err(|err| RegistryError::Persistence(err.to_string()))
    }
}

impl IncidentRegistry for FileIncidentRegistry {
    fn upsert(&self, incident: Incident, now: Instant) -> Result<Incident, RegistryError> {
        let mut guard = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = incident.incident_id.as_str().to_string();

        let (merged, unknown) = match guard.incidents.get(&key) {
            Some(existing) => (
                merge_incident(&existing.incident, incident, now),
                existing.unknown.clone(),
            ),
            None => (incident, serde_json::Map::new()),
        };

        guard.incidents.insert(
            key,
            PersistedIncident {
                incident: merged.clone(),
                unknown,
            },
        );
        self.persist_locked(&guard.incidents)?;
        Ok(merged)
    }

    fn transition(
        &self,
        incident_id: &IncidentId,
        target: IncidentStatus,
        resolution_reason: Option<String>,
        now: Instant,
    ) -> Result<Incident, RegistryError> {
        let mut guard = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = incident_id.as_str().to_string();
        let existing = guard.incidents.get(&key).ok_or(RegistryError::NotFound)?;

        if !is_allowed_transition(existing.incident.status, target) {
            return Err(RegistryError::InvalidTransition);
        }
        if matches!(target, IncidentStatus::Closed) && resolution_reason.is_none() {
            return Err(RegistryError::MissingResolutionReason);
        }

        let mut updated = existing.incident.clone();
        updated.status = target;
        updated.updated_at = now;
        updated.resolution_reason = if matches!(target, IncidentStatus::Closed) {
            resolution_reason
        } else {
            None
        };

        let unknown = existing.unknown.clone();
        guard.incidents.insert(
            key,
            PersistedIncident {
                incident: updated.clone(),
                unknown,
            },
        );
        self.persist_locked(&guard.incidents)?;
        Ok(updated)
    }

    fn get(&self, incident_id: &IncidentId) -> Option<Incident> {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.incidents.get(incident_id.as_str()).map(|p| p.incident.clone())
    }

    fn list(&self, filter: &IncidentFilter) -> Vec<Incident> {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .incidents
            .values()
            .map(|p| &p.incident)
            .filter(|incident| filter.status.is_none_or(|s| incident.status == s))
            .filter(|incident| {
                filter
                    .incident_type
                    .is_none_or(|t| incident.incident_type == t)
            })
            .cloned()
            .collect()
    }
}

// ============================================================================
// SECTION: Transition Graph
// ============================================================================

fn is_allowed_transition(from: IncidentStatus, to: IncidentStatus) -> bool {
    matches!(
        (from, to),
        (IncidentStatus::Open, IncidentStatus::Acknowledged)
            | (IncidentStatus::Acknowledged, IncidentStatus::Closed)
    )
}

// ============================================================================
// SECTION: Merge
// ============================================================================

fn merge_incident(existing: &Incident, new: Incident, now: Instant) -> Incident {
    let mut merged = existing.clone();

    merged.first_seen = existing.first_seen.min(new.first_seen);
    merged.last_seen = existing.last_seen.max(new.last_seen);
    merged.evidence.window_start = existing.evidence.window_start.min(new.evidence.window_start);
    merged.evidence.window_end = existing.evidence.window_end.max(new.evidence.window_end);

    merged.evidence.counts.failures =
        existing.evidence.counts.failures + new.evidence.counts.failures;
    merged.evidence.counts.distinct_users = sum_optional(
        existing.evidence.counts.distinct_users,
        new.evidence.counts.distinct_users,
    );

    merged.evidence.timeline = dedup_timeline(
        existing.evidence.timeline.clone(),
        new.evidence.timeline.clone(),
    );
    merged.evidence.events = merged.evidence.timeline.clone();

    let mut entities: BTreeSet<String> = existing.evidence.affected_entities.iter().cloned().collect();
    entities.extend(new.evidence.affected_entities.iter().cloned());
    merged.evidence.affected_entities = entities.into_iter().collect();

    merged.severity = existing.severity.max(new.severity);
    merged.confidence = existing.confidence.max(new.confidence);
    merged.updated_at = now;

    if matches!(existing.status, IncidentStatus::Closed) {
        merged.status = IncidentStatus::Open;
        merged.resolution_reason = None;
    }

    merged.summary = Incident::render_summary(
        merged.incident_type,
        &merged.subject.source_ip,
        merged.subject.username.as_deref(),
        merged.evidence.counts.failures,
        merged.evidence.counts.distinct_users,
        &merged.evidence.window_start,
        &merged.evidence.window_end,
    );

    merged
}

fn sum_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn dedup_timeline(mut combined: Vec<TimelineEntry>, more: Vec<TimelineEntry>) -> Vec<TimelineEntry> {
    combined.extend(more);
    let mut seen = HashSet::new();
    combined.retain(|entry| {
        seen.insert((entry.timestamp, entry.event_type.clone(), entry.username.clone()))
    });
    combined.sort_by_key(|entry| entry.timestamp);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_analytics_core::hashing::brute_force_incident_id;
    use auth_analytics_core::incident::Evidence;
    use auth_analytics_core::incident::EvidenceCounts;
    use auth_analytics_core::incident::IncidentType;
    use auth_analytics_core::incident::Subject;

    fn t(raw: &str) -> Instant {
        auth_analytics_core::time::parse_iso8601(raw).expect("fixture timestamp")
    }

    fn scenario_a_incident() -> Incident {
        let start = t("2026-07-28T05:00:00Z");
        let end = t("2026-07-28T05:00:04Z");
        let incident_id = brute_force_incident_id("203.0.113.10", "alice", &start, &end, 5);
        Incident {
            incident_id,
            incident_type: IncidentType::BruteForce,
            mitre: IncidentType::BruteForce.mitre(),
            subject: Subject {
                source_ip: "203.0.113.10".to_string(),
                username: Some("alice".to_string()),
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
                affected_entities: vec!["203.0.113.10".to_string(), "alice".to_string()],
            },
            summary: "placeholder".to_string(),
            recommended_actions: IncidentType::BruteForce.recommended_actions(),
            first_seen: start,
            last_seen: end,
            created_at: start,
            updated_at: start,
            resolution_reason: None,
        }
    }

    fn open_registry() -> (tempfile::TempDir, FileIncidentRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("incidents.json");
        let registry = FileIncidentRegistry::open(&path).expect("open");
        (dir, registry)
    }

    #[test]
    fn transition_graph_rejects_open_to_closed() {
        let (_dir, registry) = open_registry();
        let now = t("2026-07-28T05:00:04Z");
        registry.upsert(scenario_a_incident(), now).expect("upsert");
        let incident_id = scenario_a_incident().incident_id;
        let err = registry
            .transition(&incident_id, IncidentStatus::Closed, Some("fixed".into()), now)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition));
    }

    #[test]
    fn close_requires_resolution_reason() {
        let (_dir, registry) = open_registry();
        let now = t("2026-07-28T05:00:04Z");
        let incident_id = scenario_a_incident().incident_id;
        registry.upsert(scenario_a_incident(), now).expect("upsert");
        registry
            .transition(&incident_id, IncidentStatus::Acknowledged, None, now)
            .expect("acknowledge");
        let err = registry
            .transition(&incident_id, IncidentStatus::Closed, None, now)
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingResolutionReason));
    }

    #[test]
    fn scenario_e_merge_reopens_and_sums_counts() {
        let (_dir, registry) = open_registry();
        let now = t("2026-07-28T05:00:04Z");
        let incident_id = scenario_a_incident().incident_id;

        registry.upsert(scenario_a_incident(), now).expect("upsert");
        registry
            .transition(&incident_id, IncidentStatus::Acknowledged, None, now)
            .expect("acknowledge");
        registry
            .transition(&incident_id, IncidentStatus::Closed, Some("resolved".into()), now)
            .expect("close");

        let merged = registry
            .upsert(scenario_a_incident(), t("2026-07-28T05:00:05Z"))
            .expect("re-ingest");

        assert_eq!(merged.incident_id, incident_id);
        assert_eq!(merged.status, IncidentStatus::Open);
        assert!(merged.resolution_reason.is_none());
        assert_eq!(merged.evidence.counts.failures, 10);
    }

    #[test]
    fn repeated_upsert_of_an_identical_incident_sums_counts_per_scenario_e() {
        // Merge-on-upsert sums `evidence.counts.*` unconditionally (spec
        // §4.4), including when the incoming incident is content-identical
        // to the one already stored — this is what scenario E's re-ingest
        // (5 + 5 = 10) relies on. Re-upserting the same object a third time
        // keeps growing: the registry does not special-case "no new
        // evidence" by diffing against the stored incident. See
        // `DESIGN.md` ("Idempotency vs. merge-on-reingest") for why this is
        // taken over the literal wording of testable invariant #4.
        let (_dir, registry) = open_registry();
        let now = t("2026-07-28T05:00:04Z");
        let first = registry.upsert(scenario_a_incident(), now).expect("upsert");
        let second = registry
            .upsert(scenario_a_incident(), now)
            .expect("upsert again");
        assert_eq!(second.evidence.counts.failures, first.evidence.counts.failures * 2);
        let third = registry.upsert(scenario_a_incident(), now).expect("upsert third");
        assert_eq!(third.evidence.counts.failures, 15);
    }

    #[test]
    fn unknown_fields_round_trip_through_persist_and_rehydrate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("incidents.json");
        {
            let registry = FileIncidentRegistry::open(&path).expect("open");
            registry
                .upsert(scenario_a_incident(), t("2026-07-28T05:00:04Z"))
                .expect("upsert");
        }
        let raw = std::fs::read_to_string(&path).expect("read persisted file");
        let mut value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        value["incidents"]
            .as_object_mut()
            .expect("incidents object")
            .values_mut()
            .next()
            .expect("one incident")
            .as_object_mut()
            .expect("incident object")
            .insert("future_field".to_string(), serde_json::json!("from-a-newer-build"));
        std::fs::write(&path, serde_json::to_vec_pretty(&value).unwrap()).expect("rewrite");

        let registry = FileIncidentRegistry::open(&path).expect("reopen");
        registry
            .upsert(scenario_a_incident(), t("2026-07-28T05:00:05Z"))
            .expect("upsert again");
        let raw_again = std::fs::read_to_string(&path).expect("read again");
        assert!(raw_again.contains("future_field"));
    }
}
