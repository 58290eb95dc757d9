// crates/auth-analytics-server/src/orchestrator.rs
// ============================================================================
// Module: Ingest Orchestrator
// Description: Composes mapping resolution, normalization, detection,
// registry upsert, risk-engine notification, artifact persistence, and
// metrics into one ingest operation.
// Purpose: Give `POST /ingest/` a single call that performs the full
// mapping-to-persistence pipeline in the required lock order.
// Dependencies: auth-analytics-core, auth-analytics-detect,
// auth-analytics-store, rand
// ============================================================================

//! ## Overview
//! Each stage is staged-merge-then-commit: normalization and detection run
//! entirely in memory before anything is written, so a failure partway
//! through never leaves a run half-persisted. The registry lock is
//! acquired and released once per incident before the risk-engine lock is
//! ever touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::RngCore;

use auth_analytics_core::hashing::hex_encode;
use auth_analytics_core::identifiers::RunId;
use auth_analytics_core::interfaces::ArtifactError;
use auth_analytics_core::interfaces::EntityRiskEngine;
use auth_analytics_core::interfaces::IncidentRegistry;
use auth_analytics_core::interfaces::MetricsSink;
use auth_analytics_core::interfaces::RegistryError;
use auth_analytics_core::interfaces::RunArtifactStore;
use auth_analytics_core::incident::Incident;
use auth_analytics_core::raw::RawEvent;
use auth_analytics_core::time::Instant;
use auth_analytics_detect::detector;
use auth_analytics_detect::normalizer;

use crate::state::AppState;

/// Outcome of one ingest operation, the literal shape of `POST /ingest/`'s
/// response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestOutcome {
    /// Allocated run identifier.
    pub run_id: RunId,
    /// Number of raw events in the submitted batch.
    pub event_count: usize,
    /// `"ok"` unconditionally; normalization failures are per-event, never
    /// batch-fatal.
    pub normalization_status: &'static str,
    /// `"ok"` unconditionally; detection never fails for a well-formed
    /// normalized sequence.
    pub detection_status: &'static str,
    /// Number of incidents created or merged by this ingest.
    pub incident_count: usize,
    /// The incidents created or merged by this ingest, post-merge.
    pub incidents: Vec<Incident>,
}

/// Errors raised while orchestrating an ingest. Registry and artifact
/// failures abort the operation and surface to the caller; normalization
/// failures never reach this enum.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The submitted body was not a non-empty JSON array.
    #[error("ingest body must be a non-empty JSON array of raw events")]
    EmptyOrNotAnArray,
    /// A run artifact write failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// A registry upsert failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Allocates a new, randomly generated [`RunId`] of the shape
/// `run-<32hex>`.
fn allocate_run_id() -> RunId {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    RunId::from_hex32(&hex_encode(&bytes))
}

/// Runs the full ingest pipeline for one raw batch.
///
/// # Errors
///
/// Returns [`IngestError::EmptyOrNotAnArray`] when `raw_batch` is not a
/// non-empty JSON array; [`IngestError::Artifact`] or
/// [`IngestError::Registry`] when persistence fails partway through.
pub fn ingest(
    state: &AppState,
    raw_batch: serde_json::Value,
    source_hint: Option<&str>,
) -> Result<IngestOutcome, IngestError> {
    let events: &Vec<serde_json::Value> = raw_batch
        .as_array()
        .filter(|events| !events.is_empty())
        .ok_or(IngestError::EmptyOrNotAnArray)?;

    let raw_events: Vec<RawEvent> = events
        .iter()
        .filter_map(|value| value.as_object().cloned())
        .collect();

    let now = Instant::now();
    let run_id = allocate_run_id();
    state.artifacts.create_run(&run_id, now, &raw_batch)?;
    state.metrics.incr("runs_total");
    for _ in 0..events.len() {
        state.metrics.incr("events_ingested_total");
    }

    let outcome = normalizer::normalize_batch(&raw_events, &state.mapping, source_hint);
    for rejected in &outcome.rejected {
        state
            .metrics
            .incr_labeled("events_rejected_total", rejected.reason.counter_label());
    }
    if outcome.telemetry_dropped > 0 {
        state
            .metrics
            .incr_labeled("events_rejected_total", "telemetry");
    }
    for _ in 0..outcome.kept.len() {
        state.metrics.incr("events_normalized_total");
    }

    let normalized_json = serde_json::to_value(&outcome.kept)
        .expect("NormalizedEvent serialization is infallible");
    state.artifacts.write_normalized(&run_id, &normalized_json)?;

    let candidates = detector::detect(&outcome.kept, &state.thresholds, now);

    let mut incidents = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let existed = state.registry.get(&candidate.incident_id).is_some();
        let merged = state.registry.upsert(candidate, now)?;
        state.metrics.incr_labeled(
            if existed {
                "incidents_merged_total"
            } else {
                "incidents_created_total"
            },
            merged.incident_type.as_str(),
        );
        state.risk_engine.record_incident(&merged, now);
        incidents.push(merged);
    }

    let incidents_json =
        serde_json::to_value(&incidents).expect("Incident serialization is infallible");
    state.artifacts.write_incidents(&run_id, &incidents_json)?;

    Ok(IngestOutcome {
        run_id,
        event_count: events.len(),
        normalization_status: "ok",
        detection_status: "ok",
        incident_count: incidents.len(),
        incidents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> auth_analytics_detect::MappingConfig {
        auth_analytics_detect::MappingConfig::load(
            r#"
_default:
  aliases:
    timestamp: [timestamp]
    event_type: [event_type]
    result: [result]
    source_ip: [source_ip]
    username: [username]
"#,
        )
        .expect("mapping loads")
    }

    fn state(dir: &tempfile::TempDir) -> AppState {
        AppState {
            registry: auth_analytics_store::FileIncidentRegistry::open(
                dir.path().join("incidents.json"),
            )
            .expect("registry opens"),
            risk_engine: auth_analytics_store::InMemoryRiskEngine::new(),
            metrics: auth_analytics_store::InMemoryMetrics::new(),
            artifacts: auth_analytics_store::FileRunArtifactStore::new(dir.path().join("runs")),
            mapping: mapping(),
            thresholds: auth_analytics_detect::DetectorThresholds::default(),
        }
    }

    fn brute_force_batch() -> serde_json::Value {
        let mut events = Vec::new();
        for i in 0..5 {
            events.push(serde_json::json!({
                "timestamp": format!("2026-07-28T05:00:0{i}Z"),
                "event_type": "login_attempt",
                "result": "failure",
                "source_ip": "203.0.113.10",
                "username": "alice",
            }));
        }
        serde_json::Value::Array(events)
    }

    #[test]
    fn rejects_empty_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = state(&dir);
        let err = ingest(&app, serde_json::json!([]), None).unwrap_err();
        assert!(matches!(err, IngestError::EmptyOrNotAnArray));
    }

    #[test]
    fn rejects_non_array_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = state(&dir);
        let err = ingest(&app, serde_json::json!({"not": "an array"}), None).unwrap_err();
        assert!(matches!(err, IngestError::EmptyOrNotAnArray));
    }

    #[test]
    fn brute_force_ingest_produces_one_incident_and_updates_risk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = state(&dir);
        let result = ingest(&app, brute_force_batch(), None).expect("ingest should succeed");
        assert_eq!(result.incident_count, 1);
        assert_eq!(result.incidents[0].evidence.counts.failures, 5);

        let snapshot = app.risk_engine.get_all(Instant::now());
        assert!(snapshot.iter().any(|s| s.entity_value == "alice"));
    }

    #[test]
    fn re_ingesting_the_same_batch_merges_into_the_same_incident() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = state(&dir);
        let first = ingest(&app, brute_force_batch(), None).expect("first ingest");
        let second = ingest(&app, brute_force_batch(), None).expect("second ingest");
        assert_eq!(first.incidents[0].incident_id, second.incidents[0].incident_id);
        assert_eq!(second.incidents[0].evidence.counts.failures, 10);
    }
}
