// crates/auth-analytics-core/src/interfaces.rs
// ============================================================================
// Module: Backend-Agnostic Interfaces
// Description: Contract surfaces for the incident registry, entity risk
// engine, metrics sink, and run artifact store.
// Purpose: Let `auth-analytics-server` depend on behavior, not on the
// concrete locking/persistence details that `auth-analytics-store` owns.
// Dependencies: crate::identifiers, crate::incident, crate::time, thiserror
// ============================================================================

//! ## Overview
//! One interface per concern, each with its own narrow error enum, rather
//! than one god-trait. Implementations must be deterministic and fail
//! closed on corrupt or missing data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::identifiers::EntityKind;
use crate::identifiers::IncidentId;
use crate::identifiers::RunId;
use crate::incident::Incident;
use crate::incident::IncidentStatus;
use crate::time::Instant;

// ============================================================================
// SECTION: Incident Registry
// ============================================================================

/// Errors raised by an [`IncidentRegistry`] implementation.
///
/// # Invariants
/// - Variants are stable for programmatic handling and HTTP status mapping.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested status transition is not allowed from the current state.
    #[error("invalid_transition")]
    InvalidTransition,
    /// `closed` was requested without a `resolution_reason`.
    #[error("resolution_reason is required to close an incident")]
    MissingResolutionReason,
    /// No incident exists with the given identifier.
    #[error("not_found")]
    NotFound,
    /// Persisting or loading the registry failed.
    #[error("persistence_error: {0}")]
    Persistence(String),
}

/// Filters accepted by [`IncidentRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Restrict to incidents with this status.
    pub status: Option<IncidentStatus>,
    /// Restrict to incidents of this type.
    pub incident_type: Option<crate::incident::IncidentType>,
}

/// Content-addressed, merge-on-upsert incident store.
///
/// Implementations take an exclusive lock over the whole mapping for the
/// duration of any mutating call; read calls copy a snapshot under a
/// shared lock so no reader ever observes a partially merged incident.
pub trait IncidentRegistry {
    /// Inserts a new incident, or merges it into the existing incident with
    /// the same `incident_id`. Returns the post-merge incident.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] when the merged state cannot
    /// be flushed to durable storage.
    fn upsert(&self, incident: Incident, now: Instant) -> Result<Incident, RegistryError>;

    /// Applies a lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`], [`RegistryError::InvalidTransition`],
    /// [`RegistryError::MissingResolutionReason`], or
    /// [`RegistryError::Persistence`].
    fn transition(
        &self,
        incident_id: &IncidentId,
        target: IncidentStatus,
        resolution_reason: Option<String>,
        now: Instant,
    ) -> Result<Incident, RegistryError>;

    /// Returns a snapshot of one incident.
    fn get(&self, incident_id: &IncidentId) -> Option<Incident>;

    /// Returns a snapshot of all incidents matching `filter`.
    fn list(&self, filter: &IncidentFilter) -> Vec<Incident>;
}

// ============================================================================
// SECTION: Entity Risk Engine
// ============================================================================

/// A scored entity returned by [`EntityRiskEngine::get_all`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EntityRiskSnapshot {
    /// Kind of entity (`username` or `source_ip`).
    pub entity_kind: EntityKind,
    /// Entity value.
    pub entity_value: String,
    /// Decay-observed score at the time of the snapshot.
    pub score: f64,
    /// Raw stored score (pre-decay), for audit.
    pub stored_score: f64,
    /// Total incidents ever contributed to this entity.
    pub total_incidents: u64,
    /// Currently open incidents contributing to this entity.
    pub open_incidents: u64,
    /// Highest confidence across contributing incidents.
    pub highest_confidence: u8,
    /// Instant of the most recent contribution.
    pub last_seen: Instant,
}

/// Weighted, exponentially decayed per-entity risk accumulator.
pub trait EntityRiskEngine {
    /// Records (or re-records, idempotently) an incident's contribution to
    /// its subject entities.
    fn record_incident(&self, incident: &Incident, now: Instant);

    /// Returns all scored entities, sorted by `(score desc, open_incidents
    /// desc, last_seen desc)`.
    fn get_all(&self, now: Instant) -> Vec<EntityRiskSnapshot>;

    /// Resets all accumulated state. Used only at boot, before replaying
    /// the registry in `created_at` order.
    fn reset(&self);
}

// ============================================================================
// SECTION: Metrics Sink
// ============================================================================

/// Dependency-light counters interface. The only implementation carried by
/// this workspace is an in-memory, lock-protected map; production
/// deployments may swap in a Prometheus/OpenTelemetry-backed sink without
/// this trait changing.
pub trait MetricsSink: Send + Sync {
    /// Increments a plain (unlabeled) counter by one.
    fn incr(&self, name: &'static str);

    /// Increments a labeled counter (e.g. `events_rejected_total{reason}`)
    /// by one.
    fn incr_labeled(&self, name: &'static str, label: &str);

    /// Returns a flat snapshot of every counter observed so far, keyed by
    /// `name` or `name{label}`.
    fn snapshot(&self) -> std::collections::BTreeMap<String, u64>;
}

// ============================================================================
// SECTION: Run Artifact Store
// ============================================================================

/// Errors raised by a [`RunArtifactStore`] implementation.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The run identifier failed the `^run-[0-9a-f]{32}$` shape check.
    #[error("invalid_run_id")]
    InvalidRunId,
    /// No run exists with the given identifier.
    #[error("not_found")]
    NotFound,
    /// Reading or writing the artifact failed.
    #[error("persistence_error: {0}")]
    Persistence(String),
}

/// Per-run raw/meta/normalized/incidents artifact persistence.
pub trait RunArtifactStore {
    /// Allocates a new run and persists its raw batch and metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Persistence`] when the write fails.
    fn create_run(
        &self,
        run_id: &RunId,
        created_at: Instant,
        raw_batch: &serde_json::Value,
    ) -> Result<(), ArtifactError>;

    /// Persists the normalized event sequence for a run.
    fn write_normalized(
        &self,
        run_id: &RunId,
        normalized: &serde_json::Value,
    ) -> Result<(), ArtifactError>;

    /// Persists the incident snapshot produced by a run.
    fn write_incidents(
        &self,
        run_id: &RunId,
        incidents: &serde_json::Value,
    ) -> Result<(), ArtifactError>;

    /// Returns run identifiers, newest first.
    fn list_runs(&self) -> Vec<RunId>;

    /// Reads a run's metadata blob.
    fn read_meta(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError>;

    /// Reads a run's normalized-event blob.
    fn read_normalized(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError>;

    /// Reads a run's incident snapshot blob.
    fn read_incidents(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError>;
}
