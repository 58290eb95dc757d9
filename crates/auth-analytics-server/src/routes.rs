// crates/auth-analytics-server/src/routes.rs
// ============================================================================
// Module: HTTP Route Handlers
// Description: axum handlers implementing the external interface surface.
// Purpose: Adapt the library crates' behavior onto HTTP without either
// library crate depending on axum.
// Dependencies: axum, auth-analytics-core, auth-analytics-store
// ============================================================================

//! ## Overview
//! Every handler takes `State<SharedState>` and returns `Result<impl
//! IntoResponse, ApiError>`. Response field names match the documented
//! external interface verbatim; no handler wraps a payload in an envelope
//! beyond what that surface specifies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;

use auth_analytics_core::identifiers::IncidentId;
use auth_analytics_core::identifiers::RunId;
use auth_analytics_core::incident::Incident;
use auth_analytics_core::incident::IncidentStatus;
use auth_analytics_core::interfaces::EntityRiskEngine;
use auth_analytics_core::interfaces::IncidentFilter;
use auth_analytics_core::interfaces::IncidentRegistry;
use auth_analytics_core::interfaces::MetricsSink;
use auth_analytics_core::interfaces::RunArtifactStore;
use auth_analytics_core::time::Instant;

use crate::errors::ApiError;
use crate::orchestrator;
use crate::state::SharedState;

/// Builds the full axum [`Router`] for the external interface.
#[must_use]
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/ingest/", post(ingest))
        .route("/runs/", get(list_runs))
        .route("/runs/{id}/meta", get(run_meta))
        .route("/runs/{id}/normalized", get(run_normalized))
        .route("/runs/{id}/incidents", get(run_incidents))
        .route("/incidents/", get(list_incidents))
        .route("/incidents/{id}", get(get_incident))
        .route("/incidents/{id}", patch(patch_incident))
        .route("/entity-risk/", get(entity_risk))
        .route("/metrics/", get(metrics))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

async fn ingest(
    State(state): State<SharedState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = orchestrator::ingest(&state, body, None).map_err(|err| match err {
        orchestrator::IngestError::EmptyOrNotAnArray => ApiError::BadRequest(err.to_string()),
        orchestrator::IngestError::Artifact(inner) => inner.into(),
        orchestrator::IngestError::Registry(inner) => inner.into(),
    })?;
    Ok(Json(outcome))
}

// ============================================================================
// SECTION: Runs
// ============================================================================

async fn list_runs(State(state): State<SharedState>) -> impl IntoResponse {
    let runs: Vec<String> = state
        .artifacts
        .list_runs()
        .into_iter()
        .map(|id| id.as_str().to_string())
        .collect();
    Json(runs)
}

fn parse_run_id(raw: &str) -> Result<RunId, ApiError> {
    auth_analytics_store::artifacts::validate_run_id(raw).map_err(Into::into)
}

async fn run_meta(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = parse_run_id(&raw_id)?;
    let meta = state
        .artifacts
        .read_meta(&run_id)?
        .ok_or_else(|| ApiError::NotFound("run not found".to_string()))?;
    Ok(Json(meta))
}

async fn run_normalized(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = parse_run_id(&raw_id)?;
    let events = state
        .artifacts
        .read_normalized(&run_id)?
        .ok_or_else(|| ApiError::NotFound("run not found".to_string()))?;
    let event_count = events.as_array().map_or(0, Vec::len);
    Ok(Json(serde_json::json!({
        "event_count": event_count,
        "events": events,
    })))
}

async fn run_incidents(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = parse_run_id(&raw_id)?;
    let incidents = state
        .artifacts
        .read_incidents(&run_id)?
        .ok_or_else(|| ApiError::NotFound("run not found".to_string()))?;
    let incident_count = incidents.as_array().map_or(0, Vec::len);
    Ok(Json(serde_json::json!({
        "incident_count": incident_count,
        "incidents": incidents,
    })))
}

// ============================================================================
// SECTION: Incidents
// ============================================================================

#[derive(Debug, Serialize)]
struct IncidentListResponse {
    incident_count: usize,
    incidents: Vec<Incident>,
}

async fn list_incidents(State(state): State<SharedState>) -> impl IntoResponse {
    let incidents = state.registry.list(&IncidentFilter::default());
    Json(IncidentListResponse {
        incident_count: incidents.len(),
        incidents,
    })
}

#[derive(Debug, Serialize)]
struct IncidentDetailResponse {
    #[serde(flatten)]
    incident: Incident,
    is_stale: bool,
}

async fn get_incident(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let incident_id = IncidentId::parse(raw_id)
        .map_err(|_| ApiError::NotFound("incident not found".to_string()))?;
    let incident = state
        .registry
        .get(&incident_id)
        .ok_or_else(|| ApiError::NotFound("incident not found".to_string()))?;
    let now = Instant::now();
    let is_stale = incident.is_stale(&now);
    Ok(Json(IncidentDetailResponse { incident, is_stale }))
}

#[derive(Debug, Deserialize)]
struct PatchIncidentBody {
    status: IncidentStatus,
    #[serde(default)]
    resolution_reason: Option<String>,
}

async fn patch_incident(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
    Json(body): Json<PatchIncidentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let incident_id = IncidentId::parse(raw_id)
        .map_err(|_| ApiError::NotFound("incident not found".to_string()))?;
    let now = Instant::now();
    let from_status = state
        .registry
        .get(&incident_id)
        .ok_or_else(|| ApiError::NotFound("incident not found".to_string()))?
        .status;
    let updated = state
        .registry
        .transition(&incident_id, body.status, body.resolution_reason, now)?;
    state.metrics.incr_labeled(
        "transitions_total",
        &format!("{}\u{2192}{}", from_status.as_str(), updated.status.as_str()),
    );
    Ok(Json(updated))
}

// ============================================================================
// SECTION: Entity Risk
// ============================================================================

async fn entity_risk(State(state): State<SharedState>) -> impl IntoResponse {
    let entities = state.risk_engine.get_all(Instant::now());
    Json(serde_json::json!({ "entities": entities }))
}

// ============================================================================
// SECTION: Metrics & Health
// ============================================================================

async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    let counters = state.metrics.snapshot();
    Json(serde_json::json!({ "counters": counters, "breakdowns": {} }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
