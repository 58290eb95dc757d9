// crates/auth-analytics-server/src/state.rs
// ============================================================================
// Module: Application State
// Description: Shared, `Arc`-wrapped handle to every store and config the
// HTTP handlers need.
// Purpose: Give axum one `State<Arc<AppState>>` extractor instead of
// threading individual stores through every handler signature.
// Dependencies: auth-analytics-core, auth-analytics-detect,
// auth-analytics-store
// ============================================================================

//! ## Overview
//! `AppState` owns no lock itself; each field is independently
//! lock-protected by the store crate, four independent locks rather than
//! one coarse one. Handlers reach into whichever store they need without
//! ever holding more than one lock at a time across an `.await` boundary
//! (there are none: every locked section here is synchronous in-memory/
//! file I/O).

use std::sync::Arc;

use auth_analytics_detect::DetectorThresholds;
use auth_analytics_detect::MappingConfig;
use auth_analytics_store::FileIncidentRegistry;
use auth_analytics_store::FileRunArtifactStore;
use auth_analytics_store::InMemoryMetrics;
use auth_analytics_store::InMemoryRiskEngine;

/// Shared application state, constructed once at boot and cloned cheaply
/// (an `Arc`) into every axum handler.
pub struct AppState {
    /// Durable, content-addressed incident registry.
    pub registry: FileIncidentRegistry,
    /// Derived, decayed per-entity risk scores.
    pub risk_engine: InMemoryRiskEngine,
    /// Named-counter metrics sink.
    pub metrics: InMemoryMetrics,
    /// Per-run raw/normalized/incidents artifact store.
    pub artifacts: FileRunArtifactStore,
    /// Validated field-mapping profiles.
    pub mapping: MappingConfig,
    /// Resolved detector thresholds.
    pub thresholds: DetectorThresholds,
}

/// Shared, reference-counted handle to [`AppState`].
pub type SharedState = Arc<AppState>;
