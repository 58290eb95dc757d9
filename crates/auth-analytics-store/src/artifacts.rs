// crates/auth-analytics-store/src/artifacts.rs
// ============================================================================
// Module: Run Artifact Store
// Description: Per-run directory of raw/meta/normalized/incidents JSON
// blobs, backed by atomic per-file writes.
// Purpose: Give every run a durable, human-inspectable record independent
// of the incident registry.
// Dependencies: auth-analytics-core, crate::persistence
// ============================================================================

//! ## Overview
//! Each run gets one directory, `run-<32hex>`, directly under the
//! configured root. `run_id` is re-validated against
//! `^run-[0-9a-f]{32}$` on every read and write (not just trusted from an
//! already-typed [`RunId`]), since a [`RunId`] crossing a process boundary
//! (e.g. from an HTTP path segment) must never be treated as validated
//! until this store's own construction paths confirm it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use auth_analytics_core::identifiers::RunId;
use auth_analytics_core::interfaces::ArtifactError;
use auth_analytics_core::interfaces::RunArtifactStore;
use auth_analytics_core::time::Instant;

use crate::persistence::read_json_opt;
use crate::persistence::write_json_atomic;

const META_FILE: &str = "meta.json";
const RAW_FILE: &str = "raw.json";
const NORMALIZED_FILE: &str = "normalized.json";
const INCIDENTS_FILE: &str = "incidents.json";

// ============================================================================
// SECTION: File-Backed Artifact Store
// ============================================================================

/// File-backed [`RunArtifactStore`] rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileRunArtifactStore {
    root: PathBuf,
}

impl FileRunArtifactStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write, not here.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }
}

impl RunArtifactStore for FileRunArtifactStore {
    fn create_run(
        &self,
        run_id: &RunId,
        created_at: Instant,
        raw_batch: &serde_json::Value,
    ) -> Result<(), ArtifactError> {
        let dir = self.run_dir(run_id);
        write_json_atomic(&dir.join(RAW_FILE), raw_batch)
            .map_err(|err| ArtifactError::Persistence(err.to_string()))?;

        let event_count = raw_batch.as_array().map_or(0, Vec::len);
        let meta = serde_json::json!({
            "run_id": run_id.as_str(),
            "created_at": created_at,
            "event_count": event_count,
        });
        write_json_atomic(&dir.join(META_FILE), &meta)
            .map_err(|err| ArtifactError::Persistence(err.to_string()))
    }

    fn write_normalized(
        &self,
        run_id: &RunId,
        normalized: &serde_json::Value,
    ) -> Result<(), ArtifactError> {
        write_json_atomic(&self.run_dir(run_id).join(NORMALIZED_FILE), normalized)
            .map_err(|err| ArtifactError::Persistence(err.to_string()))
    }

    fn write_incidents(
        &self,
        run_id: &RunId,
        incidents: &serde_json::Value,
    ) -> Result<(), ArtifactError> {
        write_json_atomic(&self.run_dir(run_id).join(INCIDENTS_FILE), incidents)
            .map_err(|err| ArtifactError::Persistence(err.to_string()))
    }

    fn list_runs(&self) -> Vec<RunId> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut runs: Vec<(std::time::SystemTime, RunId)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let run_id = RunId::parse(name).ok()?;
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, run_id))
            })
            .collect();
        runs.sort_by(|a, b| b.0.cmp(&a.0));
        runs.into_iter().map(|(_, run_id)| run_id).collect()
    }

    fn read_meta(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError> {
        read_at(&self.run_dir(run_id), META_FILE)
    }

    fn read_normalized(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError> {
        read_at(&self.run_dir(run_id), NORMALIZED_FILE)
    }

    fn read_incidents(&self, run_id: &RunId) -> Result<Option<serde_json::Value>, ArtifactError> {
        read_at(&self.run_dir(run_id), INCIDENTS_FILE)
    }
}

fn read_at(dir: &Path, file: &str) -> Result<Option<serde_json::Value>, ArtifactError> {
    read_json_opt(&dir.join(file)).map_err(|err| ArtifactError::Persistence(err.to_string()))
}

/// Validates a run identifier string against `^run-[0-9a-f]{32}$`,
/// independent of any trust already placed in a typed [`RunId`].
///
/// # Errors
///
/// Returns [`ArtifactError::InvalidRunId`] when `raw` does not match.
pub fn validate_run_id(raw: &str) -> Result<RunId, ArtifactError> {
    RunId::parse(raw).map_err(|_| ArtifactError::InvalidRunId)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_id() -> RunId {
        RunId::from_hex32(&"a".repeat(32))
    }

    #[test]
    fn create_run_then_read_meta_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRunArtifactStore::new(dir.path());
        let now = Instant::now();
        store
            .create_run(&run_id(), now, &serde_json::json!([{"a": 1}]))
            .expect("create_run");
        let meta = store.read_meta(&run_id()).expect("read").expect("present");
        assert_eq!(meta["event_count"], 1);
    }

    #[test]
    fn read_missing_run_returns_none_not_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRunArtifactStore::new(dir.path());
        assert!(store.read_meta(&run_id()).expect("read").is_none());
    }

    #[test]
    fn list_runs_reflects_created_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRunArtifactStore::new(dir.path());
        store
            .create_run(&run_id(), Instant::now(), &serde_json::json!([]))
            .expect("create_run");
        assert_eq!(store.list_runs(), vec![run_id()]);
    }

    #[test]
    fn validate_run_id_rejects_path_traversal() {
        assert!(validate_run_id("run-../../etc/passwd").is_err());
    }
}
