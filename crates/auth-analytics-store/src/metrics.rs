// crates/auth-analytics-store/src/metrics.rs
// ============================================================================
// Module: In-Memory Metrics Sink
// Description: Lock-protected named-counter map implementing `MetricsSink`.
// Purpose: Give the server crate a concrete, dependency-light counters
// backend without pulling in a metrics/tracing ecosystem crate.
// Dependencies: auth-analytics-core, std::sync
// ============================================================================

//! ## Overview
//! Counters are never reset at runtime; at boot the orchestrator rebuilds
//! them by replaying persisted runs and the incident registry, the same
//! way the entity risk engine replays incidents rather than persisting its
//! own derived state. Labeled counters are stored as `"name{label}"`
//! (e.g. `events_rejected_total{reason}`).

use std::collections::BTreeMap;
use std::sync::Mutex;

use auth_analytics_core::interfaces::MetricsSink;

// ============================================================================
// SECTION: In-Memory Metrics
// ============================================================================

/// In-memory, mutex-protected counter map.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl InMemoryMetrics {
    /// Creates an empty metrics sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, key: String) {
        let mut guard = self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard.entry(key).or_insert(0) += 1;
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr(&self, name: &'static str) {
        self.bump(name.to_string());
    }

    fn incr_labeled(&self, name: &'static str, label: &str) {
        self.bump(format!("{name}{{{label}}}"));
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

// ============================================================================
// SECTION: No-op Metrics
// ============================================================================

/// Discards every counter. Used in tests that do not assert on metrics.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _name: &'static str) {}

    fn incr_labeled(&self, _name: &'static str, _label: &str) {}

    fn snapshot(&self) -> BTreeMap<String, u64> {
        BTreeMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlabeled_counter_accumulates() {
        let metrics = InMemoryMetrics::new();
        metrics.incr("runs_total");
        metrics.incr("runs_total");
        assert_eq!(metrics.snapshot().get("runs_total"), Some(&2));
    }

    #[test]
    fn labeled_counter_is_keyed_separately_per_label() {
        let metrics = InMemoryMetrics::new();
        metrics.incr_labeled("events_rejected_total", "timestamp_parse");
        metrics.incr_labeled("events_rejected_total", "schema");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get("events_rejected_total{timestamp_parse}"), Some(&1));
        assert_eq!(snapshot.get("events_rejected_total{schema}"), Some(&1));
    }

    #[test]
    fn noop_metrics_never_accumulates() {
        let metrics = NoopMetrics;
        metrics.incr("runs_total");
        assert!(metrics.snapshot().is_empty());
    }
}
