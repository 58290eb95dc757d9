// crates/auth-analytics-detect/src/lib.rs
// ============================================================================
// Crate: auth-analytics-detect
// Description: Mapping-driven normalization and sliding-window threat
// detection over canonical authentication events.
// Purpose: Turn heterogeneous raw batches into normalized events, then into
// content-addressed incident candidates, with no I/O of its own.
// Dependencies: auth-analytics-core, serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! This crate is pure and synchronous: given a raw batch and a loaded
//! [`mapping::MappingConfig`], [`normalizer::normalize_batch`] produces the
//! canonical sequence, and [`detector::detect`] turns that sequence into
//! incident candidates. Persisting runs and incidents, and replaying them
//! at boot, is `auth-analytics-store`'s job; wiring the two together is
//! `auth-analytics-server`'s.

pub mod config;
pub mod detector;
pub mod mapping;
pub mod normalizer;

pub use config::DetectorThresholds;
pub use detector::detect;
pub use mapping::MappingConfig;
pub use normalizer::NormalizeOutcome;
pub use normalizer::RejectedEvent;
pub use normalizer::normalize_batch;
