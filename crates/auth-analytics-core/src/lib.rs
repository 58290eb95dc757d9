// crates/auth-analytics-core/src/lib.rs
// ============================================================================
// Crate: auth-analytics-core
// Description: Canonical data model, identifiers, time, and hashing shared by
// every stage of the authentication-event analytics pipeline.
// Purpose: Freeze the unstructured raw layer into the canonical schema and
// give downstream crates a single, dependency-light vocabulary to build on.
// Dependencies: serde, serde_json, sha2, time, thiserror
// ============================================================================

//! ## Overview
//! This crate defines the shapes every other crate in the workspace agrees
//! on: raw events (untyped), normalized events (canonical), incidents
//! (content-addressed), and the traits that the storage layer implements.
//! It holds no I/O and no locks; it is pure data and pure functions.

pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod incident;
pub mod interfaces;
pub mod normalized;
pub mod raw;
pub mod time;

pub use error::CoreError;
pub use identifiers::EntityKind;
pub use identifiers::IncidentId;
pub use identifiers::RunId;
pub use incident::Evidence;
pub use incident::Incident;
pub use incident::IncidentStatus;
pub use incident::IncidentType;
pub use incident::MitreRef;
pub use incident::Severity;
pub use incident::Subject;
pub use normalized::NormalizedEvent;
pub use normalized::Outcome;
pub use raw::RawEvent;
pub use time::Instant;
