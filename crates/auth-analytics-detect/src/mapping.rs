// crates/auth-analytics-detect/src/mapping.rs
// ============================================================================
// Module: Mapping Loader
// Description: Source-tagged field-alias profiles for the normalizer.
// Purpose: Parse and validate per-source resolution profiles so the
// normalizer never branches on source-specific field names.
// Dependencies: auth-analytics-core, serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! A mapping profile declares, for every canonical field, an ordered list
//! of raw-field aliases (optionally dotted paths for nested lookup). The
//! `_default` profile is mandatory and is used whenever no source-specific
//! profile matches. Validation is invoked once at boot; a config error here
//! is `config_invalid` and is fatal to the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use auth_analytics_core::raw::RawEvent;
use auth_analytics_core::raw::get_path;
use auth_analytics_core::raw::value_as_string;
use auth_analytics_core::normalized::Outcome;
use serde::Deserialize;
use thiserror::Error;

/// Profile identifier used when no source-specific profile matches.
pub const DEFAULT_PROFILE: &str = "_default";

// ============================================================================
// SECTION: Canonical Field
// ============================================================================

/// A canonical normalized-event field, as named in the mapping profile.
///
/// # Invariants
/// - Variants correspond 1:1 to `NormalizedEvent` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
    /// `timestamp` (required).
    Timestamp,
    /// `event_type` (required).
    EventType,
    /// `result` (required).
    Result,
    /// `source_ip` (optional).
    SourceIp,
    /// `username` (optional).
    Username,
    /// `reason` (optional).
    Reason,
    /// `user_agent` (optional).
    UserAgent,
    /// `source` (optional).
    Source,
}

impl CanonicalField {
    /// All canonical fields, in a stable order.
    pub const ALL: [CanonicalField; 8] = [
        Self::Timestamp,
        Self::EventType,
        Self::Result,
        Self::SourceIp,
        Self::Username,
        Self::Reason,
        Self::UserAgent,
        Self::Source,
    ];

    /// Returns the wire/YAML key for this field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::EventType => "event_type",
            Self::Result => "result",
            Self::SourceIp => "source_ip",
            Self::Username => "username",
            Self::Reason => "reason",
            Self::UserAgent => "user_agent",
            Self::Source => "source",
        }
    }

    /// Returns `true` when a normalized event cannot be produced without
    /// this field resolving.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Timestamp | Self::EventType | Self::Result)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Profile
// ============================================================================

/// Raw YAML shape of one source profile.
#[derive(Debug, Clone, Deserialize, Default)]
struct RawProfile {
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    reject_event_types: BTreeSet<String>,
    #[serde(default)]
    result_map: BTreeMap<String, String>,
}

/// Raw YAML shape of the whole mapping file: profile name -> profile.
#[derive(Debug, Clone, Deserialize, Default)]
struct RawMappingFile(BTreeMap<String, RawProfile>);

/// A validated, per-source field-resolution profile.
///
/// # Invariants
/// - Every [`CanonicalField`] has an (possibly empty) alias list.
/// - `result_map` values are always a valid [`Outcome`].
#[derive(Debug, Clone)]
pub struct SourceProfile {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
    reject_event_types: BTreeSet<String>,
    result_map: BTreeMap<String, Outcome>,
}

impl SourceProfile {
    /// Returns the alias list declared for `field`, in declaration order.
    #[must_use]
    pub fn aliases_for(&self, field: CanonicalField) -> &[String] {
        self.aliases
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` when `event_type` (already lower-cased) is rejected
    /// as telemetry by this profile specifically (the global blacklist is
    /// applied separately by the normalizer).
    #[must_use]
    pub fn rejects_event_type(&self, event_type: &str) -> bool {
        self.reject_event_types.contains(event_type)
    }

    /// Translates a raw outcome string via `result_map`. `success`/`failure`
    /// always pass through even if absent from the map; anything else maps
    /// to [`Outcome::Other`] unless the map says otherwise.
    #[must_use]
    pub fn translate_result(&self, raw: &str) -> Outcome {
        if let Some(mapped) = self.result_map.get(raw) {
            return *mapped;
        }
        match raw {
            "success" => Outcome::Success,
            "failure" => Outcome::Failure,
            _ => Outcome::Other,
        }
    }

    /// Resolves a canonical field against a raw event by walking its alias
    /// list in declaration order; the first alias present (including via
    /// dot-path) wins.
    #[must_use]
    pub fn resolve_field<'a>(
        &self,
        event: &'a RawEvent,
        field: CanonicalField,
    ) -> Option<&'a serde_json::Value> {
        self.aliases_for(field)
            .iter()
            .find_map(|alias| get_path(event, alias))
    }

    /// Resolves a canonical field and coerces it to a string.
    #[must_use]
    pub fn resolve_field_string(&self, event: &RawEvent, field: CanonicalField) -> Option<String> {
        self.resolve_field(event, field).and_then(value_as_string)
    }
}

// ============================================================================
// SECTION: Mapping Config
// ============================================================================

/// Errors raised while loading or validating a mapping file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The YAML document could not be parsed.
    #[error("failed to parse mapping file: {0}")]
    Parse(String),
    /// The mandatory `_default` profile is missing.
    #[error("mapping file is missing the mandatory '_default' profile")]
    MissingDefaultProfile,
    /// A `result_map` entry names an outcome that is not one of the
    /// enumerated values.
    #[error("profile '{profile}' result_map entry '{raw}' maps to unknown outcome '{mapped}'")]
    UnknownOutcome {
        /// Profile the invalid entry was declared in.
        profile: String,
        /// Raw outcome string.
        raw: String,
        /// The invalid mapped value.
        mapped: String,
    },
}

/// A fully loaded and validated collection of source profiles.
///
/// # Invariants
/// - Always contains a `_default` profile.
#[derive(Debug, Clone)]
pub struct MappingConfig {
    profiles: BTreeMap<String, SourceProfile>,
}

impl MappingConfig {
    /// Parses a mapping file from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] when the document is malformed or fails
    /// validation; callers treat this as fatal and refuse to start.
    pub fn load(yaml: &str) -> Result<Self, MappingError> {
        let raw: RawMappingFile =
            serde_yaml::from_str(yaml).map_err(|err| MappingError::Parse(err.to_string()))?;

        let mut profiles = BTreeMap::new();
        for (name, raw_profile) in raw.0 {
            let profile = build_profile(&name, raw_profile)?;
            profiles.insert(name, profile);
        }

        let config = Self { profiles };
        config.validate()?;
        Ok(config)
    }

    /// Validates the loaded configuration. Called once at boot by
    /// [`MappingConfig::load`]; also exposed for callers that construct a
    /// config by other means.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingDefaultProfile`] when no `_default`
    /// profile is present.
    pub fn validate(&self) -> Result<(), MappingError> {
        if !self.profiles.contains_key(DEFAULT_PROFILE) {
            return Err(MappingError::MissingDefaultProfile);
        }
        Ok(())
    }

    /// Resolves the profile for `source`, falling back to `_default` when
    /// no source-specific profile matches (or when `source` is `None`).
    #[must_use]
    pub fn resolve(&self, source: Option<&str>) -> &SourceProfile {
        source
            .and_then(|name| self.profiles.get(name))
            .unwrap_or_else(|| {
                self.profiles
                    .get(DEFAULT_PROFILE)
                    .expect("validate() guarantees a _default profile")
            })
    }
}

fn build_profile(name: &str, raw: RawProfile) -> Result<SourceProfile, MappingError> {
    let mut aliases = BTreeMap::new();
    for field in CanonicalField::ALL {
        let list = raw.aliases.get(field.as_str()).cloned().unwrap_or_default();
        aliases.insert(field, list);
    }

    let mut result_map = BTreeMap::new();
    for (raw_value, mapped) in raw.result_map {
        let outcome = match mapped.as_str() {
            "success" => Outcome::Success,
            "failure" => Outcome::Failure,
            "other" => Outcome::Other,
            other => {
                return Err(MappingError::UnknownOutcome {
                    profile: name.to_string(),
                    raw: raw_value,
                    mapped: other.to_string(),
                });
            }
        };
        result_map.insert(raw_value, outcome);
    }

    Ok(SourceProfile {
        aliases,
        reject_event_types: raw.reject_event_types,
        result_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE_YAML: &str = r#"
_default:
  aliases:
    timestamp: [timestamp, ts]
    event_type: [event_type, action]
    result: [result, outcome]
    source_ip: [source_ip, src_ip]
    username: [username, user]
  result_map:
    failed: failure
    ok: success
windows:
  aliases:
    event_type: [EventID]
    result: [outcome.code]
  reject_event_types: ["4672", "4634"]
  result_map:
    "0x0": success
"#;

    #[test]
    fn load_requires_default_profile() {
        let err = MappingConfig::load("windows:\n  aliases: {}\n").unwrap_err();
        assert_eq!(err, MappingError::MissingDefaultProfile);
    }

    #[test]
    fn load_accepts_well_formed_file() {
        let config = MappingConfig::load(SAMPLE_YAML).expect("should load");
        let default_profile = config.resolve(None);
        assert_eq!(default_profile.translate_result("failed"), Outcome::Failure);
        assert_eq!(default_profile.translate_result("ok"), Outcome::Success);
        assert_eq!(default_profile.translate_result("weird"), Outcome::Other);
    }

    #[test]
    fn resolve_falls_back_to_default_for_unknown_source() {
        let config = MappingConfig::load(SAMPLE_YAML).expect("should load");
        let a = config.resolve(Some("unknown-source")) as *const _;
        let b = config.resolve(None) as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn profile_specific_reject_list_is_isolated() {
        let config = MappingConfig::load(SAMPLE_YAML).expect("should load");
        let windows = config.resolve(Some("windows"));
        assert!(windows.rejects_event_type("4672"));
        let default_profile = config.resolve(None);
        assert!(!default_profile.rejects_event_type("4672"));
    }

    #[test]
    fn resolve_field_walks_alias_list_in_order_and_supports_dot_path() {
        let config = MappingConfig::load(SAMPLE_YAML).expect("should load");
        let windows = config.resolve(Some("windows"));
        let event: RawEvent = json!({"outcome": {"code": "0x0"}})
            .as_object()
            .unwrap()
            .clone();
        let resolved = windows.resolve_field_string(&event, CanonicalField::Result);
        assert_eq!(resolved.as_deref(), Some("0x0"));
    }

    #[test]
    fn unknown_outcome_in_result_map_is_rejected() {
        let yaml = r#"
_default:
  result_map:
    weird: not_a_real_outcome
"#;
        let err = MappingConfig::load(yaml).unwrap_err();
        assert!(matches!(err, MappingError::UnknownOutcome { .. }));
    }
}
