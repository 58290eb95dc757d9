// crates/auth-analytics-detect/src/config.rs
// ============================================================================
// Module: Detector Thresholds
// Description: Configurable sliding-window constants, with environment
// overrides, for the two detection rules.
// Purpose: Keep the detector's defaults in one place and let operators
// override them without a code change, via explicit env-var constants
// parsed once at boot.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Every constant here has a documented default. Overrides are read
//! once, from named environment variables, at process boot
//! (`auth-analytics-server::config`); this module itself performs no I/O —
//! it only defines the shape and the env-var names, and parses whatever
//! string it is handed.

use std::fmt;

/// Environment variable overriding the sliding-window width, in seconds.
pub const WINDOW_SECONDS_ENV: &str = "WINDOW_SECONDS";
/// Environment variable overriding the brute-force failure threshold.
pub const BRUTE_FORCE_FAILURE_THRESHOLD_ENV: &str = "BRUTE_FORCE_FAILURE_THRESHOLD";
/// Environment variable overriding the credential-abuse distinct-user threshold.
pub const CRED_ABUSE_DISTINCT_USER_THRESHOLD_ENV: &str = "CRED_ABUSE_DISTINCT_USER_THRESHOLD";
/// Environment variable overriding the credential-abuse failure threshold.
pub const CRED_ABUSE_FAILURE_THRESHOLD_ENV: &str = "CRED_ABUSE_FAILURE_THRESHOLD";

/// Sliding-window detector thresholds.
///
/// # Invariants
/// - All fields are `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorThresholds {
    /// Sliding window width, in seconds.
    pub window_seconds: u64,
    /// Minimum failure count for a brute-force candidate.
    pub brute_force_min: u64,
    /// Minimum distinct usernames for a credential-abuse candidate.
    pub cred_abuse_min_users: u64,
    /// Minimum failure count for a credential-abuse candidate.
    pub cred_abuse_min_fails: u64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            brute_force_min: 5,
            cred_abuse_min_users: 5,
            cred_abuse_min_fails: 8,
        }
    }
}

/// Error raised when an override value fails to parse as a positive integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdParseError {
    /// The environment variable name that failed to parse.
    pub env_var: &'static str,
    /// The raw string value that failed to parse.
    pub raw: String,
}

impl fmt::Display for ThresholdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config_invalid: {} must be a positive integer, got '{}'",
            self.env_var, self.raw
        )
    }
}

impl std::error::Error for ThresholdParseError {}

impl DetectorThresholds {
    /// Applies a string override for one named field, validating it parses
    /// to a positive `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdParseError`] when `raw` does not parse to a
    /// positive integer.
    pub fn apply_override(
        &mut self,
        env_var: &'static str,
        raw: &str,
    ) -> Result<(), ThresholdParseError> {
        let value: u64 = raw.parse().ok().filter(|v| *v > 0).ok_or_else(|| {
            ThresholdParseError {
                env_var,
                raw: raw.to_string(),
            }
        })?;
        match env_var {
            WINDOW_SECONDS_ENV => self.window_seconds = value,
            BRUTE_FORCE_FAILURE_THRESHOLD_ENV => self.brute_force_min = value,
            CRED_ABUSE_DISTINCT_USER_THRESHOLD_ENV => self.cred_abuse_min_users = value,
            CRED_ABUSE_FAILURE_THRESHOLD_ENV => self.cred_abuse_min_fails = value,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let defaults = DetectorThresholds::default();
        assert_eq!(defaults.window_seconds, 60);
        assert_eq!(defaults.brute_force_min, 5);
        assert_eq!(defaults.cred_abuse_min_users, 5);
        assert_eq!(defaults.cred_abuse_min_fails, 8);
    }

    #[test]
    fn override_rejects_zero_and_non_numeric() {
        let mut thresholds = DetectorThresholds::default();
        assert!(thresholds.apply_override(WINDOW_SECONDS_ENV, "0").is_err());
        assert!(
            thresholds
                .apply_override(WINDOW_SECONDS_ENV, "not-a-number")
                .is_err()
        );
    }

    #[test]
    fn override_applies_to_named_field() {
        let mut thresholds = DetectorThresholds::default();
        thresholds
            .apply_override(BRUTE_FORCE_FAILURE_THRESHOLD_ENV, "9")
            .expect("should apply");
        assert_eq!(thresholds.brute_force_min, 9);
    }
}
