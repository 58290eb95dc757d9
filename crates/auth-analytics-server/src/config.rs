// crates/auth-analytics-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Boot-time configuration surface for the ingest/HTTP process.
// Purpose: Resolve the mapping profile path, detector threshold overrides,
// run-artifact root, and bind address from CLI flags and environment
// variables, each named as an explicit constant.
// Dependencies: auth-analytics-detect, clap, std::env
// ============================================================================

//! ## Overview
//! Every override is read once, at boot, rather than polled. A malformed
//! override is `config_invalid` and aborts the process before the HTTP
//! listener binds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use auth_analytics_detect::DetectorThresholds;
use auth_analytics_detect::config::BRUTE_FORCE_FAILURE_THRESHOLD_ENV;
use auth_analytics_detect::config::CRED_ABUSE_DISTINCT_USER_THRESHOLD_ENV;
use auth_analytics_detect::config::CRED_ABUSE_FAILURE_THRESHOLD_ENV;
use auth_analytics_detect::config::WINDOW_SECONDS_ENV;
use clap::Parser;

/// Environment variable overriding the run-artifact root directory.
pub const RUN_ROOT_ENV: &str = "AUTH_ANALYTICS_RUN_ROOT";
/// Environment variable overriding the mapping profile file path.
pub const MAPPING_PATH_ENV: &str = "AUTH_ANALYTICS_MAPPING_PATH";

// ============================================================================
// SECTION: CLI Arguments
// ============================================================================

/// Command-line flags for the ingest/HTTP process. Every flag falls back to
/// its matching environment variable (`clap`'s `env` feature), then to a
/// struct default, mirroring the CLI's flag/env-var layering.
#[derive(Debug, Clone, Parser)]
#[command(name = "auth-analytics-server", disable_version_flag = true)]
pub struct CliArgs {
    /// Path to the field-mapping profile YAML file.
    #[arg(long, env = MAPPING_PATH_ENV, default_value = "config/field_mappings.yaml")]
    pub mapping_path: PathBuf,

    /// Root directory for per-run artifacts and the incident registry.
    #[arg(long, env = RUN_ROOT_ENV, default_value = "runs")]
    pub run_root: PathBuf,

    /// Socket address to bind the HTTP listener to.
    #[arg(long, env = "AUTH_ANALYTICS_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Sliding-window width override, in seconds.
    #[arg(long, env = WINDOW_SECONDS_ENV)]
    pub window_seconds: Option<String>,

    /// Brute-force failure threshold override.
    #[arg(long, env = BRUTE_FORCE_FAILURE_THRESHOLD_ENV)]
    pub brute_force_failure_threshold: Option<String>,

    /// Credential-abuse distinct-user threshold override.
    #[arg(long, env = CRED_ABUSE_DISTINCT_USER_THRESHOLD_ENV)]
    pub cred_abuse_distinct_user_threshold: Option<String>,

    /// Credential-abuse failure threshold override.
    #[arg(long, env = CRED_ABUSE_FAILURE_THRESHOLD_ENV)]
    pub cred_abuse_failure_threshold: Option<String>,
}

// ============================================================================
// SECTION: Resolved Configuration
// ============================================================================

/// Fully resolved, validated boot configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the field-mapping profile YAML file.
    pub mapping_path: PathBuf,
    /// Root directory for per-run artifacts and the incident registry.
    pub run_root: PathBuf,
    /// Socket address to bind the HTTP listener to.
    pub bind: SocketAddr,
    /// Resolved detector thresholds, defaults layered with any overrides.
    pub thresholds: DetectorThresholds,
}

/// Error raised when boot configuration fails to resolve.
///
/// # Invariants
/// - Always fatal at boot (`config_invalid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

impl CliArgs {
    /// Resolves CLI/env input into an [`AppConfig`], validating every
    /// threshold override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a threshold override fails to parse.
    pub fn resolve(self) -> Result<AppConfig, ConfigError> {
        let mut thresholds = DetectorThresholds::default();
        for (env_var, raw) in [
            (WINDOW_SECONDS_ENV, self.window_seconds),
            (
                BRUTE_FORCE_FAILURE_THRESHOLD_ENV,
                self.brute_force_failure_threshold,
            ),
            (
                CRED_ABUSE_DISTINCT_USER_THRESHOLD_ENV,
                self.cred_abuse_distinct_user_threshold,
            ),
            (
                CRED_ABUSE_FAILURE_THRESHOLD_ENV,
                self.cred_abuse_failure_threshold,
            ),
        ] {
            if let Some(raw) = raw {
                thresholds
                    .apply_override(env_var, &raw)
                    .map_err(|err| ConfigError(err.to_string()))?;
            }
        }

        Ok(AppConfig {
            mapping_path: self.mapping_path,
            run_root: self.run_root,
            bind: self.bind,
            thresholds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_overrides() {
        let args = CliArgs::parse_from(["auth-analytics-server"]);
        let config = args.resolve().expect("should resolve");
        assert_eq!(config.thresholds, DetectorThresholds::default());
        assert_eq!(config.run_root, PathBuf::from("runs"));
    }

    #[test]
    fn invalid_threshold_override_is_config_invalid() {
        let args = CliArgs::parse_from([
            "auth-analytics-server",
            "--brute-force-failure-threshold",
            "not-a-number",
        ]);
        let err = args.resolve().unwrap_err();
        assert!(err.0.contains("config_invalid") || err.0.contains("must be a positive integer"));
    }

    #[test]
    fn threshold_override_applies() {
        let args = CliArgs::parse_from(["auth-analytics-server", "--window-seconds", "120"]);
        let config = args.resolve().expect("should resolve");
        assert_eq!(config.thresholds.window_seconds, 120);
    }
}
