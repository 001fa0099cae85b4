//! Deployment configuration (SPEC_FULL.md §2 "[AMBIENT] Configuration").
//!
//! Mirrors the teacher's `SharedConfig`/`ControlUnitConfig` split: a
//! `#[serde(default = "...")]`-heavy struct loaded from TOML, validated
//! once at startup, immutable afterward. Only deployment-specific wiring
//! lives here — the compile-time table sizes of [`crate::limits`] are
//! never TOML-configurable (spec.md §1: "no dynamic table allocation").

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log level, serialized the same way as the teacher's `LogLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level verbosity.
    Trace,
    /// Debug-level verbosity.
    Debug,
    /// Info-level verbosity (default).
    Info,
    /// Warning-level verbosity.
    Warn,
    /// Error-level verbosity.
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Errors raised while loading or validating [`DeploymentConfig`].
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The TOML file could not be read.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),
    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),
    /// A value failed semantic validation.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_true() -> bool {
    true
}

/// Deployment-specific configuration for the Stored Command daemon
/// (spec.md §6: inbound message ids are "implementation-chosen but fixed
/// per deployment"; spec.md §4.7 "Autostart": "one of two configured,
/// selected by reset type").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Log verbosity.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Name reported in logs and events.
    pub service_name: String,

    /// Message id the command pipe is subscribed under.
    pub command_pipe_mid: u16,

    /// Message id of housekeeping-request messages.
    pub housekeeping_request_mid: u16,

    /// Message id of the one-hertz wakeup.
    pub wakeup_mid: u16,

    /// Message id the engine itself is addressed under, for recognizing
    /// inline `SWITCH_ATS` commands (spec.md §4.6).
    pub self_mid: u16,

    /// RTS id to autostart after power-on reset (`0`/absent disables it).
    #[serde(default)]
    pub autostart_rts_power_on: Option<u16>,

    /// RTS id to autostart after processor reset (`0`/absent disables it).
    #[serde(default)]
    pub autostart_rts_processor_reset: Option<u16>,

    /// Whether to verify packet checksums before dispatch (spec.md §9:
    /// "a simple bool... scope is checksum failures only").
    #[serde(default = "default_true")]
    pub verify_checksums: bool,

    /// Initial value of `continue_ats_on_failure` before any ground
    /// command changes it.
    #[serde(default)]
    pub continue_ats_on_failure_default: bool,
}

impl DeploymentConfig {
    /// Validate cross-field constraints not expressible via `serde`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        let mids = [
            self.command_pipe_mid,
            self.housekeeping_request_mid,
            self.wakeup_mid,
            self.self_mid,
        ];
        for (i, a) in mids.iter().enumerate() {
            for b in &mids[i + 1..] {
                if a == b {
                    return Err(ConfigError::ValidationError(format!(
                        "message ids must be distinct, found duplicate {a}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Parse a [`DeploymentConfig`] from a TOML string and validate it.
pub fn load_config_from_str(toml_text: &str) -> Result<DeploymentConfig, ConfigError> {
    let config: DeploymentConfig =
        toml::from_str(toml_text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load a [`DeploymentConfig`] from a TOML file on disk and validate it.
pub fn load_config_from_path(path: &std::path::Path) -> Result<DeploymentConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
    load_config_from_str(&text)
}
