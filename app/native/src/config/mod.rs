//! Configuration module for micswitch.
//!
//! This module provides configuration types and loading functionality.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! A missing file is not an error: the daemon runs with defaults.

pub mod types;

use std::path::Path;

pub use types::{
    BackendKind, ConfigError, DEFAULT_INTERVAL_SECS, DEFAULT_UNDESIRED_MARKER, DevicePattern,
    MatchStrategy, MicSwitchConfig, config_paths, load_config as load_config_default,
    load_config_from_path,
};

/// Loads the configuration, falling back to defaults.
///
/// When `custom_path` is given only that file is considered; otherwise the
/// standard search paths are tried in order.
#[must_use]
pub fn load(custom_path: Option<&Path>) -> MicSwitchConfig {
    let result = custom_path.map_or_else(load_config_default, load_config_from_path);

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            config
        }
        Err(ConfigError::NotFound) => {
            if let Some(path) = custom_path {
                tracing::warn!(path = %path.display(), "configuration file not found, using defaults");
            }
            MicSwitchConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            MicSwitchConfig::default()
        }
    }
}

/// Returns the JSON schema describing the configuration file.
#[must_use]
pub fn schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(MicSwitchConfig)).unwrap_or(serde_json::Value::Null)
}
