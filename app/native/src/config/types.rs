//! Configuration types for micswitch.
//!
//! This module provides the configuration types and loading functionality.
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::APP_NAME;
use crate::platform::path::expand;

/// Default polling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Smallest accepted polling interval in seconds.
const MIN_INTERVAL_SECS: u64 = 1;

/// Default name token identifying the wireless headset microphone.
pub const DEFAULT_UNDESIRED_MARKER: &str = "AirPods";

/// Strategy for matching device names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    /// Exact match (case-insensitive). This is the default strategy.
    #[default]
    Exact,
    /// Device name contains the specified string (case-insensitive).
    Contains,
    /// Device name starts with the specified string (case-insensitive).
    StartsWith,
    /// Device name matches the specified regex pattern.
    Regex,
}

/// A device name pattern.
///
/// Used both for the list of undesired devices and for the fallback
/// priority list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DevicePattern {
    /// The name (or pattern) of the audio device to match.
    pub name: String,

    /// The strategy for matching the device name.
    /// - `exact`: Exact match (case-insensitive). Default if not specified.
    /// - `contains`: Device name contains the string (case-insensitive).
    /// - `startsWith`: Device name starts with the string (case-insensitive).
    /// - `regex`: Device name matches the regex pattern.
    #[serde(default)]
    pub strategy: MatchStrategy,
}

impl DevicePattern {
    /// Creates a case-insensitive substring pattern.
    #[must_use]
    pub fn contains(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: MatchStrategy::Contains,
        }
    }
}

/// Which audio subsystem binding to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    /// `CoreAudio` on macOS, the `SwitchAudioSource` helper elsewhere.
    #[default]
    Auto,
    /// Native `CoreAudio` calls (macOS only).
    CoreAudio,
    /// The external `SwitchAudioSource` command-line helper.
    SwitchAudioSource,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "coreaudio" | "core-audio" => Ok(Self::CoreAudio),
            "switchaudiosource" | "switch-audio-source" => Ok(Self::SwitchAudioSource),
            _ => Err(format!(
                "Invalid backend '{s}'. Expected 'auto', 'core-audio', or 'switch-audio-source'."
            )),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MicSwitchConfig {
    /// Seconds between two arbitration cycles.
    /// Values below 1 are raised to 1.
    /// Default: 5
    pub interval: u64,

    /// Upper bound, in milliseconds, for a single audio subsystem call.
    /// A call that takes longer is treated as a failed query.
    /// Default: the polling interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout: Option<u64>,

    /// Devices that must never stay the default input device.
    /// Default: `[{ "name": "AirPods", "strategy": "contains" }]`
    pub undesired: Vec<DevicePattern>,

    /// Fallback order used when no stored preference is usable.
    /// Devices are checked in order; when nothing matches, the first
    /// selectable input device is used.
    pub priority: Vec<DevicePattern>,

    /// Audio subsystem binding.
    pub backend: BackendKind,

    /// Location of the preference file. Supports `~` expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<String>,
}

impl Default for MicSwitchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            call_timeout: None,
            undesired: vec![DevicePattern::contains(DEFAULT_UNDESIRED_MARKER)],
            priority: Vec::new(),
            backend: BackendKind::Auto,
            preferences_path: None,
        }
    }
}

impl MicSwitchConfig {
    /// Returns the polling interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(MIN_INTERVAL_SECS))
    }

    /// Returns the timeout applied to each audio subsystem call.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
            .filter(|&millis| millis > 0)
            .map_or_else(|| self.poll_interval(), Duration::from_millis)
    }

    /// Returns the expanded preference file override, if any.
    #[must_use]
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.preferences_path
            .as_deref()
            .map(expand)
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at ~/.config/micswitch/config.jsonc, \
                ~/Library/Application Support/micswitch/config.jsonc, or ~/.micswitch.jsonc"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".micswitch.jsonc", ".micswitch.json"];

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/micswitch/` when the variable is set
/// 2. `~/.config/micswitch/`
/// 3. `~/Library/Application Support/micswitch/` (macOS native)
/// 4. `~/.micswitch.jsonc` or `~/.micswitch.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let app_dir = PathBuf::from(xdg_config).join(APP_NAME);
        for filename in CONFIG_FILE_NAMES {
            paths.push(app_dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let app_dir = home.join(".config").join(APP_NAME);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            // XDG_CONFIG_HOME might already be ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join(APP_NAME);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist.
/// Returns `ConfigError::IoError` if the file exists but could not be read.
/// Returns `ConfigError::ParseError` if the file contains invalid JSON.
pub fn load_config_from_path(path: &Path) -> Result<(MicSwitchConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: MicSwitchConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` if a configuration file exists but could not be read.
/// Returns `ConfigError::ParseError` if the configuration file contains invalid JSON.
pub fn load_config() -> Result<(MicSwitchConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}
