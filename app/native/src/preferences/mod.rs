//! Preferred input device persistence.
//!
//! The preference is a single scalar, last write wins. Absence means the user
//! never picked a device and is not an error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::audio::DeviceId;
use crate::constants::PREFERENCE_KEY;
use crate::platform::path::state_dir;

/// File name of the preference store inside the state directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Errors raised while loading or saving the preference.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Reading or writing the file failed.
    #[error("preference file {path}: {source}")]
    Io {
        /// The preference file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file exists but does not hold a valid preference.
    #[error("invalid preference file {path}: {message}")]
    Parse {
        /// The preference file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },
    /// The platform exposes no directory to store state in.
    #[error("no application data directory available")]
    NoDataDir,
}

/// Load/save contract for the preferred input device.
pub trait PreferenceStore: Send + Sync {
    /// Reads the last persisted preference, `None` if never set.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data exists but cannot be read.
    fn load(&self) -> Result<Option<DeviceId>, PreferenceError>;

    /// Persists `id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be made durable.
    fn save(&mut self, id: DeviceId) -> Result<(), PreferenceError>;
}

/// Stores the preference as a JSON object on disk.
///
/// Other keys in the file are preserved across saves.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    /// Uses the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Uses `preferences.json` in the application state directory.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError::NoDataDir`] if no state directory exists.
    pub fn at_default_location() -> Result<Self, PreferenceError> {
        state_dir().map(|dir| Self::new(dir.join(PREFERENCES_FILE))).ok_or(PreferenceError::NoDataDir)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn io_error(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io { path: self.path.clone(), source }
    }

    fn parse_error(&self, message: impl ToString) -> PreferenceError {
        PreferenceError::Parse {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>, PreferenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(self.io_error(err)),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.parse_error("expected a JSON object")),
            Err(err) => Err(self.parse_error(err)),
        }
    }

    /// Replaces the file atomically: write a sibling temp file, fsync, rename.
    fn write_map(&self, map: &Map<String, Value>) -> Result<(), PreferenceError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| self.io_error(err))?;

        let content = serde_json::to_string_pretty(map).map_err(|err| self.parse_error(err))?;

        let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(|err| self.io_error(err))?;
        file.write_all(content.as_bytes()).map_err(|err| self.io_error(err))?;
        file.as_file().sync_all().map_err(|err| self.io_error(err))?;
        file.persist(&self.path).map_err(|err| self.io_error(err.error))?;

        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&self) -> Result<Option<DeviceId>, PreferenceError> {
        let map = self.read_map()?;

        match map.get(PREFERENCE_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|id| DeviceId::try_from(id).ok())
                .map(Some)
                .ok_or_else(|| self.parse_error(format!("{PREFERENCE_KEY} is not a device id"))),
        }
    }

    fn save(&mut self, id: DeviceId) -> Result<(), PreferenceError> {
        // A corrupt file is replaced rather than blocking every future save.
        let mut map = self.read_map().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "discarding unreadable preference file");
            Map::new()
        });
        map.insert(PREFERENCE_KEY.to_string(), Value::from(id));

        self.write_map(&map)?;
        tracing::debug!(path = %self.path.display(), device = id, "saved input device preference");
        Ok(())
    }
}

/// Keeps the preference in memory for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    selected: Option<DeviceId>,
}

impl MemoryPreferenceStore {
    /// Creates a store holding `selected`.
    #[must_use]
    pub const fn new(selected: Option<DeviceId>) -> Self { Self { selected } }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<DeviceId>, PreferenceError> { Ok(self.selected) }

    fn save(&mut self, id: DeviceId) -> Result<(), PreferenceError> {
        self.selected = Some(id);
        Ok(())
    }
}
