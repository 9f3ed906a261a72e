//! Path utilities.
//!
//! Tilde expansion for user-supplied paths and the well-known directories
//! micswitch stores its state in.

use std::path::PathBuf;

use crate::constants::{APP_BUNDLE_ID, APP_NAME};

/// Expands a leading `~` to the user's home directory.
///
/// Absolute and relative paths are returned unchanged. Empty or
/// whitespace-only input yields an empty path.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// Returns the application's cache directory.
///
/// `~/Library/Caches/{APP_BUNDLE_ID}` on macOS, `$XDG_CACHE_HOME/{APP_BUNDLE_ID}`
/// on Linux, or `/tmp/{APP_BUNDLE_ID}` if no cache directory is available.
#[must_use]
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(format!("/tmp/{APP_BUNDLE_ID}")),
        |cache| cache.join(APP_BUNDLE_ID),
    )
}

/// Returns the directory holding persisted application state, if the
/// platform exposes one.
#[must_use]
pub fn state_dir() -> Option<PathBuf> { dirs::config_dir().map(|dir| dir.join(APP_NAME)) }
