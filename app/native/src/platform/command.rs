//! Locating external helper binaries.
//!
//! A launch agent starts with a minimal `PATH` (`/usr/bin:/bin:/usr/sbin:/sbin`),
//! so Homebrew installs are searched explicitly.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Colon-separated directories searched before `PATH`.
const EXTRA_PATHS_VAR: &str = "MICSWITCH_EXTRA_PATHS";

/// Install prefixes searched after `PATH`.
const FALLBACK_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/opt/local/bin"];

/// Why a helper binary could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    /// An empty binary name was given.
    #[error("binary name cannot be empty")]
    EmptyName,
    /// An explicit path exists but cannot be executed.
    #[error("{} is not executable", .0.display())]
    NotExecutable(PathBuf),
    /// No search directory holds the binary.
    #[error("{binary} not found in {searched} search directories")]
    NotFound {
        /// The binary that was looked for.
        binary: String,
        /// How many directories were searched.
        searched: usize,
    },
}

/// Directories searched for helpers, in order.
///
/// `MICSWITCH_EXTRA_PATHS`, then `PATH`, then the Homebrew and `MacPorts`
/// prefixes and `~/.local/bin`. Duplicates are dropped.
#[must_use]
pub fn search_dirs() -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();

    let extra = env::var_os(EXTRA_PATHS_VAR).unwrap_or_default();
    let path = env::var_os("PATH").unwrap_or_default();
    let local = dirs::home_dir().map(|home| home.join(".local/bin"));

    let candidates = env::split_paths(&extra)
        .chain(env::split_paths(&path))
        .chain(FALLBACK_DIRS.iter().map(PathBuf::from))
        .chain(local);

    for dir in candidates {
        if !dir.as_os_str().is_empty() && !found.contains(&dir) {
            found.push(dir);
        }
    }

    found
}

/// Resolves `binary` to an executable path.
///
/// An absolute path is checked as-is; a bare name is looked up in
/// [`search_dirs`].
///
/// # Errors
///
/// Returns a [`LocateError`] when no usable executable is found.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, LocateError> {
    if binary.trim().is_empty() {
        return Err(LocateError::EmptyName);
    }

    let explicit = Path::new(binary);
    if explicit.is_absolute() {
        return if is_executable(explicit) {
            Ok(explicit.to_path_buf())
        } else {
            Err(LocateError::NotExecutable(explicit.to_path_buf()))
        };
    }

    let searched = search_dirs();
    searched.iter().map(|dir| dir.join(binary)).find(|path| is_executable(path)).ok_or_else(|| {
        LocateError::NotFound {
            binary: binary.to_string(),
            searched: searched.len(),
        }
    })
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}
