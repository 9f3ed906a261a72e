//! Error types for micswitch.
//!
//! This module provides the top-level error returned by CLI commands and the
//! daemon entry point. Errors of individual layers (audio, preferences, config,
//! IPC) convert into it.

use thiserror::Error;

use crate::arbiter::ArbiterError;
use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::ipc::IpcError;

/// Errors that can abort a CLI command or the daemon startup.
#[derive(Debug, Error)]
pub enum MicSwitchError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// The audio subsystem is unusable at startup.
    #[error("Startup failed: {0}")]
    Startup(String),
    /// Audio operation failed.
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Control socket communication error.
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),
    /// Arbitration worker communication error.
    #[error("Arbiter error: {0}")]
    Arbiter(#[from] ArbiterError),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic command error.
    #[error("{0}")]
    Command(String),
}

impl From<serde_json::Error> for MicSwitchError {
    fn from(err: serde_json::Error) -> Self { Self::Command(err.to_string()) }
}

impl From<String> for MicSwitchError {
    fn from(msg: String) -> Self { Self::Command(msg) }
}

impl From<&str> for MicSwitchError {
    fn from(msg: &str) -> Self { Self::Command(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = MicSwitchError::InvalidArguments("Unknown device 'Foo'".to_string());
        assert_eq!(err.to_string(), "Unknown device 'Foo'");
    }

    #[test]
    fn test_startup_error_display() {
        let err = MicSwitchError::Startup("SwitchAudioSource not found".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Startup failed"));
        assert!(msg.contains("SwitchAudioSource not found"));
    }

    #[test]
    fn test_audio_error_from_conversion() {
        let err: MicSwitchError = AudioError::Unavailable("no devices".to_string()).into();
        assert!(matches!(err, MicSwitchError::Audio(_)));
        assert!(err.to_string().contains("Audio error"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: MicSwitchError = io_err.into();
        assert!(matches!(err, MicSwitchError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_ipc_error_display() {
        let err: MicSwitchError = IpcError::DaemonNotRunning.into();
        assert!(err.to_string().contains("IPC error"));
    }

    #[test]
    fn test_from_str() {
        let err: MicSwitchError = "test error".into();
        assert!(matches!(err, MicSwitchError::Command(_)));
        assert_eq!(err.to_string(), "test error");
    }
}
