//! Audio subsystem binding.
//!
//! [`AudioBackend`] is the fallible, blocking interface to the OS audio layer.
//! Callers in the arbitration loop never use it directly; they go through
//! [`AudioGateway`](super::AudioGateway), which bounds every call with a
//! timeout and turns failures into absent values.

use std::time::Duration;

use thiserror::Error;

use super::device::{Device, DeviceId};
use crate::constants::UNKNOWN_DEVICE_NAME;

/// Errors reported by an audio backend.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// A read from the audio subsystem failed.
    #[error("{operation} failed: {message}")]
    Query {
        /// The operation that failed.
        operation: &'static str,
        /// Backend-specific detail.
        message: String,
    },
    /// The subsystem rejected a default device change.
    #[error("failed to set device {device} as default input: {message}")]
    Switch {
        /// The device that could not be selected.
        device: DeviceId,
        /// Backend-specific detail.
        message: String,
    },
    /// The call did not return in time.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The audio subsystem cannot be used at all.
    #[error("audio subsystem unavailable: {0}")]
    Unavailable(String),
}

impl AudioError {
    /// Shorthand for a [`AudioError::Query`].
    pub fn query(operation: &'static str, message: impl ToString) -> Self {
        Self::Query {
            operation,
            message: message.to_string(),
        }
    }
}

/// Blocking access to the OS audio layer.
///
/// Implementations must be callable from any thread.
pub trait AudioBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Verifies that the subsystem is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Unavailable`] if the backend cannot work at all.
    fn probe(&self) -> Result<(), AudioError>;

    /// Lists the IDs of all devices known to the subsystem.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumeration fails.
    fn device_ids(&self) -> Result<Vec<DeviceId>, AudioError>;

    /// Reads a device's human-readable name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be read.
    fn device_name(&self, id: DeviceId) -> Result<String, AudioError>;

    /// Reads whether a device has input streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability cannot be read.
    fn is_input_capable(&self, id: DeviceId) -> Result<bool, AudioError>;

    /// Reads the current default input device, `None` when undetermined.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn default_input_device(&self) -> Result<Option<DeviceId>, AudioError>;

    /// Makes `id` the default input device.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Switch`] if the subsystem rejects the device.
    fn set_default_input_device(&self, id: DeviceId) -> Result<(), AudioError>;

    /// Lists all devices in enumeration order.
    ///
    /// A device whose name cannot be read is reported as `"Unknown"`; one
    /// whose capability cannot be read is reported as output-only.
    ///
    /// # Errors
    ///
    /// Returns an error only if the enumeration itself fails.
    fn devices(&self) -> Result<Vec<Device>, AudioError> {
        let ids = self.device_ids()?;

        Ok(ids
            .into_iter()
            .map(|id| {
                let name = self.device_name(id).unwrap_or_else(|err| {
                    tracing::debug!(device = id, error = %err, "failed to read device name");
                    UNKNOWN_DEVICE_NAME.to_string()
                });
                let is_input = self.is_input_capable(id).unwrap_or_else(|err| {
                    tracing::debug!(device = id, error = %err, "failed to read input capability");
                    false
                });
                Device { id, name, is_input }
            })
            .collect())
    }
}
