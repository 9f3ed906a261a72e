//! Non-throwing facade over an [`AudioBackend`].
//!
//! Every call runs on tokio's blocking pool and is bounded by a timeout. A
//! failure or timeout is logged and reported as an absent value, so a single
//! flaky query never aborts the arbitration loop.

use std::sync::Arc;
use std::time::Duration;

use super::backend::{AudioBackend, AudioError};
use super::device::{Device, DeviceId};

/// Resilient access to the audio subsystem.
#[derive(Clone)]
pub struct AudioGateway {
    backend: Arc<dyn AudioBackend>,
    call_timeout: Duration,
}

impl AudioGateway {
    /// Creates a gateway bounding each backend call by `call_timeout`.
    #[must_use]
    pub fn new(backend: Arc<dyn AudioBackend>, call_timeout: Duration) -> Self {
        Self { backend, call_timeout }
    }

    /// Runs `call` on the blocking pool with the configured timeout.
    ///
    /// A hung call is abandoned; its thread finishes in the background.
    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, AudioError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AudioBackend) -> Result<T, AudioError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || call(backend.as_ref()));

        match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AudioError::query(operation, join_error)),
            Err(_) => Err(AudioError::Timeout {
                operation,
                timeout: self.call_timeout,
            }),
        }
    }

    /// Lists all devices, or an empty list if the enumeration fails.
    pub async fn list_devices(&self) -> Vec<Device> {
        self.call("list devices", |backend| backend.devices()).await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to list audio devices");
            Vec::new()
        })
    }

    /// Returns the current default input device, `None` if undetermined.
    pub async fn default_input_device(&self) -> Option<DeviceId> {
        self.call("read default input device", |backend| backend.default_input_device())
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to read default input device");
                None
            })
    }

    /// Makes `id` the default input device, returning whether it succeeded.
    pub async fn set_default_input_device(&self, id: DeviceId) -> bool {
        match self
            .call("set default input device", move |backend| {
                backend.set_default_input_device(id)
            })
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(device = id, error = %err, "failed to set default input device");
                false
            }
        }
    }

    /// Returns a device's name, `None` if it cannot be read.
    pub async fn device_name(&self, id: DeviceId) -> Option<String> {
        self.call("read device name", move |backend| backend.device_name(id))
            .await
            .inspect_err(|err| {
                tracing::warn!(device = id, error = %err, "failed to read device name");
            })
            .ok()
    }

    /// Returns whether a device has input streams, `false` if unknown.
    pub async fn is_input_capable(&self, id: DeviceId) -> bool {
        self.call("read input capability", move |backend| backend.is_input_capable(id))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(device = id, error = %err, "failed to read input capability");
                false
            })
    }
}
