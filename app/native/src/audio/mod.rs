//! Audio subsystem access.
//!
//! # Layers
//!
//! - [`AudioBackend`]: blocking, fallible calls into the OS audio layer. Two
//!   implementations exist: native `CoreAudio` (macOS) and the
//!   `SwitchAudioSource` command-line helper.
//! - [`AudioGateway`]: async facade bounding each call by a timeout and
//!   turning failures into absent values.
//! - [`DeviceClassifier`]: name-based classification of undesired devices.

mod backend;
mod classifier;
#[cfg(target_os = "macos")]
mod coreaudio;
mod device;
#[cfg(test)]
pub(crate) mod fake;
mod gateway;
mod list;
mod switch_audio_source;

use std::sync::Arc;

pub use backend::{AudioBackend, AudioError};
pub use classifier::{DeviceClassifier, NameMatcher, PatternClassifier};
#[cfg(target_os = "macos")]
pub use coreaudio::CoreAudioBackend;
pub use device::{Device, DeviceId, find_device_by_id};
pub use gateway::AudioGateway;
pub use list::{DeviceRow, device_rows, format_devices_table};
pub use switch_audio_source::{SwitchAudioSource, parse_device_lines};

use crate::config::BackendKind;

/// Creates the backend selected by `kind`.
///
/// # Errors
///
/// Returns [`AudioError::Unavailable`] if the backend cannot be used on this
/// system.
pub fn create_backend(kind: BackendKind) -> Result<Arc<dyn AudioBackend>, AudioError> {
    match kind {
        BackendKind::Auto => {
            if cfg!(target_os = "macos") {
                create_backend(BackendKind::CoreAudio)
            } else {
                create_backend(BackendKind::SwitchAudioSource)
            }
        }
        BackendKind::CoreAudio => core_audio_backend(),
        BackendKind::SwitchAudioSource => Ok(Arc::new(SwitchAudioSource::locate()?)),
    }
}

#[cfg(target_os = "macos")]
fn core_audio_backend() -> Result<Arc<dyn AudioBackend>, AudioError> {
    Ok(Arc::new(CoreAudioBackend::new()))
}

#[cfg(not(target_os = "macos"))]
fn core_audio_backend() -> Result<Arc<dyn AudioBackend>, AudioError> {
    Err(AudioError::Unavailable("CoreAudio is only available on macOS".to_string()))
}
