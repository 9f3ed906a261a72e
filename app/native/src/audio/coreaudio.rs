//! Native `CoreAudio` backend.

use std::ptr::{NonNull, null};

use coreaudio::audio_unit::Scope;
use coreaudio::audio_unit::macos_helpers::{
    get_audio_device_ids, get_audio_device_supports_scope, get_default_device_id, get_device_name,
};
use objc2_core_audio::{
    AudioDeviceID, AudioObjectID, AudioObjectPropertyAddress, AudioObjectSetPropertyData,
    kAudioHardwareNoError, kAudioHardwarePropertyDefaultInputDevice,
    kAudioObjectPropertyElementMain, kAudioObjectPropertyScopeGlobal, kAudioObjectSystemObject,
};

use super::backend::{AudioBackend, AudioError};
use super::device::DeviceId;

/// Size of `AudioDeviceID` in bytes as u32.
#[allow(clippy::cast_possible_truncation)] // AudioDeviceID is u32, so size is always 4 bytes
const AUDIO_DEVICE_ID_SIZE: u32 = std::mem::size_of::<AudioDeviceID>() as u32;

/// `kAudioObjectUnknown`: reported when no default device exists.
const UNKNOWN_DEVICE: AudioDeviceID = 0;

/// Talks to the system audio object directly.
#[derive(Debug, Default)]
pub struct CoreAudioBackend;

impl CoreAudioBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl AudioBackend for CoreAudioBackend {
    fn name(&self) -> &'static str { "coreaudio" }

    fn probe(&self) -> Result<(), AudioError> {
        get_audio_device_ids()
            .map(|_| ())
            .map_err(|err| AudioError::Unavailable(err.to_string()))
    }

    fn device_ids(&self) -> Result<Vec<DeviceId>, AudioError> {
        get_audio_device_ids().map_err(|err| AudioError::query("list devices", err))
    }

    fn device_name(&self, id: DeviceId) -> Result<String, AudioError> {
        get_device_name(id).map_err(|err| AudioError::query("read device name", err))
    }

    fn is_input_capable(&self, id: DeviceId) -> Result<bool, AudioError> {
        get_audio_device_supports_scope(id, Scope::Input)
            .map_err(|err| AudioError::query("read input capability", err))
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>, AudioError> {
        Ok(get_default_device_id(true).filter(|&id| id != UNKNOWN_DEVICE))
    }

    fn set_default_input_device(&self, id: DeviceId) -> Result<(), AudioError> {
        let property_address = AudioObjectPropertyAddress {
            mSelector: kAudioHardwarePropertyDefaultInputDevice,
            mScope: kAudioObjectPropertyScopeGlobal,
            mElement: kAudioObjectPropertyElementMain,
        };
        let device_id: AudioDeviceID = id;

        let status = unsafe {
            AudioObjectSetPropertyData(
                kAudioObjectSystemObject as AudioObjectID,
                NonNull::from(&property_address),
                0,
                null(),
                AUDIO_DEVICE_ID_SIZE,
                NonNull::from(&device_id).cast(),
            )
        };

        if status == kAudioHardwareNoError {
            Ok(())
        } else {
            Err(AudioError::Switch {
                device: id,
                message: format!("OSStatus {status}"),
            })
        }
    }
}
