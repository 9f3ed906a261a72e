//! Audio device representation.
//!
//! A [`Device`] is a one-cycle snapshot of an endpoint reported by the audio
//! subsystem. Ids are only meaningful within the current OS session and are
//! never cached for decision making.

use serde::{Deserialize, Serialize};

/// Opaque device handle assigned by the audio subsystem.
///
/// Matches `CoreAudio`'s `AudioDeviceID`.
pub type DeviceId = u32;

/// Represents an audio device with its ID, name and input capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// The subsystem device ID.
    pub id: DeviceId,
    /// The human-readable device name.
    pub name: String,
    /// Whether the device exposes input streams.
    pub is_input: bool,
}

impl Device {
    /// Creates a new device.
    #[must_use]
    pub fn new(id: DeviceId, name: impl Into<String>, is_input: bool) -> Self {
        Self { id, name: name.into(), is_input }
    }
}

/// Finds a device by ID.
#[must_use]
pub fn find_device_by_id(devices: &[Device], id: DeviceId) -> Option<&Device> {
    devices.iter().find(|device| device.id == id)
}
