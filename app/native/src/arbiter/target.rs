//! Replacement device selection.
//!
//! Decides which device should become the default input once the current
//! one has been classified as undesired.

use crate::audio::{Device, DeviceId, NameMatcher};

/// Chooses the device to switch to.
///
/// Priority order:
/// 1. The stored preference, if it is still among the selectable devices
/// 2. Devices matching the configured priority patterns (in order)
/// 3. The first selectable device in enumeration order
///
/// `selectable` must already exclude undesired and output-only devices, so
/// the result is never the undesired device. Returns `None` when nothing is
/// selectable.
#[must_use]
pub fn choose_target<'a>(
    selectable: &'a [Device],
    preference: Option<DeviceId>,
    priority: &[NameMatcher],
) -> Option<&'a Device> {
    // 1. Honor the user's choice while it is still plugged in
    if let Some(preferred) =
        preference.and_then(|id| selectable.iter().find(|device| device.id == id))
    {
        return Some(preferred);
    }

    // 2. Configured priority list
    for matcher in priority {
        if let Some(device) = selectable.iter().find(|device| matcher.matches(&device.name)) {
            return Some(device);
        }
    }

    // 3. First available safe device
    selectable.first()
}
