//! Read-only view of the arbitration state for rendering.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::audio::DeviceId;
use crate::constants::UNKNOWN_DEVICE_NAME;

/// Outcome of one arbitration cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CycleOutcome {
    /// The current default is acceptable, or nothing can be done.
    #[serde(rename_all = "camelCase")]
    NoActionNeeded {
        /// Why no switch was attempted.
        reason: NoActionReason,
    },
    /// The default input was moved away from the undesired device.
    #[serde(rename_all = "camelCase")]
    Switched {
        /// The undesired device.
        from: DeviceId,
        /// The new default input.
        to: DeviceId,
        /// Name of the new default input.
        name: String,
    },
    /// The subsystem rejected the switch; the next cycle retries.
    #[serde(rename_all = "camelCase")]
    SwitchFailed {
        /// The device that could not be selected.
        target: DeviceId,
    },
}

/// Why a cycle took no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoActionReason {
    /// The current default input could not be determined.
    DefaultUnknown,
    /// The current default input is not undesired, or its name is unreadable.
    NotUndesired,
    /// The undesired device is active but there is nothing to switch to.
    NoSelectableInput,
}

impl CycleOutcome {
    /// Shorthand for [`CycleOutcome::NoActionNeeded`].
    #[must_use]
    pub const fn no_action(reason: NoActionReason) -> Self { Self::NoActionNeeded { reason } }

    /// Whether the cycle changed the default input.
    #[must_use]
    pub const fn is_switch(&self) -> bool { matches!(self, Self::Switched { .. }) }
}

/// A device offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableDevice {
    pub id: DeviceId,
    pub name: String,
}

/// Everything a presenter needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Default input device as of the last cycle.
    pub current_input_device_id: Option<DeviceId>,
    /// Its name, `"Unknown"` if unavailable.
    pub current_input_device_name: String,
    /// Input-capable, not-undesired devices in enumeration order.
    pub selectable_devices: Vec<SelectableDevice>,
    /// The user's preferred device, if any.
    pub selected_preference_id: Option<DeviceId>,
    /// `false` after a failed save: the preference will not survive a restart.
    pub preference_persisted: bool,
    /// Outcome of the most recent cycle.
    pub last_outcome: Option<CycleOutcome>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            current_input_device_id: None,
            current_input_device_name: UNKNOWN_DEVICE_NAME.to_string(),
            selectable_devices: Vec::new(),
            selected_preference_id: None,
            preference_persisted: true,
            last_outcome: None,
        }
    }
}

/// Receives a fresh snapshot after every cycle.
pub trait Presenter: Send + Sync {
    /// Called from the worker; must not block.
    fn refresh(&mut self, snapshot: &StatusSnapshot);
}

/// Snapshot shared between the worker and readers such as the control socket.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl SharedSnapshot {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns a copy of the latest snapshot.
    #[must_use]
    pub fn get(&self) -> StatusSnapshot { self.inner.read().clone() }

    fn replace(&self, snapshot: &StatusSnapshot) { *self.inner.write() = snapshot.clone(); }
}

/// Presenter publishing into a [`SharedSnapshot`] and logging device changes.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    shared: SharedSnapshot,
}

impl SnapshotPublisher {
    #[must_use]
    pub const fn new(shared: SharedSnapshot) -> Self { Self { shared } }
}

impl Presenter for SnapshotPublisher {
    fn refresh(&mut self, snapshot: &StatusSnapshot) {
        let previous = self.shared.get();

        if previous.current_input_device_id != snapshot.current_input_device_id {
            tracing::info!(
                device = ?snapshot.current_input_device_id,
                name = %snapshot.current_input_device_name,
                "currently using input device"
            );
        }
        if previous.preference_persisted && !snapshot.preference_persisted {
            tracing::warn!("input device preference will not survive a restart");
        }

        self.shared.replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_uses_placeholder_name() {
        let snapshot = StatusSnapshot::default();
        assert_eq!(snapshot.current_input_device_name, "Unknown");
        assert!(snapshot.preference_persisted);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = StatusSnapshot {
            current_input_device_id: Some(2),
            current_input_device_name: "Built-in Mic".to_string(),
            selectable_devices: vec![SelectableDevice { id: 2, name: "Built-in Mic".to_string() }],
            selected_preference_id: None,
            preference_persisted: false,
            last_outcome: Some(CycleOutcome::Switched {
                from: 1,
                to: 2,
                name: "Built-in Mic".to_string(),
            }),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["currentInputDeviceName"], "Built-in Mic");
        assert_eq!(json["selectableDevices"][0]["id"], 2);
        assert_eq!(json["preferencePersisted"], false);
        assert_eq!(json["lastOutcome"]["kind"], "switched");

        let back: StatusSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_no_action_outcome_serialization() {
        let json = serde_json::to_value(CycleOutcome::no_action(NoActionReason::NoSelectableInput))
            .unwrap();
        assert_eq!(json["kind"], "noActionNeeded");
        assert_eq!(json["reason"], "noSelectableInput");
    }

    #[test]
    fn test_publisher_updates_shared_snapshot() {
        let shared = SharedSnapshot::new();
        let mut publisher = SnapshotPublisher::new(shared.clone());

        let snapshot = StatusSnapshot {
            current_input_device_id: Some(5),
            ..StatusSnapshot::default()
        };
        publisher.refresh(&snapshot);

        assert_eq!(shared.get().current_input_device_id, Some(5));
    }
}
