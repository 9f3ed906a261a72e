//! Default input device arbitration.
//!
//! The [`Arbiter`] owns all arbitration state. Each cycle re-reads the
//! current default input from the audio subsystem, and if that device is
//! undesired, switches to the stored preference or a fallback. Failures of
//! individual queries never abort a cycle: the safest no-op is taken and the
//! next cycle starts from scratch.
//!
//! The arbiter is driven by a single worker task ([`ArbiterService`]) so that
//! timer-driven and user-triggered cycles never interleave.

mod service;
mod snapshot;
mod target;

pub use service::{ArbiterError, ArbiterHandle, ArbiterService};
pub use snapshot::{
    CycleOutcome, NoActionReason, Presenter, SelectableDevice, SharedSnapshot,
    SnapshotPublisher, StatusSnapshot,
};
pub use target::choose_target;

use crate::audio::{AudioGateway, DeviceClassifier, DeviceId, NameMatcher, find_device_by_id};
use crate::config::DevicePattern;
use crate::constants::UNKNOWN_DEVICE_NAME;
use crate::preferences::PreferenceStore;

/// Arbitration state and collaborators.
pub struct Arbiter {
    gateway: AudioGateway,
    classifier: Box<dyn DeviceClassifier>,
    store: Box<dyn PreferenceStore>,
    presenter: Box<dyn Presenter>,
    priority: Vec<NameMatcher>,
    preference: Option<DeviceId>,
    preference_persisted: bool,
    last_outcome: Option<CycleOutcome>,
}

impl Arbiter {
    /// Creates an arbiter, loading the stored preference.
    ///
    /// An unreadable store is logged and treated as "no preference".
    #[must_use]
    pub fn new(
        gateway: AudioGateway,
        classifier: Box<dyn DeviceClassifier>,
        store: Box<dyn PreferenceStore>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let preference = store.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load input device preference");
            None
        });

        if let Some(id) = preference {
            tracing::debug!(device = id, "loaded input device preference");
        }

        Self {
            gateway,
            classifier,
            store,
            presenter,
            priority: Vec::new(),
            preference,
            preference_persisted: true,
            last_outcome: None,
        }
    }

    /// Sets the fallback order consulted when no preference is usable.
    #[must_use]
    pub fn with_priority(mut self, priority: &[DevicePattern]) -> Self {
        self.priority = priority.iter().map(NameMatcher::new).collect();
        self
    }

    /// The user's preferred device.
    #[must_use]
    pub const fn preference(&self) -> Option<DeviceId> { self.preference }

    /// Whether the last preference change reached durable storage.
    #[must_use]
    pub const fn preference_persisted(&self) -> bool { self.preference_persisted }

    /// Runs one arbitration cycle and refreshes the presenter.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.evaluate().await;

        match &outcome {
            CycleOutcome::Switched { from, to, name } => {
                tracing::info!(from, to, name = %name, "switched default input device");
            }
            CycleOutcome::SwitchFailed { target } => {
                tracing::warn!(device = target, "could not switch default input device, retrying next cycle");
            }
            CycleOutcome::NoActionNeeded { reason } => {
                tracing::debug!(?reason, "no action needed");
            }
        }

        self.last_outcome = Some(outcome.clone());
        self.publish().await;
        outcome
    }

    /// Records a user selection and runs a cycle so it takes effect at once.
    ///
    /// A failed save keeps the selection for this session and flags the
    /// snapshot.
    pub async fn select_device(&mut self, id: DeviceId) -> CycleOutcome {
        self.preference = Some(id);

        match self.store.save(id) {
            Ok(()) => self.preference_persisted = true,
            Err(err) => {
                tracing::warn!(device = id, error = %err, "failed to persist input device preference");
                self.preference_persisted = false;
            }
        }

        tracing::info!(device = id, "selected preferred input device");
        self.run_cycle().await
    }

    async fn evaluate(&self) -> CycleOutcome {
        let Some(current) = self.gateway.default_input_device().await else {
            return CycleOutcome::no_action(NoActionReason::DefaultUnknown);
        };

        // An unreadable name is treated as acceptable: never guess.
        let Some(name) = self.gateway.device_name(current).await else {
            return CycleOutcome::no_action(NoActionReason::NotUndesired);
        };
        if !self.classifier.is_undesired(&name) {
            return CycleOutcome::no_action(NoActionReason::NotUndesired);
        }

        tracing::debug!(device = current, name = %name, "undesired device is the default input");

        let devices = self.gateway.list_devices().await;
        let selectable = self.classifier.filter_selectable(&devices);

        let Some(target) = choose_target(&selectable, self.preference, &self.priority) else {
            tracing::debug!("no selectable input device to switch to");
            return CycleOutcome::no_action(NoActionReason::NoSelectableInput);
        };

        if self.gateway.set_default_input_device(target.id).await {
            CycleOutcome::Switched {
                from: current,
                to: target.id,
                name: target.name.clone(),
            }
        } else {
            CycleOutcome::SwitchFailed { target: target.id }
        }
    }

    async fn publish(&mut self) {
        let current = self.gateway.default_input_device().await;
        let devices = self.gateway.list_devices().await;

        let current_name = match current {
            Some(id) => match find_device_by_id(&devices, id) {
                Some(device) => Some(device.name.clone()),
                None => self.gateway.device_name(id).await,
            },
            None => None,
        };

        let snapshot = StatusSnapshot {
            current_input_device_id: current,
            current_input_device_name: current_name
                .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
            selectable_devices: self
                .classifier
                .filter_selectable(&devices)
                .into_iter()
                .map(|device| SelectableDevice { id: device.id, name: device.name })
                .collect(),
            selected_preference_id: self.preference,
            preference_persisted: self.preference_persisted,
            last_outcome: self.last_outcome.clone(),
        };

        self.presenter.refresh(&snapshot);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::audio::fake::FakeBackend;
    use crate::audio::{Device, PatternClassifier};
    use crate::preferences::{MemoryPreferenceStore, PreferenceError};

    /// Store whose saves always fail.
    struct ReadOnlyStore;

    impl PreferenceStore for ReadOnlyStore {
        fn load(&self) -> Result<Option<DeviceId>, PreferenceError> { Ok(None) }

        fn save(&mut self, _id: DeviceId) -> Result<(), PreferenceError> {
            Err(PreferenceError::NoDataDir)
        }
    }

    pub(crate) fn arbiter_with(
        backend: &Arc<FakeBackend>,
        store: Box<dyn PreferenceStore>,
    ) -> (Arbiter, SharedSnapshot) {
        let shared = SharedSnapshot::new();
        let arbiter = Arbiter::new(
            AudioGateway::new(backend.clone(), Duration::from_secs(1)),
            Box::new(PatternClassifier::marker("AirBuds")),
            store,
            Box::new(SnapshotPublisher::new(shared.clone())),
        );
        (arbiter, shared)
    }

    fn arbiter(backend: &Arc<FakeBackend>, preference: Option<DeviceId>) -> (Arbiter, SharedSnapshot) {
        arbiter_with(backend, Box::new(MemoryPreferenceStore::new(preference)))
    }

    fn airbuds_and_builtin() -> Arc<FakeBackend> {
        Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "Built-in Mic", true),
            ])
            .with_default_input(1),
        )
    }

    #[tokio::test]
    async fn scenario_a_switches_to_first_safe_device() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, _) = arbiter(&backend, None);

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Switched { from: 1, to: 2, name: "Built-in Mic".to_string() });
        assert_eq!(backend.default_input(), Some(2));
    }

    #[tokio::test]
    async fn scenario_b_honors_preference_over_position() {
        let backend = Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "USB Mic", true),
                Device::new(3, "Built-in Mic", true),
            ])
            .with_default_input(1),
        );
        let (mut arbiter, _) = arbiter(&backend, Some(3));

        arbiter.run_cycle().await;

        assert_eq!(backend.default_input(), Some(3));
    }

    #[tokio::test]
    async fn scenario_c_no_selectable_input() {
        let backend = Arc::new(
            FakeBackend::new(vec![Device::new(1, "AirBuds Pro", true)]).with_default_input(1),
        );
        let (mut arbiter, _) = arbiter(&backend, None);

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NoSelectableInput));
        assert!(backend.switch_calls().is_empty());
        assert_eq!(backend.default_input(), Some(1));
    }

    #[tokio::test]
    async fn scenario_d_default_query_failure_is_no_op() {
        let backend = airbuds_and_builtin();
        backend.fail_default_query(true);
        let (mut arbiter, shared) = arbiter(&backend, None);

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::DefaultUnknown));
        assert!(backend.switch_calls().is_empty());
        assert_eq!(shared.get().current_input_device_name, "Unknown");
    }

    #[tokio::test]
    async fn second_cycle_is_a_no_op() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, _) = arbiter(&backend, None);

        assert!(arbiter.run_cycle().await.is_switch());
        let second = arbiter.run_cycle().await;

        assert_eq!(second, CycleOutcome::no_action(NoActionReason::NotUndesired));
        assert_eq!(backend.switch_calls(), vec![2]);
    }

    #[tokio::test]
    async fn stale_preference_falls_back_without_error() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, _) = arbiter(&backend, Some(77));

        let outcome = arbiter.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Switched { to: 2, .. }));
        assert_eq!(arbiter.preference(), Some(77));
    }

    #[tokio::test]
    async fn preference_pointing_at_undesired_device_is_ignored() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, _) = arbiter(&backend, Some(1));

        arbiter.run_cycle().await;

        assert_eq!(backend.switch_calls(), vec![2]);
    }

    #[tokio::test]
    async fn never_targets_undesired_or_output_devices() {
        let backend = Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "Speakers", false),
                Device::new(3, "airbuds case mic", true),
            ])
            .with_default_input(1),
        );
        let (mut arbiter, _) = arbiter(&backend, Some(2));

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NoSelectableInput));
        assert!(backend.switch_calls().is_empty());
    }

    #[tokio::test]
    async fn unreadable_current_name_is_fail_safe() {
        let backend = airbuds_and_builtin();
        backend.fail_name_of(1);
        let (mut arbiter, _) = arbiter(&backend, None);

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NotUndesired));
        assert!(backend.switch_calls().is_empty());
    }

    #[tokio::test]
    async fn rejected_switch_is_retried_next_cycle() {
        let backend = airbuds_and_builtin();
        backend.reject_switch(true);
        let (mut arbiter, shared) = arbiter(&backend, None);

        assert_eq!(arbiter.run_cycle().await, CycleOutcome::SwitchFailed { target: 2 });
        assert_eq!(shared.get().last_outcome, Some(CycleOutcome::SwitchFailed { target: 2 }));

        backend.reject_switch(false);
        assert!(arbiter.run_cycle().await.is_switch());
        assert_eq!(backend.switch_calls(), vec![2, 2]);
    }

    #[tokio::test]
    async fn listing_failure_means_nothing_selectable() {
        let backend = airbuds_and_builtin();
        backend.fail_listing(true);
        let (mut arbiter, _) = arbiter(&backend, None);

        let outcome = arbiter.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NoSelectableInput));
    }

    #[tokio::test]
    async fn desired_default_is_left_alone() {
        let backend = airbuds_and_builtin();
        backend.set_default_input(Some(2));
        let (mut arbiter, _) = arbiter(&backend, Some(2));

        assert_eq!(arbiter.run_cycle().await, CycleOutcome::no_action(NoActionReason::NotUndesired));
        assert!(backend.switch_calls().is_empty());
    }

    #[tokio::test]
    async fn select_device_persists_and_applies_immediately() {
        let backend = Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "USB Mic", true),
                Device::new(3, "Built-in Mic", true),
            ])
            .with_default_input(1),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let store = crate::preferences::JsonPreferenceStore::new(&path);
        let (mut arbiter, shared) = arbiter_with(&backend, Box::new(store));

        let outcome = arbiter.select_device(3).await;

        assert!(matches!(outcome, CycleOutcome::Switched { to: 3, .. }));
        let snapshot = shared.get();
        assert_eq!(snapshot.selected_preference_id, Some(3));
        assert!(snapshot.preference_persisted);

        let reloaded = crate::preferences::JsonPreferenceStore::new(&path);
        assert_eq!(reloaded.load().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn select_device_does_not_force_switch() {
        let backend = airbuds_and_builtin();
        backend.set_default_input(Some(2));
        let (mut arbiter, _) = arbiter(&backend, None);

        arbiter.select_device(1).await;

        assert!(backend.switch_calls().is_empty());
        assert_eq!(arbiter.preference(), Some(1));
    }

    #[tokio::test]
    async fn failed_save_is_flagged_in_snapshot() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, shared) = arbiter_with(&backend, Box::new(ReadOnlyStore));

        let outcome = arbiter.select_device(2).await;

        assert!(outcome.is_switch());
        assert!(!arbiter.preference_persisted());
        let snapshot = shared.get();
        assert!(!snapshot.preference_persisted);
        assert_eq!(snapshot.selected_preference_id, Some(2));
    }

    #[tokio::test]
    async fn snapshot_reflects_current_device_and_selectable_list() {
        let backend = airbuds_and_builtin();
        let (mut arbiter, shared) = arbiter(&backend, None);

        arbiter.run_cycle().await;

        let snapshot = shared.get();
        assert_eq!(snapshot.current_input_device_id, Some(2));
        assert_eq!(snapshot.current_input_device_name, "Built-in Mic");
        assert_eq!(
            snapshot.selectable_devices,
            vec![SelectableDevice { id: 2, name: "Built-in Mic".to_string() }]
        );
    }

    #[tokio::test]
    async fn priority_list_applies_before_positional_fallback() {
        let backend = Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "Built-in Mic", true),
                Device::new(3, "AT2020USB+", true),
            ])
            .with_default_input(1),
        );
        let (arbiter, _) = arbiter(&backend, None);
        let mut arbiter = arbiter.with_priority(&[DevicePattern::contains("at2020")]);

        arbiter.run_cycle().await;

        assert_eq!(backend.default_input(), Some(3));
    }
}
