//! In-memory audio backend for tests.

use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;

use super::backend::{AudioBackend, AudioError};
use super::device::{Device, DeviceId};

#[derive(Debug, Default)]
struct State {
    devices: Vec<Device>,
    default_input: Option<DeviceId>,
    fail_listing: bool,
    fail_default_query: bool,
    fail_names: HashSet<DeviceId>,
    reject_switch: bool,
    delay: Option<Duration>,
    switch_calls: Vec<DeviceId>,
}

/// Scriptable backend. Every call observes the current state.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            state: Mutex::new(State { devices, ..State::default() }),
        }
    }

    #[must_use]
    pub fn with_default_input(self, id: DeviceId) -> Self {
        self.state.lock().default_input = Some(id);
        self
    }

    pub fn set_devices(&self, devices: Vec<Device>) { self.state.lock().devices = devices; }

    pub fn set_default_input(&self, id: Option<DeviceId>) { self.state.lock().default_input = id; }

    pub fn default_input(&self) -> Option<DeviceId> { self.state.lock().default_input }

    pub fn fail_listing(&self, fail: bool) { self.state.lock().fail_listing = fail; }

    pub fn fail_default_query(&self, fail: bool) { self.state.lock().fail_default_query = fail; }

    pub fn fail_name_of(&self, id: DeviceId) { self.state.lock().fail_names.insert(id); }

    pub fn reject_switch(&self, reject: bool) { self.state.lock().reject_switch = reject; }

    pub fn set_delay(&self, delay: Duration) { self.state.lock().delay = Some(delay); }

    /// Every id passed to `set_default_input_device`, accepted or not.
    pub fn switch_calls(&self) -> Vec<DeviceId> { self.state.lock().switch_calls.clone() }

    fn pause(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl AudioBackend for FakeBackend {
    fn name(&self) -> &'static str { "fake" }

    fn probe(&self) -> Result<(), AudioError> { Ok(()) }

    fn device_ids(&self) -> Result<Vec<DeviceId>, AudioError> {
        self.pause();
        let state = self.state.lock();
        if state.fail_listing {
            return Err(AudioError::query("list devices", "injected failure"));
        }
        Ok(state.devices.iter().map(|device| device.id).collect())
    }

    fn device_name(&self, id: DeviceId) -> Result<String, AudioError> {
        self.pause();
        let state = self.state.lock();
        if state.fail_names.contains(&id) {
            return Err(AudioError::query("read device name", "injected failure"));
        }
        state
            .devices
            .iter()
            .find(|device| device.id == id)
            .map(|device| device.name.clone())
            .ok_or_else(|| AudioError::query("read device name", format!("no device {id}")))
    }

    fn is_input_capable(&self, id: DeviceId) -> Result<bool, AudioError> {
        self.pause();
        let state = self.state.lock();
        state
            .devices
            .iter()
            .find(|device| device.id == id)
            .map(|device| device.is_input)
            .ok_or_else(|| AudioError::query("read input capability", format!("no device {id}")))
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>, AudioError> {
        self.pause();
        let state = self.state.lock();
        if state.fail_default_query {
            return Err(AudioError::query("read default input device", "injected failure"));
        }
        Ok(state.default_input)
    }

    fn set_default_input_device(&self, id: DeviceId) -> Result<(), AudioError> {
        self.pause();
        let mut state = self.state.lock();
        state.switch_calls.push(id);

        let known = state.devices.iter().any(|device| device.id == id && device.is_input);
        if state.reject_switch || !known {
            return Err(AudioError::Switch {
                device: id,
                message: "rejected".to_string(),
            });
        }

        state.default_input = Some(id);
        Ok(())
    }
}
