//! Single worker task driving the [`Arbiter`].
//!
//! Timer ticks and user requests are serialized through one channel, so two
//! cycles never run at the same time. A tick that fires while a cycle is in
//! flight is skipped.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::Arbiter;
use super::snapshot::CycleOutcome;
use crate::audio::DeviceId;

const CHANNEL_BUFFER_SIZE: usize = 32;

/// Error types for worker communication.
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    /// Failed to send message to the worker.
    #[error("Failed to send message to arbiter: channel closed")]
    SendFailed,

    /// Failed to receive response from the worker.
    #[error("Failed to receive response from arbiter: channel closed")]
    ReceiveFailed,
}

/// Messages accepted by the worker.
#[derive(Debug)]
pub enum ArbiterMessage {
    /// Run a cycle now.
    Evaluate {
        respond_to: Option<oneshot::Sender<CycleOutcome>>,
    },
    /// The user picked a preferred device.
    SelectDevice {
        device: DeviceId,
        respond_to: Option<oneshot::Sender<CycleOutcome>>,
    },
    /// Stop after the in-flight cycle.
    Shutdown,
}

/// Owns the worker task.
pub struct ArbiterService {
    handle: ArbiterHandle,
    task: JoinHandle<()>,
}

impl ArbiterService {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// A cycle runs immediately, then every `interval`.
    #[must_use]
    pub fn spawn(arbiter: Arbiter, interval: Duration) -> Self {
        tracing::debug!(?interval, "spawning arbiter worker");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let task = tokio::spawn(run(arbiter, receiver, interval));

        Self { handle: ArbiterHandle::new(sender), task }
    }

    /// Returns a handle for sending requests to the worker.
    #[must_use]
    pub fn handle(&self) -> ArbiterHandle { self.handle.clone() }

    /// Stops the timer, lets the in-flight cycle finish and waits for the worker.
    pub async fn shutdown(self) {
        if self.handle.sender.send(ArbiterMessage::Shutdown).await.is_err() {
            tracing::debug!("arbiter worker already stopped");
        }

        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "arbiter worker terminated abnormally");
        }
    }
}

async fn run(mut arbiter: Arbiter, mut receiver: mpsc::Receiver<ArbiterMessage>, interval: Duration) {
    arbiter.run_cycle().await;

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            message = receiver.recv() => match message {
                Some(ArbiterMessage::Evaluate { respond_to }) => {
                    let outcome = arbiter.run_cycle().await;
                    reply(respond_to, outcome);
                }
                Some(ArbiterMessage::SelectDevice { device, respond_to }) => {
                    let outcome = arbiter.select_device(device).await;
                    reply(respond_to, outcome);
                }
                Some(ArbiterMessage::Shutdown) => {
                    tracing::debug!("arbiter worker received shutdown message");
                    break;
                }
                None => {
                    tracing::debug!("arbiter channel closed, exiting");
                    break;
                }
            },
            _ = ticker.tick() => {
                arbiter.run_cycle().await;
            }
        }
    }
}

fn reply(respond_to: Option<oneshot::Sender<CycleOutcome>>, outcome: CycleOutcome) {
    if let Some(respond_to) = respond_to {
        // The requester may have given up waiting.
        let _ = respond_to.send(outcome);
    }
}

/// Handle for communicating with the arbiter worker.
///
/// This handle is cheap to clone and can be shared across threads.
#[derive(Clone, Debug)]
pub struct ArbiterHandle {
    sender: mpsc::Sender<ArbiterMessage>,
}

impl ArbiterHandle {
    pub(crate) const fn new(sender: mpsc::Sender<ArbiterMessage>) -> Self { Self { sender } }

    /// Whether the worker is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<CycleOutcome>) -> ArbiterMessage,
    ) -> Result<CycleOutcome, ArbiterError> {
        let (tx, rx) = oneshot::channel();

        self.sender.send(build(tx)).await.map_err(|_| ArbiterError::SendFailed)?;

        rx.await.map_err(|_| ArbiterError::ReceiveFailed)
    }

    fn blocking_request(
        &self,
        build: impl FnOnce(oneshot::Sender<CycleOutcome>) -> ArbiterMessage,
    ) -> Result<CycleOutcome, ArbiterError> {
        let (tx, rx) = oneshot::channel();

        self.sender.blocking_send(build(tx)).map_err(|_| ArbiterError::SendFailed)?;

        rx.blocking_recv().map_err(|_| ArbiterError::ReceiveFailed)
    }

    /// Runs a cycle now and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn evaluate(&self) -> Result<CycleOutcome, ArbiterError> {
        self.request(|tx| ArbiterMessage::Evaluate { respond_to: Some(tx) }).await
    }

    /// Records `device` as the preference and runs a cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn select_device(&self, device: DeviceId) -> Result<CycleOutcome, ArbiterError> {
        self.request(|tx| ArbiterMessage::SelectDevice { device, respond_to: Some(tx) })
            .await
    }

    /// Blocking variant of [`Self::evaluate`] for non-async threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub fn blocking_evaluate(&self) -> Result<CycleOutcome, ArbiterError> {
        self.blocking_request(|tx| ArbiterMessage::Evaluate { respond_to: Some(tx) })
    }

    /// Blocking variant of [`Self::select_device`] for non-async threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub fn blocking_select_device(&self, device: DeviceId) -> Result<CycleOutcome, ArbiterError> {
        self.blocking_request(|tx| ArbiterMessage::SelectDevice { device, respond_to: Some(tx) })
    }

    /// Queues a cycle without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ArbiterError::SendFailed`] if the worker has stopped or is saturated.
    pub fn trigger(&self) -> Result<(), ArbiterError> {
        self.sender
            .try_send(ArbiterMessage::Evaluate { respond_to: None })
            .map_err(|_| ArbiterError::SendFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::arbiter::NoActionReason;
    use crate::arbiter::tests::arbiter_with;
    use crate::audio::Device;
    use crate::audio::fake::FakeBackend;
    use crate::preferences::MemoryPreferenceStore;

    const HOUR: Duration = Duration::from_secs(3600);

    fn backend() -> Arc<FakeBackend> {
        Arc::new(
            FakeBackend::new(vec![
                Device::new(1, "AirBuds Pro", true),
                Device::new(2, "USB Mic", true),
                Device::new(3, "Built-in Mic", true),
            ])
            .with_default_input(1),
        )
    }

    fn service(backend: &Arc<FakeBackend>, interval: Duration) -> ArbiterService {
        let (arbiter, _) = arbiter_with(backend, Box::new(MemoryPreferenceStore::default()));
        ArbiterService::spawn(arbiter, interval)
    }

    #[tokio::test]
    async fn test_startup_cycle_runs_before_first_tick() {
        let backend = backend();
        let service = service(&backend, HOUR);

        // Queued behind the startup cycle.
        let outcome = service.handle().evaluate().await.unwrap();

        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NotUndesired));
        assert_eq!(backend.default_input(), Some(2));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_select_device_takes_effect_immediately() {
        let backend = backend();
        let service = service(&backend, HOUR);
        let handle = service.handle();
        handle.evaluate().await.unwrap();

        backend.set_default_input(Some(1));
        let outcome = handle.select_device(3).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Switched { from: 1, to: 3, .. }));
        assert_eq!(backend.default_input(), Some(3));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_timer_corrects_reconnected_headset() {
        let backend = backend();
        let service = service(&backend, Duration::from_millis(50));
        service.handle().evaluate().await.unwrap();

        backend.set_default_input(Some(1));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(backend.default_input(), Some(2));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_blocking_handle_from_plain_thread() {
        let backend = backend();
        let service = service(&backend, HOUR);
        let handle = service.handle();

        let outcome = tokio::task::spawn_blocking(move || handle.blocking_select_device(3))
            .await
            .unwrap()
            .unwrap();

        // The startup cycle already moved away from the headset.
        assert_eq!(outcome, CycleOutcome::no_action(NoActionReason::NotUndesired));
        assert_eq!(backend.switch_calls(), vec![2]);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_fails_after_shutdown() {
        let backend = backend();
        let service = service(&backend, HOUR);
        let handle = service.handle();
        assert!(handle.is_alive());

        service.shutdown().await;

        assert!(!handle.is_alive());
        assert!(matches!(handle.evaluate().await, Err(ArbiterError::SendFailed)));
        assert!(handle.trigger().is_err());
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let (tx, rx) = mpsc::channel(4);
        let handle = ArbiterHandle::new(tx);
        drop(rx);

        assert!(matches!(handle.evaluate().await, Err(ArbiterError::SendFailed)));
    }
}
