//! Long-running arbitration process.
//!
//! Startup order: load configuration, open and probe the audio backend (the
//! only fatal step), then start the arbitration worker and the control
//! socket, and wait for SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::arbiter::{
    Arbiter, ArbiterHandle, ArbiterService, CycleOutcome, SelectableDevice, SharedSnapshot,
    SnapshotPublisher,
};
use crate::audio::{self, AudioBackend, AudioGateway, PatternClassifier};
use crate::config::{self, BackendKind, DevicePattern, MicSwitchConfig};
use crate::error::MicSwitchError;
use crate::ipc::{IpcQuery, IpcResponse, IpcServer, default_socket_path, is_daemon_running};
use crate::preferences::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};

/// How long shutdown waits for abandoned blocking audio calls.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Options for `micswitch run`, layered over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Control socket location.
    pub socket_path: Option<PathBuf>,
    /// Polling interval override, in seconds.
    pub interval: Option<u64>,
    /// Replaces the undesired list with a single substring marker.
    pub marker: Option<String>,
    /// Backend override.
    pub backend: Option<BackendKind>,
    /// Keep the preference in memory only.
    pub ephemeral: bool,
    /// Do not start the control socket.
    pub no_ipc: bool,
}

impl RunOptions {
    /// Applies the command-line overrides to `config`.
    pub fn apply(&self, config: &mut MicSwitchConfig) {
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(marker) = &self.marker {
            config.undesired = vec![DevicePattern::contains(marker.clone())];
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }
}

/// Result of a `select` request, as returned over the control socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    /// The device recorded as preference.
    pub selected: SelectableDevice,
    /// Outcome of the cycle that followed.
    pub outcome: CycleOutcome,
    /// Whether the preference reached durable storage.
    pub preference_persisted: bool,
}

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns [`MicSwitchError::Startup`] if the audio subsystem is unusable.
pub fn run(options: &RunOptions) -> Result<(), MicSwitchError> {
    let mut config = config::load(options.config_path.as_deref());
    options.apply(&mut config);

    let backend = audio::create_backend(config.backend)
        .and_then(|backend| backend.probe().map(|()| backend))
        .map_err(|err| MicSwitchError::Startup(err.to_string()))?;

    tracing::info!(
        backend = backend.name(),
        interval = ?config.poll_interval(),
        call_timeout = ?config.call_timeout(),
        "starting input device arbitration"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| MicSwitchError::Startup(format!("failed to start runtime: {err}")))?;

    let socket = control_socket_path(options);
    let result = runtime.block_on(serve(&config, options.ephemeral, socket, backend));

    // Hung audio calls are abandoned rather than blocking exit.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    tracing::info!("stopped");
    result
}

/// Returns where the control socket should listen, if anywhere.
///
/// A socket already answered by another daemon is left alone.
fn control_socket_path(options: &RunOptions) -> Option<PathBuf> {
    if options.no_ipc {
        return None;
    }

    let path = options.socket_path.clone().unwrap_or_else(default_socket_path);
    if is_daemon_running(&path) {
        tracing::warn!(path = %path.display(), "another daemon owns the control socket, running without it");
        return None;
    }
    Some(path)
}

async fn serve(
    config: &MicSwitchConfig,
    ephemeral: bool,
    socket: Option<PathBuf>,
    backend: Arc<dyn AudioBackend>,
) -> Result<(), MicSwitchError> {
    let shared = SharedSnapshot::new();

    let arbiter = Arbiter::new(
        AudioGateway::new(backend, config.call_timeout()),
        Box::new(PatternClassifier::new(&config.undesired)),
        preference_store(config, ephemeral),
        Box::new(SnapshotPublisher::new(shared.clone())),
    )
    .with_priority(&config.priority);

    let service = ArbiterService::spawn(arbiter, config.poll_interval());

    let server = socket.and_then(|path| {
        IpcServer::start(&path, query_handler(service.handle(), shared.clone()))
            .inspect_err(|err| {
                tracing::warn!(path = %path.display(), error = %err, "control socket unavailable");
            })
            .ok()
    });

    wait_for_shutdown_signal().await;
    tracing::info!("shutting down");

    if let Some(server) = server {
        server.stop();
    }
    service.shutdown().await;

    Ok(())
}

/// Picks the preference store for the deployment mode.
fn preference_store(config: &MicSwitchConfig, ephemeral: bool) -> Box<dyn PreferenceStore> {
    if ephemeral {
        tracing::debug!("using in-memory preference store");
        return Box::new(MemoryPreferenceStore::default());
    }

    let store = config.preferences_path().map_or_else(
        JsonPreferenceStore::at_default_location,
        |path| Ok(JsonPreferenceStore::new(path)),
    );

    match store {
        Ok(store) => {
            tracing::debug!(path = %store.path().display(), "using preference file");
            Box::new(store)
        }
        Err(err) => {
            tracing::warn!(error = %err, "preference will not survive a restart");
            Box::new(MemoryPreferenceStore::default())
        }
    }
}

/// Finds a selectable device by id or by exact (case-insensitive) name.
#[must_use]
pub fn resolve_selection<'a>(
    selectable: &'a [SelectableDevice],
    query: &str,
) -> Option<&'a SelectableDevice> {
    let query = query.trim();

    if let Ok(id) = query.parse::<audio::DeviceId>()
        && let Some(device) = selectable.iter().find(|device| device.id == id)
    {
        return Some(device);
    }

    selectable.iter().find(|device| device.name.eq_ignore_ascii_case(query))
}

/// Builds the control socket handler.
///
/// Runs on socket threads; selections are forwarded to the worker, never
/// applied here.
#[must_use]
pub fn query_handler(
    handle: ArbiterHandle,
    shared: SharedSnapshot,
) -> impl Fn(IpcQuery) -> IpcResponse + Send + Sync + 'static {
    move |query| match query {
        IpcQuery::Ping => IpcResponse::success("pong"),
        IpcQuery::Status => IpcResponse::success(shared.get()),
        IpcQuery::Evaluate => match handle.blocking_evaluate() {
            Ok(outcome) => IpcResponse::success(outcome),
            Err(err) => IpcResponse::error(err.to_string()),
        },
        IpcQuery::Select { device } => {
            let snapshot = shared.get();
            let Some(selected) = resolve_selection(&snapshot.selectable_devices, &device).cloned()
            else {
                return IpcResponse::error(format!("No selectable input device matching '{device}'"));
            };

            match handle.blocking_select_device(selected.id) {
                Ok(outcome) => IpcResponse::success(SelectionResult {
                    selected,
                    outcome,
                    preference_persisted: shared.get().preference_persisted,
                }),
                Err(err) => IpcResponse::error(err.to_string()),
            }
        }
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
