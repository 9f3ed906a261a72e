//! Unix Domain Socket IPC between the CLI and the running daemon.
//!
//! # Architecture
//!
//! - `micswitch run` starts a socket server in the cache directory
//! - CLI commands connect, send one JSON query line and read one JSON response line
//! - If the socket doesn't exist or connection fails, the daemon is not running
//!
//! # Query Format
//!
//! ```json
//! {"type": "ping"}
//! {"type": "status"}
//! {"type": "select", "device": "Built-in Mic"}
//! {"type": "evaluate"}
//! ```
//!
//! # Response Format
//!
//! ```json
//! {"data": {...}}
//! {"error": "No selectable input device named 'Foo'"}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::path::cache_dir;
use crate::platform::spawn_named_thread;

/// Socket filename within the cache directory.
const SOCKET_FILENAME: &str = "micswitch.sock";

/// Default timeout for socket operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of attempts for transient connection failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Queries the CLI can send to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IpcQuery {
    /// Check that the daemon is running.
    Ping,
    /// Fetch the current status snapshot.
    Status,
    /// Record a preferred input device, by id or exact name.
    Select { device: String },
    /// Run an arbitration cycle now.
    Evaluate,
}

/// Response from the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcResponse {
    /// Successful response with data.
    Success { data: serde_json::Value },
    /// Error response.
    Error { error: String },
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(data: impl Serialize) -> Self {
        Self::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self { Self::Error { error: message.into() } }
}

/// Error type for IPC client operations.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Daemon is not running (socket doesn't exist or can't connect).
    #[error("micswitch daemon is not running (start it with `micswitch run`)")]
    DaemonNotRunning,
    /// No response within the timeout.
    #[error("Connection timed out")]
    Timeout,
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid response from the daemon.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Gets the default path of the IPC socket.
#[must_use]
pub fn default_socket_path() -> PathBuf { cache_dir().join(SOCKET_FILENAME) }

fn remove_socket(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

// ============================================================================
// Server (daemon side)
// ============================================================================

/// A running socket server. Dropping it stops the server.
#[derive(Debug)]
pub struct IpcServer {
    path: PathBuf,
    running: Arc<AtomicBool>,
}

impl IpcServer {
    /// Binds `path` and serves queries on a background thread.
    ///
    /// A stale socket file at `path` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or the thread cannot
    /// be spawned.
    pub fn start<F>(path: impl Into<PathBuf>, handler: F) -> std::io::Result<Self>
    where F: Fn(IpcQuery) -> IpcResponse + Send + Sync + 'static {
        let path = path.into();

        remove_socket(&path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&path)?;
        tracing::info!(path = %path.display(), "control socket listening");

        let running = Arc::new(AtomicBool::new(true));
        let handler = Arc::new(handler);
        let loop_running = Arc::clone(&running);
        spawn_named_thread("ipc-server", move || server_loop(&listener, &loop_running, &handler))?;

        Ok(Self { path, running })
    }

    /// Path of the bound socket.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Stops accepting connections and removes the socket file.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        // Wake the accept loop so it observes the flag.
        let _ = UnixStream::connect(&self.path);
        remove_socket(&self.path);
        tracing::debug!(path = %self.path.display(), "control socket stopped");
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) { self.stop(); }
}

fn server_loop<F>(listener: &UnixListener, running: &AtomicBool, handler: &Arc<F>)
where F: Fn(IpcQuery) -> IpcResponse + Send + Sync + 'static {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(stream) => {
                let handler = Arc::clone(handler);
                let spawned = spawn_named_thread("ipc-conn", move || {
                    handle_connection(stream, handler.as_ref());
                });
                if spawned.is_err() {
                    tracing::warn!("dropping control socket connection");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "control socket connection error");
            }
        }
    }
}

#[allow(clippy::needless_pass_by_value)] // Ownership needed - stream is consumed
fn handle_connection<F>(stream: UnixStream, handler: &F)
where F: Fn(IpcQuery) -> IpcResponse {
    let _ = stream.set_read_timeout(Some(DEFAULT_TIMEOUT));

    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
        return;
    }

    let response = match serde_json::from_str::<IpcQuery>(line.trim()) {
        Ok(query) => {
            tracing::debug!(?query, "control socket query");
            handler(query)
        }
        Err(err) => IpcResponse::error(format!("Invalid query: {err}")),
    };

    let response_json = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize response"}"#.to_string());

    let mut stream = stream;
    let _ = writeln!(stream, "{response_json}");
}

// ============================================================================
// Client (CLI side)
// ============================================================================

/// Sends a query to the daemon listening on `path`.
///
/// Retries transient connection failures.
///
/// # Errors
///
/// Returns [`IpcError::DaemonNotRunning`] if nothing listens on `path`, or
/// another error if the exchange fails.
pub fn send_query(path: &Path, query: &IpcQuery) -> Result<IpcResponse, IpcError> {
    let mut last_error = IpcError::DaemonNotRunning;

    for attempt in 0..MAX_RETRIES {
        match send_query_once(path, query) {
            Ok(response) => return Ok(response),
            Err(err) => {
                last_error = err;

                // Only connection failures are worth retrying
                if !matches!(last_error, IpcError::DaemonNotRunning) {
                    break;
                }

                if attempt < MAX_RETRIES - 1 {
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    Err(last_error)
}

fn send_query_once(path: &Path, query: &IpcQuery) -> Result<IpcResponse, IpcError> {
    if !path.exists() {
        return Err(IpcError::DaemonNotRunning);
    }

    let mut stream = UnixStream::connect(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::NotFound
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => IpcError::DaemonNotRunning,
        _ => IpcError::Io(err),
    })?;

    stream.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
    stream.set_write_timeout(Some(DEFAULT_TIMEOUT))?;

    let query_json = serde_json::to_string(query)
        .map_err(|err| IpcError::InvalidResponse(format!("Failed to serialize query: {err}")))?;

    writeln!(stream, "{query_json}").map_err(|err| {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            IpcError::DaemonNotRunning
        } else {
            IpcError::Io(err)
        }
    })?;

    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line).map_err(|err| match err.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => IpcError::Timeout,
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            IpcError::DaemonNotRunning
        }
        _ => IpcError::Io(err),
    })?;

    serde_json::from_str(response_line.trim())
        .map_err(|err| IpcError::InvalidResponse(format!("Failed to parse response: {err}")))
}

/// Checks if a daemon answers on `path`.
#[must_use]
pub fn is_daemon_running(path: &Path) -> bool {
    matches!(send_query(path, &IpcQuery::Ping), Ok(IpcResponse::Success { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path() {
        let path = default_socket_path();
        assert!(path.to_string_lossy().ends_with("micswitch.sock"));
    }

    #[test]
    fn test_ipc_query_serialization() {
        assert_eq!(serde_json::to_string(&IpcQuery::Status).unwrap(), r#"{"type":"status"}"#);

        let query = IpcQuery::Select { device: "USB Mic".to_string() };
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"type":"select","device":"USB Mic"}"#);
    }

    #[test]
    fn test_ipc_response_serialization() {
        let json = serde_json::to_string(&IpcResponse::success(vec![1, 2, 3])).unwrap();
        assert_eq!(json, r#"{"data":[1,2,3]}"#);

        let json = serde_json::to_string(&IpcResponse::error("Not found")).unwrap();
        assert_eq!(json, r#"{"error":"Not found"}"#);
    }

    #[test]
    fn test_daemon_not_running_when_no_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILENAME);

        assert!(!is_daemon_running(&path));
        assert!(matches!(send_query(&path, &IpcQuery::Ping), Err(IpcError::DaemonNotRunning)));
    }

    #[test]
    fn test_server_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILENAME);

        let server = IpcServer::start(&path, |query| match query {
            IpcQuery::Ping => IpcResponse::success("pong"),
            IpcQuery::Select { device } => IpcResponse::error(format!("unknown device {device}")),
            IpcQuery::Status | IpcQuery::Evaluate => IpcResponse::success(serde_json::json!({})),
        })
        .unwrap();

        assert!(is_daemon_running(&path));
        assert_eq!(
            send_query(&path, &IpcQuery::Select { device: "Foo".to_string() }).unwrap(),
            IpcResponse::error("unknown device Foo")
        );

        server.stop();
        assert!(!path.exists());
        assert!(!is_daemon_running(&path));
    }

    #[test]
    fn test_invalid_query_gets_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_FILENAME);
        let _server = IpcServer::start(&path, |_| IpcResponse::success("ok")).unwrap();

        let mut stream = UnixStream::connect(&path).unwrap();
        writeln!(stream, r#"{{"type":"reboot"}}"#).unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();

        assert!(line.contains("Invalid query"));
    }
}
