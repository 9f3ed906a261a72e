use std::io;
use std::thread::{self, JoinHandle};

/// Spawns a thread named `micswitch-{name}`.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the thread.
pub fn spawn_named_thread<F>(name: &str, task: F) -> io::Result<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("micswitch-{name}");

    thread::Builder::new().name(thread_name.clone()).spawn(task).inspect_err(|err| {
        tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
    })
}
