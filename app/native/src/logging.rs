//! Console logging setup.

use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::constants::APP_NAME;

/// Builds the filter: `RUST_LOG` if set, otherwise this crate at `info`
/// (`debug` when verbose) and everything else at `warn`.
fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };

    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},warn")))
}

/// Installs a stderr subscriber. Repeated calls are no-ops.
pub fn init(verbose: bool) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(env_filter(verbose));

    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
