//! CLI module for micswitch.
//!
//! `micswitch run` (or no subcommand) starts the daemon. The other
//! subcommands either query the audio subsystem directly (`devices`) or talk
//! to the running daemon over its control socket.

mod commands;
mod output;

use clap::Parser;
pub use commands::{Cli, Commands, RunArgs};

use crate::error::MicSwitchError;
use crate::logging;

/// Runs the CLI.
///
/// Parses command-line arguments, initializes logging and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), MicSwitchError> {
    let cli = Cli::parse();
    logging::init(cli.verbose());
    cli.execute()
}
