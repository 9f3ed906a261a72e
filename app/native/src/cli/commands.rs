//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use super::output;
use crate::arbiter::{CycleOutcome, StatusSnapshot};
use crate::audio::{self, PatternClassifier};
use crate::config::{self, BackendKind};
use crate::constants::APP_NAME;
use crate::daemon::{self, RunOptions, SelectionResult};
use crate::error::MicSwitchError;
use crate::ipc::{self, IpcQuery, IpcResponse};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// micswitch - keeps a wireless headset microphone from staying the default input.
///
/// Without a subcommand, runs the arbitration daemon.
#[derive(Parser, Debug)]
#[command(name = "micswitch")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file to use instead of the standard search paths.
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Control socket path.
    #[arg(long, global = true, value_name = "PATH", hide = true)]
    socket: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the arbitration daemon.
    ///
    /// Checks the default input device every `interval` seconds and moves it
    /// away from the undesired headset microphone. This is the default when
    /// no subcommand is given.
    #[command(after_long_help = r#"Examples:
  micswitch run                              # Interactive mode (persistent preference, control socket)
  micswitch run --interval 1 --marker Buds   # Faster polling, custom headset marker
  micswitch run --ephemeral --no-ipc         # Headless mode"#)]
    Run(RunArgs),

    /// List audio devices on the system.
    ///
    /// Queries the audio subsystem directly; the daemon does not need to run.
    /// The current default input device is marked with `*`.
    #[command(after_long_help = r#"Examples:
  micswitch devices           # All devices in table format
  micswitch devices --input   # Input devices only
  micswitch devices --json    # JSON output"#)]
    Devices {
        /// Output in JSON format instead of table format.
        #[arg(long, short = 'j')]
        json: bool,

        /// Show only input devices.
        #[arg(long, short = 'i')]
        input: bool,
    },

    /// Show the running daemon's status.
    Status {
        /// Output in JSON format.
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Choose the preferred input device.
    ///
    /// The device is used whenever the headset microphone becomes the
    /// default input. Accepts a device id or its full name.
    #[command(after_long_help = r#"Examples:
  micswitch select "MacBook Pro Microphone"
  micswitch select 91"#)]
    Select {
        /// Device id or full name (case-insensitive).
        #[arg(value_name = "DEVICE")]
        device: String,
    },

    /// Run an arbitration cycle now.
    Evaluate,

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(micswitch completions --shell zsh)"
    ///   micswitch completions --shell fish > ~/.config/fish/completions/micswitch.fish
    #[command(verbatim_doc_comment)]
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

/// Arguments of `micswitch run`. Each overrides the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Seconds between checks (minimum 1).
    #[arg(long, short, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Treat devices whose name contains MARKER as undesired.
    #[arg(long, short, value_name = "MARKER")]
    marker: Option<String>,

    /// Audio backend: auto, core-audio or switch-audio-source.
    #[arg(long, short, value_name = "BACKEND")]
    backend: Option<BackendKind>,

    /// Keep the preferred device in memory only.
    #[arg(long)]
    ephemeral: bool,

    /// Do not start the control socket.
    #[arg(long)]
    no_ipc: bool,
}

impl Cli {
    /// Whether debug logging was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool { self.verbose }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), MicSwitchError> {
        match &self.command {
            None => self.execute_run(&RunArgs::default()),
            Some(Commands::Run(args)) => self.execute_run(args),
            Some(Commands::Devices { json, input }) => self.execute_devices(*json, *input),
            Some(Commands::Status { json }) => self.execute_status(*json),
            Some(Commands::Select { device }) => self.execute_select(device),
            Some(Commands::Evaluate) => self.execute_evaluate(),
            Some(Commands::Schema) => {
                println!("{}", serde_json::to_string_pretty(&config::schema())?);
                Ok(())
            }
            Some(Commands::Completions { shell }) => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, APP_NAME, &mut io::stdout());
    }

    fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(ipc::default_socket_path)
    }

    fn execute_run(&self, args: &RunArgs) -> Result<(), MicSwitchError> {
        if args.interval == Some(0) {
            return Err(MicSwitchError::InvalidArguments(
                "--interval must be at least 1 second".to_string(),
            ));
        }

        daemon::run(&RunOptions {
            config_path: self.config.clone(),
            socket_path: self.socket.clone(),
            interval: args.interval,
            marker: args.marker.clone(),
            backend: args.backend,
            ephemeral: args.ephemeral,
            no_ipc: args.no_ipc,
        })
    }

    fn execute_devices(&self, json: bool, input_only: bool) -> Result<(), MicSwitchError> {
        let config = config::load(self.config.as_deref());
        let backend = audio::create_backend(config.backend)?;

        let devices = backend.devices()?;
        let current = backend.default_input_device().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read default input device");
            None
        });

        let classifier = PatternClassifier::new(&config.undesired);
        let rows = audio::device_rows(&devices, &classifier, current, input_only);

        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            println!("{}", audio::format_devices_table(&rows));
        }
        Ok(())
    }

    fn execute_status(&self, json: bool) -> Result<(), MicSwitchError> {
        let data = query_daemon(&self.socket_path(), &IpcQuery::Status)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else {
            let snapshot: StatusSnapshot = serde_json::from_value(data)?;
            print!("{}", output::format_status(&snapshot));
        }
        Ok(())
    }

    fn execute_select(&self, device: &str) -> Result<(), MicSwitchError> {
        if device.trim().is_empty() {
            return Err(MicSwitchError::InvalidArguments("Device cannot be empty".to_string()));
        }

        let data = query_daemon(&self.socket_path(), &IpcQuery::Select {
            device: device.to_string(),
        })?;
        let result: SelectionResult = serde_json::from_value(data)?;

        print!("{}", output::format_selection(&result));
        Ok(())
    }

    fn execute_evaluate(&self) -> Result<(), MicSwitchError> {
        let data = query_daemon(&self.socket_path(), &IpcQuery::Evaluate)?;
        let outcome: CycleOutcome = serde_json::from_value(data)?;

        println!("{}", output::describe_outcome(&outcome));
        Ok(())
    }
}

/// Sends `query` to the daemon, turning error responses into errors.
fn query_daemon(socket: &Path, query: &IpcQuery) -> Result<serde_json::Value, MicSwitchError> {
    match ipc::send_query(socket, query)? {
        IpcResponse::Success { data } => Ok(data),
        IpcResponse::Error { error } => Err(MicSwitchError::Command(error)),
    }
}
