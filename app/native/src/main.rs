#![allow(clippy::multiple_crate_versions)]

//! micswitch - keeps a wireless headset microphone from staying the default
//! input device.
//!
//! With no arguments the binary runs the arbitration daemon; subcommands
//! inspect devices or talk to a running daemon.

fn main() {
    if let Err(err) = micswitch_lib::cli::run() {
        eprintln!("micswitch: {err}");
        std::process::exit(1);
    }
}
