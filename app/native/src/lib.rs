//! micswitch - default input device arbitration.
//!
//! Keeps a wireless headset's microphone from remaining the system default
//! input device by steering the default back to a user-chosen device, or to
//! the first safe fallback.
//!
//! # Modules
//!
//! - [`audio`] - Audio subsystem backends, the resilient gateway and device classification
//! - [`arbiter`] - The arbitration cycle and its single worker task
//! - [`preferences`] - Preferred device persistence
//! - [`ipc`] - Control socket between the CLI and the daemon
//! - [`daemon`] - Process wiring for `micswitch run`
//! - [`cli`] - Command-line interface

pub mod arbiter;
pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod platform;
pub mod preferences;
