//! Platform helpers.
//!
//! - [`command`] - Locating external helper binaries
//! - [`path`] - Path expansion and well-known directories
//! - [`thread`] - Named thread spawning

pub mod command;
pub mod path;
pub mod thread;

pub use command::{LocateError, resolve_binary};
pub use thread::spawn_named_thread;
