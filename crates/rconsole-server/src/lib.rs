//! rconsole-server
//!
//! In-process remote console: lets an external client send console
//! commands to a running host and receive its log output.
//!
//! The host owns a [`RemoteConsole`], calls `update()` once per tick and
//! pushes log lines through it. Everything network-facing runs on the
//! facade's own tokio runtime, one task per connected client.

pub mod config;
pub mod console;
pub mod error;
pub mod listeners;
pub mod policy;
pub mod remote_console;
pub mod server;
pub mod types;

// internal: the session loop is only driven by the server
mod client;

pub use client::{build_autocomplete_list, AUTOCOMPLETE_BATCH};
pub use config::{Config, HostOptions};
pub use console::{CVarRegistry, CVarValue, Console, LevelSystem, StaticLevels};
pub use error::ServerError;
pub use listeners::{ListenerRegistry, RemoteConsoleListener};
pub use remote_console::{RemoteConsole, RemoteLogSink};
pub use server::RemoteServer;
