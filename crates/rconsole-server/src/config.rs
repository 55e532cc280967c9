//! Configuration for the remote console.
//!
//! Two layers:
//!
//! - Console variables, read by the server and the facade at runtime:
//!   `log_EnableRemoteConsole`, `log_RemoteConsoleAllowedAddresses`,
//!   `log_RemoteConsolePort`.
//! - Host startup settings, read once from the environment by the host
//!   binary:
//!   - `RCONSOLE_ENABLED`   (default: "1")
//!   - `RCONSOLE_ALLOWED`   (default: "", meaning 127.0.0.1 only)
//!   - `RCONSOLE_PORT`      (default: "4600")
//!   - `RCONSOLE_BIND_ADDR` (default: "0.0.0.0")
//!   - `RCONSOLE_TICK_MS`   (default: "33")

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Master enable switch (int, non-zero = on).
pub const ENABLE_CVAR: &str = "log_EnableRemoteConsole";
/// Comma-separated host/IP allow-list (string).
pub const ALLOWED_ADDRESSES_CVAR: &str = "log_RemoteConsoleAllowedAddresses";
/// Base listen port (int).
pub const PORT_CVAR: &str = "log_RemoteConsolePort";

pub const DEFAULT_ENABLED: i32 = 1;
pub const DEFAULT_PORT: u16 = 4600;
/// Used when the allow-list is empty.
pub const DEFAULT_ALLOWED_ADDRESS: &str = "127.0.0.1";

/// How the facade is embedded in its host.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Editor hosts never run the remote console.
    pub is_editor: bool,

    /// Interface the listening socket binds to.
    pub bind_addr: IpAddr,
}

impl Default for HostOptions {
    fn default() -> Self {
        HostOptions {
            is_editor: false,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

/// Host startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial value of `log_EnableRemoteConsole`.
    pub enabled: bool,

    /// Initial value of `log_RemoteConsoleAllowedAddresses`.
    pub allowed_addresses: String,

    /// Initial value of `log_RemoteConsolePort`.
    pub port: u16,

    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: IpAddr,

    /// Host tick period in milliseconds.
    pub tick_ms: u64,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let enabled = read_env_or_default("RCONSOLE_ENABLED", DEFAULT_ENABLED)? != 0;
        let allowed_addresses = env::var("RCONSOLE_ALLOWED").unwrap_or_default();
        let port = read_env_or_default("RCONSOLE_PORT", DEFAULT_PORT)?;
        let bind_addr = read_env_or_default("RCONSOLE_BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let tick_ms = read_env_or_default("RCONSOLE_TICK_MS", 33u64)?;

        Ok(Config {
            enabled,
            allowed_addresses,
            port,
            bind_addr,
            tick_ms,
        })
    }

    pub fn host_options(&self, is_editor: bool) -> HostOptions {
        HostOptions {
            is_editor,
            bind_addr: self.bind_addr,
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
