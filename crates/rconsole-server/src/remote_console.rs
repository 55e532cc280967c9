//! The host-facing facade.
//!
//! `RemoteConsole` owns the server and a small tokio runtime for it. The
//! host calls [`RemoteConsole::update`] once per tick; that is where
//! configuration changes take effect and where remote commands reach the
//! registered listeners.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rconsole_protocol::Event;
use tokio::runtime::{self, Runtime};
use tracing::{debug, error, info};

use crate::config::{
    HostOptions, ALLOWED_ADDRESSES_CVAR, DEFAULT_ENABLED, DEFAULT_PORT, ENABLE_CVAR, PORT_CVAR,
};
use crate::console::{Console, LevelSystem};
use crate::error::ServerError;
use crate::listeners::{ListenerRegistry, RemoteConsoleListener};
use crate::server::RemoteServer;

/// Configuration as seen on the last tick.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedConfig {
    enabled: i32,
    allowed_addresses: String,
    port: i32,
}

impl CachedConfig {
    /// `None` until all three variables are registered.
    fn read(console: &dyn Console) -> Option<Self> {
        Some(CachedConfig {
            enabled: console.get_int(ENABLE_CVAR)?,
            allowed_addresses: console.get_string(ALLOWED_ADDRESSES_CVAR)?,
            port: console.get_int(PORT_CVAR)?,
        })
    }
}

/// Thread-safe handle for pushing log lines to remote clients.
///
/// Lines pushed while the remote console is stopped are dropped.
#[derive(Clone)]
pub struct RemoteLogSink {
    server: Arc<RemoteServer>,
    running: Arc<AtomicBool>,
}

impl RemoteLogSink {
    pub fn add_log_message(&self, text: impl Into<String>) {
        self.push(Event::LogMessage(text.into()));
    }

    pub fn add_log_warning(&self, text: impl Into<String>) {
        self.push(Event::LogWarning(text.into()));
    }

    pub fn add_log_error(&self, text: impl Into<String>) {
        self.push(Event::LogError(text.into()));
    }

    fn push(&self, event: Event) {
        if self.running.load(Ordering::SeqCst) {
            self.server.add_event(event);
        }
    }
}

/// Remote console facade for a host application.
///
/// Must be created, started, stopped and dropped from a plain host thread,
/// never from inside a tokio runtime: it blocks on its own runtime.
pub struct RemoteConsole {
    runtime: Runtime,
    server: Arc<RemoteServer>,
    console: Arc<dyn Console>,
    options: HostOptions,
    running: Arc<AtomicBool>,
    listeners: ListenerRegistry,
    cached: Option<CachedConfig>,
    /// Port variable value when the server was last started. `None` while
    /// running means the variable was not registered at start.
    started_port: Option<i32>,
    skip_next_config_check: bool,
    inbound: Vec<Event>,
}

impl RemoteConsole {
    pub fn new(
        console: Arc<dyn Console>,
        levels: Arc<dyn LevelSystem>,
        options: HostOptions,
    ) -> Result<Self, ServerError> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("rconsole")
            .enable_all()
            .build()?;
        let server = Arc::new(RemoteServer::new(Arc::clone(&console), levels, options.bind_addr));

        Ok(RemoteConsole {
            runtime,
            server,
            console,
            options,
            running: Arc::new(AtomicBool::new(false)),
            listeners: ListenerRegistry::new(),
            cached: None,
            started_port: None,
            skip_next_config_check: false,
            inbound: Vec::new(),
        })
    }

    /// Register the remote console variables with the console.
    ///
    /// The first tick afterwards leaves the server alone, so command-line
    /// overrides applied after registration win.
    pub fn register_console_variables(&mut self) {
        self.console.register_int(
            ENABLE_CVAR,
            DEFAULT_ENABLED,
            "Enables the remote console (0 = off, 1 = on)",
        );
        self.console.register_string(
            ALLOWED_ADDRESSES_CVAR,
            "",
            "Comma-separated hosts/IPs allowed to connect to the remote console. Empty means 127.0.0.1",
        );
        self.console.register_int(
            PORT_CVAR,
            i32::from(DEFAULT_PORT),
            "Base port of the remote console; the next 7 ports are tried if it is taken",
        );
        self.skip_next_config_check = true;
    }

    pub fn unregister_console_variables(&mut self) {
        self.console.unregister(ENABLE_CVAR);
        self.console.unregister(ALLOWED_ADDRESSES_CVAR);
        self.console.unregister(PORT_CVAR);
        self.cached = None;
    }

    pub fn start(&mut self) {
        if self.is_started() {
            return;
        }

        if let Err(e) = self.runtime.block_on(self.server.start_server()) {
            error!("Remote console could not start: {}", e);
        }
        self.started_port = self.console.get_int(PORT_CVAR);
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&mut self) {
        if !self.is_started() {
            return;
        }

        self.running.store(false, Ordering::SeqCst);
        self.runtime.block_on(self.server.stop_server());
        self.started_port = None;
    }

    pub fn is_started(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn add_log_message(&self, text: impl Into<String>) {
        self.log_sink().add_log_message(text);
    }

    pub fn add_log_warning(&self, text: impl Into<String>) {
        self.log_sink().add_log_warning(text);
    }

    pub fn add_log_error(&self, text: impl Into<String>) {
        self.log_sink().add_log_error(text);
    }

    pub fn log_sink(&self) -> RemoteLogSink {
        RemoteLogSink {
            server: Arc::clone(&self.server),
            running: Arc::clone(&self.running),
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn RemoteConsoleListener>, name: &str) {
        self.listeners.register(listener, name);
    }

    pub fn unregister_listener(&self, name: &str) {
        self.listeners.unregister(name);
    }

    /// The listener set, for listeners that need to unregister themselves.
    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    /// Address the server is listening on, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.server.client_count()
    }

    /// Per-tick work: apply configuration, then dispatch remote commands.
    pub fn update(&mut self) {
        self.apply_config();

        let mut events = std::mem::take(&mut self.inbound);
        self.server.get_events(&mut events);
        for event in events.drain(..) {
            self.listeners.dispatch(&event);
        }
        self.inbound = events;
    }

    fn apply_config(&mut self) {
        if self.options.is_editor {
            self.console.set_int(ENABLE_CVAR, 0);
        }

        let Some(config) = CachedConfig::read(self.console.as_ref()) else {
            return;
        };
        if let Some(previous) = self.cached.replace(config.clone()) {
            if previous.allowed_addresses != config.allowed_addresses {
                info!(
                    allowed = %config.allowed_addresses,
                    "Remote console allow-list changed; applies to new connections"
                );
            } else if previous != config {
                debug!(?config, "Remote console configuration changed");
            }
        }

        if self.skip_next_config_check {
            self.skip_next_config_check = false;
            return;
        }

        let enabled = config.enabled != 0;
        if self.is_started() && self.started_port.is_none() {
            self.started_port = Some(config.port);
        }

        if enabled && !self.is_started() {
            self.start();
        } else if self.is_started() && (!enabled || self.started_port != Some(config.port)) {
            if enabled {
                info!(port = config.port, "Remote console port changed, restarting");
            }
            self.stop();
        }
    }
}

impl Drop for RemoteConsole {
    fn drop(&mut self) {
        self.stop();
    }
}
