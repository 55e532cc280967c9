//! Demo host for the remote console.
//!
//! Stands in for a game: owns a console variable registry and a level
//! list, ticks the remote console at a fixed rate and answers a handful of
//! commands sent by remote clients.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use rconsole_server::config::{ALLOWED_ADDRESSES_CVAR, ENABLE_CVAR, PORT_CVAR};
use rconsole_server::{
    CVarRegistry, CVarValue, Config, Console, RemoteConsole, RemoteConsoleListener, RemoteLogSink,
    StaticLevels,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rconsole-host")]
#[command(about = "Host process exposing a remote console")]
struct Cli {
    /// Base listen port (overrides RCONSOLE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Comma-separated allow-list (overrides RCONSOLE_ALLOWED)
    #[arg(short, long)]
    allow: Option<String>,

    /// Tick period in milliseconds (overrides RCONSOLE_TICK_MS)
    #[arg(short, long)]
    tick_ms: Option<u64>,

    /// Run as an editor host (remote console stays off)
    #[arg(long)]
    editor: bool,

    /// Level names offered for `map` autocompletion
    #[arg(short, long = "level")]
    levels: Vec<String>,
}

/// Commands the demo host understands.
struct HostCommands {
    console: Arc<CVarRegistry>,
    log: RemoteLogSink,
    quit: Arc<AtomicBool>,
}

impl RemoteConsoleListener for HostCommands {
    fn on_console_command(&self, command: &str) {
        info!("Remote command: {}", command);

        let mut parts = command.trim().splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim);

        match (name, arg) {
            ("", _) => {}
            ("quit", _) => {
                self.log.add_log_message("Shutting down");
                self.quit.store(true, Ordering::SeqCst);
            }
            ("echo", text) => self.log.add_log_message(text.unwrap_or_default()),
            ("map", Some(level)) => self.log.add_log_message(format!("Loading level {}", level)),
            (name, None) => match self.console.get(name) {
                Some(value) => self.log.add_log_message(format_var(name, &value)),
                None => self.log.add_log_warning(format!("Unknown command: {}", name)),
            },
            (name, Some(text)) => match self.console.set_from_str(name, text) {
                Some(value) => self.log.add_log_message(format_var(name, &value)),
                None => self
                    .log
                    .add_log_error(format!("Cannot set {} to \"{}\"", name, text)),
            },
        }
    }

    fn on_gameplay_command(&self, command: &str) {
        info!("Remote gameplay event: {}", command);
    }
}

fn format_var(name: &str, value: &CVarValue) -> String {
    match value {
        CVarValue::Int(v) => format!("{} = {}", name, v),
        CVarValue::Str(s) => format!("{} = \"{}\"", name, s),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(allow) = cli.allow {
        config.allowed_addresses = allow;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }

    let console = Arc::new(CVarRegistry::new());
    console.register_int("sv_gravity", -10, "World gravity");
    console.register_string("sv_map", "", "Current level");

    let levels = Arc::new(StaticLevels::new(cli.levels));
    let mut remote = RemoteConsole::new(console.clone(), levels, config.host_options(cli.editor))?;
    remote.register_console_variables();

    // Command-line values land after registration, as they would in a game.
    console.set_int(ENABLE_CVAR, i32::from(config.enabled));
    console.set_string(ALLOWED_ADDRESSES_CVAR, &config.allowed_addresses);
    console.set_int(PORT_CVAR, i32::from(config.port));

    let quit = Arc::new(AtomicBool::new(false));
    remote.register_listener(
        Arc::new(HostCommands {
            console: console.clone(),
            log: remote.log_sink(),
            quit: quit.clone(),
        }),
        "host",
    );

    info!(
        "Starting rconsole-host (port = {}, tick = {}ms, editor = {})",
        config.port, config.tick_ms, cli.editor
    );

    let tick = Duration::from_millis(config.tick_ms);
    while !quit.load(Ordering::SeqCst) {
        remote.update();
        thread::sleep(tick);
    }

    // Let the farewell line reach connected clients.
    thread::sleep(tick * 4);
    remote.unregister_listener("host");
    remote.stop();
    remote.unregister_console_variables();
    info!("rconsole-host exited");
    Ok(())
}
