//! Interactive remote console client.
//!
//! Connects to a host, answers every server message as the protocol
//! requires and forwards lines typed on stdin as console commands. Log
//! output from the host is printed as it arrives.

use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use bytes::BytesMut;
use clap::Parser;
use rconsole_protocol::{create_event_from_buffer, encode, Event, TERMINATOR};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Pause before answering an idle `Request`, so an idle session does not spin.
const IDLE_REPLY_DELAY: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "rconsole-client")]
#[command(about = "Remote console client")]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4600")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Connecting to {}...", cli.server);
    let mut stream = TcpStream::connect(&cli.server).await?;
    stream.set_nodelay(true)?;
    info!("Connected. Type commands; 'exit' leaves.");

    // Blocking stdin reader feeding the async loop.
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if cmd_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut read_buffer = BytesMut::with_capacity(8192);
    let mut completions = 0usize;

    loop {
        let event = read_message(&mut stream, &mut read_buffer).await?;

        let reply = match event {
            Some(Event::Request) => match cmd_rx.try_recv() {
                Ok(line) if line.trim().eq_ignore_ascii_case("exit") => break,
                Ok(line) if !line.trim().is_empty() => Event::ConsoleCommand(line.trim().to_string()),
                Ok(_) => Event::Noop,
                Err(mpsc::error::TryRecvError::Empty) => {
                    tokio::time::sleep(IDLE_REPLY_DELAY).await;
                    Event::Noop
                }
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            },
            Some(Event::LogMessage(text)) => {
                println!("{}", text);
                Event::Noop
            }
            Some(Event::LogWarning(text)) => {
                println!("[warning] {}", text);
                Event::Noop
            }
            Some(Event::LogError(text)) => {
                println!("[error] {}", text);
                Event::Noop
            }
            Some(Event::AutoCompleteList(candidate)) => {
                debug!("Completion candidate: {}", candidate);
                completions += 1;
                Event::Noop
            }
            Some(Event::AutoCompleteListDone) => {
                info!("Received {} completion candidates", completions);
                Event::Noop
            }
            Some(Event::GameplayEvent(text)) => {
                println!("[gameplay] {}", text);
                Event::Noop
            }
            Some(other) => {
                warn!("Unexpected event from server: {:?}", other);
                Event::Noop
            }
            None => {
                warn!("Undecodable message from server");
                Event::Noop
            }
        };

        stream.write_all(&encode(&reply)).await?;
    }

    info!("Disconnecting");
    Ok(())
}

/// Read one NUL-terminated message and decode it.
async fn read_message(stream: &mut TcpStream, buffer: &mut BytesMut) -> Result<Option<Event>> {
    loop {
        if let Some(pos) = buffer.iter().position(|&b| b == TERMINATOR) {
            let frame = buffer.split_to(pos + 1);
            return Ok(create_event_from_buffer(&frame));
        }

        if stream.read_buf(buffer).await? == 0 {
            bail!("server closed the connection");
        }
    }
}
