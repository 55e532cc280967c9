//! Per-connection session.
//!
//! The server drives the conversation. Each round:
//!
//! 1. send `Request`, read the client's reply and queue it;
//! 2. send up to `AUTOCOMPLETE_BATCH` autocomplete candidates, reading an
//!    ack after each; once the backlog is empty send `AutoCompleteListDone`
//!    (once per connection);
//! 3. flush this client's outbound queue, requiring a `Noop` ack per event.
//!
//! Any socket error ends the session. So does a stop request from the
//! server, which drops the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use rconsole_protocol::{try_decode, write_to_buffer, Event, MAX_MESSAGE_SIZE, TERMINATOR};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::console::{Console, LevelSystem};
use crate::error::ServerError;
use crate::server::Shared;
use crate::types::{ClientId, OutboundRx};

/// Autocomplete candidates sent per round, so a long list cannot hold up
/// queued log output.
pub const AUTOCOMPLETE_BATCH: usize = 20;

pub(crate) struct ClientSession {
    id: ClientId,
    peer: SocketAddr,
    stream: TcpStream,
    shared: Arc<Shared>,
    outbound: OutboundRx,
    autocomplete: Vec<String>,
    autocomplete_done_sent: bool,
    send_buf: Vec<u8>,
    recv_buf: Vec<u8>,
}

impl ClientSession {
    pub(crate) fn new(
        id: ClientId,
        stream: TcpStream,
        peer: SocketAddr,
        shared: Arc<Shared>,
        outbound: OutboundRx,
    ) -> Self {
        ClientSession {
            id,
            peer,
            stream,
            shared,
            outbound,
            autocomplete: Vec::new(),
            autocomplete_done_sent: false,
            send_buf: vec![0u8; MAX_MESSAGE_SIZE],
            recv_buf: vec![0u8; MAX_MESSAGE_SIZE],
        }
    }

    /// Run until the connection fails or `stop` fires, then leave the
    /// client table.
    pub(crate) async fn run(mut self, stop: oneshot::Receiver<()>) {
        let id = self.id;
        let peer = self.peer;
        let shared = Arc::clone(&self.shared);

        self.autocomplete =
            build_autocomplete_list(shared.console.as_ref(), shared.levels.as_ref());
        debug!(
            client = id.0,
            candidates = self.autocomplete.len(),
            "Autocomplete list built"
        );

        let result = tokio::select! {
            res = self.exchange_loop() => res,
            _ = stop => Ok(()),
        };

        // Closes the socket.
        drop(self);

        match result {
            Ok(()) => info!(client = id.0, %peer, "Remote console client stopped"),
            Err(e) => info!(client = id.0, %peer, "Remote console client disconnected: {}", e),
        }

        shared.remove_client(id);
    }

    async fn exchange_loop(&mut self) -> Result<(), ServerError> {
        loop {
            self.send_event(&Event::Request).await?;
            let reply = self.recv_event().await?;
            self.shared.read_buffer(reply);

            for _ in 0..AUTOCOMPLETE_BATCH {
                let Some(candidate) = self.autocomplete.pop() else {
                    break;
                };
                self.send_event(&Event::AutoCompleteList(candidate)).await?;
                let ack = self.recv_event().await?;
                self.shared.read_buffer(ack);
            }

            if self.autocomplete.is_empty() && !self.autocomplete_done_sent {
                self.send_event(&Event::AutoCompleteListDone).await?;
                let ack = self.recv_event().await?;
                self.shared.read_buffer(ack);
                self.autocomplete_done_sent = true;
            }

            while let Some(event) = self.write_buffer() {
                self.send_event(&event).await?;
                match self.recv_event().await? {
                    Some(Event::Noop) => {}
                    other => {
                        return Err(ServerError::UnexpectedAck {
                            got: other.map(|e| e.event_type()),
                        })
                    }
                }
            }
        }
    }

    /// Next event queued for this client, if any.
    fn write_buffer(&mut self) -> Option<Event> {
        self.outbound.try_recv().ok()
    }

    async fn send_event(&mut self, event: &Event) -> Result<(), ServerError> {
        let len = write_to_buffer(event, &mut self.send_buf) + 2;
        self.stream.write_all(&self.send_buf[..len]).await?;
        Ok(())
    }

    /// Read until the last byte received is NUL and decode what arrived.
    ///
    /// `Ok(None)` means the message arrived but was not a known event.
    async fn recv_event(&mut self) -> Result<Option<Event>, ServerError> {
        let mut len = 0;
        loop {
            if len == self.recv_buf.len() {
                return Err(ServerError::MessageTooLarge {
                    limit: MAX_MESSAGE_SIZE,
                });
            }
            let n = self.stream.read(&mut self.recv_buf[len..]).await?;
            if n == 0 {
                return Err(ServerError::ConnectionClosed);
            }
            len += n;
            if self.recv_buf[len - 1] == TERMINATOR {
                break;
            }
        }

        match try_decode(&self.recv_buf[..len]) {
            Ok(event) => Ok(Some(event)),
            Err(e) => {
                debug!(client = self.id.0, "Ignoring undecodable message: {}", e);
                Ok(None)
            }
        }
    }
}

/// Sorted console variable names, then `map <level>` for every level with
/// its directory prefix stripped. Consumed from the back.
pub fn build_autocomplete_list(console: &dyn Console, levels: &dyn LevelSystem) -> Vec<String> {
    let mut list = console.variable_names();
    list.sort();

    for level in levels.level_names() {
        let name = level.rsplit(['/', '\\']).next().unwrap_or(level.as_str());
        list.push(format!("map {}", name));
    }
    list
}
