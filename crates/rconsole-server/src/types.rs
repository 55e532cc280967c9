//! Shared types for the remote console server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between sessions and the server
//! - `ClientHandle`: what the client table keeps per session

use std::collections::HashMap;

use rconsole_protocol::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Identifier for a connected client.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Events waiting to be delivered to one client.
pub type OutboundTx = mpsc::UnboundedSender<Event>;
pub type OutboundRx = mpsc::UnboundedReceiver<Event>;

/// Events received from any client, waiting for the next tick.
pub type InboundTx = mpsc::UnboundedSender<Event>;
pub type InboundRx = mpsc::UnboundedReceiver<Event>;

/// Table entry for a live session.
#[derive(Debug)]
pub struct ClientHandle {
    pub outbound: OutboundTx,

    /// Firing this makes the session drop its socket.
    pub stop: Option<oneshot::Sender<()>>,

    pub task: Option<JoinHandle<()>>,
}

/// Registry of connected clients.
pub type ClientTable = HashMap<ClientId, ClientHandle>;
