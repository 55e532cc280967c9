//! Error types for the remote console server.
//!
//! None of these cross the facade: the accept loop and the sessions turn
//! them into log lines and stop.

use std::io;

use rconsole_protocol::EventType;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Every port in the scan range was taken.
    #[error("could not bind any port in {base}..={last}")]
    BindExhausted { base: u16, last: u16 },

    #[error("listen failed on port {port}: {source}")]
    Listen {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A message did not fit the receive buffer.
    #[error("message exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },

    /// An outbound event was acknowledged with something other than `Noop`.
    #[error("expected Noop ack, got {got:?}")]
    UnexpectedAck { got: Option<EventType> },
}
