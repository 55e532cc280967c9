//! rconsole-protocol
//!
//! Wire-level encoding/decoding for the remote console.
//!
//! This crate turns [`Event`]s into NUL-terminated byte messages and back.
//! It knows nothing about sockets; the server and client provide the
//! transport.
//!
//! - [`wire_types`]  : event tags, size limits
//! - [`event`]       : the `Event` value type
//! - [`event_codec`] : framing encode/decode

pub mod wire_types;
pub mod event;
pub mod event_codec;

pub use event::Event;
pub use event_codec::{create_event_from_buffer, encode, try_decode, write_to_buffer, ProtocolError};
pub use wire_types::{EventType, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE, TERMINATOR};
