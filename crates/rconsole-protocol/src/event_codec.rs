//! Encoding/decoding of remote console events.
//!
//! Framing model (single-message buffer):
//!
//! ```text
//! [0]      : tag byte ('0' + EventType value)
//! [1..n-1] : payload (string variants only, no NUL inside)
//! [n-1]    : NUL terminator
//! ```
//!
//! A message never exceeds `MAX_MESSAGE_SIZE` bytes, terminator included.
//! Longer string payloads are truncated on encode.
//!
//! The public decode entry point returns `Option`: an unknown tag or bad
//! framing means "nothing received", and callers carry on. `try_decode`
//! exposes the reason for logging.

use std::fmt;

use crate::event::Event;
use crate::wire_types::{EventType, MAX_MESSAGE_SIZE, TERMINATOR};

/// Why a buffer did not decode to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer than two bytes (tag + terminator).
    Truncated,
    /// The last byte is not NUL.
    MissingTerminator,
    /// The tag byte does not name any event type.
    UnknownEventType(u8),
    /// The tag is known but this build has no codec for it.
    UnregisteredEventType(EventType),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated => write!(f, "Buffer truncated"),
            ProtocolError::MissingTerminator => write!(f, "Message is not NUL-terminated"),
            ProtocolError::UnknownEventType(b) => write!(f, "Unknown event tag byte: {:#04x}", b),
            ProtocolError::UnregisteredEventType(t) => {
                write!(f, "Event type {:?} is not registered", t)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Decode one framed message.
///
/// `buf` must hold exactly one message, terminator included.
pub fn try_decode(buf: &[u8]) -> Result<Event, ProtocolError> {
    if buf.len() < 2 {
        return Err(ProtocolError::Truncated);
    }
    let (&last, body) = buf.split_last().ok_or(ProtocolError::Truncated)?;
    if last != TERMINATOR {
        return Err(ProtocolError::MissingTerminator);
    }

    let tag = body[0];
    let ty = EventType::from_wire(tag).ok_or(ProtocolError::UnknownEventType(tag))?;

    Event::from_payload(ty, &body[1..]).ok_or(ProtocolError::UnregisteredEventType(ty))
}

/// Decode one framed message, or `None` if it is not a valid event.
pub fn create_event_from_buffer(buf: &[u8]) -> Option<Event> {
    try_decode(buf).ok()
}

/// Write `event` as a framed message into `buf`.
///
/// The payload is truncated so that tag, payload and terminator fit in
/// `buf`. Returns the payload length; the message occupies
/// `payload_len + 2` bytes.
///
/// # Panics
///
/// If `buf` is shorter than two bytes (no room for tag and terminator).
pub fn write_to_buffer(event: &Event, buf: &mut [u8]) -> usize {
    assert!(
        buf.len() >= 2,
        "write_to_buffer needs at least 2 bytes for tag and terminator, got {}",
        buf.len()
    );
    let max_payload = buf.len() - 2;

    buf[0] = event.event_type().to_wire();
    let n = event.write_payload(&mut buf[1..1 + max_payload]);
    buf[1 + n] = TERMINATOR;
    n
}

/// Encode `event` into a freshly allocated framed message of at most
/// `MAX_MESSAGE_SIZE` bytes.
pub fn encode(event: &Event) -> Vec<u8> {
    let wanted = event.payload().map_or(0, str::len) + 2;
    let mut buf = vec![0u8; wanted.min(MAX_MESSAGE_SIZE)];
    let n = write_to_buffer(event, &mut buf);
    buf.truncate(n + 2);
    buf
}
