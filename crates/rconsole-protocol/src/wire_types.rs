//! Low-level wire types and constants.
//!
//! This module defines:
//! - Event type tags carried in the first byte of every message.
//! - Message size limits and the terminator byte.
//! - The tag <-> wire byte mapping.
//!
//! The actual encode/decode logic lives in `event_codec`.

/// Maximum size of one message on the wire, terminator included.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Every message ends with this byte.
pub const TERMINATOR: u8 = 0;

/// Largest payload that fits in a message: the tag byte and the
/// terminator take the other two bytes.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - 2;

/// Wire tag bytes start at ASCII `'0'`.
const TAG_BASE: u8 = b'0';

/// Event type tags.
///
/// Values are stable: clients in the field depend on them. The `Strobo*`
/// family belongs to the profiler, which this build does not register, so
/// decoding one of those tags yields no event.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Noop = 0,
    Request = 1,
    LogMessage = 2,
    LogWarning = 3,
    LogError = 4,
    ConsoleCommand = 5,
    AutoCompleteList = 6,
    AutoCompleteListDone = 7,

    StroboGetThreads = 8,
    StroboThreadAdd = 9,
    StroboThreadDone = 10,
    StroboGetResult = 11,
    StroboResultStart = 12,
    StroboResultDone = 13,
    StroboStatStart = 14,
    StroboStatAdd = 15,
    StroboThreadInfoStart = 16,
    StroboThreadInfoAdd = 17,
    StroboSymStart = 18,
    StroboSymAdd = 19,
    StroboCallstackStart = 20,
    StroboCallstackAdd = 21,

    GameplayEvent = 22,

    StroboFrameInfoStart = 23,
    StroboFrameInfoAdd = 24,
}

impl EventType {
    /// Every tag in the enumeration, in value order.
    pub const ALL: [EventType; 25] = [
        EventType::Noop,
        EventType::Request,
        EventType::LogMessage,
        EventType::LogWarning,
        EventType::LogError,
        EventType::ConsoleCommand,
        EventType::AutoCompleteList,
        EventType::AutoCompleteListDone,
        EventType::StroboGetThreads,
        EventType::StroboThreadAdd,
        EventType::StroboThreadDone,
        EventType::StroboGetResult,
        EventType::StroboResultStart,
        EventType::StroboResultDone,
        EventType::StroboStatStart,
        EventType::StroboStatAdd,
        EventType::StroboThreadInfoStart,
        EventType::StroboThreadInfoAdd,
        EventType::StroboSymStart,
        EventType::StroboSymAdd,
        EventType::StroboCallstackStart,
        EventType::StroboCallstackAdd,
        EventType::GameplayEvent,
        EventType::StroboFrameInfoStart,
        EventType::StroboFrameInfoAdd,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(usize::from(v)).copied()
    }

    /// Whether this build can encode and decode the tag.
    pub fn is_registered(self) -> bool {
        matches!(
            self,
            EventType::Noop
                | EventType::Request
                | EventType::LogMessage
                | EventType::LogWarning
                | EventType::LogError
                | EventType::ConsoleCommand
                | EventType::AutoCompleteList
                | EventType::AutoCompleteListDone
                | EventType::GameplayEvent
        )
    }

    /// Byte written at the start of a message for this tag.
    ///
    /// `'0' + value`. Tags 0..=9 land on the ASCII digits; higher tags
    /// continue past `'9'` (`':'`, `';'`, ...), so every tag keeps its own byte.
    pub fn to_wire(self) -> u8 {
        TAG_BASE + self as u8
    }

    /// Inverse of [`EventType::to_wire`].
    pub fn from_wire(byte: u8) -> Option<Self> {
        byte.checked_sub(TAG_BASE).and_then(Self::from_u8)
    }
}
