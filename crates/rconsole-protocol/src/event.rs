//! Remote console events.
//!
//! One variant per registered [`EventType`]. Events are plain values:
//! cloning is how a single log line fans out to every connected client.

use crate::wire_types::{EventType, TERMINATOR};

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// Heartbeat / acknowledgement.
    Noop,
    /// Server asks the client for its next event.
    Request,
    LogMessage(String),
    LogWarning(String),
    LogError(String),
    /// A command line typed on the remote side.
    ConsoleCommand(String),
    /// One autocomplete candidate.
    AutoCompleteList(String),
    /// All autocomplete candidates have been sent.
    AutoCompleteListDone,
    GameplayEvent(String),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Noop => EventType::Noop,
            Event::Request => EventType::Request,
            Event::LogMessage(_) => EventType::LogMessage,
            Event::LogWarning(_) => EventType::LogWarning,
            Event::LogError(_) => EventType::LogError,
            Event::ConsoleCommand(_) => EventType::ConsoleCommand,
            Event::AutoCompleteList(_) => EventType::AutoCompleteList,
            Event::AutoCompleteListDone => EventType::AutoCompleteListDone,
            Event::GameplayEvent(_) => EventType::GameplayEvent,
        }
    }

    /// String payload, if this variant carries one.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Event::LogMessage(s)
            | Event::LogWarning(s)
            | Event::LogError(s)
            | Event::ConsoleCommand(s)
            | Event::AutoCompleteList(s)
            | Event::GameplayEvent(s) => Some(s),
            Event::Noop | Event::Request | Event::AutoCompleteListDone => None,
        }
    }

    /// Copy the payload (not the tag) into `buf`.
    ///
    /// Strings longer than `buf` are truncated without complaint. Returns the
    /// number of bytes written.
    pub fn write_payload(&self, buf: &mut [u8]) -> usize {
        match self.payload() {
            Some(s) => {
                let n = s.len().min(buf.len());
                buf[..n].copy_from_slice(&s.as_bytes()[..n]);
                n
            }
            None => 0,
        }
    }

    /// Build an event of type `ty` from payload bytes.
    ///
    /// String payloads end at the first NUL or at the end of `bytes`,
    /// whichever comes first. Returns `None` for tags this build does not
    /// register.
    pub fn from_payload(ty: EventType, bytes: &[u8]) -> Option<Event> {
        let text = || {
            let end = bytes
                .iter()
                .position(|&b| b == TERMINATOR)
                .unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        };

        let event = match ty {
            EventType::Noop => Event::Noop,
            EventType::Request => Event::Request,
            EventType::LogMessage => Event::LogMessage(text()),
            EventType::LogWarning => Event::LogWarning(text()),
            EventType::LogError => Event::LogError(text()),
            EventType::ConsoleCommand => Event::ConsoleCommand(text()),
            EventType::AutoCompleteList => Event::AutoCompleteList(text()),
            EventType::AutoCompleteListDone => Event::AutoCompleteListDone,
            EventType::GameplayEvent => Event::GameplayEvent(text()),
            _ => return None,
        };
        Some(event)
    }
}
