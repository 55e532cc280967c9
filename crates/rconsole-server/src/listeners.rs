//! Named listeners for commands arriving from remote clients.
//!
//! Dispatch walks a snapshot of the registry with the lock released, so a
//! listener may register or unregister (itself included) from inside a
//! callback. A listener removed mid-dispatch gets no further calls.

use std::sync::{Arc, Mutex, MutexGuard};

use rconsole_protocol::Event;

/// Receives remote commands on the host tick thread.
pub trait RemoteConsoleListener: Send + Sync {
    fn on_console_command(&self, _command: &str) {}

    fn on_gameplay_command(&self, _command: &str) {}
}

type Entry = (String, Arc<dyn RemoteConsoleListener>);

/// Cloneable handle to one listener set.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` under `name`, replacing any listener of that name.
    pub fn register(&self, listener: Arc<dyn RemoteConsoleListener>, name: &str) {
        let mut entries = self.lock();
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = listener,
            None => entries.push((name.to_string(), listener)),
        }
    }

    pub fn unregister(&self, name: &str) {
        self.lock().retain(|(n, _)| n != name);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Route one event to every listener. Only console commands and
    /// gameplay events have a callback; everything else is ignored.
    pub fn dispatch(&self, event: &Event) {
        if !matches!(event, Event::ConsoleCommand(_) | Event::GameplayEvent(_)) {
            return;
        }

        let snapshot: Vec<Entry> = self.lock().clone();
        for (name, listener) in snapshot {
            if !self.contains(&name, &listener) {
                continue;
            }
            match event {
                Event::ConsoleCommand(command) => listener.on_console_command(command),
                Event::GameplayEvent(command) => listener.on_gameplay_command(command),
                _ => {}
            }
        }
    }

    fn contains(&self, name: &str, listener: &Arc<dyn RemoteConsoleListener>) -> bool {
        let wanted = Arc::as_ptr(listener) as *const ();
        self.lock()
            .iter()
            .any(|(n, l)| n == name && Arc::as_ptr(l) as *const () == wanted)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
