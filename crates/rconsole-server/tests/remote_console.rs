// End-to-end tests for the facade: tick-driven start/stop, command dispatch
// to listeners and log fan-out to connected clients.

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::thread;

use common::{free_base_port, wait_for, TestClient};
use rconsole_protocol::Event;
use rconsole_server::config::{ENABLE_CVAR, PORT_CVAR};
use rconsole_server::{
    CVarRegistry, Console, HostOptions, RemoteConsole, RemoteConsoleListener, StaticLevels,
};

#[derive(Default)]
struct Recorder {
    console: Mutex<Vec<String>>,
    gameplay: Mutex<Vec<String>>,
}

impl RemoteConsoleListener for Recorder {
    fn on_console_command(&self, command: &str) {
        self.console.lock().unwrap().push(command.to_string());
    }

    fn on_gameplay_command(&self, command: &str) {
        self.gameplay.lock().unwrap().push(command.to_string());
    }
}

fn options(is_editor: bool) -> HostOptions {
    HostOptions {
        is_editor,
        bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    }
}

/// A facade with its variables registered and the port set to `port`.
fn facade(port: u16, is_editor: bool) -> (Arc<CVarRegistry>, RemoteConsole) {
    let console = Arc::new(CVarRegistry::new());
    let levels = Arc::new(StaticLevels::new(["levels/forest"]));
    let mut remote = RemoteConsole::new(console.clone(), levels, options(is_editor)).unwrap();
    remote.register_console_variables();
    console.set_int(PORT_CVAR, i32::from(port));
    (console, remote)
}

/// A started facade: the first tick after registration is skipped.
fn started_facade() -> (Arc<CVarRegistry>, RemoteConsole, u16) {
    let port = free_base_port();
    let (console, mut remote) = facade(port, false);
    remote.update();
    remote.update();
    assert!(remote.is_started());
    (console, remote, port)
}

#[test]
fn first_tick_after_registration_is_skipped() {
    let port = free_base_port();
    let (_console, mut remote) = facade(port, false);

    remote.update();
    assert!(!remote.is_started());

    remote.update();
    assert!(remote.is_started());
    assert_eq!(remote.local_addr().map(|a| a.port()), Some(port));
}

#[test]
fn console_command_is_dispatched_exactly_once() {
    let (_console, mut remote, port) = started_facade();
    let recorder = Arc::new(Recorder::default());
    remote.register_listener(recorder.clone(), "recorder");

    let mut client = TestClient::connect(port);
    assert_eq!(client.recv(), Some(Event::Request));
    client.send(&Event::ConsoleCommand("god".into()));
    assert!(matches!(client.recv(), Some(Event::AutoCompleteList(_))));

    remote.update();
    remote.update();

    assert_eq!(*recorder.console.lock().unwrap(), vec!["god"]);
    assert!(recorder.gameplay.lock().unwrap().is_empty());
}

#[test]
fn gameplay_event_goes_to_gameplay_callback() {
    let (_console, mut remote, port) = started_facade();
    let recorder = Arc::new(Recorder::default());
    remote.register_listener(recorder.clone(), "recorder");

    let mut client = TestClient::connect(port);
    assert_eq!(client.recv(), Some(Event::Request));
    client.send(&Event::GameplayEvent("spawn wave".into()));
    client.recv();

    remote.update();

    assert_eq!(*recorder.gameplay.lock().unwrap(), vec!["spawn wave"]);
    assert!(recorder.console.lock().unwrap().is_empty());
}

#[test]
fn every_listener_hears_the_command() {
    let (_console, mut remote, port) = started_facade();
    let a = Arc::new(Recorder::default());
    let b = Arc::new(Recorder::default());
    remote.register_listener(a.clone(), "a");
    remote.register_listener(b.clone(), "b");

    let mut client = TestClient::connect(port);
    assert_eq!(client.recv(), Some(Event::Request));
    client.send(&Event::ConsoleCommand("quit".into()));
    client.recv();

    remote.update();

    assert_eq!(*a.console.lock().unwrap(), vec!["quit"]);
    assert_eq!(*b.console.lock().unwrap(), vec!["quit"]);
}

#[test]
fn log_lines_reach_connected_clients() {
    let (_console, remote, port) = started_facade();

    let mut client = TestClient::connect(port);
    assert!(wait_for(|| remote.client_count() == 1));

    remote.add_log_warning("careful");
    let got = client.drive_until(|e| matches!(e, Event::LogWarning(_)));
    assert_eq!(got, Event::LogWarning("careful".into()));
    client.send(&Event::Noop);

    let sink = remote.log_sink();
    thread::spawn(move || sink.add_log_error("from another thread"))
        .join()
        .unwrap();
    let got = client.drive_until(|e| matches!(e, Event::LogError(_)));
    assert_eq!(got, Event::LogError("from another thread".into()));
    client.send(&Event::Noop);
}

#[test]
fn logs_are_dropped_while_stopped() {
    let port = free_base_port();
    let (_console, remote) = facade(port, false);

    remote.add_log_message("nobody home");
    remote.log_sink().add_log_error("still nobody");

    assert!(!remote.is_started());
    assert_eq!(remote.client_count(), 0);
}

#[test]
fn editor_host_never_starts() {
    let port = free_base_port();
    let (console, mut remote) = facade(port, true);

    for _ in 0..3 {
        remote.update();
    }

    assert!(!remote.is_started());
    assert_eq!(console.get_int(ENABLE_CVAR), Some(0));
}

#[test]
fn disabling_stops_the_server() {
    let (console, mut remote, _port) = started_facade();

    console.set_int(ENABLE_CVAR, 0);
    remote.update();

    assert!(!remote.is_started());
    assert_eq!(remote.local_addr(), None);
}

#[test]
fn port_change_restarts_on_the_following_tick() {
    let (console, mut remote, _port) = started_facade();
    let new_port = free_base_port();

    console.set_int(PORT_CVAR, i32::from(new_port));
    remote.update();
    assert!(!remote.is_started());

    remote.update();
    assert!(remote.is_started());
    assert_eq!(remote.local_addr().map(|a| a.port()), Some(new_port));
}

#[test]
fn start_and_stop_are_idempotent() {
    let port = free_base_port();
    let (_console, mut remote) = facade(port, false);

    remote.stop();
    assert!(!remote.is_started());

    remote.start();
    let addr = remote.local_addr();
    assert!(addr.is_some());
    remote.start();
    assert_eq!(remote.local_addr(), addr);

    remote.stop();
    remote.stop();
    assert!(!remote.is_started());
    assert_eq!(remote.local_addr(), None);
}

#[test]
fn without_registered_variables_nothing_starts() {
    let console = Arc::new(CVarRegistry::new());
    let mut remote =
        RemoteConsole::new(console, Arc::new(StaticLevels::default()), options(false)).unwrap();

    remote.update();
    remote.update();

    assert!(!remote.is_started());
}

#[test]
fn unregistered_listener_is_not_called() {
    let (_console, mut remote, port) = started_facade();
    let recorder = Arc::new(Recorder::default());
    remote.register_listener(recorder.clone(), "recorder");
    remote.unregister_listener("recorder");

    let mut client = TestClient::connect(port);
    assert_eq!(client.recv(), Some(Event::Request));
    client.send(&Event::ConsoleCommand("god".into()));
    client.recv();

    remote.update();

    assert!(recorder.console.lock().unwrap().is_empty());
    assert!(remote.listeners().is_empty());
}

#[test]
fn start_before_registration_survives_the_first_ticks() {
    let console = Arc::new(CVarRegistry::new());
    let mut remote =
        RemoteConsole::new(console, Arc::new(StaticLevels::default()), options(false)).unwrap();

    // No port variable yet: binds the default range.
    remote.start();
    let addr = remote.local_addr();

    remote.register_console_variables();
    remote.update();
    remote.update();
    remote.update();

    assert!(remote.is_started());
    assert_eq!(remote.local_addr(), addr);
}
