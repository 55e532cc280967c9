// Shared helpers for the integration tests: free port ranges and a
// scripted blocking client that speaks the NUL-framed protocol.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rconsole_protocol::{create_event_from_buffer, encode, Event, TERMINATOR};

static NEXT_RANGE: AtomicU16 = AtomicU16::new(0);

/// Bind eight consecutive ports on all interfaces and keep them bound.
///
/// Ranges are 16-aligned and never handed out twice in one process, so
/// parallel tests do not collide.
pub fn occupy_port_range() -> (u16, Vec<TcpListener>) {
    loop {
        let slot = NEXT_RANGE.fetch_add(1, Ordering::SeqCst);
        assert!(slot < 2000, "no free port range found");
        let base = 24000 + slot * 16;

        let held: Vec<TcpListener> = (base..base + 8)
            .map_while(|port| TcpListener::bind(("0.0.0.0", port)).ok())
            .collect();
        if held.len() == 8 {
            return (base, held);
        }
    }
}

/// A base port with seven free ports above it.
pub fn free_base_port() -> u16 {
    occupy_port_range().0
}

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

pub struct TestClient {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl TestClient {
    pub fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        TestClient {
            stream,
            pending: Vec::new(),
        }
    }

    /// Next message from the server. EOF and socket errors are `Err`.
    pub fn try_recv(&mut self) -> io::Result<Option<Event>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == TERMINATOR) {
                let frame: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(create_event_from_buffer(&frame));
            }

            let mut chunk = [0u8; 1024];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn recv(&mut self) -> Option<Event> {
        self.try_recv().expect("recv from server")
    }

    pub fn send(&mut self, event: &Event) {
        self.stream.write_all(&encode(event)).expect("send to server");
    }

    /// Write bytes as-is, framed or not.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("send to server");
    }

    /// Answer everything with `Noop` until an event matching `pred` arrives.
    /// The matching event is returned unanswered.
    pub fn drive_until(&mut self, pred: impl Fn(&Event) -> bool) -> Event {
        for _ in 0..100_000 {
            match self.recv() {
                Some(event) if pred(&event) => return event,
                _ => self.send(&Event::Noop),
            }
        }
        panic!("server never sent the expected event");
    }
}
