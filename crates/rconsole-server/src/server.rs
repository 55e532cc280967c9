//! TCP listener and client table.
//!
//! This module:
//! - Binds the base port from `log_RemoteConsolePort`, scanning upward
//!   when it is taken.
//! - Accepts new TCP connections and runs them through the allow-list.
//! - Assigns each accepted connection a `ClientId` and spawns its session.
//! - Fans outbound events out to every session and collects inbound ones
//!   for the host tick.
//!
//! The per-client request/response loop lives in `client`.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rconsole_protocol::Event;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::ClientSession;
use crate::config::{DEFAULT_PORT, PORT_CVAR};
use crate::console::{Console, LevelSystem};
use crate::error::ServerError;
use crate::policy;
use crate::types::{ClientHandle, ClientId, ClientTable, InboundRx, InboundTx};

/// Ports tried: `base..base + BIND_ATTEMPTS`.
pub const BIND_ATTEMPTS: u16 = 8;

pub const LISTEN_BACKLOG: u32 = 8;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// State shared between the server, its accept loop and every session.
///
/// Never log while holding `clients`: log sinks may feed back into
/// [`RemoteServer::add_event`].
pub(crate) struct Shared {
    clients: Mutex<ClientTable>,
    inbound_tx: InboundTx,
    inbound_rx: Mutex<InboundRx>,
    accepting: AtomicBool,
    pub(crate) console: Arc<dyn Console>,
    pub(crate) levels: Arc<dyn LevelSystem>,
}

impl Shared {
    fn lock_clients(&self) -> MutexGuard<'_, ClientTable> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an event received from a client. Heartbeats and undecodable
    /// messages are dropped here.
    pub(crate) fn read_buffer(&self, event: Option<Event>) {
        match event {
            None | Some(Event::Noop) => {}
            Some(event) => {
                // `inbound_rx` lives as long as `self`, so this cannot fail.
                let _ = self.inbound_tx.send(event);
            }
        }
    }

    /// Session termination hook.
    pub(crate) fn remove_client(&self, id: ClientId) {
        let remaining = {
            let mut clients = self.lock_clients();
            clients.remove(&id);
            clients.len()
        };
        debug!(client = id.0, remaining, "Client removed from table");
    }
}

struct AcceptLoop {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl AcceptLoop {
    /// The listener is dropped when the task ends.
    fn is_open(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Remote console server.
///
/// `start_server`/`stop_server` must run inside a tokio runtime. The queue
/// primitives (`add_event`, `get_events`, `read_buffer`) are synchronous and
/// callable from any thread.
pub struct RemoteServer {
    shared: Arc<Shared>,
    bind_ip: IpAddr,
    accept_loop: Mutex<Option<AcceptLoop>>,
}

impl RemoteServer {
    pub fn new(console: Arc<dyn Console>, levels: Arc<dyn LevelSystem>, bind_ip: IpAddr) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        RemoteServer {
            shared: Arc::new(Shared {
                clients: Mutex::new(ClientTable::new()),
                inbound_tx,
                inbound_rx: Mutex::new(inbound_rx),
                accepting: AtomicBool::new(false),
                console,
                levels,
            }),
            bind_ip,
            accept_loop: Mutex::new(None),
        }
    }

    /// (Re)start listening. Any previous run is stopped first.
    ///
    /// Returns the bound address; the port may be up to
    /// `BIND_ATTEMPTS - 1` above the configured base.
    pub async fn start_server(&self) -> Result<SocketAddr, ServerError> {
        self.stop_server().await;
        self.shared.accepting.store(true, Ordering::SeqCst);

        let base = configured_port(self.shared.console.as_ref());
        let listener = match bind_listener(self.bind_ip, base) {
            Ok(listener) => listener,
            Err(e) => {
                self.shared.accepting.store(false, Ordering::SeqCst);
                error!("Remote console failed to start: {}", e);
                return Err(e);
            }
        };
        let local_addr = listener.local_addr()?;
        info!(port = local_addr.port(), "Remote console listening on {}", local_addr);

        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(accept_loop(listener, shared, stop_rx));

        *self.lock_accept_loop() = Some(AcceptLoop {
            stop: stop_tx,
            task,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop accepting, close the listening socket, stop every session and
    /// wait until all of them have left the client table.
    ///
    /// Calling this when already stopped does nothing.
    pub async fn stop_server(&self) {
        self.shared.accepting.store(false, Ordering::SeqCst);

        let accept = self.lock_accept_loop().take();
        if let Some(accept) = accept {
            let _ = accept.stop.send(());
            let _ = accept.task.await;
            info!(port = accept.local_addr.port(), "Remote console stopped listening");
        }

        let sessions: Vec<JoinHandle<()>> = {
            let mut clients = self.shared.lock_clients();
            clients
                .values_mut()
                .filter_map(|client| {
                    if let Some(stop) = client.stop.take() {
                        let _ = stop.send(());
                    }
                    client.task.take()
                })
                .collect()
        };

        if !sessions.is_empty() {
            debug!(count = sessions.len(), "Waiting for remote console sessions to exit");
        }
        for session in sessions {
            if let Err(e) = session.await {
                warn!("Remote console session task failed: {}", e);
            }
        }

        // A session that panicked never ran its removal hook.
        self.shared.lock_clients().clear();
    }

    /// Queue a copy of `event` for every connected client.
    pub fn add_event(&self, event: Event) {
        let clients = self.shared.lock_clients();
        for client in clients.values() {
            let _ = client.outbound.send(event.clone());
        }
    }

    /// Move every event received since the last call into `out`.
    pub fn get_events(&self, out: &mut Vec<Event>) {
        let mut inbound = self.shared.inbound_rx.lock().unwrap_or_else(|e| e.into_inner());
        while let Ok(event) = inbound.try_recv() {
            out.push(event);
        }
    }

    /// Queue an event as if a client had sent it.
    pub fn read_buffer(&self, event: Option<Event>) {
        self.shared.read_buffer(event);
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_accept_loop()
            .as_ref()
            .filter(|a| a.is_open())
            .map(|a| a.local_addr)
    }

    /// False once the accept loop has exited, even before `stop_server`.
    pub fn is_listening(&self) -> bool {
        self.lock_accept_loop().as_ref().is_some_and(AcceptLoop::is_open)
    }

    pub fn client_count(&self) -> usize {
        self.shared.lock_clients().len()
    }

    fn lock_accept_loop(&self) -> MutexGuard<'_, Option<AcceptLoop>> {
        self.accept_loop.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn configured_port(console: &dyn Console) -> u16 {
    match console.get_int(PORT_CVAR) {
        Some(v) => u16::try_from(v).unwrap_or_else(|_| {
            warn!("{} = {} is not a valid port, using {}", PORT_CVAR, v, DEFAULT_PORT);
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

/// Bind the first free port in `base..base + BIND_ATTEMPTS` and listen on it.
fn bind_listener(ip: IpAddr, base: u16) -> Result<TcpListener, ServerError> {
    let last = base.saturating_add(BIND_ATTEMPTS - 1);

    for port in base..=last {
        let addr = SocketAddr::new(ip, port);
        let socket = match ip {
            IpAddr::V4(_) => TcpSocket::new_v4()?,
            IpAddr::V6(_) => TcpSocket::new_v6()?,
        };
        #[cfg(unix)]
        socket.set_reuseaddr(true)?;

        match socket.bind(addr) {
            Ok(()) => {
                return socket
                    .listen(LISTEN_BACKLOG)
                    .map_err(|source| ServerError::Listen { port, source });
            }
            Err(e) => {
                debug!(port, error = %e, "Remote console port unavailable");
            }
        }
    }

    Err(ServerError::BindExhausted { base, last })
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, mut stop: oneshot::Receiver<()>) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut stop => break,
            res = listener.accept() => match res {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Remote console accept failed: {}", e);
                    break;
                }
            },
        };

        if !shared.accepting.load(Ordering::SeqCst) {
            break;
        }

        if !policy::is_remote_allowed_to_connect(Some(shared.console.as_ref()), peer).await {
            drop(stream);
            continue;
        }

        spawn_session(&shared, stream, peer);
    }

    debug!("Remote console accept loop exited");
}

fn spawn_session(shared: &Arc<Shared>, stream: TcpStream, peer: SocketAddr) {
    let id = next_client_id();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel();
    let session = ClientSession::new(id, stream, peer, Arc::clone(shared), out_rx);

    {
        // Insert before the session can run its removal hook.
        let mut clients = shared.lock_clients();
        let task = tokio::spawn(session.run(stop_rx));
        clients.insert(
            id,
            ClientHandle {
                outbound: out_tx,
                stop: Some(stop_tx),
                task: Some(task),
            },
        );
    }

    info!(client = id.0, %peer, "Remote console client connected");
}
