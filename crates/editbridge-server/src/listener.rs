//! WebSocket listener that feeds inbound frames to the dispatcher.
//!
//! One listener per [`BridgeListener`]. Starting it again closes the
//! previous socket before binding, so a restart never trips over its own
//! port.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use editbridge_core::{Request, ServerConfig};

use crate::dispatcher::Dispatcher;
use crate::error::ServerError;

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Whether any client is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BridgeStatus {
    #[default]
    Offline,
    Online,
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::Online => f.write_str("online"),
        }
    }
}

struct ListenerShared {
    dispatcher: Dispatcher,
    status: watch::Sender<BridgeStatus>,
    /// Live connection count; updated together with `status`
    connections: Mutex<usize>,
}

impl ListenerShared {
    fn connection_opened(&self) -> usize {
        let mut count = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        self.status.send_replace(BridgeStatus::Online);
        *count
    }

    fn connection_closed(&self) -> usize {
        let mut count = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.status.send_replace(BridgeStatus::Offline);
        }
        *count
    }

    fn connection_count(&self) -> usize {
        *self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts a connection for as long as it is alive.
struct ConnectionGuard {
    shared: Arc<ListenerShared>,
    peer: SocketAddr,
}

impl ConnectionGuard {
    fn open(shared: &Arc<ListenerShared>, peer: SocketAddr) -> Self {
        let count = shared.connection_opened();
        info!(%peer, connections = count, "Bridge client connected");
        Self {
            shared: Arc::clone(shared),
            peer,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let count = self.shared.connection_closed();
        info!(peer = %self.peer, connections = count, "Bridge client disconnected");
    }
}

struct ActiveListener {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    addr: SocketAddr,
}

impl ActiveListener {
    /// Stop accepting, close every connection and wait for the tasks.
    async fn shut_down(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(addr = %self.addr, "Bridge listener task panicked");
            }
        }
    }
}

/// Editor-side bridge listener.
///
/// ```no_run
/// use std::sync::Arc;
/// use editbridge_server::{BridgeListener, HeadlessEditor, ServerConfig};
///
/// # async fn run() -> Result<(), editbridge_server::ServerError> {
/// let listener = BridgeListener::standard(ServerConfig::local(), Arc::new(HeadlessEditor::new()));
/// let addr = listener.start().await?;
/// println!("listening on ws://{addr}");
/// listener.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct BridgeListener {
    config: ServerConfig,
    shared: Arc<ListenerShared>,
    active: tokio::sync::Mutex<Option<ActiveListener>>,
    bound: Mutex<Option<SocketAddr>>,
}

impl BridgeListener {
    /// Listener for `dispatcher`. The handler deadline comes from `config`.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let dispatcher = dispatcher.with_handler_timeout(config.handler_timeout);
        let (status, _) = watch::channel(BridgeStatus::Offline);
        Self {
            config,
            shared: Arc::new(ListenerShared {
                dispatcher,
                status,
                connections: Mutex::new(0),
            }),
            active: tokio::sync::Mutex::new(None),
            bound: Mutex::new(None),
        }
    }

    /// Listener serving the standard method table against `editor`.
    pub fn standard(config: ServerConfig, editor: Arc<dyn crate::Editor>) -> Self {
        Self::new(config, Dispatcher::standard(editor))
    }

    #[inline]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Bind the configured address and start accepting connections.
    ///
    /// A listener that is already running is shut down first, including its
    /// open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!("Restarting editor bridge listener on {}", previous.addr);
            self.set_bound(None);
            previous.shut_down().await;
        }

        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            shutdown.clone(),
        ));
        *active = Some(ActiveListener {
            shutdown,
            task,
            addr,
        });
        self.set_bound(Some(addr));

        info!("Editor bridge listening on ws://{}", addr);
        Ok(addr)
    }

    /// Stop the listener and close its connections. Does nothing when the
    /// listener is not running.
    pub async fn stop(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            let addr = previous.addr;
            self.set_bound(None);
            previous.shut_down().await;
            info!("Editor bridge on {} stopped", addr);
        }
    }

    /// Address actually bound, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.local_addr().is_some()
    }

    pub fn status(&self) -> BridgeStatus {
        *self.shared.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BridgeStatus> {
        self.shared.status.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.shared.connection_count()
    }

    fn set_bound(&self, addr: Option<SocketAddr>) {
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner) = addr;
    }
}

impl Drop for BridgeListener {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.shutdown.cancel();
        }
    }
}

impl std::fmt::Debug for BridgeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeListener")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .field("status", &self.status())
            .finish()
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<ListenerShared>, shutdown: CancellationToken) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted bridge socket");
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&shared),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    warn!("Failed to accept bridge connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("Bridge connection task panicked");
                    }
                }
            }
        }
    }

    // Release the port before draining connections
    drop(listener);
    while connections.join_next().await.is_some() {}
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<ListenerShared>,
    cancel: CancellationToken,
) {
    let ws_stream = tokio::select! {
        _ = cancel.cancelled() => return,
        handshake = accept_async(stream) => match handshake {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!(%peer, "WebSocket handshake failed: {}", e);
                return;
            }
        },
    };

    let _guard = ConnectionGuard::open(&shared, peer);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = queue.recv().await {
            if let Err(e) = ws_sender.send(frame).await {
                debug!(%peer, "Failed to write response: {}", e);
                return;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut requests = JoinSet::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = ws_receiver.next() => {
                let request = match frame {
                    Some(Ok(Message::Text(text))) => Request::from_text(text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => Request::from_bytes(&bytes),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(%peer, "Bridge connection error: {}", e);
                        break;
                    }
                };

                let request = match request {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(%peer, "Dropping malformed frame: {}", e);
                        continue;
                    }
                };

                debug!(%peer, id = %request.id, method = %request.method, "Dispatching request");
                let dispatcher = shared.dispatcher.clone();
                let outbound = outbound.clone();
                let cancel = cancel.clone();
                requests.spawn(async move {
                    let response = dispatcher.dispatch(request, &cancel).await;
                    match response.to_text() {
                        Ok(text) => {
                            if outbound.send(Message::Text(text.into())).is_err() {
                                debug!(id = %response.id, "Connection closed before response was sent");
                            }
                        }
                        Err(e) => error!(id = %response.id, "Failed to encode response: {}", e),
                    }
                });
            }
            Some(_) = requests.join_next(), if !requests.is_empty() => {}
        }
    }

    cancel.cancel();
    requests.shutdown().await;
    drop(outbound);
    let _ = writer.await;
}
