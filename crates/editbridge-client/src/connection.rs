//! Connection lifecycle: dialing, observing close, and orderly shutdown.
//!
//! The lifecycle owns the [`ConnectionState`]. The request channel only
//! observes it and asks for a live link before each send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use editbridge_core::{ClientConfig, RequestIdGenerator, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::pending::PendingTable;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport state as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
        };
        f.write_str(name)
    }
}

/// One open transport connection.
struct Link {
    outbound: mpsc::UnboundedSender<Message>,
    generation: u64,
    reader: JoinHandle<()>,
}

/// What a caller needs to write one request.
#[derive(Clone)]
pub(crate) struct LinkHandle {
    pub(crate) outbound: mpsc::UnboundedSender<Message>,
    pub(crate) generation: u64,
}

/// State shared by every clone of a client and by its connection tasks.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) ids: RequestIdGenerator,
    pub(crate) pending: PendingTable,
    /// Held across a connect attempt so concurrent callers wait for it
    link: Mutex<Option<Link>>,
    state: watch::Sender<ConnectionState>,
    generations: AtomicU64,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            ids: RequestIdGenerator::new(),
            pending: PendingTable::default(),
            link: Mutex::new(None),
            state,
            generations: AtomicU64::new(1),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn publish(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Bridge connection {} -> {}", previous, state);
        }
    }

    /// Return a live link, dialing a new connection when there is none.
    ///
    /// A caller arriving while another caller is dialing waits for that
    /// attempt and reuses its result.
    pub(crate) async fn ensure_link(self: &Arc<Self>) -> BridgeResult<LinkHandle> {
        let mut slot = self.link.lock().await;

        if let Some(link) = slot.as_ref() {
            if !link.outbound.is_closed() && self.pending.is_live(link.generation) {
                return Ok(LinkHandle {
                    outbound: link.outbound.clone(),
                    generation: link.generation,
                });
            }
            // Writer is gone or the reader already saw the close; the reader
            // cleans up that generation when it ends
            debug!(generation = link.generation, "Discarding stale bridge link");
        }
        *slot = None;

        self.publish(ConnectionState::Connecting);
        let url = self.config.url();
        let connect_timeout = self.config.connect_timeout;

        let stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await
        {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                self.publish(ConnectionState::Disconnected);
                warn!("Failed to connect to editor bridge at {}: {}", url, e);
                return Err(BridgeError::cannot_connect(url, e));
            }
            Err(_) => {
                self.publish(ConnectionState::Disconnected);
                warn!("Connection to editor bridge at {} timed out", url);
                return Err(BridgeError::cannot_connect(
                    url,
                    format!("no answer within {} ms", connect_timeout.as_millis()),
                ));
            }
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        self.pending.open_generation(generation);

        let (sink, stream) = stream.split();
        let (outbound, queue) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(sink, queue, generation));
        let reader = tokio::spawn(read_loop(Arc::downgrade(self), stream, generation));

        let handle = LinkHandle {
            outbound: outbound.clone(),
            generation,
        };
        *slot = Some(Link {
            outbound,
            generation,
            reader,
        });
        self.publish(ConnectionState::Open);
        info!(generation, "Connected to editor bridge at {}", url);

        Ok(handle)
    }

    /// Close path for a connection whose stream ended.
    async fn on_closed(&self, generation: u64) {
        // Fail waiters first; a connect attempt may be holding the slot
        let failed = self.pending.fail_generation(generation);

        let mut slot = self.link.lock().await;
        if slot.as_ref().is_some_and(|link| link.generation == generation) {
            *slot = None;
            self.publish(ConnectionState::Disconnected);
        }
        drop(slot);

        info!(generation, failed, "Editor bridge connection closed");
    }

    /// Orderly shutdown of the current connection, if any.
    pub(crate) async fn close(&self) {
        let link = self.link.lock().await.take();
        let Some(link) = link else {
            self.publish(ConnectionState::Disconnected);
            return;
        };

        // Dropping the sender lets the writer send a close frame and exit
        let Link {
            outbound,
            generation,
            reader,
        } = link;
        drop(outbound);
        reader.abort();

        let failed = self.pending.fail_generation(generation);
        self.publish(ConnectionState::Disconnected);
        info!(generation, failed, "Closed editor bridge connection");
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    generation: u64,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = sink.send(frame).await {
            warn!(generation, "Failed to write to editor bridge: {}", e);
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(generation, "Close handshake failed: {}", e);
    }
}

/// Holds only a weak reference so dropping every client tears the link down.
async fn read_loop(shared: Weak<Shared>, mut stream: SplitStream<WsStream>, generation: u64) {
    while let Some(frame) = stream.next().await {
        let decoded = match frame {
            Ok(Message::Text(text)) => Response::from_text(text.as_str()),
            Ok(Message::Binary(bytes)) => Response::from_bytes(&bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(generation, "Editor bridge connection error: {}", e);
                break;
            }
        };

        let Some(live) = shared.upgrade() else {
            return;
        };
        match decoded {
            Ok(response) => {
                let id = response.id.clone();
                if !live.pending.resolve(response) {
                    debug!(%id, "Dropping response with no pending request");
                }
            }
            Err(e) => warn!(generation, "Dropping malformed frame from editor: {}", e),
        }
    }

    if let Some(shared) = shared.upgrade() {
        shared.on_closed(generation).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Loopback peer that holds every connection open until the client leaves.
    async fn idle_editor() -> (ClientConfig, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    if let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await {
                        while let Some(Ok(_)) = socket.next().await {}
                    }
                });
            }
        });

        let config = ClientConfig::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_secs(2));
        (config, accepted)
    }

    #[tokio::test]
    async fn test_link_closed_before_cleanup_is_redialed() {
        let (config, accepted) = idle_editor().await;
        let shared = Arc::new(Shared::new(config));

        let first = shared.ensure_link().await.unwrap();
        assert_eq!(accepted.load(Ordering::SeqCst), 1);

        // The reader has failed this generation but not yet cleared the slot
        shared.pending.fail_generation(first.generation);
        assert!(shared.link.lock().await.is_some());

        let second = shared.ensure_link().await.unwrap();
        assert_ne!(second.generation, first.generation);
        assert!(shared.pending.is_live(second.generation));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert_eq!(shared.state(), ConnectionState::Open);

        shared.close().await;
        assert_eq!(shared.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_live_link_is_reused() {
        let (config, accepted) = idle_editor().await;
        let shared = Arc::new(Shared::new(config));

        let first = shared.ensure_link().await.unwrap();
        let again = shared.ensure_link().await.unwrap();
        assert_eq!(first.generation, again.generation);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);

        shared.close().await;
    }
}
