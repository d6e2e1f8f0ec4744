//! Scripted editor peers for client tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use editbridge_client::BridgeClient;
use editbridge_core::{ClientConfig, Request, Response};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub type EditorSocket = WebSocketStream<TcpStream>;

/// A listening mock editor and how many connections it has accepted.
pub struct MockEditor {
    pub addr: SocketAddr,
    pub accepted: Arc<AtomicUsize>,
}

impl MockEditor {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> BridgeClient {
        self.client_with_timeout(Duration::from_secs(2))
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> BridgeClient {
        let config = ClientConfig::new("127.0.0.1", self.addr.port())
            .with_request_timeout(timeout)
            .with_connect_timeout(Duration::from_secs(2));
        BridgeClient::new(config)
    }
}

/// Spawn a mock editor that runs `script` on every accepted connection.
pub async fn mock_editor<F, Fut>(script: F) -> MockEditor
where
    F: Fn(EditorSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    slow_handshake_editor(usize::MAX, Duration::ZERO, script).await
}

/// Like [`mock_editor`], but the WebSocket handshake of the `slow_from`-th
/// connection (1-based) and every later one waits `delay` first.
pub async fn slow_handshake_editor<F, Fut>(
    slow_from: usize,
    delay: Duration,
    script: F,
) -> MockEditor
where
    F: Fn(EditorSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let script = Arc::new(script);

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            // Counted before the handshake so a connected client always sees it
            let nth = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let script = Arc::clone(&script);
            tokio::spawn(async move {
                if nth >= slow_from {
                    tokio::time::sleep(delay).await;
                }
                if let Ok(socket) = accept_async(stream).await {
                    script(socket).await;
                }
            });
        }
    });

    MockEditor { addr, accepted }
}

/// Read the next request frame, or `None` once the client goes away.
pub async fn next_request(socket: &mut EditorSocket) -> Option<Request> {
    while let Some(frame) = socket.next().await {
        match frame.ok()? {
            Message::Text(text) => return Some(Request::from_text(text.as_str()).unwrap()),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

pub async fn reply(socket: &mut EditorSocket, request: &Request, result: Value) {
    let frame = Response::ok(request.id.clone(), result).to_text().unwrap();
    socket.send(Message::Text(frame.into())).await.unwrap();
}

/// Echo every request back as `{ "method": <method>, "params": <params> }`.
pub async fn echo(mut socket: EditorSocket) {
    while let Some(request) = next_request(&mut socket).await {
        let result = serde_json::json!({ "method": request.method, "params": request.params });
        reply(&mut socket, &request, result).await;
    }
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll until `check` holds or two seconds pass.
pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
