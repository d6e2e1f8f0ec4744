//! Raw WebSocket peers for listener tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use editbridge_server::{BridgeListener, Dispatcher, HeadlessEditor, MethodRegistry, ServerConfig};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Listener on an ephemeral loopback port with the standard methods.
pub fn standard_listener() -> BridgeListener {
    BridgeListener::standard(
        ServerConfig::new("127.0.0.1", 0),
        Arc::new(HeadlessEditor::new()),
    )
}

/// Listener on an ephemeral loopback port serving `registry`.
pub fn listener_with(registry: MethodRegistry, handler_timeout: Duration) -> BridgeListener {
    let config = ServerConfig::new("127.0.0.1", 0).with_handler_timeout(handler_timeout);
    BridgeListener::new(config, Dispatcher::new(registry, Arc::new(HeadlessEditor::new())))
}

pub async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    socket
}

pub async fn send_text(socket: &mut Socket, text: impl Into<String>) {
    let text: String = text.into();
    socket.send(Message::Text(text.into())).await.unwrap();
}

pub async fn send_request(socket: &mut Socket, id: &str, method: &str, params: Value) {
    let frame = json!({ "id": id, "method": method, "params": params });
    send_text(socket, frame.to_string()).await;
}

/// Next response frame as JSON. Panics if nothing arrives within two seconds.
pub async fn recv(socket: &mut Socket) -> Value {
    recv_within(socket, Duration::from_secs(2))
        .await
        .expect("no response from listener")
}

/// Next response frame, or `None` if nothing arrives within `wait`.
pub async fn recv_within(socket: &mut Socket, wait: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, socket.next()).await.ok()??;
        match frame.ok()? {
            Message::Text(text) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Message::Close(_) => return None,
            _ => continue,
        }
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
