//! Correlated request channel

use std::sync::Arc;
use std::time::Duration;

use editbridge_core::{ClientConfig, Outcome, Request};
use serde_json::Value;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::connection::{ConnectionState, Shared};
use crate::error::{BridgeError, BridgeResult};

/// Client half of the bridge.
///
/// Multiplexes concurrent requests over one lazily opened connection and
/// matches each response to its caller by id. Clones share the connection.
///
/// ```no_run
/// # async fn demo() -> Result<(), editbridge_client::BridgeError> {
/// use editbridge_client::BridgeClient;
/// use editbridge_core::ClientConfig;
///
/// let client = BridgeClient::new(ClientConfig::local());
/// let info = client.send("getWorkspaceInfo", serde_json::json!({})).await?;
/// println!("{info}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BridgeClient {
    shared: Arc<Shared>,
}

impl BridgeClient {
    /// Create a client. No connection is made until the first request.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Send a request and wait for its result with the configured timeout.
    pub async fn send(&self, method: &str, params: Value) -> BridgeResult<Value> {
        self.send_with_timeout(method, params, self.shared.config.request_timeout)
            .await
    }

    /// Send a request and wait at most `timeout` for its result.
    ///
    /// Exactly one frame is written. On timeout the pending entry is removed,
    /// so a late response is dropped. The editor-side operation is not
    /// cancelled by this.
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> BridgeResult<Value> {
        let link = self.shared.ensure_link().await?;

        let request = Request::new(self.shared.ids.next_id(), method, params);
        let frame = request.to_text()?;
        let id = request.id;

        let reply = self.shared.pending.register(id.clone(), link.generation)?;
        if link.outbound.send(Message::Text(frame.into())).is_err() {
            self.shared.pending.remove(&id);
            return Err(BridgeError::SendFailed(
                "connection writer has shut down".to_string(),
            ));
        }
        debug!(%id, method, "Sent bridge request");

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(result)) => result,
            // Entry dropped without an answer
            Ok(Err(_)) => Err(BridgeError::ConnectionLost),
            Err(_) => {
                self.shared.pending.remove(&id);
                debug!(%id, method, "Bridge request timed out");
                Err(BridgeError::Timeout(timeout))
            }
        }
    }

    /// Send a command and return its tagged outcome.
    ///
    /// Transport failures are still errors; a handler failure reported by the
    /// editor is `Outcome::Err`.
    pub async fn send_command(&self, method: &str, params: Value) -> BridgeResult<Outcome> {
        self.send(method, params).await.map(Outcome::classify)
    }

    /// Make sure the connection is open, dialing if needed.
    pub async fn ensure_connected(&self) -> BridgeResult<()> {
        self.shared.ensure_link().await.map(|_| ())
    }

    /// [`ensure_connected`](Self::ensure_connected) reduced to whether it succeeded.
    pub async fn ensure_connected_ok(&self) -> bool {
        self.ensure_connected().await.is_ok()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.subscribe_state()
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Close the connection. Pending requests fail with `ConnectionLost`.
    pub async fn close(&self) {
        self.shared.close().await;
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("url", &self.shared.config.url())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}
