//! Client-side error types

use std::time::Duration;

/// Failures surfaced to callers of the bridge client.
///
/// Transport and timeout failures are returned as values. Nothing here is
/// allowed to take down the caller's process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The connect sequence did not reach `Open`
    #[error("Cannot connect to editor bridge at {url}: {reason}. Make sure the editor is running and the bridge is active")]
    CannotConnect { url: String, reason: String },

    /// No correlated response arrived in time
    #[error("Timeout waiting for editor response after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The connection closed while the request was pending
    #[error("Connection to editor bridge lost")]
    ConnectionLost,

    /// The request frame could not be written
    #[error("Failed to send request: {0}")]
    SendFailed(String),

    /// The request could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl BridgeError {
    pub fn cannot_connect(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::CannotConnect {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure came from the transport rather than the wait bound
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::CannotConnect { .. } | Self::ConnectionLost | Self::SendFailed(_)
        )
    }
}

impl From<editbridge_core::ProtocolError> for BridgeError {
    fn from(err: editbridge_core::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Result type alias for client operations
pub type BridgeResult<T> = Result<T, BridgeError>;
