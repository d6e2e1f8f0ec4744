//! Shared building blocks for the editbridge client and dispatcher
//!
//! This crate holds everything both ends of the bridge agree on: the
//! request/response envelopes carried in each transport frame, correlation
//! ids, the tagged [`Outcome`] of a request, and endpoint configuration.

pub mod config;
pub mod envelope;
pub mod id;

pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigError, ServerConfig, ServerConfigBuilder,
    DEFAULT_BIND_HOST, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDLER_TIMEOUT, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT, MAX_TIMEOUT,
};
pub use envelope::{empty_params, Outcome, Request, RequestId, Response, UNSPECIFIED_FAILURE};
pub use id::RequestIdGenerator;

/// Errors raised while decoding or encoding a frame
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Binary frame did not hold UTF-8 text
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,

    /// Frame was not a valid envelope
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ClientConfig, ConfigError, Outcome, ProtocolError, Request, RequestId, Response,
        ServerConfig,
    };
}
