//! Client half of the editor bridge
//!
//! [`BridgeClient`] keeps one WebSocket connection to the editor's
//! dispatcher, tags each request with a fresh correlation id and resolves
//! callers as responses arrive, in any order. Every request is bounded by a
//! timeout, and a dropped connection fails every request that was waiting
//! on it.

mod client;
mod connection;
pub mod error;
mod pending;

pub use client::BridgeClient;
pub use connection::ConnectionState;
pub use error::{BridgeError, BridgeResult};

pub use editbridge_core::{ClientConfig, Outcome};
