//! # Editor Bridge
//!
//! Let an AI assistant drive a running code editor.
//!
//! ## Overview
//!
//! The bridge has two halves joined by a local WebSocket:
//! - **Client**: [`client::BridgeClient`] sends correlated requests to the
//!   editor and resolves each caller when its response arrives
//! - **Server**: [`server::BridgeListener`] runs inside the editor, dispatches
//!   each request to one of the standard methods and answers with the same id
//!
//! The [`mcp`] module exposes the client to assistants as MCP tools over stdio.
//!
//! ## Quick Start
//!
//! ```no_run
//! use editbridge::prelude::*;
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), BridgeError> {
//! let client = BridgeClient::new(ClientConfig::local());
//! match client.send_command("getWorkspaceInfo", json!({})).await? {
//!     Outcome::Ok(info) => println!("{info}"),
//!     Outcome::Err(reason) => eprintln!("editor refused: {reason}"),
//! }
//! client.close().await;
//! # Ok(())
//! # }
//! ```

// Re-export shared envelope and configuration types
pub use editbridge_core as core;

#[cfg(feature = "client")]
pub use editbridge_client as client;

#[cfg(feature = "server")]
pub use editbridge_server as server;

#[cfg(feature = "mcp")]
pub use editbridge_mcp as mcp;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::prelude::*;

    #[cfg(feature = "client")]
    pub use crate::client::{BridgeClient, BridgeError, BridgeResult, ConnectionState};

    #[cfg(feature = "server")]
    pub use crate::server::{BridgeListener, BridgeStatus, Dispatcher, Editor, HeadlessEditor};
}
