//! MCP front end for the editor bridge
//!
//! Exposes the bridge methods to an assistant as MCP tools over stdio. Each
//! `vscode_*` tool forwards to one bridge method through a
//! [`BridgeClient`](editbridge_client::BridgeClient); `read_file` and
//! `list_files` are answered locally.

pub mod catalog;
pub mod fs_tools;
mod server;

pub use catalog::{catalog, ToolSpec, ToolTarget};
pub use server::{run_stdio, EditorBridgeServer};
