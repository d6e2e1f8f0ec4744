use anyhow::{Context, Result};
use editbridge_core::ClientConfig;

/// Run the MCP server for an assistant connected over stdio
pub async fn execute(config: ClientConfig) -> Result<()> {
    editbridge_mcp::run_stdio(config)
        .await
        .context("MCP server failed")
}
