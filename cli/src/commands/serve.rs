use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use editbridge_core::ServerConfig;
use editbridge_server::{BridgeListener, HeadlessEditor};

use crate::utils::{print_info, print_success};

/// Serve the bridge with the headless editor until Ctrl-C
pub async fn execute(
    bind: String,
    port: u16,
    workspace: Option<PathBuf>,
    handler_timeout_ms: u64,
) -> Result<()> {
    let config = ServerConfig::builder()
        .host(bind)
        .port(port)
        .handler_timeout(Duration::from_millis(handler_timeout_ms))
        .build()?;

    let editor = match workspace {
        Some(dir) => {
            let dir = dir
                .canonicalize()
                .with_context(|| format!("Workspace folder {} not found", dir.display()))?;
            print_info(&format!("Workspace: {}", dir.display()));
            HeadlessEditor::with_workspace(dir)
        }
        None => HeadlessEditor::new(),
    };

    let listener = BridgeListener::standard(config, Arc::new(editor));
    let addr = listener.start().await?;

    print_success(&format!("Editor bridge listening on ws://{addr}"));
    println!("Press Ctrl+C to stop\n");

    let mut status = listener.subscribe_status();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                println!("{} bridge {}", "•".cyan(), current);
            }
        }
    }

    listener.stop().await;
    print_info("Editor bridge stopped");
    Ok(())
}
