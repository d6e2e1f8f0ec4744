use anyhow::{bail, Result};
use colored::Colorize;
use std::time::Instant;
use tokio::net::TcpStream;

use editbridge_client::{BridgeClient, Outcome};
use editbridge_core::{empty_params, ClientConfig};

use crate::utils::{
    create_spinner, format_latency, print_error, print_info, print_success, print_warning,
};

/// Check the bridge port, then time a `getWorkspaceInfo` round trip
pub async fn execute(config: ClientConfig) -> Result<()> {
    println!("{}", "Editor bridge diagnostics".bold());
    println!("{}", "=".repeat(40));
    print_info(&format!("Bridge address: {}", config.url()));

    let spinner = create_spinner("Checking bridge port");
    let reachable = tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await;
    spinner.finish_and_clear();

    match reachable {
        Ok(Ok(_)) => print_success(&format!("Port {} is accepting connections", config.port)),
        Ok(Err(e)) => {
            print_error(&format!("Port {} is not reachable: {}", config.port, e));
            print_fixes();
            bail!("Editor bridge is not reachable");
        }
        Err(_) => {
            print_error(&format!("Port {} did not answer in time", config.port));
            print_fixes();
            bail!("Editor bridge is not reachable");
        }
    }

    let spinner = create_spinner("Running getWorkspaceInfo round trip");
    let client = BridgeClient::new(config);
    let started = Instant::now();
    let outcome = client.send_command("getWorkspaceInfo", empty_params()).await;
    let latency = started.elapsed();
    client.close().await;
    spinner.finish_and_clear();

    match outcome {
        Ok(Outcome::Ok(info)) => {
            print_success(&format!("Round trip completed in {}", format_latency(latency)));
            describe_workspace(&info);
            Ok(())
        }
        Ok(Outcome::Err(reason)) => {
            print_warning(&format!("Bridge answered with an error: {reason}"));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Round trip failed: {e}"));
            print_fixes();
            bail!("Editor bridge did not answer");
        }
    }
}

fn describe_workspace(info: &serde_json::Value) {
    if info["hasWorkspace"].as_bool() != Some(true) {
        print_info("No workspace open");
        return;
    }
    for folder in info["folders"].as_array().into_iter().flatten() {
        let name = folder["name"].as_str().unwrap_or_default();
        let path = folder["path"].as_str().unwrap_or_default();
        print_info(&format!("Workspace folder: {name} ({path})"));
    }
}

fn print_fixes() {
    println!("\n{}", "Possible fixes:".yellow().bold());
    println!("  1. Start the editor and make sure the bridge extension is active");
    println!("  2. Check that nothing else is using the bridge port");
    println!("  3. Run `editbridge serve` to test with the headless editor");
}
