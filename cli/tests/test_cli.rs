//! Tests for the `editbridge` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;

use editbridge_server::{BridgeListener, HeadlessEditor, ServerConfig};

fn editbridge() -> Command {
    let mut cmd = Command::cargo_bin("editbridge").unwrap();
    cmd.env_remove("EDITBRIDGE_HOST")
        .env_remove("EDITBRIDGE_PORT")
        .env_remove("EDITBRIDGE_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn headless_listener() -> (BridgeListener, SocketAddr) {
    let listener = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", 0),
        Arc::new(HeadlessEditor::new()),
    );
    let addr = listener.start().await.unwrap();
    (listener, addr)
}

/// Run `args` against the bridge at `addr` off the async runtime.
async fn run_against(addr: SocketAddr, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    args.extend([
        "--host".to_string(),
        "127.0.0.1".to_string(),
        "--port".to_string(),
        addr.port().to_string(),
    ]);
    tokio::task::spawn_blocking(move || editbridge().args(&args).assert())
        .await
        .unwrap()
}

#[test]
fn test_help_lists_commands() {
    editbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcp"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("call"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_call_without_editor() {
    let port = unused_port().to_string();
    editbridge()
        .args(["call", "getWorkspaceInfo", "--host", "127.0.0.1", "--port", &port])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot connect"));
}

#[test]
fn test_call_rejects_bad_params() {
    editbridge()
        .args(["call", "openFile", "--params", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --params"));
}

#[test]
fn test_zero_timeout_is_rejected() {
    editbridge()
        .args(["call", "getWorkspaceInfo", "--timeout-ms", "0"])
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_round_trip() {
    let (listener, addr) = headless_listener().await;

    run_against(addr, &["call", "getWorkspaceInfo"])
        .await
        .success()
        .stdout(predicate::str::contains("\"hasWorkspace\": false"))
        .stdout(predicate::str::contains("No workspace open"));

    run_against(addr, &["call", "getThemes"])
        .await
        .success()
        .stdout(predicate::str::contains("Default Dark+"));

    listener.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_reports_editor_failure() {
    let (listener, addr) = headless_listener().await;

    run_against(addr, &["call", "teleport"])
        .await
        .failure()
        .stderr(predicate::str::contains("Unknown command: teleport"));

    run_against(addr, &["call", "saveFile"])
        .await
        .failure()
        .stderr(predicate::str::contains("No active editor"));

    listener.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_doctor() {
    let (listener, addr) = headless_listener().await;

    run_against(addr, &["doctor"])
        .await
        .success()
        .stdout(predicate::str::contains("accepting connections"))
        .stdout(predicate::str::contains("Round trip completed"));

    listener.stop().await;

    run_against(addr, &["doctor"])
        .await
        .failure()
        .stdout(predicate::str::contains("Possible fixes"));
}
