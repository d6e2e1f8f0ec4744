//! Client and dispatcher talking over a real loopback WebSocket

use std::sync::Arc;
use std::time::Duration;

use editbridge::client::{BridgeClient, BridgeError, ConnectionState};
use editbridge::core::{ClientConfig, Outcome, ServerConfig};
use editbridge::server::{
    BridgeListener, Dispatcher, HandlerContext, HandlerResult, HeadlessEditor, MethodRegistry,
};
use serde_json::{json, Value};
use serial_test::serial;

async fn nap(_ctx: HandlerContext, params: Value) -> HandlerResult {
    let millis = params["ms"].as_u64().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(json!({ "slept": millis }))
}

fn client_for(port: u16) -> BridgeClient {
    BridgeClient::new(ClientConfig::new("127.0.0.1", port))
}

async fn wait_until(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_edit_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let listener = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", 0),
        Arc::new(HeadlessEditor::with_workspace(dir.path())),
    );
    let addr = listener.start().await.unwrap();
    let client = client_for(addr.port());

    let info = client.send("getWorkspaceInfo", json!({})).await.unwrap();
    assert_eq!(info["hasWorkspace"], json!(true));

    let file = dir.path().join("notes.txt").display().to_string();
    let created = client
        .send_command("createFile", json!({ "filePath": file, "content": "one two one" }))
        .await
        .unwrap();
    assert!(created.is_ok());

    let replaced = client
        .send_command(
            "replaceText",
            json!({ "oldText": "one", "newText": "1", "replaceAll": true }),
        )
        .await
        .unwrap();
    assert!(replaced.is_ok());

    let content = client
        .send("getFileContent", json!({ "filePath": file }))
        .await
        .unwrap();
    assert_eq!(content["content"], json!("1 two 1"));

    client.close().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_editor_failures_are_outcomes() {
    let listener = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", 0),
        Arc::new(HeadlessEditor::new()),
    );
    let addr = listener.start().await.unwrap();
    let client = client_for(addr.port());

    let unknown = client.send_command("teleport", json!({})).await.unwrap();
    assert_eq!(unknown, Outcome::Err("Unknown command: teleport".to_string()));

    let no_editor = client.send_command("saveFile", json!({})).await.unwrap();
    assert_eq!(no_editor, Outcome::Err("No active editor".to_string()));

    // The connection survives handler failures
    assert!(client.is_connected());
    client.close().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_concurrent_requests_resolve_by_id() {
    let mut registry = MethodRegistry::new();
    registry.register("nap", nap).unwrap();
    let listener = BridgeListener::new(
        ServerConfig::new("127.0.0.1", 0),
        Dispatcher::new(registry, Arc::new(HeadlessEditor::new())),
    );
    let addr = listener.start().await.unwrap();
    let client = client_for(addr.port());

    let (slow, fast) = tokio::join!(
        client.send("nap", json!({ "ms": 300 })),
        client.send("nap", json!({ "ms": 10 })),
    );
    assert_eq!(slow.unwrap(), json!({ "slept": 300 }));
    assert_eq!(fast.unwrap(), json!({ "slept": 10 }));
    assert_eq!(client.pending_count(), 0);

    client.close().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_client_timeout_leaves_connection_usable() {
    let mut registry = MethodRegistry::new();
    registry.register("nap", nap).unwrap();
    let listener = BridgeListener::new(
        ServerConfig::new("127.0.0.1", 0),
        Dispatcher::new(registry, Arc::new(HeadlessEditor::new())),
    );
    let addr = listener.start().await.unwrap();
    let client = client_for(addr.port());

    let err = client
        .send_with_timeout("nap", json!({ "ms": 500 }), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));
    assert_eq!(client.pending_count(), 0);

    // The late answer is dropped and the next request is unaffected
    let result = client.send("nap", json!({ "ms": 0 })).await.unwrap();
    assert_eq!(result, json!({ "slept": 0 }));

    client.close().await;
    listener.stop().await;
}

#[tokio::test]
#[serial]
async fn test_client_reconnects_after_listener_restart() {
    let port = {
        let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        spare.local_addr().unwrap().port()
    };
    let listener = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", port),
        Arc::new(HeadlessEditor::new()),
    );
    listener.start().await.unwrap();
    let client = client_for(port);

    assert!(client.send("getThemes", json!({})).await.is_ok());

    listener.stop().await;
    assert!(wait_until(|| client.state() == ConnectionState::Disconnected).await);
    let err = client.send("getThemes", json!({})).await.unwrap_err();
    assert!(err.is_transport());

    listener.start().await.unwrap();
    let themes = client.send("getThemes", json!({})).await.unwrap();
    assert_eq!(themes["themes"].as_array().map(Vec::len), Some(10));

    client.close().await;
    listener.stop().await;
}
