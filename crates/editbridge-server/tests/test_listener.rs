//! Listener lifecycle and wire behaviour tests

mod common;

use std::time::Duration;

use common::*;
use editbridge_server::{
    BridgeListener, BridgeStatus, HandlerContext, HandlerResult, MethodRegistry, ServerConfig,
    ServerError,
};
use futures_util::SinkExt;
use serde_json::{json, Value};
use serial_test::serial;
use tokio_tungstenite::tungstenite::Message;

async fn nap(_ctx: HandlerContext, params: Value) -> HandlerResult {
    let millis = params["ms"].as_u64().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(json!({ "slept": millis }))
}

async fn stall(ctx: HandlerContext, _params: Value) -> HandlerResult {
    ctx.cancel.cancelled().await;
    Ok(Value::Null)
}

#[tokio::test]
async fn test_workspace_round_trip() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_request(&mut socket, "1", "getWorkspaceInfo", json!({})).await;
    assert_eq!(
        recv(&mut socket).await,
        json!({ "id": "1", "result": { "hasWorkspace": false, "message": "No workspace open" } })
    );

    listener.stop().await;
}

#[tokio::test]
async fn test_unknown_method_gets_error_result() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_request(&mut socket, "2", "doesNotExist", json!({})).await;
    assert_eq!(
        recv(&mut socket).await,
        json!({ "id": "2", "result": { "error": "Unknown command: doesNotExist" } })
    );
}

#[tokio::test]
async fn test_editor_refusal_reports_success_false() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_request(&mut socket, "3", "saveFile", json!({})).await;
    assert_eq!(
        recv(&mut socket).await,
        json!({ "id": "3", "result": { "success": false, "error": "No active editor" } })
    );
}

#[tokio::test]
async fn test_missing_params_default_to_empty_object() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_text(&mut socket, r#"{"id":"n","method":"getThemes"}"#).await;
    let response = recv(&mut socket).await;
    assert_eq!(response["id"], "n");
    assert_eq!(response["result"]["count"], 10);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_text(&mut socket, "not json").await;
    send_text(&mut socket, r#"{"method":"getThemes"}"#).await;
    send_request(&mut socket, "3", "getWorkspaceInfo", json!({})).await;

    // Only the well-formed request is answered, and the connection survives
    let response = recv(&mut socket).await;
    assert_eq!(response["id"], "3");
    assert!(recv_within(&mut socket, Duration::from_millis(200)).await.is_none());

    send_request(&mut socket, "4", "getWorkspaceInfo", json!({})).await;
    assert_eq!(recv(&mut socket).await["id"], "4");
}

#[tokio::test]
async fn test_binary_frames_are_accepted() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    let frame = json!({ "id": "b", "method": "getOpenTabs", "params": {} }).to_string();
    socket
        .send(Message::Binary(frame.into_bytes().into()))
        .await
        .unwrap();
    assert_eq!(recv(&mut socket).await, json!({ "id": "b", "result": [] }));
}

#[tokio::test]
async fn test_responses_follow_completion_order() {
    let mut registry = MethodRegistry::new();
    registry.register("nap", nap).unwrap();
    let listener = listener_with(registry, Duration::from_secs(5));
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_request(&mut socket, "slow", "nap", json!({ "ms": 300 })).await;
    send_request(&mut socket, "fast", "nap", json!({ "ms": 0 })).await;

    let first = recv(&mut socket).await;
    let second = recv(&mut socket).await;
    assert_eq!(first, json!({ "id": "fast", "result": { "slept": 0 } }));
    assert_eq!(second, json!({ "id": "slow", "result": { "slept": 300 } }));
}

#[tokio::test]
async fn test_handler_deadline_produces_failure() {
    let mut registry = MethodRegistry::new();
    registry.register("stall", stall).unwrap();
    let listener = listener_with(registry, Duration::from_millis(100));
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;

    send_request(&mut socket, "t", "stall", json!({})).await;
    assert_eq!(
        recv(&mut socket).await,
        json!({ "id": "t", "result": { "error": "Handler 'stall' timed out after 100 ms" } })
    );
}

#[tokio::test]
#[serial]
async fn test_start_twice_replaces_listener() {
    let port = unused_port().await;
    let listener = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", port),
        std::sync::Arc::new(editbridge_server::HeadlessEditor::new()),
    );

    let first = listener.start().await.unwrap();
    let mut stale = connect(first).await;
    let second = listener.start().await.unwrap();
    assert_eq!(first.port(), port);
    assert_eq!(second.port(), port);

    // The previous listener's connections were closed with it
    assert!(recv_within(&mut stale, Duration::from_secs(1)).await.is_none());

    let mut socket = connect(second).await;
    send_request(&mut socket, "1", "getWorkspaceInfo", json!({})).await;
    assert_eq!(recv(&mut socket).await["id"], "1");

    // Exactly one listener owns the port
    let rival = BridgeListener::standard(
        ServerConfig::new("127.0.0.1", port),
        std::sync::Arc::new(editbridge_server::HeadlessEditor::new()),
    );
    assert!(matches!(rival.start().await, Err(ServerError::Bind { .. })));

    listener.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent_and_closes_connections() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut socket = connect(addr).await;
    assert!(wait_until(|| listener.connection_count() == 1).await);

    listener.stop().await;
    assert!(!listener.is_running());
    assert_eq!(listener.local_addr(), None);
    assert_eq!(listener.connection_count(), 0);
    assert_eq!(listener.status(), BridgeStatus::Offline);
    assert!(recv_within(&mut socket, Duration::from_secs(1)).await.is_none());

    listener.stop().await;
    assert!(tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_status_tracks_every_client() {
    let listener = standard_listener();
    let addr = listener.start().await.unwrap();
    let mut status = listener.subscribe_status();
    assert_eq!(listener.status(), BridgeStatus::Offline);

    let first = connect(addr).await;
    let mut second = connect(addr).await;
    assert!(wait_until(|| listener.connection_count() == 2).await);
    assert_eq!(*status.borrow_and_update(), BridgeStatus::Online);

    // Both clients are served
    send_request(&mut second, "s", "getOpenTabs", json!({})).await;
    assert_eq!(recv(&mut second).await["id"], "s");

    drop(first);
    assert!(wait_until(|| listener.connection_count() == 1).await);
    assert_eq!(listener.status(), BridgeStatus::Online);

    drop(second);
    assert!(wait_until(|| listener.connection_count() == 0).await);
    assert_eq!(listener.status(), BridgeStatus::Offline);
}
