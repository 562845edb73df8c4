//! Integration tests for the relay over WebSocket
//!
//! These tests spin up a real HTTP+WebSocket server and drive requester and
//! responder peers through the full flow: connect → identify → event →
//! forwarded event → ack.

use futures_util::{SinkExt, StreamExt};
use pinpoint_relay::prelude::*;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, connect_async_with_config,
    tungstenite::Message,
};

type WsWrite = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Helper: start a test server with the given config and return its address
async fn start_server_with(config: RelayConfig) -> SocketAddr {
    let app = ServerBuilder::new()
        .with_config(config)
        .with_registry(InMemoryLinkRegistry::new())
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small delay to let the server start
    tokio::time::sleep(Duration::from_millis(50)).await;

    addr
}

async fn start_test_server() -> SocketAddr {
    start_server_with(RelayConfig::default_config()).await
}

/// Helper: receive next JSON message from WS (with timeout)
async fn ws_recv(read: &mut WsRead) -> Value {
    let msg = timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Timeout waiting for WS message")
        .expect("Stream ended")
        .expect("WS error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text message, got {:?}", other),
    }
}

/// Helper: assert nothing arrives for a while
async fn ws_expect_silence(read: &mut WsRead, wait: Duration) {
    let result = timeout(wait, read.next()).await;
    assert!(result.is_err(), "Expected no message, got {:?}", result);
}

/// Helper: send a JSON message over WS
async fn ws_send(write: &mut WsWrite, msg: &Value) {
    let text = serde_json::to_string(msg).unwrap();
    write.send(Message::Text(text.into())).await.unwrap();
}

/// Helper: connect, read welcome + identity request, return the connection id
async fn ws_connect(addr: SocketAddr) -> (String, WsWrite, WsRead) {
    ws_connect_with(addr, None).await
}

async fn ws_connect_with(
    addr: SocketAddr,
    config: Option<WebSocketConfig>,
) -> (String, WsWrite, WsRead) {
    let url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = connect_async_with_config(&url, config, false)
        .await
        .expect("Failed to connect");
    let (write, mut read) = ws_stream.split();

    let welcome = ws_recv(&mut read).await;
    assert_eq!(welcome["type"], "welcome");
    let conn_id = welcome["connection_id"].as_str().unwrap().to_string();

    let identify = ws_recv(&mut read).await;
    assert_eq!(identify, json!({"type": "identify"}));

    (conn_id, write, read)
}

/// Helper: connect and register under `link`
async fn ws_join(addr: SocketAddr, link: &str, is_requester: bool) -> (String, WsWrite, WsRead) {
    ws_join_with(addr, link, is_requester, None).await
}

async fn ws_join_with(
    addr: SocketAddr,
    link: &str,
    is_requester: bool,
    config: Option<WebSocketConfig>,
) -> (String, WsWrite, WsRead) {
    let (conn_id, mut write, mut read) = ws_connect_with(addr, config).await;

    ws_send(
        &mut write,
        &json!({
            "type": "identify",
            "data": {"pinpoint_id": link, "is_requester": is_requester}
        }),
    )
    .await;

    let registered = ws_recv(&mut read).await;
    assert_eq!(registered["type"], "registered");
    assert_eq!(registered["link_id"], link);

    (conn_id, write, read)
}

// === Tests ===

#[tokio::test]
async fn test_ws_connect_welcome_and_identity_request() {
    let addr = start_test_server().await;
    let (conn_id, _write, _read) = ws_connect(addr).await;
    assert!(conn_id.starts_with("conn_"));
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let addr = start_test_server().await;
    let (_conn_id, mut write, mut read) = ws_connect(addr).await;

    ws_send(&mut write, &json!({"type": "ping"})).await;

    let pong = ws_recv(&mut read).await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn test_ws_string_encoded_handshake() {
    let addr = start_test_server().await;
    let (_conn_id, mut write, mut read) = ws_connect(addr).await;

    ws_send(
        &mut write,
        &json!({
            "type": "identify",
            "data": "{\"pinpoint_id\":\"abc\",\"is_requester\":false}"
        }),
    )
    .await;

    let registered = ws_recv(&mut read).await;
    assert_eq!(
        registered,
        json!({"type": "registered", "link_id": "abc", "role": "responder"})
    );
}

#[tokio::test]
async fn test_ws_malformed_handshake_is_ignored() {
    let addr = start_test_server().await;
    let (_conn_id, mut write, mut read) = ws_connect(addr).await;

    ws_send(
        &mut write,
        &json!({"type": "identify", "data": {"pinpoint_id": "abc"}}),
    )
    .await;
    ws_expect_silence(&mut read, Duration::from_millis(200)).await;

    // still unregistered: the reply sink gets an empty ack
    ws_send(
        &mut write,
        &json!({"type": "event", "event": "move", "args": [], "ack_id": 1}),
    )
    .await;
    let ack = ws_recv(&mut read).await;
    assert_eq!(ack, json!({"type": "ack", "ack_id": 1, "result": null}));
}

#[tokio::test]
async fn test_ws_requester_to_responder_round_trip() {
    let addr = start_test_server().await;
    let (r1_id, mut r1_write, mut r1_read) = ws_join(addr, "abc", true).await;
    let (_p1_id, mut p1_write, mut p1_read) = ws_join(addr, "abc", false).await;

    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "move", "args": [10, 20], "ack_id": 1}),
    )
    .await;

    let forwarded = ws_recv(&mut p1_read).await;
    assert_eq!(forwarded["type"], "event");
    assert_eq!(forwarded["event"], "move");
    assert_eq!(forwarded["args"], json!([r1_id, 10, 20]));
    let token = forwarded["ack_id"].as_u64().unwrap();

    ws_send(
        &mut p1_write,
        &json!({"type": "ack", "ack_id": token, "result": "done"}),
    )
    .await;

    let ack = ws_recv(&mut r1_read).await;
    assert_eq!(ack, json!({"type": "ack", "ack_id": 1, "result": "done"}));
}

#[tokio::test]
async fn test_ws_json_payload_preserved() {
    let addr = start_test_server().await;
    let (r1_id, mut r1_write, _r1_read) = ws_join(addr, "abc", true).await;
    let (_p1_id, _p1_write, mut p1_read) = ws_join(addr, "abc", false).await;

    let payload = json!({"key": "value", "nested": {"data": [1, 2, 3]}});
    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "test_json", "args": [payload]}),
    )
    .await;

    let forwarded = ws_recv(&mut p1_read).await;
    assert_eq!(forwarded["event"], "test_json");
    assert_eq!(forwarded["args"], json!([r1_id, payload]));
    assert!(forwarded.get("ack_id").is_none());
}

#[tokio::test]
async fn test_ws_missing_responder() {
    let addr = start_test_server().await;
    let (_r1_id, mut r1_write, mut r1_read) = ws_join(addr, "xyz", true).await;
    let (_other_id, _other_write, mut other_read) = ws_join(addr, "other", false).await;

    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "move", "args": [1], "ack_id": 4}),
    )
    .await;

    let ack = ws_recv(&mut r1_read).await;
    assert_eq!(ack, json!({"type": "ack", "ack_id": 4, "result": null}));
    ws_expect_silence(&mut other_read, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_ws_responder_cannot_initiate() {
    let addr = start_test_server().await;
    let (_r1_id, _r1_write, mut r1_read) = ws_join(addr, "abc", true).await;
    let (_p1_id, mut p1_write, mut p1_read) = ws_join(addr, "abc", false).await;

    ws_send(
        &mut p1_write,
        &json!({"type": "event", "event": "log", "args": ["from responder"]}),
    )
    .await;

    ws_expect_silence(&mut r1_read, Duration::from_millis(200)).await;
    ws_expect_silence(&mut p1_read, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_ws_ack_timeout_leaves_requester_unanswered() {
    let config = RelayConfig {
        ack_timeout_ms: 100,
        ..RelayConfig::default_config()
    };
    let addr = start_server_with(config).await;
    let (_r1_id, mut r1_write, mut r1_read) = ws_join(addr, "abc", true).await;
    let (_p1_id, mut p1_write, mut p1_read) = ws_join(addr, "abc", false).await;

    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "slow", "ack_id": 1}),
    )
    .await;

    let forwarded = ws_recv(&mut p1_read).await;
    let token = forwarded["ack_id"].as_u64().unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    // too late: the relay has given up on this forward
    ws_send(
        &mut p1_write,
        &json!({"type": "ack", "ack_id": token, "result": "late"}),
    )
    .await;

    ws_expect_silence(&mut r1_read, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_ws_responder_disconnect_frees_slot() {
    let addr = start_test_server().await;
    let (_r1_id, mut r1_write, mut r1_read) = ws_join(addr, "abc", true).await;
    let (_p1_id, mut p1_write, _p1_read) = ws_join(addr, "abc", false).await;

    p1_write.send(Message::Close(None)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "move", "ack_id": 9}),
    )
    .await;

    let ack = ws_recv(&mut r1_read).await;
    assert_eq!(ack, json!({"type": "ack", "ack_id": 9, "result": null}));

    // a new responder takes over the link
    let (_p2_id, _p2_write, mut p2_read) = ws_join(addr, "abc", false).await;
    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "move", "args": [1]}),
    )
    .await;

    let forwarded = ws_recv(&mut p2_read).await;
    assert_eq!(forwarded["event"], "move");
}

#[tokio::test]
async fn test_ws_single_frame_above_default_frame_cap() {
    let addr = start_test_server().await;
    let unbounded = || {
        Some(
            WebSocketConfig::default()
                .max_message_size(None)
                .max_frame_size(None),
        )
    };
    let (r1_id, mut r1_write, _r1_read) = ws_join_with(addr, "big", true, unbounded()).await;
    let (_p1_id, _p1_write, mut p1_read) = ws_join_with(addr, "big", false, unbounded()).await;

    // 20 MiB in one frame: over tungstenite's 16 MiB default, under the relay's limit
    let payload = "x".repeat(20 * 1024 * 1024);
    ws_send(
        &mut r1_write,
        &json!({"type": "event", "event": "upload", "args": [payload]}),
    )
    .await;

    let msg = timeout(Duration::from_secs(10), p1_read.next())
        .await
        .expect("Timeout waiting for forwarded upload")
        .expect("Stream ended")
        .expect("WS error");
    let Message::Text(text) = msg else {
        panic!("Expected text message, got {:?}", msg);
    };
    let forwarded: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(forwarded["event"], "upload");
    assert_eq!(forwarded["args"][0], r1_id);
    assert_eq!(
        forwarded["args"][1].as_str().unwrap().len(),
        20 * 1024 * 1024
    );
}

#[tokio::test]
async fn test_ws_invalid_message() {
    let addr = start_test_server().await;
    let (_conn_id, mut write, mut read) = ws_connect(addr).await;

    ws_send(&mut write, &json!({"type": "unknown_action"})).await;

    let error = ws_recv(&mut read).await;
    assert_eq!(error["type"], "error");
    assert!(
        error["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid message")
    );
}

#[tokio::test]
async fn test_ws_allowed_origin_accepted() {
    let addr = start_test_server().await;

    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request.headers_mut().insert(
        "Origin",
        HeaderValue::from_static("https://pinpoint.allenneuraldynamics.org"),
    );

    assert!(connect_async(request).await.is_ok());
}

#[tokio::test]
async fn test_ws_foreign_origin_refused() {
    let addr = start_test_server().await;

    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_static("https://evil.example.com"));

    assert!(connect_async(request).await.is_err());
}
