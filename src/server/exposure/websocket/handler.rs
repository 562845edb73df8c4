//! `/ws` upgrade and per-connection tasks
//!
//! A relay connection runs two tasks. The outbound pump drains the
//! connection's channel onto the socket; everything the relay says to a peer
//! (welcome, identity request, forwarded events, acks) goes through that
//! channel, so frames leave in the order they were queued. The inbound loop
//! parses client frames and hands them to the forwarder.

use super::RelayState;
use crate::core::ConnectionId;
use crate::relay::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header::ORIGIN};
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// GET /ws
///
/// Upgrades from origins outside the allow-list are refused with 403.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<RelayState>>,
) -> Response {
    if !state.origins.allows_headers(&headers) {
        tracing::info!(origin = ?headers.get(ORIGIN), "WebSocket blocked origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    // A single unfragmented frame may carry the whole message
    ws.max_message_size(state.max_message_size)
        .max_frame_size(state.max_message_size)
        .on_upgrade(move |socket| run_connection(socket, state))
}

async fn run_connection(socket: WebSocket, state: Arc<RelayState>) {
    let (conn_id, outbound) = state.connections.connect().await;
    let (sink, mut inbound) = socket.split();

    state
        .connections
        .send_to(
            &conn_id,
            ServerMessage::Welcome {
                connection_id: conn_id.clone(),
            },
        )
        .await;
    state.forwarder.request_identity(&conn_id).await;

    let pump = tokio::spawn(pump_outbound(sink, outbound, conn_id.clone()));

    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatch_frame(&state, &conn_id, &text).await,
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; binary frames carry nothing for the relay
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %conn_id, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    pump.abort();
    state.forwarder.disconnect(&conn_id).await;
    state.connections.disconnect(&conn_id).await;
    let live = state.connections.connection_count().await;
    tracing::debug!(
        connection_id = %conn_id,
        live = live,
        "Connection closed"
    );
}

/// Write queued messages to the socket until the channel or the socket closes
async fn pump_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<ServerMessage>,
    conn_id: ConnectionId,
) {
    while let Some(message) = outbound.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(connection_id = %conn_id, error = %e, "Unserializable relay message");
                continue;
            }
        };

        if sink.send(Message::Text(text.into())).await.is_err() {
            tracing::debug!(connection_id = %conn_id, "Socket closed while writing");
            break;
        }
    }
}

async fn dispatch_frame(state: &RelayState, conn_id: &ConnectionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            let reply = ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            };
            state.connections.send_to(conn_id, reply).await;
            return;
        }
    };

    match message {
        ClientMessage::Identify { data } => {
            state.forwarder.handle_identify(conn_id, &data).await;
        }
        ClientMessage::Event {
            event,
            args,
            ack_id,
        } => {
            state
                .forwarder
                .handle_event(conn_id, event, args, ack_id)
                .await;
        }
        ClientMessage::Ack { ack_id, result } => {
            state.forwarder.handle_ack(conn_id, ack_id, result).await;
        }
        ClientMessage::Ping => {
            state.connections.send_to(conn_id, ServerMessage::Pong).await;
        }
    }
}
