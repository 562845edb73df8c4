//! Relay message protocol definitions
//!
//! Defines the JSON messages exchanged between peers and the relay.
//!
//! ## Client → Server Messages
//!
//! ```json
//! // Answer to the identity request
//! {"type": "identify", "data": {"pinpoint_id": "abc", "is_requester": true}}
//!
//! // Application event, optionally asking for a reply
//! {"type": "event", "event": "move", "args": [10, 20], "ack_id": 1}
//!
//! // Responder answering a forwarded event
//! {"type": "ack", "ack_id": 42, "result": "done"}
//!
//! // Keepalive
//! {"type": "ping"}
//! ```
//!
//! ## Server → Client Messages
//!
//! ```json
//! // Connection accepted
//! {"type": "welcome", "connection_id": "conn_..."}
//!
//! // Identity request
//! {"type": "identify"}
//!
//! // Registration confirmed
//! {"type": "registered", "link_id": "abc", "role": "requester"}
//!
//! // Forwarded event (requester connection id prepended to args)
//! {"type": "event", "event": "move", "args": ["conn_...", 10, 20], "ack_id": 42}
//!
//! // Reply to an event that carried an ack_id (result null on failure)
//! {"type": "ack", "ack_id": 1, "result": "done"}
//!
//! // Keepalive response
//! {"type": "pong"}
//!
//! // Unparseable frame
//! {"type": "error", "message": "Invalid message: ..."}
//! ```

use crate::core::{ConnectionId, LinkId, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Answer to the identity request
    Identify {
        /// Raw handshake payload, parsed leniently by `Handshake::from_value`
        #[serde(default)]
        data: Value,
    },
    /// Application event to relay
    Event {
        /// Event name, preserved verbatim
        event: String,
        /// Positional payload
        #[serde(default)]
        args: Vec<Value>,
        /// Reply sink; present when the sender wants an answer
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack_id: Option<u64>,
    },
    /// Responder's answer to a forwarded event
    Ack {
        /// Correlation token from the forwarded event
        ack_id: u64,
        #[serde(default)]
        result: Value,
    },
    /// Keepalive ping
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message on connection
    Welcome {
        /// Unique connection ID
        connection_id: ConnectionId,
    },
    /// Request for the peer's link id and role
    Identify,
    /// Handshake accepted
    Registered { link_id: LinkId, role: Role },
    /// Event relayed from the requester
    Event {
        event: String,
        args: Vec<Value>,
        /// Token to echo back in an `ack`, when a reply is awaited
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack_id: Option<u64>,
    },
    /// Answer to an event the client sent with an `ack_id`
    Ack {
        ack_id: u64,
        /// `None` signals failure without data
        result: Option<String>,
    },
    /// Keepalive response
    Pong,
    /// Error message
    Error {
        /// Human-readable error description
        message: String,
    },
}

impl ServerMessage {
    /// Acknowledgment carrying no result
    pub fn empty_ack(ack_id: u64) -> Self {
        ServerMessage::Ack {
            ack_id,
            result: None,
        }
    }
}

/// Render a responder's acknowledgment the way requesters expect it
///
/// Strings pass through unquoted, `null` means no result, anything else is
/// rendered as compact JSON.
pub fn stringify_result(result: Value) -> Option<String> {
    match result {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
