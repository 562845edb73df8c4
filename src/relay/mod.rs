//! Pairing-and-forwarding protocol
//!
//! # Architecture
//!
//! ```text
//! requester ──event──▶ Forwarder ──resolve──▶ LinkRegistry
//!                          │
//!                   direction check
//!                          │
//!                          ▼
//!          Outbound::deliver(responder, event + sender id)
//!                          │
//! requester ◀──ack── PendingAcks ◀──ack── responder
//! ```

pub mod forwarder;
pub mod handshake;
pub mod pending;
pub mod protocol;

pub use forwarder::{DispatchOutcome, Forwarder};
pub use handshake::Handshake;
pub use pending::PendingAcks;
pub use protocol::{ClientMessage, ServerMessage};

use crate::core::{ConnectionId, RelayError};
use async_trait::async_trait;

/// Identity event name used by legacy clients; never forwarded
///
/// The identity request on the wire is `{"type":"identify"}`.
pub const HANDSHAKE_EVENT: &str = "get_pinpoint_id";

/// Event names that are never relayed: the handshake and the transport's
/// own lifecycle events
pub const RESERVED_EVENTS: &[&str] = &[
    HANDSHAKE_EVENT,
    "identify",
    "connect",
    "connection",
    "disconnect",
    "disconnecting",
    "error",
];

pub fn is_reserved_event(event: &str) -> bool {
    RESERVED_EVENTS.contains(&event)
}

/// Directed delivery to one live connection
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Queue `message` for `connection_id`
    ///
    /// Fails with [`RelayError::TransportClosed`] when the connection is gone.
    async fn deliver(
        &self,
        connection_id: &ConnectionId,
        message: ServerMessage,
    ) -> Result<(), RelayError>;
}
