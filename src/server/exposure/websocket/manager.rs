//! Connection manager for WebSocket clients
//!
//! The `ConnectionManager` assigns connection ids and holds the outbound
//! channel of every live connection. It is the relay's directed-delivery
//! primitive: the forwarder hands it a connection id and a message, and the
//! connection's write loop pushes the message onto the socket.
//!
//! # Architecture
//!
//! ```text
//! Forwarder ──deliver(conn_id, msg)──▶ ConnectionManager
//!                                            │
//!                                  mpsc channel per connection
//!                                            │
//!                                            ▼
//!                                  write loop ──▶ WebSocket
//! ```

use crate::core::{ConnectionId, RelayError};
use crate::relay::{Outbound, ServerMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};

/// Manages all active WebSocket connections
///
/// Thread-safe via `RwLock`: reads (delivery) are frequent, writes
/// (connect/disconnect) are infrequent.
pub struct ConnectionManager {
    /// Sender to each connection's write loop, indexed by connection ID
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Returns a tuple of (connection_id, receiver) where the receiver
    /// will receive `ServerMessage`s to forward to the client.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections
            .write()
            .await
            .insert(connection_id.clone(), tx);

        tracing::info!(connection_id = %connection_id, "Service connected");

        (connection_id, rx)
    }

    /// Remove a connection when the client disconnects
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.connections.write().await.remove(connection_id);
        tracing::debug!(connection_id = %connection_id, "WebSocket client removed");
    }

    /// Send a message to a specific connection, ignoring closed connections
    pub async fn send_to(&self, connection_id: &ConnectionId, message: ServerMessage) {
        if let Err(e) = self.deliver(connection_id, message).await {
            tracing::debug!(connection_id = %connection_id, error = %e, "Message dropped");
        }
    }

    /// Get the number of active connections (for monitoring)
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Outbound for ConnectionManager {
    async fn deliver(
        &self,
        connection_id: &ConnectionId,
        message: ServerMessage,
    ) -> Result<(), RelayError> {
        let connections = self.connections.read().await;
        let closed = || RelayError::TransportClosed {
            connection_id: connection_id.clone(),
        };

        let tx = connections.get(connection_id).ok_or_else(closed)?;
        // A send error means the write loop is gone (client disconnected)
        tx.send(message).map_err(|_| closed())
    }
}
