//! WebSocket exposure: the relay's transport
//!
//! # Architecture
//!
//! ```text
//! Client ──ws──▶ /ws ──▶ ws_handler() ──▶ ConnectionManager (outbound channels)
//!                              │
//!                        ClientMessage
//!                              │
//!                              ▼
//!                          Forwarder ──▶ LinkRegistry
//! ```
//!
//! The wire protocol is documented in [`crate::relay::protocol`].

mod handler;
pub mod manager;

pub use crate::relay::protocol;
pub use manager::ConnectionManager;

use crate::relay::Forwarder;
use crate::server::host::RelayHost;
use crate::server::origin::OriginPolicy;
use anyhow::Result;
use axum::{Router, routing::get};
use std::sync::Arc;

/// State shared by every WebSocket connection
pub struct RelayState {
    pub connections: Arc<ConnectionManager>,
    pub forwarder: Arc<Forwarder>,
    pub origins: Arc<OriginPolicy>,
    pub max_message_size: usize,
}

/// WebSocket API exposure implementation
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(
///     ServerBuilder::new()
///         .with_registry(InMemoryLinkRegistry::new())
///         .build_host()?
/// );
///
/// let app = RestExposure::build_router(vec![])
///     .merge(WebSocketExposure::build_router(host)?);
/// ```
pub struct WebSocketExposure;

impl WebSocketExposure {
    /// Build the WebSocket router from a host
    ///
    /// Creates the `ConnectionManager` and the `Forwarder` wired to the
    /// host's registry, and returns a router with the `/ws` endpoint.
    pub fn build_router(host: Arc<RelayHost>) -> Result<Router> {
        let connections = Arc::new(ConnectionManager::new());

        let forwarder = Forwarder::new(host.registry.clone(), connections.clone())
            .with_ack_timeout(host.config.ack_timeout())
            .with_disconnect_policy(host.config.disconnect_policy);

        let state = Arc::new(RelayState {
            connections,
            forwarder: Arc::new(forwarder),
            origins: host.origins.clone(),
            max_message_size: host.config.max_message_size,
        });

        let router = Router::new()
            .route("/ws", get(handler::ws_handler))
            .with_state(state);

        Ok(router)
    }
}
