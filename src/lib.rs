//! # Pinpoint Relay
//!
//! A rendezvous relay pairing a *requester* and a *responder* under a shared
//! link id. Both peers hold a WebSocket connection to the relay; the
//! requester's named events are forwarded to the responder, and the
//! responder's acknowledgment is carried back as if the peers were directly
//! connected.
//!
//! ## Features
//!
//! - **Link Registry**: link id → requester/responder slots, plus the reverse
//!   connection → link index
//! - **Direction Enforcement**: only the requester may initiate
//! - **Acknowledgment Bridge**: explicit correlation tokens with a bounded wait
//! - **Origin Allow-List**: prefix-matched origins for HTTP and WebSocket
//! - **Configuration-Based**: YAML config with `PORT` override
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pinpoint_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_config(RelayConfig::load()?)
//!         .with_registry(InMemoryLinkRegistry::new())
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod relay;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ConfigError, ConnectionId, LinkId, LinkRegistry, PeerSlots, Registration, RelayError,
        Role,
    };

    // === Relay ===
    pub use crate::relay::{
        ClientMessage, DispatchOutcome, Forwarder, Handshake, Outbound, PendingAcks,
        ServerMessage,
    };

    // === Storage ===
    pub use crate::storage::InMemoryLinkRegistry;

    // === Config ===
    pub use crate::config::{DisconnectPolicy, RelayConfig};

    // === Server ===
    pub use crate::server::{OriginPolicy, RelayHost, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
}
