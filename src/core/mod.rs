//! Core types and traits of the relay

pub mod error;
pub mod link;
pub mod registry;

pub use error::{ConfigError, RelayError};
pub use link::{ConnectionId, LinkId, PeerSlots, Registration, Role};
pub use registry::LinkRegistry;
