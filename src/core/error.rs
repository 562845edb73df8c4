//! Typed errors for the relay
//!
//! None of the relay errors are fatal. Each one is logged where it happens
//! and, when the sender attached a reply sink, answered with an empty
//! acknowledgment.
//!
//! # Error Categories
//!
//! - [`RelayError`]: failures while routing or acknowledging a forwarded event
//! - [`ConfigError`]: invalid configuration values

use crate::core::link::{ConnectionId, LinkId};
use thiserror::Error;

// =============================================================================
// Relay Errors
// =============================================================================

/// Reasons an inbound event is not forwarded or not answered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The connection never completed the handshake
    #[error("Unregistered connection: {connection_id} not found in mapping")]
    UnregisteredConnection { connection_id: ConnectionId },

    /// The link has no requester
    #[error("Connection incomplete. Missing requester on link {link_id}")]
    MissingRequester { link_id: LinkId },

    /// The link has no responder
    #[error("Connection incomplete. Missing responder on link {link_id}")]
    MissingResponder { link_id: LinkId },

    /// A responder tried to initiate a message
    #[error("Responder {connection_id} cannot initiate messages on link {link_id}")]
    ResponderCannotInitiate {
        connection_id: ConnectionId,
        link_id: LinkId,
    },

    /// The connection was displaced from its slot by a newer registration
    #[error("Connection {connection_id} no longer occupies a slot on link {link_id}")]
    StaleRegistration {
        connection_id: ConnectionId,
        link_id: LinkId,
    },

    /// The responder did not acknowledge in time
    #[error("No acknowledgment for '{event}' within {timeout_ms}ms")]
    AckTimeout { event: String, timeout_ms: u64 },

    /// The target connection is gone
    #[error("Connection {connection_id} is closed")]
    TransportClosed { connection_id: ConnectionId },

    /// Registry failure (lock poisoning)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Stable code for logs and clients
    pub fn error_code(&self) -> &'static str {
        match self {
            RelayError::UnregisteredConnection { .. } => "UNREGISTERED_CONNECTION",
            RelayError::MissingRequester { .. } => "MISSING_REQUESTER",
            RelayError::MissingResponder { .. } => "MISSING_RESPONDER",
            RelayError::ResponderCannotInitiate { .. } => "RESPONDER_CANNOT_INITIATE",
            RelayError::StaleRegistration { .. } => "STALE_REGISTRATION",
            RelayError::AckTimeout { .. } => "ACK_TIMEOUT",
            RelayError::TransportClosed { .. } => "TRANSPORT_CLOSED",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Link-state problems, as opposed to transport or internal failures
    pub fn is_link_state(&self) -> bool {
        matches!(
            self,
            RelayError::UnregisteredConnection { .. }
                | RelayError::MissingRequester { .. }
                | RelayError::MissingResponder { .. }
                | RelayError::ResponderCannotInitiate { .. }
                | RelayError::StaleRegistration { .. }
        )
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::Internal(err.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid port '{value}'")]
    InvalidPort { value: String },

    #[error("ack_timeout_ms must be greater than zero")]
    ZeroAckTimeout,

    #[error("max_message_size must be greater than zero")]
    ZeroMessageSize,

    #[error("Invalid allowed origin '{origin}': origins must start with http:// or https://")]
    InvalidOrigin { origin: String },
}
