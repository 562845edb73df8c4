//! Identifiers, roles and pairing slots for relay links

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transport-assigned identifier of one live connection
///
/// Only meaningful for the lifetime of the underlying connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh identifier (`conn_<uuid>`)
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application-chosen name of one requester/responder session
///
/// Accepted as opaque: the relay never generates or validates link ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a peer declares during the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May initiate messages
    Requester,
    /// Must only reply
    Responder,
}

impl Role {
    pub fn from_is_requester(is_requester: bool) -> Self {
        if is_requester {
            Role::Requester
        } else {
            Role::Responder
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Requester => f.write_str("Requester"),
            Role::Responder => f.write_str("Responder"),
        }
    }
}

/// Link and role a connection registered under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub link_id: LinkId,
    pub role: Role,
}

impl Registration {
    pub fn new(link_id: LinkId, role: Role) -> Self {
        Self { link_id, role }
    }
}

/// Pairing state of one link
///
/// Each slot holds at most one connection. Assigning a slot silently
/// replaces whatever occupied it before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSlots {
    pub requester: Option<ConnectionId>,
    pub responder: Option<ConnectionId>,
}

impl PeerSlots {
    /// Both roles are occupied
    pub fn is_complete(&self) -> bool {
        self.requester.is_some() && self.responder.is_some()
    }

    /// Put `connection_id` into the slot for `role`, returning the displaced occupant
    pub fn assign(&mut self, role: Role, connection_id: ConnectionId) -> Option<ConnectionId> {
        let slot = match role {
            Role::Requester => &mut self.requester,
            Role::Responder => &mut self.responder,
        };
        slot.replace(connection_id)
    }

    /// Empty the slot for `role` only if it still holds `connection_id`
    pub fn clear_if(&mut self, role: Role, connection_id: &ConnectionId) -> bool {
        let slot = match role {
            Role::Requester => &mut self.requester,
            Role::Responder => &mut self.responder,
        };
        if slot.as_ref() == Some(connection_id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Which slot, if any, `connection_id` currently occupies
    pub fn role_of(&self, connection_id: &ConnectionId) -> Option<Role> {
        if self.requester.as_ref() == Some(connection_id) {
            Some(Role::Requester)
        } else if self.responder.as_ref() == Some(connection_id) {
            Some(Role::Responder)
        } else {
            None
        }
    }
}
