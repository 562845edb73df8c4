//! Registration handshake payload

use crate::core::{LinkId, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity a peer declares in answer to the identity request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub pinpoint_id: String,
    pub is_requester: bool,
}

/// Accepted shapes: `{"pinpoint_id": .., "is_requester": ..}` or the older
/// `[pinpoint_id, is_requester]` tuple
#[derive(Deserialize)]
#[serde(untagged)]
enum HandshakeRepr {
    Named(Handshake),
    Tuple(String, bool),
}

impl From<HandshakeRepr> for Handshake {
    fn from(repr: HandshakeRepr) -> Self {
        match repr {
            HandshakeRepr::Named(handshake) => handshake,
            HandshakeRepr::Tuple(pinpoint_id, is_requester) => Handshake {
                pinpoint_id,
                is_requester,
            },
        }
    }
}

impl Handshake {
    /// Parse a handshake answer
    ///
    /// The payload may be the object itself or a JSON string encoding it.
    /// Returns `None` for anything malformed; the caller leaves the
    /// connection unregistered.
    pub fn from_value(value: &Value) -> Option<Self> {
        let repr = match value {
            Value::String(text) => serde_json::from_str::<HandshakeRepr>(text).ok()?,
            other => HandshakeRepr::deserialize(other).ok()?,
        };
        Some(repr.into())
    }

    pub fn link_id(&self) -> LinkId {
        LinkId::new(self.pinpoint_id.clone())
    }

    pub fn role(&self) -> Role {
        Role::from_is_requester(self.is_requester)
    }
}
