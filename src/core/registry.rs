//! Link registry trait

use crate::core::link::{ConnectionId, LinkId, PeerSlots, Registration, Role};
use anyhow::Result;
use async_trait::async_trait;

/// Pairing state shared by every connection task
///
/// Holds the link id -> slots mapping and the reverse connection id -> link
/// index. Implementations must update both sides of a registration
/// atomically.
#[async_trait]
pub trait LinkRegistry: Send + Sync {
    /// Put `connection_id` into the `role` slot of `link_id`
    ///
    /// Creates the link record if needed and replaces any previous occupant
    /// of that slot. The displaced connection keeps its index entry. If
    /// `connection_id` was registered elsewhere and still holds that old
    /// slot, the old slot is cleared.
    async fn register(
        &self,
        connection_id: &ConnectionId,
        link_id: &LinkId,
        role: Role,
    ) -> Result<()>;

    /// Link and role a connection registered under
    async fn resolve(&self, connection_id: &ConnectionId) -> Result<Option<Registration>>;

    /// Current pairing of a link (both slots empty for an unknown link)
    async fn peer_slots(&self, link_id: &LinkId) -> Result<PeerSlots>;

    /// Forget a connection
    ///
    /// Removes its index entry and clears its slot if it still holds it.
    /// Returns the registration that was removed.
    async fn unregister(&self, connection_id: &ConnectionId) -> Result<Option<Registration>>;

    /// Number of link records ever created
    async fn link_count(&self) -> Result<usize>;

    /// Number of connections in the reverse index
    async fn connection_count(&self) -> Result<usize>;
}
