//! In-memory implementation of LinkRegistry

use crate::core::{ConnectionId, LinkId, LinkRegistry, PeerSlots, Registration, Role};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct RegistryState {
    links: HashMap<LinkId, PeerSlots>,
    index: HashMap<ConnectionId, Registration>,
}

/// In-memory link registry
///
/// One `RwLock` guards both maps so a registration never leaves the index
/// and the slots out of step. State lives for the life of the process.
#[derive(Clone)]
pub struct InMemoryLinkRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl InMemoryLinkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
        }
    }
}

impl Default for InMemoryLinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkRegistry for InMemoryLinkRegistry {
    async fn register(
        &self,
        connection_id: &ConnectionId,
        link_id: &LinkId,
        role: Role,
    ) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let state = &mut *guard;

        if let Some(previous) = state.index.get(connection_id)
            && (previous.link_id != *link_id || previous.role != role)
            && let Some(slots) = state.links.get_mut(&previous.link_id)
        {
            slots.clear_if(previous.role, connection_id);
        }

        let displaced = state
            .links
            .entry(link_id.clone())
            .or_default()
            .assign(role, connection_id.clone());

        if let Some(displaced) = displaced.filter(|d| d != connection_id) {
            tracing::debug!(
                link_id = %link_id,
                role = %role,
                displaced = %displaced,
                "Slot reassigned, previous occupant orphaned"
            );
        }

        state.index.insert(
            connection_id.clone(),
            Registration::new(link_id.clone(), role),
        );

        Ok(())
    }

    async fn resolve(&self, connection_id: &ConnectionId) -> Result<Option<Registration>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state.index.get(connection_id).cloned())
    }

    async fn peer_slots(&self, link_id: &LinkId) -> Result<PeerSlots> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state.links.get(link_id).cloned().unwrap_or_default())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Result<Option<Registration>> {
        let mut guard = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let state = &mut *guard;

        let Some(registration) = state.index.remove(connection_id) else {
            return Ok(None);
        };

        if let Some(slots) = state.links.get_mut(&registration.link_id) {
            slots.clear_if(registration.role, connection_id);
        }

        Ok(Some(registration))
    }

    async fn link_count(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state.links.len())
    }

    async fn connection_count(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(state.index.len())
    }
}
