//! Server host for transport-agnostic relay state
//!
//! The host is the single owner of the relay's shared state. Exposures
//! (REST health checks, the WebSocket endpoint) are built from it.

use crate::config::RelayConfig;
use crate::core::LinkRegistry;
use crate::server::origin::OriginPolicy;
use anyhow::Result;
use std::sync::Arc;

/// Host context containing all relay state
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(RelayHost::from_builder_components(
///     RelayConfig::default(),
///     Arc::new(InMemoryLinkRegistry::new()),
/// )?);
///
/// let app = RestExposure::build_router(vec![])
///     .merge(WebSocketExposure::build_router(host)?);
/// ```
pub struct RelayHost {
    /// Validated configuration
    pub config: Arc<RelayConfig>,

    /// Pairing state shared by all connections
    pub registry: Arc<dyn LinkRegistry>,

    /// Origins allowed to reach the relay
    pub origins: Arc<OriginPolicy>,
}

impl RelayHost {
    /// Build the host from builder components
    ///
    /// Fails if the configuration does not validate.
    pub fn from_builder_components(
        config: RelayConfig,
        registry: Arc<dyn LinkRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let origins = Arc::new(OriginPolicy::new(config.allowed_origins.clone()));

        Ok(Self {
            config: Arc::new(config),
            registry,
            origins,
        })
    }
}
