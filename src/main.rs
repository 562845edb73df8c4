//! Relay server entry point

use anyhow::Result;
use pinpoint_relay::config::DEFAULT_LOG_FILTER;
use pinpoint_relay::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = RelayConfig::load()?;
    tracing::info!(
        ack_timeout_ms = config.ack_timeout_ms,
        disconnect_policy = ?config.disconnect_policy,
        "Server started"
    );

    ServerBuilder::new()
        .with_config(config)
        .with_registry(InMemoryLinkRegistry::new())
        .serve()
        .await
}
