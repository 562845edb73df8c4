//! Configuration loading and management

use crate::core::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port used when neither the config file nor `PORT` sets one
pub const DEFAULT_PORT: u16 = 5000;

/// Budget for a responder's acknowledgment
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 1000;

/// Largest accepted WebSocket message (100 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100_000_000;

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

/// Environment variable pointing at a YAML config file
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "pinpoint_relay=info,tower_http=info";

/// What happens to a connection's registration when it closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Drop the index entry, free the slot it still holds, and fail
    /// forwards waiting on it
    #[default]
    Evict,
    /// Keep everything until the slot is re-registered
    Retain,
}

/// Complete configuration for the relay server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Origin prefixes allowed to connect (e.g. "https://example.org")
    ///
    /// Requests without an `Origin` header are always allowed.
    pub allowed_origins: Vec<String>,

    /// How long a forwarded event waits for the responder's ack
    pub ack_timeout_ms: u64,

    /// Largest accepted WebSocket message in bytes
    pub max_message_size: usize,

    pub disconnect_policy: DisconnectPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: vec![
                "https://data.virtualbrainlab.org".to_string(),
                "https://pinpoint.allenneuraldynamics-test.org".to_string(),
                "https://pinpoint.allenneuraldynamics.org".to_string(),
            ],
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            disconnect_policy: DisconnectPolicy::Evict,
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `RELAY_CONFIG` (if set), then apply `PORT`
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading relay configuration");
                Self::from_yaml_file(&path)?
            }
            Err(_) => Self::default(),
        };

        config.apply_port_override(std::env::var(PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Replace the port with an externally supplied value
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(value) = value else {
            return Ok(());
        };

        self.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort {
                value: value.to_string(),
            })?;
        Ok(())
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::ZeroAckTimeout);
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMessageSize);
        }
        if let Some(origin) = self
            .allowed_origins
            .iter()
            .find(|o| !o.starts_with("http://") && !o.starts_with("https://"))
        {
            return Err(ConfigError::InvalidOrigin {
                origin: origin.clone(),
            });
        }
        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Create a configuration for tests: loopback, ephemeral port
    pub fn default_config() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }
}
