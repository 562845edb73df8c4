//! Integration tests for loading relay configuration from YAML files

use pinpoint_relay::prelude::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
host: 127.0.0.1
port: 8080
allowed_origins:
  - https://lab.example.org
ack_timeout_ms: 2500
max_message_size: 1048576
disconnect_policy: retain
"#,
    );

    let config = RelayConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.allowed_origins, vec!["https://lab.example.org"]);
    assert_eq!(config.ack_timeout(), Duration::from_millis(2500));
    assert_eq!(config.max_message_size, 1_048_576);
    assert_eq!(config.disconnect_policy, DisconnectPolicy::Retain);
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let file = write_config("port: 9000\n");

    let config = RelayConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    let defaults = RelayConfig::default();

    assert_eq!(config.port, 9000);
    assert_eq!(config.host, defaults.host);
    assert_eq!(config.allowed_origins, defaults.allowed_origins);
    assert_eq!(config.ack_timeout_ms, defaults.ack_timeout_ms);
    assert_eq!(config.disconnect_policy, DisconnectPolicy::Evict);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let file = write_config("ack_timeout_ms: 0\n");

    let err = RelayConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap_err();
    assert!(err.downcast_ref::<ConfigError>().is_some());
}

#[test]
fn test_missing_config_file() {
    assert!(RelayConfig::from_yaml_file("/nonexistent/relay.yaml").is_err());
}

#[test]
fn test_port_override_applies_after_file() {
    let file = write_config("port: 9000\n");

    let mut config = RelayConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    config.apply_port_override(Some("7000")).unwrap();
    assert_eq!(config.port, 7000);

    let err = config.apply_port_override(Some("seven")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPort { .. }));
    assert_eq!(config.port, 7000);
}
