use std::time::Duration;

use apiflow_core::config::{DatabaseConfig, ImportConfig, MAX_PAYLOAD_BYTES};

#[test]
fn test_database_config_serialization() {
    let config = DatabaseConfig::new("sqlite::memory:");

    let serialized = serde_json::to_string(&config).unwrap();
    assert!(serialized.contains("sqlite::memory:"));

    let deserialized: DatabaseConfig = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized.url, config.url);
    assert_eq!(deserialized.max_connections, 10);
    assert_eq!(deserialized.min_connections, 1);
}

#[test]
fn test_import_config_defaults() {
    let config = ImportConfig::default();

    assert_eq!(config.max_payload_bytes, MAX_PAYLOAD_BYTES);
    assert_eq!(config.max_payload_bytes, 52_428_800);
    assert_eq!(config.max_name_len, 255);
    assert_eq!(config.fetch_timeout, Duration::from_secs(60));
    assert_eq!(config.import_timeout, Duration::from_secs(1800));
    assert!(!config.har_delta_mode);
}

#[test]
fn test_import_config_partial_deserialization_keeps_defaults() {
    let config: ImportConfig =
        serde_json::from_str(r#"{"fetch_timeout": 5, "har_delta_mode": true}"#).unwrap();

    assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    assert!(config.har_delta_mode);
    assert_eq!(config.import_timeout, Duration::from_secs(1800));
}
