//! Configuration management utilities

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound for import payloads and fetched documents (50 MiB)
pub const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Upper bound for import names
pub const MAX_NAME_LEN: usize = 255;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

/// Limits and switches for the import pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Maximum accepted payload size in bytes
    pub max_payload_bytes: usize,
    /// Maximum accepted import name length in characters
    pub max_name_len: usize,
    /// Deadline for fetching a URL payload
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,
    /// Deadline for a whole import call
    #[serde(with = "duration_secs")]
    pub import_timeout: Duration,
    /// Emit a base + delta request pair per HAR entry
    pub har_delta_mode: bool,
    /// Re-run the integrity check against committed storage
    pub verify_after_commit: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            max_name_len: MAX_NAME_LEN,
            fetch_timeout: Duration::from_secs(60),
            import_timeout: Duration::from_secs(30 * 60),
            har_delta_mode: false,
            verify_after_commit: false,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
