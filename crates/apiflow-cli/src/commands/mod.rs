pub mod import;
pub mod serve;
pub mod workspace;

pub use import::ImportCommand;
pub use serve::ServeCommand;
pub use workspace::WorkspaceCommand;

use std::sync::Arc;
use std::time::Duration;

use apiflow_core::{DatabaseConfig, ImportConfig, MAX_NAME_LEN, MAX_PAYLOAD_BYTES};
use apiflow_database::DbConnection;
use clap::Args;
use tracing::debug;

/// Database arguments shared by every command
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database connection URL (sqlite:// or postgres://)
    #[arg(
        long,
        default_value = "sqlite://apiflow.db?mode=rwc",
        env = "APIFLOW_DATABASE_URL"
    )]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = 10, env = "APIFLOW_DATABASE_MAX_CONNECTIONS")]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub fn config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::new(self.database_url.clone());
        config.max_connections = self.max_connections.max(1);
        config.min_connections = config.min_connections.min(config.max_connections);
        config
    }

    pub async fn connect(&self) -> anyhow::Result<Arc<DbConnection>> {
        debug!("Initializing database connection...");
        apiflow_database::establish_connection(&self.config())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))
    }
}

/// Import pipeline limits and switches
#[derive(Args, Debug, Clone)]
pub struct ImportConfigArgs {
    /// Maximum payload size in bytes
    #[arg(long, default_value_t = MAX_PAYLOAD_BYTES, env = "APIFLOW_MAX_PAYLOAD_BYTES")]
    pub max_payload_bytes: usize,

    /// Maximum import name length in characters
    #[arg(long, default_value_t = MAX_NAME_LEN, env = "APIFLOW_MAX_NAME_LEN")]
    pub max_name_len: usize,

    /// Seconds allowed for fetching a URL payload
    #[arg(long, default_value_t = 60, env = "APIFLOW_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: u64,

    /// Seconds allowed for a whole import call
    #[arg(long, default_value_t = 1800, env = "APIFLOW_IMPORT_TIMEOUT_SECS")]
    pub import_timeout_secs: u64,

    /// Store an editable delta next to every HAR request
    #[arg(long, env = "APIFLOW_HAR_DELTA_MODE")]
    pub har_delta_mode: bool,

    /// Re-check references against the database after each commit
    #[arg(long, env = "APIFLOW_VERIFY_AFTER_COMMIT")]
    pub verify_after_commit: bool,
}

impl ImportConfigArgs {
    pub fn config(&self) -> ImportConfig {
        ImportConfig {
            max_payload_bytes: self.max_payload_bytes,
            max_name_len: self.max_name_len,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            import_timeout: Duration::from_secs(self.import_timeout_secs),
            har_delta_mode: self.har_delta_mode,
            verify_after_commit: self.verify_after_commit,
        }
    }
}
