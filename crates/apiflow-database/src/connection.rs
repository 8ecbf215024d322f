//! Database connection management

use std::sync::Arc;

use apiflow_core::{DatabaseConfig, ServiceError, ServiceResult};
use apiflow_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{debug, info};

pub type DbConnection = DatabaseConnection;

/// Connect to the configured database and bring the schema up to date
pub async fn establish_connection(config: &DatabaseConfig) -> ServiceResult<Arc<DbConnection>> {
    if config.url.trim().is_empty() {
        return Err(ServiceError::config("database url", "must not be empty"));
    }
    if config.max_connections == 0 || config.min_connections > config.max_connections {
        return Err(ServiceError::config(
            "connection pool",
            format!(
                "min {} and max {} connections",
                config.min_connections, config.max_connections
            ),
        ));
    }

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );

    let db = Database::connect(opt)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    Migrator::up(&db, None)
        .await
        .map_err(|e| ServiceError::Migration(e.to_string()))?;

    info!("Database connected and migrated");

    Ok(Arc::new(db))
}
