//! Test utilities for database integration tests
//!
//! Every [`TestDatabase`] is a private in-memory SQLite database with the
//! full schema applied. The pool is pinned to one connection because each
//! SQLite `:memory:` connection is its own database.

use std::sync::Arc;

use apiflow_core::{DatabaseConfig, Id};
use apiflow_entities::workspaces;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};

use crate::{establish_connection, DbConnection};

pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create a fresh, migrated in-memory database
    pub async fn new() -> anyhow::Result<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        };
        let db = establish_connection(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set up test database: {}", e))?;
        Ok(Self { db })
    }

    /// Create a fresh database that already contains one workspace
    pub async fn with_workspace() -> anyhow::Result<(Self, Id)> {
        let test_db = Self::new().await?;
        let workspace_id = test_db.create_workspace("Test Workspace").await?;
        Ok((test_db, workspace_id))
    }

    pub async fn create_workspace(&self, name: &str) -> anyhow::Result<Id> {
        let id = Id::new();
        workspaces::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.db.as_ref())
        .await?;
        Ok(id)
    }

    pub fn connection(&self) -> Arc<DbConnection> {
        self.db.clone()
    }
}
