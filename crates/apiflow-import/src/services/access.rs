//! Workspace existence and permission checks

use std::sync::Arc;

use apiflow_core::Id;
use apiflow_entities::workspaces;
use apiflow_import_types::{ImportError, ImportResult};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::debug;

/// Decides whether an import may write into a workspace
///
/// Membership and role checks live with the caller; implementations
/// report [`ImportError::PermissionDenied`] for them.
#[async_trait]
pub trait WorkspaceAccess: Send + Sync {
    async fn check(&self, workspace_id: Id) -> ImportResult<()>;
}

/// Only requires the workspace row to exist
pub struct DbWorkspaceAccess {
    db: Arc<DatabaseConnection>,
}

impl DbWorkspaceAccess {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkspaceAccess for DbWorkspaceAccess {
    async fn check(&self, workspace_id: Id) -> ImportResult<()> {
        let workspace = workspaces::Entity::find_by_id(workspace_id.to_string())
            .one(self.db.as_ref())
            .await?;
        match workspace {
            Some(_) => Ok(()),
            None => {
                debug!(%workspace_id, "Import into unknown workspace");
                Err(ImportError::WorkspaceNotFound(workspace_id))
            }
        }
    }
}
