use apiflow_core::Id;
use apiflow_entities::workspaces;
use clap::{Args, Subcommand};
use colored::Colorize;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder};
use tracing::info;

use super::DatabaseArgs;

#[derive(Args)]
pub struct WorkspaceCommand {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(subcommand)]
    pub action: WorkspaceAction,
}

#[derive(Subcommand)]
pub enum WorkspaceAction {
    /// Create a workspace to import into
    Create {
        /// Workspace name
        #[arg(long)]
        name: String,
    },
    /// List existing workspaces
    List,
}

impl WorkspaceCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let db = self.database.connect().await?;
            match self.action {
                WorkspaceAction::Create { name } => {
                    let id = create_workspace(db.as_ref(), &name).await?;
                    println!("{} {} ({})", "Created workspace".bright_green(), name.bold(), id);
                }
                WorkspaceAction::List => {
                    let all = workspaces::Entity::find()
                        .order_by_asc(workspaces::Column::Id)
                        .all(db.as_ref())
                        .await?;
                    if all.is_empty() {
                        println!("{}", "No workspaces yet".yellow());
                    }
                    for workspace in all {
                        println!(
                            "{}  {}  {}",
                            workspace.id,
                            workspace.name.bold(),
                            workspace.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                        );
                    }
                }
            }
            Ok(())
        })
    }
}

pub async fn create_workspace(db: &DatabaseConnection, name: &str) -> anyhow::Result<Id> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Workspace name must not be empty");
    }

    let id = Id::new();
    workspaces::ActiveModel {
        id: Set(id.to_string()),
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await?;
    info!(workspace_id = %id, name, "Workspace created");
    Ok(id)
}
