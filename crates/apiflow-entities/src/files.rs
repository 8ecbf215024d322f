//! Sidebar file tree
//!
//! `(workspace_id, path_hash)` is unique so a re-import can find the
//! folder or request file it produced earlier.

use apiflow_core::UtcDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::FileContentType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub parent_id: Option<String>,
    pub content_id: Option<String>,
    pub content_type: FileContentType,
    pub name: String,
    pub display_order: i32,
    pub path_hash: Option<String>,
    pub updated_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
