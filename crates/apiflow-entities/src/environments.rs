use apiflow_core::UtcDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::EnvironmentKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "environments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub kind: EnvironmentKind,
    pub created_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::variables::Entity")]
    Variables,
}

impl Related<super::variables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variables.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
