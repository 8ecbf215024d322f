//! Side table populating no-op nodes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::NoOpKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flow_node_noops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub flow_node_id: String,
    pub kind: NoOpKind,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
