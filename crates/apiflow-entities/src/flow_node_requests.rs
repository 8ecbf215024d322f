//! Side table populating request nodes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flow_node_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub flow_node_id: String,
    pub http_id: Option<String>,
    pub delta_http_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
