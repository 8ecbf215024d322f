//! HTTP requests; base and delta rows share this table

use apiflow_core::UtcDateTime;
use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

use crate::types::BodyKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "http")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub parent_folder_id: Option<String>,
    pub name: String,
    pub method: String,
    pub url: String,
    pub description: String,
    pub body_kind: BodyKind,
    pub is_delta: bool,
    pub delta_parent_id: Option<String>,
    /// Content fingerprint used to deduplicate re-imports
    pub fingerprint: Option<String>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::http_headers::Entity")]
    Headers,
    #[sea_orm(has_many = "super::http_search_params::Entity")]
    SearchParams,
    #[sea_orm(has_many = "super::http_body_forms::Entity")]
    BodyForms,
    #[sea_orm(has_many = "super::http_body_urlencoded::Entity")]
    BodyUrlEncoded,
    #[sea_orm(has_many = "super::http_body_raw::Entity")]
    BodyRaw,
    #[sea_orm(has_many = "super::http_asserts::Entity")]
    Asserts,
}

impl Related<super::http_headers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Headers.def()
    }
}

impl Related<super::http_search_params::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchParams.def()
    }
}

impl Related<super::http_body_forms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BodyForms.def()
    }
}

impl Related<super::http_body_urlencoded::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BodyUrlEncoded.def()
    }
}

impl Related<super::http_body_raw::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BodyRaw.def()
    }
}

impl Related<super::http_asserts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asserts.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}
