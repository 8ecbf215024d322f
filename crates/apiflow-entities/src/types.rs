//! Enumerations shared by the persisted tables and the import model.
//! NOTE: every enum uses db_type = "Text" for SQLite compatibility.

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use utoipa::ToSchema;

/// How the body of an HTTP request is encoded
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    #[default]
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "raw")]
    Raw,
    #[sea_orm(string_value = "form")]
    Form,
    #[sea_orm(string_value = "urlencoded")]
    UrlEncoded,
}

impl BodyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::None => "none",
            BodyKind::Raw => "raw",
            BodyKind::Form => "form",
            BodyKind::UrlEncoded => "urlencoded",
        }
    }
}

impl Display for BodyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a row of the file tree points at
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveActiveEnum, EnumIter, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum FileContentType {
    #[sea_orm(string_value = "folder")]
    Folder,
    #[sea_orm(string_value = "http")]
    Http,
    #[sea_orm(string_value = "http_delta")]
    HttpDelta,
    #[sea_orm(string_value = "flow")]
    Flow,
}

impl FileContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileContentType::Folder => "folder",
            FileContentType::Http => "http",
            FileContentType::HttpDelta => "http_delta",
            FileContentType::Flow => "flow",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileContentType::Folder)
    }
}

impl Display for FileContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flow node variants; variant specific data lives in side tables
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveActiveEnum, EnumIter, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[sea_orm(string_value = "manual_start")]
    ManualStart,
    #[sea_orm(string_value = "request")]
    Request,
    #[sea_orm(string_value = "no_op")]
    NoOp,
}

/// Control role of a no-op node
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveActiveEnum, EnumIter, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum NoOpKind {
    #[sea_orm(string_value = "start")]
    Start,
}

/// Output handle an edge leaves its source node from
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EdgeHandle {
    #[default]
    #[sea_orm(string_value = "unspecified")]
    Unspecified,
    #[sea_orm(string_value = "then")]
    Then,
    #[sea_orm(string_value = "else")]
    Else,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    #[sea_orm(string_value = "unspecified")]
    Unspecified,
    #[sea_orm(string_value = "no_op")]
    NoOp,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    #[default]
    #[sea_orm(string_value = "global")]
    Global,
    #[sea_orm(string_value = "custom")]
    Custom,
}
