//! In-memory entities produced by translators
//!
//! These mirror the persisted tables but carry typed [`Id`]s. They are
//! created at translation time and may have their ids rewritten when
//! storage deduplicates them against existing rows.

use apiflow_core::{Id, UtcDateTime};
use apiflow_entities::types::{
    BodyKind, EdgeHandle, EdgeKind, EnvironmentKind, FileContentType, NoOpKind, NodeKind,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub id: Id,
    pub workspace_id: Id,
    pub parent_folder_id: Option<Id>,
    pub name: String,
    pub method: String,
    pub url: String,
    pub description: String,
    pub body_kind: BodyKind,
    pub is_delta: bool,
    pub delta_parent_id: Option<Id>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// Row shape shared by headers, search params and both form bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpKeyValue {
    pub id: Id,
    pub http_id: Id,
    pub key: String,
    pub value: String,
    pub enabled: bool,
    pub description: String,
    pub display_order: i32,
    pub is_delta: bool,
}

impl HttpKeyValue {
    /// The part of a row that makes it equal to another, ignoring identity
    pub fn same_content(&self, other: &HttpKeyValue) -> bool {
        self.key == other.key && self.value == other.value && self.enabled == other.enabled
    }
}

pub type HttpHeader = HttpKeyValue;
pub type HttpSearchParam = HttpKeyValue;
pub type HttpBodyForm = HttpKeyValue;
pub type HttpBodyUrlEncoded = HttpKeyValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBodyRaw {
    pub id: Id,
    pub http_id: Id,
    pub raw_data: Vec<u8>,
    pub is_delta: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpAssert {
    pub id: Id,
    pub http_id: Id,
    pub expression: String,
    pub description: String,
    pub enabled: bool,
    pub display_order: i32,
    pub is_delta: bool,
}

/// A row of the sidebar file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: Id,
    pub workspace_id: Id,
    pub parent_id: Option<Id>,
    pub content_id: Option<Id>,
    pub content_type: FileContentType,
    pub name: String,
    pub order: i32,
    pub path_hash: Option<String>,
    pub updated_at: UtcDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: Id,
    pub workspace_id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,
    pub flow_id: Id,
    pub name: String,
    pub kind: NodeKind,
    pub position_x: f64,
    pub position_y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub flow_node_id: Id,
    pub http_id: Option<Id>,
    pub delta_http_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoOpNode {
    pub flow_node_id: Id,
    pub kind: NoOpKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Id,
    pub flow_id: Id,
    pub source_id: Id,
    pub target_id: Id,
    pub source_handle: EdgeHandle,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: Id,
    pub workspace_id: Id,
    pub name: String,
    pub kind: EnvironmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: Id,
    pub env_id: Id,
    pub key: String,
    pub value: String,
    pub enabled: bool,
    pub description: String,
    pub order: i32,
}
