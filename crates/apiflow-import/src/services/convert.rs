//! Mapping between the import model and sea-orm active models

use std::str::FromStr;

use apiflow_core::Id;
use apiflow_entities::{
    environments, files, flow_edges, flow_node_noops, flow_node_requests, flow_nodes, flows, http,
    http_asserts, http_body_forms, http_body_raw, http_body_urlencoded, http_headers,
    http_search_params, variables,
};
use apiflow_import_types::{
    Edge, Environment, File, Flow, HttpAssert, HttpBodyRaw, HttpKeyValue, HttpRequest,
    ImportError, ImportResult, NoOpNode, Node, NodeRequest, Variable,
};
use sea_orm::ActiveValue::Set;

fn opt_id(id: Option<Id>) -> Option<String> {
    id.map(|id| id.to_string())
}

pub fn parse_id(raw: &str) -> ImportResult<Id> {
    Id::from_str(raw).map_err(|e| ImportError::Integrity(format!("stored id {}: {}", raw, e)))
}

pub fn http_model(request: &HttpRequest, fingerprint: Option<String>) -> http::ActiveModel {
    http::ActiveModel {
        id: Set(request.id.to_string()),
        workspace_id: Set(request.workspace_id.to_string()),
        parent_folder_id: Set(opt_id(request.parent_folder_id)),
        name: Set(request.name.clone()),
        method: Set(request.method.clone()),
        url: Set(request.url.clone()),
        description: Set(request.description.clone()),
        body_kind: Set(request.body_kind),
        is_delta: Set(request.is_delta),
        delta_parent_id: Set(opt_id(request.delta_parent_id)),
        fingerprint: Set(fingerprint),
        created_at: Set(request.created_at),
        updated_at: Set(request.updated_at),
    }
}

macro_rules! key_value_model {
    ($name:ident, $module:ident) => {
        pub fn $name(row: &HttpKeyValue) -> $module::ActiveModel {
            $module::ActiveModel {
                id: Set(row.id.to_string()),
                http_id: Set(row.http_id.to_string()),
                key: Set(row.key.clone()),
                value: Set(row.value.clone()),
                enabled: Set(row.enabled),
                description: Set(row.description.clone()),
                display_order: Set(row.display_order),
                is_delta: Set(row.is_delta),
            }
        }
    };
}

key_value_model!(header_model, http_headers);
key_value_model!(search_param_model, http_search_params);
key_value_model!(body_form_model, http_body_forms);
key_value_model!(body_urlencoded_model, http_body_urlencoded);

pub fn body_raw_model(body: &HttpBodyRaw) -> http_body_raw::ActiveModel {
    http_body_raw::ActiveModel {
        id: Set(body.id.to_string()),
        http_id: Set(body.http_id.to_string()),
        raw_data: Set(body.raw_data.clone()),
        is_delta: Set(body.is_delta),
    }
}

pub fn assert_model(assert: &HttpAssert) -> http_asserts::ActiveModel {
    http_asserts::ActiveModel {
        id: Set(assert.id.to_string()),
        http_id: Set(assert.http_id.to_string()),
        expression: Set(assert.expression.clone()),
        description: Set(assert.description.clone()),
        enabled: Set(assert.enabled),
        display_order: Set(assert.display_order),
        is_delta: Set(assert.is_delta),
    }
}

pub fn file_model(file: &File) -> files::ActiveModel {
    files::ActiveModel {
        id: Set(file.id.to_string()),
        workspace_id: Set(file.workspace_id.to_string()),
        parent_id: Set(opt_id(file.parent_id)),
        content_id: Set(opt_id(file.content_id)),
        content_type: Set(file.content_type),
        name: Set(file.name.clone()),
        display_order: Set(file.order),
        path_hash: Set(file.path_hash.clone()),
        updated_at: Set(file.updated_at),
    }
}

pub fn flow_model(flow: &Flow) -> flows::ActiveModel {
    flows::ActiveModel {
        id: Set(flow.id.to_string()),
        workspace_id: Set(flow.workspace_id.to_string()),
        name: Set(flow.name.clone()),
        created_at: Set(chrono::Utc::now()),
    }
}

pub fn node_model(node: &Node) -> flow_nodes::ActiveModel {
    flow_nodes::ActiveModel {
        id: Set(node.id.to_string()),
        flow_id: Set(node.flow_id.to_string()),
        name: Set(node.name.clone()),
        kind: Set(node.kind),
        position_x: Set(node.position_x),
        position_y: Set(node.position_y),
    }
}

pub fn node_request_model(node: &NodeRequest) -> flow_node_requests::ActiveModel {
    flow_node_requests::ActiveModel {
        flow_node_id: Set(node.flow_node_id.to_string()),
        http_id: Set(opt_id(node.http_id)),
        delta_http_id: Set(opt_id(node.delta_http_id)),
    }
}

pub fn noop_model(node: &NoOpNode) -> flow_node_noops::ActiveModel {
    flow_node_noops::ActiveModel {
        flow_node_id: Set(node.flow_node_id.to_string()),
        kind: Set(node.kind),
    }
}

pub fn edge_model(edge: &Edge) -> flow_edges::ActiveModel {
    flow_edges::ActiveModel {
        id: Set(edge.id.to_string()),
        flow_id: Set(edge.flow_id.to_string()),
        source_id: Set(edge.source_id.to_string()),
        target_id: Set(edge.target_id.to_string()),
        source_handle: Set(edge.source_handle),
        kind: Set(edge.kind),
    }
}

pub fn environment_model(env: &Environment) -> environments::ActiveModel {
    environments::ActiveModel {
        id: Set(env.id.to_string()),
        workspace_id: Set(env.workspace_id.to_string()),
        name: Set(env.name.clone()),
        kind: Set(env.kind),
        created_at: Set(chrono::Utc::now()),
    }
}

pub fn variable_model(variable: &Variable) -> variables::ActiveModel {
    variables::ActiveModel {
        id: Set(variable.id.to_string()),
        env_id: Set(variable.env_id.to_string()),
        key: Set(variable.key.clone()),
        value: Set(variable.value.clone()),
        enabled: Set(variable.enabled),
        description: Set(variable.description.clone()),
        display_order: Set(variable.order),
    }
}

pub fn environment_from_row(row: &environments::Model) -> ImportResult<Environment> {
    Ok(Environment {
        id: parse_id(&row.id)?,
        workspace_id: parse_id(&row.workspace_id)?,
        name: row.name.clone(),
        kind: row.kind,
    })
}

pub fn variable_from_row(row: &variables::Model) -> ImportResult<Variable> {
    Ok(Variable {
        id: parse_id(&row.id)?,
        env_id: parse_id(&row.env_id)?,
        key: row.key.clone(),
        value: row.value.clone(),
        enabled: row.enabled,
        description: row.description.clone(),
        order: row.display_order,
    })
}

/// Content of a stored child row for clean-delta comparison
pub fn stored_row(key: &str, value: &str, enabled: bool, http_id: Id) -> HttpKeyValue {
    HttpKeyValue {
        id: Id::default(),
        http_id,
        key: key.to_string(),
        value: value.to_string(),
        enabled,
        description: String::new(),
        display_order: 0,
        is_delta: false,
    }
}
