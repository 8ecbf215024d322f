//! Cross-reference checks for translation results and committed imports

use std::collections::{HashMap, HashSet};

use apiflow_core::Id;
use apiflow_entities::{files, flow_edges, flow_nodes, flows, http};
use apiflow_import_types::{FileContentType, ImportError, ImportResult, TranslationResult};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::warn;

use super::storage::StoredImport;

/// Every broken reference found in one pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Log every finding and surface the first one
    pub fn into_result(self) -> ImportResult<()> {
        let Some(first) = self.errors.first().cloned() else {
            return Ok(());
        };
        for error in &self.errors {
            warn!(error = %error, total = self.errors.len(), "Integrity check finding");
        }
        Err(ImportError::Integrity(first))
    }
}

/// Check that every reference inside `result` resolves inside `result`
pub fn check(result: &TranslationResult) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    let http_ids: HashSet<Id> = result.http_requests.iter().map(|r| r.id).collect();
    let file_kinds: HashMap<Id, FileContentType> =
        result.files.iter().map(|f| (f.id, f.content_type)).collect();
    let flow_ids: HashSet<Id> = result.flows.iter().map(|f| f.id).collect();
    let node_flows: HashMap<Id, Id> = result.nodes.iter().map(|n| (n.id, n.flow_id)).collect();
    let env_ids: HashSet<Id> = result.environments.iter().map(|e| e.id).collect();

    for file in &result.files {
        if let Some(parent) = file.parent_id {
            match file_kinds.get(&parent) {
                Some(FileContentType::Folder) => {}
                Some(other) => report.push(format!(
                    "file {} has a {} file as parent",
                    file.id,
                    other.as_str()
                )),
                None => report.push(format!("file {} parent {} not found", file.id, parent)),
            }
        }
        match (file.content_type, file.content_id) {
            (FileContentType::Folder, Some(content)) => {
                report.push(format!("folder {} points at content {}", file.id, content))
            }
            (FileContentType::Http | FileContentType::HttpDelta, Some(content))
                if !http_ids.contains(&content) =>
            {
                report.push(format!("file {} content {} not found", file.id, content))
            }
            (FileContentType::Http | FileContentType::HttpDelta | FileContentType::Flow, None) => {
                report.push(format!("file {} has no content", file.id))
            }
            _ => {}
        }
    }

    for request in &result.http_requests {
        if request.workspace_id != result.workspace_id {
            report.push(format!("request {} is in another workspace", request.id));
        }
        if let Some(folder) = request.parent_folder_id {
            if file_kinds.get(&folder) != Some(&FileContentType::Folder) {
                report.push(format!("request {} folder {} not found", request.id, folder));
            }
        }
        match (request.is_delta, request.delta_parent_id) {
            (true, None) => report.push(format!("delta request {} has no base", request.id)),
            (_, Some(base)) if !http_ids.contains(&base) => {
                report.push(format!("request {} base {} not found", request.id, base))
            }
            _ => {}
        }
    }

    let children = result
        .headers
        .iter()
        .chain(&result.search_params)
        .chain(&result.body_forms)
        .chain(&result.body_urlencoded)
        .map(|row| (row.id, row.http_id))
        .chain(result.body_raw.iter().map(|b| (b.id, b.http_id)))
        .chain(result.asserts.iter().map(|a| (a.id, a.http_id)));
    for (id, http_id) in children {
        if !http_ids.contains(&http_id) {
            report.push(format!("child row {} request {} not found", id, http_id));
        }
    }

    for node in &result.nodes {
        if !flow_ids.contains(&node.flow_id) {
            report.push(format!("node {} flow {} not found", node.id, node.flow_id));
        }
    }
    for request_node in &result.request_nodes {
        if !node_flows.contains_key(&request_node.flow_node_id) {
            report.push(format!("request node {} not found", request_node.flow_node_id));
        }
        for http_id in [request_node.http_id, request_node.delta_http_id]
            .into_iter()
            .flatten()
        {
            if !http_ids.contains(&http_id) {
                report.push(format!(
                    "request node {} request {} not found",
                    request_node.flow_node_id, http_id
                ));
            }
        }
    }
    for noop in &result.noop_nodes {
        if !node_flows.contains_key(&noop.flow_node_id) {
            report.push(format!("no-op node {} not found", noop.flow_node_id));
        }
    }
    for edge in &result.edges {
        for endpoint in [edge.source_id, edge.target_id] {
            match node_flows.get(&endpoint) {
                Some(flow) if *flow == edge.flow_id => {}
                Some(_) => report.push(format!(
                    "edge {} node {} is in another flow",
                    edge.id, endpoint
                )),
                None => report.push(format!("edge {} node {} not found", edge.id, endpoint)),
            }
        }
    }

    for variable in &result.variables {
        if !env_ids.contains(&variable.env_id) {
            report.push(format!(
                "variable {} environment {} not found",
                variable.key, variable.env_id
            ));
        }
    }

    report
}

async fn count_existing<E, C>(conn: &C, column: E::Column, ids: &HashSet<Id>) -> ImportResult<u64>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let ids: Vec<String> = ids.iter().map(Id::to_string).collect();
    Ok(E::find().filter(column.is_in(ids)).count(conn).await?)
}

/// Re-check a finished import against what storage actually holds
pub async fn verify_committed<C: ConnectionTrait>(
    conn: &C,
    stored: &StoredImport,
) -> ImportResult<()> {
    let mut report = IntegrityReport::default();

    let http_ids: HashSet<Id> = stored.http_ids.values().copied().collect();
    let file_ids: HashSet<Id> = stored.file_ids.values().copied().collect();
    let flow_ids: HashSet<Id> = stored.flow_ids.iter().copied().collect();
    let node_ids: HashSet<Id> = stored.node_ids.iter().copied().collect();
    let edge_ids: HashSet<Id> = stored.edge_ids.iter().copied().collect();

    let checks = [
        ("requests", count_existing::<http::Entity, _>(conn, http::Column::Id, &http_ids).await?, http_ids.len()),
        ("files", count_existing::<files::Entity, _>(conn, files::Column::Id, &file_ids).await?, file_ids.len()),
        ("flows", count_existing::<flows::Entity, _>(conn, flows::Column::Id, &flow_ids).await?, flow_ids.len()),
        ("nodes", count_existing::<flow_nodes::Entity, _>(conn, flow_nodes::Column::Id, &node_ids).await?, node_ids.len()),
        ("edges", count_existing::<flow_edges::Entity, _>(conn, flow_edges::Column::Id, &edge_ids).await?, edge_ids.len()),
    ];

    for (label, found, expected) in checks {
        if found as usize != expected {
            report.push(format!(
                "{} of {} committed {} found",
                found, expected, label
            ));
        }
    }

    report.into_result()
}
