//! The uniform translator output and the builder translators fill it with

use std::collections::HashMap;

use apiflow_core::{Id, UtcDateTime, WorkspaceId};
use apiflow_entities::types::{
    BodyKind, EdgeHandle, EdgeKind, EnvironmentKind, FileContentType, NoOpKind, NodeKind,
};
use serde::{Deserialize, Serialize};

use crate::format::ImportFormat;
use crate::model::*;
use crate::xhr::extract_domains;

/// Every entity a translator produced, plus detection metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub workspace_id: WorkspaceId,
    pub detected_format: ImportFormat,
    /// Sorted, lowercased, unique hosts of XHR-like requests
    pub domains: Vec<String>,

    pub http_requests: Vec<HttpRequest>,
    pub headers: Vec<HttpHeader>,
    pub search_params: Vec<HttpSearchParam>,
    pub body_forms: Vec<HttpBodyForm>,
    pub body_urlencoded: Vec<HttpBodyUrlEncoded>,
    pub body_raw: Vec<HttpBodyRaw>,
    pub asserts: Vec<HttpAssert>,

    pub files: Vec<File>,

    pub flows: Vec<Flow>,
    pub nodes: Vec<Node>,
    pub request_nodes: Vec<NodeRequest>,
    pub noop_nodes: Vec<NoOpNode>,
    pub edges: Vec<Edge>,

    pub environments: Vec<Environment>,
    pub variables: Vec<Variable>,
}

impl TranslationResult {
    pub fn new(detected_format: ImportFormat, workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            detected_format,
            domains: Vec::new(),
            http_requests: Vec::new(),
            headers: Vec::new(),
            search_params: Vec::new(),
            body_forms: Vec::new(),
            body_urlencoded: Vec::new(),
            body_raw: Vec::new(),
            asserts: Vec::new(),
            files: Vec::new(),
            flows: Vec::new(),
            nodes: Vec::new(),
            request_nodes: Vec::new(),
            noop_nodes: Vec::new(),
            edges: Vec::new(),
            environments: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// The flow whose id is reported back to the caller
    pub fn primary_flow(&self) -> Option<&Flow> {
        self.flows.first()
    }

    pub fn base_requests(&self) -> impl Iterator<Item = &HttpRequest> {
        self.http_requests.iter().filter(|r| !r.is_delta)
    }

    pub fn delta_requests(&self) -> impl Iterator<Item = &HttpRequest> {
        self.http_requests.iter().filter(|r| r.is_delta)
    }

    pub fn is_empty(&self) -> bool {
        self.http_requests.is_empty() && self.flows.is_empty() && self.files.is_empty()
    }
}

/// A key/value row before it is attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueDraft {
    pub key: String,
    pub value: String,
    pub enabled: bool,
    pub description: String,
}

impl KeyValueDraft {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            description: String::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyDraft {
    #[default]
    None,
    Raw(Vec<u8>),
    Form(Vec<KeyValueDraft>),
    UrlEncoded(Vec<KeyValueDraft>),
}

impl BodyDraft {
    pub fn kind(&self) -> BodyKind {
        match self {
            BodyDraft::None => BodyKind::None,
            BodyDraft::Raw(data) if data.is_empty() => BodyKind::None,
            BodyDraft::Raw(_) => BodyKind::Raw,
            BodyDraft::Form(_) => BodyKind::Form,
            BodyDraft::UrlEncoded(_) => BodyKind::UrlEncoded,
        }
    }
}

/// Format-neutral description of one request
///
/// A query string in `url` is split into search params unless `query`
/// is already populated; either way the stored URL carries no query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestDraft {
    pub name: String,
    pub method: String,
    pub url: String,
    pub description: String,
    pub headers: Vec<KeyValueDraft>,
    pub query: Vec<KeyValueDraft>,
    pub body: BodyDraft,
    pub asserts: Vec<String>,
}

impl RequestDraft {
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into().to_uppercase(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(KeyValueDraft::new(key, value));
        self
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.headers.iter().any(|h| h.key.eq_ignore_ascii_case(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRef {
    pub http_id: Id,
    pub file_id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowRef {
    pub flow_id: Id,
    pub start_node_id: Id,
}

/// Incrementally assembles a [`TranslationResult`]
///
/// Folders are memoized by `(parent, name)` so repeated paths share one
/// folder. Every base request gets a content file in its folder.
pub struct TranslationBuilder {
    result: TranslationResult,
    folders: HashMap<(Option<Id>, String), Id>,
    next_order: HashMap<Option<Id>, i32>,
    now: UtcDateTime,
}

impl TranslationBuilder {
    pub fn new(format: ImportFormat, workspace_id: WorkspaceId) -> Self {
        Self {
            result: TranslationResult::new(format, workspace_id),
            folders: HashMap::new(),
            next_order: HashMap::new(),
            now: chrono::Utc::now(),
        }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.result.workspace_id
    }

    pub fn request_count(&self) -> usize {
        self.result.http_requests.len()
    }

    fn take_order(&mut self, parent: Option<Id>) -> i32 {
        let slot = self.next_order.entry(parent).or_insert(0);
        let order = *slot;
        *slot += 1;
        order
    }

    fn push_file(
        &mut self,
        parent: Option<Id>,
        content_id: Option<Id>,
        content_type: FileContentType,
        name: &str,
    ) -> Id {
        let id = Id::new();
        let order = self.take_order(parent);
        self.result.files.push(File {
            id,
            workspace_id: self.result.workspace_id,
            parent_id: parent,
            content_id,
            content_type,
            name: name.to_string(),
            order,
            path_hash: None,
            updated_at: self.now,
        });
        id
    }

    /// Folder `name` under `parent`, created on first use
    pub fn folder(&mut self, parent: Option<Id>, name: &str) -> Id {
        let key = (parent, name.to_string());
        if let Some(id) = self.folders.get(&key) {
            return *id;
        }
        let id = self.push_file(parent, None, FileContentType::Folder, name);
        self.folders.insert(key, id);
        id
    }

    /// Nested folders for `segments`; `None` for an empty path
    pub fn folder_path<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<Id> {
        let mut parent = None;
        for segment in segments {
            let segment = segment.as_ref().trim();
            if segment.is_empty() {
                continue;
            }
            parent = Some(self.folder(parent, segment));
        }
        parent
    }

    /// Add a base request and its content file under `folder`
    pub fn add_request(&mut self, draft: RequestDraft, folder: Option<Id>) -> RequestRef {
        let name = draft.name.clone();
        let http_id = self.push_request(draft, folder, None);
        let file_id = self.push_file(folder, Some(http_id), FileContentType::Http, &name);
        RequestRef { http_id, file_id }
    }

    /// Add a delta overlay of `base`; deltas get no file of their own
    pub fn add_delta(&mut self, base: Id, draft: RequestDraft) -> Id {
        let folder = self
            .result
            .http_requests
            .iter()
            .find(|r| r.id == base)
            .and_then(|r| r.parent_folder_id);
        self.push_request(draft, folder, Some(base))
    }

    fn push_request(
        &mut self,
        draft: RequestDraft,
        folder: Option<Id>,
        delta_parent: Option<Id>,
    ) -> Id {
        let id = Id::new();
        let is_delta = delta_parent.is_some();
        let (url, url_query) = split_query(&draft.url);
        let query = if draft.query.is_empty() {
            url_query
        } else {
            draft.query
        };

        self.result.http_requests.push(HttpRequest {
            id,
            workspace_id: self.result.workspace_id,
            parent_folder_id: folder,
            name: draft.name,
            method: draft.method.to_uppercase(),
            url,
            description: draft.description,
            body_kind: draft.body.kind(),
            is_delta,
            delta_parent_id: delta_parent,
            created_at: self.now,
            updated_at: self.now,
        });

        self.result
            .headers
            .extend(key_values(id, draft.headers, is_delta));
        self.result
            .search_params
            .extend(key_values(id, query, is_delta));

        match draft.body {
            BodyDraft::None => {}
            BodyDraft::Raw(raw_data) => {
                if !raw_data.is_empty() {
                    self.result.body_raw.push(HttpBodyRaw {
                        id: Id::new(),
                        http_id: id,
                        raw_data,
                        is_delta,
                    });
                }
            }
            BodyDraft::Form(rows) => self
                .result
                .body_forms
                .extend(key_values(id, rows, is_delta)),
            BodyDraft::UrlEncoded(rows) => self
                .result
                .body_urlencoded
                .extend(key_values(id, rows, is_delta)),
        }

        for (index, expression) in draft.asserts.into_iter().enumerate() {
            self.result.asserts.push(HttpAssert {
                id: Id::new(),
                http_id: id,
                expression,
                description: String::new(),
                enabled: true,
                display_order: index as i32,
                is_delta,
            });
        }

        id
    }

    /// Add a flow with its start node
    pub fn add_flow(&mut self, name: &str) -> FlowRef {
        let flow_id = Id::new();
        self.result.flows.push(Flow {
            id: flow_id,
            workspace_id: self.result.workspace_id,
            name: name.to_string(),
        });

        let start_node_id = Id::new();
        self.result.nodes.push(Node {
            id: start_node_id,
            flow_id,
            name: "Start".to_string(),
            kind: NodeKind::ManualStart,
            position_x: 0.0,
            position_y: 0.0,
        });
        self.result.noop_nodes.push(NoOpNode {
            flow_node_id: start_node_id,
            kind: NoOpKind::Start,
        });

        FlowRef {
            flow_id,
            start_node_id,
        }
    }

    pub fn add_request_node(
        &mut self,
        flow_id: Id,
        name: &str,
        http_id: Id,
        delta_http_id: Option<Id>,
        position: (f64, f64),
    ) -> Id {
        let id = Id::new();
        self.result.nodes.push(Node {
            id,
            flow_id,
            name: name.to_string(),
            kind: NodeKind::Request,
            position_x: position.0,
            position_y: position.1,
        });
        self.result.request_nodes.push(NodeRequest {
            flow_node_id: id,
            http_id: Some(http_id),
            delta_http_id,
        });
        id
    }

    pub fn add_edge(&mut self, flow_id: Id, source_id: Id, target_id: Id) -> Id {
        let id = Id::new();
        self.result.edges.push(Edge {
            id,
            flow_id,
            source_id,
            target_id,
            source_handle: EdgeHandle::Unspecified,
            kind: EdgeKind::Unspecified,
        });
        id
    }

    pub fn add_environment(&mut self, name: &str, kind: EnvironmentKind) -> Id {
        let id = Id::new();
        self.result.environments.push(Environment {
            id,
            workspace_id: self.result.workspace_id,
            name: name.to_string(),
            kind,
        });
        id
    }

    pub fn add_variable(&mut self, env_id: Id, draft: KeyValueDraft) -> Id {
        let id = Id::new();
        let order = self
            .result
            .variables
            .iter()
            .filter(|v| v.env_id == env_id)
            .count() as i32;
        self.result.variables.push(Variable {
            id,
            env_id,
            key: draft.key,
            value: draft.value,
            enabled: draft.enabled,
            description: draft.description,
            order,
        });
        id
    }

    /// Finish the result; `compute_domains` fills the XHR domain list
    pub fn build(mut self, compute_domains: bool) -> TranslationResult {
        if compute_domains {
            self.result.domains = extract_domains(&self.result.http_requests);
        }
        self.result
    }
}

fn key_values(http_id: Id, rows: Vec<KeyValueDraft>, is_delta: bool) -> Vec<HttpKeyValue> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| HttpKeyValue {
            id: Id::new(),
            http_id,
            key: row.key,
            value: row.value,
            enabled: row.enabled,
            description: row.description,
            display_order: index as i32,
            is_delta,
        })
        .collect()
}

/// Split `url` into its query-less form and decoded query pairs
///
/// Works on text so templated URLs like `{{base}}/x?a=1` split too.
/// Fragments are dropped.
pub fn split_query(url: &str) -> (String, Vec<KeyValueDraft>) {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let Some((base, query)) = without_fragment.split_once('?') else {
        return (without_fragment.to_string(), Vec::new());
    };

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            KeyValueDraft::new(decode_component(key), decode_component(value))
        })
        .collect();

    (base.to_string(), params)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_query_decodes_pairs() {
        let (url, params) = split_query("https://example.com/search?q=hello+world&page=2&flag#top");
        assert_eq!(url, "https://example.com/search");
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], KeyValueDraft::new("q", "hello world"));
        assert_eq!(params[1], KeyValueDraft::new("page", "2"));
        assert_eq!(params[2], KeyValueDraft::new("flag", ""));
    }

    #[test]
    fn test_split_query_handles_templates() {
        let (url, params) = split_query("{{baseUrl}}/users?id={{userId}}");
        assert_eq!(url, "{{baseUrl}}/users");
        assert_eq!(params, vec![KeyValueDraft::new("id", "{{userId}}")]);
    }

    #[test]
    fn test_folders_are_memoized_per_parent() {
        let mut builder = TranslationBuilder::new(ImportFormat::Har, Id::new());
        let a = builder.folder_path(&["com", "example", "api"]);
        let b = builder.folder_path(&["com", "example", "api"]);
        let c = builder.folder_path(&["com", "example", "www"]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let result = builder.build(false);
        // com, example, api, www
        assert_eq!(result.files.len(), 4);
        assert!(result.files.iter().all(|f| f.content_type.is_folder()));
        let www = result.files.iter().find(|f| f.name == "www").unwrap();
        assert_eq!(www.order, 1);
    }

    #[test]
    fn test_add_request_creates_children_and_file() {
        let mut builder = TranslationBuilder::new(ImportFormat::Curl, Id::new());
        let folder = builder.folder_path(&["api"]);
        let mut draft = RequestDraft::new("create user", "post", "https://api.example.com/users?dry=1")
            .header("Content-Type", "application/json");
        draft.body = BodyDraft::Raw(br#"{"name":"a"}"#.to_vec());
        draft.asserts.push("response.status == 201".to_string());
        let created = builder.add_request(draft, folder);

        let result = builder.build(true);
        let request = &result.http_requests[0];
        assert_eq!(request.id, created.http_id);
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://api.example.com/users");
        assert_eq!(request.body_kind, BodyKind::Raw);
        assert_eq!(request.parent_folder_id, folder);
        assert_eq!(result.headers.len(), 1);
        assert_eq!(result.search_params[0].key, "dry");
        assert_eq!(result.body_raw.len(), 1);
        assert_eq!(result.asserts[0].http_id, created.http_id);

        let file = result.files.iter().find(|f| f.id == created.file_id).unwrap();
        assert_eq!(file.content_type, FileContentType::Http);
        assert_eq!(file.content_id, Some(created.http_id));
        assert_eq!(file.parent_id, folder);

        assert_eq!(result.domains, vec!["api.example.com".to_string()]);
    }

    #[test]
    fn test_explicit_query_wins_over_url_query() {
        let mut builder = TranslationBuilder::new(ImportFormat::Har, Id::new());
        let mut draft = RequestDraft::new("q", "GET", "https://example.com/?a=1");
        draft.query.push(KeyValueDraft::new("a", "1"));
        builder.add_request(draft, None);
        let result = builder.build(false);
        assert_eq!(result.search_params.len(), 1);
        assert_eq!(result.http_requests[0].url, "https://example.com/");
    }

    #[test]
    fn test_delta_rows_are_flagged() {
        let mut builder = TranslationBuilder::new(ImportFormat::Har, Id::new());
        let folder = builder.folder_path(&["example"]);
        let draft = RequestDraft::new("r", "GET", "https://example.com/x").header("A", "1");
        let base = builder.add_request(draft.clone(), folder);
        let delta = builder.add_delta(base.http_id, draft);

        let result = builder.build(true);
        let delta_row = result.http_requests.iter().find(|r| r.id == delta).unwrap();
        assert!(delta_row.is_delta);
        assert_eq!(delta_row.delta_parent_id, Some(base.http_id));
        assert_eq!(delta_row.parent_folder_id, folder);
        assert!(result.headers.iter().any(|h| h.http_id == delta && h.is_delta));
        // Only the base request has a file
        assert_eq!(
            result
                .files
                .iter()
                .filter(|f| f.content_type == FileContentType::Http)
                .count(),
            1
        );
        // Plain GET on a non-API host is not XHR-like
        assert!(result.domains.is_empty());
    }

    #[test]
    fn test_flow_has_start_node() {
        let mut builder = TranslationBuilder::new(ImportFormat::Yaml, Id::new());
        let flow = builder.add_flow("smoke");
        let request = builder.add_request(RequestDraft::new("r", "GET", "https://x.dev/"), None);
        let node = builder.add_request_node(flow.flow_id, "r", request.http_id, None, (0.0, 150.0));
        builder.add_edge(flow.flow_id, flow.start_node_id, node);

        let result = builder.build(false);
        assert_eq!(result.primary_flow().map(|f| f.id), Some(flow.flow_id));
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.noop_nodes.len(), 1);
        assert_eq!(result.noop_nodes[0].flow_node_id, flow.start_node_id);
        assert_eq!(result.request_nodes[0].http_id, Some(request.http_id));
        assert_eq!(result.edges[0].target_id, node);
    }
}
