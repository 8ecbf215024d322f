//! HAR 1.2 translator
//!
//! One flow per archive, one request per entry, folders from the reversed
//! host name and request nodes chained from the start node in entry
//! order. Entries that cannot be read are skipped with a warning.

use apiflow_core::WorkspaceId;
use apiflow_import_types::{
    BodyDraft, ImportError, ImportFormat, ImportResult, KeyValueDraft, RequestDraft,
    TranslationBuilder, TranslationResult, Translator,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::{host_folder_segments, request_name};
use crate::value::str_field;

const DEFAULT_FLOW_NAME: &str = "HAR Import";
const NODE_SPACING: f64 = 150.0;

/// Strict shape check: `log.entries` must be a non-empty array
pub fn validate(data: &[u8]) -> ImportResult<()> {
    let doc: Value = serde_json::from_slice(data)
        .map_err(|e| ImportError::translation(ImportFormat::Har, format!("invalid JSON: {}", e)))?;
    entries(&doc).map(|_| ())
}

fn entries(doc: &Value) -> ImportResult<&Vec<Value>> {
    let entries = doc
        .get("log")
        .and_then(|log| log.get("entries"))
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::translation(ImportFormat::Har, "missing log.entries"))?;
    if entries.is_empty() {
        return Err(ImportError::translation(
            ImportFormat::Har,
            "log.entries is empty",
        ));
    }
    Ok(entries)
}

#[derive(Debug, Clone, Default)]
pub struct HarTranslator {
    delta_mode: bool,
}

impl HarTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit an editable delta overlay for every request
    pub fn with_delta_mode(delta_mode: bool) -> Self {
        Self { delta_mode }
    }
}

impl Translator for HarTranslator {
    fn format(&self) -> ImportFormat {
        ImportFormat::Har
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        validate(data)
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let doc: Value = serde_json::from_slice(data).map_err(|e| {
            ImportError::translation(ImportFormat::Har, format!("invalid JSON: {}", e))
        })?;
        let entries = entries(&doc)?;

        let mut builder = TranslationBuilder::new(ImportFormat::Har, workspace_id);
        let flow = builder.add_flow(DEFAULT_FLOW_NAME);
        let mut previous_node = flow.start_node_id;
        let mut skipped = 0usize;
        let mut placed = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            let Some((draft, folder_segments)) = read_entry(entry) else {
                warn!(entry = index, "Skipping malformed HAR entry");
                skipped += 1;
                continue;
            };

            let name = draft.name.clone();
            let folder = builder.folder_path(&folder_segments);
            let delta_draft = self.delta_mode.then(|| draft.clone());
            let created = builder.add_request(draft, folder);
            let delta_id = delta_draft.map(|d| builder.add_delta(created.http_id, d));

            placed += 1;
            let position_y = NODE_SPACING * placed as f64;
            let node = builder.add_request_node(
                flow.flow_id,
                &name,
                created.http_id,
                delta_id,
                (0.0, position_y),
            );
            builder.add_edge(flow.flow_id, previous_node, node);
            previous_node = node;
        }

        if skipped == entries.len() {
            return Err(ImportError::translation(
                ImportFormat::Har,
                "no readable entries",
            ));
        }

        let result = builder.build(true);
        debug!(
            requests = result.http_requests.len(),
            skipped,
            domains = result.domains.len(),
            "Translated HAR archive"
        );
        Ok(result)
    }
}

/// Draft and folder path for one entry; `None` when the entry is unusable
fn read_entry(entry: &Value) -> Option<(RequestDraft, Vec<String>)> {
    let request = entry.get("request")?;
    let method = str_field(request, "method")?.trim();
    let raw_url = str_field(request, "url")?.trim();
    if method.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(raw_url).ok()?;

    let mut draft = RequestDraft::new(request_name(method, &parsed), method, raw_url);
    draft.headers = name_value_pairs(request.get("headers"))
        .into_iter()
        // HTTP/2 pseudo headers are not replayable
        .filter(|h| !h.key.starts_with(':'))
        .collect();
    draft.query = name_value_pairs(request.get("queryString"));
    draft.body = read_post_data(request.get("postData"));

    Some((draft, host_folder_segments(&parsed)))
}

fn name_value_pairs(list: Option<&Value>) -> Vec<KeyValueDraft> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = str_field(item, "name")?;
                    let value = str_field(item, "value").unwrap_or_default();
                    Some(KeyValueDraft::new(name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn read_post_data(post_data: Option<&Value>) -> BodyDraft {
    let Some(post_data) = post_data else {
        return BodyDraft::None;
    };
    let mime = str_field(post_data, "mimeType")
        .unwrap_or_default()
        .to_lowercase();
    let params = name_value_pairs(post_data.get("params"));

    if !params.is_empty() {
        if mime.contains("multipart/form-data") {
            return BodyDraft::Form(params);
        }
        if mime.contains("x-www-form-urlencoded") {
            return BodyDraft::UrlEncoded(params);
        }
    }

    match str_field(post_data, "text") {
        Some(text) if !text.is_empty() => BodyDraft::Raw(text.as_bytes().to_vec()),
        _ => BodyDraft::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_core::Id;
    use apiflow_import_types::{BodyKind, FileContentType, NodeKind};

    const SINGLE: &str = r#"{"log":{"version":"1.2","entries":[{"request":{"method":"GET","url":"https://api.example.com/users"},"response":{"status":200}}]}}"#;

    #[test]
    fn test_single_entry_translation() {
        let result = HarTranslator::new()
            .translate(SINGLE.as_bytes(), Id::new())
            .unwrap();

        assert_eq!(result.http_requests.len(), 1);
        assert_eq!(result.http_requests[0].url, "https://api.example.com/users");
        assert_eq!(result.domains, vec!["api.example.com".to_string()]);

        // com/example/api folders plus one request file
        let folders: Vec<_> = result
            .files
            .iter()
            .filter(|f| f.content_type == FileContentType::Folder)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(folders, vec!["com", "example", "api"]);

        assert_eq!(result.flows.len(), 1);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.edges.len(), 1);
    }

    #[test]
    fn test_requests_chain_from_start_node() {
        let har = r#"{"log":{"entries":[
            {"request":{"method":"GET","url":"https://api.example.com/a"}},
            {"request":{"method":"POST","url":"https://api.example.com/b","postData":{"mimeType":"application/json","text":"{\"x\":1}"}}},
            {"request":{"method":"GET","url":"https://cdn.example.com/app.js"}}
        ]}}"#;
        let result = HarTranslator::new()
            .translate(har.as_bytes(), Id::new())
            .unwrap();

        assert_eq!(result.http_requests.len(), 3);
        assert_eq!(result.edges.len(), 3);
        let start = result.noop_nodes[0].flow_node_id;
        assert_eq!(result.edges[0].source_id, start);
        assert_eq!(result.edges[1].source_id, result.edges[0].target_id);
        assert_eq!(result.edges[2].source_id, result.edges[1].target_id);

        let post = &result.http_requests[1];
        assert_eq!(post.body_kind, BodyKind::Raw);
        // The asset host is not XHR-like
        assert_eq!(result.domains, vec!["api.example.com".to_string()]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let har = r#"{"log":{"entries":[
            {"request":{"method":"GET"}},
            "garbage",
            {"request":{"method":"GET","url":"https://api.example.com/ok"}}
        ]}}"#;
        let result = HarTranslator::new()
            .translate(har.as_bytes(), Id::new())
            .unwrap();
        assert_eq!(result.http_requests.len(), 1);
    }

    #[test]
    fn test_all_entries_malformed_fails() {
        let har = r#"{"log":{"entries":[{"request":{}}]}}"#;
        let err = HarTranslator::new()
            .translate(har.as_bytes(), Id::new())
            .unwrap_err();
        assert!(matches!(err, ImportError::Translation { format: ImportFormat::Har, .. }));
    }

    #[test]
    fn test_empty_entries_fail_validation() {
        assert!(validate(br#"{"log":{"entries":[]}}"#).is_err());
        assert!(validate(br#"{"log":{}}"#).is_err());
        assert!(validate(SINGLE.as_bytes()).is_ok());
    }

    #[test]
    fn test_query_headers_and_form_bodies() {
        let har = r#"{"log":{"entries":[{"request":{
            "method":"POST",
            "url":"https://api.example.com/login?next=%2Fhome",
            "headers":[{"name":":authority","value":"api.example.com"},{"name":"Accept","value":"*/*"}],
            "queryString":[{"name":"next","value":"/home"}],
            "postData":{"mimeType":"application/x-www-form-urlencoded","params":[{"name":"user","value":"bob"}]}
        }}]}}"#;
        let result = HarTranslator::new()
            .translate(har.as_bytes(), Id::new())
            .unwrap();

        assert_eq!(result.http_requests[0].url, "https://api.example.com/login");
        assert_eq!(result.http_requests[0].body_kind, BodyKind::UrlEncoded);
        assert_eq!(result.headers.len(), 1);
        assert_eq!(result.headers[0].key, "Accept");
        assert_eq!(result.search_params.len(), 1);
        assert_eq!(result.search_params[0].value, "/home");
        assert_eq!(result.body_urlencoded[0].key, "user");
    }

    #[test]
    fn test_delta_mode_pairs_every_request() {
        let result = HarTranslator::with_delta_mode(true)
            .translate(SINGLE.as_bytes(), Id::new())
            .unwrap();

        assert_eq!(result.http_requests.len(), 2);
        let base = result.base_requests().next().unwrap();
        let delta = result.delta_requests().next().unwrap();
        assert_eq!(delta.delta_parent_id, Some(base.id));
        assert_eq!(result.request_nodes[0].http_id, Some(base.id));
        assert_eq!(result.request_nodes[0].delta_http_id, Some(delta.id));
        assert_eq!(result.domains, vec!["api.example.com".to_string()]);
    }

    #[test]
    fn test_node_spacing_ignores_deltas() {
        let har = r#"{"log":{"entries":[
            {"request":{"method":"GET","url":"https://api.example.com/a"}},
            {"request":{"method":"GET","url":"https://api.example.com/b"}}
        ]}}"#;
        let plain = HarTranslator::new()
            .translate(har.as_bytes(), Id::new())
            .unwrap();
        let with_deltas = HarTranslator::with_delta_mode(true)
            .translate(har.as_bytes(), Id::new())
            .unwrap();

        let positions = |result: &TranslationResult| -> Vec<f64> {
            result
                .nodes
                .iter()
                .filter(|n| n.kind == NodeKind::Request)
                .map(|n| n.position_y)
                .collect()
        };
        assert_eq!(positions(&plain), vec![NODE_SPACING, 2.0 * NODE_SPACING]);
        assert_eq!(positions(&with_deltas), positions(&plain));
    }
}
