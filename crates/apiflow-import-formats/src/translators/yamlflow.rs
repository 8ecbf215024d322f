//! YAML flow translator
//!
//! A YAML flow document declares reusable `requests` and `flows` made of
//! `steps`:
//!
//! ```yaml
//! workspace_name: Shop
//! requests:
//!   - name: list_users
//!     method: GET
//!     url: "{{BASE_URL}}/users"
//!     headers:
//!       Accept: application/json
//! flows:
//!   - name: smoke
//!     steps:
//!       - request:
//!           name: users
//!           use_request: list_users
//!       - request:
//!           name: create
//!           method: POST
//!           url: "{{BASE_URL}}/users"
//!           body: { name: bob }
//!           depends_on: users
//! ```
//!
//! Every step becomes a request node. Steps without `depends_on` start
//! from the flow's start node. The documents are expected to be templated
//! already, so no domains are offered.

use std::collections::{HashMap, HashSet};

use apiflow_core::WorkspaceId;
use apiflow_import_types::{
    BodyDraft, Id, ImportError, ImportFormat, ImportResult, KeyValueDraft, RequestDraft,
    TranslationBuilder, TranslationResult, Translator,
};
use serde_json::Value;
use tracing::debug;

use crate::value::{scalar_to_string, str_field, yaml_to_json};

const NODE_SPACING_X: f64 = 300.0;
const NODE_SPACING_Y: f64 = 150.0;

fn invalid(reason: impl Into<String>) -> ImportError {
    ImportError::translation(ImportFormat::Yaml, reason)
}

/// Parse the document and check it declares at least one flow
pub fn validate(data: &[u8]) -> ImportResult<Value> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_slice(data).map_err(|e| invalid(format!("invalid YAML: {}", e)))?;
    let doc = yaml_to_json(yaml);
    if !doc.is_object() {
        return Err(invalid("document must be a mapping"));
    }
    let flows = doc
        .get("flows")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing flows list"))?;
    if flows.is_empty() {
        return Err(invalid("flows list is empty"));
    }
    if let Some(requests) = doc.get("requests") {
        if !requests.is_array() {
            return Err(invalid("requests must be a list"));
        }
    }
    Ok(doc)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFlowTranslator;

impl YamlFlowTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Translator for YamlFlowTranslator {
    fn format(&self) -> ImportFormat {
        ImportFormat::Yaml
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        validate(data).map(|_| ())
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let doc = validate(data)?;

        let mut templates: HashMap<String, &Value> = HashMap::new();
        for request in doc
            .get("requests")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let name = str_field(request, "name")
                .ok_or_else(|| invalid("request without name"))?;
            if templates.insert(name.to_string(), request).is_some() {
                return Err(invalid(format!("duplicate request name '{}'", name)));
            }
        }

        let mut builder = TranslationBuilder::new(ImportFormat::Yaml, workspace_id);
        let mut flow_names = HashSet::new();

        for flow in doc.get("flows").and_then(Value::as_array).into_iter().flatten() {
            let flow_name = str_field(flow, "name")
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| invalid("flow without name"))?;
            if !flow_names.insert(flow_name.to_string()) {
                return Err(invalid(format!("duplicate flow name '{}'", flow_name)));
            }
            translate_flow(&mut builder, flow_name, flow, &templates)?;
        }

        let result = builder.build(false);
        debug!(
            flows = result.flows.len(),
            requests = result.http_requests.len(),
            edges = result.edges.len(),
            "Translated YAML flow document"
        );
        Ok(result)
    }
}

struct Step<'a> {
    name: String,
    spec: &'a Value,
    depends_on: Vec<String>,
}

fn translate_flow(
    builder: &mut TranslationBuilder,
    flow_name: &str,
    flow: &Value,
    templates: &HashMap<String, &Value>,
) -> ImportResult<()> {
    let steps = flow
        .get("steps")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut parsed = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        parsed.push(read_step(flow_name, index, step)?);
    }

    let folder = builder.folder(None, flow_name);
    let flow_ref = builder.add_flow(flow_name);
    let mut node_ids: HashMap<String, Id> = HashMap::new();
    let mut depth: HashMap<String, usize> = HashMap::new();

    for (index, step) in parsed.iter().enumerate() {
        if node_ids.contains_key(&step.name) {
            return Err(invalid(format!(
                "duplicate step name '{}' in flow '{}'",
                step.name, flow_name
            )));
        }

        let draft = step_request(step, templates)?;
        let created = builder.add_request(draft, Some(folder));

        // Column = longest dependency chain seen so far
        let column = step
            .depends_on
            .iter()
            .filter_map(|d| depth.get(d))
            .max()
            .map(|d| d + 1)
            .unwrap_or(0);
        let node = builder.add_request_node(
            flow_ref.flow_id,
            &step.name,
            created.http_id,
            None,
            (
                NODE_SPACING_X * column as f64,
                NODE_SPACING_Y * (index as f64 + 1.0),
            ),
        );
        node_ids.insert(step.name.clone(), node);
        depth.insert(step.name.clone(), column);
    }

    for step in &parsed {
        let target = node_ids[&step.name];
        if step.depends_on.is_empty() {
            builder.add_edge(flow_ref.flow_id, flow_ref.start_node_id, target);
            continue;
        }
        for dependency in &step.depends_on {
            let source = node_ids.get(dependency).ok_or_else(|| {
                invalid(format!(
                    "step '{}' depends on unknown step '{}'",
                    step.name, dependency
                ))
            })?;
            builder.add_edge(flow_ref.flow_id, *source, target);
        }
    }

    Ok(())
}

fn read_step<'a>(flow_name: &str, index: usize, step: &'a Value) -> ImportResult<Step<'a>> {
    let object = step
        .as_object()
        .ok_or_else(|| invalid(format!("step {} of flow '{}' is not a mapping", index, flow_name)))?;

    // `- request: {...}` or a bare mapping with request fields
    let spec = match object.get("request") {
        Some(inner) if inner.is_object() => inner,
        _ if object.len() == 1 && !object.contains_key("name") => {
            let kind = object.keys().next().map(String::as_str).unwrap_or_default();
            return Err(invalid(format!(
                "unsupported step type '{}' in flow '{}'",
                kind, flow_name
            )));
        }
        _ => step,
    };

    let name = str_field(spec, "name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(format!("step {} of flow '{}' has no name", index, flow_name)))?
        .to_string();

    let depends_on = match spec.get("depends_on") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => {
            return Err(invalid(format!(
                "depends_on of step '{}' must be a name or list, got {}",
                name, other
            )))
        }
    };

    Ok(Step {
        name,
        spec,
        depends_on,
    })
}

/// Request for a step: the referenced template overlaid with step fields
fn step_request(step: &Step, templates: &HashMap<String, &Value>) -> ImportResult<RequestDraft> {
    let template = match str_field(step.spec, "use_request") {
        Some(reference) => Some(*templates.get(reference).ok_or_else(|| {
            invalid(format!(
                "step '{}' uses unknown request '{}'",
                step.name, reference
            ))
        })?),
        None => None,
    };

    let url = lookup(step.spec, template, "url")
        .and_then(scalar_to_string)
        .ok_or_else(|| invalid(format!("step '{}' has no url", step.name)))?;
    let method = lookup(step.spec, template, "method")
        .and_then(scalar_to_string)
        .unwrap_or_else(|| "GET".to_string());

    let mut draft = RequestDraft::new(step.name.clone(), method, url);
    draft.description = lookup(step.spec, template, "description")
        .and_then(scalar_to_string)
        .unwrap_or_default();

    // Headers and params merge: step entries override template entries
    draft.headers = merged_pairs(template.and_then(|t| t.get("headers")), step.spec.get("headers"));
    draft.query = merged_pairs(
        template.and_then(|t| t.get("query_params")),
        step.spec.get("query_params"),
    );

    if let Some(body) = lookup(step.spec, template, "body") {
        draft.body = match body {
            Value::Null => BodyDraft::None,
            Value::String(s) => BodyDraft::Raw(s.as_bytes().to_vec()),
            structured => {
                if !draft.has_header("Content-Type") {
                    draft
                        .headers
                        .push(KeyValueDraft::new("Content-Type", "application/json"));
                }
                BodyDraft::Raw(serde_json::to_vec(structured).unwrap_or_default())
            }
        };
    }

    if let Some(assertions) = lookup(step.spec, template, "assertions").and_then(Value::as_array) {
        draft.asserts = assertions.iter().filter_map(scalar_to_string).collect();
    }

    Ok(draft)
}

fn lookup<'a>(spec: &'a Value, template: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    spec.get(key).or_else(|| template.and_then(|t| t.get(key)))
}

/// Key/value pairs from a map (`{K: V}`) or list (`[{name, value}]`, `"K: V"`)
fn pairs(value: Option<&Value>) -> Vec<KeyValueDraft> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| KeyValueDraft::new(k, scalar_to_string(v).unwrap_or_else(|| v.to_string())))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(line) => {
                    let (k, v) = line.split_once(':')?;
                    Some(KeyValueDraft::new(k.trim(), v.trim()))
                }
                Value::Object(_) => {
                    let key = str_field(item, "name").or_else(|| str_field(item, "key"))?;
                    let value = item.get("value").and_then(scalar_to_string).unwrap_or_default();
                    let enabled = item.get("enabled").and_then(Value::as_bool).unwrap_or(true);
                    Some(KeyValueDraft::new(key, value).enabled(enabled))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn merged_pairs(base: Option<&Value>, overlay: Option<&Value>) -> Vec<KeyValueDraft> {
    let mut merged = pairs(base);
    for row in pairs(overlay) {
        match merged
            .iter()
            .position(|existing| existing.key.eq_ignore_ascii_case(&row.key))
        {
            Some(index) => merged[index] = row,
            None => merged.push(row),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_import_types::{BodyKind, FileContentType};

    const DOC: &str = r#"
workspace_name: Shop
requests:
  - name: list_users
    method: GET
    url: "{{BASE_URL}}/users"
    headers:
      Accept: application/json
flows:
  - name: smoke
    steps:
      - request:
          name: users
          use_request: list_users
          headers:
            - "X-Trace: 1"
      - request:
          name: create
          method: POST
          url: "{{BASE_URL}}/users"
          body:
            name: bob
          depends_on: users
      - request:
          name: audit
          url: "{{BASE_URL}}/audit"
          depends_on: [users, create]
"#;

    fn translate(doc: &str) -> ImportResult<TranslationResult> {
        YamlFlowTranslator::new().translate(doc.as_bytes(), Id::new())
    }

    #[test]
    fn test_steps_become_request_nodes_with_dependency_edges() {
        let result = translate(DOC).unwrap();
        assert!(result.domains.is_empty());
        assert_eq!(result.flows.len(), 1);
        assert_eq!(result.http_requests.len(), 3);
        // start + three request nodes
        assert_eq!(result.nodes.len(), 4);
        // start->users, users->create, users->audit, create->audit
        assert_eq!(result.edges.len(), 4);

        let node = |name: &str| result.nodes.iter().find(|n| n.name == name).unwrap().id;
        let start = result.noop_nodes[0].flow_node_id;
        let has_edge = |s: Id, t: Id| result.edges.iter().any(|e| e.source_id == s && e.target_id == t);
        assert!(has_edge(start, node("users")));
        assert!(has_edge(node("users"), node("create")));
        assert!(has_edge(node("create"), node("audit")));
        assert!(has_edge(node("users"), node("audit")));
    }

    #[test]
    fn test_use_request_merges_template() {
        let result = translate(DOC).unwrap();
        let users = result.http_requests.iter().find(|r| r.name == "users").unwrap();
        assert_eq!(users.url, "{{BASE_URL}}/users");
        assert_eq!(users.method, "GET");
        let keys: Vec<_> = result
            .headers
            .iter()
            .filter(|h| h.http_id == users.id)
            .map(|h| h.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Accept", "X-Trace"]);

        let create = result.http_requests.iter().find(|r| r.name == "create").unwrap();
        assert_eq!(create.body_kind, BodyKind::Raw);
        let body = result.body_raw.iter().find(|b| b.http_id == create.id).unwrap();
        assert_eq!(body.raw_data, br#"{"name":"bob"}"#.to_vec());
    }

    #[test]
    fn test_requests_live_in_flow_folder() {
        let result = translate(DOC).unwrap();
        let folder = result
            .files
            .iter()
            .find(|f| f.content_type == FileContentType::Folder)
            .unwrap();
        assert_eq!(folder.name, "smoke");
        assert!(result
            .http_requests
            .iter()
            .all(|r| r.parent_folder_id == Some(folder.id)));
    }

    #[test]
    fn test_unknown_references_fail() {
        let doc = "flows:\n  - name: f\n    steps:\n      - request:\n          name: a\n          use_request: missing\n";
        assert!(translate(doc).is_err());

        let doc = "flows:\n  - name: f\n    steps:\n      - request:\n          name: a\n          url: http://x\n          depends_on: ghost\n";
        assert!(translate(doc).is_err());
    }

    #[test]
    fn test_unsupported_step_types_fail() {
        let doc = "flows:\n  - name: f\n    steps:\n      - js:\n          name: script\n";
        let err = translate(doc).unwrap_err();
        assert!(err.to_string().contains("unsupported step type"));
    }

    #[test]
    fn test_validate_requires_flows() {
        assert!(validate(b"requests: []\n").is_err());
        assert!(validate(b"flows: []\n").is_err());
        assert!(validate(b"- a\n- b\n").is_err());
    }
}
