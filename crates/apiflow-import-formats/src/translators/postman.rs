//! Postman Collection v2.1 translator
//!
//! Folders mirror the `item` tree under a root folder named after the
//! collection. Auth is materialized as headers or query params, inherited
//! from the nearest folder (or the collection) that declares it.
//! Collection variables become an environment.

use apiflow_core::WorkspaceId;
use apiflow_import_types::{
    BodyDraft, EnvironmentKind, ImportError, ImportFormat, ImportResult, KeyValueDraft, Id,
    RequestDraft, TranslationBuilder, TranslationResult, Translator,
};
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};

use crate::value::{scalar_to_string, str_field};

const NODE_SPACING: f64 = 150.0;

fn invalid(reason: impl Into<String>) -> ImportError {
    ImportError::translation(ImportFormat::Postman, reason)
}

pub fn validate(data: &[u8]) -> ImportResult<Value> {
    let doc: Value =
        serde_json::from_slice(data).map_err(|e| invalid(format!("invalid JSON: {}", e)))?;
    let info = doc
        .get("info")
        .filter(|i| i.is_object())
        .ok_or_else(|| invalid("missing info object"))?;
    if let Some(schema) = str_field(info, "schema") {
        if !schema.contains("/collection/v2") {
            return Err(invalid(format!("unsupported collection schema {}", schema)));
        }
    }
    if !doc.get("item").map(Value::is_array).unwrap_or(false) {
        return Err(invalid("missing item array"));
    }
    Ok(doc)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostmanTranslator;

impl PostmanTranslator {
    pub fn new() -> Self {
        Self
    }
}

/// Walk state shared across the item tree
struct Walk {
    builder: TranslationBuilder,
    flow_id: Id,
    previous_node: Id,
}

impl Translator for PostmanTranslator {
    fn format(&self) -> ImportFormat {
        ImportFormat::Postman
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        validate(data).map(|_| ())
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let doc = validate(data)?;
        let name = doc
            .get("info")
            .and_then(|info| str_field(info, "name"))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Postman Collection")
            .to_string();

        let mut builder = TranslationBuilder::new(ImportFormat::Postman, workspace_id);
        let root = builder.folder(None, &name);
        let flow = builder.add_flow(&name);
        let mut walk = Walk {
            builder,
            flow_id: flow.flow_id,
            previous_node: flow.start_node_id,
        };

        let items = doc.get("item").and_then(Value::as_array).cloned().unwrap_or_default();
        walk_items(&mut walk, &items, root, doc.get("auth"));

        let variables = key_value_list(doc.get("variable"), "key");
        if !variables.is_empty() {
            let env_id = walk.builder.add_environment(&name, EnvironmentKind::Custom);
            for variable in variables {
                walk.builder.add_variable(env_id, variable);
            }
        }

        if walk.builder.request_count() == 0 {
            return Err(invalid("collection contains no requests"));
        }

        let result = walk.builder.build(true);
        debug!(
            collection = %name,
            requests = result.http_requests.len(),
            variables = result.variables.len(),
            "Translated Postman collection"
        );
        Ok(result)
    }
}

fn walk_items(walk: &mut Walk, items: &[Value], folder: Id, inherited_auth: Option<&Value>) {
    for item in items {
        let item_name = str_field(item, "name").unwrap_or("Untitled").trim();
        let auth = item.get("auth").or(inherited_auth);

        if let Some(children) = item.get("item").and_then(Value::as_array) {
            let sub_folder = walk.builder.folder(Some(folder), item_name);
            walk_items(walk, children, sub_folder, auth);
            continue;
        }

        let Some(request) = item.get("request") else {
            warn!(item = item_name, "Skipping Postman item without request");
            continue;
        };
        let Some(draft) = read_request(item_name, request, auth) else {
            warn!(item = item_name, "Skipping Postman request without URL");
            continue;
        };

        let name = draft.name.clone();
        let created = walk.builder.add_request(draft, Some(folder));
        let position_y = NODE_SPACING * (walk.builder.request_count() as f64);
        let node = walk.builder.add_request_node(
            walk.flow_id,
            &name,
            created.http_id,
            None,
            (0.0, position_y),
        );
        walk.builder.add_edge(walk.flow_id, walk.previous_node, node);
        walk.previous_node = node;
    }
}

fn read_request(name: &str, request: &Value, inherited_auth: Option<&Value>) -> Option<RequestDraft> {
    // A bare string request is just a GET of that URL
    if let Some(url) = request.as_str() {
        return Some(RequestDraft::new(name, "GET", url));
    }

    let method = str_field(request, "method").unwrap_or("GET");
    let url_value = request.get("url")?;
    let (url, query) = read_url(url_value)?;

    let mut draft = RequestDraft::new(name, method, url);
    draft.description = description(request.get("description"));
    draft.headers = key_value_list(request.get("header"), "key");
    draft.query = query;

    let body = request.get("body").filter(|b| {
        !b.get("disabled").and_then(Value::as_bool).unwrap_or(false)
    });
    if let Some(body) = body {
        apply_body(&mut draft, body);
    }

    let auth = request.get("auth").or(inherited_auth);
    if let Some(auth) = auth {
        apply_auth(&mut draft, auth);
    }

    Some(draft)
}

/// URL text and its explicit query params
fn read_url(url: &Value) -> Option<(String, Vec<KeyValueDraft>)> {
    if let Some(raw) = url.as_str() {
        return Some((raw.to_string(), Vec::new()));
    }

    let query = key_value_list(url.get("query"), "key");
    let mut text = match str_field(url, "raw").filter(|r| !r.is_empty()) {
        Some(raw) => raw.split('?').next().unwrap_or_default().to_string(),
        None => assemble_url(url)?,
    };

    // `:name` path variables take their declared value, else a template
    if let Some(variables) = url.get("variable").and_then(Value::as_array) {
        for variable in variables {
            let Some(key) = str_field(variable, "key") else {
                continue;
            };
            let value = variable
                .get("value")
                .and_then(scalar_to_string)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| format!("{{{{{}}}}}", key));
            text = replace_path_variable(&text, key, &value);
        }
    }

    Some((text, query))
}

fn replace_path_variable(url: &str, key: &str, value: &str) -> String {
    let needle = format!(":{}", key);
    url.split('/')
        .map(|segment| if segment == needle { value } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn assemble_url(url: &Value) -> Option<String> {
    let join = |field: &str, separator: &str| -> Option<String> {
        match url.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(|p| scalar_to_string(p).or_else(|| str_field(p, "value").map(str::to_string)))
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            _ => None,
        }
    };

    let host = join("host", ".")?;
    let protocol = str_field(url, "protocol").unwrap_or("https");
    let port = url
        .get("port")
        .and_then(scalar_to_string)
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    let path = join("path", "/").unwrap_or_default();

    let prefix = if host.starts_with("{{") {
        host
    } else {
        format!("{}://{}", protocol, host)
    };
    Some(format!("{}{}/{}", prefix, port, path.trim_start_matches('/')))
}

fn description(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => str_field(other, "content").unwrap_or_default().to_string(),
        None => String::new(),
    }
}

/// `[{key, value, disabled}]` rows; disabled rows are kept but disabled
fn key_value_list(list: Option<&Value>, key_field: &str) -> Vec<KeyValueDraft> {
    list.and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let key = str_field(row, key_field)?;
                    let value = row.get("value").and_then(scalar_to_string).unwrap_or_default();
                    let disabled = row.get("disabled").and_then(Value::as_bool).unwrap_or(false);
                    Some(
                        KeyValueDraft::new(key, value)
                            .enabled(!disabled)
                            .with_description(description(row.get("description"))),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn apply_body(draft: &mut RequestDraft, body: &Value) {
    match str_field(body, "mode").unwrap_or_default() {
        "raw" => {
            let raw = str_field(body, "raw").unwrap_or_default();
            if raw.is_empty() {
                return;
            }
            draft.body = BodyDraft::Raw(raw.as_bytes().to_vec());
            let language = body
                .get("options")
                .and_then(|o| o.get("raw"))
                .and_then(|r| str_field(r, "language"));
            let content_type = match language {
                Some("json") => Some("application/json"),
                Some("xml") => Some("application/xml"),
                Some("html") => Some("text/html"),
                Some("text") => Some("text/plain"),
                Some("javascript") => Some("application/javascript"),
                _ => None,
            };
            if let Some(content_type) = content_type {
                if !draft.has_header("Content-Type") {
                    draft.headers.push(KeyValueDraft::new("Content-Type", content_type));
                }
            }
        }
        "urlencoded" => {
            draft.body = BodyDraft::UrlEncoded(key_value_list(body.get("urlencoded"), "key"));
        }
        "formdata" => {
            let rows = body
                .get("formdata")
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter_map(|row| {
                            let key = str_field(row, "key")?;
                            let value = if str_field(row, "type") == Some("file") {
                                row.get("src").and_then(scalar_to_string).unwrap_or_default()
                            } else {
                                row.get("value").and_then(scalar_to_string).unwrap_or_default()
                            };
                            let disabled =
                                row.get("disabled").and_then(Value::as_bool).unwrap_or(false);
                            Some(KeyValueDraft::new(key, value).enabled(!disabled))
                        })
                        .collect()
                })
                .unwrap_or_default();
            draft.body = BodyDraft::Form(rows);
        }
        "graphql" => {
            let Some(graphql) = body.get("graphql") else {
                return;
            };
            let variables = match graphql.get("variables") {
                Some(Value::String(s)) => serde_json::from_str(s).unwrap_or(Value::Null),
                Some(other) => other.clone(),
                None => Value::Null,
            };
            let payload = serde_json::json!({
                "query": str_field(graphql, "query").unwrap_or_default(),
                "variables": variables,
            });
            draft.body = BodyDraft::Raw(serde_json::to_vec(&payload).unwrap_or_default());
            if !draft.has_header("Content-Type") {
                draft.headers.push(KeyValueDraft::new("Content-Type", "application/json"));
            }
        }
        _ => {}
    }
}

/// Value of an auth attribute (`[{key, value}]`)
fn auth_attribute(auth: &Value, kind: &str, key: &str) -> Option<String> {
    auth.get(kind)?
        .as_array()?
        .iter()
        .find(|attr| str_field(attr, "key") == Some(key))
        .and_then(|attr| attr.get("value"))
        .and_then(scalar_to_string)
}

fn apply_auth(draft: &mut RequestDraft, auth: &Value) {
    match str_field(auth, "type").unwrap_or_default() {
        "bearer" => {
            if let Some(token) = auth_attribute(auth, "bearer", "token") {
                if !draft.has_header("Authorization") {
                    draft
                        .headers
                        .push(KeyValueDraft::new("Authorization", format!("Bearer {}", token)));
                }
            }
        }
        "basic" => {
            let username = auth_attribute(auth, "basic", "username").unwrap_or_default();
            let password = auth_attribute(auth, "basic", "password").unwrap_or_default();
            if !draft.has_header("Authorization") {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                draft
                    .headers
                    .push(KeyValueDraft::new("Authorization", format!("Basic {}", encoded)));
            }
        }
        "apikey" => {
            let Some(key) = auth_attribute(auth, "apikey", "key") else {
                return;
            };
            let value = auth_attribute(auth, "apikey", "value").unwrap_or_default();
            match auth_attribute(auth, "apikey", "in").as_deref() {
                Some("query") => draft.query.push(KeyValueDraft::new(key, value)),
                _ => draft.headers.push(KeyValueDraft::new(key, value)),
            }
        }
        "noauth" | "" => {}
        other => debug!(auth = other, "Ignoring unsupported Postman auth type"),
    }
}
