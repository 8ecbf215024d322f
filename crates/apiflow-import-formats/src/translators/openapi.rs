//! OpenAPI 2.0 (Swagger) and 3.x translator
//!
//! Documents may be JSON or YAML. Body examples follow local `#/...`
//! schema references; parameters behind a `$ref` and references into other
//! documents translate without values.

use std::collections::BTreeMap;

use apiflow_core::WorkspaceId;
use apiflow_import_types::{
    BodyDraft, ImportError, ImportFormat, ImportResult, KeyValueDraft, RequestDraft,
    TranslationBuilder, TranslationResult, Translator,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::value::{parse_document, scalar_to_string, str_field};

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];
const JSON_MEDIA_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";
const BASE_URL_PLACEHOLDER: &str = "{{baseUrl}}";
const NODE_SPACING: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecVersion {
    Swagger2,
    OpenApi3,
}

fn invalid(reason: impl Into<String>) -> ImportError {
    ImportError::translation(ImportFormat::OpenApi, reason)
}

/// Parse and check the document shape, returning the parsed document
pub fn validate(data: &[u8]) -> ImportResult<Value> {
    let doc = parse_document(data).ok_or_else(|| invalid("document is neither JSON nor YAML"))?;
    spec_version(&doc)?;
    if !doc.get("paths").map(Value::is_object).unwrap_or(false) {
        return Err(invalid("missing paths object"));
    }
    Ok(doc)
}

fn spec_version(doc: &Value) -> ImportResult<SpecVersion> {
    let version_text = |v: &Value| scalar_to_string(v).unwrap_or_default();
    if let Some(v) = doc.get("swagger") {
        if version_text(v).starts_with('2') {
            return Ok(SpecVersion::Swagger2);
        }
        return Err(invalid(format!("unsupported swagger version {}", v)));
    }
    if let Some(v) = doc.get("openapi") {
        if version_text(v).starts_with('3') {
            return Ok(SpecVersion::OpenApi3);
        }
        return Err(invalid(format!("unsupported openapi version {}", v)));
    }
    Err(invalid("missing swagger/openapi version field"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiTranslator;

impl OpenApiTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Translator for OpenApiTranslator {
    fn format(&self) -> ImportFormat {
        ImportFormat::OpenApi
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        validate(data).map(|_| ())
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let doc = validate(data)?;
        let version = spec_version(&doc)?;
        let title = doc
            .get("info")
            .and_then(|info| str_field(info, "title"))
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("OpenAPI Import")
            .trim()
            .to_string();
        let base_url = match version {
            SpecVersion::Swagger2 => swagger_base_url(&doc),
            SpecVersion::OpenApi3 => server_base_url(&doc),
        };

        let mut builder = TranslationBuilder::new(ImportFormat::OpenApi, workspace_id);
        let root = builder.folder(None, &title);
        let flow = builder.add_flow(&title);
        let mut previous_node = flow.start_node_id;

        let empty = Map::new();
        let paths = doc.get("paths").and_then(Value::as_object).unwrap_or(&empty);

        for (path, path_item) in paths {
            let Some(path_item) = path_item.as_object() else {
                continue;
            };
            let path_params = path_item.get("parameters");

            for method in METHODS {
                let Some(operation) = path_item.get(method).filter(|op| op.is_object()) else {
                    continue;
                };

                let parameters = merge_parameters(path_params, operation.get("parameters"));
                let draft = match version {
                    SpecVersion::Swagger2 => {
                        swagger_operation(&doc, &base_url, path, method, operation, &parameters)
                    }
                    SpecVersion::OpenApi3 => {
                        openapi3_operation(&doc, &base_url, path, method, operation, &parameters)
                    }
                };

                let folder = match first_tag(operation) {
                    Some(tag) => builder.folder(Some(root), tag),
                    None => root,
                };
                let name = draft.name.clone();
                let created = builder.add_request(draft, Some(folder));

                let position_y = NODE_SPACING * (builder.request_count() as f64);
                let node =
                    builder.add_request_node(flow.flow_id, &name, created.http_id, None, (0.0, position_y));
                builder.add_edge(flow.flow_id, previous_node, node);
                previous_node = node;
            }
        }

        if builder.request_count() == 0 {
            return Err(invalid("document declares no operations"));
        }

        let result = builder.build(true);
        debug!(
            title = %title,
            requests = result.http_requests.len(),
            "Translated OpenAPI document"
        );
        Ok(result)
    }
}

fn first_tag(operation: &Value) -> Option<&str> {
    operation
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.first())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn swagger_base_url(doc: &Value) -> String {
    let Some(host) = str_field(doc, "host").filter(|h| !h.is_empty()) else {
        return BASE_URL_PLACEHOLDER.to_string();
    };
    let scheme = doc
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| {
            // Prefer https when offered
            let names: Vec<&str> = schemes.iter().filter_map(Value::as_str).collect();
            names
                .iter()
                .find(|s| **s == "https")
                .or_else(|| names.first())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "https".to_string());
    let base_path = str_field(doc, "basePath").unwrap_or_default();
    format!("{}://{}{}", scheme, host, base_path)
        .trim_end_matches('/')
        .to_string()
}

fn server_base_url(doc: &Value) -> String {
    let Some(server) = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
    else {
        return BASE_URL_PLACEHOLDER.to_string();
    };
    let Some(mut url) = str_field(server, "url").map(str::to_string) else {
        return BASE_URL_PLACEHOLDER.to_string();
    };

    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            if let Some(default) = variable.get("default").and_then(scalar_to_string) {
                url = url.replace(&format!("{{{}}}", name), &default);
            }
        }
    }

    let url = url.trim_end_matches('/').to_string();
    if url.starts_with("http://") || url.starts_with("https://") {
        url
    } else {
        format!("{}{}", BASE_URL_PLACEHOLDER, url)
    }
}

/// Path-level parameters overridden by operation-level ones on `in:name`
fn merge_parameters(path_level: Option<&Value>, operation_level: Option<&Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::new();
    let key = |p: &Value| {
        (
            str_field(p, "in").unwrap_or_default().to_string(),
            str_field(p, "name").unwrap_or_default().to_string(),
        )
    };

    for list in [path_level, operation_level].into_iter().flatten() {
        let Some(items) = list.as_array() else {
            continue;
        };
        for param in items.iter().filter(|p| p.get("in").is_some()) {
            let k = key(param);
            match merged.iter().position(|existing| key(existing) == k) {
                Some(index) => merged[index] = param.clone(),
                None => merged.push(param.clone()),
            }
        }
    }
    merged
}

/// Declared example for a parameter, in order of preference
fn parameter_example(param: &Value) -> Option<String> {
    param
        .get("example")
        .or_else(|| param.get("x-example"))
        .or_else(|| param.get("default"))
        .or_else(|| param.get("schema").and_then(|s| s.get("example")))
        .or_else(|| param.get("schema").and_then(|s| s.get("default")))
        .or_else(|| {
            param
                .get("examples")
                .and_then(Value::as_object)
                .and_then(|examples| examples.values().next())
                .and_then(|example| example.get("value"))
        })
        .and_then(scalar_to_string)
}

fn operation_name(method: &str, path: &str, operation: &Value) -> String {
    str_field(operation, "summary")
        .or_else(|| str_field(operation, "operationId"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", method.to_uppercase(), path))
}

/// Assertion on the lowest numeric 2xx response code
fn success_assertion(operation: &Value) -> Option<String> {
    operation
        .get("responses")
        .and_then(Value::as_object)?
        .keys()
        .filter_map(|code| code.parse::<u16>().ok())
        .filter(|code| (200..300).contains(code))
        .min()
        .map(|code| format!("response.status == {}", code))
}

/// `application/json` when offered, else the lexicographically first type
fn preferred_media_type<'a, I>(types: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = types.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.contains(&JSON_MEDIA_TYPE) {
        return Some(JSON_MEDIA_TYPE.to_string());
    }
    sorted.first().map(|s| s.to_string())
}

/// Base request: URL with substituted path params, query and header params
fn base_draft(
    base_url: &str,
    path: &str,
    method: &str,
    operation: &Value,
    parameters: &[Value],
) -> RequestDraft {
    let mut resolved_path = path.to_string();
    let mut query = Vec::new();
    let mut headers = Vec::new();

    for param in parameters {
        let Some(name) = str_field(param, "name") else {
            continue;
        };
        let value = parameter_example(param);
        match str_field(param, "in").unwrap_or_default() {
            "path" => {
                let replacement = value.unwrap_or_else(|| format!("{{{{{}}}}}", name));
                resolved_path = resolved_path.replace(&format!("{{{}}}", name), &replacement);
            }
            "query" => {
                let required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
                let enabled = required || value.is_some();
                query.push(
                    KeyValueDraft::new(name, value.unwrap_or_default())
                        .enabled(enabled)
                        .with_description(str_field(param, "description").unwrap_or_default()),
                );
            }
            "header" => headers.push(
                KeyValueDraft::new(name, value.unwrap_or_default())
                    .with_description(str_field(param, "description").unwrap_or_default()),
            ),
            _ => {}
        }
    }

    let mut draft = RequestDraft::new(
        operation_name(method, path, operation),
        method,
        format!("{}{}", base_url, resolved_path),
    );
    draft.description = str_field(operation, "description")
        .unwrap_or_default()
        .to_string();
    draft.query = query;
    draft.headers = headers;
    draft.asserts.extend(success_assertion(operation));
    draft
}

fn swagger_operation(
    doc: &Value,
    base_url: &str,
    path: &str,
    method: &str,
    operation: &Value,
    parameters: &[Value],
) -> RequestDraft {
    let mut draft = base_draft(base_url, path, method, operation, parameters);

    let consumes = operation
        .get("consumes")
        .or_else(|| doc.get("consumes"))
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    let body_param = parameters
        .iter()
        .find(|p| str_field(p, "in") == Some("body"));
    let form_params: Vec<&Value> = parameters
        .iter()
        .filter(|p| str_field(p, "in") == Some("formData"))
        .collect();

    if let Some(body_param) = body_param {
        let content_type =
            preferred_media_type(consumes.iter().copied()).unwrap_or_else(|| JSON_MEDIA_TYPE.to_string());
        let example = body_param
            .get("x-example")
            .or_else(|| body_param.get("example"))
            .cloned()
            .or_else(|| {
                body_param
                    .get("schema")
                    .and_then(|schema| SchemaExamples::new(doc).example(schema))
            });
        draft.body = raw_body(&content_type, example.as_ref());
        set_content_type(&mut draft, &content_type);
    } else if !form_params.is_empty() {
        let rows: Vec<KeyValueDraft> = form_params
            .iter()
            .filter_map(|p| {
                let name = str_field(p, "name")?;
                Some(KeyValueDraft::new(name, parameter_example(p).unwrap_or_default()))
            })
            .collect();
        let multipart = consumes.contains(&MULTIPART_FORM)
            || form_params.iter().any(|p| str_field(p, "type") == Some("file"));
        let content_type = if multipart {
            draft.body = BodyDraft::Form(rows);
            MULTIPART_FORM
        } else {
            draft.body = BodyDraft::UrlEncoded(rows);
            FORM_URLENCODED
        };
        set_content_type(&mut draft, content_type);
    }

    draft
}

fn openapi3_operation(
    doc: &Value,
    base_url: &str,
    path: &str,
    method: &str,
    operation: &Value,
    parameters: &[Value],
) -> RequestDraft {
    let mut draft = base_draft(base_url, path, method, operation, parameters);

    let Some(content) = operation
        .get("requestBody")
        .and_then(|body| body.get("content"))
        .and_then(Value::as_object)
    else {
        return draft;
    };
    let Some(content_type) = preferred_media_type(content.keys().map(String::as_str)) else {
        return draft;
    };
    let Some(media) = content.get(&content_type) else {
        return draft;
    };

    let example = media
        .get("example")
        .cloned()
        .or_else(|| {
            media
                .get("examples")
                .and_then(Value::as_object)
                .and_then(|examples| examples.values().next())
                .and_then(|example| example.get("value"))
                .cloned()
        })
        .or_else(|| {
            media
                .get("schema")
                .and_then(|schema| SchemaExamples::new(doc).example(schema))
        });

    draft.body = match content_type.as_str() {
        FORM_URLENCODED => BodyDraft::UrlEncoded(form_rows(example.as_ref())),
        MULTIPART_FORM => BodyDraft::Form(form_rows(example.as_ref())),
        other => raw_body(other, example.as_ref()),
    };
    set_content_type(&mut draft, &content_type);
    draft
}

fn set_content_type(draft: &mut RequestDraft, content_type: &str) {
    if !draft.has_header("Content-Type") {
        draft
            .headers
            .push(KeyValueDraft::new("Content-Type", content_type));
    }
}

fn raw_body(content_type: &str, example: Option<&Value>) -> BodyDraft {
    let Some(example) = example else {
        return BodyDraft::None;
    };
    let bytes = match example {
        Value::String(s) if !content_type.contains("json") => s.as_bytes().to_vec(),
        other => serde_json::to_vec(other).unwrap_or_default(),
    };
    BodyDraft::Raw(bytes)
}

fn form_rows(example: Option<&Value>) -> Vec<KeyValueDraft> {
    example
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(key, value)| {
                    let text = scalar_to_string(value).unwrap_or_else(|| value.to_string());
                    KeyValueDraft::new(key, text)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Example values synthesized from the schemas of one document
///
/// Uses `example`, then `default`, then recurses into object properties
/// and array items. Local `#/...` references are followed; a reference
/// that is already being expanded yields nothing.
struct SchemaExamples<'a> {
    doc: &'a Value,
}

impl<'a> SchemaExamples<'a> {
    fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    fn example(&self, schema: &'a Value) -> Option<Value> {
        self.expand(schema, &mut Vec::new())
    }

    fn expand(&self, schema: &'a Value, expanding: &mut Vec<&'a str>) -> Option<Value> {
        if let Some(reference) = str_field(schema, "$ref") {
            if expanding.contains(&reference) {
                return None;
            }
            let target = reference
                .strip_prefix('#')
                .and_then(|pointer| self.doc.pointer(pointer))?;
            expanding.push(reference);
            let example = self.expand(target, expanding);
            expanding.pop();
            return example;
        }
        if let Some(example) = schema.get("example").or_else(|| schema.get("default")) {
            return Some(example.clone());
        }

        match str_field(schema, "type") {
            Some("array") => {
                let item = self.expand(schema.get("items")?, expanding)?;
                Some(Value::Array(vec![item]))
            }
            Some("object") | None => {
                let properties = schema.get("properties").and_then(Value::as_object)?;
                let mut fields = BTreeMap::new();
                for (name, property) in properties {
                    if let Some(value) = self.expand(property, expanding) {
                        fields.insert(name.clone(), value);
                    }
                }
                if fields.is_empty() {
                    None
                } else {
                    Some(Value::Object(fields.into_iter().collect()))
                }
            }
            _ => schema
                .get("enum")
                .and_then(Value::as_array)
                .and_then(|values| values.first())
                .cloned(),
        }
    }
}
