//! Confidence-scored payload format detection
//!
//! Every candidate format gets a score in `[0, 1]` built from a cheap
//! regex pre-screen, key presence, a structural parse and negative
//! signals. The highest score wins; anything below [`MIN_CONFIDENCE`] is
//! `Unknown`. Scores are advisory: [`FormatDetector::validate_format`] is
//! the authoritative gate before translation.

use apiflow_import_types::{ImportFormat, ImportResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::translators;
use crate::value::yaml_to_json;

/// Scores below this threshold yield [`ImportFormat::Unknown`]
pub const MIN_CONFIDENCE: f64 = 0.3;

static HAR_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""log"\s*:"#).expect("valid regex"));
static POSTMAN_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)getpostman\.com|"_postman_id"|"item"\s*:"#).expect("valid regex")
});
static OPENAPI_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)["']?(openapi|swagger)["']?\s*:"#).expect("valid regex"));
static CURL_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*curl(\s|$)").expect("valid regex"));
static YAML_FLOW_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(flows|requests)\s*:").expect("valid regex"));

fn prescreen(pattern: &Regex, text: &str) -> bool {
    pattern.is_match(text)
}

/// Outcome of [`FormatDetector::detect`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub format: ImportFormat,
    pub confidence: f64,
}

/// Parsed views of a payload, computed once per detection
struct Probe<'a> {
    text: Option<&'a str>,
    json: Option<Value>,
    yaml: Option<Value>,
}

impl<'a> Probe<'a> {
    fn new(data: &'a [u8]) -> Self {
        let text = std::str::from_utf8(data).ok();
        let json = serde_json::from_slice::<Value>(data).ok();
        // JSON is valid YAML; only parse YAML for non-JSON text
        let yaml = match (&json, text) {
            (None, Some(text)) if !text.trim().is_empty() => {
                serde_yaml::from_str::<serde_yaml::Value>(text)
                    .ok()
                    .map(yaml_to_json)
            }
            _ => None,
        };
        Self { text, json, yaml }
    }

    /// Whichever structured view exists, JSON first
    fn document(&self) -> Option<&Value> {
        self.json.as_ref().or(self.yaml.as_ref())
    }
}

/// Stateless detector; cheap to share between imports
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn new() -> Self {
        Self
    }

    /// Confidence for every candidate format, in tie-break order
    pub fn scores(&self, data: &[u8]) -> Vec<(ImportFormat, f64)> {
        let probe = Probe::new(data);
        vec![
            (ImportFormat::Har, score_har(&probe)),
            (ImportFormat::Postman, score_postman(&probe)),
            (ImportFormat::OpenApi, score_openapi(&probe)),
            (ImportFormat::Curl, score_curl(&probe)),
            (ImportFormat::Yaml, score_yaml_flow(&probe)),
            (ImportFormat::Json, score_json(&probe)),
        ]
    }

    /// Best-scoring format; total over all byte sequences
    pub fn detect(&self, data: &[u8]) -> Detection {
        let mut best = Detection {
            format: ImportFormat::Unknown,
            confidence: 0.0,
        };
        for (format, confidence) in self.scores(data) {
            // Strictly greater: earlier formats win ties
            if confidence > best.confidence {
                best = Detection { format, confidence };
            }
        }

        if best.confidence < MIN_CONFIDENCE {
            best.format = ImportFormat::Unknown;
        }

        debug!(
            format = %best.format,
            confidence = best.confidence,
            bytes = data.len(),
            "Detected payload format"
        );
        best
    }

    /// Authoritative structural check for `format`
    pub fn validate_format(&self, data: &[u8], format: ImportFormat) -> ImportResult<()> {
        translators::validate(format, data)
    }
}

fn score_har(probe: &Probe) -> f64 {
    let (Some(text), Some(json)) = (probe.text, probe.json.as_ref()) else {
        return 0.0;
    };
    if !prescreen(&HAR_HINT, text) {
        return 0.0;
    }
    let Some(log) = json.get("log").filter(|l| l.is_object()) else {
        return 0.0;
    };

    let mut score: f64 = 0.5;
    if log.get("entries").map(Value::is_array).unwrap_or(false) {
        score += 0.35;
    }
    if log.get("version").is_some() || log.get("creator").is_some() {
        score += 0.1;
    }
    score.min(1.0)
}

fn score_postman(probe: &Probe) -> f64 {
    let (Some(text), Some(json)) = (probe.text, probe.json.as_ref()) else {
        return 0.0;
    };
    if !prescreen(&POSTMAN_HINT, text) {
        return 0.0;
    }
    let Some(info) = json.get("info").filter(|i| i.is_object()) else {
        return 0.0;
    };

    let mut score: f64 = 0.3;
    let schema = info.get("schema").and_then(Value::as_str).unwrap_or_default();
    if schema.contains("getpostman.com") || schema.contains("postman") {
        score += 0.4;
    }
    if info.get("_postman_id").is_some() {
        score += 0.1;
    }
    if json.get("item").map(Value::is_array).unwrap_or(false) {
        score += 0.2;
    }
    // OpenAPI documents also carry `info`
    if json.get("openapi").is_some() || json.get("swagger").is_some() {
        return 0.0;
    }
    score.min(1.0)
}

fn score_openapi(probe: &Probe) -> f64 {
    let Some(text) = probe.text else {
        return 0.0;
    };
    if !prescreen(&OPENAPI_HINT, text) {
        return 0.0;
    }
    let Some(doc) = probe.document().filter(|d| d.is_object()) else {
        return 0.0;
    };

    let version = doc
        .get("openapi")
        .or_else(|| doc.get("swagger"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    let Some(version) = version else {
        return 0.0;
    };

    let mut score: f64 = 0.5;
    if version.starts_with('2') || version.starts_with('3') {
        score += 0.2;
    }
    if doc.get("paths").map(Value::is_object).unwrap_or(false) {
        score += 0.2;
    }
    if doc.get("info").is_some() {
        score += 0.05;
    }
    score.min(1.0)
}

fn score_curl(probe: &Probe) -> f64 {
    let Some(text) = probe.text else {
        return 0.0;
    };
    // A JSON document is never a shell command
    if probe.json.is_some() {
        return 0.0;
    }
    if !prescreen(&CURL_HINT, text) {
        return if text.contains("curl ") { 0.2 } else { 0.0 };
    }

    let mut score: f64 = 0.6;
    if text.contains("http://") || text.contains("https://") {
        score += 0.3;
    } else if text.split_whitespace().count() > 1 {
        score += 0.1;
    }
    score.min(1.0)
}

fn score_yaml_flow(probe: &Probe) -> f64 {
    let (Some(text), Some(yaml)) = (probe.text, probe.yaml.as_ref()) else {
        return 0.0;
    };
    if !prescreen(&YAML_FLOW_HINT, text) {
        return 0.0;
    }
    if yaml.get("openapi").is_some() || yaml.get("swagger").is_some() {
        return 0.0;
    }

    let has_flows = yaml.get("flows").map(Value::is_array).unwrap_or(false);
    let has_requests = yaml.get("requests").map(Value::is_array).unwrap_or(false);
    match (has_flows, has_requests) {
        (true, true) => 0.9,
        (true, false) => 0.8,
        (false, true) => 0.4,
        (false, false) => 0.0,
    }
}

fn score_json(probe: &Probe) -> f64 {
    match probe.json {
        Some(Value::Object(_)) | Some(Value::Array(_)) => 0.5,
        Some(_) => 0.35,
        None => 0.0,
    }
}
