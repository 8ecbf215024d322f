//! Payload formats recognised by the detector

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Format of an import payload
///
/// `Json` is a recognised-but-unsupported shape: valid JSON that matches
/// no known request-description format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Har,
    #[serde(rename = "openapi")]
    OpenApi,
    Postman,
    Yaml,
    Curl,
    Json,
    Unknown,
}

impl ImportFormat {
    /// Formats that have a translator
    pub const TRANSLATABLE: [ImportFormat; 5] = [
        ImportFormat::Har,
        ImportFormat::OpenApi,
        ImportFormat::Postman,
        ImportFormat::Yaml,
        ImportFormat::Curl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportFormat::Har => "har",
            ImportFormat::OpenApi => "openapi",
            ImportFormat::Postman => "postman",
            ImportFormat::Yaml => "yaml",
            ImportFormat::Curl => "curl",
            ImportFormat::Json => "json",
            ImportFormat::Unknown => "unknown",
        }
    }

    /// Parse a format name, accepting a few common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "har" => Some(ImportFormat::Har),
            "openapi" | "swagger" => Some(ImportFormat::OpenApi),
            "postman" => Some(ImportFormat::Postman),
            "yaml" | "yaml-flow" | "yamlflow" => Some(ImportFormat::Yaml),
            "curl" => Some(ImportFormat::Curl),
            "json" => Some(ImportFormat::Json),
            "unknown" => Some(ImportFormat::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
