//! Translator implementations, one module per payload format

use apiflow_import_types::{ImportError, ImportFormat, ImportResult};

pub mod curl;
pub mod har;
pub mod openapi;
pub mod postman;
pub mod yamlflow;

/// Strict structural check for `format`
pub fn validate(format: ImportFormat, data: &[u8]) -> ImportResult<()> {
    match format {
        ImportFormat::Har => har::validate(data),
        ImportFormat::OpenApi => openapi::validate(data).map(|_| ()),
        ImportFormat::Postman => postman::validate(data).map(|_| ()),
        ImportFormat::Yaml => yamlflow::validate(data).map(|_| ()),
        ImportFormat::Curl => curl::validate(data),
        ImportFormat::Json | ImportFormat::Unknown => Err(ImportError::FormatDetection(
            format!("no translator for {} payloads", format),
        )),
    }
}

/// Folder path for a URL's host, most significant label first
///
/// `api.example.com` becomes `["com", "example", "api"]`; IP literals and
/// single-label hosts stay whole.
pub(crate) fn host_folder_segments(parsed: &url::Url) -> Vec<String> {
    match parsed.host() {
        Some(url::Host::Domain(domain)) => {
            let labels: Vec<String> = domain
                .to_lowercase()
                .split('.')
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect();
            labels.into_iter().rev().collect()
        }
        Some(host) => vec![host.to_string()],
        None => Vec::new(),
    }
}

/// Default display name for a request
pub(crate) fn request_name(method: &str, parsed: &url::Url) -> String {
    format!("{} {}", method.to_uppercase(), parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_folder_segments_reverse_domains() {
        let url = url::Url::parse("https://api.example.com:8443/users").unwrap();
        assert_eq!(host_folder_segments(&url), vec!["com", "example", "api"]);

        let url = url::Url::parse("http://127.0.0.1:3000/").unwrap();
        assert_eq!(host_folder_segments(&url), vec!["127.0.0.1"]);

        let url = url::Url::parse("http://localhost/").unwrap();
        assert_eq!(host_folder_segments(&url), vec!["localhost"]);
    }

    #[test]
    fn test_validate_rejects_untranslatable_formats() {
        assert!(matches!(
            validate(ImportFormat::Json, b"{}"),
            Err(ImportError::FormatDetection(_))
        ));
    }
}
