//! Heuristic separating API traffic from asset traffic
//!
//! A request is XHR-like when its method mutates state, its path looks
//! like an API route, or its host looks like an API host. Static assets
//! fetched with GET never count.

use std::collections::BTreeSet;

use crate::model::HttpRequest;

const MUTATING_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

const API_PATH_MARKERS: [&str; 8] = [
    "/api/", "/v1/", "/v2/", "/v3/", "/rest/", "/graphql/", "/rpc/", "/ajax/",
];

const API_HOST_PREFIXES: [&str; 5] = ["api.", "rest.", "graphql.", "gateway.", "backend."];

const STATIC_EXTENSIONS: [&str; 16] = [
    ".js", ".mjs", ".css", ".map", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp",
    ".woff", ".woff2", ".ttf", ".html", ".htm",
];

/// Lowercased host of an absolute `http(s)` URL
pub fn url_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.host_str().map(|h| h.to_lowercase())
}

pub fn is_xhr_like(method: &str, url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    let method = method.to_uppercase();

    if method == "GET" && STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }
    if MUTATING_METHODS.contains(&method.as_str()) {
        return true;
    }

    let probe = format!("{}/", path.trim_end_matches('/'));
    if API_PATH_MARKERS.iter().any(|marker| probe.contains(marker)) {
        return true;
    }

    parsed
        .host_str()
        .map(|host| {
            let host = host.to_lowercase();
            API_HOST_PREFIXES.iter().any(|prefix| host.starts_with(prefix))
        })
        .unwrap_or(false)
}

/// Sorted, unique, lowercased hosts of the XHR-like base requests
pub fn extract_domains(requests: &[HttpRequest]) -> Vec<String> {
    requests
        .iter()
        .filter(|r| !r.is_delta && is_xhr_like(&r.method, &r.url))
        .filter_map(|r| url_host(&r.url))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_host_is_xhr_like() {
        assert!(is_xhr_like("GET", "https://api.example.com/users"));
        assert!(is_xhr_like("get", "https://API.example.com/"));
    }

    #[test]
    fn test_api_path_is_xhr_like() {
        assert!(is_xhr_like("GET", "https://example.com/api/users"));
        assert!(is_xhr_like("GET", "https://example.com/v1"));
        assert!(!is_xhr_like("GET", "https://example.com/apiary"));
    }

    #[test]
    fn test_mutating_methods_are_xhr_like() {
        assert!(is_xhr_like("POST", "https://www.example.com/login"));
        assert!(is_xhr_like("DELETE", "https://www.example.com/items/1"));
    }

    #[test]
    fn test_assets_and_pages_are_not_xhr_like() {
        assert!(!is_xhr_like("GET", "https://cdn.example.com/app.js"));
        assert!(!is_xhr_like("GET", "https://api.example.com/logo.png"));
        assert!(!is_xhr_like("GET", "https://www.example.com/about"));
        assert!(!is_xhr_like("GET", "{{base}}/api/users"));
    }

    #[test]
    fn test_url_host_requires_http_scheme() {
        assert_eq!(
            url_host("https://Api.Example.com:8443/x"),
            Some("api.example.com".to_string())
        );
        assert_eq!(url_host("ftp://example.com/file"), None);
        assert_eq!(url_host("not a url"), None);
    }
}
