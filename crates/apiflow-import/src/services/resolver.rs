//! Turns an import request into payload bytes, fetching URLs when given one

use std::time::Duration;

use apiflow_core::ImportConfig;
use apiflow_import_types::{ImportError, ImportRequest, ImportResult};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const ACCEPT: &str = "application/json, application/yaml, */*";

pub struct InputResolver {
    client: reqwest::Client,
    max_bytes: usize,
    timeout: Duration,
}

impl InputResolver {
    pub fn new(config: &ImportConfig) -> ImportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(concat!("apiflow-import/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImportError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_bytes: config.max_payload_bytes,
            timeout: config.fetch_timeout,
        })
    }

    /// Payload bytes for `request`
    ///
    /// `data` wins when present. Otherwise `text_data` is fetched when it
    /// is a single `http(s)` URL, or used verbatim.
    pub async fn resolve(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> ImportResult<Vec<u8>> {
        if !request.data.is_empty() {
            return Ok(request.data.clone());
        }

        let text = request.text_data.trim();
        if !looks_like_url(text) {
            return Ok(request.text_data.as_bytes().to_vec());
        }

        let url = reqwest::Url::parse(text)
            .map_err(|e| ImportError::InvalidInput(format!("Malformed URL {}: {}", text, e)))?;
        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(ImportError::InvalidInput(format!("URL {} has no host", text)));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ImportError::Cancelled),
            body = self.fetch(url) => body,
        }
    }

    async fn fetch(&self, url: reqwest::Url) -> ImportResult<Vec<u8>> {
        info!(%url, "Fetching import payload");

        let mut response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| self.network_error(&url, e))?;

        if response.status() != StatusCode::OK {
            warn!(%url, status = response.status().as_u16(), "Import URL fetch failed");
            return Err(ImportError::FetchFailed {
                status: response.status().as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(ImportError::DataTooLarge {
                    size: length as usize,
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.network_error(&url, e))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(ImportError::DataTooLarge {
                    size: body.len() + chunk.len(),
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(%url, bytes = body.len(), "Fetched import payload");
        Ok(body)
    }

    fn network_error(&self, url: &reqwest::Url, error: reqwest::Error) -> ImportError {
        if error.is_timeout() {
            ImportError::Network(format!("{} timed out after {:?}", url, self.timeout))
        } else {
            ImportError::Network(format!("{}: {}", url, error))
        }
    }
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !text.chars().any(char::is_whitespace)
}
