//! Request validation that runs before any payload is touched

use std::collections::HashSet;

use apiflow_core::ImportConfig;
use apiflow_import_types::{ImportError, ImportRequest, ImportResult};
use serde_json::Value;

pub struct ImportValidator {
    max_payload_bytes: usize,
    max_name_len: usize,
}

impl ImportValidator {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            max_name_len: config.max_name_len,
        }
    }

    pub fn validate(&self, request: &ImportRequest) -> ImportResult<()> {
        if request.workspace_id.is_nil() {
            return Err(ImportError::validation("workspace id is required"));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(ImportError::validation("name is required"));
        }
        if request.name.chars().count() > self.max_name_len {
            return Err(ImportError::validation(format!(
                "name exceeds {} characters",
                self.max_name_len
            )));
        }

        if request.data.is_empty() && request.text_data.trim().is_empty() {
            return Err(ImportError::validation("payload is empty"));
        }
        let size = request.data.len().max(request.text_data.len());
        if size > self.max_payload_bytes {
            return Err(ImportError::DataTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }

        let payload = if request.data.is_empty() {
            request.text_data.as_bytes()
        } else {
            request.data.as_slice()
        };
        check_har_shape(payload)?;

        self.validate_domains(request)
    }

    fn validate_domains(&self, request: &ImportRequest) -> ImportResult<()> {
        let mut seen = HashSet::new();
        for mapping in request.domain_data.iter().filter(|m| m.enabled) {
            let domain = mapping.domain.trim().to_lowercase();
            if domain.is_empty() {
                return Err(ImportError::validation(
                    "enabled domain mapping has an empty domain",
                ));
            }
            if !seen.insert(domain) {
                return Err(ImportError::validation(format!(
                    "domain {} is mapped more than once",
                    mapping.domain.trim()
                )));
            }
        }
        Ok(())
    }
}

/// A JSON object carrying `log` must be a HAR with at least one entry
fn check_har_shape(payload: &[u8]) -> ImportResult<()> {
    let starts_with_brace = payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'{')
        .unwrap_or(false);
    if !starts_with_brace {
        return Ok(());
    }
    let Ok(doc) = serde_json::from_slice::<Value>(payload) else {
        return Ok(());
    };
    let Some(log) = doc.get("log") else {
        return Ok(());
    };

    let has_entries = log
        .get("entries")
        .and_then(Value::as_array)
        .map(|entries| !entries.is_empty())
        .unwrap_or(false);
    if has_entries {
        Ok(())
    } else {
        Err(ImportError::validation("HAR payload has no log.entries"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_core::Id;
    use apiflow_import_types::{DomainMapping, ErrorKind};

    const HAR: &str = r#"{"log":{"entries":[{"request":{"method":"GET","url":"https://a.dev/api"}}]}}"#;

    fn validator() -> ImportValidator {
        ImportValidator::new(&ImportConfig::default())
    }

    fn request(data: &[u8]) -> ImportRequest {
        ImportRequest::new(Id::new(), "import", data.to_vec())
    }

    #[test]
    fn test_accepts_a_plain_request() {
        assert!(validator().validate(&request(HAR.as_bytes())).is_ok());
    }

    #[test]
    fn test_rejects_missing_identity_and_name() {
        let mut nil_workspace = request(HAR.as_bytes());
        nil_workspace.workspace_id = Id::default();
        assert!(validator().validate(&nil_workspace).is_err());

        let mut unnamed = request(HAR.as_bytes());
        unnamed.name = "   ".to_string();
        assert!(validator().validate(&unnamed).is_err());

        let mut long_name = request(HAR.as_bytes());
        long_name.name = "n".repeat(256);
        assert!(validator().validate(&long_name).is_err());
        long_name.name = "n".repeat(255);
        assert!(validator().validate(&long_name).is_ok());
    }

    #[test]
    fn test_empty_payload_is_validation() {
        let err = validator().validate(&request(b"")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_payload_over_limit() {
        let config = ImportConfig {
            max_payload_bytes: 8,
            ..ImportConfig::default()
        };
        let validator = ImportValidator::new(&config);
        assert!(validator.validate(&request(b"curl a.b")).is_ok());
        let err = validator.validate(&request(b"curl a.bc")).unwrap_err();
        assert!(matches!(err, ImportError::DataTooLarge { size: 9, limit: 8 }));
    }

    #[test]
    fn test_har_without_entries() {
        let err = validator()
            .validate(&request(br#"{"log":{"entries":[]}}"#))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(validator().validate(&request(br#"{"log":{}}"#)).is_err());
        // Other JSON documents are left to detection
        assert!(validator().validate(&request(br#"{"openapi":"3.0.0"}"#)).is_ok());
    }

    #[test]
    fn test_domain_mappings() {
        let duplicate = request(HAR.as_bytes()).with_domains(vec![
            DomainMapping::new("api.example.com", "A"),
            DomainMapping::new("API.example.com", "B"),
        ]);
        assert!(validator().validate(&duplicate).is_err());

        let mut disabled = DomainMapping::new("api.example.com", "B");
        disabled.enabled = false;
        let with_disabled = request(HAR.as_bytes())
            .with_domains(vec![DomainMapping::new("api.example.com", "A"), disabled]);
        assert!(validator().validate(&with_disabled).is_ok());

        let empty_domain =
            request(HAR.as_bytes()).with_domains(vec![DomainMapping::new(" ", "A")]);
        assert!(validator().validate(&empty_domain).is_err());

        // Empty variable names are allowed and skipped later
        let empty_variable =
            request(HAR.as_bytes()).with_domains(vec![DomainMapping::new("api.example.com", "")]);
        assert!(validator().validate(&empty_variable).is_ok());
    }
}
