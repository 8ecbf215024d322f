//! Import call input and output

use apiflow_core::Id;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A host the caller wants replaced by a `{{variable}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DomainMapping {
    pub enabled: bool,
    pub domain: String,
    pub variable: String,
}

impl DomainMapping {
    pub fn new(domain: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            enabled: true,
            domain: domain.into(),
            variable: variable.into(),
        }
    }
}

/// One import call
///
/// `domain_data_was_provided` separates "the caller skipped the domain
/// step" (provided, empty list) from "the caller has not been asked yet".
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub workspace_id: Id,
    pub name: String,
    pub data: Vec<u8>,
    pub text_data: String,
    pub domain_data: Vec<DomainMapping>,
    pub domain_data_was_provided: bool,
}

impl ImportRequest {
    /// Phase-1 request: no domain answers yet
    pub fn new(workspace_id: Id, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            workspace_id,
            name: name.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    /// Same request with the caller's domain answers attached
    pub fn with_domains(mut self, mappings: Vec<DomainMapping>) -> Self {
        self.domain_data = mappings;
        self.domain_data_was_provided = true;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_data = text.into();
        self
    }

    /// Whether this call commits (phase 2) rather than discovers (phase 1)
    pub fn has_domain_answers(&self) -> bool {
        self.domain_data_was_provided || !self.domain_data.is_empty()
    }
}

/// What the caller still has to supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingData {
    #[default]
    Unspecified,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    pub missing_data: MissingData,
    pub domains: Vec<String>,
    #[schema(value_type = Option<String>)]
    pub flow_id: Option<Id>,
}

impl ImportResponse {
    pub fn awaiting_domains(domains: Vec<String>) -> Self {
        Self {
            missing_data: MissingData::Domain,
            domains,
            flow_id: None,
        }
    }

    pub fn stored(flow_id: Option<Id>) -> Self {
        Self {
            missing_data: MissingData::Unspecified,
            domains: Vec::new(),
            flow_id,
        }
    }
}
