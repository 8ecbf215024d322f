use std::str::FromStr;
use std::sync::Arc;

use apiflow_core::Id;
use apiflow_import_types::{DomainMapping, ErrorKind, ImportError, ImportRequest, ImportResult};
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::ImportCoordinator;

pub struct ImportAppState {
    pub coordinator: Arc<ImportCoordinator>,
}

pub fn create_import_app_state(coordinator: Arc<ImportCoordinator>) -> Arc<ImportAppState> {
    Arc::new(ImportAppState { coordinator })
}

/// Wire form of an import call
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImportRpcRequest {
    #[schema(example = "01J9ZX3K7Q8V2M4N6P0R1S2T3V")]
    pub workspace_id: String,
    #[schema(example = "Checkout recording")]
    pub name: String,
    /// Payload bytes, base64 encoded
    #[serde(default)]
    pub data: Option<String>,
    /// Payload text or an `http(s)` URL to fetch it from
    #[serde(default)]
    pub text_data: Option<String>,
    /// Absent on the first call; present (possibly empty) to commit
    #[serde(default)]
    pub domain_data: Option<Vec<DomainMapping>>,
}

impl ImportRpcRequest {
    pub fn into_request(self) -> ImportResult<ImportRequest> {
        let workspace_id = Id::from_str(self.workspace_id.trim()).map_err(|e| {
            ImportError::validation(format!("invalid workspace id {}: {}", self.workspace_id, e))
        })?;
        let data = match self.data.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => STANDARD
                .decode(encoded)
                .map_err(|e| ImportError::validation(format!("data is not valid base64: {}", e)))?,
            _ => Vec::new(),
        };

        let mut request = ImportRequest::new(workspace_id, self.name, data)
            .with_text(self.text_data.unwrap_or_default());
        if let Some(mappings) = self.domain_data {
            request = request.with_domains(mappings);
        }
        Ok(request)
    }
}

/// Status codes the RPC surface reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Internal,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "invalid_argument",
            RpcCode::NotFound => "not_found",
            RpcCode::PermissionDenied => "permission_denied",
            RpcCode::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::NotFound => StatusCode::NOT_FOUND,
            RpcCode::PermissionDenied => StatusCode::FORBIDDEN,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "Invalid Argument",
            RpcCode::NotFound => "Not Found",
            RpcCode::PermissionDenied => "Permission Denied",
            RpcCode::Internal => "Internal Server Error",
        }
    }
}

impl From<ErrorKind> for RpcCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation | ErrorKind::InvalidHarFormat | ErrorKind::DataTooLarge => {
                RpcCode::InvalidArgument
            }
            ErrorKind::WorkspaceNotFound => RpcCode::NotFound,
            ErrorKind::PermissionDenied => RpcCode::PermissionDenied,
            ErrorKind::StorageFailed
            | ErrorKind::CycleDetected
            | ErrorKind::FormatDetection
            | ErrorKind::Timeout
            | ErrorKind::Internal => RpcCode::Internal,
        }
    }
}
