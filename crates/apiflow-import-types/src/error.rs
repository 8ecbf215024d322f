//! Error types for the import system

use std::time::Duration;

use apiflow_core::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::format::ImportFormat;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur during an import
#[derive(Error, Debug)]
pub enum ImportError {
    /// Request or payload failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Input could not be interpreted (e.g. malformed URL)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote document answered with a non-200 status
    #[error("Fetching the import URL failed with status {status}")]
    FetchFailed { status: u16 },

    /// Remote document could not be fetched at all
    #[error("Fetching the import URL failed: {0}")]
    Network(String),

    /// Payload or fetched body exceeds the size cap
    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    DataTooLarge { size: usize, limit: usize },

    /// A translator rejected the payload
    #[error("Failed to translate {format} payload: {reason}")]
    Translation {
        format: ImportFormat,
        reason: String,
    },

    #[error("Workspace {0} not found")]
    WorkspaceNotFound(Id),

    #[error("Permission denied for workspace {0}")]
    PermissionDenied(Id),

    /// Storage failure; the cause is kept for diagnostics only
    #[error("Storage operation failed")]
    Storage(#[from] sea_orm::DbErr),

    #[error("Cycle detected among {0}")]
    CycleDetected(String),

    #[error("Could not detect payload format: {0}")]
    FormatDetection(String),

    #[error("Import timed out after {0:?}")]
    Timeout(Duration),

    #[error("Import cancelled")]
    Cancelled,

    /// A cross-entity reference does not resolve
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Closed set of error kinds reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidHarFormat,
    WorkspaceNotFound,
    PermissionDenied,
    StorageFailed,
    CycleDetected,
    DataTooLarge,
    FormatDetection,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InvalidHarFormat => "invalid_har_format",
            ErrorKind::WorkspaceNotFound => "workspace_not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::StorageFailed => "storage_failed",
            ErrorKind::CycleDetected => "cycle_detected",
            ErrorKind::DataTooLarge => "data_too_large",
            ErrorKind::FormatDetection => "format_detection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ImportError {
    pub fn translation(format: ImportFormat, reason: impl Into<String>) -> Self {
        ImportError::Translation {
            format,
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ImportError::Validation(message.into())
    }

    /// Project this error onto the closed set of caller-visible kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Validation(_) | ImportError::InvalidInput(_) => ErrorKind::Validation,
            ImportError::Translation {
                format: ImportFormat::Har,
                ..
            } => ErrorKind::InvalidHarFormat,
            ImportError::Translation { .. } => ErrorKind::Validation,
            ImportError::DataTooLarge { .. } => ErrorKind::DataTooLarge,
            ImportError::WorkspaceNotFound(_) => ErrorKind::WorkspaceNotFound,
            ImportError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ImportError::Storage(_) => ErrorKind::StorageFailed,
            ImportError::CycleDetected(_) => ErrorKind::CycleDetected,
            ImportError::FormatDetection(_) => ErrorKind::FormatDetection,
            ImportError::Timeout(_) | ImportError::Cancelled => ErrorKind::Timeout,
            ImportError::FetchFailed { .. }
            | ImportError::Network(_)
            | ImportError::Integrity(_)
            | ImportError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller sent something unacceptable
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::InvalidHarFormat | ErrorKind::DataTooLarge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_har_translation_errors_are_invalid_har_format() {
        let err = ImportError::translation(ImportFormat::Har, "missing log.entries");
        assert_eq!(err.kind(), ErrorKind::InvalidHarFormat);
        assert!(err.is_client_error());

        let err = ImportError::translation(ImportFormat::OpenApi, "no paths");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_storage_errors_hide_cause_in_message() {
        let err = ImportError::from(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert_eq!(err.kind(), ErrorKind::StorageFailed);
        assert_eq!(err.to_string(), "Storage operation failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_data_too_large_is_a_client_error() {
        let err = ImportError::DataTooLarge {
            size: 10,
            limit: 5,
        };
        assert_eq!(err.kind(), ErrorKind::DataTooLarge);
        assert!(err.is_client_error());
        assert!(!ImportError::Cancelled.is_client_error());
        assert_eq!(ImportError::Cancelled.kind(), ErrorKind::Timeout);
    }
}
