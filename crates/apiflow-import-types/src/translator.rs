//! Translator trait
//!
//! Defines the interface every payload format implementation provides.

use apiflow_core::WorkspaceId;

use crate::{error::ImportResult, format::ImportFormat, translation::TranslationResult};

/// Turns a payload of one format into a [`TranslationResult`]
///
/// Implementations are immutable after construction and shared between
/// concurrent imports.
pub trait Translator: Send + Sync {
    /// Format this translator handles
    fn format(&self) -> ImportFormat;

    /// Strict structural check; the authoritative gate for this format
    fn validate(&self, data: &[u8]) -> ImportResult<()>;

    /// Translate the payload into entities scoped to `workspace_id`
    fn translate(&self, data: &[u8], workspace_id: WorkspaceId)
        -> ImportResult<TranslationResult>;
}
