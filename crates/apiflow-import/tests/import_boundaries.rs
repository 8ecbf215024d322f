//! Inputs at the edges: empty, oversized, malformed, cyclic, cancelled

mod common;

use std::sync::Arc;

use apiflow_core::{Id, WorkspaceId, MAX_PAYLOAD_BYTES};
use apiflow_entities::{files, flows, http};
use apiflow_import::WorkspaceAccess;
use apiflow_import_formats::{HarTranslator, TranslatorRegistry};
use apiflow_import_types::{
    ErrorKind, FileContentType, ImportError, ImportFormat, ImportRequest, ImportResult,
    TranslationResult, Translator,
};
use async_trait::async_trait;
use common::{Harness, SCENARIO_HAR};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_empty_payload_is_rejected() -> anyhow::Result<()> {
    let h = Harness::new().await?;

    let err = h.coordinator.import(h.request("")).await.unwrap_err();

    assert!(matches!(err, ImportError::Validation(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_payload_one_byte_over_the_cap_is_too_large() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let request = ImportRequest::new(h.workspace_id, "big", vec![b' '; MAX_PAYLOAD_BYTES + 1]);

    let err = h.coordinator.import(request).await.unwrap_err();

    assert!(matches!(
        err,
        ImportError::DataTooLarge { size, limit } if size == MAX_PAYLOAD_BYTES + 1 && limit == MAX_PAYLOAD_BYTES
    ));
    Ok(())
}

#[tokio::test]
async fn test_har_without_entries_is_rejected() -> anyhow::Result<()> {
    let h = Harness::new().await?;

    let err = h
        .coordinator
        .import(h.request(r#"{"log":{"version":"1.2","entries":[]}}"#))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.count::<http::Entity>().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_har_entry_is_skipped() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let har = r#"{"log":{"entries":[
        {"request":{"method":"GET"}},
        {"request":{"method":"GET","url":"https://api.example.com/health"},"response":{"status":200}}
    ]}}"#;

    let response = h.coordinator.import(h.request(har)).await?;
    assert_eq!(response.domains, vec!["api.example.com".to_string()]);

    let response = h.coordinator.import(h.commit_request(har, Vec::new())).await?;
    assert!(response.flow_id.is_some());
    assert_eq!(h.count::<http::Entity>().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_workspace_is_not_found() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let missing = Id::new();
    let request = ImportRequest::new(missing, "import", SCENARIO_HAR.as_bytes().to_vec());

    let err = h.coordinator.import(request).await.unwrap_err();

    assert!(matches!(err, ImportError::WorkspaceNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::WorkspaceNotFound);
    Ok(())
}

/// HAR translation whose host folders point back at each other
struct CyclicFolders;

impl Translator for CyclicFolders {
    fn format(&self) -> ImportFormat {
        ImportFormat::Har
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        HarTranslator::new().validate(data)
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let mut result = HarTranslator::new().translate(data, workspace_id)?;
        let folder_id = |name: &str| {
            result
                .files
                .iter()
                .find(|f| f.content_type == FileContentType::Folder && f.name == name)
                .map(|f| f.id)
        };
        let api = folder_id("api");
        if let Some(com) = result.files.iter_mut().find(|f| f.name == "com") {
            com.parent_id = api;
        }
        Ok(result)
    }
}

#[tokio::test]
async fn test_folder_cycle_is_detected_before_any_write() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let mut registry = TranslatorRegistry::default();
    registry.register(Arc::new(CyclicFolders));
    let coordinator = apiflow_import::ImportCoordinator::new(
        h.db(),
        Default::default(),
        h.events.clone(),
    )?
    .with_registry(Arc::new(registry));

    let err = coordinator
        .import(h.commit_request(SCENARIO_HAR, Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::CycleDetected(_)));
    assert_eq!(h.count::<files::Entity>().await, 0);
    assert_eq!(h.count::<http::Entity>().await, 0);
    Ok(())
}

/// Admits every workspace, then cancels the import it admitted
struct CancelOnCheck(CancellationToken);

#[async_trait]
impl WorkspaceAccess for CancelOnCheck {
    async fn check(&self, _workspace_id: Id) -> ImportResult<()> {
        self.0.cancel();
        Ok(())
    }
}

#[tokio::test]
async fn test_cancelled_import_writes_nothing() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let token = CancellationToken::new();
    let coordinator = apiflow_import::ImportCoordinator::new(
        h.db(),
        Default::default(),
        h.events.clone(),
    )?
    .with_access(Arc::new(CancelOnCheck(token.clone())));

    let err = coordinator
        .import_with_cancel(h.commit_request(SCENARIO_HAR, Vec::new()), token)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Cancelled));
    assert_eq!(h.count::<http::Entity>().await, 0);
    assert_eq!(h.count::<files::Entity>().await, 0);
    assert_eq!(h.count::<flows::Entity>().await, 0);
    Ok(())
}
