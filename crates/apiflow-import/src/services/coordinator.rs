//! Two-phase import orchestration
//!
//! A call without domain answers stops after the integrity check and
//! reports the domains it found. A call with answers, or any YAML-flow
//! payload, rewrites URLs, commits, publishes events and returns the flow.

use std::fmt;
use std::sync::Arc;

use apiflow_core::ImportConfig;
use apiflow_events::EventPublisher;
use apiflow_import_formats::{FormatDetector, TranslatorRegistry};
use apiflow_import_types::{
    ImportError, ImportFormat, ImportRequest, ImportResponse, ImportResult, TranslationResult,
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::access::{DbWorkspaceAccess, WorkspaceAccess};
use super::domain::{apply_replacements, first_origins};
use super::integrity;
use super::resolver::InputResolver;
use super::storage::ImporterStorage;
use super::validator::ImportValidator;

/// Where an import session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Start,
    Validated,
    Resolved,
    Detected,
    Translated,
    IntegrityOk,
    AwaitingDomain,
    Stored,
    Failed,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Start => "start",
            ImportStage::Validated => "validated",
            ImportStage::Resolved => "resolved",
            ImportStage::Detected => "detected",
            ImportStage::Translated => "translated",
            ImportStage::IntegrityOk => "integrity_ok",
            ImportStage::AwaitingDomain => "awaiting_domain",
            ImportStage::Stored => "stored",
            ImportStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStage::AwaitingDomain | ImportStage::Stored | ImportStage::Failed
        )
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traces every stage transition of one import
struct Session {
    workspace_id: apiflow_core::Id,
    stage: ImportStage,
}

impl Session {
    fn new(workspace_id: apiflow_core::Id) -> Self {
        Self {
            workspace_id,
            stage: ImportStage::Start,
        }
    }

    fn advance(&mut self, next: ImportStage) {
        debug!(
            workspace_id = %self.workspace_id,
            from = %self.stage,
            to = %next,
            "Import stage transition"
        );
        self.stage = next;
    }

    fn fail(&mut self, error: &ImportError) {
        warn!(
            workspace_id = %self.workspace_id,
            stage = %self.stage,
            kind = %error.kind(),
            error = %error,
            "Import failed"
        );
        self.stage = ImportStage::Failed;
    }
}

pub struct ImportCoordinator {
    db: Arc<DatabaseConnection>,
    config: ImportConfig,
    validator: ImportValidator,
    resolver: InputResolver,
    detector: FormatDetector,
    registry: Arc<TranslatorRegistry>,
    storage: ImporterStorage,
    events: Arc<EventPublisher>,
    access: Arc<dyn WorkspaceAccess>,
}

impl ImportCoordinator {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: ImportConfig,
        events: Arc<EventPublisher>,
    ) -> ImportResult<Self> {
        Ok(Self {
            validator: ImportValidator::new(&config),
            resolver: InputResolver::new(&config)?,
            detector: FormatDetector::new(),
            registry: Arc::new(TranslatorRegistry::with_defaults(&config)),
            storage: ImporterStorage::new(db.clone()),
            access: Arc::new(DbWorkspaceAccess::new(db.clone())),
            events,
            config,
            db,
        })
    }

    /// Replace the workspace check, e.g. with a membership-aware one
    pub fn with_access(mut self, access: Arc<dyn WorkspaceAccess>) -> Self {
        self.access = access;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TranslatorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventPublisher> {
        &self.events
    }

    pub async fn import(&self, request: ImportRequest) -> ImportResult<ImportResponse> {
        self.import_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Run one import call; `cancel` aborts at the next suspension point
    pub async fn import_with_cancel(
        &self,
        request: ImportRequest,
        cancel: CancellationToken,
    ) -> ImportResult<ImportResponse> {
        let mut session = Session::new(request.workspace_id);
        let deadline = self.config.import_timeout;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ImportError::Cancelled),
            timed = tokio::time::timeout(deadline, self.run(&request, &cancel, &mut session)) => {
                timed.unwrap_or(Err(ImportError::Timeout(deadline)))
            }
        };

        if let Err(e) = &outcome {
            session.fail(e);
        }
        outcome
    }

    async fn run(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
        session: &mut Session,
    ) -> ImportResult<ImportResponse> {
        self.validator.validate(request)?;
        self.access.check(request.workspace_id).await?;
        session.advance(ImportStage::Validated);

        let data = self.resolver.resolve(request, cancel).await?;
        session.advance(ImportStage::Resolved);

        let format = self.detect(&data)?;
        session.advance(ImportStage::Detected);

        let mut result = self.translate(request, format, &data)?;
        session.advance(ImportStage::Translated);

        integrity::check(&result).into_result()?;
        session.advance(ImportStage::IntegrityOk);

        // YAML flows carry no domains, so there is nothing to ask about
        if format != ImportFormat::Yaml && !request.has_domain_answers() {
            session.advance(ImportStage::AwaitingDomain);
            info!(
                workspace_id = %request.workspace_id,
                %format,
                domains = result.domains.len(),
                "Import awaiting domain answers"
            );
            return Ok(ImportResponse::awaiting_domains(result.domains));
        }

        let origins = first_origins(&result.http_requests);
        let rewritten = apply_replacements(&mut result, &request.domain_data);
        debug!(workspace_id = %request.workspace_id, rewritten, "Applied domain replacements");

        let mut stored = self
            .storage
            .store(&result, &request.domain_data, &origins, cancel)
            .await?;
        session.advance(ImportStage::Stored);

        let published = std::mem::take(&mut stored.changes).publish(&self.events);
        info!(
            workspace_id = %request.workspace_id,
            %format,
            flow_id = ?stored.flow_id,
            requests = result.http_requests.len(),
            events = published,
            "Import stored"
        );

        if self.config.verify_after_commit {
            integrity::verify_committed(self.db.as_ref(), &stored).await?;
        }

        Ok(ImportResponse::stored(stored.flow_id))
    }

    fn detect(&self, data: &[u8]) -> ImportResult<ImportFormat> {
        let detection = self.detector.detect(data);
        match detection.format {
            ImportFormat::Unknown => Err(ImportError::FormatDetection(
                "payload matches no supported format".to_string(),
            )),
            ImportFormat::Json => Err(ImportError::FormatDetection(
                "JSON payload is not a HAR, OpenAPI or Postman document".to_string(),
            )),
            format => {
                self.detector.validate_format(data, format)?;
                Ok(format)
            }
        }
    }

    fn translate(
        &self,
        request: &ImportRequest,
        format: ImportFormat,
        data: &[u8],
    ) -> ImportResult<TranslationResult> {
        let mut result = self.registry.translate(format, data, request.workspace_id)?;

        // Recordings and single commands have no name of their own
        if matches!(format, ImportFormat::Har | ImportFormat::Curl) {
            if let Some(flow) = result.flows.first_mut() {
                flow.name = request.name.clone();
            }
        }

        debug!(
            workspace_id = %request.workspace_id,
            %format,
            requests = result.http_requests.len(),
            files = result.files.len(),
            flows = result.flows.len(),
            domains = result.domains.len(),
            "Translated payload"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(ImportStage::AwaitingDomain.is_terminal());
        assert!(ImportStage::Stored.is_terminal());
        assert!(ImportStage::Failed.is_terminal());
        assert!(!ImportStage::IntegrityOk.is_terminal());
        assert_eq!(ImportStage::IntegrityOk.to_string(), "integrity_ok");
    }

    #[test]
    fn test_session_records_failure() {
        let mut session = Session::new(apiflow_core::Id::new());
        session.advance(ImportStage::Validated);
        assert_eq!(session.stage, ImportStage::Validated);
        session.fail(&ImportError::Cancelled);
        assert_eq!(session.stage, ImportStage::Failed);
    }
}
