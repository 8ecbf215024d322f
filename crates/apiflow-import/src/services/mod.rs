pub mod access;
pub mod convert;
pub mod coordinator;
pub mod dedup;
pub mod domain;
pub mod integrity;
pub mod resolver;
pub mod storage;
pub mod topo;
pub mod validator;

pub use access::{DbWorkspaceAccess, WorkspaceAccess};
pub use coordinator::{ImportCoordinator, ImportStage};
pub use dedup::{http_fingerprint, Deduplicator, RequestChildren, Resolution};
pub use domain::{apply_replacements, DomainProcessor, DomainVariableStats};
pub use integrity::IntegrityReport;
pub use resolver::InputResolver;
pub use storage::{ImporterStorage, StorageStats, StoredImport};
pub use topo::{toposort, toposort_or_original};
pub use validator::ImportValidator;
