//! Shared harness for import integration tests
//!
//! Each harness owns an in-memory SQLite database with one workspace, an
//! event publisher and a coordinator wired to both.

#![allow(dead_code)]

use std::sync::Arc;

use apiflow_core::{Id, ImportConfig};
use apiflow_database::test_utils::TestDatabase;
use apiflow_events::EventPublisher;
use apiflow_import::ImportCoordinator;
use apiflow_import_types::{DomainMapping, ImportRequest};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

pub const SCENARIO_HAR: &str = r#"{"log":{"version":"1.2","entries":[{"request":{"method":"GET","url":"https://api.example.com/users"},"response":{"status":200}}]}}"#;

pub const PETSTORE: &str = include_str!("../fixtures/petstore_swagger2.json");
pub const ORDERS: &str = include_str!("../fixtures/orders_openapi3.yaml");
pub const SHOP_FLOW: &str = include_str!("../fixtures/shop_flow.yaml");

pub struct Harness {
    pub test_db: TestDatabase,
    pub workspace_id: Id,
    pub events: Arc<EventPublisher>,
    pub coordinator: ImportCoordinator,
}

impl Harness {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(ImportConfig::default()).await
    }

    pub async fn with_config(config: ImportConfig) -> anyhow::Result<Self> {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await?;
        let events = Arc::new(EventPublisher::new());
        let coordinator = ImportCoordinator::new(test_db.connection(), config, events.clone())?;
        Ok(Self {
            test_db,
            workspace_id,
            events,
            coordinator,
        })
    }

    pub fn db(&self) -> Arc<DatabaseConnection> {
        self.test_db.connection()
    }

    /// First-call request carrying `payload` as raw bytes
    pub fn request(&self, payload: &str) -> ImportRequest {
        ImportRequest::new(self.workspace_id, "import", payload.as_bytes().to_vec())
    }

    /// Second-call request with the given domain answers
    pub fn commit_request(&self, payload: &str, mappings: Vec<DomainMapping>) -> ImportRequest {
        self.request(payload).with_domains(mappings)
    }

    pub async fn count<E>(&self) -> u64
    where
        E: EntityTrait,
        E::Model: Sync,
    {
        E::find()
            .count(self.db().as_ref())
            .await
            .unwrap_or_default()
    }
}
