//! Single-transaction persistence of a translation result
//!
//! Folders are written first, then requests in delta-parent order, then
//! the content files pointing at them, then flows with their nodes and
//! edges, then environments and domain variables. Every write goes through
//! one transaction; events are buffered in a [`ChangeSet`] and handed back
//! to the caller to publish after the commit.
//!
//! Transactions on one workspace run one at a time: the workspace write
//! lock is taken before `BEGIN` and released after `COMMIT` or `ROLLBACK`,
//! so lookups made inside the transaction stay valid until it commits.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use apiflow_core::Id;
use apiflow_entities::{
    environments, files, http_asserts, http_body_forms, http_body_raw, http_body_urlencoded,
    http_headers, http_search_params, variables,
};
use apiflow_events::{ChangeSet, EventKind};
use apiflow_import_types::{
    DomainMapping, File, FileContentType, HttpKeyValue, HttpRequest, ImportError, ImportResult,
    Node, TranslationResult, Variable,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::convert::{
    assert_model, body_form_model, body_raw_model, body_urlencoded_model, edge_model,
    environment_model, file_model, flow_model, header_model, http_model, node_model,
    node_request_model, noop_model, parse_id, search_param_model, stored_row, variable_from_row,
    variable_model,
};
use super::dedup::{http_fingerprint, join_path, Deduplicator, RequestChildren};
use super::domain::{DomainProcessor, DomainVariableStats};
use super::topo::{toposort, toposort_or_original};

/// Counters describing what one commit did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub requests_inserted: usize,
    pub requests_reused: usize,
    pub files_inserted: usize,
    pub files_reused: usize,
    /// Delta child rows dropped because the stored base already has them
    pub delta_rows_omitted: usize,
    pub environments_inserted: usize,
    pub variables_written: usize,
    pub domain: DomainVariableStats,
}

/// What a committed import left behind
#[derive(Debug, Clone)]
pub struct StoredImport {
    pub flow_id: Option<Id>,
    /// incoming request id -> canonical id
    pub http_ids: HashMap<Id, Id>,
    /// incoming file id -> canonical id
    pub file_ids: HashMap<Id, Id>,
    pub flow_ids: Vec<Id>,
    pub node_ids: Vec<Id>,
    pub edge_ids: Vec<Id>,
    pub stats: StorageStats,
    pub changes: ChangeSet,
}

fn ensure_active(cancel: &CancellationToken) -> ImportResult<()> {
    if cancel.is_cancelled() {
        return Err(ImportError::Cancelled);
    }
    Ok(())
}

/// One async write lock per workspace
#[derive(Default)]
struct WorkspaceLocks(Mutex<HashMap<Id, Arc<tokio::sync::Mutex<()>>>>);

impl WorkspaceLocks {
    fn get(&self, workspace_id: Id) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(workspace_id).or_default().clone()
    }
}

pub struct ImporterStorage {
    db: Arc<DatabaseConnection>,
    domain: DomainProcessor,
    locks: WorkspaceLocks,
}

impl ImporterStorage {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            domain: DomainProcessor::new(),
            locks: WorkspaceLocks::default(),
        }
    }

    /// Write `result` and the domain variables for `mappings` atomically
    pub async fn store(
        &self,
        result: &TranslationResult,
        mappings: &[DomainMapping],
        origins: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ImportResult<StoredImport> {
        ensure_active(cancel)?;
        let lock = self.locks.get(result.workspace_id);
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ImportError::Cancelled),
            guard = lock.lock() => guard,
        };
        debug!(workspace_id = %result.workspace_id, "Acquired workspace write lock");
        let txn = self.db.begin().await?;

        let outcome = async {
            let mut batch = Batch::new(&txn, result, &self.domain);
            batch.write_all(mappings, origins, cancel).await?;
            ensure_active(cancel)?;
            Ok::<_, ImportError>(batch.finish())
        }
        .await;

        match outcome {
            Ok(stored) => {
                txn.commit().await?;
                info!(
                    workspace_id = %result.workspace_id,
                    requests_inserted = stored.stats.requests_inserted,
                    requests_reused = stored.stats.requests_reused,
                    files_inserted = stored.stats.files_inserted,
                    files_reused = stored.stats.files_reused,
                    events = stored.changes.len(),
                    "Import committed"
                );
                Ok(stored)
            }
            Err(e) => {
                warn!(workspace_id = %result.workspace_id, error = %e, "Import failed, rolling back");
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Stored children of a base request, for clean-delta comparison
#[derive(Default)]
struct BaseChildren {
    headers: Vec<HttpKeyValue>,
    search_params: Vec<HttpKeyValue>,
    body_forms: Vec<HttpKeyValue>,
    body_urlencoded: Vec<HttpKeyValue>,
    body_raw: Option<Vec<u8>>,
    asserts: Vec<(String, bool)>,
}

macro_rules! stored_rows {
    ($conn:expr, $module:ident, $base:expr) => {
        $module::Entity::find()
            .filter($module::Column::HttpId.eq($base.to_string()))
            .all($conn)
            .await?
            .iter()
            .map(|row| stored_row(&row.key, &row.value, row.enabled, $base))
            .collect::<Vec<HttpKeyValue>>()
    };
}

fn retain_changed<'a>(
    rows: Vec<&'a HttpKeyValue>,
    base: &[HttpKeyValue],
    omitted: &mut usize,
) -> Vec<&'a HttpKeyValue> {
    let before = rows.len();
    let kept: Vec<&HttpKeyValue> = rows
        .into_iter()
        .filter(|row| !base.iter().any(|stored| stored.same_content(row)))
        .collect();
    *omitted += before - kept.len();
    kept
}

/// Mutable state of one storage transaction
struct Batch<'a, C> {
    conn: &'a C,
    result: &'a TranslationResult,
    domain: &'a DomainProcessor,
    dedup: Deduplicator,
    children: HashMap<Id, RequestChildren<'a>>,
    file_ids: HashMap<Id, Id>,
    /// incoming folder id -> logical path
    paths: HashMap<Id, String>,
    http_ids: HashMap<Id, Id>,
    /// canonical request id -> fingerprint
    fingerprints: HashMap<Id, String>,
    /// canonical ids of requests that already existed
    reused: HashSet<Id>,
    flow_ids: Vec<Id>,
    node_ids: Vec<Id>,
    edge_ids: Vec<Id>,
    stats: StorageStats,
    changes: ChangeSet,
}

impl<'a, C: ConnectionTrait> Batch<'a, C> {
    fn new(conn: &'a C, result: &'a TranslationResult, domain: &'a DomainProcessor) -> Self {
        let mut children: HashMap<Id, RequestChildren<'a>> = HashMap::new();
        for row in &result.headers {
            children.entry(row.http_id).or_default().headers.push(row);
        }
        for row in &result.search_params {
            children.entry(row.http_id).or_default().search_params.push(row);
        }
        for row in &result.body_forms {
            children.entry(row.http_id).or_default().body_forms.push(row);
        }
        for row in &result.body_urlencoded {
            children.entry(row.http_id).or_default().body_urlencoded.push(row);
        }
        for body in &result.body_raw {
            children.entry(body.http_id).or_default().body_raw = Some(body);
        }
        for assert in &result.asserts {
            children.entry(assert.http_id).or_default().asserts.push(assert);
        }

        Self {
            conn,
            result,
            domain,
            dedup: Deduplicator::new(result.workspace_id),
            children,
            file_ids: HashMap::new(),
            paths: HashMap::new(),
            http_ids: HashMap::new(),
            fingerprints: HashMap::new(),
            reused: HashSet::new(),
            flow_ids: Vec::new(),
            node_ids: Vec::new(),
            edge_ids: Vec::new(),
            stats: StorageStats::default(),
            changes: ChangeSet::new(),
        }
    }

    async fn write_all(
        &mut self,
        mappings: &[DomainMapping],
        origins: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ImportResult<()> {
        let result = self.result;
        let files = toposort(result.files.iter().collect(), "files", |f: &&File| {
            (f.id, f.parent_id)
        })?;

        self.write_folders(&files).await?;
        ensure_active(cancel)?;
        self.write_requests().await?;
        ensure_active(cancel)?;
        self.write_content_files(&files).await?;
        ensure_active(cancel)?;
        self.write_flows().await?;
        ensure_active(cancel)?;
        self.write_environments().await?;
        ensure_active(cancel)?;

        self.stats.domain = self
            .domain
            .store_domain_variables(
                self.conn,
                self.result.workspace_id,
                mappings,
                origins,
                &mut self.changes,
            )
            .await?;
        Ok(())
    }

    fn finish(self) -> StoredImport {
        StoredImport {
            flow_id: self.result.primary_flow().map(|flow| flow.id),
            http_ids: self.http_ids,
            file_ids: self.file_ids,
            flow_ids: self.flow_ids,
            node_ids: self.node_ids,
            edge_ids: self.edge_ids,
            stats: self.stats,
            changes: self.changes,
        }
    }

    /// Canonical parent id and its logical path
    ///
    /// A parent outside the batch is assumed stored and addressed by id.
    fn parent_of(&self, parent: Option<Id>) -> (Option<Id>, String) {
        match parent {
            None => (None, String::new()),
            Some(parent) => match (self.file_ids.get(&parent), self.paths.get(&parent)) {
                (Some(canonical), Some(path)) => (Some(*canonical), path.clone()),
                _ => (Some(parent), format!("/@{}", parent)),
            },
        }
    }

    async fn write_folders(&mut self, files: &[&File]) -> ImportResult<()> {
        let workspace_id = self.result.workspace_id;
        for file in files
            .iter()
            .filter(|f| f.content_type == FileContentType::Folder)
        {
            let (parent_id, parent_path) = self.parent_of(file.parent_id);
            let path = join_path(&parent_path, &file.name);
            let resolution = self.dedup.resolve_folder(self.conn, file.id, &path).await?;

            self.file_ids.insert(file.id, resolution.canonical_id);
            self.paths.insert(file.id, path);
            if !resolution.is_new {
                self.stats.files_reused += 1;
                continue;
            }

            let stored = File {
                id: resolution.canonical_id,
                parent_id,
                path_hash: Some(resolution.key),
                ..(*file).clone()
            };
            file_model(&stored).insert(self.conn).await?;
            debug!(%workspace_id, file_id = %stored.id, name = %stored.name, "Folder created");
            self.changes.file(EventKind::Insert, stored);
            self.stats.files_inserted += 1;
        }
        Ok(())
    }

    async fn write_requests(&mut self) -> ImportResult<()> {
        let result = self.result;
        let requests = toposort(
            result.http_requests.iter().collect(),
            "http",
            |r: &&HttpRequest| (r.id, r.delta_parent_id),
        )?;

        for request in requests {
            let mut stored = request.clone();
            stored.parent_folder_id = request
                .parent_folder_id
                .map(|folder| self.file_ids.get(&folder).copied().unwrap_or(folder));
            stored.delta_parent_id = request
                .delta_parent_id
                .map(|base| self.http_ids.get(&base).copied().unwrap_or(base));

            let children = self.children.get(&request.id).cloned().unwrap_or_default();
            let parent_fingerprint = stored
                .delta_parent_id
                .and_then(|base| self.fingerprints.get(&base).cloned());
            let fingerprint = http_fingerprint(&stored, &children, parent_fingerprint.as_deref());

            let resolution = self
                .dedup
                .resolve_http(self.conn, request.id, fingerprint.clone(), request.is_delta)
                .await?;
            self.http_ids.insert(request.id, resolution.canonical_id);
            self.fingerprints
                .insert(resolution.canonical_id, fingerprint.clone());

            if !resolution.is_new {
                self.reused.insert(resolution.canonical_id);
                self.stats.requests_reused += 1;
                continue;
            }

            let children = match stored.delta_parent_id {
                Some(base) if self.reused.contains(&base) => {
                    self.clean_delta(base, children).await?
                }
                _ => children,
            };
            self.insert_request(stored, fingerprint, children).await?;
        }
        Ok(())
    }

    /// Drop delta rows the stored base already carries
    async fn clean_delta(
        &mut self,
        base: Id,
        children: RequestChildren<'a>,
    ) -> ImportResult<RequestChildren<'a>> {
        let stored = self.base_children(base).await?;
        let omitted = &mut self.stats.delta_rows_omitted;

        let body_raw = children
            .body_raw
            .filter(|raw| stored.body_raw.as_deref() != Some(raw.raw_data.as_slice()));
        if children.body_raw.is_some() && body_raw.is_none() {
            *omitted += 1;
        }
        let asserts_before = children.asserts.len();
        let asserts: Vec<_> = children
            .asserts
            .into_iter()
            .filter(|a| {
                !stored
                    .asserts
                    .iter()
                    .any(|(expression, enabled)| *expression == a.expression && *enabled == a.enabled)
            })
            .collect();
        *omitted += asserts_before - asserts.len();

        Ok(RequestChildren {
            headers: retain_changed(children.headers, &stored.headers, omitted),
            search_params: retain_changed(children.search_params, &stored.search_params, omitted),
            body_forms: retain_changed(children.body_forms, &stored.body_forms, omitted),
            body_urlencoded: retain_changed(children.body_urlencoded, &stored.body_urlencoded, omitted),
            body_raw,
            asserts,
        })
    }

    async fn base_children(&self, base: Id) -> ImportResult<BaseChildren> {
        let conn = self.conn;
        let body_raw = http_body_raw::Entity::find()
            .filter(http_body_raw::Column::HttpId.eq(base.to_string()))
            .one(conn)
            .await?
            .map(|row| row.raw_data);
        let asserts = http_asserts::Entity::find()
            .filter(http_asserts::Column::HttpId.eq(base.to_string()))
            .all(conn)
            .await?
            .into_iter()
            .map(|row| (row.expression, row.enabled))
            .collect();

        Ok(BaseChildren {
            headers: stored_rows!(conn, http_headers, base),
            search_params: stored_rows!(conn, http_search_params, base),
            body_forms: stored_rows!(conn, http_body_forms, base),
            body_urlencoded: stored_rows!(conn, http_body_urlencoded, base),
            body_raw,
            asserts,
        })
    }

    async fn insert_request(
        &mut self,
        request: HttpRequest,
        fingerprint: String,
        children: RequestChildren<'a>,
    ) -> ImportResult<()> {
        let workspace_id = self.result.workspace_id;
        let conn = self.conn;

        http_model(&request, Some(fingerprint)).insert(conn).await?;
        for row in children.headers {
            header_model(row).insert(conn).await?;
            self.changes.header(workspace_id, EventKind::Insert, row.clone());
        }
        for row in children.search_params {
            search_param_model(row).insert(conn).await?;
            self.changes
                .search_param(workspace_id, EventKind::Insert, row.clone());
        }
        for row in children.body_forms {
            body_form_model(row).insert(conn).await?;
            self.changes.body_form(workspace_id, EventKind::Insert, row.clone());
        }
        for row in children.body_urlencoded {
            body_urlencoded_model(row).insert(conn).await?;
            self.changes
                .body_urlencoded(workspace_id, EventKind::Insert, row.clone());
        }
        if let Some(body) = children.body_raw {
            body_raw_model(body).insert(conn).await?;
            self.changes.body_raw(workspace_id, EventKind::Insert, body.clone());
        }
        for assert in children.asserts {
            assert_model(assert).insert(conn).await?;
            self.changes.assert(workspace_id, EventKind::Insert, assert.clone());
        }

        debug!(%workspace_id, http_id = %request.id, delta = request.is_delta, "Request stored");
        self.changes.http_request(EventKind::Insert, request);
        self.stats.requests_inserted += 1;
        Ok(())
    }

    async fn write_content_files(&mut self, files: &[&File]) -> ImportResult<()> {
        for file in files
            .iter()
            .filter(|f| f.content_type != FileContentType::Folder)
        {
            let (parent_id, parent_path) = self.parent_of(file.parent_id);
            let content_id = file
                .content_id
                .map(|content| self.http_ids.get(&content).copied().unwrap_or(content));

            let (resolution, name) = self
                .dedup
                .claim_content_file(
                    self.conn,
                    file.id,
                    &parent_path,
                    &file.name,
                    file.content_type,
                    content_id,
                )
                .await?;
            self.file_ids.insert(file.id, resolution.canonical_id);
            if !resolution.is_new {
                self.stats.files_reused += 1;
                continue;
            }

            let stored = File {
                id: resolution.canonical_id,
                parent_id,
                content_id,
                name,
                path_hash: Some(resolution.key),
                ..(*file).clone()
            };
            file_model(&stored).insert(self.conn).await?;
            self.changes.file(EventKind::Insert, stored);
            self.stats.files_inserted += 1;
        }
        Ok(())
    }

    /// Flows are always new; each also gets a root file in the sidebar
    async fn write_flows(&mut self) -> ImportResult<()> {
        let workspace_id = self.result.workspace_id;
        let conn = self.conn;

        for flow in &self.result.flows {
            flow_model(flow).insert(conn).await?;
            self.changes.flow(EventKind::Insert, flow.clone());
            self.flow_ids.push(flow.id);
        }
        // Nodes go out in run order; flows that loop keep translation order
        let first_source: HashMap<Id, Id> = self
            .result
            .edges
            .iter()
            .rev()
            .map(|edge| (edge.target_id, edge.source_id))
            .collect();
        let nodes = toposort_or_original(self.result.nodes.iter().collect(), "nodes", |n: &&Node| {
            (n.id, first_source.get(&n.id).copied())
        });
        for node in nodes {
            node_model(node).insert(conn).await?;
            self.changes.node(workspace_id, EventKind::Insert, node.clone());
            self.node_ids.push(node.id);
        }
        for request_node in &self.result.request_nodes {
            let mut rewired = request_node.clone();
            rewired.http_id = request_node
                .http_id
                .map(|id| self.http_ids.get(&id).copied().unwrap_or(id));
            rewired.delta_http_id = request_node
                .delta_http_id
                .map(|id| self.http_ids.get(&id).copied().unwrap_or(id));
            node_request_model(&rewired).insert(conn).await?;
        }
        for noop in &self.result.noop_nodes {
            noop_model(noop).insert(conn).await?;
        }
        for edge in &self.result.edges {
            edge_model(edge).insert(conn).await?;
            self.changes.edge(workspace_id, EventKind::Insert, edge.clone());
            self.edge_ids.push(edge.id);
        }

        // Sidebar entries go after everything already at the workspace root
        let next_root_order = files::Entity::find()
            .filter(files::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(files::Column::ParentId.is_null())
            .order_by_desc(files::Column::DisplayOrder)
            .one(conn)
            .await?
            .map(|row| row.display_order + 1)
            .unwrap_or(0);

        let now = chrono::Utc::now();
        for (index, flow) in self.result.flows.iter().enumerate() {
            let sidebar = File {
                id: flow.id,
                workspace_id,
                parent_id: None,
                content_id: Some(flow.id),
                content_type: FileContentType::Flow,
                name: flow.name.clone(),
                order: next_root_order + index as i32,
                path_hash: None,
                updated_at: now,
            };
            file_model(&sidebar).insert(conn).await?;
            self.changes.file(EventKind::Create, sidebar);
        }

        debug!(
            %workspace_id,
            flows = self.result.flows.len(),
            nodes = self.result.nodes.len(),
            edges = self.result.edges.len(),
            "Flows stored"
        );
        Ok(())
    }

    /// Environments merge by name; their variables are upserted by key
    async fn write_environments(&mut self) -> ImportResult<()> {
        let workspace_id = self.result.workspace_id;
        let conn = self.conn;
        let mut env_ids: HashMap<Id, Id> = HashMap::new();

        for env in &self.result.environments {
            let existing = environments::Entity::find()
                .filter(environments::Column::WorkspaceId.eq(workspace_id.to_string()))
                .filter(environments::Column::Name.eq(env.name.clone()))
                .one(conn)
                .await?;
            let canonical = match existing {
                Some(row) => parse_id(&row.id)?,
                None => {
                    environment_model(env).insert(conn).await?;
                    self.changes.environment(EventKind::Insert, env.clone());
                    self.stats.environments_inserted += 1;
                    env.id
                }
            };
            env_ids.insert(env.id, canonical);
        }

        for variable in &self.result.variables {
            let env_id = env_ids
                .get(&variable.env_id)
                .copied()
                .unwrap_or(variable.env_id);
            let existing = variables::Entity::find()
                .filter(variables::Column::EnvId.eq(env_id.to_string()))
                .filter(variables::Column::Key.eq(variable.key.clone()))
                .one(conn)
                .await?;
            match existing {
                None => {
                    let stored = Variable {
                        env_id,
                        ..variable.clone()
                    };
                    variable_model(&stored).insert(conn).await?;
                    self.changes.variable(EventKind::Insert, stored);
                    self.stats.variables_written += 1;
                }
                Some(row) if row.value == variable.value && row.enabled == variable.enabled => {}
                Some(row) => {
                    let mut active: variables::ActiveModel = row.into();
                    active.value = Set(variable.value.clone());
                    active.enabled = Set(variable.enabled);
                    let updated = active.update(conn).await?;
                    self.changes
                        .variable(EventKind::Update, variable_from_row(&updated)?);
                    self.stats.variables_written += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_database::test_utils::TestDatabase;
    use apiflow_entities::{files, flows, http};
    use apiflow_import_types::{
        EnvironmentKind, ImportFormat, KeyValueDraft, RequestDraft, TranslationBuilder,
    };
    use sea_orm::PaginatorTrait;

    fn har_like(workspace_id: Id, delta: bool) -> TranslationResult {
        let mut builder = TranslationBuilder::new(ImportFormat::Har, workspace_id);
        let folder = builder.folder_path(&["com", "example", "api"]);
        let flow = builder.add_flow("recording");
        let draft = RequestDraft::new("GET /users", "GET", "https://api.example.com/users?page=1")
            .header("Accept", "application/json");
        let created = builder.add_request(draft.clone(), folder);
        let delta_id = delta.then(|| builder.add_delta(created.http_id, draft));
        let node = builder.add_request_node(
            flow.flow_id,
            "GET /users",
            created.http_id,
            delta_id,
            (0.0, 150.0),
        );
        builder.add_edge(flow.flow_id, flow.start_node_id, node);
        builder.build(true)
    }

    async fn count<E: EntityTrait>(db: &DatabaseConnection) -> u64
    where
        E::Model: Sync,
    {
        E::find().count(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_store_writes_everything_once() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let storage = ImporterStorage::new(db.clone());

        let result = har_like(workspace_id, false);
        let stored = storage
            .store(&result, &[], &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stored.flow_id, Some(result.flows[0].id));
        assert_eq!(stored.stats.requests_inserted, 1);
        // three folders, one request file
        assert_eq!(stored.stats.files_inserted, 4);
        assert_eq!(count::<http::Entity>(&db).await, 1);
        // plus the sidebar file of the flow
        assert_eq!(count::<files::Entity>(&db).await, 5);
        assert_eq!(stored.changes.http.len(), 1);
        assert_eq!(stored.changes.headers.len(), 1);
        assert_eq!(stored.changes.search_params.len(), 1);

        let sidebar = files::Entity::find_by_id(result.flows[0].id.to_string())
            .one(db.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sidebar.content_type, FileContentType::Flow);
        assert_eq!(sidebar.path_hash, None);
    }

    #[tokio::test]
    async fn test_flow_sidebar_files_follow_root_folders() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let storage = ImporterStorage::new(db.clone());
        let token = CancellationToken::new();

        for _ in 0..2 {
            let result = har_like(workspace_id, false);
            storage.store(&result, &[], &HashMap::new(), &token).await.unwrap();
        }

        let mut roots = files::Entity::find()
            .filter(files::Column::WorkspaceId.eq(workspace_id.to_string()))
            .filter(files::Column::ParentId.is_null())
            .all(db.as_ref())
            .await
            .unwrap();
        roots.sort_by_key(|f| f.display_order);
        let kinds: Vec<FileContentType> = roots.iter().map(|f| f.content_type).collect();
        assert_eq!(
            kinds,
            vec![FileContentType::Folder, FileContentType::Flow, FileContentType::Flow]
        );
        let mut orders: Vec<i32> = roots.iter().map(|f| f.display_order).collect();
        orders.dedup();
        assert_eq!(orders.len(), 3);
    }

    #[tokio::test]
    async fn test_reimport_reuses_requests_and_files() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let storage = ImporterStorage::new(db.clone());
        let token = CancellationToken::new();

        let first = har_like(workspace_id, false);
        storage.store(&first, &[], &HashMap::new(), &token).await.unwrap();
        let second = har_like(workspace_id, false);
        let stored = storage.store(&second, &[], &HashMap::new(), &token).await.unwrap();

        assert_eq!(stored.stats.requests_inserted, 0);
        assert_eq!(stored.stats.requests_reused, 1);
        assert_eq!(stored.stats.files_inserted, 0);
        assert!(stored.changes.http.is_empty());
        assert!(stored
            .changes
            .files
            .iter()
            .all(|(_, event)| event.kind == EventKind::Create));

        assert_eq!(count::<http::Entity>(&db).await, 1);
        assert_eq!(count::<flows::Entity>(&db).await, 2);

        // the new flow points at the stored request
        let canonical = stored.http_ids[&second.http_requests[0].id];
        assert_eq!(canonical, first.http_requests[0].id);
    }

    #[tokio::test]
    async fn test_reimported_delta_is_clean() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let storage = ImporterStorage::new(db.clone());
        let token = CancellationToken::new();

        let first = storage
            .store(&har_like(workspace_id, true), &[], &HashMap::new(), &token)
            .await
            .unwrap();
        assert_eq!(first.stats.requests_inserted, 2);
        assert_eq!(first.changes.headers.len(), 2);

        let second = storage
            .store(&har_like(workspace_id, true), &[], &HashMap::new(), &token)
            .await
            .unwrap();
        assert_eq!(second.stats.requests_inserted, 1);
        assert!(second.changes.headers.is_empty());
        assert!(second.changes.search_params.is_empty());
        assert_eq!(second.stats.delta_rows_omitted, 2);

        let (_, delta_event) = &second.changes.http[0];
        assert!(delta_event.entity.is_delta);
        let headers = http_headers::Entity::find()
            .filter(http_headers::Column::HttpId.eq(delta_event.entity.id.to_string()))
            .count(db.as_ref())
            .await
            .unwrap();
        assert_eq!(headers, 0);
    }

    #[tokio::test]
    async fn test_name_collision_gets_suffix() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();

        let mut builder = TranslationBuilder::new(ImportFormat::Postman, workspace_id);
        let folder = builder.folder_path(&["api"]);
        builder.add_request(RequestDraft::new("users", "GET", "https://a.example.com/users"), folder);
        builder.add_request(RequestDraft::new("users", "POST", "https://a.example.com/users"), folder);
        let result = builder.build(false);

        let stored = ImporterStorage::new(db.clone())
            .store(&result, &[], &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();
        let mut names: Vec<String> = stored
            .changes
            .files
            .iter()
            .filter(|(_, e)| e.entity.content_type == FileContentType::Http)
            .map(|(_, e)| e.entity.name.clone())
            .collect();
        names.sort();
        assert_eq!(names, vec!["users".to_string(), "users (1)".to_string()]);
    }

    #[tokio::test]
    async fn test_environments_merge_by_name() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let storage = ImporterStorage::new(db.clone());
        let token = CancellationToken::new();

        let build = |value: &str| {
            let mut builder = TranslationBuilder::new(ImportFormat::Postman, workspace_id);
            let env = builder.add_environment("Petstore", EnvironmentKind::Custom);
            builder.add_variable(env, KeyValueDraft::new("baseUrl", value));
            builder.build(false)
        };

        storage.store(&build("https://a"), &[], &HashMap::new(), &token).await.unwrap();
        let stored = storage.store(&build("https://b"), &[], &HashMap::new(), &token).await.unwrap();

        assert_eq!(stored.stats.environments_inserted, 0);
        assert_eq!(stored.changes.variables.len(), 1);
        assert_eq!(stored.changes.variables[0].1.kind, EventKind::Update);
        assert_eq!(stored.changes.variables[0].1.entity.value, "https://b");
        assert_eq!(count::<environments::Entity>(&db).await, 1);
        assert_eq!(count::<variables::Entity>(&db).await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_store_writes_nothing() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();
        let token = CancellationToken::new();
        token.cancel();

        let err = ImporterStorage::new(db.clone())
            .store(&har_like(workspace_id, false), &[], &HashMap::new(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
        assert_eq!(count::<http::Entity>(&db).await, 0);
        assert_eq!(count::<files::Entity>(&db).await, 0);
    }

    #[tokio::test]
    async fn test_failure_rolls_back() {
        let (test_db, workspace_id) = TestDatabase::with_workspace().await.unwrap();
        let db = test_db.connection();

        // a duplicated flow id violates the primary key
        let mut result = har_like(workspace_id, false);
        let duplicate = result.flows[0].clone();
        result.flows.push(duplicate);

        let err = ImporterStorage::new(db.clone())
            .store(&result, &[], &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Storage(_)));
        assert_eq!(count::<http::Entity>(&db).await, 0);
        assert_eq!(count::<files::Entity>(&db).await, 0);
        assert_eq!(count::<flows::Entity>(&db).await, 0);
    }
}
