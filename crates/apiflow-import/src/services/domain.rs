//! Domain to variable templating
//!
//! Phase 2 rewrites `scheme://host[:port]/rest` into `{{VAR}}/rest` for
//! every enabled mapping and makes sure every environment of the
//! workspace defines `VAR` as the origin the requests were using.

use std::collections::HashMap;

use apiflow_core::Id;
use apiflow_entities::{environments, variables};
use apiflow_events::{ChangeSet, EventKind};
use apiflow_import_types::{
    DomainMapping, Environment, EnvironmentKind, HttpRequest, ImportResult, TranslationResult,
    Variable,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::{debug, info};

use super::convert::{environment_from_row, environment_model, variable_from_row, variable_model};

pub const DEFAULT_ENVIRONMENT_NAME: &str = "default";

/// Split `url` into `(origin, host, rest)` when it is absolute
fn split_origin(url: &str) -> Option<(&str, String, &str)> {
    let scheme_end = url.find("://")?;
    let authority_start = scheme_end + 3;
    let authority_len = url[authority_start..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - authority_start);
    let origin_end = authority_start + authority_len;
    let authority = &url[authority_start..origin_end];

    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else {
        host_port.split(':').next().unwrap_or_default()
    };
    if host.is_empty() {
        return None;
    }
    Some((&url[..origin_end], host.to_lowercase(), &url[origin_end..]))
}

/// Enabled mappings with a variable name, keyed by lowercased host
fn active_mappings(mappings: &[DomainMapping]) -> HashMap<String, &str> {
    mappings
        .iter()
        .filter(|m| m.enabled && !m.variable.trim().is_empty())
        .map(|m| (m.domain.trim().to_lowercase(), m.variable.trim()))
        .collect()
}

/// `{{VAR}}/rest` when the URL's host is mapped
pub fn replace_url(url: &str, mappings: &HashMap<String, &str>) -> Option<String> {
    let (_, host, rest) = split_origin(url)?;
    let variable = mappings.get(&host)?;
    Some(format!("{{{{{}}}}}{}", variable, rest))
}

/// Origin (`scheme://host[:port]`) of the first request seen per host
pub fn first_origins(requests: &[HttpRequest]) -> HashMap<String, String> {
    let mut origins = HashMap::new();
    for request in requests {
        if let Some((origin, host, _)) = split_origin(&request.url) {
            origins.entry(host).or_insert_with(|| origin.to_string());
        }
    }
    origins
}

/// Rewrite URLs of base and delta requests; returns how many changed
pub fn apply_replacements(result: &mut TranslationResult, mappings: &[DomainMapping]) -> usize {
    let active = active_mappings(mappings);
    if active.is_empty() {
        return 0;
    }

    let mut replaced = 0;
    for request in result.http_requests.iter_mut() {
        if let Some(url) = replace_url(&request.url, &active) {
            request.url = url;
            replaced += 1;
        }
    }
    debug!(replaced, mappings = active.len(), "Applied domain replacements");
    replaced
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainVariableStats {
    pub created_envs: usize,
    pub created_vars: usize,
    pub updated_vars: usize,
}

/// Writes the variables that domain mappings refer to
#[derive(Debug, Default)]
pub struct DomainProcessor;

impl DomainProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Ensure every environment of the workspace defines each mapped variable
    ///
    /// Creates a global `default` environment when the workspace has none.
    /// Existing variables keep their id and are updated in place. The
    /// caller must hold the workspace write lock until `conn` commits.
    pub async fn store_domain_variables<C: ConnectionTrait>(
        &self,
        conn: &C,
        workspace_id: Id,
        mappings: &[DomainMapping],
        origins: &HashMap<String, String>,
        changes: &mut ChangeSet,
    ) -> ImportResult<DomainVariableStats> {
        let active = active_mappings(mappings);
        let mut stats = DomainVariableStats::default();
        if active.is_empty() {
            return Ok(stats);
        }

        let mut envs: Vec<Environment> = environments::Entity::find()
            .filter(environments::Column::WorkspaceId.eq(workspace_id.to_string()))
            .order_by_asc(environments::Column::Id)
            .all(conn)
            .await?
            .iter()
            .map(environment_from_row)
            .collect::<ImportResult<_>>()?;

        if envs.is_empty() {
            let env = Environment {
                id: Id::new(),
                workspace_id,
                name: DEFAULT_ENVIRONMENT_NAME.to_string(),
                kind: EnvironmentKind::Global,
            };
            environment_model(&env).insert(conn).await?;
            changes.environment(EventKind::Create, env.clone());
            stats.created_envs += 1;
            envs.push(env);
        }

        // Stable order so repeated imports create variables identically
        let mut ordered: Vec<(&String, &&str)> = active.iter().collect();
        ordered.sort();

        for env in &envs {
            for (host, variable) in &ordered {
                let value = origins
                    .get(*host)
                    .cloned()
                    .unwrap_or_else(|| format!("https://{}", host));
                self.upsert_variable(conn, env, variable, &value, changes, &mut stats)
                    .await?;
            }
        }

        info!(
            %workspace_id,
            created_envs = stats.created_envs,
            created_vars = stats.created_vars,
            updated_vars = stats.updated_vars,
            "Stored domain variables"
        );
        Ok(stats)
    }

    async fn upsert_variable<C: ConnectionTrait>(
        &self,
        conn: &C,
        env: &Environment,
        key: &str,
        value: &str,
        changes: &mut ChangeSet,
        stats: &mut DomainVariableStats,
    ) -> ImportResult<()> {
        let existing = variables::Entity::find()
            .filter(variables::Column::EnvId.eq(env.id.to_string()))
            .filter(variables::Column::Key.eq(key))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                if row.value == value && row.enabled {
                    return Ok(());
                }
                let mut active: variables::ActiveModel = row.into();
                active.value = Set(value.to_string());
                active.enabled = Set(true);
                let updated = active.update(conn).await?;
                changes.variable(EventKind::Update, variable_from_row(&updated)?);
                stats.updated_vars += 1;
            }
            None => {
                let order = variables::Entity::find()
                    .filter(variables::Column::EnvId.eq(env.id.to_string()))
                    .all(conn)
                    .await?
                    .len() as i32;
                let variable = Variable {
                    id: Id::new(),
                    env_id: env.id,
                    key: key.to_string(),
                    value: value.to_string(),
                    enabled: true,
                    description: String::new(),
                    order,
                };
                variable_model(&variable).insert(conn).await?;
                changes.variable(EventKind::Create, variable);
                stats.created_vars += 1;
            }
        }
        Ok(())
    }
}
