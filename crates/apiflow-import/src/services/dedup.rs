//! Content fingerprints and logical paths used to recognise re-imports
//!
//! Memo tables live for one storage transaction. Base requests and files
//! fall back to a storage lookup on a memo miss; delta requests never do,
//! so every import gets fresh overlays.

use std::collections::HashMap;
use std::str::FromStr;

use apiflow_core::Id;
use apiflow_entities::{files, http};
use apiflow_import_types::{
    FileContentType, HttpAssert, HttpBodyRaw, HttpKeyValue, HttpRequest, ImportError,
    ImportResult,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Collision suffixes tried before giving up on a file name
const MAX_NAME_SUFFIX: usize = 10_000;

/// Children of one request, borrowed from a `TranslationResult`
#[derive(Debug, Default, Clone)]
pub struct RequestChildren<'a> {
    pub headers: Vec<&'a HttpKeyValue>,
    pub search_params: Vec<&'a HttpKeyValue>,
    pub body_forms: Vec<&'a HttpKeyValue>,
    pub body_urlencoded: Vec<&'a HttpKeyValue>,
    pub body_raw: Option<&'a HttpBodyRaw>,
    pub asserts: Vec<&'a HttpAssert>,
}

/// Outcome of resolving one incoming entity against memo and storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical_id: Id,
    pub is_new: bool,
    pub key: String,
}

/// Streams length-prefixed fields into a SHA-256 digest
struct FieldHasher(Sha256);

impl FieldHasher {
    fn new() -> Self {
        Self(Sha256::new())
    }

    fn field(&mut self, value: impl AsRef<[u8]>) -> &mut Self {
        let bytes = value.as_ref();
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    fn finish(self) -> String {
        hex::encode(self.0.finalize())
    }
}

fn hash_rows(hasher: &mut FieldHasher, tag: &str, rows: &[&HttpKeyValue], fold_keys: bool) {
    let mut sorted: Vec<(String, &str, bool)> = rows
        .iter()
        .map(|row| {
            let key = if fold_keys {
                row.key.to_lowercase()
            } else {
                row.key.clone()
            };
            (key, row.value.as_str(), row.enabled)
        })
        .collect();
    sorted.sort();

    hasher.field(tag).field((sorted.len() as u64).to_le_bytes());
    for (key, value, enabled) in sorted {
        hasher.field(key).field(value).field([enabled as u8]);
    }
}

/// Content fingerprint of a request
///
/// Covers the workspace, URL, method, sorted headers and params, the body
/// and, for deltas, the base request's fingerprint.
pub fn http_fingerprint(
    request: &HttpRequest,
    children: &RequestChildren<'_>,
    parent_fingerprint: Option<&str>,
) -> String {
    let mut hasher = FieldHasher::new();
    hasher
        .field(request.workspace_id.as_bytes())
        .field(&request.url)
        .field(request.method.to_uppercase());

    hash_rows(&mut hasher, "headers", &children.headers, true);
    hash_rows(&mut hasher, "params", &children.search_params, false);

    hasher.field(request.body_kind.as_str());
    let mut body = FieldHasher::new();
    if let Some(raw) = children.body_raw {
        body.field(&raw.raw_data);
    }
    hash_rows(&mut body, "form", &children.body_forms, false);
    hash_rows(&mut body, "urlencoded", &children.body_urlencoded, false);
    hasher.field(body.finish());

    hasher.field([request.is_delta as u8]);
    if let Some(parent) = parent_fingerprint {
        hasher.field(parent);
    }
    hasher.finish()
}

/// Escape a file name for use as one logical path segment
pub fn path_segment(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2F")
}

pub fn join_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, path_segment(name))
}

/// Hash persisted in `files.path_hash`
pub fn path_hash(workspace_id: Id, logical_path: &str, kind: FileContentType) -> String {
    let mut hasher = FieldHasher::new();
    hasher
        .field(workspace_id.as_bytes())
        .field(kind.as_str())
        .field(logical_path);
    hasher.finish()
}

fn parse_stored_id(raw: &str) -> ImportResult<Id> {
    Id::from_str(raw).map_err(|e| ImportError::Integrity(format!("stored id {}: {}", raw, e)))
}

/// Per-transaction resolution of requests and files to canonical ids
pub struct Deduplicator {
    workspace_id: Id,
    http_memo: HashMap<String, Id>,
    /// path hash -> (file id, content id)
    file_memo: HashMap<String, (Id, Option<Id>)>,
}

impl Deduplicator {
    pub fn new(workspace_id: Id) -> Self {
        Self {
            workspace_id,
            http_memo: HashMap::new(),
            file_memo: HashMap::new(),
        }
    }

    pub async fn resolve_http<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        incoming_id: Id,
        fingerprint: String,
        is_delta: bool,
    ) -> ImportResult<Resolution> {
        if let Some(existing) = self.http_memo.get(&fingerprint) {
            return Ok(Resolution {
                canonical_id: *existing,
                is_new: false,
                key: fingerprint,
            });
        }

        if !is_delta {
            let stored = http::Entity::find()
                .filter(http::Column::WorkspaceId.eq(self.workspace_id.to_string()))
                .filter(http::Column::Fingerprint.eq(fingerprint.clone()))
                .filter(http::Column::IsDelta.eq(false))
                .one(conn)
                .await?;
            if let Some(row) = stored {
                let canonical_id = parse_stored_id(&row.id)?;
                debug!(%incoming_id, %canonical_id, "Request already stored");
                self.http_memo.insert(fingerprint.clone(), canonical_id);
                return Ok(Resolution {
                    canonical_id,
                    is_new: false,
                    key: fingerprint,
                });
            }
        }

        self.http_memo.insert(fingerprint.clone(), incoming_id);
        Ok(Resolution {
            canonical_id: incoming_id,
            is_new: true,
            key: fingerprint,
        })
    }

    /// Folders with the same logical path are the same folder
    pub async fn resolve_folder<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        incoming_id: Id,
        logical_path: &str,
    ) -> ImportResult<Resolution> {
        let hash = path_hash(self.workspace_id, logical_path, FileContentType::Folder);
        if let Some((existing, _)) = self.file_memo.get(&hash) {
            return Ok(Resolution {
                canonical_id: *existing,
                is_new: false,
                key: hash,
            });
        }

        if let Some(row) = self.stored_file(conn, &hash).await? {
            let canonical_id = parse_stored_id(&row.id)?;
            self.file_memo.insert(hash.clone(), (canonical_id, None));
            return Ok(Resolution {
                canonical_id,
                is_new: false,
                key: hash,
            });
        }

        self.file_memo.insert(hash.clone(), (incoming_id, None));
        Ok(Resolution {
            canonical_id: incoming_id,
            is_new: true,
            key: hash,
        })
    }

    /// Place a content file in `folder_path`, returning the name it got
    ///
    /// A path already holding the same content is reused. A path holding
    /// other content makes the name collide and ` (n)` is appended.
    pub async fn claim_content_file<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        incoming_id: Id,
        folder_path: &str,
        name: &str,
        kind: FileContentType,
        content_id: Option<Id>,
    ) -> ImportResult<(Resolution, String)> {
        for attempt in 0..MAX_NAME_SUFFIX {
            let candidate = if attempt == 0 {
                name.to_string()
            } else {
                format!("{} ({})", name, attempt)
            };
            let hash = path_hash(self.workspace_id, &join_path(folder_path, &candidate), kind);

            if let Some((existing, existing_content)) = self.file_memo.get(&hash) {
                if *existing_content == content_id {
                    let resolution = Resolution {
                        canonical_id: *existing,
                        is_new: false,
                        key: hash,
                    };
                    return Ok((resolution, candidate));
                }
                continue;
            }

            if let Some(row) = self.stored_file(conn, &hash).await? {
                let stored_content = row.content_id.as_deref().map(parse_stored_id).transpose()?;
                let canonical_id = parse_stored_id(&row.id)?;
                self.file_memo
                    .insert(hash.clone(), (canonical_id, stored_content));
                if stored_content == content_id {
                    let resolution = Resolution {
                        canonical_id,
                        is_new: false,
                        key: hash,
                    };
                    return Ok((resolution, candidate));
                }
                continue;
            }

            self.file_memo
                .insert(hash.clone(), (incoming_id, content_id));
            let resolution = Resolution {
                canonical_id: incoming_id,
                is_new: true,
                key: hash,
            };
            return Ok((resolution, candidate));
        }

        Err(ImportError::Internal(format!(
            "no free file name for {} in {}",
            name, folder_path
        )))
    }

    async fn stored_file<C: ConnectionTrait>(
        &self,
        conn: &C,
        hash: &str,
    ) -> ImportResult<Option<files::Model>> {
        Ok(files::Entity::find()
            .filter(files::Column::WorkspaceId.eq(self.workspace_id.to_string()))
            .filter(files::Column::PathHash.eq(hash))
            .one(conn)
            .await?)
    }
}
