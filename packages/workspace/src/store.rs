//! # Site Persistence
//!
//! The builder treats persistence as an opaque document store: one record
//! per site, read whole and replaced whole.

use crate::catalog::PageMap;
use crate::errors::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub site_id: String,
    pub user_id: String,
    pub page_contents: PageMap,
    #[serde(default)]
    pub page_data: serde_json::Value,
    pub template_id: String,
    pub saved_at: DateTime<Utc>,
}

#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn read(&self, site_id: &str, user_id: &str) -> StoreResult<Option<SiteRecord>>;

    /// Replace any prior record for the same site and user
    async fn upsert(&self, record: SiteRecord) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemorySiteStore {
    records: RwLock<HashMap<(String, String), SiteRecord>>,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn read(&self, site_id: &str, user_id: &str) -> StoreResult<Option<SiteRecord>> {
        let key = (site_id.to_string(), user_id.to_string());
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn upsert(&self, record: SiteRecord) -> StoreResult<()> {
        let key = (record.site_id.clone(), record.user_id.clone());
        self.records.write().await.insert(key, record);
        Ok(())
    }
}

/// One `builder-save-<site>.json` file per site
#[derive(Debug, Clone)]
pub struct JsonFileSiteStore {
    dir: PathBuf,
}

impl JsonFileSiteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Distinct site ids always map to distinct files
    pub fn path_for(&self, site_id: &str) -> PathBuf {
        self.dir.join(format!("builder-save-{}.json", encode_file_stem(site_id)))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]`, `%` included
fn encode_file_stem(site_id: &str) -> String {
    let mut stem = String::with_capacity(site_id.len());
    for byte in site_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

#[async_trait]
impl SiteStore for JsonFileSiteStore {
    async fn read(&self, site_id: &str, user_id: &str) -> StoreResult<Option<SiteRecord>> {
        let path = self.path_for(site_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let record: SiteRecord = serde_json::from_slice(&bytes)?;
        if record.site_id != site_id || record.user_id != user_id {
            tracing::debug!(path = %path.display(), "saved record belongs to another site or user");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn upsert(&self, record: SiteRecord) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&record.site_id);
        let staging = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::debug!(path = %path.display(), pages = record.page_contents.len(), "wrote site record");
        Ok(())
    }
}
