//! # Template Sources
//!
//! Where raw template pages come from. The builder only knows the
//! [`TemplateSource`] trait; hosts pick the filesystem, HTTP or an
//! in-memory map.

use crate::catalog::{PageKey, TemplateDescriptor};
use crate::errors::{TemplateError, TemplateResult};
use crate::process::process_template;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Raw contents of `file` inside `template`'s base path
    async fn fetch(&self, template: &TemplateDescriptor, file: &str) -> TemplateResult<String>;
}

/// Fetch one page of `template` and rebase its asset references
pub async fn load_page(
    source: &dyn TemplateSource,
    template: &TemplateDescriptor,
    page: &PageKey,
) -> TemplateResult<String> {
    let file = template.file_for(page)?;
    let raw = source.fetch(template, file).await?;
    tracing::debug!(template = %template.id, %page, bytes = raw.len(), "fetched template page");
    Ok(process_template(&raw, &template.base_path))
}

/// Reads `<root><base_path><file>` from disk
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, template: &TemplateDescriptor, file: &str) -> PathBuf {
        self.root
            .join(template.base_path.trim_start_matches('/'))
            .join(file)
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn fetch(&self, template: &TemplateDescriptor, file: &str) -> TemplateResult<String> {
        let path = self.path_for(template, file);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateError::Io { path, source })
    }
}

/// GETs `<origin><base_path><file>`; any non-success status is a failure
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: reqwest::Client,
    origin: String,
}

impl HttpTemplateSource {
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), origin)
    }

    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self { client, origin }
    }

    pub fn url_for(&self, template: &TemplateDescriptor, file: &str) -> String {
        let base = template.base_path.trim_start_matches('/');
        format!("{}/{}{}", self.origin, base, file)
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, template: &TemplateDescriptor, file: &str) -> TemplateResult<String> {
        let url = self.url_for(template, file);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TemplateError::Http {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// In-memory pages keyed by `<base_path><file>`
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSource {
    files: HashMap<String, String>,
}

impl StaticTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(
        mut self,
        base_path: &str,
        file: &str,
        html: impl Into<String>,
    ) -> Self {
        self.insert(base_path, file, html);
        self
    }

    pub fn insert(&mut self, base_path: &str, file: &str, html: impl Into<String>) {
        self.files.insert(format!("{}{}", base_path, file), html.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn fetch(&self, template: &TemplateDescriptor, file: &str) -> TemplateResult<String> {
        let location = format!("{}{}", template.base_path, file);
        self.files
            .get(&location)
            .cloned()
            .ok_or(TemplateError::Missing(location))
    }
}
