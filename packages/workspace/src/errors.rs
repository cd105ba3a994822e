use crate::catalog::PageKey;
use sitebuilder_editor::EditorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template {0} not found")]
    UnknownTemplate(String),

    #[error("Template {template} has no page {page}")]
    UnknownPage { template: String, page: PageKey },

    #[error("Invalid page key: {0:?}")]
    InvalidPageKey(String),

    #[error("Failed to load template: {url} returned {status}")]
    Http { url: String, status: u16 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("No template file at {0}")]
    Missing(String),

    #[error("Invalid template catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt site record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("A save is already in progress")]
    AlreadySaving,

    #[error("Invalid builder config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type TemplateResult<T> = Result<T, TemplateError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type BuilderResult<T> = Result<T, BuilderError>;
