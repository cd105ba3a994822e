//! # Site Builder Workspace
//!
//! Everything around the editing engine that touches the outside world:
//! the template catalog, fetching and processing template pages, the page
//! map reconciler and site persistence.
//!
//! ```rust,ignore
//! let mut builder = Builder::open(
//!     BuilderConfig::default(),
//!     &TemplateCatalog::builtin(),
//!     Arc::new(HttpTemplateSource::new("http://localhost:3000")),
//!     Arc::new(JsonFileSiteStore::new("saves")),
//!     "modern-minimal-42",
//!     "user-7",
//! )
//! .await?;
//!
//! builder.switch_page("about".parse()?).await?;
//! builder.save().await?;
//! ```

mod builder;
pub mod catalog;
mod config;
mod errors;
pub mod process;
pub mod source;
pub mod store;

pub use builder::{Builder, SavePlan, SaveReport};
pub use catalog::{PageKey, PageMap, TemplateCatalog, TemplateDescriptor};
pub use config::BuilderConfig;
pub use errors::{
    BuilderError, BuilderResult, StoreError, StoreResult, TemplateError, TemplateResult,
};
pub use process::process_template;
pub use source::{
    load_page, FsTemplateSource, HttpTemplateSource, StaticTemplateSource, TemplateSource,
};
pub use store::{JsonFileSiteStore, MemorySiteStore, SiteRecord, SiteStore};

pub use sitebuilder_editor as editor;
