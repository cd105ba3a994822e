//! # Page/Session Reconciler
//!
//! [`Builder`] owns the editor session for one site together with the page
//! map: the buffered HTML of every page the user has visited. It swaps pages
//! in and out of the session and produces the complete payload for
//! persistence.
//!
//! Saving is split in two so the host can keep the session responsive while
//! the network work runs:
//!
//! ```text
//! begin_save (&mut)      capture live page, gate concurrent saves
//!     ↓
//! SavePlan::execute      backfill unvisited pages, upsert record
//!     ↓
//! finish_save (&mut)     release gate, merge backfill, notify
//! ```
//!
//! Edits made after `begin_save` are not part of that save. The gate is
//! held by the [`SavePlan`] and released when it is dropped, so a cancelled
//! or abandoned save never blocks the next one.

use crate::catalog::{PageKey, PageMap, TemplateCatalog, TemplateDescriptor};
use crate::config::BuilderConfig;
use crate::errors::{BuilderError, BuilderResult, TemplateError};
use crate::source::{load_page, TemplateSource};
use crate::store::{SiteRecord, SiteStore};
use chrono::Utc;
use futures::future::join_all;
use sitebuilder_editor::{EditorSession, NotificationLevel, SessionEvent};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Builder {
    config: BuilderConfig,
    site_id: String,
    user_id: String,
    template: TemplateDescriptor,
    source: Arc<dyn TemplateSource>,
    store: Arc<dyn SiteStore>,
    session: EditorSession,
    pages: PageMap,
    page_data: serde_json::Value,
    current: PageKey,
    saving: Arc<AtomicBool>,
}

impl Builder {
    /// Open a site for editing.
    ///
    /// A saved record wins: its template and page map are adopted and its
    /// `home` page (or first buffered page) is shown. Otherwise the template
    /// is inferred from the site id, falling back to the configured default,
    /// and its landing page is fetched.
    pub async fn open(
        config: BuilderConfig,
        catalog: &TemplateCatalog,
        source: Arc<dyn TemplateSource>,
        store: Arc<dyn SiteStore>,
        site_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> BuilderResult<Self> {
        let site_id = site_id.into();
        let user_id = user_id.into();

        let mut template_id = catalog
            .infer_from_site_id(&site_id)
            .map(|template| template.id.clone())
            .unwrap_or_else(|| config.default_template.clone());
        let mut pages = PageMap::new();
        let mut page_data = serde_json::Value::Object(Default::default());

        if let Some(record) = store.read(&site_id, &user_id).await? {
            tracing::info!(
                site = %site_id,
                template = %record.template_id,
                pages = record.page_contents.len(),
                "restoring saved site"
            );
            template_id = record.template_id;
            pages = record.page_contents;
            page_data = record.page_data;
        }

        let template = catalog.get(&template_id)?.clone();
        let restored = pages
            .get_key_value(&PageKey::home())
            .or_else(|| pages.first())
            .map(|(key, html)| (key.clone(), html.clone()));

        let (current, html) = match restored {
            Some(page) => page,
            None => {
                let landing = template
                    .landing_page()
                    .cloned()
                    .ok_or_else(|| TemplateError::UnknownPage {
                        template: template.id.clone(),
                        page: PageKey::home(),
                    })?;
                let html = load_page(source.as_ref(), &template, &landing).await?;
                (landing, html)
            }
        };

        let mut session = EditorSession::new(config.editor.clone());
        session.load(&html)?;
        tracing::info!(site = %site_id, template = %template.id, page = %current, "opened site");

        Ok(Self {
            config,
            site_id,
            user_id,
            template,
            source,
            store,
            session,
            pages,
            page_data,
            current,
            saving: Arc::new(AtomicBool::new(false)),
        })
    }

    // ---------------------------------------------------------------
    // Pages
    // ---------------------------------------------------------------

    /// Show another page, buffering the current one first.
    ///
    /// The current page only changes once the new content is displayed; a
    /// failed fetch leaves the session on the page it was on.
    pub async fn switch_page(&mut self, page: PageKey) -> BuilderResult<()> {
        if page == self.current {
            return Ok(());
        }
        if !self.pages.contains_key(&page) {
            self.template.file_for(&page)?;
        }

        self.stash_current();

        let settle = self.config.page_settle();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let html = match self.pages.get(&page) {
            Some(html) => html.clone(),
            None => {
                let html = load_page(self.source.as_ref(), &self.template, &page).await?;
                self.pages.insert(page.clone(), html.clone());
                html
            }
        };

        self.session.load(&html)?;
        let previous = std::mem::replace(&mut self.current, page);
        tracing::info!(from = %previous, to = %self.current, "switched page");
        self.session.events().publish(SessionEvent::PageSwitched {
            page: self.current.to_string(),
        });
        Ok(())
    }

    fn stash_current(&mut self) {
        match self.session.export_clean() {
            Ok(html) => {
                self.pages.insert(self.current.clone(), html);
            }
            Err(err) => {
                tracing::warn!(page = %self.current, error = %err, "could not buffer current page");
            }
        }
    }

    // ---------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------

    /// Capture the live page and prepare the persistence work.
    ///
    /// Fails with [`BuilderError::AlreadySaving`] while another save is in
    /// flight.
    pub fn begin_save(&mut self) -> BuilderResult<SavePlan> {
        if self.is_saving() {
            tracing::debug!(site = %self.site_id, "save ignored, another save is in flight");
            return Err(BuilderError::AlreadySaving);
        }

        let html = match self.session.export_clean() {
            Ok(html) => html,
            Err(err) => return self.fail_save(err.into()),
        };
        self.pages.insert(self.current.clone(), html);
        let gate = SaveGate::acquire(&self.saving);

        let missing: Vec<PageKey> = self
            .template
            .page_keys()
            .filter(|page| !self.pages.contains_key(*page))
            .cloned()
            .collect();

        Ok(SavePlan {
            site_id: self.site_id.clone(),
            user_id: self.user_id.clone(),
            template: self.template.clone(),
            page_data: self.page_data.clone(),
            pages: self.pages.clone(),
            missing,
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            gate,
        })
    }

    /// Report the outcome of an executed [`SavePlan`]
    pub fn finish_save(&mut self, result: BuilderResult<SaveReport>) -> BuilderResult<SaveReport> {
        let report = match result {
            Ok(report) => report,
            Err(err) => return self.fail_save(err),
        };

        // edits buffered while the save ran take precedence
        for page in &report.backfilled {
            if let Some(html) = report.record.page_contents.get(page) {
                self.pages
                    .entry(page.clone())
                    .or_insert_with(|| html.clone());
            }
        }

        tracing::info!(
            site = %self.site_id,
            pages = report.record.page_contents.len(),
            backfilled = report.backfilled.len(),
            failed = report.failed.len(),
            "saved site"
        );
        let events = self.session.events();
        events.publish(SessionEvent::Saved {
            site_id: self.site_id.clone(),
            pages: report.saved_pages().map(str::to_string).collect(),
        });
        events.publish(SessionEvent::notify(NotificationLevel::Success, "All changes saved!"));
        Ok(report)
    }

    fn fail_save<T>(&self, err: BuilderError) -> BuilderResult<T> {
        tracing::error!(site = %self.site_id, error = %err, "save failed");
        let events = self.session.events();
        events.publish(SessionEvent::SaveFailed {
            message: err.to_string(),
        });
        events.publish(SessionEvent::notify(NotificationLevel::Error, "Failed to save project"));
        Err(err)
    }

    /// Capture, persist and report in one call
    pub async fn save(&mut self) -> BuilderResult<SaveReport> {
        let plan = self.begin_save()?;
        let result = plan.execute().await;
        self.finish_save(result)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn current_page(&self) -> &PageKey {
        &self.current
    }

    pub fn template(&self) -> &TemplateDescriptor {
        &self.template
    }

    /// Buffered pages. The displayed page's entry is refreshed on switch
    /// and save, not on every edit.
    pub fn pages(&self) -> &PageMap {
        &self.pages
    }

    pub fn page_data(&self) -> &serde_json::Value {
        &self.page_data
    }

    pub fn set_page_data(&mut self, page_data: serde_json::Value) {
        self.page_data = page_data;
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// True while a [`SavePlan`] from this builder is alive
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("site_id", &self.site_id)
            .field("template", &self.template.id)
            .field("current", &self.current)
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .field("saving", &self.is_saving())
            .finish_non_exhaustive()
    }
}

/// Persistence work captured by [`Builder::begin_save`]
pub struct SavePlan {
    site_id: String,
    user_id: String,
    template: TemplateDescriptor,
    page_data: serde_json::Value,
    pages: PageMap,
    missing: Vec<PageKey>,
    source: Arc<dyn TemplateSource>,
    store: Arc<dyn SiteStore>,
    gate: SaveGate,
}

impl SavePlan {
    /// Pages that will be fetched from the template before writing
    pub fn missing(&self) -> &[PageKey] {
        &self.missing
    }

    /// Backfill unvisited pages concurrently, then write the record.
    ///
    /// A page that cannot be fetched is logged and left out; only a store
    /// failure fails the save.
    pub async fn execute(self) -> BuilderResult<SaveReport> {
        let SavePlan {
            site_id,
            user_id,
            template,
            page_data,
            mut pages,
            missing,
            source,
            store,
            gate: _gate,
        } = self;

        let mut backfilled = Vec::new();
        let mut failed = Vec::new();
        {
            let source = source.as_ref();
            let template = &template;
            let fetches = missing.iter().map(|page| async move {
                (page, load_page(source, template, page).await)
            });

            for (page, result) in join_all(fetches).await {
                match result {
                    Ok(html) => {
                        pages.insert(page.clone(), html);
                        backfilled.push(page.clone());
                    }
                    Err(err) => {
                        tracing::warn!(%page, error = %err, "backfill failed, page omitted from save");
                        failed.push(page.clone());
                    }
                }
            }
        }

        let record = SiteRecord {
            site_id,
            user_id,
            page_contents: in_template_order(&template, pages),
            page_data,
            template_id: template.id.clone(),
            saved_at: Utc::now(),
        };
        store.upsert(record.clone()).await?;

        Ok(SaveReport {
            record,
            backfilled,
            failed,
        })
    }
}

impl fmt::Debug for SavePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavePlan")
            .field("site_id", &self.site_id)
            .field("template", &self.template.id)
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

/// Holds the builder's saving flag until dropped
struct SaveGate(Arc<AtomicBool>);

impl SaveGate {
    fn acquire(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for SaveGate {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// Exactly what was handed to the store
    pub record: SiteRecord,
    pub backfilled: Vec<PageKey>,
    pub failed: Vec<PageKey>,
}

impl SaveReport {
    pub fn saved_pages(&self) -> impl Iterator<Item = &str> {
        self.record.page_contents.keys().map(PageKey::as_str)
    }
}

fn in_template_order(template: &TemplateDescriptor, mut pages: PageMap) -> PageMap {
    let mut ordered = PageMap::with_capacity(pages.len());
    for page in template.page_keys() {
        if let Some(html) = pages.shift_remove(page) {
            ordered.insert(page.clone(), html);
        }
    }
    ordered.extend(pages);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticTemplateSource;
    use crate::store::MemorySiteStore;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use sitebuilder_editor::CanvasEvent;
    use std::time::Instant;

    const BASE: &str = "/templates/tiny/";

    fn page(key: &str) -> PageKey {
        PageKey::parse(key).unwrap()
    }

    fn catalog() -> TemplateCatalog {
        let pages: IndexMap<PageKey, String> = [("home", "index.html"), ("about", "about.html")]
            .into_iter()
            .map(|(key, file)| (page(key), file.to_string()))
            .collect();
        TemplateCatalog::new(vec![TemplateDescriptor {
            id: "tiny".to_string(),
            name: "Tiny".to_string(),
            category: "Test".to_string(),
            description: String::new(),
            thumbnail: None,
            base_path: BASE.to_string(),
            pages,
        }])
    }

    fn source() -> StaticTemplateSource {
        StaticTemplateSource::new()
            .with_file(BASE, "index.html", "<html><head></head><body><h1>Home</h1></body></html>")
            .with_file(BASE, "about.html", r#"<html><head></head><body><h1>About</h1><img src="a.png"></body></html>"#)
    }

    fn config() -> BuilderConfig {
        BuilderConfig {
            default_template: "tiny".to_string(),
            ..BuilderConfig::default()
        }
        .with_page_settle_ms(0)
    }

    async fn open(store: Arc<MemorySiteStore>) -> Builder {
        Builder::open(config(), &catalog(), Arc::new(source()), store, "site-1", "user-1")
            .await
            .unwrap()
    }

    fn retitle(builder: &mut Builder, text: &str) {
        let now = Instant::now();
        let h1 = {
            let dom = builder.session().dom().unwrap();
            dom.all_elements()
                .into_iter()
                .find(|node| dom.is_tag(*node, "h1"))
                .unwrap()
        };
        let session = builder.session_mut();
        session.handle_event(CanvasEvent::DoubleClick { target: h1 }, now);
        session.handle_event(CanvasEvent::input(h1, text), now);
        session.handle_event(CanvasEvent::key_down(h1, "Escape"), now);
    }

    #[tokio::test]
    async fn test_open_fetches_landing_page() {
        let builder = open(Arc::new(MemorySiteStore::new())).await;
        assert_eq!(builder.current_page(), &PageKey::home());
        assert_eq!(builder.template().id, "tiny");
        assert!(builder.pages().is_empty());
        assert!(builder.session().export_clean().unwrap().contains("<h1>Home</h1>"));
    }

    #[tokio::test]
    async fn test_switch_page_buffers_edits() {
        let mut builder = open(Arc::new(MemorySiteStore::new())).await;
        let mut rx = builder.subscribe();
        retitle(&mut builder, "Edited home");

        builder.switch_page(page("about")).await.unwrap();
        assert_eq!(builder.current_page(), &page("about"));
        assert!(builder.pages()[&PageKey::home()].contains("<h1>Edited home</h1>"));
        assert!(builder.session().export_clean().unwrap().contains(r#"src="/templates/tiny/a.png""#));

        builder.switch_page(PageKey::home()).await.unwrap();
        assert!(builder.session().export_clean().unwrap().contains("<h1>Edited home</h1>"));

        let mut switched = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::PageSwitched { page } = event {
                switched.push(page);
            }
        }
        assert_eq!(switched, vec!["about", "home"]);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_page_keeps_current() {
        let mut builder = open(Arc::new(MemorySiteStore::new())).await;
        let err = builder.switch_page(page("pricing")).await.unwrap_err();
        assert!(matches!(err, BuilderError::Template(TemplateError::UnknownPage { .. })));
        assert_eq!(builder.current_page(), &PageKey::home());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_current() {
        let source = StaticTemplateSource::new()
            .with_file(BASE, "index.html", "<html><head></head><body><h1>Home</h1></body></html>");
        let mut builder = Builder::open(
            config(),
            &catalog(),
            Arc::new(source),
            Arc::new(MemorySiteStore::new()),
            "site-1",
            "user-1",
        )
        .await
        .unwrap();

        assert!(builder.switch_page(page("about")).await.is_err());
        assert_eq!(builder.current_page(), &PageKey::home());
        assert!(builder.session().export_clean().unwrap().contains("<h1>Home</h1>"));
    }

    #[tokio::test]
    async fn test_concurrent_save_is_refused() {
        let mut builder = open(Arc::new(MemorySiteStore::new())).await;
        let plan = builder.begin_save().unwrap();
        assert!(builder.is_saving());
        assert_eq!(plan.missing(), &[page("about")]);

        assert!(matches!(builder.begin_save(), Err(BuilderError::AlreadySaving)));

        let result = plan.execute().await;
        builder.finish_save(result).unwrap();
        assert!(!builder.is_saving());
        assert!(builder.begin_save().is_ok());
    }

    #[tokio::test]
    async fn test_dropped_plan_releases_gate() {
        let mut builder = open(Arc::new(MemorySiteStore::new())).await;
        let plan = builder.begin_save().unwrap();
        assert!(builder.is_saving());

        drop(plan);
        assert!(!builder.is_saving());
        assert!(builder.save().await.is_ok());
    }

    #[tokio::test]
    async fn test_save_orders_pages_like_the_template() {
        let store = Arc::new(MemorySiteStore::new());
        let mut builder = open(store.clone()).await;
        builder.switch_page(page("about")).await.unwrap();

        let report = builder.save().await.unwrap();
        let keys: Vec<&str> = report.saved_pages().collect();
        assert_eq!(keys, vec!["home", "about"]);
        assert!(report.backfilled.is_empty());
        assert_eq!(store.read("site-1", "user-1").await.unwrap(), Some(report.record));
    }

    #[tokio::test]
    async fn test_open_restores_saved_record() {
        let store = Arc::new(MemorySiteStore::new());
        let mut builder = open(store.clone()).await;
        retitle(&mut builder, "Saved title");
        builder.set_page_data(serde_json::json!({ "brand": "Academy" }));
        builder.save().await.unwrap();

        let reopened = open(store).await;
        assert_eq!(reopened.pages().len(), 2);
        assert_eq!(reopened.page_data()["brand"], "Academy");
        assert!(reopened
            .session()
            .export_clean()
            .unwrap()
            .contains("<h1>Saved title</h1>"));
    }
}
