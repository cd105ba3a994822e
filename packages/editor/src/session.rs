//! # Editor Session
//!
//! The single owner of the live document. Routes canvas events to the
//! injected behaviors, feeds the sync bridge, records snapshots and
//! restores them on undo/redo.
//!
//! Time is always passed in, so debounce and guard windows are driven by
//! the host's clock (or a test's).
//!
//! ```rust
//! use sitebuilder_editor::{CanvasEvent, EditorConfig, EditorSession};
//! use std::time::Instant;
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//! session.load("<h1>Title</h1>").unwrap();
//!
//! let dom = session.dom().unwrap();
//! let h1 = dom.element_children(dom.body().unwrap())[0];
//! let now = Instant::now();
//! session.handle_event(CanvasEvent::DoubleClick { target: h1 }, now);
//! session.handle_event(CanvasEvent::input(h1, "Hello"), now);
//! session.handle_event(CanvasEvent::key_down(h1, "Escape"), now);
//!
//! assert!(session.history().current().unwrap().as_str().contains("Hello"));
//! ```

use crate::canvas::{Behaviors, Canvas, CanvasEvent, EventResponse, FixedLayout, HandlerTable, Layout};
use crate::config::EditorConfig;
use crate::drag::{DragEngine, DragState, DropOutcome};
use crate::events::{EventBus, NotificationLevel, SessionEvent};
use crate::injector::Injector;
use crate::inline_edit::InlineEdit;
use crate::markers::{self, StyleRestore, HOVER_CLASS};
use crate::selection::{self, SelectedElement, Selection};
use crate::sync::{SyncBridge, SyncPolicy, SyncSignal};
use crate::undo_stack::{Snapshot, UndoStack};
use crate::EditorError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sitebuilder_dom::{Dom, NodeId, Point};
use std::fmt;
use std::time::Instant;
use tokio::sync::broadcast;

/// Changes a panel applies to the selected element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementUpdate {
    /// New text content
    pub content: Option<String>,

    /// Inline style properties; an empty value removes the property
    pub styles: IndexMap<String, String>,

    /// Attributes to set, or remove when `None`
    pub attributes: IndexMap<String, Option<String>>,
}

impl ElementUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(property.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Some(value.into()));
        self
    }

    pub fn without_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.styles.is_empty() && self.attributes.is_empty()
    }
}

/// Outcome of one event handler
struct Handled {
    response: EventResponse,
    force_sync: bool,
}

impl Handled {
    fn ignored() -> Self {
        Self::respond(EventResponse::IGNORED)
    }

    fn respond(response: EventResponse) -> Self {
        Self {
            response,
            force_sync: false,
        }
    }

    fn and_sync(mut self) -> Self {
        self.force_sync = true;
        self
    }
}

pub struct EditorSession {
    config: EditorConfig,
    canvas: Canvas,
    layout: Box<dyn Layout + Send + Sync>,
    history: UndoStack,
    bridge: SyncBridge,
    selection: Selection,
    inline_edit: InlineEdit,
    drag: DragEngine,
    preview: bool,
    events: EventBus,
}

impl EditorSession {
    /// A session with an inaccessible surface; call [`load`](Self::load)
    pub fn new(config: EditorConfig) -> Self {
        Self {
            canvas: Canvas::inaccessible(),
            layout: Box::new(FixedLayout::new()),
            history: UndoStack::with_max_levels(config.max_history),
            bridge: SyncBridge::new(SyncPolicy::from(&config)),
            selection: Selection::new(),
            inline_edit: InlineEdit::new(),
            drag: DragEngine::new(config.lifted_opacity.clone(), config.proxy_border.clone()),
            preview: false,
            events: EventBus::new(),
            config,
        }
    }

    pub fn with_layout(mut self, layout: impl Layout + Send + Sync + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Replace the sync bridge, e.g. to install a different suppression predicate
    pub fn with_bridge(mut self, bridge: SyncBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn set_layout(&mut self, layout: impl Layout + Send + Sync + 'static) {
        self.layout = Box::new(layout);
    }

    // ---------------------------------------------------------------
    // Document lifecycle
    // ---------------------------------------------------------------

    /// Display a raw (not yet injected) document and start a fresh history
    /// with it as snapshot 0.
    pub fn load(&mut self, html: &str) -> Result<(), EditorError> {
        let mut dom = Dom::parse(html);
        let handlers = Injector::inject(&mut dom)?;
        self.show(dom, handlers);
        self.bridge.reset();

        let initial = self.export_clean()?;
        self.history.reset(Snapshot::from(initial));

        tracing::info!(
            elements = self.canvas.handlers().len(),
            "loaded document into canvas"
        );
        self.events.publish(SessionEvent::DocumentReplaced);
        self.events.publish(SessionEvent::SelectionCleared);
        self.publish_history();
        Ok(())
    }

    /// Make the surface inaccessible (e.g. while navigating away)
    pub fn detach_surface(&mut self) -> Option<Dom> {
        self.reset_transient();
        self.bridge.reset();
        self.canvas.detach()
    }

    fn show(&mut self, mut dom: Dom, handlers: HandlerTable) {
        dom.take_mutations();
        self.canvas.show(dom);
        self.canvas.set_handlers(handlers);
        if let Some(dom) = self.canvas.dom_mut() {
            dom.take_mutations();
        }
        self.reset_transient();
    }

    fn reset_transient(&mut self) {
        self.selection.forget();
        self.inline_edit.reset();
        self.drag.reset();
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Deliver one canvas event. Handler failures are logged, never returned.
    pub fn handle_event(&mut self, event: CanvasEvent, now: Instant) -> EventResponse {
        if !self.canvas.is_accessible() {
            return EventResponse::IGNORED;
        }

        let handled = match self.dispatch(event, now) {
            Ok(handled) => handled,
            Err(err) => {
                tracing::warn!(error = %err, "canvas event handler failed");
                Handled::ignored()
            }
        };

        if handled.force_sync {
            self.force_sync();
        } else {
            self.observe(now);
        }
        handled.response
    }

    fn dispatch(&mut self, event: CanvasEvent, now: Instant) -> Result<Handled, EditorError> {
        match event {
            CanvasEvent::Click { target } => self.on_click(target),
            CanvasEvent::DoubleClick { target } => self.on_double_click(target),
            CanvasEvent::MouseEnter { target } => self.on_hover(target, true),
            CanvasEvent::MouseLeave { target } => self.on_hover(target, false),
            CanvasEvent::KeyDown { target, key } => self.on_key_down(target, &key, now),
            CanvasEvent::Input { target, text } => self.on_input(target, text.as_deref(), now),
            CanvasEvent::Blur { target } => self.on_blur(target),
            CanvasEvent::MouseUp { .. } => {
                self.bridge.signal(SyncSignal::MouseUp, now);
                Ok(Handled::ignored())
            }
            CanvasEvent::DragStart { target, .. } => self.on_drag_start(target),
            CanvasEvent::DragOver { pointer } => self.on_drag_over(pointer),
            CanvasEvent::Drop { target, pointer } => self.on_drop(target, pointer, now),
            CanvasEvent::DragEnd => self.on_drag_end(now),
        }
    }

    fn on_click(&mut self, target: NodeId) -> Result<Handled, EditorError> {
        if self.preview || self.drag.is_dragging() {
            return Ok(Handled::ignored());
        }
        let Some(node) = self.canvas.handler_for(target, Behaviors::SELECT) else {
            return Ok(Handled::ignored());
        };
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };

        let selected = self
            .selection
            .select(dom, self.layout.as_ref(), node, self.config.toolbar_offset)?
            .clone();
        self.events
            .publish(SessionEvent::SelectionChanged { element: selected });
        Ok(Handled::respond(EventResponse::CONSUMED))
    }

    fn on_double_click(&mut self, target: NodeId) -> Result<Handled, EditorError> {
        if self.preview {
            return Ok(Handled::ignored());
        }
        let Some(node) = self.canvas.handler_for(target, Behaviors::INLINE_EDIT) else {
            return Ok(Handled::ignored());
        };
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };

        let handled = Handled::respond(EventResponse::CONSUMED);
        match self.inline_edit.editing() {
            Some(editing) if editing == node => Ok(handled),
            Some(_) => {
                self.inline_edit.finish(dom)?;
                self.inline_edit.begin(dom, node)?;
                Ok(handled.and_sync())
            }
            None => {
                self.inline_edit.begin(dom, node)?;
                Ok(handled)
            }
        }
    }

    fn on_hover(&mut self, target: NodeId, entering: bool) -> Result<Handled, EditorError> {
        if self.preview || self.drag.is_dragging() {
            return Ok(Handled::ignored());
        }
        let Some(node) = self.canvas.handler_for(target, Behaviors::HOVER) else {
            return Ok(Handled::ignored());
        };
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if entering {
            selection::hover_enter(dom, node)?;
        } else {
            selection::hover_leave(dom, node)?;
        }
        Ok(Handled::ignored())
    }

    fn on_key_down(&mut self, target: NodeId, key: &str, now: Instant) -> Result<Handled, EditorError> {
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if key == "Escape" && self.inline_edit.covers(dom, target) {
            self.inline_edit.finish(dom)?;
            return Ok(Handled::respond(EventResponse::CONSUMED).and_sync());
        }
        self.bridge.signal(SyncSignal::KeyDown, now);
        Ok(Handled::ignored())
    }

    fn on_input(
        &mut self,
        target: NodeId,
        text: Option<&str>,
        now: Instant,
    ) -> Result<Handled, EditorError> {
        if let (Some(dom), Some(text)) = (self.canvas.dom_mut(), text) {
            if self.inline_edit.covers(dom, target) {
                self.inline_edit.apply_input(dom, text)?;
            }
        }
        self.bridge.signal(SyncSignal::Input, now);
        Ok(Handled::ignored())
    }

    fn on_blur(&mut self, target: NodeId) -> Result<Handled, EditorError> {
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if self.inline_edit.editing() != Some(target) {
            return Ok(Handled::ignored());
        }
        self.inline_edit.finish(dom)?;
        Ok(Handled::ignored().and_sync())
    }

    fn on_drag_start(&mut self, target: NodeId) -> Result<Handled, EditorError> {
        if self.preview {
            return Ok(Handled::ignored());
        }
        let Some(node) = self.canvas.handler_for(target, Behaviors::DRAG) else {
            return Ok(Handled::ignored());
        };
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if self.inline_edit.covers(dom, node) {
            return Ok(Handled::ignored());
        }

        self.drag.start(dom, self.layout.as_ref(), node)?;
        Ok(Handled::respond(EventResponse {
            prevent_default: false,
            stop_propagation: true,
        }))
    }

    fn on_drag_over(&mut self, pointer: Point) -> Result<Handled, EditorError> {
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if !self.drag.is_dragging() {
            return Ok(Handled::ignored());
        }
        self.drag.over(dom, pointer)?;
        Ok(Handled::respond(EventResponse::CONSUMED))
    }

    fn on_drop(&mut self, target: NodeId, pointer: Point, now: Instant) -> Result<Handled, EditorError> {
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if !self.drag.is_dragging() {
            return Ok(Handled::ignored());
        }

        match self.drag.drop_on(dom, self.layout.as_ref(), target, pointer) {
            DropOutcome::Moved { target, position } => {
                tracing::info!(node = %target, ?position, "element moved");
                self.events
                    .publish(SessionEvent::notify(NotificationLevel::Success, "Element moved"));
            }
            DropOutcome::Rejected(reason) => {
                tracing::debug!(%reason, "drop rejected");
            }
            DropOutcome::Failed(err) => {
                tracing::warn!(error = %err, "drop failed");
            }
        }
        self.bridge.signal(SyncSignal::Drop, now);
        Ok(Handled::respond(EventResponse::CONSUMED))
    }

    fn on_drag_end(&mut self, now: Instant) -> Result<Handled, EditorError> {
        let Some(dom) = self.canvas.dom_mut() else {
            return Ok(Handled::ignored());
        };
        if self.drag.end(dom)?.is_some() {
            self.bridge.signal(SyncSignal::DragEnd, now);
        }
        Ok(Handled::ignored())
    }

    fn observe(&mut self, now: Instant) {
        if let Some(dom) = self.canvas.dom_mut() {
            self.bridge.observe(dom, now);
        }
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    /// Advance the clock: capture a snapshot if the debounce window expired.
    ///
    /// Captures are held back while a drag is in progress. Returns whether
    /// a new snapshot was recorded.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.observe(now);
        if self.drag.is_dragging() || !self.bridge.take_due(now) {
            return false;
        }
        self.capture()
    }

    /// Capture immediately, dropping any scheduled capture
    pub fn force_sync(&mut self) -> bool {
        if let Some(dom) = self.canvas.dom_mut() {
            dom.take_mutations();
        }
        self.bridge.cancel();
        self.capture()
    }

    fn restores(&self) -> Vec<StyleRestore> {
        let mut restores = self.inline_edit.restores();
        restores.extend(self.drag.restores());
        restores
    }

    fn capture(&mut self) -> bool {
        let html = match self.export_clean() {
            Ok(html) => html,
            Err(EditorError::SurfaceUnavailable) => return false,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot capture failed");
                return false;
            }
        };

        if !self.history.record(Snapshot::from(html)) {
            return false;
        }
        tracing::debug!(
            cursor = self.history.cursor(),
            length = self.history.len(),
            "recorded snapshot"
        );
        self.events.publish(SessionEvent::SnapshotRecorded {
            cursor: self.history.cursor(),
            length: self.history.len(),
        });
        self.publish_history();
        true
    }

    /// Restore the previous snapshot. Ignored inside the restore guard
    /// window or when there is nothing to undo.
    pub fn undo(&mut self, now: Instant) -> bool {
        if !self.canvas.is_accessible() || self.bridge.in_guard(now) {
            return false;
        }
        if self.bridge.is_pending() {
            self.force_sync();
        }
        match self.history.undo() {
            Some(snapshot) => self.restore(snapshot, now),
            None => false,
        }
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        if !self.canvas.is_accessible() || self.bridge.in_guard(now) {
            return false;
        }
        if self.bridge.is_pending() && self.force_sync() {
            // a new edit just truncated the redo tail
            return false;
        }
        match self.history.redo() {
            Some(snapshot) => self.restore(snapshot, now),
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Snapshot, now: Instant) -> bool {
        let mut dom = Dom::parse(snapshot.as_str());
        let handlers = match Injector::inject(&mut dom) {
            Ok(handlers) => handlers,
            Err(err) => {
                tracing::warn!(error = %err, "re-injection after restore failed");
                HandlerTable::new()
            }
        };
        self.show(dom, handlers);
        self.bridge.arm_guard(now);

        tracing::debug!(cursor = self.history.cursor(), "restored snapshot");
        self.events.publish(SessionEvent::DocumentReplaced);
        self.events.publish(SessionEvent::SelectionCleared);
        self.publish_history();
        true
    }

    fn publish_history(&self) {
        self.events.publish(SessionEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    // ---------------------------------------------------------------
    // Element mutation API
    // ---------------------------------------------------------------

    /// Apply `update` to the selected element and refresh the selection
    pub fn update_selected(
        &mut self,
        update: &ElementUpdate,
        now: Instant,
    ) -> Result<SelectedElement, EditorError> {
        let node = self.selection.node().ok_or(EditorError::NothingSelected)?;
        let dom = self.canvas.dom_mut().ok_or(EditorError::SurfaceUnavailable)?;
        if !dom.is_attached(node) {
            return Err(EditorError::DetachedSelection(node));
        }

        if let Some(content) = &update.content {
            dom.set_text_content(node, content)?;
        }
        for (property, value) in &update.styles {
            dom.set_style_property(node, property, value)?;
        }
        for (name, value) in &update.attributes {
            match value {
                Some(value) => dom.set_attribute(node, name, value.clone())?,
                None => {
                    dom.remove_attribute(node, name)?;
                }
            }
        }

        self.selection
            .refresh(dom, self.layout.as_ref(), self.config.toolbar_offset);
        self.bridge.observe(dom, now);
        self.bridge.signal(SyncSignal::Input, now);

        let selected = self
            .selection
            .current()
            .cloned()
            .ok_or(EditorError::NothingSelected)?;
        self.events.publish(SessionEvent::SelectionChanged {
            element: selected.clone(),
        });
        Ok(selected)
    }

    /// Remove the selected element from the document
    pub fn delete_selected(&mut self, now: Instant) -> Result<NodeId, EditorError> {
        let node = self.selection.node().ok_or(EditorError::NothingSelected)?;
        let dom = self.canvas.dom_mut().ok_or(EditorError::SurfaceUnavailable)?;
        if !dom.is_attached(node) {
            return Err(EditorError::DetachedSelection(node));
        }

        if self.inline_edit.covers(dom, node) {
            self.inline_edit.finish(dom)?;
        }
        dom.detach(node)?;
        self.selection.forget();
        self.bridge.observe(dom, now);
        self.bridge.signal(SyncSignal::Input, now);

        tracing::info!(node = %node, "deleted element");
        self.events.publish(SessionEvent::SelectionCleared);
        Ok(node)
    }

    /// Deselect everything (canvas background click)
    pub fn clear_selection(&mut self) {
        self.selection.forget();
        if let Some(dom) = self.canvas.dom_mut() {
            if let Err(err) = selection::clear_markers(dom) {
                tracing::warn!(error = %err, "failed to clear selection markers");
            }
            dom.take_mutations();
        }
        self.events.publish(SessionEvent::SelectionCleared);
    }

    /// In preview mode the injected behaviors are inert
    pub fn set_preview_mode(&mut self, preview: bool) {
        if self.preview == preview {
            return;
        }
        self.preview = preview;
        if !preview {
            return;
        }

        self.clear_selection();
        let mut finished_edit = false;
        if let Some(dom) = self.canvas.dom_mut() {
            for node in dom.elements_with_class(HOVER_CLASS) {
                if let Err(err) = dom.remove_class(node, HOVER_CLASS) {
                    tracing::warn!(error = %err, "failed to clear hover marker");
                }
            }
            match self.inline_edit.finish(dom) {
                Ok(finished) => finished_edit = finished.is_some(),
                Err(err) => tracing::warn!(error = %err, "failed to finish inline edit"),
            }
            if let Err(err) = self.drag.end(dom) {
                tracing::warn!(error = %err, "failed to cancel drag");
            }
            dom.take_mutations();
        }
        if finished_edit {
            self.force_sync();
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    // ---------------------------------------------------------------
    // Export and accessors
    // ---------------------------------------------------------------

    /// Serialize a copy of the live document without editor-only markers
    pub fn export_clean(&self) -> Result<String, EditorError> {
        let dom = self.canvas.dom().ok_or(EditorError::SurfaceUnavailable)?;
        Ok(markers::clean_html(dom, &self.restores())?)
    }

    /// Serialize the live document as displayed, markers included
    pub fn serialize_live(&self) -> Option<String> {
        self.canvas.dom().map(Dom::to_html)
    }

    pub fn dom(&self) -> Option<&Dom> {
        self.canvas.dom()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<&SelectedElement> {
        self.selection.current()
    }

    pub fn editing(&self) -> Option<NodeId> {
        self.inline_edit.editing()
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn has_pending_sync(&self) -> bool {
        self.bridge.is_pending()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("bridge", &self.bridge)
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{EDITING_ATTR, SELECTED_CLASS};
    use pretty_assertions::assert_eq;
    use sitebuilder_dom::Rect;
    use std::time::Duration;

    const PAGE: &str = r#"<!DOCTYPE html><html><head><title>Home</title></head><body><h1 id="title">Welcome</h1><p>Intro</p><section><p>Nested</p></section></body></html>"#;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn loaded() -> EditorSession {
        let mut session = EditorSession::default();
        session.load(PAGE).unwrap();
        session
    }

    fn body_children(session: &EditorSession) -> Vec<NodeId> {
        let dom = session.dom().unwrap();
        dom.element_children(dom.body().unwrap())
    }

    #[test]
    fn test_load_records_clean_initial_snapshot() {
        let session = loaded();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().current().unwrap().as_str(), PAGE);
        assert!(session.serialize_live().unwrap().contains("data-builder-styles"));
    }

    #[test]
    fn test_events_on_inaccessible_surface_are_ignored() {
        let mut session = EditorSession::default();
        let root = Dom::new().root();
        let response = session.handle_event(CanvasEvent::Click { target: root }, Instant::now());
        assert_eq!(response, EventResponse::IGNORED);
        assert!(!session.force_sync());
        assert!(!session.undo(Instant::now()));
        assert!(matches!(session.export_clean(), Err(EditorError::SurfaceUnavailable)));
    }

    #[test]
    fn test_click_selects_nearest_handler() {
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        let text = session.dom().unwrap().children(h1)[0];

        let response = session.handle_event(CanvasEvent::Click { target: text }, Instant::now());
        assert_eq!(response, EventResponse::CONSUMED);
        assert_eq!(session.selected().unwrap().node, h1);
        assert_eq!(session.selected().unwrap().id, "title");
    }

    #[test]
    fn test_selection_does_not_create_snapshots() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::Click { target: h1 }, t0);
        session.handle_event(CanvasEvent::MouseUp { target: h1 }, t0);
        assert!(!session.tick(t0 + ms(300)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_escape_forces_sync_within_debounce() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];

        session.handle_event(CanvasEvent::DoubleClick { target: h1 }, t0);
        assert_eq!(session.editing(), Some(h1));
        session.handle_event(CanvasEvent::input(h1, "Hello"), t0 + ms(10));
        let response = session.handle_event(CanvasEvent::key_down(h1, "Escape"), t0 + ms(20));

        assert_eq!(response, EventResponse::CONSUMED);
        assert_eq!(session.editing(), None);
        assert_eq!(session.history().len(), 2);
        let head = session.history().current().unwrap().as_str();
        assert!(head.contains(r#"<h1 id="title">Hello</h1>"#));
        assert!(!session.has_pending_sync());
    }

    #[test]
    fn test_blur_finishes_edit() {
        let t0 = Instant::now();
        let mut session = loaded();
        let p = body_children(&session)[1];
        session.handle_event(CanvasEvent::DoubleClick { target: p }, t0);
        session.handle_event(CanvasEvent::input(p, "Changed"), t0);
        session.handle_event(CanvasEvent::Blur { target: p }, t0);

        assert!(!session.dom().unwrap().has_attribute(p, EDITING_ATTR));
        assert!(session.history().current().unwrap().as_str().contains("<p>Changed</p>"));
    }

    #[test]
    fn test_debounced_capture_strips_in_progress_edit() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::DoubleClick { target: h1 }, t0);
        session.handle_event(CanvasEvent::input(h1, "Typing"), t0);

        assert!(!session.tick(t0 + ms(100)));
        assert!(session.tick(t0 + ms(250)));
        let head = session.history().current().unwrap().as_str();
        assert!(head.contains(r#"<h1 id="title">Typing</h1>"#));
        assert!(!head.contains("contenteditable"));
        assert_eq!(session.editing(), Some(h1));
    }

    #[test]
    fn test_undo_redo_restores_documents() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::DoubleClick { target: h1 }, t0);
        session.handle_event(CanvasEvent::input(h1, "Second"), t0);
        session.handle_event(CanvasEvent::key_down(h1, "Escape"), t0);
        let edited = session.export_clean().unwrap();

        assert!(session.undo(t0 + ms(100)));
        assert_eq!(session.export_clean().unwrap(), PAGE);
        assert!(session.can_redo());
        assert!(session.selected().is_none());

        // guard window
        assert!(!session.redo(t0 + ms(120)));
        assert!(session.redo(t0 + ms(200)));
        assert_eq!(session.export_clean().unwrap(), edited);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_restore_does_not_record() {
        let t0 = Instant::now();
        let mut session = loaded();
        let p = body_children(&session)[1];
        session.handle_event(CanvasEvent::Click { target: p }, t0);
        session
            .update_selected(&ElementUpdate::new().with_style("color", "red"), t0)
            .unwrap();
        assert!(session.tick(t0 + ms(300)));

        assert!(session.undo(t0 + ms(400)));
        session.handle_event(CanvasEvent::MouseUp { target: p }, t0 + ms(410));
        assert!(!session.tick(t0 + ms(1000)));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().cursor(), 0);
    }

    #[test]
    fn test_undo_flushes_pending_change() {
        let t0 = Instant::now();
        let mut session = loaded();
        let p = body_children(&session)[1];
        session.handle_event(CanvasEvent::Click { target: p }, t0);
        session
            .update_selected(&ElementUpdate::new().with_content("Pending"), t0)
            .unwrap();

        assert!(session.undo(t0 + ms(10)));
        assert_eq!(session.export_clean().unwrap(), PAGE);
        assert!(session.redo(t0 + ms(100)));
        assert!(session.export_clean().unwrap().contains("<p>Pending</p>"));
    }

    #[test]
    fn test_update_selected_refreshes_reference() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::Click { target: h1 }, t0);

        let update = ElementUpdate::new()
            .with_content("New title")
            .with_style("color", "#111")
            .with_attribute("title", "tip")
            .without_attribute("id");
        let selected = session.update_selected(&update, t0).unwrap();

        assert_eq!(selected.content, "New title");
        assert_eq!(selected.styles.get("color").map(String::as_str), Some("#111"));
        assert_eq!(selected.attributes.get("title").map(String::as_str), Some("tip"));
        assert!(!selected.attributes.contains_key("id"));
        assert!(session.has_pending_sync());
    }

    #[test]
    fn test_update_without_selection_fails() {
        let mut session = loaded();
        let err = session
            .update_selected(&ElementUpdate::new().with_content("x"), Instant::now())
            .unwrap_err();
        assert!(matches!(err, EditorError::NothingSelected));
    }

    #[test]
    fn test_delete_selected() {
        let t0 = Instant::now();
        let mut session = loaded();
        let p = body_children(&session)[1];
        session.handle_event(CanvasEvent::Click { target: p }, t0);
        session.delete_selected(t0).unwrap();

        assert!(session.selected().is_none());
        assert!(session.tick(t0 + ms(250)));
        assert!(!session.history().current().unwrap().as_str().contains("Intro"));
    }

    #[test]
    fn test_clear_selection_removes_markers() {
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::Click { target: h1 }, Instant::now());
        session.clear_selection();
        assert!(session.selected().is_none());
        assert!(session.dom().unwrap().elements_with_class(SELECTED_CLASS).is_empty());
    }

    #[test]
    fn test_preview_mode_makes_behaviors_inert() {
        let t0 = Instant::now();
        let mut session = loaded();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::Click { target: h1 }, t0);
        session.set_preview_mode(true);

        assert!(session.selected().is_none());
        assert_eq!(
            session.handle_event(CanvasEvent::Click { target: h1 }, t0),
            EventResponse::IGNORED
        );
        session.handle_event(CanvasEvent::DoubleClick { target: h1 }, t0);
        assert_eq!(session.editing(), None);

        session.set_preview_mode(false);
        session.handle_event(CanvasEvent::Click { target: h1 }, t0);
        assert!(session.selected().is_some());
    }

    #[test]
    fn test_preview_mode_clears_hover() {
        let mut session = loaded();
        let p = body_children(&session)[1];
        session.handle_event(CanvasEvent::MouseEnter { target: p }, Instant::now());
        assert!(session.dom().unwrap().has_class(p, HOVER_CLASS));

        session.set_preview_mode(true);
        assert!(session.dom().unwrap().elements_with_class(HOVER_CLASS).is_empty());
    }

    #[test]
    fn test_drag_reorders_and_defers_capture() {
        let t0 = Instant::now();
        let mut session = loaded();
        let children = body_children(&session);
        let (h1, p) = (children[0], children[1]);
        session.set_layout(
            FixedLayout::new()
                .with_box(h1, Rect::new(0.0, 0.0, 400.0, 50.0))
                .with_box(p, Rect::new(0.0, 50.0, 400.0, 30.0)),
        );

        session.handle_event(
            CanvasEvent::DragStart {
                target: h1,
                pointer: Point::new(10.0, 10.0),
            },
            t0,
        );
        session.handle_event(CanvasEvent::DragOver { pointer: Point::new(10.0, 70.0) }, t0);
        session.handle_event(
            CanvasEvent::Drop {
                target: p,
                pointer: Point::new(10.0, 70.0),
            },
            t0,
        );
        assert!(!session.tick(t0 + ms(500)));

        session.handle_event(CanvasEvent::DragEnd, t0 + ms(500));
        assert!(session.tick(t0 + ms(750)));
        let head = session.history().current().unwrap().as_str();
        assert!(head.contains(r#"<body><p>Intro</p><h1 id="title">Welcome</h1>"#));
        assert!(!head.contains("opacity"));
        assert!(!head.contains("data-builder-proxy"));
    }

    #[test]
    fn test_session_publishes_events() {
        let mut session = loaded();
        let mut rx = session.subscribe();
        let h1 = body_children(&session)[0];
        session.handle_event(CanvasEvent::Click { target: h1 }, Instant::now());

        match rx.try_recv().unwrap() {
            SessionEvent::SelectionChanged { element } => assert_eq!(element.tag, "h1"),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
