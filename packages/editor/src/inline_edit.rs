//! # Inline Editing
//!
//! `Static → Editing → Static`. Entering makes the element content-editable,
//! outlines it and flags it with the editing marker the sync bridge checks.
//! Leaving undoes all three; the session then forces a sync.

use crate::markers::{StyleRestore, CONTENTEDITABLE_ATTR, EDITING_ATTR};
use sitebuilder_dom::{Dom, DomResult, NodeId};

pub const EDITING_OUTLINE: &str = "2px solid #3b82f6";

#[derive(Debug, Clone, PartialEq)]
struct EditingElement {
    node: NodeId,
    previous_outline: Option<String>,
}

#[derive(Debug, Default)]
pub struct InlineEdit {
    editing: Option<EditingElement>,
}

impl InlineEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element currently being edited (and holding focus)
    pub fn editing(&self) -> Option<NodeId> {
        self.editing.as_ref().map(|e| e.node)
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Whether `node` is the edited element or inside it
    pub fn covers(&self, dom: &Dom, node: NodeId) -> bool {
        self.editing().is_some_and(|editing| dom.contains(editing, node))
    }

    /// Enter editing on `node`. Returns `false` if it was already being edited.
    ///
    /// Callers finish any other in-progress edit first.
    pub fn begin(&mut self, dom: &mut Dom, node: NodeId) -> DomResult<bool> {
        if self.editing() == Some(node) {
            return Ok(false);
        }

        let previous_outline = dom.style_property(node, "outline");
        dom.set_attribute(node, CONTENTEDITABLE_ATTR, "true")?;
        dom.set_style_property(node, "outline", EDITING_OUTLINE)?;
        dom.set_attribute(node, EDITING_ATTR, "")?;

        self.editing = Some(EditingElement {
            node,
            previous_outline,
        });
        tracing::debug!(node = %node, "inline edit started");
        Ok(true)
    }

    /// Replace the edited element's text, as typing would
    pub fn apply_input(&self, dom: &mut Dom, text: &str) -> DomResult<()> {
        match self.editing() {
            Some(node) => dom.set_text_content(node, text),
            None => Ok(()),
        }
    }

    /// Leave editing, returning the element that was being edited
    pub fn finish(&mut self, dom: &mut Dom) -> DomResult<Option<NodeId>> {
        let Some(editing) = self.editing.take() else {
            return Ok(None);
        };
        let node = editing.node;
        if dom.is_attached(node) {
            dom.remove_attribute(node, CONTENTEDITABLE_ATTR)?;
            let outline = editing.previous_outline.as_deref().unwrap_or("");
            dom.set_style_property(node, "outline", outline)?;
            dom.remove_attribute(node, EDITING_ATTR)?;
        }
        tracing::debug!(node = %node, "inline edit finished");
        Ok(Some(node))
    }

    /// Forget the edit without touching the document (it was replaced)
    pub fn reset(&mut self) {
        self.editing = None;
    }

    /// Style values to put back when capturing mid-edit
    pub fn restores(&self) -> Vec<StyleRestore> {
        self.editing
            .iter()
            .map(|e| StyleRestore::new(e.node, "outline", e.previous_outline.clone()))
            .collect()
    }
}
