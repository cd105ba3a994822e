//! # Editor-only Markers
//!
//! Classes, attributes and nodes that exist only while a document is being
//! edited. They are added by the injector, selection, inline editing and
//! dragging, and removed again by [`strip_markers`] before a document is
//! recorded in history or handed out for saving.

use sitebuilder_dom::{Dom, DomResult, NodeId};

pub const SELECTED_CLASS: &str = "builder-selected";
pub const HOVER_CLASS: &str = "builder-hover";
pub const DRAGGING_CLASS: &str = "dragging";

/// Tag name of the selected element, set alongside [`SELECTED_CLASS`]
pub const ELEMENT_TYPE_ATTR: &str = "data-element-type";
/// `"element"` or `"editable"` on every element the injector handled
pub const ELEMENT_ATTR: &str = "data-builder-element";
/// Present while an element is being edited inline
pub const EDITING_ATTR: &str = "data-builder-editing";
/// Set on an element while it is being dragged
pub const DRAGGING_ATTR: &str = "data-dragging";
/// Records that `draggable` was added by the editor and not by the template
pub const DRAGGABLE_GUARD_ATTR: &str = "data-builder-draggable";
/// Marks the injected stylesheet
pub const STYLES_ATTR: &str = "data-builder-styles";
/// Marks the floating drag proxy
pub const PROXY_ATTR: &str = "data-builder-proxy";

pub const CONTENTEDITABLE_ATTR: &str = "contenteditable";
pub const DRAGGABLE_ATTR: &str = "draggable";

const MARKER_CLASSES: &[&str] = &[SELECTED_CLASS, HOVER_CLASS, DRAGGING_CLASS];

const MARKER_ATTRIBUTES: &[&str] = &[
    ELEMENT_TYPE_ATTR,
    ELEMENT_ATTR,
    EDITING_ATTR,
    DRAGGING_ATTR,
    DRAGGABLE_GUARD_ATTR,
];

/// Visual affordances for hover, selection, dragging and empty editables
pub const EDITOR_STYLESHEET: &str = "\
[data-builder-element] { cursor: grab; }
.builder-hover { outline: 1px dashed #6b7280 !important; outline-offset: 1px !important; cursor: pointer !important; }
.builder-selected { outline: 2px solid #3b82f6 !important; outline-offset: 2px !important; }
.dragging { opacity: 0.6 !important; z-index: 1000 !important; }
[data-builder-element=\"editable\"] { min-height: 20px; }
[data-builder-element=\"editable\"]:empty::before { content: 'Click to edit...'; color: #9ca3af; font-style: italic; }
";

/// An inline style property to put back to its value from before an
/// in-progress operation (`None` removes the property)
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRestore {
    pub node: NodeId,
    pub property: &'static str,
    pub previous: Option<String>,
}

impl StyleRestore {
    pub fn new(node: NodeId, property: &'static str, previous: Option<String>) -> Self {
        Self {
            node,
            property,
            previous,
        }
    }
}

pub fn is_marker_attribute(name: &str) -> bool {
    MARKER_ATTRIBUTES.iter().any(|m| m.eq_ignore_ascii_case(name))
}

pub fn is_marker_class(class: &str) -> bool {
    MARKER_CLASSES.contains(&class)
}

/// A `class` attribute value without editor classes
pub fn user_classes(value: &str) -> String {
    value
        .split_ascii_whitespace()
        .filter(|c| !is_marker_class(c))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_proxy(dom: &Dom, node: NodeId) -> bool {
    dom.has_attribute(node, PROXY_ATTR)
}

/// Whether `node` is the drag proxy or inside it
pub fn within_proxy(dom: &Dom, node: NodeId) -> bool {
    is_proxy(dom, node) || dom.ancestors(node).into_iter().any(|a| is_proxy(dom, a))
}

/// The injected stylesheet, if present
pub fn stylesheet(dom: &Dom) -> Option<NodeId> {
    dom.elements_with_attribute(STYLES_ATTR)
        .into_iter()
        .find(|node| dom.is_tag(*node, "style"))
}

/// Whether any element is currently being edited inline
pub fn any_editing(dom: &Dom) -> bool {
    !dom.elements_with_attribute(EDITING_ATTR).is_empty()
}

/// Remove every editor-only marker from `dom` in place.
///
/// `restores` are applied first, while the nodes they name still carry
/// their markers.
pub fn strip_markers(dom: &mut Dom, restores: &[StyleRestore]) -> DomResult<()> {
    for restore in restores {
        if dom.is_attached(restore.node) {
            let previous = restore.previous.as_deref().unwrap_or("");
            dom.set_style_property(restore.node, restore.property, previous)?;
        }
    }

    let injected: Vec<NodeId> = dom
        .all_elements()
        .into_iter()
        .filter(|node| is_proxy(dom, *node) || dom.has_attribute(*node, STYLES_ATTR))
        .collect();
    for node in injected {
        dom.detach(node)?;
    }

    for node in dom.all_elements() {
        for class in MARKER_CLASSES {
            dom.remove_class(node, class)?;
        }
        if dom.has_attribute(node, EDITING_ATTR) {
            dom.remove_attribute(node, CONTENTEDITABLE_ATTR)?;
        }
        if dom.has_attribute(node, DRAGGABLE_GUARD_ATTR) {
            dom.remove_attribute(node, DRAGGABLE_ATTR)?;
        }
        for attr in MARKER_ATTRIBUTES {
            dom.remove_attribute(node, attr)?;
        }
        if dom.attribute(node, "style").is_some_and(|s| s.trim().is_empty()) {
            dom.remove_attribute(node, "style")?;
        }
    }
    Ok(())
}

/// Serialize a marker-free copy of `dom`, leaving `dom` untouched
pub fn clean_html(dom: &Dom, restores: &[StyleRestore]) -> DomResult<String> {
    let mut copy = dom.clone();
    strip_markers(&mut copy, restores)?;
    Ok(copy.to_html())
}

/// Parse, strip and re-serialize a stored document
pub fn strip_html(html: &str) -> String {
    let mut dom = Dom::parse(html);
    match strip_markers(&mut dom, &[]) {
        Ok(()) => dom.to_html(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to strip editor markers");
            html.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_removes_selection_and_hover() {
        let html = strip_html(
            r#"<body><h1 class="title builder-selected" data-element-type="h1">Hi</h1><p class="builder-hover">x</p></body>"#,
        );
        assert_eq!(
            html,
            r#"<!DOCTYPE html><html><head></head><body><h1 class="title">Hi</h1><p>x</p></body></html>"#
        );
    }

    #[test]
    fn test_strip_only_removes_guarded_draggable() {
        let html = strip_html(
            r#"<div draggable="true" data-builder-draggable="">a</div><div draggable="false">b</div>"#,
        );
        assert!(html.contains(r#"<div>a</div>"#));
        assert!(html.contains(r#"<div draggable="false">b</div>"#));
    }

    #[test]
    fn test_strip_removes_stylesheet_and_proxy() {
        let html = strip_html(
            r#"<head><style data-builder-styles="">x</style><style>.a{}</style></head><body><p>a</p><p data-builder-proxy="" style="position: fixed;">a</p></body>"#,
        );
        assert_eq!(
            html,
            r#"<!DOCTYPE html><html><head><style>.a{}</style></head><body><p>a</p></body></html>"#
        );
    }

    #[test]
    fn test_strip_restores_styles() {
        let mut dom = Dom::parse(
            r#"<p contenteditable="true" data-builder-editing="" style="color: red; outline: 2px solid #3b82f6;">a</p>"#,
        );
        let p = dom.element_children(dom.body().unwrap())[0];
        strip_markers(&mut dom, &[StyleRestore::new(p, "outline", None)]).unwrap();
        assert_eq!(dom.outer_html(p), r#"<p style="color: red;">a</p>"#);
    }

    #[test]
    fn test_user_classes() {
        assert_eq!(user_classes("card builder-selected dragging wide"), "card wide");
    }
}
