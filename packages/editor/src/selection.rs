//! # Selection
//!
//! At most one element carries the selected marker. Selecting clears every
//! marked element first, then marks the new one and captures a denormalized
//! view of it for the panels.

use crate::canvas::Layout;
use crate::markers::{
    self, DRAGGABLE_ATTR, DRAGGABLE_GUARD_ATTR, ELEMENT_TYPE_ATTR, HOVER_CLASS, SELECTED_CLASS,
};
use indexmap::IndexMap;
use serde::Serialize;
use sitebuilder_dom::{Dom, DomResult, NodeId, Point, Rect};

/// What the panels know about the selected element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedElement {
    /// Live node; only valid for the document it was captured from
    pub node: NodeId,

    /// `id` attribute, or a generated `element-<n>`
    pub id: String,

    /// Lowercased tag name
    pub tag: String,

    /// Trimmed text content, or the inner HTML when there is no text
    pub content: String,

    /// Attributes without editor markers
    pub attributes: IndexMap<String, String>,

    /// Inline style declarations
    pub styles: IndexMap<String, String>,

    pub bounds: Option<Rect>,

    /// Where the floating toolbar goes, in host window coordinates
    pub toolbar_anchor: Option<Point>,
}

#[derive(Debug, Default)]
pub struct Selection {
    current: Option<SelectedElement>,
    generated_ids: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SelectedElement> {
        self.current.as_ref()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.current.as_ref().map(|selected| selected.node)
    }

    /// Make `node` the only selected element
    pub fn select(
        &mut self,
        dom: &mut Dom,
        layout: &dyn Layout,
        node: NodeId,
        toolbar_offset: f64,
    ) -> DomResult<&SelectedElement> {
        clear_markers(dom)?;

        let tag = dom.tag_name(node).unwrap_or_default();
        dom.remove_class(node, HOVER_CLASS)?;
        dom.add_class(node, SELECTED_CLASS)?;
        dom.set_attribute(node, ELEMENT_TYPE_ATTR, tag)?;
        if !dom.has_attribute(node, DRAGGABLE_ATTR) {
            dom.set_attribute(node, DRAGGABLE_ATTR, "true")?;
            dom.set_attribute(node, DRAGGABLE_GUARD_ATTR, "")?;
        }

        let id = match dom.attribute(node, "id").filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                self.generated_ids += 1;
                format!("element-{}", self.generated_ids)
            }
        };

        let selected = capture(dom, layout, node, id, toolbar_offset);
        tracing::debug!(node = %node, tag = %selected.tag, "selected element");
        Ok(self.current.insert(selected))
    }

    /// Re-capture the selected element after it changed
    pub fn refresh(&mut self, dom: &Dom, layout: &dyn Layout, toolbar_offset: f64) {
        if let Some(selected) = &mut self.current {
            if dom.is_attached(selected.node) {
                *selected = capture(dom, layout, selected.node, selected.id.clone(), toolbar_offset);
            }
        }
    }

    /// Clear the selection and every selected marker in `dom`
    pub fn clear(&mut self, dom: &mut Dom) -> DomResult<()> {
        self.current = None;
        clear_markers(dom)
    }

    /// Drop the reference without touching any document
    pub fn forget(&mut self) {
        self.current = None;
    }
}

/// Remove the selected marker and element type from every marked element
pub fn clear_markers(dom: &mut Dom) -> DomResult<()> {
    for node in dom.elements_with_class(SELECTED_CLASS) {
        dom.remove_class(node, SELECTED_CLASS)?;
        dom.remove_attribute(node, ELEMENT_TYPE_ATTR)?;
    }
    Ok(())
}

/// Hover affordance, suppressed on the selected element
pub fn hover_enter(dom: &mut Dom, node: NodeId) -> DomResult<()> {
    if dom.has_class(node, SELECTED_CLASS) {
        return Ok(());
    }
    dom.add_class(node, HOVER_CLASS)
}

pub fn hover_leave(dom: &mut Dom, node: NodeId) -> DomResult<()> {
    dom.remove_class(node, HOVER_CLASS)
}

fn capture(
    dom: &Dom,
    layout: &dyn Layout,
    node: NodeId,
    id: String,
    toolbar_offset: f64,
) -> SelectedElement {
    let text = dom.text_content(node);
    let content = match text.trim() {
        "" => dom.inner_html(node),
        trimmed => trimmed.to_string(),
    };

    let guarded_draggable = dom.has_attribute(node, DRAGGABLE_GUARD_ATTR);
    let mut attributes = IndexMap::new();
    for attr in dom.attributes(node) {
        if markers::is_marker_attribute(&attr.name)
            || (guarded_draggable && attr.is(DRAGGABLE_ATTR))
        {
            continue;
        }
        if attr.is("class") {
            let classes = markers::user_classes(&attr.value);
            if !classes.is_empty() {
                attributes.insert(attr.name.clone(), classes);
            }
            continue;
        }
        attributes.insert(attr.name.clone(), attr.value.clone());
    }

    let styles = dom.inline_styles(node).into_iter().collect();

    let bounds = layout.bounding_box(dom, node);
    let origin = layout.surface_origin();
    let toolbar_anchor = bounds.map(|rect| {
        Point::new(
            origin.x + rect.center_x(),
            origin.y + rect.top() - toolbar_offset,
        )
    });

    SelectedElement {
        node,
        id,
        tag: dom.tag_name(node).unwrap_or_default(),
        content,
        attributes,
        styles,
        bounds,
        toolbar_anchor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::FixedLayout;

    fn page() -> (Dom, NodeId, NodeId) {
        let dom = Dom::parse(
            r#"<h1 id="hero" class="big" style="color: red;">  Welcome  </h1><p class="lead">Text</p>"#,
        );
        let body = dom.body().unwrap();
        let children = dom.element_children(body);
        (dom, children[0], children[1])
    }

    #[test]
    fn test_select_marks_and_captures() {
        let (mut dom, h1, _) = page();
        let layout = FixedLayout::new()
            .with_origin(Point::new(100.0, 50.0))
            .with_box(h1, Rect::new(10.0, 200.0, 300.0, 40.0));
        let mut selection = Selection::new();

        let selected = selection.select(&mut dom, &layout, h1, 60.0).unwrap().clone();

        assert!(dom.has_class(h1, SELECTED_CLASS));
        assert_eq!(dom.attribute(h1, ELEMENT_TYPE_ATTR), Some("h1"));
        assert_eq!(dom.attribute(h1, DRAGGABLE_ATTR), Some("true"));
        assert_eq!(selected.id, "hero");
        assert_eq!(selected.tag, "h1");
        assert_eq!(selected.content, "Welcome");
        assert_eq!(selected.attributes.get("class").map(String::as_str), Some("big"));
        assert!(!selected.attributes.contains_key(ELEMENT_TYPE_ATTR));
        assert!(!selected.attributes.contains_key(DRAGGABLE_ATTR));
        assert_eq!(selected.styles.get("color").map(String::as_str), Some("red"));
        assert_eq!(selected.toolbar_anchor, Some(Point::new(260.0, 190.0)));
    }

    #[test]
    fn test_selection_is_exclusive() {
        let (mut dom, h1, p) = page();
        let layout = FixedLayout::new();
        let mut selection = Selection::new();

        selection.select(&mut dom, &layout, h1, 60.0).unwrap();
        selection.select(&mut dom, &layout, p, 60.0).unwrap();

        assert!(!dom.has_class(h1, SELECTED_CLASS));
        assert!(!dom.has_attribute(h1, ELEMENT_TYPE_ATTR));
        assert!(dom.has_class(p, SELECTED_CLASS));
        assert_eq!(dom.elements_with_class(SELECTED_CLASS), vec![p]);
        assert!(selection.current().unwrap().id.starts_with("element-"));
    }

    #[test]
    fn test_hover_suppressed_on_selected() {
        let (mut dom, h1, p) = page();
        let mut selection = Selection::new();
        selection.select(&mut dom, &FixedLayout::new(), h1, 60.0).unwrap();

        hover_enter(&mut dom, h1).unwrap();
        hover_enter(&mut dom, p).unwrap();
        assert!(!dom.has_class(h1, HOVER_CLASS));
        assert!(dom.has_class(p, HOVER_CLASS));

        hover_leave(&mut dom, p).unwrap();
        assert_eq!(dom.attribute(p, "class"), Some("lead"));
    }

    #[test]
    fn test_empty_element_content_falls_back_to_markup() {
        let mut dom = Dom::parse(r#"<div><img src="a.png"></div>"#);
        let div = dom.element_children(dom.body().unwrap())[0];
        let mut selection = Selection::new();
        let selected = selection.select(&mut dom, &FixedLayout::new(), div, 60.0).unwrap();
        assert_eq!(selected.content, r#"<img src="a.png">"#);
        assert!(selected.toolbar_anchor.is_none());
    }
}
