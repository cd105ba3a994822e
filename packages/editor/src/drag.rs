//! # Drag Reorder
//!
//! Pointer-driven reordering without a drag library:
//!
//! ```text
//! Idle ──start──▶ Dragging ──drop──▶ Dragging (dropped) ──end──▶ Idle
//!                    │                                      ▲
//!                    └──────────────── end ─────────────────┘
//! ```
//!
//! While dragging, the element is dimmed and a non-interactive clone (the
//! proxy) follows the pointer. A drop inserts the element before or after
//! the target depending on which half of the target the pointer is in.

use crate::canvas::Layout;
use crate::markers::{
    self, StyleRestore, CONTENTEDITABLE_ATTR, DRAGGING_ATTR, DRAGGING_CLASS, EDITING_ATTR,
    HOVER_CLASS, PROXY_ATTR, SELECTED_CLASS,
};
use sitebuilder_dom::{Dom, DomError, DomResult, NodeId, Point, Rect};
use std::fmt;

/// An active drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub element: NodeId,
    pub origin_parent: Option<NodeId>,
    pub origin_next_sibling: Option<NodeId>,
    /// Floating clone, absent when the element had no layout box
    pub proxy: Option<NodeId>,
    /// Size of the proxy, used to keep it centered on the pointer
    pub proxy_size: Option<Rect>,
    pub previous_opacity: Option<String>,
    /// Set once a drop moved the element
    pub dropped: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    NotDragging,
    OntoSelf,
    OntoProxy,
    OutsideBody,
    NoGeometry,
}

impl fmt::Display for DropRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropRejection::NotDragging => "no drag in progress",
            DropRejection::OntoSelf => "dropped onto itself",
            DropRejection::OntoProxy => "dropped onto the drag proxy",
            DropRejection::OutsideBody => "target is outside the body",
            DropRejection::NoGeometry => "target has no layout box",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Moved {
        target: NodeId,
        position: DropPosition,
    },
    Rejected(DropRejection),
    /// The document refused the move, e.g. a container onto its own descendant
    Failed(DomError),
}

impl DropOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, DropOutcome::Moved { .. })
    }
}

/// Which side of `target` a drop at `pointer` lands on
pub fn drop_position(target: Rect, pointer: Point) -> DropPosition {
    if pointer.y < target.mid_y() {
        DropPosition::Before
    } else {
        DropPosition::After
    }
}

#[derive(Debug, Clone)]
pub struct DragEngine {
    state: DragState,
    lifted_opacity: String,
    proxy_border: String,
}

impl DragEngine {
    pub fn new(lifted_opacity: impl Into<String>, proxy_border: impl Into<String>) -> Self {
        Self {
            state: DragState::Idle,
            lifted_opacity: lifted_opacity.into(),
            proxy_border: proxy_border.into(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    /// Pick up `element`. An unfinished drag is ended first.
    pub fn start(&mut self, dom: &mut Dom, layout: &dyn Layout, element: NodeId) -> DomResult<()> {
        if self.is_dragging() {
            self.end(dom)?;
        }

        let origin_parent = dom.parent(element);
        let origin_next_sibling = dom.next_sibling(element);
        let previous_opacity = dom.style_property(element, "opacity");
        let bounds = layout.bounding_box(dom, element);

        let proxy = match (bounds, dom.body()) {
            (Some(rect), Some(body)) => Some(self.create_proxy(dom, element, body, rect)?),
            _ => None,
        };

        dom.set_style_property(element, "opacity", &self.lifted_opacity)?;
        dom.add_class(element, DRAGGING_CLASS)?;
        dom.set_attribute(element, DRAGGING_ATTR, "")?;

        tracing::debug!(element = %element, proxy = proxy.is_some(), "drag started");
        self.state = DragState::Dragging(DragSession {
            element,
            origin_parent,
            origin_next_sibling,
            proxy,
            proxy_size: bounds,
            previous_opacity,
            dropped: false,
        });
        Ok(())
    }

    fn create_proxy(
        &self,
        dom: &mut Dom,
        element: NodeId,
        body: NodeId,
        rect: Rect,
    ) -> DomResult<NodeId> {
        let proxy = dom.deep_clone(element)?;
        for node in std::iter::once(proxy).chain(dom.descendant_elements(proxy)) {
            dom.remove_attribute(node, "id")?;
            dom.remove_attribute(node, CONTENTEDITABLE_ATTR)?;
            dom.remove_attribute(node, EDITING_ATTR)?;
            dom.remove_class(node, SELECTED_CLASS)?;
            dom.remove_class(node, HOVER_CLASS)?;
        }
        dom.set_attribute(proxy, PROXY_ATTR, "")?;

        let declarations = [
            ("position", "fixed".to_string()),
            ("left", px(rect.x)),
            ("top", px(rect.y)),
            ("width", px(rect.width)),
            ("height", px(rect.height)),
            ("margin", "0".to_string()),
            ("pointer-events", "none".to_string()),
            ("border", self.proxy_border.clone()),
            ("z-index", "9999".to_string()),
        ];
        for (property, value) in declarations {
            dom.set_style_property(proxy, property, &value)?;
        }

        dom.append_child(body, proxy)?;
        Ok(proxy)
    }

    /// Keep the proxy centered on the pointer
    pub fn over(&mut self, dom: &mut Dom, pointer: Point) -> DomResult<()> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        let (Some(proxy), Some(size)) = (session.proxy, session.proxy_size) else {
            return Ok(());
        };
        let placed = size.centered_on(pointer);
        dom.set_style_property(proxy, "left", &px(placed.x))?;
        dom.set_style_property(proxy, "top", &px(placed.y))?;
        Ok(())
    }

    /// Drop onto `target` (the innermost node under the pointer)
    pub fn drop_on(
        &mut self,
        dom: &mut Dom,
        layout: &dyn Layout,
        target: NodeId,
        pointer: Point,
    ) -> DropOutcome {
        let DragState::Dragging(session) = &mut self.state else {
            return DropOutcome::Rejected(DropRejection::NotDragging);
        };

        let target = if dom.is_element(target) {
            Some(target)
        } else {
            dom.parent_element(target)
        };
        let Some(target) = target else {
            return DropOutcome::Rejected(DropRejection::OutsideBody);
        };

        if target == session.element {
            return DropOutcome::Rejected(DropRejection::OntoSelf);
        }
        if markers::within_proxy(dom, target) {
            return DropOutcome::Rejected(DropRejection::OntoProxy);
        }
        let inside_body = dom
            .body()
            .is_some_and(|body| body != target && dom.contains(body, target));
        let parent = dom.parent(target);
        let Some(parent) = parent.filter(|_| inside_body) else {
            return DropOutcome::Rejected(DropRejection::OutsideBody);
        };
        let Some(rect) = layout.bounding_box(dom, target) else {
            return DropOutcome::Rejected(DropRejection::NoGeometry);
        };

        let position = drop_position(rect, pointer);
        let reference = match position {
            DropPosition::Before => Some(target),
            DropPosition::After => dom.next_sibling(target),
        };

        if let Err(err) = dom.insert_before(parent, session.element, reference) {
            return DropOutcome::Failed(err);
        }

        let previous = session.previous_opacity.as_deref().unwrap_or("");
        if let Err(err) = dom.set_style_property(session.element, "opacity", previous) {
            return DropOutcome::Failed(err);
        }
        session.dropped = true;
        DropOutcome::Moved { target, position }
    }

    /// Finish the drag: restore opacity unless a drop already did, remove the
    /// proxy and the dragging markers, and go back to idle.
    pub fn end(&mut self, dom: &mut Dom) -> DomResult<Option<DragSession>> {
        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return Ok(None);
        };

        if dom.node(session.element).is_some() {
            if !session.dropped {
                let previous = session.previous_opacity.as_deref().unwrap_or("");
                dom.set_style_property(session.element, "opacity", previous)?;
            }
            dom.remove_class(session.element, DRAGGING_CLASS)?;
            dom.remove_attribute(session.element, DRAGGING_ATTR)?;
        }
        if let Some(proxy) = session.proxy {
            dom.detach(proxy)?;
        }

        tracing::debug!(element = %session.element, dropped = session.dropped, "drag ended");
        Ok(Some(session))
    }

    /// Forget the drag without touching the document (it was replaced)
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }

    /// Style values to put back when capturing mid-drag
    pub fn restores(&self) -> Vec<StyleRestore> {
        match self.session() {
            Some(session) if !session.dropped => vec![StyleRestore::new(
                session.element,
                "opacity",
                session.previous_opacity.clone(),
            )],
            _ => Vec::new(),
        }
    }
}

fn px(value: f64) -> String {
    format!("{}px", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::FixedLayout;
    use pretty_assertions::assert_eq;

    struct Fixture {
        dom: Dom,
        list: NodeId,
        items: Vec<NodeId>,
        layout: FixedLayout,
    }

    /// Three stacked 100x40 items
    fn fixture() -> Fixture {
        let dom = Dom::parse(r#"<ul><li id="a">A</li><li id="b">B</li><li id="c">C</li></ul>"#);
        let list = dom.element_children(dom.body().unwrap())[0];
        let items = dom.element_children(list);
        let mut layout = FixedLayout::new();
        for (i, item) in items.iter().enumerate() {
            layout.set_box(*item, Rect::new(0.0, i as f64 * 40.0, 100.0, 40.0));
        }
        Fixture {
            dom,
            list,
            items,
            layout,
        }
    }

    fn order(f: &Fixture) -> Vec<String> {
        f.dom
            .element_children(f.list)
            .into_iter()
            .map(|li| f.dom.text_content(li))
            .collect()
    }

    fn engine() -> DragEngine {
        DragEngine::new("0.7", "2px solid #3b82f6")
    }

    #[test]
    fn test_start_lifts_element_and_creates_proxy() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[0]).unwrap();

        let session = drag.session().unwrap().clone();
        assert_eq!(session.origin_parent, Some(f.list));
        assert_eq!(session.origin_next_sibling, Some(f.items[1]));
        assert_eq!(f.dom.style_property(f.items[0], "opacity").as_deref(), Some("0.7"));

        let proxy = session.proxy.unwrap();
        assert!(f.dom.has_attribute(proxy, PROXY_ATTR));
        assert!(!f.dom.has_attribute(proxy, "id"));
        assert_eq!(f.dom.style_property(proxy, "pointer-events").as_deref(), Some("none"));
        assert_eq!(f.dom.parent(proxy), f.dom.body());
    }

    #[test]
    fn test_over_centers_proxy_on_pointer() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[0]).unwrap();
        drag.over(&mut f.dom, Point::new(200.0, 300.0)).unwrap();

        let proxy = drag.session().unwrap().proxy.unwrap();
        assert_eq!(f.dom.style_property(proxy, "left").as_deref(), Some("150px"));
        assert_eq!(f.dom.style_property(proxy, "top").as_deref(), Some("280px"));
    }

    #[test]
    fn test_drop_above_midpoint_inserts_before() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[2]).unwrap();

        let outcome = drag.drop_on(&mut f.dom, &f.layout, f.items[1], Point::new(10.0, 45.0));
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                target: f.items[1],
                position: DropPosition::Before
            }
        );
        assert_eq!(order(&f), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_drop_at_midpoint_inserts_after() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[0]).unwrap();

        let outcome = drag.drop_on(&mut f.dom, &f.layout, f.items[1], Point::new(10.0, 60.0));
        assert!(outcome.is_moved());
        assert_eq!(order(&f), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_successful_drop_restores_opacity_and_end_cleans_up() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[0]).unwrap();
        let proxy = drag.session().unwrap().proxy.unwrap();

        drag.drop_on(&mut f.dom, &f.layout, f.items[2], Point::new(10.0, 110.0));
        assert_eq!(f.dom.style_property(f.items[0], "opacity"), None);

        let ended = drag.end(&mut f.dom).unwrap().unwrap();
        assert!(ended.dropped);
        assert!(!f.dom.is_attached(proxy));
        assert!(!f.dom.has_class(f.items[0], DRAGGING_CLASS));
        assert!(!f.dom.has_attribute(f.items[0], "style"));
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn test_drop_onto_self_or_proxy_is_rejected() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[0]).unwrap();
        let proxy = drag.session().unwrap().proxy.unwrap();

        let onto_self = drag.drop_on(&mut f.dom, &f.layout, f.items[0], Point::new(0.0, 0.0));
        assert_eq!(onto_self, DropOutcome::Rejected(DropRejection::OntoSelf));
        let onto_proxy = drag.drop_on(&mut f.dom, &f.layout, proxy, Point::new(0.0, 0.0));
        assert_eq!(onto_proxy, DropOutcome::Rejected(DropRejection::OntoProxy));

        // still lifted until the drag ends
        assert_eq!(f.dom.style_property(f.items[0], "opacity").as_deref(), Some("0.7"));
        drag.end(&mut f.dom).unwrap();
        assert_eq!(f.dom.style_property(f.items[0], "opacity"), None);
        assert_eq!(order(&f), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_drop_into_own_descendant_fails_without_moving() {
        let mut dom = Dom::parse(r#"<section><div><p>inner</p></div></section>"#);
        let section = dom.element_children(dom.body().unwrap())[0];
        let div = dom.element_children(section)[0];
        let p = dom.element_children(div)[0];
        let layout = FixedLayout::new()
            .with_box(section, Rect::new(0.0, 0.0, 200.0, 200.0))
            .with_box(p, Rect::new(0.0, 50.0, 200.0, 20.0));
        let mut drag = engine();

        drag.start(&mut dom, &layout, section).unwrap();
        let outcome = drag.drop_on(&mut dom, &layout, p, Point::new(5.0, 55.0));
        assert!(matches!(outcome, DropOutcome::Failed(DomError::HierarchyRequest { .. })));
        assert_eq!(dom.parent(section), dom.body());
    }

    #[test]
    fn test_restores_cover_lifted_opacity() {
        let mut f = fixture();
        let mut drag = engine();
        drag.start(&mut f.dom, &f.layout, f.items[1]).unwrap();
        assert_eq!(
            drag.restores(),
            vec![StyleRestore::new(f.items[1], "opacity", None)]
        );
    }
}
