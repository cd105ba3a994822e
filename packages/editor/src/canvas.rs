//! # Rendering Surface
//!
//! The editable document as the host displays it: the live [`Dom`] (absent
//! while the surface is inaccessible), the behaviors the injector attached
//! to its elements, and the input events the host delivers.

use bitflags::bitflags;
use sitebuilder_dom::{Dom, NodeId, Point, Rect};
use std::collections::HashMap;

bitflags! {
    /// Interactivity attached to one element
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Behaviors: u8 {
        const SELECT = 1 << 0;
        const HOVER = 1 << 1;
        const INLINE_EDIT = 1 << 2;
        const DRAG = 1 << 3;
    }
}

/// Which elements react to which events
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    entries: HashMap<NodeId, Behaviors>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, node: NodeId, behaviors: Behaviors) {
        *self.entries.entry(node).or_insert(Behaviors::empty()) |= behaviors;
    }

    pub fn get(&self, node: NodeId) -> Behaviors {
        self.entries.get(&node).copied().unwrap_or(Behaviors::empty())
    }

    pub fn has(&self, node: NodeId, behavior: Behaviors) -> bool {
        self.get(node).contains(behavior)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Geometry supplied by the host; the engine never computes layout
pub trait Layout {
    /// Bounding box of `node` relative to the surface's viewport
    fn bounding_box(&self, dom: &Dom, node: NodeId) -> Option<Rect>;

    /// Position of the surface within the host window
    fn surface_origin(&self) -> Point {
        Point::default()
    }
}

/// A layout with fixed, explicitly assigned boxes
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    boxes: HashMap<NodeId, Rect>,
    origin: Point,
}

impl FixedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_box(mut self, node: NodeId, rect: Rect) -> Self {
        self.boxes.insert(node, rect);
        self
    }

    pub fn set_box(&mut self, node: NodeId, rect: Rect) {
        self.boxes.insert(node, rect);
    }
}

impl Layout for FixedLayout {
    fn bounding_box(&self, _dom: &Dom, node: NodeId) -> Option<Rect> {
        self.boxes.get(&node).copied()
    }

    fn surface_origin(&self) -> Point {
        self.origin
    }
}

/// Input delivered by the host. `target` is the innermost node under the
/// pointer or holding focus.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Click { target: NodeId },
    DoubleClick { target: NodeId },
    MouseEnter { target: NodeId },
    MouseLeave { target: NodeId },
    KeyDown { target: NodeId, key: String },
    /// Text input into a content-editable element. `text`, when present, is
    /// the element's new text content.
    Input { target: NodeId, text: Option<String> },
    Blur { target: NodeId },
    MouseUp { target: NodeId },
    DragStart { target: NodeId, pointer: Point },
    DragOver { pointer: Point },
    Drop { target: NodeId, pointer: Point },
    DragEnd,
}

impl CanvasEvent {
    pub fn key_down(target: NodeId, key: impl Into<String>) -> Self {
        Self::KeyDown {
            target,
            key: key.into(),
        }
    }

    pub fn input(target: NodeId, text: impl Into<String>) -> Self {
        Self::Input {
            target,
            text: Some(text.into()),
        }
    }
}

/// What the handlers asked of the host's native event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventResponse {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventResponse {
    pub const IGNORED: Self = Self {
        prevent_default: false,
        stop_propagation: false,
    };

    pub const CONSUMED: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };
}

/// The live document plus its attached behaviors
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    document: Option<Dom>,
    handlers: HandlerTable,
}

impl Canvas {
    /// A surface whose document cannot be reached
    pub fn inaccessible() -> Self {
        Self::default()
    }

    pub fn with_document(dom: Dom) -> Self {
        Self {
            document: Some(dom),
            handlers: HandlerTable::new(),
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.document.is_some()
    }

    pub fn dom(&self) -> Option<&Dom> {
        self.document.as_ref()
    }

    pub fn dom_mut(&mut self) -> Option<&mut Dom> {
        self.document.as_mut()
    }

    /// Show a new document, dropping the previous one's behaviors
    pub fn show(&mut self, dom: Dom) {
        match &mut self.document {
            Some(live) => live.replace_with(dom),
            None => self.document = Some(dom),
        }
        self.handlers.clear();
    }

    /// Make the surface inaccessible, returning its document
    pub fn detach(&mut self) -> Option<Dom> {
        self.handlers.clear();
        self.document.take()
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn set_handlers(&mut self, handlers: HandlerTable) {
        self.handlers = handlers;
    }

    /// Nearest inclusive ancestor of `node` that carries `behavior`
    pub fn handler_for(&self, node: NodeId, behavior: Behaviors) -> Option<NodeId> {
        let dom = self.document.as_ref()?;
        std::iter::once(node)
            .chain(dom.ancestors(node))
            .find(|candidate| self.handlers.has(*candidate, behavior))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_lookup_walks_ancestors() {
        let dom = Dom::parse("<div><span>hi</span></div>");
        let div = dom.element_children(dom.body().unwrap())[0];
        let span = dom.element_children(div)[0];
        let text = dom.children(span)[0];

        let mut canvas = Canvas::with_document(dom);
        let mut handlers = HandlerTable::new();
        handlers.attach(div, Behaviors::SELECT | Behaviors::DRAG);
        handlers.attach(span, Behaviors::SELECT);
        canvas.set_handlers(handlers);

        assert_eq!(canvas.handler_for(text, Behaviors::SELECT), Some(span));
        assert_eq!(canvas.handler_for(text, Behaviors::DRAG), Some(div));
        assert_eq!(canvas.handler_for(text, Behaviors::INLINE_EDIT), None);
    }

    #[test]
    fn test_inaccessible_surface_has_no_handlers() {
        let root = Dom::new().root();
        let canvas = Canvas::inaccessible();
        assert!(!canvas.is_accessible());
        assert!(canvas.handler_for(root, Behaviors::SELECT).is_none());
    }
}
