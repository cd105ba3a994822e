//! # Interactivity Injector
//!
//! Walks a freshly loaded document and attaches selection, hover, inline
//! edit and drag behavior to every eligible element of `<body>`, then adds
//! the editor stylesheet to `<head>`.
//!
//! Injection is idempotent: running it twice over the same document leaves
//! one stylesheet and the same handler table.

use crate::canvas::{Behaviors, HandlerTable};
use crate::markers::{self, ELEMENT_ATTR, EDITOR_STYLESHEET, STYLES_ATTR};
use sitebuilder_dom::{Dom, DomResult, NodeId};

/// Never interactive
pub const NON_VISUAL_TAGS: &[&str] = &["script", "style", "meta", "link", "title"];

/// Tags whose text can be edited in place
pub const TEXT_BEARING_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "a", "button", "div",
];

pub struct Injector;

impl Injector {
    /// Behaviors for an element with tag `tag`, or `None` if it gets none
    pub fn behaviors_for(tag: &str) -> Option<Behaviors> {
        if NON_VISUAL_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return None;
        }
        let mut behaviors = Behaviors::SELECT | Behaviors::HOVER | Behaviors::DRAG;
        if TEXT_BEARING_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            behaviors |= Behaviors::INLINE_EDIT;
        }
        Some(behaviors)
    }

    /// Inject interactivity into `dom`, returning the attached behaviors.
    ///
    /// A document without `<body>` gets nothing attached.
    pub fn inject(dom: &mut Dom) -> DomResult<HandlerTable> {
        let mut handlers = HandlerTable::new();
        let Some(body) = dom.body() else {
            return Ok(handlers);
        };

        Self::ensure_stylesheet(dom)?;

        for node in dom.descendant_elements(body) {
            if markers::within_proxy(dom, node) {
                continue;
            }
            let Some(tag) = dom.tag_name(node) else {
                continue;
            };
            let Some(behaviors) = Self::behaviors_for(&tag) else {
                continue;
            };

            let kind = if behaviors.contains(Behaviors::INLINE_EDIT) {
                "editable"
            } else {
                "element"
            };
            dom.set_attribute(node, ELEMENT_ATTR, kind)?;
            handlers.attach(node, behaviors);
        }

        tracing::debug!(elements = handlers.len(), "injected interactivity");
        Ok(handlers)
    }

    /// Parse `html`, inject it and serialize the result
    pub fn inject_html(html: &str) -> String {
        let mut dom = Dom::parse(html);
        if let Err(err) = Self::inject(&mut dom) {
            tracing::warn!(error = %err, "injection failed");
        }
        dom.to_html()
    }

    fn ensure_stylesheet(dom: &mut Dom) -> DomResult<Option<NodeId>> {
        if let Some(existing) = markers::stylesheet(dom) {
            return Ok(Some(existing));
        }
        let Some(head) = dom.head() else {
            return Ok(None);
        };
        let style = dom.create_element("style");
        dom.set_attribute(style, STYLES_ATTR, "")?;
        let text = dom.create_text(EDITOR_STYLESHEET);
        dom.append_child(style, text)?;
        dom.append_child(head, style)?;
        Ok(Some(style))
    }
}
