//! # Tree Builder
//!
//! Builds a [`Dom`] from the token stream. Parsing never fails: malformed
//! markup is repaired the way browsers roughly do it, and the result is
//! always normalized into `<!DOCTYPE> <html> <head/> <body/> </html>`.

use crate::entities;
use crate::node::{is_escapable_raw_text, is_raw_text, is_void};
use crate::tokenizer::{doctype_name, end_tag_name, parse_start_tag, Token};
use crate::{Dom, DomResult, NodeId};
use logos::{Lexer, Logos};

/// Starting one of these closes an open `<p>`
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements that stop the search for an implicitly closed element
const SCOPE_BOUNDARIES: &[&str] = &[
    "html", "body", "table", "td", "th", "button", "caption", "object", "template",
];

/// Elements that only belong in `<head>`
const HEAD_ONLY: &[&str] = &["base", "link", "meta", "title"];

/// Tree edits made while building only touch nodes created by this module,
/// attached under parents it chose, so they cannot fail.
fn built(result: DomResult<()>) {
    debug_assert!(result.is_ok(), "tree builder edit failed: {:?}", result);
}

fn one_of(tag: &str, set: &[&str]) -> bool {
    set.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Parse an HTML document
pub fn parse(source: &str) -> Dom {
    Parser::new(source).parse_document()
}

pub struct Parser<'src> {
    lexer: Lexer<'src, Token<'src>>,
    dom: Dom,
    /// Open elements; index 0 is the document node
    stack: Vec<NodeId>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let dom = Dom::new();
        let root = dom.root();
        Self {
            lexer: Token::lexer(source),
            dom,
            stack: vec![root],
        }
    }

    pub fn parse_document(mut self) -> Dom {
        while let Some(token) = self.lexer.next() {
            match token {
                Ok(Token::Text(text)) => self.text(&entities::decode(text)),
                Ok(Token::Lt(text)) => self.text(text),
                Ok(Token::Comment(text)) => {
                    let node = self.dom.create_comment(text);
                    self.append(node);
                }
                Ok(Token::Declaration(slice)) => self.declaration(slice),
                Ok(Token::StartTag(slice)) => self.start_tag(slice),
                Ok(Token::EndTag(slice)) => self.end_tag(slice),
                Err(()) => {
                    let text = self.lexer.slice();
                    self.text(text);
                }
            }
        }

        normalize(&mut self.dom);
        self.dom.take_mutations();
        tracing::trace!(nodes = self.dom.len(), "parsed document");
        self.dom
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.dom.root())
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        // parent is always an element or the document node
        built(self.dom.append_child(parent, node));
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        // merge with a preceding text node
        if let Some(last) = self.dom.children(parent).last().copied() {
            if let Some(crate::NodeData::Text(existing)) = self.dom.data(last) {
                let merged = format!("{}{}", existing, text);
                built(self.dom.set_text_content(last, &merged));
                return;
            }
        }
        let node = self.dom.create_text(text);
        self.append(node);
    }

    fn declaration(&mut self, slice: &str) {
        let Some(name) = doctype_name(slice) else {
            return;
        };
        let root = self.dom.root();
        let first_doctype = self.dom.doctype().is_none();
        let before_content = self.dom.element_children(root).is_empty();
        if first_doctype && before_content && self.current() == root {
            let node = self.dom.create_doctype(name);
            self.append(node);
        }
    }

    fn start_tag(&mut self, slice: &str) {
        let tag = parse_start_tag(slice);
        let name = tag.name.as_str();

        self.close_implied(name);

        let element = self.dom.create_element(name);
        for (attr, value) in &tag.attributes {
            built(self.dom.set_attribute(element, attr, entities::decode(value)));
        }
        self.append(element);

        if is_void(name) || tag.self_closing {
            return;
        }

        if is_raw_text(name) || is_escapable_raw_text(name) {
            let raw = self.consume_raw_text(name);
            if !raw.is_empty() {
                let content = if is_escapable_raw_text(name) {
                    entities::decode(&raw)
                } else {
                    raw
                };
                let node = self.dom.create_text(content);
                built(self.dom.append_child(element, node));
            }
            return;
        }

        self.stack.push(element);
    }

    /// Take everything up to `</name` verbatim and skip past the end tag
    fn consume_raw_text(&mut self, name: &str) -> String {
        let rest = self.lexer.remainder();
        let needle = format!("</{}", name.to_ascii_lowercase());
        match rest.to_ascii_lowercase().find(&needle) {
            Some(start) => {
                let raw = rest[..start].to_string();
                let end = rest[start..]
                    .find('>')
                    .map(|i| start + i + 1)
                    .unwrap_or(rest.len());
                self.lexer.bump(end);
                raw
            }
            None => {
                let raw = rest.to_string();
                self.lexer.bump(rest.len());
                raw
            }
        }
    }

    fn end_tag(&mut self, slice: &str) {
        let name = end_tag_name(slice);
        if is_void(name) {
            return;
        }
        if let Some(index) = self.open_index(name, &[]) {
            self.stack.truncate(index);
        }
    }

    /// Position of the nearest open `name` element, searching down the stack
    /// until one of `boundaries` (never past the document node)
    fn open_index(&self, name: &str, boundaries: &[&str]) -> Option<usize> {
        for (index, id) in self.stack.iter().enumerate().skip(1).rev() {
            let element = self.dom.element(*id)?;
            if element.is(name) {
                return Some(index);
            }
            if one_of(&element.tag, boundaries) {
                return None;
            }
        }
        None
    }

    fn close_implied(&mut self, name: &str) {
        if one_of(name, CLOSES_P) {
            if let Some(index) = self.open_index("p", SCOPE_BOUNDARIES) {
                self.stack.truncate(index);
            }
        }

        let (targets, boundaries): (&[&str], &[&str]) = match name.to_ascii_lowercase().as_str() {
            "li" => (&["li"], &["ul", "ol"]),
            "dt" | "dd" => (&["dt", "dd"], &["dl"]),
            "option" => (&["option"], &["select", "datalist"]),
            "tr" => (&["tr"], &["table", "tbody", "thead", "tfoot"]),
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            _ => return,
        };

        for target in targets {
            if let Some(index) = self.open_index(target, boundaries) {
                self.stack.truncate(index);
                return;
            }
        }
    }
}

/// Force the canonical document shape.
fn normalize(dom: &mut Dom) {
    let root = dom.root();

    let html = match dom.child_with_tag(root, "html") {
        Some(html) => html,
        None => {
            let html = dom.create_element("html");
            built(dom.append_child(root, html));
            html
        }
    };

    // Everything at the top level except the doctype and comments goes inside <html>
    for child in dom.children(root).to_vec() {
        if child == html {
            continue;
        }
        match dom.data(child) {
            Some(crate::NodeData::Doctype { .. }) | Some(crate::NodeData::Comment(_)) => {}
            Some(crate::NodeData::Text(text)) if text.trim().is_empty() => {
                built(dom.detach(child));
            }
            _ => {
                built(dom.append_child(html, child));
            }
        }
    }

    if dom.doctype().is_none() {
        let doctype = dom.create_doctype("html");
        let first = dom.children(root).first().copied();
        built(dom.insert_before(root, doctype, first));
    }

    // Keep the doctype first
    if let Some(doctype) = dom
        .children(root)
        .iter()
        .copied()
        .find(|c| matches!(dom.data(*c), Some(crate::NodeData::Doctype { .. })))
    {
        let first = dom.children(root).first().copied();
        if first != Some(doctype) {
            built(dom.insert_before(root, doctype, first));
        }
    }

    let head = match dom.child_with_tag(html, "head") {
        Some(head) => head,
        None => {
            let head = dom.create_element("head");
            let first = dom.children(html).first().copied();
            built(dom.insert_before(html, head, first));
            head
        }
    };

    let body = match dom.child_with_tag(html, "body") {
        Some(body) => body,
        None => {
            let body = dom.create_element("body");
            built(dom.append_child(html, body));
            body
        }
    };

    let mut before_body = Vec::new();
    let mut after_body = Vec::new();
    let mut seen_body = false;
    for child in dom.children(html).to_vec() {
        if child == body {
            seen_body = true;
            continue;
        }
        if child == head {
            continue;
        }
        if let Some(crate::NodeData::Text(text)) = dom.data(child) {
            if text.trim().is_empty() {
                continue;
            }
        }
        if seen_body {
            after_body.push(child);
        } else {
            before_body.push(child);
        }
    }

    let mut body_content_started = false;
    let anchor = dom.children(body).first().copied();
    for child in before_body {
        let head_only = dom
            .element(child)
            .is_some_and(|element| one_of(&element.tag, HEAD_ONLY));
        let is_comment = matches!(dom.data(child), Some(crate::NodeData::Comment(_)));
        if !body_content_started && (head_only || is_comment) {
            built(dom.append_child(head, child));
        } else {
            body_content_started = true;
            built(dom.insert_before(body, child, anchor));
        }
    }
    for child in after_body {
        built(dom.append_child(body, child));
    }
}
