//! # Arena DOM
//!
//! The live document of the editing canvas. Nodes live in a flat arena and
//! are addressed by [`NodeId`]; detaching a node never invalidates its id.
//!
//! Every change made through this API appends a [`MutationRecord`], which is
//! what the editor's sync bridge consumes in place of a browser
//! `MutationObserver`.

use crate::error::{DomError, DomResult};
use crate::node::{Attribute, ElementData, Node, NodeData, NodeId};
use crate::{serializer, style};

/// What kind of change a [`MutationRecord`] describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from the target
    ChildList,
    /// An attribute of the target element changed
    Attribute { name: String },
    /// The text of a text or comment node changed
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn is_attribute(&self, name: &str) -> bool {
        matches!(&self.kind, MutationKind::Attribute { name: n } if n.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    mutations: Vec<MutationRecord>,
}

impl Dom {
    /// Empty document containing only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            mutations: Vec::new(),
        }
    }

    /// Parse a (possibly malformed) HTML document
    pub fn parse(source: &str) -> Self {
        crate::parser::parse(source)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(DomError::NodeNotFound(id))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|node| &node.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Lowercased tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.element(id).map(ElementData::local_name)
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|element| element.is(tag))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Closest ancestor that is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|c| *c == id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Inclusive ancestry check: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some() && self.contains(self.root(), id)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// All descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_element(*node))
            .collect()
    }

    /// Every attached element, in document order
    pub fn all_elements(&self) -> Vec<NodeId> {
        self.descendant_elements(self.root())
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_with_tag(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_with_tag(self.document_element()?, "body")
    }

    pub fn child_with_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.is_tag(*child, tag))
    }

    pub fn doctype(&self) -> Option<&str> {
        self.children(self.root())
            .iter()
            .find_map(|child| match self.data(*child) {
                Some(NodeData::Doctype { name }) => Some(name.as_str()),
                _ => None,
            })
    }

    // ---------------------------------------------------------------
    // Creation and tree mutation
    // ---------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::Doctype { name: name.into() })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or last when `None`),
    /// detaching it from its current position first.
    ///
    /// Fails without touching the tree when the insertion would make a node
    /// its own ancestor.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        if child == self.root() {
            return Err(DomError::DocumentNode);
        }
        self.node(child).ok_or(DomError::NodeNotFound(child))?;
        match self.data(parent).ok_or(DomError::NodeNotFound(parent))? {
            NodeData::Element(_) | NodeData::Document => {}
            _ => return Err(DomError::NotAContainer(parent)),
        }
        if self.contains(child, parent) {
            return Err(DomError::hierarchy(parent, child));
        }

        // Inserting a node before itself means "before its next sibling"
        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child),
            other => other,
        };
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    reference: r,
                });
            }
        }

        self.detach(child)?;

        let index = match reference {
            Some(r) => self
                .children(parent)
                .iter()
                .position(|c| *c == r)
                .unwrap_or(self.children(parent).len()),
            None => self.children(parent).len(),
        };

        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.record(parent, MutationKind::ChildList);
        Ok(())
    }

    /// Detach a node from its parent. Detaching a detached node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let parent = match self.node(id).ok_or(DomError::NodeNotFound(id))?.parent {
            Some(parent) => parent,
            None => return Ok(()),
        };
        self.node_mut(parent)?.children.retain(|c| *c != id);
        self.node_mut(id)?.parent = None;
        self.record(parent, MutationKind::ChildList);
        Ok(())
    }

    /// Deep copy of a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> DomResult<NodeId> {
        let data = self.data(id).ok_or(DomError::NodeNotFound(id))?.clone();
        let copy = self.push(data);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Replace the whole document with another one.
    ///
    /// Ids from the previous document must not be used afterwards.
    pub fn replace_with(&mut self, other: Dom) {
        self.nodes = other.nodes;
        self.mutations.clear();
        self.record(NodeId(0), MutationKind::ChildList);
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attribute(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id)
            .map(|element| element.attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let value = value.into();
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|attr| attr.is(name)) {
            Some(attr) if attr.value == value => return Ok(()),
            Some(attr) => attr.value = value,
            None => element.attributes.push(Attribute::new(name, value)),
        }
        self.record(
            id,
            MutationKind::Attribute {
                name: name.to_ascii_lowercase(),
            },
        );
        Ok(())
    }

    /// Returns whether the attribute was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<bool> {
        let element = self.element_mut(id)?;
        let before = element.attributes.len();
        element.attributes.retain(|attr| !attr.is(name));
        let removed = element.attributes.len() != before;
        if removed {
            self.record(
                id,
                MutationKind::Attribute {
                    name: name.to_ascii_lowercase(),
                },
            );
        }
        Ok(removed)
    }

    /// Attached elements carrying `name`
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.all_elements()
            .into_iter()
            .filter(|id| self.has_attribute(*id, name))
            .collect()
    }

    // ---------------------------------------------------------------
    // Class list
    // ---------------------------------------------------------------

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let value = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", value)
    }

    /// Removes the class; drops the `class` attribute once it is empty
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        if !self.has_class(id, class) {
            return Ok(());
        }
        let remaining: Vec<&str> = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attribute(id, "class")?;
        } else {
            let value = remaining.join(" ");
            self.set_attribute(id, "class", value)?;
        }
        Ok(())
    }

    /// Attached elements carrying `class`
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.all_elements()
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    // ---------------------------------------------------------------
    // Inline styles
    // ---------------------------------------------------------------

    pub fn inline_styles(&self, id: NodeId) -> Vec<(String, String)> {
        self.attribute(id, "style")
            .map(style::parse_declarations)
            .unwrap_or_default()
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        self.inline_styles(id)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    /// Set one inline style property. An empty value removes the property;
    /// the `style` attribute is dropped once no declarations remain.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> DomResult<()> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        let mut declarations = self.inline_styles(id);
        let value = value.trim();
        let existing = declarations
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(property));

        match (existing, value.is_empty()) {
            (Some(index), true) => {
                declarations.remove(index);
            }
            (Some(index), false) => declarations[index].1 = value.to_string(),
            (None, true) => return Ok(()),
            (None, false) => declarations.push((property.to_ascii_lowercase(), value.to_string())),
        }

        if declarations.is_empty() {
            self.remove_attribute(id, "style")?;
        } else {
            self.set_attribute(id, "style", style::serialize_declarations(&declarations))?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.data(id) {
            Some(NodeData::Text(text)) | Some(NodeData::Comment(text)) => text.clone(),
            _ => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match self.data(node) {
                    Some(NodeData::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Replace all children of an element with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let is_character_data = match self.data(id).ok_or(DomError::NodeNotFound(id))? {
            NodeData::Text(_) | NodeData::Comment(_) => true,
            NodeData::Element(_) => false,
            _ => return Err(DomError::NotAnElement(id)),
        };

        if is_character_data {
            if let NodeData::Text(t) | NodeData::Comment(t) = &mut self.node_mut(id)?.data {
                *t = text.to_string();
            }
            self.record(id, MutationKind::CharacterData);
            return Ok(());
        }

        let children = self.children(id).to_vec();
        for child in children {
            self.detach(child)?;
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        serializer::serialize_children(self, id)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        serializer::serialize_node(self, id)
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        serializer::serialize(self)
    }

    // ---------------------------------------------------------------
    // Mutation records
    // ---------------------------------------------------------------

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.mutations.push(MutationRecord { target, kind });
    }

    pub fn pending_mutations(&self) -> &[MutationRecord] {
        &self.mutations
    }

    /// Drain all mutation records accumulated since the last call
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
