use crate::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} cannot have children")]
    NotAContainer(NodeId),

    #[error("Inserting {child} into {parent} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Reference node {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("The document node cannot be moved")]
    DocumentNode,
}

impl DomError {
    pub fn hierarchy(parent: NodeId, child: NodeId) -> Self {
        Self::HierarchyRequest { parent, child }
    }
}
