//! Error types for the editor

use sitebuilder_dom::{DomError, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid editor config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Rendering surface is not accessible")]
    SurfaceUnavailable,

    #[error("No element is selected")]
    NothingSelected,

    #[error("Selected element {0} is no longer in the document")]
    DetachedSelection(NodeId),
}
