//! # Site Builder DOM
//!
//! The document model behind the editing canvas.
//!
//! ```text
//! raw HTML ──tokenizer──▶ tokens ──parser──▶ Dom ──serializer──▶ HTML snapshot
//!                                             │
//!                                             └── MutationRecord log
//! ```
//!
//! Templates are arbitrary, unvalidated HTML, so parsing never fails and
//! always yields a complete `<html><head/><body/></html>` document.

pub mod dom;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod style;
pub mod tokenizer;

pub use dom::{Dom, MutationKind, MutationRecord};
pub use error::{DomError, DomResult};
pub use geometry::{Point, Rect};
pub use node::{Attribute, ElementData, Node, NodeData, NodeId};
pub use parser::{parse, Parser};
pub use serializer::serialize;
pub use tokenizer::{tokenize, Token};
