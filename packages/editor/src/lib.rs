//! # Site Builder Editor
//!
//! Live HTML editing engine for the site builder canvas.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ injector: raw HTML → interactive document   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: canvas events → DOM edits          │
//! │  - selection / hover                        │
//! │  - inline edit state machine                │
//! │  - drag reorder engine                      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sync: mutations → debounced capture         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ undo_stack: snapshot history + cursor       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are whole documents**: undo/redo replace the live document
//! 2. **History is marker-free**: selection, hover, editing and drag markers
//!    never reach a snapshot
//! 3. **One owner**: only the session mutates the live document
//! 4. **Handlers never fail loudly**: errors inside event handlers are logged
//!    and swallowed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sitebuilder_editor::{CanvasEvent, EditorSession};
//!
//! let mut session = EditorSession::default();
//! session.load(&template_html)?;
//!
//! // host loop
//! session.handle_event(CanvasEvent::Click { target }, Instant::now());
//! session.tick(Instant::now());
//!
//! // toolbar
//! session.undo(Instant::now());
//! let html = session.export_clean()?;
//! ```

pub mod canvas;
mod config;
pub mod drag;
mod errors;
mod events;
pub mod injector;
pub mod inline_edit;
pub mod markers;
pub mod selection;
mod session;
pub mod sync;
mod undo_stack;

pub use canvas::{Behaviors, Canvas, CanvasEvent, EventResponse, FixedLayout, HandlerTable, Layout};
pub use config::EditorConfig;
pub use drag::{DragSession, DragState, DropOutcome, DropPosition, DropRejection};
pub use errors::EditorError;
pub use events::{EventBus, NotificationLevel, SessionEvent};
pub use injector::Injector;
pub use selection::SelectedElement;
pub use session::{EditorSession, ElementUpdate};
pub use sync::{SyncBridge, SyncPolicy, SyncSignal};
pub use undo_stack::{Snapshot, UndoStack};

// Re-export the document model for hosts
pub use sitebuilder_dom::{Dom, NodeId, Point, Rect};
