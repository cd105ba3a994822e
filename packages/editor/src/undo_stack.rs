//! # Undo/Redo Stack
//!
//! Linear history of whole-document snapshots with a cursor.
//!
//! ## Design
//!
//! - A snapshot is the complete serialized document, never a diff
//! - Recording the same string as the last recorded one is a no-op
//! - Recording after an undo truncates the redo tail
//! - Undo/redo only move the cursor and hand back the snapshot to restore;
//!   replacing the live document is the session's job
//!
//! ## Example
//!
//! ```rust
//! use sitebuilder_editor::{Snapshot, UndoStack};
//!
//! let mut stack = UndoStack::new();
//! stack.record(Snapshot::from("<p>a</p>"));
//! stack.record(Snapshot::from("<p>b</p>"));
//!
//! assert_eq!(stack.undo().unwrap().as_str(), "<p>a</p>");
//! assert_eq!(stack.redo().unwrap().as_str(), "<p>b</p>");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A complete serialized HTML document at one history point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Snapshot {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Snapshot {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for Snapshot {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot history for one page
#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Oldest first
    snapshots: Vec<Snapshot>,

    /// Index of the current snapshot; meaningless while `snapshots` is empty
    cursor: usize,

    /// Last snapshot recorded or restored, used for the duplicate check
    last_recorded: Option<Snapshot>,

    /// Maximum number of snapshots kept (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create an unbounded stack
    pub fn new() -> Self {
        Self::with_max_levels(0)
    }

    /// Create a stack that drops its oldest snapshots beyond `max_levels`
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            last_recorded: None,
            max_levels,
        }
    }

    /// Drop all history and start over from `initial` (cursor 0)
    pub fn reset(&mut self, initial: Snapshot) {
        self.snapshots = vec![initial.clone()];
        self.cursor = 0;
        self.last_recorded = Some(initial);
    }

    /// Append a snapshot, truncating any redo tail.
    ///
    /// Returns `false` when `snapshot` equals the last recorded one.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        if self.last_recorded.as_ref() == Some(&snapshot) {
            return false;
        }

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot.clone());

        if self.max_levels > 0 && self.snapshots.len() > self.max_levels {
            let excess = self.snapshots.len() - self.max_levels;
            self.snapshots.drain(..excess);
        }

        self.cursor = self.snapshots.len() - 1;
        self.last_recorded = Some(snapshot);
        true
    }

    /// Step back one snapshot and return it
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.restore_current()
    }

    /// Step forward one snapshot and return it
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.restore_current()
    }

    fn restore_current(&mut self) -> Option<Snapshot> {
        let snapshot = self.snapshots.get(self.cursor)?.clone();
        self.last_recorded = Some(snapshot.clone());
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor < self.snapshots.len() - 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.cursor)
    }

    pub fn last_recorded(&self) -> Option<&Snapshot> {
        self.last_recorded.as_ref()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
        self.last_recorded = None;
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
