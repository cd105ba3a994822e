//! # Session Events
//!
//! Panels, toolbars and the page reconciler learn about editor state changes
//! by subscribing to a broadcast channel instead of reaching into shared
//! globals.

use crate::selection::SelectedElement;
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    SelectionChanged { element: SelectedElement },
    SelectionCleared,
    SnapshotRecorded { cursor: usize, length: usize },
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// The live document was replaced wholesale (load, undo, redo)
    DocumentReplaced,
    PageSwitched { page: String },
    Saved { site_id: String, pages: Vec<String> },
    SaveFailed { message: String },
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

impl SessionEvent {
    pub fn notify(level: NotificationLevel, message: impl Into<String>) -> Self {
        SessionEvent::Notification {
            level,
            message: message.into(),
        }
    }
}

/// Sending half of the session's event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish to current subscribers; having none is fine
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
