//! # Sync Bridge
//!
//! Decides, from raw document activity, when a new snapshot is due.
//!
//! ```text
//! input / keydown / drop / dragend / mouseup ──┐
//!                                              ├──▶ debounce ──▶ capture due
//! style attribute mutations ── suppression ────┘
//! ```
//!
//! Every signal pushes the deadline out by the debounce window, so a burst
//! of edits collapses into one snapshot of the final state. Signals arriving
//! inside the guard window that follows an undo/redo are dropped.

use crate::config::EditorConfig;
use crate::markers;
use sitebuilder_dom::{Dom, MutationRecord};
use std::fmt;
use std::time::{Duration, Instant};

/// Raw activity that may mean the document changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    Input,
    KeyDown,
    DragEnd,
    Drop,
    MouseUp,
    StyleMutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub debounce: Duration,
    pub restore_guard: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            restore_guard: Duration::from_millis(50),
        }
    }
}

impl From<&EditorConfig> for SyncPolicy {
    fn from(config: &EditorConfig) -> Self {
        Self {
            debounce: config.debounce(),
            restore_guard: config.restore_guard(),
        }
    }
}

/// Whether style-triggered syncs should be held back for this document
pub type SuppressionPredicate = Box<dyn Fn(&Dom) -> bool + Send + Sync>;

pub struct SyncBridge {
    policy: SyncPolicy,
    deadline: Option<Instant>,
    guard_until: Option<Instant>,
    suppress: SuppressionPredicate,
}

impl SyncBridge {
    /// A bridge that suppresses style syncs while any element is edited inline
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            deadline: None,
            guard_until: None,
            suppress: Box::new(markers::any_editing),
        }
    }

    pub fn with_suppression(
        mut self,
        predicate: impl Fn(&Dom) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.suppress = Box::new(predicate);
        self
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Register a change signal. Returns whether a capture was scheduled.
    pub fn signal(&mut self, signal: SyncSignal, now: Instant) -> bool {
        if self.in_guard(now) {
            tracing::trace!(?signal, "signal ignored during restore guard");
            return false;
        }
        self.deadline = Some(now + self.policy.debounce);
        true
    }

    /// Drain `dom`'s mutation records and turn style changes into signals
    pub fn observe(&mut self, dom: &mut Dom, now: Instant) -> bool {
        let records = dom.take_mutations();
        self.observe_records(dom, &records, now)
    }

    fn observe_records(&mut self, dom: &Dom, records: &[MutationRecord], now: Instant) -> bool {
        if !records.iter().any(|record| record.is_attribute("style")) {
            return false;
        }
        if (self.suppress)(dom) {
            tracing::trace!("style mutation suppressed while editing");
            return false;
        }
        self.signal(SyncSignal::StyleMutation, now)
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Consume a due capture
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            return true;
        }
        false
    }

    /// Drop any scheduled capture
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Start the window after a programmatic document replacement during
    /// which signals are ignored
    pub fn arm_guard(&mut self, now: Instant) {
        self.deadline = None;
        self.guard_until = Some(now + self.policy.restore_guard);
    }

    pub fn in_guard(&self, now: Instant) -> bool {
        self.guard_until.is_some_and(|until| now < until)
    }

    pub fn reset(&mut self) {
        self.deadline = None;
        self.guard_until = None;
    }
}

impl fmt::Debug for SyncBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncBridge")
            .field("policy", &self.policy)
            .field("deadline", &self.deadline)
            .field("guard_until", &self.guard_until)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn bridge() -> SyncBridge {
        SyncBridge::new(SyncPolicy::default())
    }

    #[test]
    fn test_debounce_collapses_bursts() {
        let t0 = Instant::now();
        let mut bridge = bridge();

        bridge.signal(SyncSignal::Input, t0);
        bridge.signal(SyncSignal::Input, t0 + ms(200));
        assert!(!bridge.is_due(t0 + ms(300)));
        assert!(bridge.take_due(t0 + ms(450)));
        assert!(!bridge.is_pending());
        assert!(!bridge.take_due(t0 + ms(900)));
    }

    #[test]
    fn test_guard_drops_signals() {
        let t0 = Instant::now();
        let mut bridge = bridge();
        bridge.arm_guard(t0);

        assert!(!bridge.signal(SyncSignal::MouseUp, t0 + ms(10)));
        assert!(!bridge.is_pending());
        assert!(bridge.signal(SyncSignal::MouseUp, t0 + ms(50)));
    }

    #[test]
    fn test_style_mutations_schedule_capture() {
        let t0 = Instant::now();
        let mut dom = Dom::parse("<p>x</p>");
        let p = dom.element_children(dom.body().unwrap())[0];
        let mut bridge = bridge();

        dom.set_attribute(p, "title", "t").unwrap();
        assert!(!bridge.observe(&mut dom, t0));

        dom.set_style_property(p, "color", "red").unwrap();
        assert!(bridge.observe(&mut dom, t0));
        assert!(dom.pending_mutations().is_empty());
    }

    #[test]
    fn test_style_mutations_suppressed_while_editing() {
        let t0 = Instant::now();
        let mut dom = Dom::parse(r#"<p data-builder-editing="">x</p>"#);
        let p = dom.element_children(dom.body().unwrap())[0];
        let mut bridge = bridge();

        dom.set_style_property(p, "color", "red").unwrap();
        assert!(!bridge.observe(&mut dom, t0));
        assert!(!bridge.is_pending());
    }

    #[test]
    fn test_custom_suppression_predicate() {
        let t0 = Instant::now();
        let mut dom = Dom::parse("<p>x</p>");
        let p = dom.element_children(dom.body().unwrap())[0];
        let mut bridge = bridge().with_suppression(|_| true);

        dom.set_style_property(p, "color", "red").unwrap();
        assert!(!bridge.observe(&mut dom, t0));
        // explicit signals are never suppressed
        assert!(bridge.signal(SyncSignal::KeyDown, t0));
    }
}
