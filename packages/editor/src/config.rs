//! # Editor Configuration
//!
//! Timing windows and visual constants of the editing engine. Every field
//! has a default, so a partial JSON object is a valid config.

use crate::EditorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiescence window after the last change signal before a snapshot is taken
    pub debounce_ms: u64,

    /// How long after an undo/redo the bridge ignores change signals
    pub restore_guard_ms: u64,

    /// Vertical distance between an element's top edge and its toolbar anchor
    pub toolbar_offset: f64,

    /// Maximum history length (0 = unlimited)
    pub max_history: usize,

    /// Border applied to the floating drag proxy
    pub proxy_border: String,

    /// Opacity of an element while it is being dragged
    pub lifted_opacity: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            restore_guard_ms: 50,
            toolbar_offset: 60.0,
            max_history: 0,
            proxy_border: "2px solid #3b82f6".to_string(),
            lifted_opacity: "0.7".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn restore_guard(&self) -> Duration {
        Duration::from_millis(self.restore_guard_ms)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{ "debounce_ms": 300 }"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.restore_guard(), Duration::from_millis(50));
        assert_eq!(config.lifted_opacity, "0.7");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = EditorConfig::from_json("{ debounce_ms: }").unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }
}
