use crate::errors::BuilderResult;
use serde::{Deserialize, Serialize};
use sitebuilder_editor::EditorConfig;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Pause before swapping in another page's content
    pub page_settle_ms: u64,

    /// Template used when neither a saved record nor the site id names one
    pub default_template: String,

    pub editor: EditorConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            page_settle_ms: 150,
            default_template: "modern-minimal".to_string(),
            editor: EditorConfig::default(),
        }
    }
}

impl BuilderConfig {
    pub fn from_json(source: &str) -> BuilderResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn with_page_settle_ms(mut self, page_settle_ms: u64) -> Self {
        self.page_settle_ms = page_settle_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_editor_config() {
        let config = BuilderConfig::from_json(
            r#"{ "default_template": "creative-pro", "editor": { "debounce_ms": 400 } }"#,
        )
        .unwrap();
        assert_eq!(config.page_settle(), Duration::from_millis(150));
        assert_eq!(config.default_template, "creative-pro");
        assert_eq!(config.editor.debounce_ms, 400);
        assert_eq!(config.editor.restore_guard_ms, 50);
    }

    #[test]
    fn test_invalid_config() {
        assert!(BuilderConfig::from_json(r#"{ "page_settle_ms": "soon" }"#).is_err());
    }
}
