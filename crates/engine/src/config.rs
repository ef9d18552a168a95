//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use symbridge_core::{LanguageTag, TraversalLimits};

use crate::search::SearchLimits;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub traversal: TraversalLimits,
    pub search: SearchLimits,
    /// Languages never registered, even when the index supports them
    pub disabled_languages: Vec<LanguageTag>,
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("failed to load config {}", path.display()))
    }

    pub fn is_disabled(&self, language: &LanguageTag) -> bool {
        self.disabled_languages.contains(language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.search.default_limit, 25);
        assert_eq!(config.traversal.call_hierarchy_max_depth, 5);
    }

    #[test]
    fn test_partial_config() {
        let config = BridgeConfig::from_json(
            r#"{ "traversal": { "max_breadth": 10 }, "disabled_languages": ["Go"] }"#,
        )
        .unwrap();
        assert_eq!(config.traversal.max_breadth, 10);
        assert_eq!(config.traversal.type_hierarchy_depth, 100);
        assert!(config.is_disabled(&LanguageTag::new("go")));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "search": {{ "max_limit": 50 }} }}"#).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.search.max_limit, 50);
        assert_eq!(config.search.default_limit, 25);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let err = BridgeConfig::from_json("{ not json").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }
}
