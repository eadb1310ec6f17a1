//! Engine configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default key under which a playbook document stores its rule list.
pub const DEFAULT_RULES_KEY: &str = "ai_triggers";

/// Default category that enables the three-segment pointer shorthand.
pub const DEFAULT_SHORTHAND_CATEGORY: &str = "tactics_by_phase";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Configuration for rule activation and pointer resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record a matched rule's id even when its pointers fetched nothing
    pub record_unfetched_matches: bool,

    /// First pointer segment that triggers `<category>.<group>.<id>` lookup
    /// (`null` disables the shorthand)
    pub shorthand_category: Option<String>,

    /// Key holding the rule list inside a playbook document
    pub rules_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_unfetched_matches: false,
            shorthand_category: Some(DEFAULT_SHORTHAND_CATEGORY.to_string()),
            rules_key: DEFAULT_RULES_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, parsing `.json` as JSON and anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        if is_json_path(path) {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    pub fn shorthand(&self) -> Option<&str> {
        self.shorthand_category.as_deref()
    }
}

/// Whether a path names a JSON document (by extension, case-insensitive).
pub fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
