//! Playbook parsing from YAML/JSON.

use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::config::{is_json_path, DEFAULT_RULES_KEY};

/// Errors that can occur when parsing playbooks.
#[derive(Error, Debug)]
pub enum PlaybookError {
    #[error("Failed to read playbook file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Playbook validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// A rule: when `condition` holds, fetch the items behind `fetch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Unique identifier (e.g., "anxious_salary")
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,

    /// Condition expression; empty never matches
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition: String,

    /// Higher priorities are tested and collected first
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: i64,

    /// Knowledge pointers, resolved in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub fetch: Vec<String>,

    /// Label for downstream rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_override: Option<String>,
}

impl Rule {
    pub fn new(id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            condition: condition.into(),
            priority: 0,
            fetch: Vec::new(),
            tone_override: None,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_fetch<I, S>(mut self, pointers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = pointers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tone_override(mut self, tone: impl Into<String>) -> Self {
        self.tone_override = Some(tone.into());
        self
    }

    /// The tone override, if set and non-empty.
    pub fn tone(&self) -> Option<&str> {
        self.tone_override.as_deref().filter(|t| !t.is_empty())
    }
}

/// Priorities may be written as integers, floats, or numeric strings;
/// `null` is the default.
fn deserialize_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid priority: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid priority: {:?}", s))),
        other => Err(D::Error::custom(format!("invalid priority: {}", other))),
    }
}

/// Scalar ids are kept as text; `null` is the empty id.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Ok(scalar.to_string()),
        other => Err(D::Error::custom(format!("invalid rule id: {}", other))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A rule entry that could not be read and was left out of its rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRule {
    /// Position in the source list
    pub index: usize,
    /// The entry's `id`, when it has a readable one
    pub id: Option<String>,
    pub reason: String,
}

/// An ordered list of rules, as written in the source document.
///
/// Entries that cannot be read as rules are left out and kept in
/// [`RuleSet::rejected`], so one bad entry never costs the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
    #[serde(skip)]
    rejected: Vec<RejectedRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            rejected: Vec::new(),
        }
    }

    /// Read each entry of a rule list on its own.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let mut set = Self::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry
                .get("id")
                .and_then(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(_) | Value::Bool(_) => Some(id.to_string()),
                    _ => None,
                })
                .filter(|id| !id.is_empty());

            match serde_json::from_value::<Rule>(entry) {
                Ok(rule) => set.rules.push(rule),
                Err(e) => {
                    warn!(index, id = ?id, error = %e, "skipping unreadable rule");
                    set.rejected.push(RejectedRule {
                        index,
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        set
    }

    /// Extract rules from a document that is either a bare list of rules or
    /// a mapping holding the list under `rules_key`.
    pub fn from_value(value: Value, rules_key: &str) -> Result<Self, PlaybookError> {
        match value {
            Value::Array(entries) => Ok(Self::from_entries(entries)),
            Value::Object(mut map) => match map.remove(rules_key) {
                Some(Value::Null) | None => Err(PlaybookError::MissingField(rules_key.to_string())),
                Some(Value::Array(entries)) => Ok(Self::from_entries(entries)),
                Some(_) => Err(PlaybookError::ValidationError(format!(
                    "'{}' must be a list of rules",
                    rules_key
                ))),
            },
            _ => Err(PlaybookError::ValidationError(
                "rule document must be a list or a mapping".to_string(),
            )),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PlaybookError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value, DEFAULT_RULES_KEY)
    }

    pub fn from_json(json: &str) -> Result<Self, PlaybookError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value, DEFAULT_RULES_KEY)
    }

    /// Load from a file, parsing `.json` as JSON and anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>, rules_key: &str) -> Result<Self, PlaybookError> {
        Self::from_value(read_document(path)?, rules_key)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Entries left out because they could not be read.
    pub fn rejected(&self) -> &[RejectedRule] {
        &self.rejected
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// A playbook: its rules plus the knowledge tree they point into.
#[derive(Debug, Clone, PartialEq)]
pub struct Playbook {
    rules: RuleSet,
    knowledge: Value,
}

impl Playbook {
    /// Build a playbook from a parsed document.
    ///
    /// The whole document is the knowledge tree. Rules are read from
    /// `rules_key`; a document without that key has no rules.
    pub fn from_value(value: Value, rules_key: &str) -> Result<Self, PlaybookError> {
        let Value::Object(map) = &value else {
            return Err(PlaybookError::ValidationError(
                "playbook root must be a mapping".to_string(),
            ));
        };

        let rules = match map.get(rules_key) {
            Some(Value::Null) | None => RuleSet::default(),
            Some(Value::Array(entries)) => RuleSet::from_entries(entries.clone()),
            Some(_) => {
                return Err(PlaybookError::ValidationError(format!(
                    "'{}' must be a list of rules",
                    rules_key
                )))
            }
        };

        Ok(Self {
            rules,
            knowledge: value,
        })
    }

    /// Parse a playbook from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlaybookError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value, DEFAULT_RULES_KEY)
    }

    /// Parse a playbook from JSON string.
    pub fn from_json(json: &str) -> Result<Self, PlaybookError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value, DEFAULT_RULES_KEY)
    }

    /// Parse a playbook from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PlaybookError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a playbook from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlaybookError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load from a file, parsing `.json` as JSON and anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>, rules_key: &str) -> Result<Self, PlaybookError> {
        Self::from_value(read_document(path)?, rules_key)
    }

    /// Replace the rules, keeping the knowledge tree.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn knowledge(&self) -> &Value {
        &self.knowledge
    }

    pub fn into_parts(self) -> (RuleSet, Value) {
        (self.rules, self.knowledge)
    }
}

/// Read a document from disk: `.json` files as JSON, anything else as YAML.
pub fn read_document(path: impl AsRef<Path>) -> Result<Value, PlaybookError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_document(&contents, is_json_path(path))
}

/// Parse document text as JSON, or as YAML (a superset of JSON).
pub fn parse_document(contents: &str, json: bool) -> Result<Value, PlaybookError> {
    if json {
        Ok(serde_json::from_str(contents)?)
    } else {
        Ok(serde_yaml::from_str(contents)?)
    }
}
