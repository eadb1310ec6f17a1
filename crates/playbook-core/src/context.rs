//! Situational context: the signals a condition is evaluated against.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A nested mapping from signal name to value.
///
/// Supplied fresh per evaluation and never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a top-level signal.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parse a context from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a context from a YAML mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Resolve a dotted signal path.
    ///
    /// A top-level key equal to the whole path wins; otherwise each segment
    /// descends one mapping level. Any missing segment yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.0.get(first)?, |current, segment| {
            current.as_object()?.get(segment)
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
