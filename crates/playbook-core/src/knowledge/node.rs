//! Knowledge tree nodes.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Fields that identify an item when a pointer segment is not a direct key.
pub const IDENTITY_FIELDS: [&str; 3] = ["id", "name", "title"];

/// One node of a knowledge tree.
///
/// Mappings keep their document key order, which is the order searched when
/// a pointer segment is matched by identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
    /// Scalar value (string, number, bool, or null)
    Leaf(Value),
}

impl Node {
    /// Direct child of a mapping by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Node::Sequence(_) | Node::Leaf(_) => None,
        }
    }

    /// Mapping values or sequence items; nothing for a leaf.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Node> + '_> {
        match self {
            Node::Mapping(entries) => Box::new(entries.iter().map(|(_, v)| v)),
            Node::Sequence(items) => Box::new(items.iter()),
            Node::Leaf(_) => Box::new(std::iter::empty()),
        }
    }

    /// String value of a mapping field.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Node::Leaf(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    /// Whether this is a mapping whose `id`, `name`, or `title` equals `segment`.
    pub fn is_identified_by(&self, segment: &str) -> bool {
        IDENTITY_FIELDS
            .iter()
            .any(|field| self.field_str(field) == Some(segment))
    }

    /// The first of `id`, `name`, `title` present on this node.
    pub fn identity(&self) -> Option<&str> {
        IDENTITY_FIELDS.iter().find_map(|field| self.field_str(field))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Leaf(Value::Null))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Mapping(_) | Node::Sequence(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Leaf(Value::Null) => "null",
            Node::Leaf(Value::Bool(_)) => "boolean",
            Node::Leaf(Value::Number(_)) => "number",
            Node::Leaf(_) => "string",
        }
    }

    /// Convert back to a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            Node::Sequence(items) => Value::Array(items.iter().map(Node::to_value).collect()),
            Node::Leaf(value) => value.clone(),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                Node::Mapping(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            scalar => Node::Leaf(scalar),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Sequence(items) => serializer.collect_seq(items),
            Node::Leaf(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Node::from)
    }
}
