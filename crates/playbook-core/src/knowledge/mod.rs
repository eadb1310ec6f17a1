//! Knowledge tree and pointer resolution.
//!
//! The knowledge tree holds the recommendation records rules point at. It is
//! loaded once, validated, and read-only afterwards.

mod node;
mod resolver;

pub use node::{Node, IDENTITY_FIELDS};
pub use resolver::PointerResolver;

use serde_json::Value;

use crate::EngineError;

/// A validated knowledge tree.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeTree {
    root: Node,
}

impl KnowledgeTree {
    /// Wrap a root node. The root must be a mapping or a sequence.
    pub fn new(root: Node) -> Result<Self, EngineError> {
        if !root.is_container() {
            return Err(EngineError::InvalidKnowledgeRoot(root.kind()));
        }
        Ok(Self { root })
    }

    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        Self::new(Node::from(value))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Resolver over this tree, with an optional shorthand category.
    pub fn resolver<'a>(&'a self, shorthand: Option<&'a str>) -> PointerResolver<'a> {
        PointerResolver::new(&self.root).with_shorthand(shorthand)
    }
}

impl Default for KnowledgeTree {
    fn default() -> Self {
        Self {
            root: Node::Mapping(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_container_roots_accepted() {
        assert!(KnowledgeTree::from_value(json!({})).is_ok());
        assert!(KnowledgeTree::from_value(json!([])).is_ok());
    }

    #[test]
    fn test_scalar_roots_rejected() {
        for value in [json!(null), json!(1), json!("kb"), json!(true)] {
            assert!(matches!(
                KnowledgeTree::from_value(value),
                Err(EngineError::InvalidKnowledgeRoot(_))
            ));
        }
    }

    #[test]
    fn test_resolver_shorthand() {
        let tree = KnowledgeTree::from_value(json!({
            "phases": {"open": [{"id": "a"}]}
        }))
        .unwrap();
        assert_eq!(tree.resolver(Some("phases")).resolve("phases.open.a").len(), 1);
        assert_eq!(tree.resolver(None).resolve("phases.open.a").len(), 1);
        assert!(tree.resolver(Some("phases")).resolve("phases.open").is_empty());
    }
}
