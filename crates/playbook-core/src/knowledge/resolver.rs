//! Pointer resolution.
//!
//! A pointer is a dotted path such as `tactics.anchoring.open_high`. Each
//! segment is resolved against the current node:
//!
//! | Current node | Segment resolves to |
//! |--------------|---------------------|
//! | mapping with that key | the key's value |
//! | mapping without it | first item one level down whose `id`/`name`/`title` matches |
//! | sequence | first item whose `id`/`name`/`title` matches |
//! | leaf | nothing |
//!
//! Resolution never fails: an unresolvable pointer yields no items.

use tracing::debug;

use super::node::Node;

/// Resolves pointers against one knowledge tree root.
#[derive(Debug, Clone, Copy)]
pub struct PointerResolver<'a> {
    root: &'a Node,
    shorthand: Option<&'a str>,
}

impl<'a> PointerResolver<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self {
            root,
            shorthand: None,
        }
    }

    /// Enable the `<category>.<group>.<id>` shorthand for one category.
    pub fn with_shorthand(mut self, category: Option<&'a str>) -> Self {
        self.shorthand = category;
        self
    }

    /// Resolve a pointer into the items it addresses.
    ///
    /// A terminal sequence yields its items; any other terminal node is
    /// returned as a single item.
    pub fn resolve(&self, pointer: &str) -> Vec<&'a Node> {
        if pointer.is_empty() {
            return Vec::new();
        }

        let segments: Vec<&str> = pointer.split('.').collect();
        let terminal = match self.shorthand {
            Some(category) if segments[0] == category => self.resolve_shorthand(&segments),
            _ => self.walk(&segments),
        };

        match terminal {
            Some(Node::Sequence(items)) => items.iter().collect(),
            Some(node) => vec![node],
            None => {
                debug!(pointer, "pointer did not resolve");
                Vec::new()
            }
        }
    }

    /// General segment-by-segment descent.
    fn walk(&self, segments: &[&str]) -> Option<&'a Node> {
        segments
            .iter()
            .try_fold(self.root, |node, segment| step(node, segment))
    }

    /// Direct two-key lookup followed by an `id` scan.
    fn resolve_shorthand(&self, segments: &[&str]) -> Option<&'a Node> {
        let [category, group, item_id] = segments else {
            return None;
        };

        self.root
            .get(category)?
            .get(group)?
            .children()
            .find(|item| item.field_str("id") == Some(*item_id))
    }
}

fn step<'n>(node: &'n Node, segment: &str) -> Option<&'n Node> {
    let next = match node {
        Node::Mapping(_) => node
            .get(segment)
            .or_else(|| node.children().find_map(|child| find_identified(child, segment))),
        Node::Sequence(_) => find_identified(node, segment),
        Node::Leaf(_) => None,
    }?;

    (!next.is_null()).then_some(next)
}

/// First member of a container identified by `segment`.
fn find_identified<'n>(container: &'n Node, segment: &str) -> Option<&'n Node> {
    container
        .children()
        .find(|item| item.is_identified_by(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Node {
        Node::from(json!({
            "cat": [
                {"id": "x", "text": "foo"},
                {"name": "named", "text": "bar"}
            ],
            "scripts": {
                "openers": [
                    {"id": "warm", "text": "Thanks for the time."},
                    {"id": "direct", "text": "Let's talk numbers."}
                ],
                "by_persona": {
                    "fox": {"title": "Fox playbook", "steps": ["a", "b"]}
                }
            },
            "tactics_by_phase": {
                "opening": [
                    {"id": "anchor", "text": "Anchor first."}
                ]
            },
            "empty": null,
            "motto": "Be prepared"
        }))
    }

    fn resolve(root: &Node, pointer: &str) -> Vec<serde_json::Value> {
        PointerResolver::new(root)
            .with_shorthand(Some("tactics_by_phase"))
            .resolve(pointer)
            .into_iter()
            .map(Node::to_value)
            .collect()
    }

    #[test]
    fn test_sequence_item_by_id() {
        let root = tree();
        assert_eq!(resolve(&root, "cat.x"), vec![json!({"id": "x", "text": "foo"})]);
        assert!(resolve(&root, "cat.missing").is_empty());
    }

    #[test]
    fn test_sequence_item_by_name() {
        let root = tree();
        assert_eq!(
            resolve(&root, "cat.named"),
            vec![json!({"name": "named", "text": "bar"})]
        );
    }

    #[test]
    fn test_terminal_sequence_is_flattened() {
        let root = tree();
        assert_eq!(resolve(&root, "scripts.openers").len(), 2);
        assert_eq!(
            resolve(&root, "scripts.by_persona.fox.steps"),
            vec![json!("a"), json!("b")]
        );
    }

    #[test]
    fn test_mapping_searches_sequence_valued_entries() {
        let root = tree();
        // "direct" is not a key of "scripts"; found inside scripts.openers
        assert_eq!(
            resolve(&root, "scripts.direct"),
            vec![json!({"id": "direct", "text": "Let's talk numbers."})]
        );
    }

    #[test]
    fn test_mapping_searches_mapping_valued_entries() {
        let root = tree();
        // "Fox playbook" is the title of a value inside scripts.by_persona
        let items = resolve(&root, "scripts.Fox playbook");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], json!("Fox playbook"));
    }

    #[test]
    fn test_root_level_identity_search() {
        let root = tree();
        assert_eq!(resolve(&root, "x"), vec![json!({"id": "x", "text": "foo"})]);
    }

    #[test]
    fn test_leaf_terminal_is_wrapped() {
        let root = tree();
        assert_eq!(resolve(&root, "motto"), vec![json!("Be prepared")]);
    }

    #[test]
    fn test_descending_past_leaf_or_null() {
        let root = tree();
        assert!(resolve(&root, "motto.more").is_empty());
        assert!(resolve(&root, "empty").is_empty());
        assert!(resolve(&root, "").is_empty());
    }

    #[test]
    fn test_shorthand_pointer() {
        let root = tree();
        assert_eq!(
            resolve(&root, "tactics_by_phase.opening.anchor"),
            vec![json!({"id": "anchor", "text": "Anchor first."})]
        );
        assert!(resolve(&root, "tactics_by_phase.opening.missing").is_empty());
        assert!(resolve(&root, "tactics_by_phase.closing.anchor").is_empty());
    }

    #[test]
    fn test_shorthand_requires_three_segments() {
        let root = tree();
        assert!(resolve(&root, "tactics_by_phase.opening").is_empty());
        assert!(resolve(&root, "tactics_by_phase.opening.anchor.text").is_empty());
    }

    #[test]
    fn test_shorthand_disabled_uses_general_walk() {
        let root = tree();
        let items = PointerResolver::new(&root).resolve("tactics_by_phase.opening");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].field_str("id"), Some("anchor"));
    }

    #[test]
    fn test_sequence_root() {
        let root = Node::from(json!([{"id": "a"}, {"id": "b", "tips": [1, 2]}]));
        let resolver = PointerResolver::new(&root);
        assert_eq!(resolver.resolve("b.tips").len(), 2);
        assert!(resolver.resolve("c").is_empty());
    }
}
