//! Result types shared by the engine, the aggregator, and callers.

use serde::{Deserialize, Serialize};

use crate::condition::ConditionError;
use crate::knowledge::Node;
use crate::playbook::Rule;

/// The aggregated result of one evaluation pass.
///
/// All three lists are in activation order: descending priority, ties in
/// source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutput {
    /// Ids of matched rules
    pub matches: Vec<String>,

    /// Fetched knowledge items, concatenated across rules
    pub recommendations: Vec<Node>,

    /// Tone labels of matched rules
    pub tone_overrides: Vec<String>,
}

impl MatchOutput {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.recommendations.is_empty() && self.tone_overrides.is_empty()
    }
}

/// What happened to one rule during activation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationState<'a> {
    /// Condition held; the items its pointers resolved to, in pointer order
    Matched(Vec<&'a Node>),
    NotMatched,
    /// Condition could not be compiled or evaluated
    Skipped(ConditionError),
}

/// A rule paired with its activation state, borrowed from the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleActivation<'a> {
    pub rule: &'a Rule,
    pub state: ActivationState<'a>,
}

impl RuleActivation<'_> {
    pub fn is_match(&self) -> bool {
        matches!(self.state, ActivationState::Matched(_))
    }
}

/// Owned per-rule trace, for explaining an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrace {
    pub rule_id: String,
    pub priority: i64,
    pub outcome: RuleOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RuleOutcome {
    Matched {
        /// Number of items fetched
        fetched: usize,
        /// Whether the rule id lands in `MatchOutput::matches`
        recorded: bool,
    },
    NotMatched,
    Skipped {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_output_serialization() {
        let output = MatchOutput {
            matches: vec!["a".to_string()],
            recommendations: vec![Node::from(json!({"id": "x", "text": "t"}))],
            tone_overrides: vec![],
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(
            value,
            json!({
                "matches": ["a"],
                "recommendations": [{"id": "x", "text": "t"}],
                "tone_overrides": []
            })
        );
    }

    #[test]
    fn test_empty_output() {
        assert!(MatchOutput::default().is_empty());
    }

    #[test]
    fn test_outcome_tagging() {
        let matched = RuleOutcome::Matched {
            fetched: 2,
            recorded: true,
        };
        assert_eq!(
            serde_json::to_value(&matched).unwrap(),
            json!({"result": "matched", "fetched": 2, "recorded": true})
        );
        assert_eq!(
            serde_json::to_value(RuleOutcome::NotMatched).unwrap(),
            json!({"result": "not_matched"})
        );
    }
}
