//! Rule activation.
//!
//! The engine owns a rule set and a knowledge tree, both immutable after
//! construction. Conditions are compiled once, up front; a rule whose
//! condition fails to compile stays in the set and is skipped on every pass.

use std::cmp::Reverse;

use tracing::{debug, warn};

use crate::aggregator::Aggregator;
use crate::condition::{Condition, ConditionError};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::knowledge::{KnowledgeTree, Node};
use crate::playbook::{Playbook, Rule};
use crate::types::{ActivationState, MatchOutput, RuleActivation, RuleOutcome, RuleTrace};
use crate::EngineError;

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    condition: Result<Condition, ConditionError>,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Self {
        let condition = Condition::compile(&rule.condition);
        if let Err(e) = &condition {
            warn!(rule = %rule.id, error = %e, "rule condition does not compile; rule will be skipped");
        }
        Self { rule, condition }
    }
}

/// The rules engine.
#[derive(Debug, Clone)]
pub struct Engine {
    /// In activation order: descending priority, ties in source order
    rules: Vec<CompiledRule>,
    knowledge: KnowledgeTree,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new(rules: Vec<Rule>, knowledge: KnowledgeTree) -> Self {
        Self::with_config(rules, knowledge, EngineConfig::default())
    }

    pub fn with_config(rules: Vec<Rule>, knowledge: KnowledgeTree, config: EngineConfig) -> Self {
        let mut rules: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::compile).collect();
        // sort_by_key is stable
        rules.sort_by_key(|compiled| Reverse(compiled.rule.priority));

        debug!(rules = rules.len(), "engine constructed");

        Self {
            rules,
            knowledge,
            config,
        }
    }

    /// Build an engine from a playbook: its rules, and the whole document as
    /// the knowledge tree.
    pub fn from_playbook(playbook: Playbook, config: EngineConfig) -> Result<Self, EngineError> {
        let (rules, knowledge) = playbook.into_parts();
        let knowledge = KnowledgeTree::from_value(knowledge)?;
        Ok(Self::with_config(rules.into_rules(), knowledge, config))
    }

    /// Evaluate every rule against `context` and aggregate the matches.
    ///
    /// Never fails: malformed rules are skipped and unresolvable pointers
    /// fetch nothing.
    pub fn evaluate_all(&self, context: &Context) -> MatchOutput {
        let output = Aggregator::new(&self.config).aggregate(self.activate(context));
        debug!(
            matches = output.matches.len(),
            recommendations = output.recommendations.len(),
            "evaluation complete"
        );
        output
    }

    /// Activation state of every rule, in activation order.
    pub fn activate(&self, context: &Context) -> Vec<RuleActivation<'_>> {
        self.rules
            .iter()
            .map(|compiled| RuleActivation {
                rule: &compiled.rule,
                state: self.activate_rule(compiled, context),
            })
            .collect()
    }

    /// Per-rule outcomes of an evaluation, in activation order.
    pub fn explain(&self, context: &Context) -> Vec<RuleTrace> {
        let aggregator = Aggregator::new(&self.config);

        self.activate(context)
            .into_iter()
            .map(|activation| {
                let outcome = match activation.state {
                    ActivationState::Matched(items) => RuleOutcome::Matched {
                        fetched: items.len(),
                        recorded: aggregator.records(items.len()),
                    },
                    ActivationState::NotMatched => RuleOutcome::NotMatched,
                    ActivationState::Skipped(e) => RuleOutcome::Skipped {
                        reason: e.to_string(),
                    },
                };
                RuleTrace {
                    rule_id: activation.rule.id.clone(),
                    priority: activation.rule.priority,
                    outcome,
                }
            })
            .collect()
    }

    fn activate_rule<'a>(&'a self, compiled: &CompiledRule, context: &Context) -> ActivationState<'a> {
        let condition = match &compiled.condition {
            Ok(condition) => condition,
            Err(e) => return ActivationState::Skipped(e.clone()),
        };

        match condition.evaluate(context) {
            Ok(true) => {
                let items: Vec<&Node> = compiled
                    .rule
                    .fetch
                    .iter()
                    .flat_map(|pointer| self.resolve(pointer))
                    .collect();
                debug!(rule = %compiled.rule.id, fetched = items.len(), "rule matched");
                ActivationState::Matched(items)
            }
            Ok(false) => {
                debug!(rule = %compiled.rule.id, "rule did not match");
                ActivationState::NotMatched
            }
            Err(e) => {
                warn!(rule = %compiled.rule.id, error = %e, "rule evaluation failed; skipping");
                ActivationState::Skipped(e)
            }
        }
    }

    /// Resolve one pointer against the knowledge tree.
    pub fn resolve(&self, pointer: &str) -> Vec<&Node> {
        self.knowledge.resolver(self.config.shorthand()).resolve(pointer)
    }

    /// Rules in activation order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    pub fn knowledge(&self) -> &KnowledgeTree {
        &self.knowledge
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
