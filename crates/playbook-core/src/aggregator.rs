//! Aggregator: folds rule activations into a single `MatchOutput`.
//!
//! Policy, applied per activation in order:
//! 1. Only matched rules contribute
//! 2. The rule id is recorded when its pointers fetched at least one item
//!    (or always, with `record_unfetched_matches`)
//! 3. Fetched items are appended to the recommendations
//! 4. A non-empty tone override is recorded whether or not anything was fetched

use crate::config::EngineConfig;
use crate::types::{ActivationState, MatchOutput, RuleActivation};

/// The Aggregator collects matched rules into the final output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    record_unfetched_matches: bool,
}

impl Aggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            record_unfetched_matches: config.record_unfetched_matches,
        }
    }

    /// Whether a match that fetched `fetched` items is recorded by id.
    pub fn records(&self, fetched: usize) -> bool {
        fetched > 0 || self.record_unfetched_matches
    }

    pub fn aggregate<'a, I>(&self, activations: I) -> MatchOutput
    where
        I: IntoIterator<Item = RuleActivation<'a>>,
    {
        let mut output = MatchOutput::default();

        for activation in activations {
            let ActivationState::Matched(items) = activation.state else {
                continue;
            };

            if self.records(items.len()) {
                output.matches.push(activation.rule.id.clone());
            }
            output
                .recommendations
                .extend(items.into_iter().cloned());

            if let Some(tone) = activation.rule.tone() {
                output.tone_overrides.push(tone.to_string());
            }
        }

        output
    }
}
