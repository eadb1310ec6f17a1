//! Static checks over a playbook, and signal usage inventory.
//!
//! Lint never fails: every problem found is reported as a `LintIssue`, and
//! the engine would still run the playbook as written (skipping what it
//! cannot compile).

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::config::EngineConfig;
use crate::knowledge::{Node, PointerResolver};
use crate::playbook::{Playbook, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One problem found in a playbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintIssue {
    /// Rule the issue belongs to (`None` when the rule has no id)
    pub rule_id: Option<String>,
    pub severity: Severity,
    pub message: String,
}

impl LintIssue {
    fn error(rule: &Rule, message: impl Into<String>) -> Self {
        Self::new(rule, Severity::Error, message)
    }

    fn warning(rule: &Rule, message: impl Into<String>) -> Self {
        Self::new(rule, Severity::Warning, message)
    }

    fn new(rule: &Rule, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id: (!rule.id.is_empty()).then(|| rule.id.clone()),
            severity,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule_id {
            Some(id) => write!(f, "{} [{}]: {}", self.severity, id, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Check every rule of a playbook, in source order.
pub fn lint(playbook: &Playbook, config: &EngineConfig) -> Vec<LintIssue> {
    let root = Node::from(playbook.knowledge().clone());
    let resolver = PointerResolver::new(&root).with_shorthand(config.shorthand());

    let mut issues: Vec<LintIssue> = playbook
        .rules()
        .rejected()
        .iter()
        .map(|rejected| LintIssue {
            rule_id: rejected.id.clone(),
            severity: Severity::Error,
            message: format!("rule #{} could not be read: {}", rejected.index, rejected.reason),
        })
        .collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();

    for (index, rule) in playbook.rules().iter().enumerate() {
        if rule.id.is_empty() {
            issues.push(LintIssue::error(rule, format!("rule #{} has no id", index)));
        } else if !seen.insert(&rule.id) && reported.insert(&rule.id) {
            issues.push(LintIssue::error(rule, "duplicate rule id"));
        }

        match Condition::compile(&rule.condition) {
            Ok(condition) if condition.is_empty() => {
                issues.push(LintIssue::warning(rule, "empty condition never matches"));
            }
            Ok(_) => {}
            Err(e) => {
                issues.push(LintIssue::error(rule, format!("condition does not compile: {}", e)));
            }
        }

        if rule.fetch.is_empty() && rule.tone().is_none() {
            issues.push(LintIssue::warning(
                rule,
                "rule has no fetch pointers and no tone override",
            ));
        }

        for pointer in &rule.fetch {
            if resolver.resolve(pointer).is_empty() {
                issues.push(LintIssue::warning(
                    rule,
                    format!("pointer '{}' resolves to nothing", pointer),
                ));
            }
        }
    }

    issues
}

/// Rules that read one context signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalUsage {
    pub signal: String,
    /// In source order, without repeats
    pub rule_ids: Vec<String>,
}

/// Inventory of the signals read by a rule set.
///
/// Sorted by number of rules descending, then signal name. Conditions that
/// do not compile contribute nothing.
pub fn signal_usage<'a, I>(rules: I) -> Vec<SignalUsage>
where
    I: IntoIterator<Item = &'a Rule>,
{
    let mut usage: HashMap<String, Vec<String>> = HashMap::new();

    for rule in rules {
        let Ok(condition) = Condition::compile(&rule.condition) else {
            continue;
        };
        for signal in condition.signals() {
            let ids = usage.entry(signal.to_string()).or_default();
            if !ids.contains(&rule.id) {
                ids.push(rule.id.clone());
            }
        }
    }

    let mut usage: Vec<SignalUsage> = usage
        .into_iter()
        .map(|(signal, rule_ids)| SignalUsage { signal, rule_ids })
        .collect();
    usage.sort_by(|a, b| {
        b.rule_ids
            .len()
            .cmp(&a.rule_ids.len())
            .then_with(|| a.signal.cmp(&b.signal))
    });
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYBOOK: &str = r#"
ai_triggers:
  - id: "anxious"
    condition: "anxiety_rating >= 4"
    fetch: ["scripts.calm_opening"]
  - id: "anxious"
    condition: "anxiety_rating >= 4 AND negotiation_type == 'salary'"
    fetch: ["scripts.calm_opening"]
  - condition: "negotiation_type == 'salary'"
    tone_override: "firm"
  - id: "broken"
    condition: "(anxiety_rating > 2"
    fetch: ["scripts.calm_opening"]
  - id: "hollow"
    condition: ""
  - id: "dangling"
    condition: "deadline_type == 'hard'"
    fetch: ["scripts.nowhere", "tactics_by_phase.opening.missing"]
scripts:
  - id: "calm_opening"
    text: "Restate shared goals."
tactics_by_phase:
  opening: []
"#;

    fn issues_for(issues: &[LintIssue], id: Option<&str>) -> Vec<String> {
        issues
            .iter()
            .filter(|i| i.rule_id.as_deref() == id)
            .map(|i| i.message.clone())
            .collect()
    }

    #[test]
    fn test_lint_reports_each_problem() {
        let playbook = Playbook::from_yaml(PLAYBOOK).unwrap();
        let issues = lint(&playbook, &EngineConfig::default());

        assert_eq!(issues_for(&issues, Some("anxious")), vec!["duplicate rule id"]);
        assert_eq!(issues_for(&issues, None), vec!["rule #2 has no id"]);

        let broken = issues_for(&issues, Some("broken"));
        assert_eq!(broken.len(), 1);
        assert!(broken[0].starts_with("condition does not compile"));

        assert_eq!(
            issues_for(&issues, Some("hollow")),
            vec![
                "empty condition never matches",
                "rule has no fetch pointers and no tone override"
            ]
        );
        assert_eq!(issues_for(&issues, Some("dangling")).len(), 2);
    }

    #[test]
    fn test_lint_severities() {
        let playbook = Playbook::from_yaml(PLAYBOOK).unwrap();
        let errors = lint(&playbook, &EngineConfig::default())
            .into_iter()
            .filter(LintIssue::is_error)
            .count();
        // duplicate id, missing id, compile failure
        assert_eq!(errors, 3);
    }

    #[test]
    fn test_unreadable_rules_are_errors() {
        let json = r#"{
            "ai_triggers": [
                {"id": "ok", "condition": "a == 1", "fetch": ["tips.first"]},
                {"id": "weighted", "condition": "a == 2", "priority": "high"}
            ],
            "tips": [{"id": "first"}]
        }"#;
        let playbook = Playbook::from_json(json).unwrap();
        let issues = lint(&playbook, &EngineConfig::default());

        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].rule_id.as_deref(), Some("weighted"));
        assert!(issues[0].message.starts_with("rule #1 could not be read"));
    }

    #[test]
    fn test_clean_playbook() {
        let yaml = r#"
ai_triggers:
  - id: "ok"
    condition: "a == 1"
    fetch: ["tips.first"]
tips:
  - id: "first"
"#;
        let playbook = Playbook::from_yaml(yaml).unwrap();
        assert!(lint(&playbook, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_signal_usage_ordering() {
        let playbook = Playbook::from_yaml(PLAYBOOK).unwrap();
        let usage = signal_usage(playbook.rules());
        let summary: Vec<(&str, usize)> = usage
            .iter()
            .map(|u| (u.signal.as_str(), u.rule_ids.len()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("negotiation_type", 2),
                ("anxiety_rating", 1),
                ("deadline_type", 1),
            ]
        );
        // the duplicated id is listed once
        assert_eq!(usage[1].rule_ids, vec!["anxious"]);
    }

    #[test]
    fn test_issue_display() {
        let rule = Rule::new("r", "");
        let issue = LintIssue::warning(&rule, "empty condition never matches");
        assert_eq!(issue.to_string(), "warning [r]: empty condition never matches");
    }
}
