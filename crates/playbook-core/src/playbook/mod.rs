//! Playbook documents: rule sets and the knowledge they point into.
//!
//! A playbook is structured data (YAML or JSON) whose root mapping holds the
//! knowledge tree, with the rule list stored under one key of that mapping.
//! This module handles parsing playbooks and validating rule lists against
//! the embedded JSON Schema.

mod parser;
mod schema;

pub use parser::{
    parse_document, read_document, Playbook, PlaybookError, RejectedRule, Rule, RuleSet,
};
pub use schema::{is_valid_rules, validate_rules_schema};
