//! # playbook-core
//!
//! Deterministic rule matching over a situational context.
//!
//! This crate decides which pieces of prewritten advisory content apply to a
//! context:
//! - Which rules hold for these signals?
//! - In what order do they apply?
//! - What knowledge items do they point at?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same context always produces the same output
//! 2. **Isolated failures**: A malformed rule is skipped, never fatal
//! 3. **Read-only**: Rules and knowledge are immutable after construction
//! 4. **Thread-safe**: An [`Engine`] can be shared across threads without locking
//!
//! ## Example
//!
//! ```rust,ignore
//! use playbook_core::{Context, Engine, EngineConfig, Playbook};
//!
//! let playbook = Playbook::from_yaml_file("playbook.yaml")?;
//! let engine = Engine::from_playbook(playbook, EngineConfig::default())?;
//!
//! let context = Context::new()
//!     .with("negotiation_type", "salary")
//!     .with("anxiety_rating", 4);
//! let output = engine.evaluate_all(&context);
//!
//! for id in &output.matches {
//!     println!("matched: {}", id);
//! }
//! ```

pub mod aggregator;
pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod knowledge;
pub mod lint;
pub mod playbook;
pub mod types;

// Re-export main types at crate root
pub use aggregator::Aggregator;
pub use condition::{Comparator, Comparison, Condition, ConditionError, Literal, LogicalOp, Token};
pub use config::{ConfigError, EngineConfig};
pub use context::Context;
pub use engine::Engine;
pub use knowledge::{KnowledgeTree, Node, PointerResolver};
pub use lint::{lint, signal_usage, LintIssue, Severity, SignalUsage};
pub use playbook::{Playbook, PlaybookError, RejectedRule, Rule, RuleSet};
pub use types::{ActivationState, MatchOutput, RuleActivation, RuleOutcome, RuleTrace};

use thiserror::Error;

/// Errors that can occur while constructing an engine.
///
/// Evaluation itself never fails; these are raised once, up front.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Playbook error: {0}")]
    Playbook(#[from] PlaybookError),

    #[error("Knowledge tree root must be a mapping or a sequence, found {0}")]
    InvalidKnowledgeRoot(&'static str),
}
