//! Condition expressions.
//!
//! A condition is a flat boolean combination of comparisons over context
//! signals, for example:
//!
//! ```text
//! negotiation_type == 'salary' AND NOT (persona.type in ['fox', 'friend'])
//! ```
//!
//! Compilation runs in two stages:
//! 1. [`tokenize`] scans the text into [`Token`]s
//! 2. [`to_postfix`] reorders them with the shunting-yard algorithm
//!
//! The resulting [`Condition`] holds the postfix program, which
//! [`evaluate_postfix`] runs against a [`Context`] with a boolean stack.

mod eval;
mod parser;
mod token;

pub use eval::{compare, evaluate_postfix};
pub use parser::to_postfix;
pub use token::{tokenize, Comparator, Comparison, Literal, LogicalOp, Token};

use thiserror::Error;

use crate::context::Context;

/// Errors raised while compiling or running a condition.
///
/// These are always local to one rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Unexpected input at byte {position}: {snippet:?}")]
    UnexpectedInput { position: usize, snippet: String },

    #[error("Closing parenthesis without a matching opening one (token {token})")]
    UnmatchedClosingParen { token: usize },

    #[error("Opening parenthesis is never closed")]
    UnclosedParen,

    #[error("Parenthesis found in postfix program")]
    UnexpectedParen,

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Operator {operator} is missing an operand")]
    MissingOperand { operator: LogicalOp },
}

/// A compiled condition, ready to evaluate against any number of contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    postfix: Vec<Token>,
}

impl Condition {
    /// Tokenize and parse a condition expression.
    ///
    /// Operator arity is checked here, so a condition that compiles can
    /// always be evaluated.
    pub fn compile(expr: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(expr)?;
        let postfix = to_postfix(tokens)?;
        parser::check_arity(&postfix)?;

        Ok(Self {
            source: expr.trim().to_string(),
            postfix,
        })
    }

    /// Evaluate against a context. An empty condition is `false`.
    pub fn evaluate(&self, context: &Context) -> Result<bool, ConditionError> {
        evaluate_postfix(&self.postfix, context)
    }

    /// The expression text this condition was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The postfix program.
    pub fn postfix(&self) -> &[Token] {
        &self.postfix
    }

    pub fn is_empty(&self) -> bool {
        self.postfix.is_empty()
    }

    /// Distinct context paths this condition reads, in first-appearance order.
    pub fn signals(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for token in &self.postfix {
            if let Token::Comparison(comparison) = token {
                if !seen.contains(&comparison.path.as_str()) {
                    seen.push(&comparison.path);
                }
            }
        }
        seen
    }
}
