//! Postfix evaluation and comparator semantics.

use std::borrow::Cow;

use serde_json::Value;

use super::token::{Comparator, Literal, LogicalOp, Token};
use super::ConditionError;
use crate::context::Context;

/// Run a postfix program against a context.
///
/// The result is the top of the stack, or `false` for an empty program.
pub fn evaluate_postfix(postfix: &[Token], context: &Context) -> Result<bool, ConditionError> {
    let mut stack: Vec<bool> = Vec::with_capacity(postfix.len());

    for token in postfix {
        let value = match token {
            Token::Comparison(c) => compare(context.lookup(&c.path), c.operator, &c.literal),
            Token::Logical(op) => match op {
                LogicalOp::Not => !pop_operand(&mut stack, *op)?,
                LogicalOp::And | LogicalOp::Or => {
                    let right = pop_operand(&mut stack, *op)?;
                    let left = pop_operand(&mut stack, *op)?;
                    if *op == LogicalOp::And {
                        left && right
                    } else {
                        left || right
                    }
                }
            },
            Token::LeftParen | Token::RightParen => return Err(ConditionError::UnexpectedParen),
        };
        stack.push(value);
    }

    Ok(stack.last().copied().unwrap_or(false))
}

fn pop_operand(stack: &mut Vec<bool>, operator: LogicalOp) -> Result<bool, ConditionError> {
    stack
        .pop()
        .ok_or(ConditionError::MissingOperand { operator })
}

/// Apply one comparator to a resolved signal.
///
/// - Missing or `null` signals fail every comparator, including `!=`
/// - Ordering comparators need both sides to parse as numbers
/// - `==`/`!=` compare numerically when both sides are numbers, else as text
/// - `contains` is a substring test on the stringified signal
/// - `in` tests the stringified signal against a list literal
pub fn compare(value: Option<&Value>, operator: Comparator, literal: &Literal) -> bool {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return false;
    };
    let lhs = stringify(value);

    match (operator, literal) {
        (Comparator::In, Literal::List(items)) => items.iter().any(|item| *item == lhs),
        (Comparator::In, Literal::Text(_)) | (_, Literal::List(_)) => false,
        (Comparator::Contains, Literal::Text(needle)) => lhs.contains(needle.as_str()),
        (op, Literal::Text(rhs)) => {
            let numbers = parse_number(&lhs).zip(parse_number(rhs));
            match (op, numbers) {
                (Comparator::Eq, Some((l, r))) => l == r,
                (Comparator::Eq, None) => lhs == rhs.as_str(),
                (Comparator::Ne, Some((l, r))) => l != r,
                (Comparator::Ne, None) => lhs != rhs.as_str(),
                (Comparator::Ge, Some((l, r))) => l >= r,
                (Comparator::Le, Some((l, r))) => l <= r,
                (Comparator::Gt, Some((l, r))) => l > r,
                (Comparator::Lt, Some((l, r))) => l < r,
                _ => false,
            }
        }
    }
}

/// Text form of a signal: strings as-is, everything else as compact JSON.
fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Parse a finite number, ignoring surrounding whitespace and thousands separators.
fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
