//! Condition tokenizer.
//!
//! Scans left to right, classifying each piece of the expression as a
//! logical keyword, a parenthesis, or a whole comparison clause
//! (`<path> <comparator> <literal>`). Whitespace between tokens is ignored.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::ConditionError;

lazy_static! {
    /// A single token anchored at the start of the remaining input.
    ///
    /// Comparisons are tried before keywords so that paths such as
    /// `not.flag` or `or-region` stay paths.
    ///
    /// Groups: 1 `(`, 2 `)`, 3 path, 4 comparator, 5 single-quoted,
    /// 6 double-quoted, 7 bracket list, 8 bare literal, 9 logical keyword.
    static ref TOKEN_PATTERN: Regex = Regex::new(
        r#"(?i)^(?:(\()|(\))|([A-Za-z0-9_.\-]+)\s*(==|!=|>=|<=|>|<|\bcontains\b|\bin\b)\s*(?:'([^']*)'|"([^"]*)"|\[([^\]]*)\]|([A-Za-z0-9_.\-]+))|(AND|OR|NOT)\b)"#
    ).unwrap();

    static ref LIST_SEPARATOR: Regex = Regex::new(r"\s*,\s*").unwrap();
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    /// Binding strength: `NOT > AND > OR`.
    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::Not => 3,
            LogicalOp::And => 2,
            LogicalOp::Or => 1,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, LogicalOp::Not)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

impl FromStr for LogicalOp {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalOp::And),
            "OR" => Ok(LogicalOp::Or),
            "NOT" => Ok(LogicalOp::Not),
            _ => Err(ConditionError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators between a signal and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Contains,
    In,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Contains => "contains",
            Comparator::In => "in",
        }
    }

    /// Whether this comparator only holds between two numbers.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Comparator::Ge | Comparator::Le | Comparator::Gt | Comparator::Lt
        )
    }
}

impl FromStr for Comparator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "==" => Ok(Comparator::Eq),
            "!=" => Ok(Comparator::Ne),
            ">=" => Ok(Comparator::Ge),
            "<=" => Ok(Comparator::Le),
            ">" => Ok(Comparator::Gt),
            "<" => Ok(Comparator::Lt),
            "contains" => Ok(Comparator::Contains),
            "in" => Ok(Comparator::In),
            _ => Err(ConditionError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string or bare word/number
    Text(String),

    /// Bracketed, comma-separated list
    List(Vec<String>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(text) => write!(f, "'{}'", text),
            Literal::List(items) => {
                let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// A single `<path> <comparator> <literal>` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Dotted signal path (e.g., "persona.type")
    pub path: String,

    pub operator: Comparator,

    pub literal: Literal,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.operator, self.literal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Logical(LogicalOp),
    LeftParen,
    RightParen,
    Comparison(Comparison),
}

/// Scan an expression into tokens.
///
/// Fails on the first piece of input that is not a keyword, a parenthesis,
/// or a complete comparison clause.
pub fn tokenize(expr: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let mut position = 0;

    while position < expr.len() {
        let remaining = &expr[position..];
        let trimmed = remaining.trim_start();
        if trimmed.is_empty() {
            break;
        }
        position += remaining.len() - trimmed.len();

        let unexpected = || ConditionError::UnexpectedInput {
            position,
            snippet: trimmed.chars().take(20).collect(),
        };

        let caps = TOKEN_PATTERN.captures(trimmed).ok_or_else(unexpected)?;

        let token = if caps.get(1).is_some() {
            Token::LeftParen
        } else if caps.get(2).is_some() {
            Token::RightParen
        } else if let Some(keyword) = caps.get(9) {
            // `\b` also matches before `.` and `-`, which belong to paths
            if trimmed[keyword.end()..].starts_with(is_path_char) {
                return Err(unexpected());
            }
            Token::Logical(keyword.as_str().parse()?)
        } else {
            let (Some(path), Some(operator)) = (caps.get(3), caps.get(4)) else {
                return Err(unexpected());
            };

            let literal = if let Some(quoted) = caps.get(5).or_else(|| caps.get(6)) {
                Literal::Text(quoted.as_str().to_string())
            } else if let Some(list) = caps.get(7) {
                Literal::List(split_list_literal(list.as_str()))
            } else if let Some(bare) = caps.get(8) {
                Literal::Text(bare.as_str().to_string())
            } else {
                return Err(unexpected());
            };

            Token::Comparison(Comparison {
                path: path.as_str().to_string(),
                operator: operator.as_str().parse()?,
                literal,
            })
        };

        position += caps[0].len();
        tokens.push(token);
    }

    Ok(tokens)
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Split the inside of `[...]`, unquoting items and dropping empty ones.
fn split_list_literal(inner: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(inner.trim())
        .map(|part| unquote(part.trim()))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn unquote(item: &str) -> &str {
    let item = strip_pair(item, '\'');
    strip_pair(item, '"')
}

fn strip_pair(item: &str, quote: char) -> &str {
    item.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(item)
}
