//! Infix to postfix conversion (shunting-yard).

use super::token::{LogicalOp, Token};
use super::ConditionError;

/// Reorder infix tokens into postfix, honouring `NOT > AND > OR`.
///
/// Binary operators pop stacked operators of equal or higher precedence
/// before being pushed. `NOT` is a prefix operator and pops nothing.
pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>, ConditionError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for (index, token) in tokens.into_iter().enumerate() {
        match token {
            Token::Comparison(_) => output.push(token),
            Token::Logical(op) => {
                if !op.is_unary() {
                    while let Some(&Token::Logical(top)) = stack.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        output.push(Token::Logical(top));
                        stack.pop();
                    }
                }
                stack.push(token);
            }
            Token::LeftParen => stack.push(token),
            Token::RightParen => loop {
                match stack.pop() {
                    Some(Token::LeftParen) => break,
                    Some(op) => output.push(op),
                    None => return Err(ConditionError::UnmatchedClosingParen { token: index }),
                }
            },
        }
    }

    while let Some(token) = stack.pop() {
        if matches!(token, Token::LeftParen | Token::RightParen) {
            return Err(ConditionError::UnclosedParen);
        }
        output.push(token);
    }

    Ok(output)
}

/// Verify every operator in a postfix program has its operands.
pub(crate) fn check_arity(postfix: &[Token]) -> Result<(), ConditionError> {
    let mut depth: usize = 0;

    for token in postfix {
        match token {
            Token::Comparison(_) => depth += 1,
            Token::Logical(op) => {
                let needed = if op.is_unary() { 1 } else { 2 };
                if depth < needed {
                    return Err(ConditionError::MissingOperand { operator: *op });
                }
                depth -= needed - 1;
            }
            Token::LeftParen | Token::RightParen => return Err(ConditionError::UnexpectedParen),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::token::tokenize;
    use super::*;

    /// Render postfix as a compact string, e.g. "a b AND".
    fn rpn(expr: &str) -> String {
        to_postfix(tokenize(expr).unwrap())
            .unwrap()
            .iter()
            .map(|t| match t {
                Token::Comparison(c) => c.path.clone(),
                Token::Logical(op) => op.to_string(),
                Token::LeftParen => "(".to_string(),
                Token::RightParen => ")".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_and_before_or() {
        assert_eq!(rpn("a==1 OR b==2 AND c==3"), "a b c AND OR");
        assert_eq!(rpn("a==1 AND b==2 OR c==3"), "a b AND c OR");
    }

    #[test]
    fn test_left_associative_binary() {
        assert_eq!(rpn("a==1 OR b==1 OR c==1"), "a b OR c OR");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(rpn("(a==1 OR b==2) AND c==3"), "a b OR c AND");
    }

    #[test]
    fn test_not_prefix() {
        assert_eq!(rpn("NOT a==1 AND b==2"), "a NOT b AND");
        assert_eq!(rpn("NOT (a==1 AND b==2)"), "a b AND NOT");
        assert_eq!(rpn("NOT NOT a==1"), "a NOT NOT");
        assert_eq!(rpn("a==1 OR NOT b==2"), "a b NOT OR");
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(rpn("((a==1))"), "a");
        assert_eq!(rpn("(a==1 AND (b==2 OR c==3))"), "a b c OR AND");
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert!(matches!(
            to_postfix(tokenize("a==1)").unwrap()),
            Err(ConditionError::UnmatchedClosingParen { token: 1 })
        ));
        assert!(matches!(
            to_postfix(tokenize("((a==1)").unwrap()),
            Err(ConditionError::UnclosedParen)
        ));
    }

    #[test]
    fn test_arity() {
        let ok = to_postfix(tokenize("a==1 AND NOT b==2").unwrap()).unwrap();
        assert!(check_arity(&ok).is_ok());

        let dangling = to_postfix(tokenize("a==1 AND").unwrap()).unwrap();
        assert_eq!(
            check_arity(&dangling),
            Err(ConditionError::MissingOperand {
                operator: LogicalOp::And
            })
        );
    }
}
