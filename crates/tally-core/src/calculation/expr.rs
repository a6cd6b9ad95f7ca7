//! Closed arithmetic grammar for assembled calculation expressions.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '(' expr ')'
//! ```

use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("expected closing parenthesis")]
    UnclosedParen,

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(Decimal),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Num(v) => v.to_string(),
            Tok::Plus => "+".into(),
            Tok::Minus => "-".into(),
            Tok::Star => "*".into(),
            Tok::Slash => "/".into(),
            Tok::LParen => "(".into(),
            Tok::RParen => ")".into(),
        }
    }

    /// Binding power of infix operators; all are left-associative.
    fn precedence(&self) -> Option<u8> {
        match self {
            Tok::Plus | Tok::Minus => Some(1),
            Tok::Star | Tok::Slash => Some(2),
            _ => None,
        }
    }
}

/// Whether a literal token belongs to the grammar.
pub fn is_literal_token(text: &str) -> bool {
    !text.trim().is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(c))
}

/// Evaluate an arithmetic expression.
pub fn evaluate(source: &str) -> Result<Decimal, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser { tokens, position: 0 };
    let value = parser.parse_binary(0)?;
    match parser.tokens.get(parser.position) {
        None => Ok(value),
        Some(tok) => Err(ExprError::UnexpectedToken(tok.describe())),
    }
}

fn tokenize(source: &str) -> Result<Vec<Tok>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let tok = match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '+' => Tok::Plus,
            '-' => Tok::Minus,
            '*' => Tok::Star,
            '/' => Tok::Slash,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = Decimal::from_str(&literal)
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Tok::Num(value));
                continue;
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, pos: i }),
        };
        tokens.push(tok);
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Tok>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.position).copied()
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Decimal, ExprError> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek() {
            let Some(precedence) = op.precedence() else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.position += 1;

            let right = self.parse_binary(precedence + 1)?;
            left = apply(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Decimal, ExprError> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.position += 1;
                Ok(-self.parse_unary()?)
            }
            Some(Tok::Plus) => {
                self.position += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Decimal, ExprError> {
        let tok = self.peek().ok_or(ExprError::UnexpectedEnd)?;
        self.position += 1;
        match tok {
            Tok::Num(v) => Ok(v),
            Tok::LParen => {
                let inner = self.parse_binary(0)?;
                if self.peek() != Some(Tok::RParen) {
                    return Err(ExprError::UnclosedParen);
                }
                self.position += 1;
                Ok(inner)
            }
            other => Err(ExprError::UnexpectedToken(other.describe())),
        }
    }
}

fn apply(op: Tok, left: Decimal, right: Decimal) -> Result<Decimal, ExprError> {
    match op {
        Tok::Plus => left.checked_add(right).ok_or(ExprError::Overflow),
        Tok::Minus => left.checked_sub(right).ok_or(ExprError::Overflow),
        Tok::Star => left.checked_mul(right).ok_or(ExprError::Overflow),
        Tok::Slash => {
            if right.is_zero() {
                return Err(ExprError::DivisionByZero);
            }
            left.checked_div(right).ok_or(ExprError::Overflow)
        }
        other => Err(ExprError::UnexpectedToken(other.describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4").unwrap(), dec!(14));
        assert_eq!(evaluate("(2+3)*4").unwrap(), dec!(20));
        assert_eq!(evaluate("10-4-3").unwrap(), dec!(3));
        assert_eq!(evaluate("100/10/5").unwrap(), dec!(2));
    }

    #[test]
    fn test_decimal_operands() {
        assert_eq!(
            evaluate("(123+100.23)*5/2+0.5").unwrap(),
            dec!(558.575)
        );
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(evaluate("-5+2").unwrap(), dec!(-3));
        assert_eq!(evaluate("3*-2").unwrap(), dec!(-6));
        assert_eq!(evaluate("4--1").unwrap(), dec!(5));
        assert_eq!(evaluate("+7").unwrap(), dec!(7));
    }

    #[test]
    fn test_whitespace_ignored() {
        assert_eq!(evaluate(" 1 + 2 ").unwrap(), dec!(3));
    }

    #[test]
    fn test_error_marker_is_invalid() {
        assert!(matches!(
            evaluate("ERROR!*5"),
            Err(ExprError::UnexpectedChar { ch: 'E', pos: 0 })
        ));
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(evaluate("5*"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("*5"), Err(ExprError::UnexpectedToken("*".into())));
    }

    #[test]
    fn test_trailing_and_unbalanced() {
        assert_eq!(evaluate("(1+2"), Err(ExprError::UnclosedParen));
        assert_eq!(evaluate("1+2)"), Err(ExprError::UnexpectedToken(")".into())));
    }

    #[test]
    fn test_empty() {
        assert_eq!(evaluate(""), Err(ExprError::Empty));
        assert_eq!(evaluate("   "), Err(ExprError::Empty));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_malformed_number() {
        assert_eq!(evaluate("1.2.3"), Err(ExprError::InvalidNumber("1.2.3".into())));
    }

    #[test]
    fn test_literal_token_grammar() {
        assert!(is_literal_token("12"));
        assert!(is_literal_token("("));
        assert!(is_literal_token("0.5"));
        assert!(!is_literal_token("ERROR!"));
        assert!(!is_literal_token("x"));
        assert!(!is_literal_token(""));
    }
}
