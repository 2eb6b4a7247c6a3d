// SPDX-License-Identifier: MIT

//! Guard expression parser
//!
//! Hand-rolled tokenizer and recursive-descent parser for expressions like:
//! - `errorCount > 0 && activeState == 'retry'`
//! - `Requirements.needsCustomTool`
//! - `!(phase == 'done' or attempts >= 3)`
//! - `tags contains 'urgent'`

use super::ast::{CompareOp, Expression, Literal, Operand};
use crate::error::ExpressionError;

/// Parse an expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ExpressionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExpressionError::Parse {
            fragment: input.to_string(),
        });
    }

    let tokens = tokenize(trimmed)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken {
            token: token.describe(),
            fragment: trimmed.to_string(),
        });
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    AndAnd,
    OrOr,
    Bang,
    Op(CompareOp),
    Str(String),
    Num(f64),
    Ident(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::AndAnd => "&&".to_string(),
            Token::OrOr => "||".to_string(),
            Token::Bang => "!".to_string(),
            Token::Op(op) => op.to_string(),
            Token::Str(s) => format!("'{}'", s),
            Token::Num(n) => n.to_string(),
            Token::Ident(s) => s.clone(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::AndAnd);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::OrOr);
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::NotEq));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Bang);
                i += 1;
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Gte));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Lte));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(ExpressionError::UnterminatedString {
                                fragment: input.to_string(),
                            })
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '-' if chars.get(i + 1).is_some_and(|ch| ch.is_ascii_digit()) => {
                let (num, next) = read_number(&chars, i, input)?;
                tokens.push(Token::Num(num));
                i = next;
            }
            c if c.is_ascii_digit() => {
                let (num, next) = read_number(&chars, i, input)?;
                tokens.push(Token::Num(num));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    token: other.to_string(),
                    fragment: input.to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

fn read_number(chars: &[char], start: usize, input: &str) -> Result<(f64, usize), ExpressionError> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    let text: String = chars[start..i].iter().collect();
    let num = text.parse::<f64>().map_err(|_| ExpressionError::Parse {
        fragment: input.to_string(),
    })?;
    Ok((num, i))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn fragment(&self) -> String {
        self.tokens
            .iter()
            .map(Token::describe)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn parse_or(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.peek_connective("or", &Token::OrOr) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_unary()?;
        while self.peek_connective("and", &Token::AndAnd) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// True if the next token is the given symbol or its word form
    fn peek_connective(&self, word: &str, symbol: &Token) -> bool {
        match self.peek() {
            Some(t) if t == symbol => true,
            Some(Token::Ident(w)) => w == word,
            _ => false,
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ExpressionError> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ExpressionError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            match self.advance() {
                Some(Token::RParen) => return Ok(inner),
                Some(other) => {
                    return Err(ExpressionError::UnexpectedToken {
                        token: other.describe(),
                        fragment: self.fragment(),
                    })
                }
                None => {
                    return Err(ExpressionError::UnexpectedEnd {
                        fragment: self.fragment(),
                    })
                }
            }
        }

        let left = self.parse_operand()?;

        if let Some(op) = self.peek_compare_op() {
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(Expression::Compare { left, op, right });
        }

        Ok(Expression::Operand(left))
    }

    fn peek_compare_op(&self) -> Option<CompareOp> {
        match self.peek() {
            Some(Token::Op(op)) => Some(*op),
            Some(Token::Ident(w)) if w == "contains" => Some(CompareOp::Contains),
            Some(Token::Ident(w)) if w == "in" => Some(CompareOp::In),
            _ => None,
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(Operand::Literal(Literal::String(s))),
            Some(Token::Num(n)) => Ok(Operand::Literal(Literal::Number(n))),
            Some(Token::Ident(w)) => Ok(match w.as_str() {
                "true" => Operand::Literal(Literal::Boolean(true)),
                "false" => Operand::Literal(Literal::Boolean(false)),
                "null" => Operand::Literal(Literal::Null),
                _ => Operand::Var(w),
            }),
            Some(other) => Err(ExpressionError::UnexpectedToken {
                token: other.describe(),
                fragment: self.fragment(),
            }),
            None => Err(ExpressionError::UnexpectedEnd {
                fragment: self.fragment(),
            }),
        }
    }
}
