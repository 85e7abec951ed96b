// Copyright 2025 Sqlweave Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Expression parser using Pratt parsing

use std::fmt;

use crate::core::Value;

use super::ast::{Expr, InfixOperator, PrefixOperator};
use super::lexer::Lexer;
use super::precedence::Precedence;
use super::token::{Position, Token, TokenType};

/// A single parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Expression parser using the Pratt algorithm
pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();
        Parser {
            lexer,
            cur_token,
            peek_token,
            errors: Vec::new(),
        }
    }

    /// Parse the whole input as one expression
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.cur_token.token_type == TokenType::Eof {
            return Err(ParseError::new("empty expression", self.cur_token.position));
        }
        let expr = self.parse_expression(Precedence::Lowest);
        if self.errors.is_empty() && self.peek_token.token_type != TokenType::Eof {
            let tok = self.peek_token.clone();
            if tok.token_type == TokenType::Error {
                self.add_error(tok.literal, tok.position);
            } else {
                self.add_error(format!("unexpected {}", tok), tok.position);
            }
        }
        match (expr, self.errors.into_iter().next()) {
            (Some(expr), None) => Ok(expr),
            (_, Some(err)) => Err(err),
            (None, None) => Err(ParseError::new("invalid expression", Position::default())),
        }
    }

    fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    fn add_error(&mut self, message: impl Into<String>, position: Position) {
        self.errors.push(ParseError::new(message, position));
    }

    fn expect_peek_punctuator(&mut self, p: &str) -> bool {
        if self.peek_token.is_punctuator(p) {
            self.next_token();
            true
        } else {
            let tok = self.peek_token.clone();
            self.add_error(format!("expected '{}', found {}", p, tok), tok.position);
            false
        }
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::for_token(&self.peek_token)
    }

    /// Parse an expression whose operators bind tighter than `precedence`
    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix_expression()?;

        while self.peek_token.token_type != TokenType::Eof && precedence < self.peek_precedence() {
            self.next_token();
            left = self.parse_infix_expression(left)?;
        }

        Some(left)
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let tok = self.cur_token.clone();
        match tok.token_type {
            TokenType::Identifier => Some(Expr::Identifier(tok.literal)),
            TokenType::Integer => match tok.literal.parse::<i64>() {
                Ok(v) => Some(Expr::Literal(Value::Integer(v))),
                Err(_) => {
                    self.add_error(format!("invalid integer '{}'", tok.literal), tok.position);
                    None
                }
            },
            TokenType::Float => match tok.literal.parse::<f64>() {
                Ok(v) => Some(Expr::Literal(Value::Float(v))),
                Err(_) => {
                    self.add_error(format!("invalid number '{}'", tok.literal), tok.position);
                    None
                }
            },
            TokenType::String => Some(Expr::Literal(Value::text(tok.literal))),
            TokenType::Keyword => match tok.literal.as_str() {
                "null" => Some(Expr::Literal(Value::Null)),
                "true" => Some(Expr::Literal(Value::Boolean(true))),
                "false" => Some(Expr::Literal(Value::Boolean(false))),
                "not" => self.parse_prefix_operator(PrefixOperator::Not),
                _ => {
                    self.add_error(format!("unexpected keyword '{}'", tok.literal), tok.position);
                    None
                }
            },
            TokenType::Operator => match tok.literal.as_str() {
                "!" => self.parse_prefix_operator(PrefixOperator::Not),
                "-" => self.parse_prefix_operator(PrefixOperator::Negate),
                "+" => {
                    self.next_token();
                    self.parse_expression(Precedence::Prefix)
                }
                _ => {
                    self.add_error(format!("unexpected operator '{}'", tok.literal), tok.position);
                    None
                }
            },
            TokenType::Punctuator => match tok.literal.as_str() {
                "(" => {
                    self.next_token();
                    let expr = self.parse_expression(Precedence::Lowest)?;
                    if !self.expect_peek_punctuator(")") {
                        return None;
                    }
                    Some(expr)
                }
                "{" => {
                    let items = self.parse_expression_list("}")?;
                    Some(Expr::List(items))
                }
                _ => {
                    self.add_error(format!("unexpected '{}'", tok.literal), tok.position);
                    None
                }
            },
            TokenType::Error => {
                self.add_error(tok.literal, tok.position);
                None
            }
            TokenType::Eof => {
                self.add_error("unexpected end of expression", tok.position);
                None
            }
        }
    }

    fn parse_prefix_operator(&mut self, operator: PrefixOperator) -> Option<Expr> {
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    /// Parse comma separated expressions up to `close`; the current token
    /// is the opening punctuator
    fn parse_expression_list(&mut self, close: &str) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        if self.peek_token.is_punctuator(close) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token.is_punctuator(",") {
            self.next_token(); // consume comma
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek_punctuator(close) {
            return None;
        }
        Some(list)
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let tok = self.cur_token.clone();

        if tok.is_punctuator(".") {
            return self.parse_member(left);
        }
        if tok.is_punctuator("[") {
            self.next_token();
            let index = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek_punctuator("]") {
                return None;
            }
            return Some(Expr::Index {
                target: Box::new(left),
                index: Box::new(index),
            });
        }
        if tok.is_operator("?") {
            self.next_token();
            let then = self.parse_expression(Precedence::Ternary)?;
            if !self.peek_token.is_operator(":") {
                let peek = self.peek_token.clone();
                self.add_error(format!("expected ':', found {}", peek), peek.position);
                return None;
            }
            self.next_token();
            self.next_token();
            let otherwise = self.parse_expression(Precedence::Lowest)?;
            return Some(Expr::Conditional {
                condition: Box::new(left),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        let precedence = Precedence::for_token(&tok);
        let operator = if tok.is_keyword("not") {
            if !self.peek_token.is_keyword("in") {
                let peek = self.peek_token.clone();
                self.add_error(format!("expected 'in' after 'not', found {}", peek), peek.position);
                return None;
            }
            self.next_token();
            InfixOperator::NotIn
        } else {
            match InfixOperator::from_literal(&tok.literal) {
                Some(op) if tok.token_type != TokenType::Identifier => op,
                _ => {
                    self.add_error(format!("unexpected {}", tok), tok.position);
                    return None;
                }
            }
        };

        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    /// Parse `.name` or `.method(args)` after the dot
    fn parse_member(&mut self, target: Expr) -> Option<Expr> {
        self.next_token();
        let tok = self.cur_token.clone();
        if !matches!(tok.token_type, TokenType::Identifier | TokenType::Keyword) {
            self.add_error(format!("expected property name, found {}", tok), tok.position);
            return None;
        }
        if self.peek_token.is_punctuator("(") {
            self.next_token();
            let args = self.parse_expression_list(")")?;
            return Some(Expr::Call {
                target: Box::new(target),
                method: tok.literal,
                args,
            });
        }
        Some(Expr::Property {
            target: Box::new(target),
            name: tok.literal,
        })
    }
}
