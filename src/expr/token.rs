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

//! Token types for the expression lexer

use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::LazyLock;

/// Word operators and literals; matched case-sensitively
static KEYWORDS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "and", "or", "not", "eq", "neq", "lt", "lte", "gt", "gte", "in", "null", "true", "false",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `word` is an expression keyword
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

/// Position represents a position in the expression source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Character offset, starting at 0
    pub offset: usize,
    /// Column number, starting at 1
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, column: usize) -> Self {
        Self { offset, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}", self.column)
    }
}

/// TokenType represents the type of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Error token
    Error,
    /// End of input
    Eof,
    /// Identifier (binding or property name)
    Identifier,
    /// Word operator or literal (and, or, null, ...)
    Keyword,
    /// String literal ('hello' or "hello")
    String,
    /// Integer number (123)
    Integer,
    /// Floating point number (123.45)
    Float,
    /// Operator (==, <, &&, +, ...)
    Operator,
    /// Punctuator (parentheses, brackets, braces, dot, comma)
    Punctuator,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Error => write!(f, "ERROR"),
            TokenType::Eof => write!(f, "EOF"),
            TokenType::Identifier => write!(f, "IDENTIFIER"),
            TokenType::Keyword => write!(f, "KEYWORD"),
            TokenType::String => write!(f, "STRING"),
            TokenType::Integer => write!(f, "INTEGER"),
            TokenType::Float => write!(f, "FLOAT"),
            TokenType::Operator => write!(f, "OPERATOR"),
            TokenType::Punctuator => write!(f, "PUNCTUATOR"),
        }
    }
}

/// Token represents a lexical token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// The literal text; unescaped for strings
    pub literal: String,
    pub position: Position,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, position: Position) -> Self {
        Token {
            token_type,
            literal: literal.into(),
            position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Token::new(TokenType::Eof, "", position)
    }

    /// Returns true if this is the given punctuator
    pub fn is_punctuator(&self, p: &str) -> bool {
        self.token_type == TokenType::Punctuator && self.literal == p
    }

    /// Returns true if this is the given operator
    pub fn is_operator(&self, op: &str) -> bool {
        self.token_type == TokenType::Operator && self.literal == op
    }

    /// Returns true if this is the given keyword
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.token_type == TokenType::Keyword && self.literal == kw
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::Eof => write!(f, "end of expression"),
            TokenType::String => write!(f, "'{}'", self.literal),
            _ => write!(f, "{}", self.literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert!(is_keyword("and"));
        assert!(is_keyword("null"));
        assert!(!is_keyword("AND"));
        assert!(!is_keyword("name"));
    }

    #[test]
    fn test_token_predicates() {
        let tok = Token::new(TokenType::Operator, "==", Position::new(2, 3));
        assert!(tok.is_operator("=="));
        assert!(!tok.is_punctuator("=="));
        assert_eq!(tok.to_string(), "==");
        assert_eq!(Token::eof(Position::default()).to_string(), "end of expression");
    }
}
