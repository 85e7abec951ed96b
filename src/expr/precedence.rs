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

//! Operator precedence levels for the Pratt parser

use super::token::{Token, TokenType};

/// Precedence levels (higher number = higher precedence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Precedence {
    /// Lowest precedence
    #[default]
    Lowest = 1,
    /// Conditional (a ? b : c)
    Ternary = 2,
    /// Logical OR (||, or)
    Or = 3,
    /// Logical AND (&&, and)
    And = 4,
    /// Equality and membership (==, !=, eq, neq, in, not in)
    Equals = 5,
    /// Ordering (<, <=, >, >=, lt, lte, gt, gte)
    LessGreater = 6,
    /// Addition, subtraction and concatenation (+, -)
    Sum = 7,
    /// Multiplication, division and remainder (*, /, %)
    Product = 8,
    /// Prefix operators (!, not, -)
    Prefix = 9,
    /// Property access, method calls and indexing (., [])
    Access = 10,
}

impl Precedence {
    /// Get precedence for an operator or keyword
    pub fn for_operator(op: &str) -> Precedence {
        match op {
            "?" => Precedence::Ternary,
            "||" | "or" => Precedence::Or,
            "&&" | "and" => Precedence::And,
            "==" | "!=" | "eq" | "neq" | "in" | "not" => Precedence::Equals,
            "<" | "<=" | ">" | ">=" | "lt" | "lte" | "gt" | "gte" => Precedence::LessGreater,
            "+" | "-" => Precedence::Sum,
            "*" | "/" | "%" => Precedence::Product,
            "." | "[" => Precedence::Access,
            _ => Precedence::Lowest,
        }
    }

    /// Get precedence of a token in infix position
    pub fn for_token(token: &Token) -> Precedence {
        match token.token_type {
            TokenType::Operator | TokenType::Keyword | TokenType::Punctuator => {
                Precedence::for_operator(&token.literal)
            }
            _ => Precedence::Lowest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Precedence::Or < Precedence::And);
        assert!(Precedence::And < Precedence::Equals);
        assert!(Precedence::Sum < Precedence::Product);
        assert!(Precedence::Prefix < Precedence::Access);
    }

    #[test]
    fn test_word_and_symbol_forms_match() {
        assert_eq!(Precedence::for_operator("and"), Precedence::for_operator("&&"));
        assert_eq!(Precedence::for_operator("gte"), Precedence::for_operator(">="));
        assert_eq!(Precedence::for_operator(")"), Precedence::Lowest);
    }
}
