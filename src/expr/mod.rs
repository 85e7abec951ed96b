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

//! Expression language for template conditions and bindings
//!
//! Expressions are small: property paths (`user.name`, `ids[0]`,
//! `filters['k']`), literals, comparisons in symbol or word form, boolean
//! connectives, arithmetic, a handful of collection and string methods and
//! the ternary conditional.
//!
//! Parsed trees are cached process-wide by source text, so a template that
//! runs many times parses each of its expressions once.
//!
//! # Example
//!
//! ```ignore
//! let expr = Expression::parse("name != null and name.length() > 2")?;
//! let scope = Value::map([("name", Value::text("ann"))]);
//! assert!(expr.evaluate_boolean(&scope)?);
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod precedence;
pub mod token;

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{Error, Result, Value};

pub use ast::{Expr, InfixOperator, PrefixOperator};
pub use eval::Scope;
pub use lexer::Lexer;
pub use parser::{ParseError, Parser};
pub use precedence::Precedence;
pub use token::{Position, Token, TokenType};

static EXPRESSION_CACHE: LazyLock<RwLock<FxHashMap<String, Arc<Expr>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// A parsed expression together with its source text
#[derive(Debug, Clone)]
pub struct Expression {
    source: Arc<str>,
    ast: Arc<Expr>,
}

impl Expression {
    /// Parse `source`, reusing a cached tree when one exists
    pub fn parse(source: &str) -> Result<Self> {
        if let Some(ast) = EXPRESSION_CACHE.read().get(source) {
            return Ok(Expression {
                source: Arc::from(source),
                ast: Arc::clone(ast),
            });
        }

        let ast = Arc::new(
            Parser::new(source)
                .parse()
                .map_err(|e| Error::expression_parse(source, e.to_string()))?,
        );
        EXPRESSION_CACHE
            .write()
            .insert(source.to_string(), Arc::clone(&ast));

        Ok(Expression {
            source: Arc::from(source),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate to a value
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<Value> {
        eval::evaluate(&self.ast, scope)
            .map_err(|message| Error::expression_evaluation(self.source.as_ref(), message))
    }

    /// Evaluate and apply truthiness
    pub fn evaluate_boolean(&self, scope: &dyn Scope) -> Result<bool> {
        Ok(self.evaluate(scope)?.is_truthy())
    }

    /// Evaluate to a sequence of `(index, item)` pairs
    ///
    /// Lists pair each element with its ordinal; maps pair each value with
    /// its key. Null and scalar results are errors.
    pub fn evaluate_iterable(&self, scope: &dyn Scope) -> Result<Vec<(Value, Value)>> {
        match self.evaluate(scope)? {
            Value::List(items) => Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect()),
            Value::Map(entries) => Ok(entries
                .into_iter()
                .map(|(k, v)| (Value::text(k), v))
                .collect()),
            Value::Null => Err(Error::expression_evaluation(
                self.source.as_ref(),
                "the expression evaluated to a null value",
            )),
            other => Err(Error::NotIterable {
                expression: self.source.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Expression {}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_cached() {
        let a = Expression::parse("a.b == 1").unwrap();
        let b = Expression::parse("a.b == 1").unwrap();
        assert!(Arc::ptr_eq(&a.ast, &b.ast));
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_error() {
        let err = Expression::parse("a ==").unwrap_err();
        assert!(matches!(err, Error::ExpressionParse { .. }));
        assert!(err.is_template_error());
    }

    #[test]
    fn test_evaluation_error_names_source() {
        let scope = Value::map([("n", Value::integer(1))]);
        let err = Expression::parse("n / 0").unwrap().evaluate(&scope).unwrap_err();
        match err {
            Error::ExpressionEvaluation { expression, .. } => assert_eq!(expression, "n / 0"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_iterable() {
        let scope = Value::map([
            ("ids", Value::from(vec![10, 20])),
            ("m", Value::map([("k", Value::integer(1))])),
            ("n", Value::integer(3)),
        ]);
        let pairs = Expression::parse("ids").unwrap().evaluate_iterable(&scope).unwrap();
        assert_eq!(
            pairs,
            vec![
                (Value::integer(0), Value::integer(10)),
                (Value::integer(1), Value::integer(20))
            ]
        );
        let pairs = Expression::parse("m").unwrap().evaluate_iterable(&scope).unwrap();
        assert_eq!(pairs, vec![(Value::text("k"), Value::integer(1))]);

        assert!(matches!(
            Expression::parse("n").unwrap().evaluate_iterable(&scope),
            Err(Error::NotIterable { .. })
        ));
        assert!(Expression::parse("missing")
            .unwrap()
            .evaluate_iterable(&scope)
            .is_err());
    }

    #[test]
    fn test_boolean() {
        let scope = Value::map([("flag", Value::boolean(true)), ("zero", Value::integer(0))]);
        assert!(Expression::parse("flag").unwrap().evaluate_boolean(&scope).unwrap());
        assert!(!Expression::parse("zero").unwrap().evaluate_boolean(&scope).unwrap());
        assert!(!Expression::parse("nothing").unwrap().evaluate_boolean(&scope).unwrap());
    }
}
