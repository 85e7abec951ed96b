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

//! Expression AST

use std::fmt;

use crate::core::Value;

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Not,
    Negate,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    In,
    NotIn,
}

impl InfixOperator {
    /// Map an operator or keyword to its operator
    pub fn from_literal(op: &str) -> Option<Self> {
        Some(match op {
            "||" | "or" => InfixOperator::Or,
            "&&" | "and" => InfixOperator::And,
            "==" | "eq" => InfixOperator::Equal,
            "!=" | "neq" => InfixOperator::NotEqual,
            "<" | "lt" => InfixOperator::Less,
            "<=" | "lte" => InfixOperator::LessEqual,
            ">" | "gt" => InfixOperator::Greater,
            ">=" | "gte" => InfixOperator::GreaterEqual,
            "+" => InfixOperator::Add,
            "-" => InfixOperator::Subtract,
            "*" => InfixOperator::Multiply,
            "/" => InfixOperator::Divide,
            "%" => InfixOperator::Modulo,
            "in" => InfixOperator::In,
            _ => return None,
        })
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOperator::Or => "||",
            InfixOperator::And => "&&",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::Less => "<",
            InfixOperator::LessEqual => "<=",
            InfixOperator::Greater => ">",
            InfixOperator::GreaterEqual => ">=",
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Modulo => "%",
            InfixOperator::In => "in",
            InfixOperator::NotIn => "not in",
        };
        write!(f, "{}", s)
    }
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Root name resolved against the binding scope
    Identifier(String),
    Property {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// List literal `{a, b, c}`
    List(Vec<Expr>),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        operator: InfixOperator,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expr::Literal(Value::Null) => write!(f, "null"),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Property { target, name } => write!(f, "{}.{}", target, name),
            Expr::Index { target, index } => write!(f, "{}[{}]", target, index),
            Expr::Call {
                target,
                method,
                args,
            } => {
                write!(f, "{}.{}(", target, method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Expr::Prefix { operator, right } => match operator {
                PrefixOperator::Not => write!(f, "!{}", right),
                PrefixOperator::Negate => write!(f, "-{}", right),
            },
            Expr::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => write!(f, "({} ? {} : {})", condition, then, otherwise),
        }
    }
}
