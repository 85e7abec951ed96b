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

//! Expression evaluation against a binding scope

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::core::{Result, Value};

use super::ast::{Expr, InfixOperator, PrefixOperator};

/// Source of root names for expression evaluation
pub trait Scope {
    /// Resolve a root name
    ///
    /// Unknown names resolve to null unless the scope is backed by a typed
    /// record, in which case reading an undeclared property fails.
    fn resolve(&self, name: &str) -> Result<Value>;
}

impl Scope for Value {
    fn resolve(&self, name: &str) -> Result<Value> {
        match self {
            Value::Map(_) | Value::Object(_) | Value::Null => self.property(name),
            _ => Ok(Value::Null),
        }
    }
}

impl Scope for FxHashMap<String, Value> {
    fn resolve(&self, name: &str) -> Result<Value> {
        Ok(self.get(name).cloned().unwrap_or(Value::Null))
    }
}

type EvalResult = std::result::Result<Value, String>;

/// Evaluate `expr`; errors are plain messages for the caller to wrap
pub fn evaluate(expr: &Expr, scope: &dyn Scope) -> EvalResult {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Identifier(name) => scope.resolve(name).map_err(|e| e.to_string()),
        Expr::Property { target, name } => {
            let target = evaluate(target, scope)?;
            target.property(name).map_err(|e| e.to_string())
        }
        Expr::Index { target, index } => {
            let target = evaluate(target, scope)?;
            let index = evaluate(index, scope)?;
            target.index(&index).map_err(|e| e.to_string())
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            let target = evaluate(target, scope)?;
            let args = args
                .iter()
                .map(|a| evaluate(a, scope))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            call_method(&target, method, &args)
        }
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|i| evaluate(i, scope))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        )),
        Expr::Prefix { operator, right } => {
            let right = evaluate(right, scope)?;
            match operator {
                PrefixOperator::Not => Ok(Value::Boolean(!right.is_truthy())),
                PrefixOperator::Negate => match right {
                    Value::Integer(v) => v
                        .checked_neg()
                        .map(Value::Integer)
                        .ok_or_else(|| "integer overflow".to_string()),
                    Value::Float(v) => Ok(Value::Float(-v)),
                    other => Err(format!("cannot negate {}", other.value_type())),
                },
            }
        }
        Expr::Infix {
            left,
            operator,
            right,
        } => evaluate_infix(left, *operator, right, scope),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, scope)?.is_truthy() {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
    }
}

fn evaluate_infix(
    left: &Expr,
    operator: InfixOperator,
    right: &Expr,
    scope: &dyn Scope,
) -> EvalResult {
    // Short-circuit boolean operators
    match operator {
        InfixOperator::And => {
            if !evaluate(left, scope)?.is_truthy() {
                return Ok(Value::Boolean(false));
            }
            return Ok(Value::Boolean(evaluate(right, scope)?.is_truthy()));
        }
        InfixOperator::Or => {
            if evaluate(left, scope)?.is_truthy() {
                return Ok(Value::Boolean(true));
            }
            return Ok(Value::Boolean(evaluate(right, scope)?.is_truthy()));
        }
        _ => {}
    }

    let l = evaluate(left, scope)?;
    let r = evaluate(right, scope)?;

    match operator {
        InfixOperator::Equal => Ok(Value::Boolean(l.loosely_equals(&r))),
        InfixOperator::NotEqual => Ok(Value::Boolean(!l.loosely_equals(&r))),
        InfixOperator::Less
        | InfixOperator::LessEqual
        | InfixOperator::Greater
        | InfixOperator::GreaterEqual => {
            let ord = l.compare(&r).ok_or_else(|| {
                format!(
                    "cannot compare {} with {}",
                    describe(&l),
                    describe(&r)
                )
            })?;
            Ok(Value::Boolean(match operator {
                InfixOperator::Less => ord == Ordering::Less,
                InfixOperator::LessEqual => ord != Ordering::Greater,
                InfixOperator::Greater => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        InfixOperator::In | InfixOperator::NotIn => {
            let found = match &r {
                Value::List(items) => items.iter().any(|i| i.loosely_equals(&l)),
                Value::Map(m) => m.contains_key(&l.to_key_string()),
                Value::Null => false,
                other => return Err(format!("'in' needs a collection, found {}", describe(other))),
            };
            Ok(Value::Boolean(if operator == InfixOperator::In {
                found
            } else {
                !found
            }))
        }
        _ => arithmetic(operator, &l, &r),
    }
}

fn describe(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        other => other.value_type().to_string(),
    }
}

fn concat_text(v: &Value) -> String {
    v.to_key_string()
}

fn arithmetic(operator: InfixOperator, l: &Value, r: &Value) -> EvalResult {
    if operator == InfixOperator::Add
        && (matches!(l, Value::Text(_)) || matches!(r, Value::Text(_)))
    {
        return Ok(Value::text(format!("{}{}", concat_text(l), concat_text(r))));
    }

    if let (Value::Integer(a), Value::Integer(b)) = (l, r) {
        let (a, b) = (*a, *b);
        let result = match operator {
            InfixOperator::Add => a.checked_add(b),
            InfixOperator::Subtract => a.checked_sub(b),
            InfixOperator::Multiply => a.checked_mul(b),
            InfixOperator::Divide | InfixOperator::Modulo if b == 0 => {
                return Err("division by zero".to_string())
            }
            InfixOperator::Divide => a.checked_div(b),
            InfixOperator::Modulo => a.checked_rem(b),
            _ => None,
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| "integer overflow".to_string());
    }

    match (l.is_numeric(), r.is_numeric(), l.as_float64(), r.as_float64()) {
        (true, true, Some(a), Some(b)) => Ok(Value::Float(match operator {
            InfixOperator::Add => a + b,
            InfixOperator::Subtract => a - b,
            InfixOperator::Multiply => a * b,
            InfixOperator::Divide => a / b,
            InfixOperator::Modulo => a % b,
            _ => return Err(format!("unsupported operator {}", operator)),
        })),
        _ => Err(format!(
            "cannot apply {} to {} and {}",
            operator,
            describe(l),
            describe(r)
        )),
    }
}

fn expect_args(method: &str, args: &[Value], count: usize) -> std::result::Result<(), String> {
    if args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "{}() takes {} argument(s), {} given",
            method,
            count,
            args.len()
        ))
    }
}

fn call_method(target: &Value, method: &str, args: &[Value]) -> EvalResult {
    match method {
        "size" | "length" => {
            expect_args(method, args, 0)?;
            match target {
                Value::List(items) => Ok(Value::Integer(items.len() as i64)),
                Value::Map(m) => Ok(Value::Integer(m.len() as i64)),
                Value::Text(s) => Ok(Value::Integer(s.chars().count() as i64)),
                other => Err(format!("{}() not supported on {}", method, describe(other))),
            }
        }
        "isEmpty" => {
            expect_args(method, args, 0)?;
            match target {
                Value::List(items) => Ok(Value::Boolean(items.is_empty())),
                Value::Map(m) => Ok(Value::Boolean(m.is_empty())),
                Value::Text(s) => Ok(Value::Boolean(s.is_empty())),
                other => Err(format!("isEmpty() not supported on {}", describe(other))),
            }
        }
        "contains" => {
            expect_args(method, args, 1)?;
            match (target, &args[0]) {
                (Value::List(items), needle) => {
                    Ok(Value::Boolean(items.iter().any(|i| i.loosely_equals(needle))))
                }
                (Value::Text(s), needle) => {
                    Ok(Value::Boolean(s.contains(concat_text(needle).as_str())))
                }
                (other, _) => Err(format!("contains() not supported on {}", describe(other))),
            }
        }
        "containsKey" => {
            expect_args(method, args, 1)?;
            match target {
                Value::Map(m) => Ok(Value::Boolean(m.contains_key(&args[0].to_key_string()))),
                other => Err(format!("containsKey() not supported on {}", describe(other))),
            }
        }
        "get" => {
            expect_args(method, args, 1)?;
            target.index(&args[0]).map_err(|e| e.to_string())
        }
        "equals" => {
            expect_args(method, args, 1)?;
            Ok(Value::Boolean(target.loosely_equals(&args[0])))
        }
        "equalsIgnoreCase" => {
            expect_args(method, args, 1)?;
            Ok(Value::Boolean(
                !target.is_null()
                    && target
                        .to_key_string()
                        .eq_ignore_ascii_case(&args[0].to_key_string()),
            ))
        }
        "toString" => {
            expect_args(method, args, 0)?;
            Ok(Value::text(concat_text(target)))
        }
        "trim" | "toUpperCase" | "toLowerCase" | "startsWith" | "endsWith" => {
            let s = match target {
                Value::Text(s) => s.clone(),
                other => return Err(format!("{}() not supported on {}", method, describe(other))),
            };
            match method {
                "trim" => {
                    expect_args(method, args, 0)?;
                    Ok(Value::text(s.trim()))
                }
                "toUpperCase" => {
                    expect_args(method, args, 0)?;
                    Ok(Value::text(s.to_uppercase()))
                }
                "toLowerCase" => {
                    expect_args(method, args, 0)?;
                    Ok(Value::text(s.to_lowercase()))
                }
                "startsWith" => {
                    expect_args(method, args, 1)?;
                    Ok(Value::Boolean(s.starts_with(concat_text(&args[0]).as_str())))
                }
                _ => {
                    expect_args(method, args, 1)?;
                    Ok(Value::Boolean(s.ends_with(concat_text(&args[0]).as_str())))
                }
            }
        }
        _ => Err(format!("unknown method '{}'", method)),
    }
}
