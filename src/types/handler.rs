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

//! Value converters between logical types and column values

use std::fmt;

use crate::core::{Error, JdbcType, Result, Value, ValueType};
use crate::executor::cursor::RowCursor;

/// Converts one logical type to and from column values
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Registry name, usable from a `typeHandler=` attribute
    fn name(&self) -> &str;

    /// Logical type produced by this handler
    fn value_type(&self) -> ValueType;

    /// Convert a raw column value to the logical type
    fn convert(&self, raw: Value) -> Result<Value>;

    /// Convert a parameter to the value bound to the statement
    fn set_parameter(&self, value: &Value, _jdbc_type: Option<JdbcType>) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.convert(value.clone())
    }

    fn get_result_by_name(&self, cursor: &dyn RowCursor, column: &str) -> Result<Value> {
        self.convert(cursor.get_by_name(column)?)
    }

    fn get_result_by_index(&self, cursor: &dyn RowCursor, index: usize) -> Result<Value> {
        self.convert(cursor.get_by_index(index)?)
    }
}

/// Built-in converter for one scalar type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTypeHandler {
    name: &'static str,
    value_type: ValueType,
}

impl ScalarTypeHandler {
    pub fn integer() -> Self {
        Self::new("integer", ValueType::Integer)
    }

    pub fn float() -> Self {
        Self::new("float", ValueType::Float)
    }

    pub fn text() -> Self {
        Self::new("text", ValueType::Text)
    }

    pub fn boolean() -> Self {
        Self::new("boolean", ValueType::Boolean)
    }

    pub fn timestamp() -> Self {
        Self::new("timestamp", ValueType::Timestamp)
    }

    pub fn json() -> Self {
        Self::new("json", ValueType::Json)
    }

    fn new(name: &'static str, value_type: ValueType) -> Self {
        ScalarTypeHandler { name, value_type }
    }
}

impl TypeHandler for ScalarTypeHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn value_type(&self) -> ValueType {
        self.value_type.clone()
    }

    fn convert(&self, raw: Value) -> Result<Value> {
        coerce(raw, &self.value_type)
    }
}

/// Pass-through converter for untyped values
///
/// Columns read through it keep whatever value the cursor produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTypeHandler;

impl TypeHandler for ObjectTypeHandler {
    fn name(&self) -> &str {
        "object"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Any
    }

    fn convert(&self, raw: Value) -> Result<Value> {
        Ok(raw)
    }
}

/// Convert `value` to `target`, failing when no conversion exists
///
/// Null converts to null for every target. Untyped, map, object and
/// cursor targets accept the value unchanged.
pub fn coerce(value: Value, target: &ValueType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let converted = match target {
        ValueType::Any | ValueType::Cursor | ValueType::Map | ValueType::Object(_) => {
            return Ok(value)
        }
        ValueType::Integer => match &value {
            Value::Integer(_) => return Ok(value),
            Value::List(_) | Value::Map(_) | Value::Object(_) | Value::Json(_) => None,
            other => other.as_int64().map(Value::Integer),
        },
        ValueType::Float => match &value {
            Value::Float(_) => return Ok(value),
            other => other.as_float64().map(Value::Float),
        },
        ValueType::Text => match &value {
            Value::Text(_) => return Ok(value),
            Value::List(_) | Value::Map(_) | Value::Object(_) => None,
            other => Some(Value::text(other.to_string())),
        },
        ValueType::Boolean => value.as_boolean().map(Value::Boolean),
        ValueType::Timestamp => value.as_timestamp().map(Value::Timestamp),
        ValueType::Json => match &value {
            Value::Json(_) => return Ok(value),
            Value::Text(s) => Some(Value::Json(s.clone())),
            _ => None,
        },
        ValueType::List => match value {
            Value::List(_) => return Ok(value),
            other => return Ok(Value::List(vec![other])),
        },
    };
    converted.ok_or_else(|| Error::type_conversion(describe(&value), target.to_string()))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(s) => format!("'{}'", s),
        other => format!("{} {}", other.value_type(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::cursor::MemoryCursor;

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(
            coerce(Value::text("42"), &ValueType::Integer).unwrap(),
            Value::integer(42)
        );
        assert_eq!(
            coerce(Value::integer(3), &ValueType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            coerce(Value::integer(7), &ValueType::Text).unwrap(),
            Value::text("7")
        );
        assert_eq!(
            coerce(Value::text("yes"), &ValueType::Boolean).unwrap(),
            Value::boolean(true)
        );
        assert_eq!(coerce(Value::Null, &ValueType::Integer).unwrap(), Value::Null);
    }

    #[test]
    fn test_coerce_to_list() {
        assert_eq!(
            coerce(Value::integer(1), &ValueType::List).unwrap(),
            Value::List(vec![Value::integer(1)])
        );
        let list = Value::List(vec![Value::text("a"), Value::text("b")]);
        assert_eq!(coerce(list.clone(), &ValueType::List).unwrap(), list);
    }

    #[test]
    fn test_coerce_failure() {
        let err = coerce(Value::text("abc"), &ValueType::Integer).unwrap_err();
        assert!(matches!(err, Error::TypeConversion { .. }));
        assert!(coerce(Value::text("soon"), &ValueType::Timestamp).is_err());
    }

    #[test]
    fn test_handler_reads_cursor() {
        let mut cursor = MemoryCursor::from_rows(&["n"], vec![vec![Value::text("5")]]);
        cursor.next().unwrap();
        let handler = ScalarTypeHandler::integer();
        assert_eq!(handler.get_result_by_name(&cursor, "N").unwrap(), Value::integer(5));
        assert_eq!(handler.get_result_by_index(&cursor, 0).unwrap(), Value::integer(5));
        assert_eq!(
            handler.set_parameter(&Value::Null, Some(JdbcType::Integer)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_object_handler_passes_through() {
        let handler = ObjectTypeHandler;
        let v = Value::from(vec![1, 2]);
        assert_eq!(handler.convert(v.clone()).unwrap(), v);
    }
}
