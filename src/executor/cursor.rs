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

//! Row cursor consumed by the result mapping engine
//!

use crate::core::{Error, JdbcType, Result, Value};

/// Forward-only cursor over the rows of one result set
///
/// # Example
///
/// ```ignore
/// let mut cursor = MemoryCursor::new(vec!["id".into()], vec![vec![Value::integer(1)]]);
/// while cursor.next()? {
///     let id = cursor.get_by_name("ID")?;
/// }
/// ```
pub trait RowCursor: Send {
    /// Column labels in select-list order
    fn columns(&self) -> &[String];

    /// Declared kind of each column
    fn column_types(&self) -> &[JdbcType];

    /// Advance to the next row; false once the cursor is exhausted
    fn next(&mut self) -> Result<bool>;

    /// Value of the current row at a zero-based column index
    fn get_by_index(&self, index: usize) -> Result<Value>;

    /// Value of the current row by column label, ignoring case
    fn get_by_name(&self, column: &str) -> Result<Value> {
        let index = self
            .columns()
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        self.get_by_index(index)
    }

    /// Releases resources; later calls to `next` return false
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An in-memory cursor (useful for testing and for backends that buffer)
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    columns: Vec<String>,
    column_types: Vec<JdbcType>,
    rows: Vec<Vec<Value>>,
    current_index: Option<usize>,
    closed: bool,
}

impl MemoryCursor {
    /// Creates a cursor, inferring column kinds from the first non-null
    /// value of each column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let column_types = (0..columns.len())
            .map(|i| {
                rows.iter()
                    .filter_map(|r| r.get(i))
                    .find(|v| !v.is_null())
                    .map(infer_jdbc_type)
                    .unwrap_or(JdbcType::Other)
            })
            .collect();
        Self::with_types(columns, column_types, rows)
    }

    /// Creates a cursor with declared column kinds
    pub fn with_types(
        columns: Vec<String>,
        column_types: Vec<JdbcType>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            columns,
            column_types,
            rows,
            current_index: None,
            closed: false,
        }
    }

    /// Convenience constructor from string slices
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }
}

/// Column kind a backend would report for a value
pub fn infer_jdbc_type(value: &Value) -> JdbcType {
    match value {
        Value::Null => JdbcType::Null,
        Value::Integer(_) => JdbcType::Bigint,
        Value::Float(_) => JdbcType::Double,
        Value::Text(_) => JdbcType::Varchar,
        Value::Boolean(_) => JdbcType::Boolean,
        Value::Timestamp(_) => JdbcType::Timestamp,
        Value::Json(_) => JdbcType::Json,
        Value::List(_) => JdbcType::Array,
        Value::Map(_) | Value::Object(_) => JdbcType::Other,
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn column_types(&self) -> &[JdbcType] {
        &self.column_types
    }

    fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }

        let next_index = match self.current_index {
            None => 0,
            Some(i) => i + 1,
        };

        if next_index < self.rows.len() {
            self.current_index = Some(next_index);
            Ok(true)
        } else {
            self.current_index = Some(self.rows.len());
            Ok(false)
        }
    }

    fn get_by_index(&self, index: usize) -> Result<Value> {
        let row = match self.current_index {
            Some(i) if i < self.rows.len() => &self.rows[i],
            _ => return Err(Error::NoCurrentRow),
        };
        if index >= self.columns.len() {
            return Err(Error::ColumnIndexOutOfBounds {
                index,
                count: self.columns.len(),
            });
        }
        // Short rows read as null past their end
        Ok(row.get(index).cloned().unwrap_or(Value::Null))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Value a backend reports for one OUT or INOUT marker after execution
pub enum OutputParameter {
    Value(Value),
    /// Rows of a CURSOR parameter, mapped through its result map
    Cursor(Box<dyn RowCursor>),
}

impl std::fmt::Debug for OutputParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputParameter::Value(value) => f.debug_tuple("Value").field(value).finish(),
            OutputParameter::Cursor(cursor) => {
                f.debug_tuple("Cursor").field(&cursor.columns()).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> MemoryCursor {
        MemoryCursor::from_rows(
            &["id", "name"],
            vec![
                vec![Value::integer(1), Value::Null],
                vec![Value::integer(2), Value::text("b")],
            ],
        )
    }

    #[test]
    fn test_iteration() {
        let mut c = cursor();
        assert!(matches!(c.get_by_index(0), Err(Error::NoCurrentRow)));
        assert!(c.next().unwrap());
        assert_eq!(c.get_by_name("ID").unwrap(), Value::integer(1));
        assert_eq!(c.get_by_index(1).unwrap(), Value::Null);
        assert!(c.next().unwrap());
        assert_eq!(c.get_by_name("name").unwrap(), Value::text("b"));
        assert!(!c.next().unwrap());
        assert!(!c.next().unwrap());
    }

    #[test]
    fn test_inferred_types() {
        let c = cursor();
        assert_eq!(c.column_types(), &[JdbcType::Bigint, JdbcType::Varchar]);
    }

    #[test]
    fn test_missing_column() {
        let mut c = cursor();
        c.next().unwrap();
        assert!(matches!(c.get_by_name("nope"), Err(Error::ColumnNotFound(_))));
        assert!(matches!(
            c.get_by_index(5),
            Err(Error::ColumnIndexOutOfBounds { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_close() {
        let mut c = cursor();
        c.close().unwrap();
        assert!(!c.next().unwrap());
    }
}
