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

//! Column metadata of one result set
//!
//! Wraps a [`RowCursor`] with the lookups the mapping engine repeats for
//! every row: converters per column and logical type, and the split of the
//! cursor's columns into those a result map names and those it does not.
//! Both are computed once per result set.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{JdbcType, Result, Value, ValueType};
use crate::mapping::ResultMap;
use crate::types::{TypeHandler, TypeHandlerRegistry};

use super::cursor::RowCursor;

/// Result set plus cached per-column lookups
pub struct ColumnSet {
    cursor: Box<dyn RowCursor>,
    columns: Vec<String>,
    jdbc_types: Vec<JdbcType>,
    handlers: FxHashMap<(String, ValueType), Arc<dyn TypeHandler>>,
    /// Keyed by `map id:prefix`; mapped names are upper-cased
    mapped: FxHashMap<String, Arc<[String]>>,
    unmapped: FxHashMap<String, Arc<[String]>>,
}

impl ColumnSet {
    pub fn new(cursor: Box<dyn RowCursor>) -> Self {
        let columns = cursor.columns().to_vec();
        let jdbc_types = cursor.column_types().to_vec();
        ColumnSet {
            cursor,
            columns,
            jdbc_types,
            handlers: FxHashMap::default(),
            mapped: FxHashMap::default(),
            unmapped: FxHashMap::default(),
        }
    }

    pub fn cursor(&self) -> &dyn RowCursor {
        self.cursor.as_ref()
    }

    pub fn next(&mut self) -> Result<bool> {
        self.cursor.next()
    }

    pub fn close(&mut self) -> Result<()> {
        self.cursor.close()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn jdbc_types(&self) -> &[JdbcType] {
        &self.jdbc_types
    }

    /// Declared kind of a column; `OTHER` for unknown columns
    pub fn jdbc_type(&self, column: &str) -> JdbcType {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.jdbc_types.get(i).copied())
            .unwrap_or(JdbcType::Other)
    }

    /// Converter that reads `column` as `value_type`
    ///
    /// Falls back to the pass-through converter when the registry has none
    /// for this pair.
    pub fn type_handler(
        &mut self,
        registry: &TypeHandlerRegistry,
        value_type: &ValueType,
        column: &str,
    ) -> Arc<dyn TypeHandler> {
        let key = (column.to_uppercase(), value_type.clone());
        if let Some(handler) = self.handlers.get(&key) {
            return Arc::clone(handler);
        }
        let handler = registry
            .handler_for_column(value_type, self.jdbc_type(column))
            .unwrap_or_else(|| registry.unknown_handler());
        self.handlers.insert(key, Arc::clone(&handler));
        handler
    }

    /// Read the current row's `column` through `handler`
    pub fn read(&self, handler: &dyn TypeHandler, column: &str) -> Result<Value> {
        handler.get_result_by_name(self.cursor.as_ref(), column)
    }

    /// Raw value of the current row's `column`; null for unknown columns
    pub fn raw(&self, column: &str) -> Result<Value> {
        if !self.has_column(column) {
            return Ok(Value::Null);
        }
        self.cursor.get_by_name(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Upper-cased cursor columns that `result_map` names, under `prefix`
    pub fn mapped_column_names(
        &mut self,
        result_map: &ResultMap,
        prefix: Option<&str>,
    ) -> Arc<[String]> {
        let key = map_key(result_map, prefix);
        if !self.mapped.contains_key(&key) {
            self.load_mapped_and_unmapped(result_map, prefix, &key);
        }
        self.mapped.get(&key).cloned().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Cursor columns, in cursor case, that `result_map` does not name
    pub fn unmapped_column_names(
        &mut self,
        result_map: &ResultMap,
        prefix: Option<&str>,
    ) -> Arc<[String]> {
        let key = map_key(result_map, prefix);
        if !self.unmapped.contains_key(&key) {
            self.load_mapped_and_unmapped(result_map, prefix, &key);
        }
        self.unmapped.get(&key).cloned().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    fn load_mapped_and_unmapped(
        &mut self,
        result_map: &ResultMap,
        prefix: Option<&str>,
        key: &str,
    ) {
        let prefix = prefix.unwrap_or("").to_uppercase();
        let wanted: FxHashSet<String> = result_map
            .mapped_columns()
            .iter()
            .map(|c| format!("{}{}", prefix, c))
            .collect();
        let mut mapped = Vec::new();
        let mut unmapped = Vec::new();
        for column in &self.columns {
            let upper = column.to_uppercase();
            if wanted.contains(&upper) {
                mapped.push(upper);
            } else {
                unmapped.push(column.clone());
            }
        }
        self.mapped.insert(key.to_string(), Arc::from(mapped));
        self.unmapped.insert(key.to_string(), Arc::from(unmapped));
    }
}

fn map_key(result_map: &ResultMap, prefix: Option<&str>) -> String {
    format!("{}:{}", result_map.id(), prefix.unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::cursor::MemoryCursor;
    use crate::mapping::ResultMapping;

    fn author_map() -> ResultMap {
        let registry = TypeHandlerRegistry::new();
        ResultMap::builder(
            "ns.author",
            ValueType::Map,
            vec![
                ResultMapping::builder(Some("id"), Some("id")).build(&registry).unwrap(),
                ResultMapping::builder(Some("name"), Some("name")).build(&registry).unwrap(),
            ],
        )
        .build(None)
        .unwrap()
    }

    fn columns() -> ColumnSet {
        ColumnSet::new(Box::new(MemoryCursor::from_rows(
            &["id", "name", "a_id", "a_name", "extra"],
            vec![vec![
                Value::integer(1),
                Value::text("x"),
                Value::integer(2),
                Value::text("y"),
                Value::Null,
            ]],
        )))
    }

    #[test]
    fn test_mapped_and_unmapped() {
        let mut rsw = columns();
        let rm = author_map();
        assert_eq!(&*rsw.mapped_column_names(&rm, None), &["ID".to_string(), "NAME".to_string()]);
        assert_eq!(
            &*rsw.unmapped_column_names(&rm, None),
            &["a_id".to_string(), "a_name".to_string(), "extra".to_string()]
        );
        assert_eq!(
            &*rsw.mapped_column_names(&rm, Some("a_")),
            &["A_ID".to_string(), "A_NAME".to_string()]
        );
    }

    #[test]
    fn test_type_handler_lookup() {
        let mut rsw = columns();
        let registry = TypeHandlerRegistry::new();
        assert_eq!(rsw.jdbc_type("ID"), JdbcType::Bigint);
        assert_eq!(rsw.jdbc_type("missing"), JdbcType::Other);
        let handler = rsw.type_handler(&registry, &ValueType::Text, "id");
        assert_eq!(handler.value_type(), ValueType::Text);
        let untyped = rsw.type_handler(&registry, &ValueType::Any, "id");
        assert_eq!(untyped.value_type(), ValueType::Integer);

        rsw.next().unwrap();
        assert_eq!(rsw.read(handler.as_ref(), "id").unwrap(), Value::text("1"));
        assert_eq!(rsw.raw("nope").unwrap(), Value::Null);
    }
}
