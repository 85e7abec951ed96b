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

//! Nested query loads
//!
//! A [`ResultLoader`] runs the sub-query behind one field, either at once
//! or later for lazy fields. A [`DeferredLoad`] fills a field from the
//! session cache once the query that owns the cached entry has finished.

use tracing::trace;

use crate::core::{CacheKey, DeferredField, Error, ObjectRef, Result, Value, ValueType};

use super::row_bounds::RowBounds;
use super::session::Executor;

/// Value a property of `target_type` holds for a sub-query's results
///
/// List and untyped targets take the whole list; any other target takes
/// the single result, or null when there is none.
pub fn extract_object_from_list(list: Vec<Value>, target_type: &ValueType) -> Result<Value> {
    match target_type {
        ValueType::List | ValueType::Any => Ok(Value::List(list)),
        _ if list.len() > 1 => Err(Error::TooManyResults(list.len())),
        _ => Ok(list.into_iter().next().unwrap_or(Value::Null)),
    }
}

/// Runs the sub-query that produces one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLoader {
    field: DeferredField,
}

impl ResultLoader {
    pub fn new(
        statement_id: impl Into<String>,
        parameter: Value,
        target_type: ValueType,
        cache_key: CacheKey,
    ) -> Self {
        ResultLoader {
            field: DeferredField {
                statement_id: statement_id.into(),
                parameter,
                target_type,
                cache_key,
            },
        }
    }

    pub fn from_deferred(field: DeferredField) -> Self {
        ResultLoader { field }
    }

    pub fn statement_id(&self) -> &str {
        &self.field.statement_id
    }

    /// The placeholder stored in a lazy field
    pub fn into_deferred(self) -> DeferredField {
        self.field
    }

    /// Run the sub-query and shape its results for the field
    pub fn load_result(&self, executor: &mut dyn Executor) -> Result<Value> {
        let configuration = executor.configuration();
        let statement = configuration.statement(&self.field.statement_id)?;
        let bound_sql = statement.bound_sql(&configuration, &self.field.parameter)?;
        trace!(statement = %self.field.statement_id, "loading nested query");
        let list = executor.query(
            &statement,
            &self.field.parameter,
            RowBounds::default(),
            self.field.cache_key.clone(),
            &bound_sql,
        )?;
        extract_object_from_list(list, &self.field.target_type)
    }
}

/// A field waiting for a cached result list
#[derive(Debug, Clone)]
pub struct DeferredLoad {
    target: ObjectRef,
    property: String,
    key: CacheKey,
    target_type: ValueType,
}

impl DeferredLoad {
    pub fn new(
        target: ObjectRef,
        property: impl Into<String>,
        key: CacheKey,
        target_type: ValueType,
    ) -> Self {
        DeferredLoad {
            target,
            property: property.into(),
            key,
            target_type,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Assign the cached results to the waiting field
    pub fn load(&self, cached: Vec<Value>) -> Result<()> {
        trace!(property = %self.property, "resolving deferred load");
        let value = extract_object_from_list(cached, &self.target_type)?;
        self.target.set(&self.property, value)
    }
}
