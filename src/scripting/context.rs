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

//! Per-call evaluation state for template trees
//!
//! A [`DynamicContext`] holds the bindings of one template evaluation: the
//! parameter object, the database id, every variable declared by a bind
//! node and the per-iteration names introduced by loops. SQL output goes
//! to a separate [`SqlBuffer`], so wrappers can capture their body's output
//! by handing it a fresh buffer while sharing the bindings.

use crate::common::StringMap;
use crate::core::{Result, Value};
use crate::expr::Scope;

/// Binding name of the parameter object
pub const PARAMETER_OBJECT_KEY: &str = "_parameter";

/// Binding name of the database vendor id
pub const DATABASE_ID_KEY: &str = "_databaseId";

/// Bindings of one template evaluation
#[derive(Debug, Clone)]
pub struct DynamicContext {
    parameter: Value,
    bindings: StringMap<Value>,
    unique_number: usize,
}

impl DynamicContext {
    pub fn new(parameter: Value, database_id: Option<&str>) -> Self {
        let mut bindings = StringMap::default();
        bindings.insert(PARAMETER_OBJECT_KEY.to_string(), parameter.clone());
        bindings.insert(
            DATABASE_ID_KEY.to_string(),
            database_id.map(Value::text).unwrap_or(Value::Null),
        );
        DynamicContext {
            parameter,
            bindings,
            unique_number: 0,
        }
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    /// Bind `name`, returning the value it shadowed
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.bindings.insert(name.into(), value)
    }

    pub fn unbind(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    /// Explicit binding only, without parameter fallback
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &StringMap<Value> {
        &self.bindings
    }

    /// Consume the context, keeping the bindings
    pub fn into_bindings(self) -> StringMap<Value> {
        self.bindings
    }

    /// Next ordinal for loop-unique binding names
    pub fn next_unique_number(&mut self) -> usize {
        let n = self.unique_number;
        self.unique_number += 1;
        n
    }
}

impl Scope for DynamicContext {
    /// Explicit bindings first, then the parameter object
    ///
    /// Map parameters are read by key and record parameters by property.
    /// A scalar parameter answers to any name, which lets templates name a
    /// lone parameter however they like. List parameters answer to `list`
    /// and `collection`.
    fn resolve(&self, name: &str) -> Result<Value> {
        if let Some(v) = self.bindings.get(name) {
            return Ok(v.clone());
        }
        match &self.parameter {
            Value::Null => Ok(Value::Null),
            Value::Map(m) => Ok(m.get(name).cloned().unwrap_or(Value::Null)),
            Value::List(_) if name == "list" || name == "collection" => Ok(self.parameter.clone()),
            Value::List(_) => Ok(Value::Null),
            Value::Object(_) => self.parameter.property(name),
            scalar => Ok(scalar.clone()),
        }
    }
}

/// Accumulated SQL fragments
///
/// Fragments are joined with a single space; empty fragments are skipped
/// and the joined text is trimmed.
#[derive(Debug, Clone, Default)]
pub struct SqlBuffer {
    fragments: Vec<String>,
}

impl SqlBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sql: impl Into<String>) {
        let sql = sql.into();
        if !sql.is_empty() {
            self.fragments.push(sql);
        }
    }

    /// Returns true if nothing but whitespace was appended
    pub fn is_blank(&self) -> bool {
        self.fragments.iter().all(|f| f.trim().is_empty())
    }

    pub fn sql(&self) -> String {
        self.fragments.join(" ").trim().to_string()
    }
}
