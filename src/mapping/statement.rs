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

//! Mapped statements
//!

use std::fmt;

use crate::core::{Result, Value, ValueType};
use crate::scripting::{BoundSql, SqlSource};

use super::configuration::Configuration;

/// Kind of SQL a statement runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCommandType {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlCommandType {
    pub fn is_select(&self) -> bool {
        matches!(self, SqlCommandType::Select)
    }
}

impl fmt::Display for SqlCommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlCommandType::Select => write!(f, "SELECT"),
            SqlCommandType::Insert => write!(f, "INSERT"),
            SqlCommandType::Update => write!(f, "UPDATE"),
            SqlCommandType::Delete => write!(f, "DELETE"),
        }
    }
}

/// A named statement: its SQL source and how its rows are mapped
#[derive(Debug, Clone)]
pub struct MappedStatement {
    pub id: String,
    pub command_type: SqlCommandType,
    pub sql_source: SqlSource,
    pub parameter_type: ValueType,
    /// Qualified result map ids, one per result set
    pub result_maps: Vec<String>,
    /// Rows arrive grouped by the top-level identity
    pub result_ordered: bool,
    /// Names of the result sets the statement returns
    pub result_sets: Vec<String>,
    /// Clear the session cache before running
    pub flush_cache: bool,
    pub use_cache: bool,
    pub database_id: Option<String>,
}

impl MappedStatement {
    pub fn new(id: impl Into<String>, command_type: SqlCommandType, sql_source: SqlSource) -> Self {
        let is_select = command_type.is_select();
        MappedStatement {
            id: id.into(),
            command_type,
            sql_source,
            parameter_type: ValueType::Any,
            result_maps: Vec::new(),
            result_ordered: false,
            result_sets: Vec::new(),
            flush_cache: !is_select,
            use_cache: is_select,
            database_id: None,
        }
    }

    /// Compile the statement's SQL for one parameter object
    pub fn bound_sql(&self, configuration: &Configuration, parameter: &Value) -> Result<BoundSql> {
        self.sql_source.bound_sql(configuration, parameter)
    }
}
