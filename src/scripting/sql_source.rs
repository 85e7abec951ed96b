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

//! SQL sources and compiled statements
//!
//! A [`SqlSource`] turns a parameter object into a [`BoundSql`]: positional
//! SQL plus the ordered parameter descriptors and the values they read.
//! Trees without substitutions or conditional nodes compile once when the
//! statement is defined; everything else compiles on every call.

use tracing::debug;

use crate::builder::SqlSourceBuilder;
use crate::common::StringMap;
use crate::core::{ParameterMode, Result, Value, ValueType};
use crate::mapping::{Configuration, ParameterMapping};

use super::context::{DynamicContext, SqlBuffer};
use super::node::SqlNode;

/// Positional SQL with its parameter descriptors
#[derive(Debug, Clone)]
pub struct StaticSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl StaticSqlSource {
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        StaticSqlSource {
            sql: sql.into(),
            parameter_mappings,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    fn bind(&self, parameter: &Value) -> BoundSql {
        BoundSql::new(
            self.sql.clone(),
            self.parameter_mappings.clone(),
            parameter.clone(),
            StringMap::default(),
        )
    }
}

/// Source of a statement's SQL
#[derive(Debug, Clone)]
pub enum SqlSource {
    /// Template evaluated and compiled per call
    Dynamic(SqlNode),
    /// Template compiled once at definition time
    Raw(StaticSqlSource),
    /// Already positional SQL
    Static(StaticSqlSource),
}

impl SqlSource {
    /// Pick the dynamic or raw form depending on the tree
    pub fn from_node(
        configuration: &Configuration,
        root: SqlNode,
        parameter_type: &ValueType,
    ) -> Result<Self> {
        if root.is_dynamic() {
            Ok(SqlSource::Dynamic(root))
        } else {
            SqlSource::raw(configuration, &root, parameter_type)
        }
    }

    /// Compile a tree that does not depend on the parameter object
    pub fn raw(
        configuration: &Configuration,
        root: &SqlNode,
        parameter_type: &ValueType,
    ) -> Result<Self> {
        let mut ctx = DynamicContext::new(Value::Null, configuration.database_id());
        let mut sink = SqlBuffer::new();
        root.apply(&mut ctx, &mut sink)?;
        let compiled = SqlSourceBuilder::new(configuration).parse(
            &sink.sql(),
            parameter_type,
            &StringMap::default(),
        )?;
        Ok(SqlSource::Raw(compiled))
    }

    /// Wrap SQL that already uses positional markers
    pub fn static_sql(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        SqlSource::Static(StaticSqlSource::new(sql, parameter_mappings))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, SqlSource::Dynamic(_))
    }

    pub fn bound_sql(&self, configuration: &Configuration, parameter: &Value) -> Result<BoundSql> {
        let bound = match self {
            SqlSource::Raw(source) | SqlSource::Static(source) => source.bind(parameter),
            SqlSource::Dynamic(root) => {
                let mut ctx = DynamicContext::new(parameter.clone(), configuration.database_id());
                let mut sink = SqlBuffer::new();
                root.apply(&mut ctx, &mut sink)?;
                let parameter_type = if parameter.is_null() {
                    ValueType::Any
                } else {
                    parameter.value_type()
                };
                let compiled = SqlSourceBuilder::new(configuration).parse(
                    &sink.sql(),
                    &parameter_type,
                    ctx.bindings(),
                )?;
                BoundSql::new(
                    compiled.sql,
                    compiled.parameter_mappings,
                    parameter.clone(),
                    ctx.into_bindings(),
                )
            }
        };
        debug!(sql = %bound.sql, parameters = bound.parameter_mappings.len(), "compiled statement");
        Ok(bound)
    }
}

/// A compiled statement ready for positional binding
#[derive(Debug, Clone)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    parameter_object: Value,
    additional_parameters: StringMap<Value>,
}

impl BoundSql {
    pub fn new(
        sql: String,
        parameter_mappings: Vec<ParameterMapping>,
        parameter_object: Value,
        additional_parameters: StringMap<Value>,
    ) -> Self {
        BoundSql {
            sql,
            parameter_mappings,
            parameter_object,
            additional_parameters,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn parameter_object(&self) -> &Value {
        &self.parameter_object
    }

    pub fn additional_parameters(&self) -> &StringMap<Value> {
        &self.additional_parameters
    }

    /// Returns true if the root name of `property` was bound by the template
    pub fn has_additional_parameter(&self, property: &str) -> bool {
        self.additional_parameters.contains_key(root_name(property))
    }

    /// Read `property` from the template bindings
    pub fn additional_parameter(&self, property: &str) -> Result<Value> {
        let root = root_name(property);
        let value = self
            .additional_parameters
            .get(root)
            .cloned()
            .unwrap_or(Value::Null);
        let rest = property[root.len()..].trim_start_matches('.');
        if rest.is_empty() {
            Ok(value)
        } else {
            value.get_path(rest)
        }
    }

    /// Returns true if any marker is an OUT or INOUT parameter
    pub fn has_output_parameters(&self) -> bool {
        self.parameter_mappings
            .iter()
            .any(|mapping| mapping.mode != ParameterMode::In)
    }

    /// Values for every positional marker, in order
    ///
    /// OUT parameters bind null. Each value is read from the template
    /// bindings, else the parameter itself when it is a single scalar,
    /// else the property path on the parameter, and is then written
    /// through the descriptor's converter.
    pub fn parameter_values(&self, configuration: &Configuration) -> Result<Vec<Value>> {
        let registry = configuration.type_handlers();
        let mut values = Vec::with_capacity(self.parameter_mappings.len());
        for mapping in &self.parameter_mappings {
            if mapping.mode == ParameterMode::Out {
                values.push(Value::Null);
                continue;
            }
            let property = mapping.property.as_str();
            let value = if self.has_additional_parameter(property) {
                self.additional_parameter(property)?
            } else if self.parameter_object.is_null() {
                Value::Null
            } else if registry.has_handler_for_value(&self.parameter_object) {
                self.parameter_object.clone()
            } else {
                self.parameter_object.get_path(property)?
            };
            let jdbc_type = match (mapping.jdbc_type, value.is_null()) {
                (None, true) => Some(configuration.settings().jdbc_type_for_null),
                (jdbc_type, _) => jdbc_type,
            };
            values.push(mapping.type_handler.set_parameter(&value, jdbc_type)?);
        }
        debug!(sql = %self.sql, parameters = ?values, "bound parameters");
        Ok(values)
    }
}

fn root_name(property: &str) -> &str {
    match property.find(['.', '[']) {
        Some(end) => &property[..end],
        None => property,
    }
}
