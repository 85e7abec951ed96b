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

//! Positional parameter descriptors
//!

use std::sync::Arc;

use crate::core::{Error, JdbcType, ParameterMode, Result, ValueType};
use crate::types::{TypeHandler, TypeHandlerRegistry};

/// One positional parameter of a compiled statement
#[derive(Debug, Clone)]
pub struct ParameterMapping {
    pub property: String,
    pub mode: ParameterMode,
    pub value_type: ValueType,
    pub jdbc_type: Option<JdbcType>,
    pub numeric_scale: Option<u32>,
    pub type_handler: Arc<dyn TypeHandler>,
    /// Result map of a CURSOR out parameter
    pub result_map_id: Option<String>,
    pub jdbc_type_name: Option<String>,
}

impl ParameterMapping {
    pub fn builder(property: impl Into<String>, value_type: ValueType) -> ParameterMappingBuilder {
        ParameterMappingBuilder {
            property: property.into(),
            mode: ParameterMode::In,
            value_type,
            jdbc_type: None,
            numeric_scale: None,
            type_handler: None,
            result_map_id: None,
            jdbc_type_name: None,
        }
    }
}

/// Builder for [`ParameterMapping`]
#[derive(Debug, Clone)]
pub struct ParameterMappingBuilder {
    property: String,
    mode: ParameterMode,
    value_type: ValueType,
    jdbc_type: Option<JdbcType>,
    numeric_scale: Option<u32>,
    type_handler: Option<Arc<dyn TypeHandler>>,
    result_map_id: Option<String>,
    jdbc_type_name: Option<String>,
}

impl ParameterMappingBuilder {
    pub fn mode(mut self, mode: ParameterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn jdbc_type(mut self, jdbc_type: JdbcType) -> Self {
        self.jdbc_type = Some(jdbc_type);
        self
    }

    pub fn numeric_scale(mut self, scale: u32) -> Self {
        self.numeric_scale = Some(scale);
        self
    }

    pub fn type_handler(mut self, handler: Arc<dyn TypeHandler>) -> Self {
        self.type_handler = Some(handler);
        self
    }

    pub fn result_map_id(mut self, id: impl Into<String>) -> Self {
        self.result_map_id = Some(id.into());
        self
    }

    pub fn jdbc_type_name(mut self, name: impl Into<String>) -> Self {
        self.jdbc_type_name = Some(name.into());
        self
    }

    /// Resolve the converter and validate the descriptor
    pub fn build(self, registry: &TypeHandlerRegistry) -> Result<ParameterMapping> {
        if self.value_type == ValueType::Cursor && self.result_map_id.is_none() {
            return Err(Error::invalid_mapping(
                self.property,
                "missing result map on a CURSOR parameter",
            ));
        }
        let type_handler = match self.type_handler {
            Some(h) => h,
            None => registry
                .get_handler(&self.value_type, self.jdbc_type)
                .ok_or_else(|| {
                    Error::no_type_handler(
                        self.value_type.to_string(),
                        self.jdbc_type.map(|j| j.to_string()).unwrap_or_else(|| "none".into()),
                        self.property.as_str(),
                    )
                })?,
        };
        Ok(ParameterMapping {
            property: self.property,
            mode: self.mode,
            value_type: self.value_type,
            jdbc_type: self.jdbc_type,
            numeric_scale: self.numeric_scale,
            type_handler,
            result_map_id: self.result_map_id,
            jdbc_type_name: self.jdbc_type_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_resolves_handler() {
        let registry = TypeHandlerRegistry::new();
        let pm = ParameterMapping::builder("id", ValueType::Integer)
            .jdbc_type(JdbcType::Bigint)
            .build(&registry)
            .unwrap();
        assert_eq!(pm.type_handler.value_type(), ValueType::Integer);
        assert_eq!(pm.mode, ParameterMode::In);
    }

    #[test]
    fn test_missing_handler() {
        let registry = TypeHandlerRegistry::new();
        let err = ParameterMapping::builder("user", ValueType::object("User"))
            .build(&registry)
            .unwrap_err();
        assert!(matches!(err, Error::NoTypeHandler { .. }));
    }

    #[test]
    fn test_cursor_requires_result_map() {
        let registry = TypeHandlerRegistry::new();
        assert!(ParameterMapping::builder("rs", ValueType::Cursor)
            .mode(ParameterMode::Out)
            .build(&registry)
            .is_err());
        assert!(ParameterMapping::builder("rs", ValueType::Cursor)
            .mode(ParameterMode::Out)
            .result_map_id("ns.rowMap")
            .build(&registry)
            .is_ok());
    }
}
