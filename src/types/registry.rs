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

//! Registry of value converters
//!
//! Handlers are looked up by logical type and, optionally, by column kind.
//! A lookup with a column kind falls back to the type's kind-agnostic
//! handler, then to the type's only handler when exactly one exists.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{Error, JdbcType, Result, Value, ValueType};

use super::handler::{ObjectTypeHandler, ScalarTypeHandler, TypeHandler};

type HandlerMap = FxHashMap<Option<JdbcType>, Arc<dyn TypeHandler>>;

/// Converter lookup by logical type, column kind and name
#[derive(Debug, Clone)]
pub struct TypeHandlerRegistry {
    by_type: FxHashMap<ValueType, HandlerMap>,
    by_jdbc: FxHashMap<JdbcType, Arc<dyn TypeHandler>>,
    named: FxHashMap<String, Arc<dyn TypeHandler>>,
    unknown: Arc<dyn TypeHandler>,
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHandlerRegistry {
    /// A registry with the built-in scalar converters
    pub fn new() -> Self {
        let unknown: Arc<dyn TypeHandler> = Arc::new(ObjectTypeHandler);
        let mut registry = TypeHandlerRegistry {
            by_type: FxHashMap::default(),
            by_jdbc: FxHashMap::default(),
            named: FxHashMap::default(),
            unknown: Arc::clone(&unknown),
        };

        let builtins: [(Arc<dyn TypeHandler>, &[JdbcType]); 6] = [
            (
                Arc::new(ScalarTypeHandler::integer()),
                &[JdbcType::Tinyint, JdbcType::Smallint, JdbcType::Integer, JdbcType::Bigint],
            ),
            (
                Arc::new(ScalarTypeHandler::float()),
                &[
                    JdbcType::Float,
                    JdbcType::Real,
                    JdbcType::Double,
                    JdbcType::Numeric,
                    JdbcType::Decimal,
                ],
            ),
            (
                Arc::new(ScalarTypeHandler::text()),
                &[
                    JdbcType::Char,
                    JdbcType::Varchar,
                    JdbcType::Longvarchar,
                    JdbcType::Nvarchar,
                    JdbcType::Clob,
                ],
            ),
            (
                Arc::new(ScalarTypeHandler::boolean()),
                &[JdbcType::Bit, JdbcType::Boolean],
            ),
            (
                Arc::new(ScalarTypeHandler::timestamp()),
                &[JdbcType::Date, JdbcType::Time, JdbcType::Timestamp],
            ),
            (Arc::new(ScalarTypeHandler::json()), &[JdbcType::Json]),
        ];
        for (handler, kinds) in builtins {
            registry.register(handler.value_type(), None, Arc::clone(&handler));
            for kind in kinds {
                registry.by_jdbc.insert(*kind, Arc::clone(&handler));
            }
        }
        registry.register(ValueType::Any, None, Arc::clone(&unknown));
        registry.register(ValueType::Cursor, None, unknown);
        registry
    }

    /// Register `handler` for a logical type, optionally limited to one
    /// column kind; the handler also becomes available by name
    pub fn register(
        &mut self,
        value_type: ValueType,
        jdbc_type: Option<JdbcType>,
        handler: Arc<dyn TypeHandler>,
    ) {
        self.named
            .entry(handler.name().to_string())
            .or_insert_with(|| Arc::clone(&handler));
        self.by_type
            .entry(value_type)
            .or_default()
            .insert(jdbc_type, handler);
    }

    /// Register a handler reachable only by name
    pub fn register_named(&mut self, handler: Arc<dyn TypeHandler>) {
        self.named.insert(handler.name().to_string(), handler);
    }

    pub fn has_handler(&self, value_type: &ValueType, jdbc_type: Option<JdbcType>) -> bool {
        self.get_handler(value_type, jdbc_type).is_some()
    }

    /// Returns true if `value` can be bound through a single converter
    pub fn has_handler_for_value(&self, value: &Value) -> bool {
        !value.is_null() && self.has_handler(&value.value_type(), None)
    }

    pub fn get_handler(
        &self,
        value_type: &ValueType,
        jdbc_type: Option<JdbcType>,
    ) -> Option<Arc<dyn TypeHandler>> {
        let handlers = self.by_type.get(value_type)?;
        if let Some(h) = jdbc_type.and_then(|j| handlers.get(&Some(j))) {
            return Some(Arc::clone(h));
        }
        if let Some(h) = handlers.get(&None) {
            return Some(Arc::clone(h));
        }
        if handlers.len() == 1 {
            return handlers.values().next().cloned();
        }
        None
    }

    /// Handler for reading a column into a property of `value_type`
    ///
    /// Untyped properties read through the natural converter of the
    /// column's kind.
    pub fn handler_for_column(
        &self,
        value_type: &ValueType,
        jdbc_type: JdbcType,
    ) -> Option<Arc<dyn TypeHandler>> {
        if *value_type == ValueType::Any {
            return Some(
                self.by_jdbc
                    .get(&jdbc_type)
                    .cloned()
                    .unwrap_or_else(|| Arc::clone(&self.unknown)),
            );
        }
        self.get_handler(value_type, Some(jdbc_type))
    }

    /// Handler registered under `name`
    pub fn get_named(&self, name: &str) -> Result<Arc<dyn TypeHandler>> {
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTypeHandler(name.to_string()))
    }

    /// Pass-through handler used when nothing better is known
    pub fn unknown_handler(&self) -> Arc<dyn TypeHandler> {
        Arc::clone(&self.unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct YesNoHandler;

    impl TypeHandler for YesNoHandler {
        fn name(&self) -> &str {
            "yes_no"
        }

        fn value_type(&self) -> ValueType {
            ValueType::Boolean
        }

        fn convert(&self, raw: Value) -> Result<Value> {
            Ok(Value::Boolean(raw.as_str() == Some("Y")))
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = TypeHandlerRegistry::new();
        assert!(registry.has_handler(&ValueType::Integer, None));
        assert!(registry.has_handler(&ValueType::Text, Some(JdbcType::Varchar)));
        assert!(registry.has_handler(&ValueType::Any, None));
        assert!(!registry.has_handler(&ValueType::Map, None));
        assert!(!registry.has_handler(&ValueType::object("User"), None));
        assert!(registry.has_handler_for_value(&Value::integer(1)));
        assert!(!registry.has_handler_for_value(&Value::map([("a", Value::integer(1))])));
    }

    #[test]
    fn test_jdbc_specific_handler_wins() {
        let mut registry = TypeHandlerRegistry::new();
        registry.register(ValueType::Boolean, Some(JdbcType::Char), Arc::new(YesNoHandler));
        let h = registry
            .get_handler(&ValueType::Boolean, Some(JdbcType::Char))
            .unwrap();
        assert_eq!(h.name(), "yes_no");
        let h = registry
            .get_handler(&ValueType::Boolean, Some(JdbcType::Bit))
            .unwrap();
        assert_eq!(h.name(), "boolean");
        assert_eq!(registry.get_named("yes_no").unwrap().name(), "yes_no");
    }

    #[test]
    fn test_sole_handler_fallback() {
        let mut registry = TypeHandlerRegistry::new();
        registry.register(ValueType::object("Flag"), Some(JdbcType::Char), Arc::new(YesNoHandler));
        assert!(registry.has_handler(&ValueType::object("Flag"), Some(JdbcType::Varchar)));
    }

    #[test]
    fn test_handler_for_untyped_column() {
        let registry = TypeHandlerRegistry::new();
        let h = registry
            .handler_for_column(&ValueType::Any, JdbcType::Bigint)
            .unwrap();
        assert_eq!(h.value_type(), ValueType::Integer);
        let h = registry
            .handler_for_column(&ValueType::Any, JdbcType::Other)
            .unwrap();
        assert_eq!(h.name(), "object");
    }

    #[test]
    fn test_unknown_named_handler() {
        let registry = TypeHandlerRegistry::new();
        assert!(matches!(
            registry.get_named("nope"),
            Err(Error::UnknownTypeHandler(_))
        ));
    }
}
