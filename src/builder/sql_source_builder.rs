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

//! Statement compiler: `#{...}` placeholders to positional markers

use crate::common::StringMap;
use crate::core::{Error, JdbcType, ParameterMode, Result, Value, ValueType};
use crate::mapping::{Configuration, ParameterMapping};
use crate::parsing::TokenParser;
use crate::scripting::StaticSqlSource;

use super::parameter_expression::ParameterExpression;

/// Compiles placeholder SQL against a configuration
#[derive(Debug, Clone, Copy)]
pub struct SqlSourceBuilder<'a> {
    configuration: &'a Configuration,
}

impl<'a> SqlSourceBuilder<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        SqlSourceBuilder { configuration }
    }

    /// Replace each placeholder with `?` and describe it
    ///
    /// The returned descriptors are in marker order. `additional` holds the
    /// bindings of the template pass, which take precedence when inferring
    /// a descriptor's type.
    pub fn parse(
        &self,
        original_sql: &str,
        parameter_type: &ValueType,
        additional: &StringMap<Value>,
    ) -> Result<StaticSqlSource> {
        let mut mappings = Vec::new();
        let sql = TokenParser::parameters().parse(original_sql, |content| {
            mappings.push(self.build_parameter_mapping(content, parameter_type, additional)?);
            Ok("?".to_string())
        })?;
        Ok(StaticSqlSource::new(sql, mappings))
    }

    fn build_parameter_mapping(
        &self,
        content: &str,
        parameter_type: &ValueType,
        additional: &StringMap<Value>,
    ) -> Result<ParameterMapping> {
        let attributes = ParameterExpression::parse(content)?;
        if attributes.get("expression").is_some() {
            return Err(Error::ExpressionParameterUnsupported(content.to_string()));
        }
        let property = attributes.property().unwrap_or("").to_string();
        let property_type =
            self.infer_property_type(&property, &attributes, parameter_type, additional);

        let registry = self.configuration.type_handlers();
        let mut builder = ParameterMapping::builder(property.as_str(), property_type);
        for (name, value) in attributes.entries() {
            builder = match name.as_str() {
                "property" => builder,
                "javaType" => builder.value_type(value.parse::<ValueType>().map_err(|_| {
                    Error::invalid_parameter_property(name.as_str(), value.as_str(), content)
                })?),
                "jdbcType" => builder.jdbc_type(value.parse::<JdbcType>().map_err(|_| {
                    Error::invalid_parameter_property(name.as_str(), value.as_str(), content)
                })?),
                "mode" => builder.mode(value.parse::<ParameterMode>().map_err(|_| {
                    Error::invalid_parameter_property(name.as_str(), value.as_str(), content)
                })?),
                "numericScale" => builder.numeric_scale(value.parse::<u32>().map_err(|_| {
                    Error::invalid_parameter_property(name.as_str(), value.as_str(), content)
                })?),
                "resultMap" => builder.result_map_id(value.as_str()),
                "typeHandler" => builder.type_handler(registry.get_named(value)?),
                "jdbcTypeName" => builder.jdbc_type_name(value.as_str()),
                _ => return Err(Error::unknown_parameter_property(name.as_str(), content)),
            };
        }
        builder.build(registry)
    }

    /// Logical type of a placeholder's property
    ///
    /// Order: the template binding's value type, the parameter type when
    /// it has a converter, `Cursor` for CURSOR parameters, untyped for
    /// maps, then the declared property type of the parameter's record.
    fn infer_property_type(
        &self,
        property: &str,
        attributes: &ParameterExpression,
        parameter_type: &ValueType,
        additional: &StringMap<Value>,
    ) -> ValueType {
        let registry = self.configuration.type_handlers();
        if let Some(value) = additional_value(additional, property) {
            return if value.is_null() {
                ValueType::Any
            } else {
                value.value_type()
            };
        }
        if registry.has_handler(parameter_type, None) {
            return parameter_type.clone();
        }
        if attributes
            .get("jdbcType")
            .is_some_and(|j| j.eq_ignore_ascii_case("CURSOR"))
        {
            return ValueType::Cursor;
        }
        if property.is_empty() || matches!(parameter_type, ValueType::Map | ValueType::Any) {
            return ValueType::Any;
        }
        let lookup = |name: &str| self.configuration.type_descriptor(name);
        parameter_type
            .object_name()
            .and_then(|name| self.configuration.type_descriptor(name))
            .and_then(|desc| desc.getter_type_path(property, &lookup))
            .unwrap_or(ValueType::Any)
    }
}

/// Value of `property` when its root name is a template binding
fn additional_value(additional: &StringMap<Value>, property: &str) -> Option<Value> {
    let end = property.find(['.', '[']).unwrap_or(property.len());
    let root = additional.get(&property[..end])?;
    let rest = property[end..].trim_start_matches('.');
    if rest.is_empty() {
        return Some(root.clone());
    }
    Some(root.get_path(rest).unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TypeDescriptor;

    fn compile(sql: &str, parameter_type: ValueType) -> Result<StaticSqlSource> {
        let config = Configuration::new();
        SqlSourceBuilder::new(&config).parse(sql, &parameter_type, &StringMap::default())
    }

    #[test]
    fn test_markers_and_descriptors_in_order() {
        let source = compile(
            "WHERE id = #{id} AND name = #{name,jdbcType=VARCHAR}",
            ValueType::Map,
        )
        .unwrap();
        assert_eq!(source.sql(), "WHERE id = ? AND name = ?");
        let mappings = source.parameter_mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].property, "id");
        assert_eq!(mappings[0].jdbc_type, None);
        assert_eq!(mappings[1].property, "name");
        assert_eq!(mappings[1].jdbc_type, Some(JdbcType::Varchar));
    }

    #[test]
    fn test_record_property_types() {
        let mut config = Configuration::new();
        config
            .register_type(
                TypeDescriptor::builder("User")
                    .field("id", ValueType::Integer)
                    .field("name", ValueType::Text)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let source = SqlSourceBuilder::new(&config)
            .parse(
                "id = #{id} and name = #{name} and x = #{other}",
                &ValueType::object("User"),
                &StringMap::default(),
            )
            .unwrap();
        let types: Vec<ValueType> = source
            .parameter_mappings()
            .iter()
            .map(|m| m.value_type.clone())
            .collect();
        assert_eq!(types, vec![ValueType::Integer, ValueType::Text, ValueType::Any]);
    }

    #[test]
    fn test_additional_bindings_win() {
        let config = Configuration::new();
        let mut additional = StringMap::default();
        additional.insert("__x_0".to_string(), Value::integer(10));
        let source = SqlSourceBuilder::new(&config)
            .parse("#{__x_0}", &ValueType::Map, &additional)
            .unwrap();
        assert_eq!(source.parameter_mappings()[0].value_type, ValueType::Integer);
    }

    #[test]
    fn test_attributes() {
        let source = compile(
            "#{total, javaType=double, mode=INOUT, numericScale=2, jdbcTypeName=MONEY}",
            ValueType::Map,
        )
        .unwrap();
        let m = &source.parameter_mappings()[0];
        assert_eq!(m.value_type, ValueType::Float);
        assert_eq!(m.mode, ParameterMode::InOut);
        assert_eq!(m.numeric_scale, Some(2));
        assert_eq!(m.jdbc_type_name.as_deref(), Some("MONEY"));
    }

    #[test]
    fn test_unknown_attribute() {
        let err = compile("#{id, color=red}", ValueType::Map).unwrap_err();
        assert!(matches!(err, Error::UnknownParameterProperty { .. }));
        assert!(err.to_string().contains("javaType,jdbcType,mode"));
    }

    #[test]
    fn test_expression_payload_rejected() {
        assert!(matches!(
            compile("#{(id + 1)}", ValueType::Map),
            Err(Error::ExpressionParameterUnsupported(_))
        ));
    }

    #[test]
    fn test_bad_attribute_values() {
        assert!(matches!(
            compile("#{id, numericScale=two}", ValueType::Map),
            Err(Error::InvalidParameterProperty { .. })
        ));
        assert!(compile("#{id, jdbcType=WIDGET}", ValueType::Map).is_err());
        assert!(compile("#{id, typeHandler=nope}", ValueType::Map).is_err());
    }

    #[test]
    fn test_cursor_parameter() {
        assert!(compile("#{rs, jdbcType=CURSOR, mode=OUT}", ValueType::Map).is_err());
        assert!(compile("#{rs, jdbcType=CURSOR, mode=OUT}", ValueType::object("Proc")).is_err());
        assert!(compile(
            "#{rs, jdbcType=CURSOR, mode=OUT, resultMap=ns.row}",
            ValueType::object("Proc")
        )
        .is_ok());
    }
}
