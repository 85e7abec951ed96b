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

//! Result map definitions
//!
//! A [`ResultMap`] describes how rows become objects of one target type:
//! which columns feed which properties, which mappings form the row
//! identity, which properties are built from a joined nested map or a
//! nested query, and how a discriminator column selects a sub-map.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{Error, JdbcType, Result, TypeDescriptor, ValueType};
use crate::types::{TypeHandler, TypeHandlerRegistry};

/// Role flags of a result mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultFlag {
    /// Part of the row identity
    Id,
    /// Constructor argument rather than property
    Constructor,
}

/// When a nested query runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchType {
    /// Deferred until the field is loaded
    Lazy,
    /// Run while the row is mapped
    Eager,
}

/// One field of a result map
#[derive(Debug, Clone)]
pub struct ResultMapping {
    /// Target property, or constructor parameter name for arguments
    pub property: Option<String>,
    pub column: Option<String>,
    pub value_type: ValueType,
    pub jdbc_type: Option<JdbcType>,
    /// None for untyped mappings, which read through the column's kind
    pub type_handler: Option<Arc<dyn TypeHandler>>,
    pub nested_result_map_id: Option<String>,
    pub nested_query_id: Option<String>,
    /// Columns of which at least one must be non-null to build the nested object
    pub not_null_columns: Vec<String>,
    pub column_prefix: Option<String>,
    pub flags: Vec<ResultFlag>,
    /// Property-to-column pairs of a composite nested-query parameter
    pub composites: Vec<ResultMapping>,
    /// Name of the secondary result set that feeds this property
    pub result_set: Option<String>,
    pub foreign_column: Option<String>,
    /// Overrides `lazy_loading_enabled` for this nested query when set
    pub fetch_type: Option<FetchType>,
}

impl ResultMapping {
    pub fn builder(property: Option<&str>, column: Option<&str>) -> ResultMappingBuilder {
        ResultMappingBuilder {
            mapping: ResultMapping {
                property: property.map(str::to_string),
                column: column.map(str::to_string),
                value_type: ValueType::Any,
                jdbc_type: None,
                type_handler: None,
                nested_result_map_id: None,
                nested_query_id: None,
                not_null_columns: Vec::new(),
                column_prefix: None,
                flags: Vec::new(),
                composites: Vec::new(),
                result_set: None,
                foreign_column: None,
                fetch_type: None,
            },
            type_handler_name: None,
        }
    }

    pub fn is_id(&self) -> bool {
        self.flags.contains(&ResultFlag::Id)
    }

    pub fn is_constructor(&self) -> bool {
        self.flags.contains(&ResultFlag::Constructor)
    }

    pub fn is_composite(&self) -> bool {
        !self.composites.is_empty()
    }

    /// Returns true if the nested query waits for an explicit load
    ///
    /// The mapping's own fetch type wins; otherwise `lazy_loading_enabled`
    /// decides.
    pub fn is_lazy(&self, lazy_loading_enabled: bool) -> bool {
        match self.fetch_type {
            Some(fetch_type) => fetch_type == FetchType::Lazy,
            None => lazy_loading_enabled,
        }
    }

    /// Name of the property or constructor argument
    pub fn property_name(&self) -> &str {
        self.property.as_deref().unwrap_or("")
    }

    /// Comma-separated `column` split into names
    pub fn column_names(&self) -> Vec<&str> {
        split_columns(self.column.as_deref())
    }

    /// Comma-separated `foreign_column` split into names
    pub fn foreign_column_names(&self) -> Vec<&str> {
        split_columns(self.foreign_column.as_deref())
    }
}

fn split_columns(columns: Option<&str>) -> Vec<&str> {
    columns
        .map(|c| c.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
        .unwrap_or_default()
}

/// Builder for [`ResultMapping`]
#[derive(Debug, Clone)]
pub struct ResultMappingBuilder {
    mapping: ResultMapping,
    type_handler_name: Option<String>,
}

impl ResultMappingBuilder {
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.mapping.value_type = value_type;
        self
    }

    pub fn jdbc_type(mut self, jdbc_type: JdbcType) -> Self {
        self.mapping.jdbc_type = Some(jdbc_type);
        self
    }

    /// Use the converter registered under `name`
    pub fn type_handler(mut self, name: impl Into<String>) -> Self {
        self.type_handler_name = Some(name.into());
        self
    }

    pub fn nested_result_map(mut self, id: impl Into<String>) -> Self {
        self.mapping.nested_result_map_id = Some(id.into());
        self
    }

    pub fn nested_query(mut self, id: impl Into<String>) -> Self {
        self.mapping.nested_query_id = Some(id.into());
        self
    }

    pub fn not_null_columns(mut self, columns: &[&str]) -> Self {
        self.mapping.not_null_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn column_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mapping.column_prefix = Some(prefix.into());
        self
    }

    pub fn flag(mut self, flag: ResultFlag) -> Self {
        if !self.mapping.flags.contains(&flag) {
            self.mapping.flags.push(flag);
        }
        self
    }

    pub fn id(self) -> Self {
        self.flag(ResultFlag::Id)
    }

    pub fn constructor(self) -> Self {
        self.flag(ResultFlag::Constructor)
    }

    pub fn composites(mut self, composites: Vec<ResultMapping>) -> Self {
        self.mapping.composites = composites;
        self
    }

    pub fn result_set(mut self, name: impl Into<String>) -> Self {
        self.mapping.result_set = Some(name.into());
        self
    }

    pub fn foreign_column(mut self, columns: impl Into<String>) -> Self {
        self.mapping.foreign_column = Some(columns.into());
        self
    }

    pub fn fetch_type(mut self, fetch_type: FetchType) -> Self {
        self.mapping.fetch_type = Some(fetch_type);
        self
    }

    pub fn lazy(self, lazy: bool) -> Self {
        self.fetch_type(if lazy { FetchType::Lazy } else { FetchType::Eager })
    }

    /// Resolve the converter and validate the mapping
    pub fn build(self, registry: &TypeHandlerRegistry) -> Result<ResultMapping> {
        let mut mapping = self.mapping;
        let property = mapping.property_name().to_string();

        if mapping.nested_query_id.is_some() && mapping.nested_result_map_id.is_some() {
            return Err(Error::invalid_mapping(
                property,
                "cannot use both a nested query and a nested result map",
            ));
        }

        let is_plain_column = mapping.nested_query_id.is_none()
            && mapping.nested_result_map_id.is_none()
            && mapping.result_set.is_none();

        if mapping.nested_result_map_id.is_none()
            && mapping.column.is_none()
            && mapping.composites.is_empty()
        {
            return Err(Error::invalid_mapping(property, "mapping is missing a column"));
        }

        if mapping.result_set.is_some() {
            let columns = mapping.column_names().len();
            let foreign_columns = mapping.foreign_column_names().len();
            if columns != foreign_columns {
                return Err(Error::KeyColumnMismatch {
                    property,
                    columns,
                    foreign_columns,
                });
            }
        }

        mapping.type_handler = match self.type_handler_name {
            Some(name) => Some(registry.get_named(&name)?),
            None if is_plain_column && mapping.value_type != ValueType::Any => Some(
                registry
                    .get_handler(&mapping.value_type, mapping.jdbc_type)
                    .ok_or_else(|| {
                        Error::no_type_handler(
                            mapping.value_type.to_string(),
                            mapping
                                .jdbc_type
                                .map(|j| j.to_string())
                                .unwrap_or_else(|| "none".into()),
                            property.as_str(),
                        )
                    })?,
            ),
            None => None,
        };
        Ok(mapping)
    }
}

/// Column-driven selection among result maps
#[derive(Debug, Clone)]
pub struct Discriminator {
    pub mapping: ResultMapping,
    cases: Vec<(String, String)>,
}

impl Discriminator {
    pub fn new(mapping: ResultMapping, cases: Vec<(String, String)>) -> Self {
        Discriminator { mapping, cases }
    }

    /// Result map id for a stringified column value
    pub fn map_id_for(&self, value: &str) -> Option<&str> {
        self.cases
            .iter()
            .find(|(k, _)| k == value)
            .map(|(_, id)| id.as_str())
    }

    pub fn cases(&self) -> &[(String, String)] {
        &self.cases
    }
}

/// Mapping of rows to objects of one type
#[derive(Debug, Clone)]
pub struct ResultMap {
    id: String,
    target: ValueType,
    result_mappings: Vec<ResultMapping>,
    id_result_mappings: Vec<ResultMapping>,
    constructor_result_mappings: Vec<ResultMapping>,
    property_result_mappings: Vec<ResultMapping>,
    mapped_columns: FxHashSet<String>,
    mapped_properties: FxHashSet<String>,
    discriminator: Option<Discriminator>,
    has_nested_result_maps: bool,
    has_nested_queries: bool,
    auto_mapping: Option<bool>,
}

impl ResultMap {
    pub fn builder(
        id: impl Into<String>,
        target: ValueType,
        result_mappings: Vec<ResultMapping>,
    ) -> ResultMapBuilder {
        ResultMapBuilder {
            id: id.into(),
            target,
            result_mappings,
            discriminator: None,
            auto_mapping: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &ValueType {
        &self.target
    }

    pub fn result_mappings(&self) -> &[ResultMapping] {
        &self.result_mappings
    }

    /// Mappings that form the row identity; every mapping when none is flagged
    pub fn id_result_mappings(&self) -> &[ResultMapping] {
        &self.id_result_mappings
    }

    /// Constructor arguments in constructor parameter order
    pub fn constructor_result_mappings(&self) -> &[ResultMapping] {
        &self.constructor_result_mappings
    }

    pub fn property_result_mappings(&self) -> &[ResultMapping] {
        &self.property_result_mappings
    }

    /// Upper-cased names of every mapped column
    pub fn mapped_columns(&self) -> &FxHashSet<String> {
        &self.mapped_columns
    }

    pub fn mapped_properties(&self) -> &FxHashSet<String> {
        &self.mapped_properties
    }

    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    pub fn has_nested_result_maps(&self) -> bool {
        self.has_nested_result_maps
    }

    pub fn has_nested_queries(&self) -> bool {
        self.has_nested_queries
    }

    /// Per-map automatic mapping override
    pub fn auto_mapping(&self) -> Option<bool> {
        self.auto_mapping
    }

    /// Mark as having nested result maps because a discriminated sub-map has them
    pub fn force_nested_result_maps(&mut self) {
        self.has_nested_result_maps = true;
    }
}

/// Builder for [`ResultMap`]
#[derive(Debug, Clone)]
pub struct ResultMapBuilder {
    id: String,
    target: ValueType,
    result_mappings: Vec<ResultMapping>,
    discriminator: Option<Discriminator>,
    auto_mapping: Option<bool>,
}

impl ResultMapBuilder {
    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn auto_mapping(mut self, enabled: bool) -> Self {
        self.auto_mapping = Some(enabled);
        self
    }

    /// Partition the mappings and order the constructor arguments
    ///
    /// `descriptor` is the target's accessor table; it is needed only when
    /// constructor arguments are named.
    pub fn build(self, descriptor: Option<&TypeDescriptor>) -> Result<ResultMap> {
        let mut has_nested_queries = false;
        let mut has_nested_result_maps = false;
        let mut mapped_columns = FxHashSet::default();
        let mut mapped_properties = FxHashSet::default();
        let mut id_result_mappings = Vec::new();
        let mut constructor_result_mappings = Vec::new();
        let mut property_result_mappings = Vec::new();
        let mut constructor_arg_names = Vec::new();

        for mapping in &self.result_mappings {
            has_nested_queries |= mapping.nested_query_id.is_some();
            has_nested_result_maps |=
                mapping.nested_result_map_id.is_some() && mapping.result_set.is_none();

            if let Some(column) = &mapping.column {
                mapped_columns.insert(column.to_uppercase());
            } else {
                for composite in &mapping.composites {
                    if let Some(column) = &composite.column {
                        mapped_columns.insert(column.to_uppercase());
                    }
                }
            }
            if let Some(property) = &mapping.property {
                mapped_properties.insert(property.clone());
            }
            if mapping.is_constructor() {
                if let Some(name) = &mapping.property {
                    constructor_arg_names.push(name.clone());
                }
                constructor_result_mappings.push(mapping.clone());
            } else {
                property_result_mappings.push(mapping.clone());
            }
            if mapping.is_id() {
                id_result_mappings.push(mapping.clone());
            }
        }
        if id_result_mappings.is_empty() {
            id_result_mappings = self.result_mappings.clone();
        }

        if !constructor_arg_names.is_empty() {
            if constructor_arg_names.len() != constructor_result_mappings.len() {
                return Err(Error::invalid_mapping(
                    self.id,
                    "either every constructor argument is named or none is",
                ));
            }
            let names: Vec<&str> = constructor_arg_names.iter().map(String::as_str).collect();
            let ctor = descriptor
                .and_then(|d| d.constructors().iter().find(|c| c.has_param_names(&names)))
                .ok_or_else(|| Error::NoConstructor {
                    type_name: self.target.to_string(),
                    columns: names.join(", "),
                })?;
            let position = |m: &ResultMapping| {
                ctor.params
                    .iter()
                    .position(|(p, _)| Some(p.as_str()) == m.property.as_deref())
                    .unwrap_or(usize::MAX)
            };
            constructor_result_mappings.sort_by_key(position);
        }

        Ok(ResultMap {
            id: self.id,
            target: self.target,
            result_mappings: self.result_mappings,
            id_result_mappings,
            constructor_result_mappings,
            property_result_mappings,
            mapped_columns,
            mapped_properties,
            discriminator: self.discriminator,
            has_nested_result_maps,
            has_nested_queries,
            auto_mapping: self.auto_mapping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeHandlerRegistry {
        TypeHandlerRegistry::new()
    }

    #[test]
    fn test_fetch_type_overrides_global_setting() {
        let r = registry();
        let nested = |fetch: Option<FetchType>| {
            let builder =
                ResultMapping::builder(Some("posts"), Some("id")).nested_query("ns.posts");
            match fetch {
                Some(fetch) => builder.fetch_type(fetch),
                None => builder,
            }
            .build(&r)
            .unwrap()
        };

        let inherit = nested(None);
        assert!(!inherit.is_lazy(false));
        assert!(inherit.is_lazy(true));

        let eager = nested(Some(FetchType::Eager));
        assert!(!eager.is_lazy(true));

        let lazy = nested(Some(FetchType::Lazy));
        assert!(lazy.is_lazy(false));
    }

    #[test]
    fn test_partitions() {
        let r = registry();
        let mappings = vec![
            ResultMapping::builder(Some("id"), Some("order_id"))
                .value_type(ValueType::Integer)
                .id()
                .build(&r)
                .unwrap(),
            ResultMapping::builder(Some("note"), Some("note")).build(&r).unwrap(),
            ResultMapping::builder(Some("items"), None)
                .nested_result_map("ns.item")
                .build(&r)
                .unwrap(),
        ];
        let map = ResultMap::builder("ns.order", ValueType::object("Order"), mappings)
            .build(None)
            .unwrap();
        assert_eq!(map.id_result_mappings().len(), 1);
        assert_eq!(map.property_result_mappings().len(), 3);
        assert!(map.mapped_columns().contains("ORDER_ID"));
        assert!(map.mapped_properties().contains("items"));
        assert!(map.has_nested_result_maps());
        assert!(!map.has_nested_queries());
    }

    #[test]
    fn test_all_mappings_are_id_without_flags() {
        let r = registry();
        let mappings = vec![
            ResultMapping::builder(Some("a"), Some("a")).build(&r).unwrap(),
            ResultMapping::builder(Some("b"), Some("b")).build(&r).unwrap(),
        ];
        let map = ResultMap::builder("m", ValueType::Map, mappings).build(None).unwrap();
        assert_eq!(map.id_result_mappings().len(), 2);
    }

    #[test]
    fn test_constructor_order_follows_declaration() {
        let r = registry();
        let desc = TypeDescriptor::builder("Point")
            .field("x", ValueType::Integer)
            .field("y", ValueType::Integer)
            .constructor(&[("x", ValueType::Integer), ("y", ValueType::Integer)])
            .build()
            .unwrap();
        let mappings = vec![
            ResultMapping::builder(Some("y"), Some("py")).constructor().build(&r).unwrap(),
            ResultMapping::builder(Some("x"), Some("px")).constructor().build(&r).unwrap(),
        ];
        let map = ResultMap::builder("p", ValueType::object("Point"), mappings)
            .build(Some(&desc))
            .unwrap();
        let order: Vec<&str> = map
            .constructor_result_mappings()
            .iter()
            .map(|m| m.property_name())
            .collect();
        assert_eq!(order, vec!["x", "y"]);
    }

    #[test]
    fn test_unknown_constructor_names() {
        let r = registry();
        let desc = TypeDescriptor::builder("Point")
            .field("x", ValueType::Integer)
            .build()
            .unwrap();
        let mappings = vec![ResultMapping::builder(Some("z"), Some("z"))
            .constructor()
            .build(&r)
            .unwrap()];
        assert!(matches!(
            ResultMap::builder("p", ValueType::object("Point"), mappings).build(Some(&desc)),
            Err(Error::NoConstructor { .. })
        ));
    }

    #[test]
    fn test_mapping_validation() {
        let r = registry();
        assert!(ResultMapping::builder(Some("a"), Some("a"))
            .nested_query("q")
            .nested_result_map("m")
            .build(&r)
            .is_err());
        assert!(ResultMapping::builder(Some("a"), None).build(&r).is_err());
        assert!(matches!(
            ResultMapping::builder(Some("a"), Some("a"))
                .value_type(ValueType::object("Thing"))
                .build(&r),
            Err(Error::NoTypeHandler { .. })
        ));
        assert!(matches!(
            ResultMapping::builder(Some("kids"), Some("id,code"))
                .result_set("kids")
                .foreign_column("parent_id")
                .build(&r),
            Err(Error::KeyColumnMismatch { .. })
        ));
    }

    #[test]
    fn test_discriminator_lookup() {
        let r = registry();
        let column = ResultMapping::builder(None, Some("kind")).build(&r).unwrap();
        let d = Discriminator::new(
            column,
            vec![("1".into(), "ns.car".into()), ("2".into(), "ns.truck".into())],
        );
        assert_eq!(d.map_id_for("2"), Some("ns.truck"));
        assert_eq!(d.map_id_for("3"), None);
    }
}
