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

//! Mapper builder: namespaced registration of result maps and statements
//!
//! Every id a mapper defines or references is qualified with the mapper's
//! namespace, so two mappers can both define `selectById` without
//! colliding. A reference that already contains a `.` is taken to be
//! qualified and is left alone.

use tracing::debug;

use crate::core::{Error, Result, ValueType};
use crate::mapping::{
    Configuration, Discriminator, MappedStatement, ResultMap, ResultMapping, ResultMappingBuilder,
    SqlCommandType,
};
use crate::scripting::{SqlNode, SqlSource};

/// Definition of one result map before namespacing and inheritance
#[derive(Debug, Clone)]
pub struct ResultMapDef {
    pub id: String,
    pub target: ValueType,
    pub extends: Option<String>,
    pub mappings: Vec<ResultMapping>,
    pub discriminator: Option<Discriminator>,
    pub auto_mapping: Option<bool>,
}

impl ResultMapDef {
    pub fn new(id: impl Into<String>, target: ValueType, mappings: Vec<ResultMapping>) -> Self {
        ResultMapDef {
            id: id.into(),
            target,
            extends: None,
            mappings,
            discriminator: None,
            auto_mapping: None,
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn auto_mapping(mut self, enabled: bool) -> Self {
        self.auto_mapping = Some(enabled);
        self
    }
}

/// Definition of one statement before namespacing
#[derive(Debug, Clone)]
pub struct StatementDef {
    pub id: String,
    pub command_type: SqlCommandType,
    pub sql: SqlNode,
    pub parameter_type: ValueType,
    /// Comma-separated result map ids, one per result set
    pub result_map: Option<String>,
    /// Target type of an inline result map
    pub result_type: Option<ValueType>,
    pub result_ordered: bool,
    /// Comma-separated result set names
    pub result_sets: Option<String>,
    pub flush_cache: Option<bool>,
    pub use_cache: Option<bool>,
    pub database_id: Option<String>,
}

impl StatementDef {
    pub fn new(id: impl Into<String>, command_type: SqlCommandType, sql: SqlNode) -> Self {
        StatementDef {
            id: id.into(),
            command_type,
            sql,
            parameter_type: ValueType::Any,
            result_map: None,
            result_type: None,
            result_ordered: false,
            result_sets: None,
            flush_cache: None,
            use_cache: None,
            database_id: None,
        }
    }

    pub fn select(id: impl Into<String>, sql: SqlNode) -> Self {
        Self::new(id, SqlCommandType::Select, sql)
    }

    pub fn insert(id: impl Into<String>, sql: SqlNode) -> Self {
        Self::new(id, SqlCommandType::Insert, sql)
    }

    pub fn update(id: impl Into<String>, sql: SqlNode) -> Self {
        Self::new(id, SqlCommandType::Update, sql)
    }

    pub fn delete(id: impl Into<String>, sql: SqlNode) -> Self {
        Self::new(id, SqlCommandType::Delete, sql)
    }

    pub fn parameter_type(mut self, value_type: ValueType) -> Self {
        self.parameter_type = value_type;
        self
    }

    pub fn result_map(mut self, ids: impl Into<String>) -> Self {
        self.result_map = Some(ids.into());
        self
    }

    pub fn result_type(mut self, value_type: ValueType) -> Self {
        self.result_type = Some(value_type);
        self
    }

    pub fn result_ordered(mut self, ordered: bool) -> Self {
        self.result_ordered = ordered;
        self
    }

    pub fn result_sets(mut self, names: impl Into<String>) -> Self {
        self.result_sets = Some(names.into());
        self
    }

    pub fn flush_cache(mut self, flush: bool) -> Self {
        self.flush_cache = Some(flush);
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    pub fn database_id(mut self, id: impl Into<String>) -> Self {
        self.database_id = Some(id.into());
        self
    }
}

/// Registers one mapper's definitions with a configuration
pub struct MapperBuilder<'a> {
    configuration: &'a mut Configuration,
    namespace: String,
}

impl<'a> MapperBuilder<'a> {
    pub fn new(configuration: &'a mut Configuration, namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(Error::invalid_mapping("namespace", "a mapper's namespace cannot be empty"));
        }
        Ok(MapperBuilder {
            configuration,
            namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn configuration(&self) -> &Configuration {
        self.configuration
    }

    /// Qualify `base` with this mapper's namespace
    pub fn qualify(&self, base: &str) -> String {
        if base.contains('.') {
            base.to_string()
        } else {
            format!("{}.{}", self.namespace, base)
        }
    }

    /// Build a result mapping and qualify the ids it references
    ///
    /// A column written as `{param=col, other=col2}` becomes a composite
    /// nested-query parameter.
    pub fn result_mapping(&self, builder: ResultMappingBuilder) -> Result<ResultMapping> {
        let registry = self.configuration.type_handlers();
        let mut mapping = builder.build(registry)?;
        if let Some(column) = mapping.column.take() {
            if is_composite_column(&column) {
                mapping.composites = parse_composite_columns(&column)
                    .into_iter()
                    .map(|(property, column)| {
                        ResultMapping::builder(Some(&property), Some(&column)).build(registry)
                    })
                    .collect::<Result<Vec<_>>>()?;
            } else {
                mapping.column = Some(column);
            }
        }
        mapping.nested_result_map_id = mapping.nested_result_map_id.map(|id| self.qualify(&id));
        mapping.nested_query_id = mapping.nested_query_id.map(|id| self.qualify(&id));
        Ok(mapping)
    }

    /// Discriminator whose case map ids are qualified
    pub fn discriminator(&self, mapping: ResultMapping, cases: &[(&str, &str)]) -> Discriminator {
        Discriminator::new(
            mapping,
            cases
                .iter()
                .map(|(value, id)| (value.to_string(), self.qualify(id)))
                .collect(),
        )
    }

    /// Register a result map and return its qualified id
    ///
    /// With `extends`, the parent's mappings are inherited unless the
    /// child maps the same property; a child that declares constructor
    /// arguments replaces the parent's constructor entirely.
    pub fn add_result_map(&mut self, def: ResultMapDef) -> Result<String> {
        let id = self.qualify(&def.id);
        let mut mappings = def.mappings;

        if let Some(parent_id) = &def.extends {
            let parent = self.configuration.result_map(&self.qualify(parent_id))?;
            let declares_constructor = mappings.iter().any(ResultMapping::is_constructor);
            let inherited: Vec<ResultMapping> = parent
                .result_mappings()
                .iter()
                .filter(|pm| !(declares_constructor && pm.is_constructor()))
                .filter(|pm| {
                    !mappings.iter().any(|m| {
                        m.property.is_some()
                            && m.property == pm.property
                            && m.is_constructor() == pm.is_constructor()
                    })
                })
                .cloned()
                .collect();
            mappings.extend(inherited);
        }

        let descriptor = match &def.target {
            ValueType::Object(_) => Some(self.configuration.descriptor_for(&def.target)?),
            _ => None,
        };
        let mut builder = ResultMap::builder(id.as_str(), def.target, mappings);
        if let Some(discriminator) = def.discriminator {
            builder = builder.discriminator(discriminator);
        }
        if let Some(enabled) = def.auto_mapping {
            builder = builder.auto_mapping(enabled);
        }
        let result_map = builder.build(descriptor.as_deref())?;
        self.configuration.add_result_map(result_map)?;
        debug!(result_map = %id, "registered result map");
        Ok(id)
    }

    /// Register a statement and return its qualified id
    ///
    /// Returns `None` when the statement targets another database, or when
    /// a statement specific to the current database already took the id.
    pub fn add_statement(&mut self, def: StatementDef) -> Result<Option<String>> {
        let id = self.qualify(&def.id);
        if !self.database_id_matches(&id, def.database_id.as_deref()) {
            debug!(statement = %id, "skipped statement for another database");
            return Ok(None);
        }

        let mut result_maps = Vec::new();
        if let Some(refs) = &def.result_map {
            for r in refs.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                let qualified = self.qualify(r);
                if !self.configuration.has_result_map(&qualified) {
                    return Err(Error::ResultMapNotFound(qualified));
                }
                result_maps.push(qualified);
            }
        } else if let Some(result_type) = &def.result_type {
            let inline_id = format!("{}-Inline", id);
            let inline = ResultMap::builder(inline_id.as_str(), result_type.clone(), Vec::new())
                .build(None)?;
            self.configuration.add_result_map(inline)?;
            result_maps.push(inline_id);
        }

        let sql_source = SqlSource::from_node(self.configuration, def.sql, &def.parameter_type)?;
        let mut statement = MappedStatement::new(id.as_str(), def.command_type, sql_source);
        statement.parameter_type = def.parameter_type;
        statement.result_maps = result_maps;
        statement.result_ordered = def.result_ordered;
        statement.result_sets = def
            .result_sets
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(flush) = def.flush_cache {
            statement.flush_cache = flush;
        }
        if let Some(use_cache) = def.use_cache {
            statement.use_cache = use_cache;
        }
        statement.database_id = def.database_id;

        self.configuration.add_statement(statement)?;
        debug!(statement = %id, "registered statement");
        Ok(Some(id))
    }

    /// Complete the mapper once every definition is registered
    pub fn finish(self) {
        self.configuration.resolve_discriminated_nested_result_maps();
    }

    fn database_id_matches(&self, id: &str, required: Option<&str>) -> bool {
        match (required, self.configuration.database_id()) {
            (Some(required), Some(current)) => required == current,
            (Some(_), None) => false,
            // A generic statement yields to one already registered for this database
            (None, _) => match self.configuration.statement(id) {
                Ok(existing) => existing.database_id.is_none(),
                Err(_) => true,
            },
        }
    }
}

fn is_composite_column(column: &str) -> bool {
    column.contains(['=', ','])
}

/// Split `{a=col1, b=col2}` into property/column pairs
fn parse_composite_columns(column: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut tokens = column
        .split(|c: char| matches!(c, '{' | '}' | '=' | ',') || c.is_whitespace())
        .filter(|t| !t.is_empty());
    while let (Some(property), Some(column)) = (tokens.next(), tokens.next()) {
        pairs.push((property.to_string(), column.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TypeDescriptor;

    fn blog_config() -> Configuration {
        let mut config = Configuration::new();
        config
            .register_type(
                TypeDescriptor::builder("Blog")
                    .field("id", ValueType::Integer)
                    .field("title", ValueType::Text)
                    .field("author", ValueType::object("Author"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        config
    }

    #[test]
    fn test_qualify() {
        let mut config = Configuration::new();
        let builder = MapperBuilder::new(&mut config, "blog").unwrap();
        assert_eq!(builder.qualify("selectBlog"), "blog.selectBlog");
        assert_eq!(builder.qualify("author.selectAuthor"), "author.selectAuthor");
    }

    #[test]
    fn test_empty_namespace() {
        let mut config = Configuration::new();
        assert!(MapperBuilder::new(&mut config, "  ").is_err());
    }

    #[test]
    fn test_result_mapping_qualifies_references() {
        let mut config = Configuration::new();
        let builder = MapperBuilder::new(&mut config, "blog").unwrap();
        let mapping = builder
            .result_mapping(
                ResultMapping::builder(Some("author"), None).nested_result_map("authorMap"),
            )
            .unwrap();
        assert_eq!(mapping.nested_result_map_id.as_deref(), Some("blog.authorMap"));

        let mapping = builder
            .result_mapping(
                ResultMapping::builder(Some("posts"), Some("{blogId=id, lang=lang_code}"))
                    .nested_query("post.selectPosts"),
            )
            .unwrap();
        assert_eq!(mapping.nested_query_id.as_deref(), Some("post.selectPosts"));
        assert!(mapping.column.is_none());
        let pairs: Vec<(&str, &str)> = mapping
            .composites
            .iter()
            .map(|c| (c.property_name(), c.column.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(pairs, vec![("blogId", "id"), ("lang", "lang_code")]);
    }

    #[test]
    fn test_extends_overrides_parent_properties() {
        let mut config = blog_config();
        let mut builder = MapperBuilder::new(&mut config, "blog").unwrap();
        let parent = vec![
            builder
                .result_mapping(ResultMapping::builder(Some("id"), Some("blog_id")).id())
                .unwrap(),
            builder
                .result_mapping(ResultMapping::builder(Some("title"), Some("blog_title")))
                .unwrap(),
        ];
        builder
            .add_result_map(ResultMapDef::new("base", ValueType::object("Blog"), parent))
            .unwrap();
        let child = vec![builder
            .result_mapping(ResultMapping::builder(Some("title"), Some("headline")))
            .unwrap()];
        let id = builder
            .add_result_map(
                ResultMapDef::new("detailed", ValueType::object("Blog"), child).extends("base"),
            )
            .unwrap();
        builder.finish();

        let rm = config.result_map(&id).unwrap();
        assert_eq!(rm.result_mappings().len(), 2);
        let title = rm
            .result_mappings()
            .iter()
            .find(|m| m.property_name() == "title")
            .unwrap();
        assert_eq!(title.column.as_deref(), Some("headline"));
        assert_eq!(rm.id_result_mappings().len(), 1);
    }

    #[test]
    fn test_extends_missing_parent() {
        let mut config = blog_config();
        let mut builder = MapperBuilder::new(&mut config, "blog").unwrap();
        let err = builder
            .add_result_map(
                ResultMapDef::new("child", ValueType::object("Blog"), Vec::new()).extends("nope"),
            )
            .unwrap_err();
        assert_eq!(err, Error::ResultMapNotFound("blog.nope".to_string()));
    }

    #[test]
    fn test_statement_with_inline_result_type() {
        let mut config = blog_config();
        let mut builder = MapperBuilder::new(&mut config, "blog").unwrap();
        let id = builder
            .add_statement(
                StatementDef::select(
                    "selectBlog",
                    SqlNode::text("select * from blog where id = #{id}"),
                )
                .parameter_type(ValueType::Integer)
                .result_type(ValueType::object("Blog")),
            )
            .unwrap()
            .unwrap();
        builder.finish();

        assert_eq!(id, "blog.selectBlog");
        let statement = config.statement(&id).unwrap();
        assert_eq!(statement.result_maps, vec!["blog.selectBlog-Inline".to_string()]);
        assert!(config.has_result_map("blog.selectBlog-Inline"));
        assert!(!statement.flush_cache);
        assert!(!statement.sql_source.is_dynamic());
    }

    #[test]
    fn test_statement_unknown_result_map() {
        let mut config = Configuration::new();
        let mut builder = MapperBuilder::new(&mut config, "blog").unwrap();
        let err = builder
            .add_statement(
                StatementDef::select("s", SqlNode::text("select 1")).result_map("missing"),
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_statement_result_sets_and_flush() {
        let mut config = Configuration::new();
        let mut builder = MapperBuilder::new(&mut config, "blog").unwrap();
        builder
            .add_statement(
                StatementDef::select("s", SqlNode::text("call blogs_and_posts()"))
                    .result_sets("blogs, posts")
                    .flush_cache(true),
            )
            .unwrap();
        builder
            .add_statement(StatementDef::delete("d", SqlNode::text("delete from blog")))
            .unwrap();
        let s = config.statement("blog.s").unwrap();
        assert_eq!(s.result_sets, vec!["blogs".to_string(), "posts".to_string()]);
        assert!(s.flush_cache);
        assert!(config.statement("blog.d").unwrap().flush_cache);
    }

    #[test]
    fn test_database_specific_statements() {
        let mut config = Configuration::new();
        config.set_database_id("pg");
        let mut builder = MapperBuilder::new(&mut config, "ns").unwrap();
        assert!(builder
            .add_statement(
                StatementDef::select("q", SqlNode::text("select 1")).database_id("mysql"),
            )
            .unwrap()
            .is_none());
        assert!(builder
            .add_statement(StatementDef::select("q", SqlNode::text("select 2")).database_id("pg"))
            .unwrap()
            .is_some());
        assert!(builder
            .add_statement(StatementDef::select("q", SqlNode::text("select 3")))
            .unwrap()
            .is_none());
        assert_eq!(
            config.statement("ns.q").unwrap().database_id.as_deref(),
            Some("pg")
        );
    }

    #[test]
    fn test_parse_composite_columns() {
        assert_eq!(
            parse_composite_columns("{a=x,b = y}"),
            vec![("a".to_string(), "x".to_string()), ("b".to_string(), "y".to_string())]
        );
        assert!(!is_composite_column("plain_col"));
    }
}
