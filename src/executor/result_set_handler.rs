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

//! Result mapping engine
//!
//! Turns the cursors of one statement execution into object graphs as its
//! result maps describe. One [`ResultSetHandler`] serves one execution and
//! is discarded afterwards; its caches never outlive the pass.
//!
//! # Rows and objects
//!
//! With plain result maps every row yields one result. Once a map nests
//! other maps, a logical object may span several rows of a join. Each row
//! then gets a [`CacheKey`] built from the map's id columns, and nested
//! objects are cached under their own key combined with their parent's,
//! so a child seen again under the same parent is not added twice.
//!
//! Objects currently being built are tracked per row in an ancestor map
//! keyed by result map id. A nested mapping that refers back to one of
//! those maps is linked to the in-progress object instead of recursing.
//!
//! # Secondary result sets
//!
//! A property backed by a named result set is recorded as a pending
//! relation keyed by the parent's column values. When that result set
//! arrives, every child row is linked to the parents whose key matches.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{trace, warn};

use crate::common::strip_prefix_ignore_case;
use crate::core::{
    CacheKey, ConstructorDescriptor, Error, ObjectRef, ParameterMode, Record, Result,
    TypeDescriptor, Value, ValueType,
};
use crate::mapping::{
    AutoMappingBehavior, Configuration, Discriminator, MappedStatement, ParameterMapping,
    ResultMap, ResultMapping, Settings, UnknownColumnBehavior,
};
use crate::scripting::BoundSql;
use crate::types::TypeHandler;

use super::column_set::ColumnSet;
use super::cursor::{OutputParameter, RowCursor};
use super::loader::ResultLoader;
use super::result_handler::{DefaultResultHandler, ResultContext, ResultHandler};
use super::row_bounds::RowBounds;
use super::session::Executor;

/// Objects under construction in the current row, by result map id
type Ancestors = FxHashMap<String, ObjectRef>;

/// A parent property waiting for rows of a secondary result set
#[derive(Debug, Clone)]
struct PendingRelation {
    target: ObjectRef,
    mapping: ResultMapping,
}

/// Column placed into a property by automatic mapping
#[derive(Debug, Clone)]
struct AutoMapping {
    column: String,
    property: String,
    handler: Arc<dyn TypeHandler>,
}

/// Outcome of a property mapping
enum MappedValue {
    Value(Value),
    /// Filled later by a deferred load, a lazy load or a result set
    Deferred,
}

/// Outcome of creating the result object of a row
enum Created {
    Absent,
    Scalar(Value),
    Object {
        object: ObjectRef,
        /// Built through constructor arguments
        by_constructor: bool,
    },
}

/// Maps the result sets of one statement execution
pub struct ResultSetHandler<'a> {
    executor: &'a mut dyn Executor,
    configuration: Arc<Configuration>,
    settings: Settings,
    statement: &'a MappedStatement,
    bounds: RowBounds,
    has_custom_handler: bool,
    nested_result_objects: FxHashMap<CacheKey, Value>,
    pending_relations: FxHashMap<CacheKey, Vec<PendingRelation>>,
    next_result_maps: FxHashMap<String, ResultMapping>,
    auto_mappings: FxHashMap<String, Arc<[AutoMapping]>>,
}

impl<'a> ResultSetHandler<'a> {
    pub fn new(
        executor: &'a mut dyn Executor,
        statement: &'a MappedStatement,
        bounds: RowBounds,
    ) -> Self {
        let configuration = executor.configuration();
        let settings = configuration.settings().clone();
        ResultSetHandler {
            executor,
            configuration,
            settings,
            statement,
            bounds,
            has_custom_handler: false,
            nested_result_objects: FxHashMap::default(),
            pending_relations: FxHashMap::default(),
            next_result_maps: FxHashMap::default(),
            auto_mappings: FxHashMap::default(),
        }
    }

    /// Map every cursor of the execution
    ///
    /// Cursors are paired with the statement's result maps in order; the
    /// remaining ones are matched by position to the statement's result
    /// set names and linked to pending parents. With one result map the
    /// result is that map's list; with several, one list per map. A custom
    /// `handler` receives the results instead and the returned list is
    /// empty.
    pub fn handle_result_sets(
        &mut self,
        cursors: Vec<Box<dyn RowCursor>>,
        mut handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Value>> {
        self.has_custom_handler = handler.is_some();
        let statement = self.statement;
        let mut sets = cursors.into_iter().map(ColumnSet::new);
        let mut current = sets.next();
        if current.is_some() && statement.result_maps.is_empty() {
            return Err(Error::NoResultMaps(statement.id.clone()));
        }

        let mut multiple_results: Vec<Vec<Value>> = Vec::new();
        let mut result_set_count = 0;
        while result_set_count < statement.result_maps.len() {
            let Some(mut rsw) = current.take() else {
                break;
            };
            let result_map = self
                .configuration
                .result_map(&statement.result_maps[result_set_count])?;
            match handler.as_deref_mut() {
                Some(h) => {
                    self.handle_row_values(&mut rsw, &result_map, Some(h), self.bounds, None)?;
                }
                None => {
                    let mut collector = DefaultResultHandler::new();
                    self.handle_row_values(
                        &mut rsw,
                        &result_map,
                        Some(&mut collector as &mut dyn ResultHandler),
                        self.bounds,
                        None,
                    )?;
                    multiple_results.push(collector.into_result_list());
                }
            }
            rsw.close()?;
            current = sets.next();
            self.nested_result_objects.clear();
            result_set_count += 1;
        }

        while result_set_count < statement.result_sets.len() {
            let Some(mut rsw) = current.take() else {
                break;
            };
            let name = &statement.result_sets[result_set_count];
            if let Some(parent_mapping) = self.next_result_maps.get(name).cloned() {
                let nested_id = parent_mapping.nested_result_map_id.as_deref().ok_or_else(|| {
                    Error::invalid_mapping(
                        parent_mapping.property_name(),
                        "a result set mapping needs a nested result map",
                    )
                })?;
                let result_map = self.configuration.result_map(nested_id)?;
                trace!(result_set = %name, "linking secondary result set");
                self.handle_row_values(
                    &mut rsw,
                    &result_map,
                    None,
                    RowBounds::default(),
                    Some(&parent_mapping),
                )?;
            }
            rsw.close()?;
            current = sets.next();
            self.nested_result_objects.clear();
            result_set_count += 1;
        }

        if multiple_results.len() == 1 {
            Ok(multiple_results.pop().unwrap_or_default())
        } else {
            Ok(multiple_results.into_iter().map(Value::List).collect())
        }
    }

    /// Write the backend's OUT and INOUT values onto the parameter object
    ///
    /// `outputs` holds one entry per non-IN marker, in marker order. A
    /// CURSOR entry is mapped through the marker's result map and stored
    /// as a list; any other value goes through the marker's converter.
    pub fn handle_output_parameters(
        &mut self,
        bound_sql: &BoundSql,
        outputs: Vec<OutputParameter>,
    ) -> Result<()> {
        let mappings: Vec<&ParameterMapping> = bound_sql
            .parameter_mappings()
            .iter()
            .filter(|mapping| mapping.mode != ParameterMode::In)
            .collect();
        if mappings.is_empty() {
            return Ok(());
        }
        if outputs.len() != mappings.len() {
            return Err(Error::backend(format!(
                "expected {} output parameters, got {}",
                mappings.len(),
                outputs.len()
            )));
        }
        let Some(target) = bound_sql.parameter_object().as_object().cloned() else {
            return Err(Error::invalid_mapping(
                mappings[0].property.as_str(),
                "output parameters need an object parameter",
            ));
        };

        for (mapping, output) in mappings.into_iter().zip(outputs) {
            let value = match output {
                OutputParameter::Cursor(cursor) => {
                    let result_map_id = mapping.result_map_id.as_deref().ok_or_else(|| {
                        Error::invalid_mapping(
                            mapping.property.as_str(),
                            "missing result map on a CURSOR parameter",
                        )
                    })?;
                    let result_map = self.configuration.result_map(result_map_id)?;
                    let mut rsw = ColumnSet::new(cursor);
                    let mut collector = DefaultResultHandler::new();
                    self.handle_row_values(
                        &mut rsw,
                        &result_map,
                        Some(&mut collector as &mut dyn ResultHandler),
                        RowBounds::default(),
                        None,
                    )?;
                    rsw.close()?;
                    self.nested_result_objects.clear();
                    Value::List(collector.into_result_list())
                }
                OutputParameter::Value(raw) => mapping.type_handler.convert(raw)?,
            };
            trace!(property = %mapping.property, "setting output parameter");
            target.set(&mapping.property, value)?;
        }
        Ok(())
    }

    fn handle_row_values(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        handler: Option<&mut (dyn ResultHandler + '_)>,
        bounds: RowBounds,
        parent_mapping: Option<&ResultMapping>,
    ) -> Result<()> {
        if result_map.has_nested_result_maps() {
            self.ensure_no_row_bounds()?;
            self.check_result_handler()?;
            self.handle_row_values_for_nested_result_map(
                rsw,
                result_map,
                handler,
                bounds,
                parent_mapping,
            )
        } else {
            self.handle_row_values_for_simple_result_map(
                rsw,
                result_map,
                handler,
                bounds,
                parent_mapping,
            )
        }
    }

    fn ensure_no_row_bounds(&self) -> Result<()> {
        if self.settings.safe_row_bounds_enabled && self.bounds.is_bounded() {
            return Err(Error::RowBoundsNotAllowed(self.statement.id.clone()));
        }
        Ok(())
    }

    fn check_result_handler(&self) -> Result<()> {
        if self.has_custom_handler
            && self.settings.safe_result_handler_enabled
            && !self.statement.result_ordered
        {
            return Err(Error::ResultHandlerNotAllowed(self.statement.id.clone()));
        }
        Ok(())
    }

    // =========================================================================
    // Simple result maps
    // =========================================================================

    fn handle_row_values_for_simple_result_map(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        mut handler: Option<&mut (dyn ResultHandler + '_)>,
        bounds: RowBounds,
        parent_mapping: Option<&ResultMapping>,
    ) -> Result<()> {
        let statement = self.statement;
        let mut context = ResultContext::new();
        skip_rows(rsw, bounds)?;
        let mut row = bounds.offset();
        while should_process_more_rows(&context, bounds) && rsw.next()? {
            row += 1;
            trace!(statement = %statement.id, row, "mapping row");
            let discriminated = self
                .resolve_discriminated_result_map(rsw, result_map, None)
                .map_err(|e| e.at_row(&statement.id, row))?;
            let row_value = self
                .get_row_value(rsw, &discriminated, None)
                .map_err(|e| e.at_row(&statement.id, row))?;
            self.store_object(handler.as_deref_mut(), &mut context, row_value, parent_mapping, rsw)
                .map_err(|e| e.at_row(&statement.id, row))?;
        }
        Ok(())
    }

    fn store_object(
        &mut self,
        handler: Option<&mut (dyn ResultHandler + '_)>,
        context: &mut ResultContext,
        row_value: Option<Value>,
        parent_mapping: Option<&ResultMapping>,
        rsw: &mut ColumnSet,
    ) -> Result<()> {
        if let Some(parent_mapping) = parent_mapping {
            return self.link_to_parents(rsw, parent_mapping, row_value);
        }
        if let Some(handler) = handler {
            context.next_result_object(row_value.unwrap_or(Value::Null));
            handler.handle_result(context)?;
        }
        Ok(())
    }

    /// Value of one row under a result map without nested maps
    fn get_row_value(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        prefix: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut lazy = 0usize;
        let (object, by_constructor) = match self.create_result_object(rsw, result_map, prefix)? {
            Created::Absent => return Ok(None),
            Created::Scalar(value) => return Ok(Some(value)),
            Created::Object {
                object,
                by_constructor,
            } => (object, by_constructor),
        };
        let mut found = by_constructor;
        if self.should_apply_automatic_mappings(result_map, false) {
            found = self.apply_automatic_mappings(rsw, result_map, &object, prefix)? || found;
        }
        found = self.apply_property_mappings(rsw, result_map, &object, &mut lazy, prefix)? || found;
        found = lazy > 0 || found;
        Ok(self.keep_if_found(object, found))
    }

    fn keep_if_found(&self, object: ObjectRef, found: bool) -> Option<Value> {
        if found || self.settings.return_instance_for_empty_row {
            Some(Value::Object(object))
        } else {
            None
        }
    }

    fn should_apply_automatic_mappings(&self, result_map: &ResultMap, nested: bool) -> bool {
        match result_map.auto_mapping() {
            Some(enabled) => enabled,
            None if nested => self.settings.auto_mapping_behavior == AutoMappingBehavior::Full,
            None => self.settings.auto_mapping_behavior != AutoMappingBehavior::None,
        }
    }

    // =========================================================================
    // Property mappings
    // =========================================================================

    fn apply_property_mappings(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        object: &ObjectRef,
        lazy: &mut usize,
        prefix: Option<&str>,
    ) -> Result<bool> {
        let mapped = rsw.mapped_column_names(result_map, prefix);
        let mut found = false;
        for mapping in result_map.property_result_mappings() {
            let column = match mapping.nested_result_map_id {
                // A column on a nested result map mapping is ignored
                Some(_) => None,
                None => prepend_prefix(mapping.column.as_deref(), prefix),
            };
            let column_present = column
                .as_ref()
                .is_some_and(|c| mapped.contains(&c.to_uppercase()));
            if !(mapping.is_composite() || column_present || mapping.result_set.is_some()) {
                continue;
            }
            let value = self.get_property_mapping_value(rsw, object, mapping, lazy, prefix)?;
            let Some(property) = mapping.property.as_deref() else {
                continue;
            };
            match value {
                MappedValue::Deferred => found = true,
                MappedValue::Value(value) => {
                    if !value.is_null() {
                        found = true;
                    }
                    if !value.is_null() || self.settings.call_setters_on_nulls {
                        object.set(property, value)?;
                    }
                }
            }
        }
        Ok(found)
    }

    fn get_property_mapping_value(
        &mut self,
        rsw: &mut ColumnSet,
        object: &ObjectRef,
        mapping: &ResultMapping,
        lazy: &mut usize,
        prefix: Option<&str>,
    ) -> Result<MappedValue> {
        if mapping.nested_query_id.is_some() {
            return self.get_nested_query_mapping_value(rsw, object, mapping, lazy, prefix);
        }
        if mapping.result_set.is_some() {
            self.add_pending_child_relation(rsw, object, mapping)?;
            return Ok(MappedValue::Deferred);
        }
        let column = prepend_prefix(mapping.column.as_deref(), prefix).unwrap_or_default();
        let value_type = property_type(&object.descriptor(), mapping);
        let handler = self.column_handler(rsw, mapping, &value_type, &column);
        Ok(MappedValue::Value(rsw.read(handler.as_ref(), &column)?))
    }

    /// The mapping's own converter, else the one for the column's kind
    fn column_handler(
        &self,
        rsw: &mut ColumnSet,
        mapping: &ResultMapping,
        value_type: &ValueType,
        column: &str,
    ) -> Arc<dyn TypeHandler> {
        match &mapping.type_handler {
            Some(handler) => Arc::clone(handler),
            None => rsw.type_handler(self.configuration.type_handlers(), value_type, column),
        }
    }

    // =========================================================================
    // Automatic mappings
    // =========================================================================

    fn create_automatic_mappings(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &ResultMap,
        descriptor: &TypeDescriptor,
        prefix: Option<&str>,
    ) -> Result<Arc<[AutoMapping]>> {
        let key = format!("{}:{}", result_map.id(), prefix.unwrap_or(""));
        if let Some(cached) = self.auto_mappings.get(&key) {
            return Ok(Arc::clone(cached));
        }
        let registry = self.configuration.type_handlers();
        let camel_case = self.settings.map_underscore_to_camel_case;
        let mut auto_mappings = Vec::new();
        for column in rsw.unmapped_column_names(result_map, prefix).iter() {
            let property_name = match prefix.filter(|p| !p.is_empty()) {
                Some(p) => match strip_prefix_ignore_case(column, p) {
                    Some(rest) => rest,
                    None => continue,
                },
                None => column.as_str(),
            };
            match descriptor.find_property(property_name, camel_case) {
                Some(property) if descriptor.has_setter(&property) => {
                    if result_map.mapped_properties().contains(&property) {
                        continue;
                    }
                    let property_type = descriptor.setter_type(&property).unwrap_or_default();
                    if registry.has_handler(&property_type, Some(rsw.jdbc_type(column))) {
                        let handler = rsw.type_handler(registry, &property_type, column);
                        auto_mappings.push(AutoMapping {
                            column: column.clone(),
                            property,
                            handler,
                        });
                    } else {
                        self.unknown_column(result_map, column, &property)?;
                    }
                }
                Some(property) => self.unknown_column(result_map, column, &property)?,
                None => self.unknown_column(result_map, column, property_name)?,
            }
        }
        let auto_mappings: Arc<[AutoMapping]> = Arc::from(auto_mappings);
        self.auto_mappings.insert(key, Arc::clone(&auto_mappings));
        Ok(auto_mappings)
    }

    fn unknown_column(&self, result_map: &ResultMap, column: &str, property: &str) -> Result<()> {
        match self.settings.auto_mapping_unknown_column_behavior {
            UnknownColumnBehavior::None => Ok(()),
            UnknownColumnBehavior::Warning => {
                warn!(
                    statement = %self.statement.id,
                    result_map = %result_map.id(),
                    column,
                    property,
                    "unknown column detected on automatic mapping"
                );
                Ok(())
            }
            UnknownColumnBehavior::Failing => {
                Err(Error::unknown_column(result_map.id(), column, property))
            }
        }
    }

    fn apply_automatic_mappings(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &ResultMap,
        object: &ObjectRef,
        prefix: Option<&str>,
    ) -> Result<bool> {
        let descriptor = object.descriptor();
        let auto_mappings = self.create_automatic_mappings(rsw, result_map, &descriptor, prefix)?;
        let mut found = false;
        for mapping in auto_mappings.iter() {
            let value = rsw.read(mapping.handler.as_ref(), &mapping.column)?;
            if !value.is_null() {
                found = true;
            }
            if !value.is_null() || self.settings.call_setters_on_nulls {
                object.set(&mapping.property, value)?;
            }
        }
        Ok(found)
    }

    // =========================================================================
    // Secondary result sets
    // =========================================================================

    fn link_to_parents(
        &mut self,
        rsw: &mut ColumnSet,
        parent_mapping: &ResultMapping,
        row_value: Option<Value>,
    ) -> Result<()> {
        let Some(row_value) = row_value else {
            return Ok(());
        };
        let key = self.create_key_for_multiple_results(
            rsw,
            parent_mapping,
            parent_mapping.column.as_deref(),
            parent_mapping.foreign_column.as_deref(),
        )?;
        let parents = self.pending_relations.get(&key).cloned().unwrap_or_default();
        for parent in parents {
            self.link_objects(&parent.target, &parent.mapping, row_value.clone())?;
        }
        Ok(())
    }

    fn add_pending_child_relation(
        &mut self,
        rsw: &mut ColumnSet,
        object: &ObjectRef,
        mapping: &ResultMapping,
    ) -> Result<()> {
        let key = self.create_key_for_multiple_results(
            rsw,
            mapping,
            mapping.column.as_deref(),
            mapping.column.as_deref(),
        )?;
        // A parent without key values cannot be matched by any child row
        if !key.is_null() {
            self.pending_relations
                .entry(key)
                .or_default()
                .push(PendingRelation {
                    target: object.clone(),
                    mapping: mapping.clone(),
                });
        }
        let Some(result_set) = mapping.result_set.as_deref() else {
            return Ok(());
        };
        match self.next_result_maps.get(result_set) {
            None => {
                self.next_result_maps
                    .insert(result_set.to_string(), mapping.clone());
                Ok(())
            }
            Some(previous) if previous.property == mapping.property => Ok(()),
            Some(_) => Err(Error::DuplicateResultSetBinding(result_set.to_string())),
        }
    }

    /// Key relating parent and child rows of a result set mapping
    ///
    /// `names` always comes from the mapping's `column`; `columns` names
    /// the columns read from the current row, `column` on the parent side
    /// and `foreign_column` on the child side.
    fn create_key_for_multiple_results(
        &self,
        rsw: &ColumnSet,
        mapping: &ResultMapping,
        names: Option<&str>,
        columns: Option<&str>,
    ) -> Result<CacheKey> {
        let mut key = CacheKey::new();
        key.update(format!(
            "{}:{}",
            mapping.result_set.as_deref().unwrap_or(""),
            mapping.property_name()
        ));
        if let (Some(names), Some(columns)) = (names, columns) {
            for (name, column) in split_columns(names).zip(split_columns(columns)) {
                let value = rsw.raw(column)?;
                if !value.is_null() {
                    key.update(name.to_uppercase());
                    key.update(value.to_key_string());
                }
            }
        }
        Ok(key)
    }

    // =========================================================================
    // Instantiation and constructor mapping
    // =========================================================================

    fn create_result_object(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        prefix: Option<&str>,
    ) -> Result<Created> {
        let target = result_map.target();
        if self.has_type_handler_for_result_object(rsw, target) {
            return self.create_primitive_result_object(rsw, result_map, prefix);
        }
        let descriptor = self.configuration.descriptor_for(target)?;
        let constructor_mappings = result_map.constructor_result_mappings();
        if !constructor_mappings.is_empty() {
            return self.create_parameterized_result_object(
                rsw,
                &descriptor,
                constructor_mappings,
                prefix,
            );
        }
        if descriptor.has_default_constructor() {
            return Ok(Created::Object {
                object: ObjectRef::instantiate(&descriptor),
                by_constructor: false,
            });
        }
        if self.should_apply_automatic_mappings(result_map, false) {
            return self.create_by_constructor_signature(rsw, &descriptor);
        }
        Err(Error::CannotInstantiate(target.to_string()))
    }

    fn create_parameterized_result_object(
        &mut self,
        rsw: &mut ColumnSet,
        descriptor: &Arc<TypeDescriptor>,
        constructor_mappings: &[ResultMapping],
        prefix: Option<&str>,
    ) -> Result<Created> {
        let constructor = select_constructor(descriptor, constructor_mappings)?;
        let mut found = false;
        let mut args = Vec::with_capacity(constructor_mappings.len());
        for (mapping, (_, param_type)) in constructor_mappings.iter().zip(&constructor.params) {
            let value = if mapping.nested_query_id.is_some() {
                self.get_nested_query_constructor_value(rsw, mapping, param_type, prefix)?
            } else if let Some(nested_id) = &mapping.nested_result_map_id {
                let nested = self.configuration.result_map(nested_id)?;
                let nested_prefix = column_prefix(prefix, mapping);
                self.get_row_value(rsw, &nested, nested_prefix.as_deref())?
                    .unwrap_or(Value::Null)
            } else {
                let column = prepend_prefix(mapping.column.as_deref(), prefix).unwrap_or_default();
                let value_type = if mapping.value_type == ValueType::Any {
                    param_type.clone()
                } else {
                    mapping.value_type.clone()
                };
                let handler = self.column_handler(rsw, mapping, &value_type, &column);
                rsw.read(handler.as_ref(), &column)?
            };
            found |= !value.is_null();
            args.push(value);
        }
        if !found {
            return Ok(Created::Absent);
        }
        let record = Record::with_constructor(Arc::clone(descriptor), constructor, args)?;
        Ok(Created::Object {
            object: ObjectRef::new(record),
            by_constructor: true,
        })
    }

    /// Pick a constructor whose parameter types accept the columns in order
    fn create_by_constructor_signature(
        &mut self,
        rsw: &mut ColumnSet,
        descriptor: &Arc<TypeDescriptor>,
    ) -> Result<Created> {
        let constructors = descriptor.constructors();
        let preferred = if constructors.len() == 1 {
            constructors.first()
        } else {
            constructors.iter().find(|c| c.automap)
        };
        let constructor = match preferred {
            Some(c) => c,
            None => {
                let registry = self.configuration.type_handlers();
                let jdbc_types = rsw.jdbc_types();
                let allowed: Vec<&ConstructorDescriptor> = constructors
                    .iter()
                    .filter(|c| {
                        c.params.len() == jdbc_types.len()
                            && c.param_types()
                                .zip(jdbc_types)
                                .all(|(t, j)| registry.has_handler(t, Some(*j)))
                    })
                    .collect();
                match allowed.as_slice() {
                    [only] => *only,
                    [] => {
                        return Err(Error::NoConstructor {
                            type_name: descriptor.name().to_string(),
                            columns: describe_columns(rsw),
                        })
                    }
                    _ => {
                        return Err(Error::AmbiguousConstructor {
                            type_name: descriptor.name().to_string(),
                            columns: describe_columns(rsw),
                        })
                    }
                }
            }
        };

        let columns = rsw.column_names().to_vec();
        let mut found = false;
        let mut args = Vec::with_capacity(constructor.params.len());
        for (i, (_, param_type)) in constructor.params.iter().enumerate() {
            let column = columns.get(i).ok_or(Error::ColumnIndexOutOfBounds {
                index: i,
                count: columns.len(),
            })?;
            let handler = rsw.type_handler(self.configuration.type_handlers(), param_type, column);
            let value = rsw.read(handler.as_ref(), column)?;
            found |= !value.is_null();
            args.push(value);
        }
        if !found {
            return Ok(Created::Absent);
        }
        let record = Record::with_constructor(Arc::clone(descriptor), constructor, args)?;
        Ok(Created::Object {
            object: ObjectRef::new(record),
            by_constructor: true,
        })
    }

    fn create_primitive_result_object(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &ResultMap,
        prefix: Option<&str>,
    ) -> Result<Created> {
        let column = match result_map.result_mappings().first() {
            Some(mapping) => prepend_prefix(mapping.column.as_deref(), prefix).unwrap_or_default(),
            None => rsw
                .column_names()
                .first()
                .cloned()
                .ok_or(Error::ColumnIndexOutOfBounds { index: 0, count: 0 })?,
        };
        let handler =
            rsw.type_handler(self.configuration.type_handlers(), result_map.target(), &column);
        Ok(Created::Scalar(rsw.read(handler.as_ref(), &column)?))
    }

    /// Returns true if rows convert to the target type directly
    fn has_type_handler_for_result_object(&self, rsw: &ColumnSet, target: &ValueType) -> bool {
        if matches!(target, ValueType::Map | ValueType::Object(_) | ValueType::List) {
            return false;
        }
        let registry = self.configuration.type_handlers();
        match rsw.jdbc_types() {
            [only] => registry.has_handler(target, Some(*only)),
            _ => registry.has_handler(target, None),
        }
    }

    // =========================================================================
    // Nested queries
    // =========================================================================

    fn get_nested_query_constructor_value(
        &mut self,
        rsw: &mut ColumnSet,
        mapping: &ResultMapping,
        param_type: &ValueType,
        prefix: Option<&str>,
    ) -> Result<Value> {
        let nested_id = mapping.nested_query_id.as_deref().unwrap_or_default();
        let nested = self.configuration.statement(nested_id)?;
        let parameter =
            self.prepare_parameter_for_nested_query(rsw, mapping, &nested.parameter_type, prefix)?;
        if parameter.is_null() {
            return Ok(Value::Null);
        }
        let bound_sql = nested.bound_sql(&self.configuration, &parameter)?;
        let key = self
            .executor
            .create_cache_key(&nested, &parameter, RowBounds::default(), &bound_sql)?;
        let target_type = if mapping.value_type == ValueType::Any {
            param_type.clone()
        } else {
            mapping.value_type.clone()
        };
        ResultLoader::new(nested_id, parameter, target_type, key).load_result(&mut *self.executor)
    }

    fn get_nested_query_mapping_value(
        &mut self,
        rsw: &mut ColumnSet,
        object: &ObjectRef,
        mapping: &ResultMapping,
        lazy: &mut usize,
        prefix: Option<&str>,
    ) -> Result<MappedValue> {
        let nested_id = mapping.nested_query_id.as_deref().unwrap_or_default();
        let property = mapping.property_name();
        let nested = self.configuration.statement(nested_id)?;
        let parameter =
            self.prepare_parameter_for_nested_query(rsw, mapping, &nested.parameter_type, prefix)?;
        if parameter.is_null() {
            return Ok(MappedValue::Value(Value::Null));
        }
        let bound_sql = nested.bound_sql(&self.configuration, &parameter)?;
        let key = self
            .executor
            .create_cache_key(&nested, &parameter, RowBounds::default(), &bound_sql)?;
        let target_type = property_type(&object.descriptor(), mapping);

        if self.executor.is_cached(&key) {
            self.executor.defer_load(object, property, key, target_type)?;
            return Ok(MappedValue::Deferred);
        }
        let loader = ResultLoader::new(nested_id, parameter, target_type, key);
        if mapping.is_lazy(self.settings.lazy_loading_enabled) {
            trace!(property, statement = %nested_id, "deferring lazy property");
            object.set_deferred(property, loader.into_deferred())?;
            *lazy += 1;
            return Ok(MappedValue::Deferred);
        }
        Ok(MappedValue::Value(loader.load_result(&mut *self.executor)?))
    }

    fn prepare_parameter_for_nested_query(
        &mut self,
        rsw: &mut ColumnSet,
        mapping: &ResultMapping,
        parameter_type: &ValueType,
        prefix: Option<&str>,
    ) -> Result<Value> {
        let registry = self.configuration.type_handlers();
        if !mapping.is_composite() {
            let handler = registry
                .get_handler(parameter_type, None)
                .unwrap_or_else(|| registry.unknown_handler());
            let column = prepend_prefix(mapping.column.as_deref(), prefix).unwrap_or_default();
            return rsw.read(handler.as_ref(), &column);
        }

        let descriptor = match parameter_type {
            ValueType::Object(_) => Some(self.configuration.descriptor_for(parameter_type)?),
            _ => None,
        };
        let mut entries = Vec::new();
        for composite in &mapping.composites {
            let property = composite.property_name();
            let property_type = descriptor
                .as_ref()
                .and_then(|d| d.setter_type(property))
                .unwrap_or_default();
            let handler = registry
                .get_handler(&property_type, None)
                .unwrap_or_else(|| registry.unknown_handler());
            let column = prepend_prefix(composite.column.as_deref(), prefix).unwrap_or_default();
            let value = rsw.read(handler.as_ref(), &column)?;
            // A null key part never runs the nested query
            if !value.is_null() {
                entries.push((property.to_string(), value));
            }
        }
        if entries.is_empty() {
            return Ok(Value::Null);
        }
        match descriptor {
            Some(descriptor) => {
                let object = ObjectRef::instantiate(&descriptor);
                for (property, value) in entries {
                    object.set(&property, value)?;
                }
                Ok(Value::Object(object))
            }
            None => Ok(Value::map(entries)),
        }
    }

    // =========================================================================
    // Discriminators
    // =========================================================================

    /// Follow discriminators from `result_map` to the map this row uses
    ///
    /// Stops at an unmatched value, an unknown map id, or a map already
    /// visited in this resolution.
    pub fn resolve_discriminated_result_map(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        prefix: Option<&str>,
    ) -> Result<Arc<ResultMap>> {
        let mut visited = FxHashSet::default();
        let mut current = Arc::clone(result_map);
        loop {
            let Some(discriminator) = current.discriminator() else {
                break;
            };
            let value = self.discriminator_value(rsw, discriminator, prefix)?;
            let case = if value.is_null() {
                "null".to_string()
            } else {
                value.to_key_string()
            };
            let next = match discriminator.map_id_for(&case) {
                Some(id) if self.configuration.has_result_map(id) => {
                    self.configuration.result_map(id)?
                }
                _ => break,
            };
            let cycle = next.id() == current.id() || !visited.insert(next.id().to_string());
            current = next;
            if cycle {
                break;
            }
        }
        Ok(current)
    }

    fn discriminator_value(
        &self,
        rsw: &mut ColumnSet,
        discriminator: &Discriminator,
        prefix: Option<&str>,
    ) -> Result<Value> {
        let mapping = &discriminator.mapping;
        let column = prepend_prefix(mapping.column.as_deref(), prefix).unwrap_or_default();
        let handler = self.column_handler(rsw, mapping, &mapping.value_type, &column);
        rsw.read(handler.as_ref(), &column)
    }

    // =========================================================================
    // Nested result maps
    // =========================================================================

    fn handle_row_values_for_nested_result_map(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        mut handler: Option<&mut (dyn ResultHandler + '_)>,
        bounds: RowBounds,
        parent_mapping: Option<&ResultMapping>,
    ) -> Result<()> {
        let statement = self.statement;
        let mut context = ResultContext::new();
        skip_rows(rsw, bounds)?;
        let mut row_value: Option<Value> = None;
        let mut row = bounds.offset();
        while should_process_more_rows(&context, bounds) && rsw.next()? {
            row += 1;
            trace!(statement = %statement.id, row, "mapping joined row");
            let discriminated = self
                .resolve_discriminated_result_map(rsw, result_map, None)
                .map_err(|e| e.at_row(&statement.id, row))?;
            let row_key = self
                .create_row_key(rsw, &discriminated, None)
                .map_err(|e| e.at_row(&statement.id, row))?;
            let partial = self.nested_result_objects.get(&row_key).cloned();
            let is_new = partial.is_none();
            let mut ancestors = Ancestors::default();

            if statement.result_ordered {
                if is_new && row_value.is_some() {
                    self.nested_result_objects.clear();
                    self.store_object(
                        handler.as_deref_mut(),
                        &mut context,
                        row_value.take(),
                        parent_mapping,
                        rsw,
                    )
                    .map_err(|e| e.at_row(&statement.id, row))?;
                }
                row_value = self
                    .get_nested_row_value(
                        rsw,
                        &discriminated,
                        &row_key,
                        None,
                        partial,
                        &mut ancestors,
                    )
                    .map_err(|e| e.at_row(&statement.id, row))?;
            } else {
                row_value = self
                    .get_nested_row_value(
                        rsw,
                        &discriminated,
                        &row_key,
                        None,
                        partial,
                        &mut ancestors,
                    )
                    .map_err(|e| e.at_row(&statement.id, row))?;
                if is_new {
                    self.store_object(
                        handler.as_deref_mut(),
                        &mut context,
                        row_value.clone(),
                        parent_mapping,
                        rsw,
                    )
                    .map_err(|e| e.at_row(&statement.id, row))?;
                }
            }
        }
        if statement.result_ordered
            && row_value.is_some()
            && should_process_more_rows(&context, bounds)
        {
            self.store_object(handler, &mut context, row_value, parent_mapping, rsw)?;
        }
        Ok(())
    }

    /// Value of one row under a result map that nests others
    ///
    /// `partial` is the object already built for this row's key; only its
    /// nested mappings are applied again.
    fn get_nested_row_value(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        combined_key: &CacheKey,
        prefix: Option<&str>,
        partial: Option<Value>,
        ancestors: &mut Ancestors,
    ) -> Result<Option<Value>> {
        let result_map_id = result_map.id().to_string();
        if let Some(value) = partial {
            if let Value::Object(object) = &value {
                ancestors.insert(result_map_id.clone(), object.clone());
                let applied = self.apply_nested_result_mappings(
                    rsw,
                    result_map,
                    object,
                    prefix,
                    combined_key,
                    false,
                    ancestors,
                );
                ancestors.remove(&result_map_id);
                applied?;
            }
            return Ok(Some(value));
        }

        let mut lazy = 0usize;
        let row_value = match self.create_result_object(rsw, result_map, prefix)? {
            Created::Absent => None,
            Created::Scalar(value) => Some(value),
            Created::Object {
                object,
                by_constructor,
            } => {
                let mut found = by_constructor;
                if self.should_apply_automatic_mappings(result_map, true) {
                    found =
                        self.apply_automatic_mappings(rsw, result_map, &object, prefix)? || found;
                }
                found = self.apply_property_mappings(rsw, result_map, &object, &mut lazy, prefix)?
                    || found;
                ancestors.insert(result_map_id.clone(), object.clone());
                let nested = self.apply_nested_result_mappings(
                    rsw,
                    result_map,
                    &object,
                    prefix,
                    combined_key,
                    true,
                    ancestors,
                );
                ancestors.remove(&result_map_id);
                found = nested? || found;
                found = lazy > 0 || found;
                self.keep_if_found(object, found)
            }
        };
        if let Some(value) = &row_value {
            if !combined_key.is_null() {
                self.nested_result_objects
                    .insert(combined_key.clone(), value.clone());
            }
        }
        Ok(row_value)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_nested_result_mappings(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        object: &ObjectRef,
        parent_prefix: Option<&str>,
        parent_row_key: &CacheKey,
        new_object: bool,
        ancestors: &mut Ancestors,
    ) -> Result<bool> {
        let mut found = false;
        for mapping in result_map.property_result_mappings() {
            let Some(nested_id) = mapping.nested_result_map_id.as_deref() else {
                continue;
            };
            if mapping.result_set.is_some() {
                continue;
            }
            let prefix = column_prefix(parent_prefix, mapping);
            let nested = self.configuration.result_map(nested_id)?;
            let nested = self.resolve_discriminated_result_map(rsw, &nested, prefix.as_deref())?;

            // Circular references are only filled when no column prefix is set
            if mapping.column_prefix.is_none() {
                if let Some(ancestor) = ancestors.get(nested_id).cloned() {
                    if new_object {
                        self.link_objects(object, mapping, Value::Object(ancestor))?;
                    }
                    continue;
                }
            }

            let row_key = self.create_row_key(rsw, &nested, prefix.as_deref())?;
            let combined_key = row_key.combine(parent_row_key);
            let known = self.nested_result_objects.get(&combined_key).cloned();
            let is_known = known.is_some();
            self.instantiate_collection_property_if_appropriate(mapping, object)?;
            if self.any_not_null_column_has_value(rsw, mapping, prefix.as_deref())? {
                let row_value = self.get_nested_row_value(
                    rsw,
                    &nested,
                    &combined_key,
                    prefix.as_deref(),
                    known,
                    ancestors,
                )?;
                if let Some(row_value) = row_value {
                    if !is_known {
                        self.link_objects(object, mapping, row_value)?;
                        found = true;
                    }
                }
            }
        }
        Ok(found)
    }

    /// Returns false if the nested mapping has nothing in this row
    fn any_not_null_column_has_value(
        &self,
        rsw: &ColumnSet,
        mapping: &ResultMapping,
        prefix: Option<&str>,
    ) -> Result<bool> {
        if !mapping.not_null_columns.is_empty() {
            for column in &mapping.not_null_columns {
                let column = prepend_prefix(Some(column), prefix).unwrap_or_default();
                if !rsw.raw(&column)?.is_null() {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        if let Some(prefix) = prefix {
            return Ok(rsw
                .column_names()
                .iter()
                .any(|c| strip_prefix_ignore_case(c, prefix).is_some()));
        }
        Ok(true)
    }

    // =========================================================================
    // Row identity
    // =========================================================================

    fn create_row_key(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &Arc<ResultMap>,
        prefix: Option<&str>,
    ) -> Result<CacheKey> {
        let mut key = CacheKey::new();
        key.update(result_map.id());
        let mappings = result_map.id_result_mappings();
        if mappings.is_empty() {
            if matches!(result_map.target(), ValueType::Map | ValueType::Any) {
                self.create_row_key_for_map(rsw, &mut key)?;
            } else {
                self.create_row_key_for_unmapped_properties(rsw, result_map, &mut key, prefix)?;
            }
        } else {
            self.create_row_key_for_mapped_properties(rsw, result_map, &mut key, mappings, prefix)?;
        }
        if key.update_count() < 2 {
            return Ok(CacheKey::null_key());
        }
        Ok(key)
    }

    fn create_row_key_for_mapped_properties(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &ResultMap,
        key: &mut CacheKey,
        mappings: &[ResultMapping],
        prefix: Option<&str>,
    ) -> Result<()> {
        for mapping in mappings {
            if let (Some(nested_id), None) = (&mapping.nested_result_map_id, &mapping.result_set) {
                // Constructor arguments of a nested map identify the parent too
                let nested = self.configuration.result_map(nested_id)?;
                let nested_prefix = prepend_prefix(mapping.column_prefix.as_deref(), prefix);
                self.create_row_key_for_mapped_properties(
                    rsw,
                    &nested,
                    key,
                    nested.constructor_result_mappings(),
                    nested_prefix.as_deref(),
                )?;
            } else if mapping.nested_query_id.is_none() {
                let Some(column) = prepend_prefix(mapping.column.as_deref(), prefix) else {
                    continue;
                };
                let mapped = rsw.mapped_column_names(result_map, prefix);
                if !mapped.contains(&column.to_uppercase()) {
                    continue;
                }
                let handler = self.column_handler(rsw, mapping, &mapping.value_type, &column);
                let value = rsw.read(handler.as_ref(), &column)?;
                if !value.is_null() || self.settings.return_instance_for_empty_row {
                    key.update(column);
                    key.update(value);
                }
            }
        }
        Ok(())
    }

    fn create_row_key_for_unmapped_properties(
        &mut self,
        rsw: &mut ColumnSet,
        result_map: &ResultMap,
        key: &mut CacheKey,
        prefix: Option<&str>,
    ) -> Result<()> {
        let Ok(descriptor) = self.configuration.descriptor_for(result_map.target()) else {
            return Ok(());
        };
        let camel_case = self.settings.map_underscore_to_camel_case;
        for column in rsw.unmapped_column_names(result_map, prefix).iter() {
            let property = match prefix.filter(|p| !p.is_empty()) {
                Some(p) => match strip_prefix_ignore_case(column, p) {
                    Some(rest) => rest,
                    None => continue,
                },
                None => column.as_str(),
            };
            if descriptor.find_property(property, camel_case).is_some() {
                let value = rsw.raw(column)?;
                if !value.is_null() {
                    key.update(column.as_str());
                    key.update(value.to_key_string());
                }
            }
        }
        Ok(())
    }

    fn create_row_key_for_map(&self, rsw: &ColumnSet, key: &mut CacheKey) -> Result<()> {
        for column in rsw.column_names() {
            let value = rsw.raw(column)?;
            if !value.is_null() {
                key.update(column.as_str());
                key.update(value.to_key_string());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Linking
    // =========================================================================

    fn link_objects(
        &self,
        object: &ObjectRef,
        mapping: &ResultMapping,
        row_value: Value,
    ) -> Result<()> {
        let property = mapping.property_name();
        if self.instantiate_collection_property_if_appropriate(mapping, object)? {
            object.push(property, row_value)
        } else {
            object.set(property, row_value)
        }
    }

    /// Create the list behind a collection property on first use
    ///
    /// Returns true if the property holds a list.
    fn instantiate_collection_property_if_appropriate(
        &self,
        mapping: &ResultMapping,
        object: &ObjectRef,
    ) -> Result<bool> {
        let property = mapping.property_name();
        match object.get(property) {
            Some(Value::List(_)) => Ok(true),
            None | Some(Value::Null) => {
                if property_type(&object.descriptor(), mapping) == ValueType::List {
                    object.set(property, Value::List(Vec::new()))?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Some(_) => Ok(false),
        }
    }
}

fn skip_rows(rsw: &mut ColumnSet, bounds: RowBounds) -> Result<()> {
    for _ in 0..bounds.offset() {
        if !rsw.next()? {
            break;
        }
    }
    Ok(())
}

fn should_process_more_rows(context: &ResultContext, bounds: RowBounds) -> bool {
    !context.is_stopped() && context.result_count() < bounds.limit()
}

fn prepend_prefix(column: Option<&str>, prefix: Option<&str>) -> Option<String> {
    match (column, prefix) {
        (Some(column), Some(prefix)) if !column.is_empty() && !prefix.is_empty() => {
            Some(format!("{}{}", prefix, column))
        }
        (column, _) => column.map(str::to_string),
    }
}

/// Upper-cased prefix of a nested mapping's columns
fn column_prefix(parent_prefix: Option<&str>, mapping: &ResultMapping) -> Option<String> {
    let mut prefix = String::new();
    if let Some(parent) = parent_prefix {
        prefix.push_str(parent);
    }
    if let Some(own) = &mapping.column_prefix {
        prefix.push_str(own);
    }
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_uppercase())
    }
}

/// Declared type of a mapping, else its property's type on the target
fn property_type(descriptor: &TypeDescriptor, mapping: &ResultMapping) -> ValueType {
    if mapping.value_type != ValueType::Any {
        return mapping.value_type.clone();
    }
    mapping
        .property
        .as_deref()
        .and_then(|p| descriptor.setter_type(p))
        .unwrap_or_default()
}

fn select_constructor<'d>(
    descriptor: &'d TypeDescriptor,
    mappings: &[ResultMapping],
) -> Result<&'d ConstructorDescriptor> {
    let names: Vec<&str> = mappings.iter().filter_map(|m| m.property.as_deref()).collect();
    let candidates: Vec<&ConstructorDescriptor> = if names.len() == mappings.len() {
        descriptor
            .constructors()
            .iter()
            .filter(|c| c.has_param_names(&names))
            .collect()
    } else {
        descriptor
            .constructors()
            .iter()
            .filter(|c| c.params.len() == mappings.len())
            .collect()
    };
    let columns = || {
        mappings
            .iter()
            .map(|m| m.column.as_deref().unwrap_or(m.property_name()).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match candidates.as_slice() {
        [only] => Ok(*only),
        [] => Err(Error::NoConstructor {
            type_name: descriptor.name().to_string(),
            columns: columns(),
        }),
        _ => {
            let typed: Vec<&ConstructorDescriptor> = candidates
                .iter()
                .copied()
                .filter(|c| {
                    c.param_types()
                        .zip(mappings)
                        .all(|(t, m)| m.value_type == ValueType::Any || *t == m.value_type)
                })
                .collect();
            match typed.as_slice() {
                [only] => Ok(*only),
                _ => Err(Error::AmbiguousConstructor {
                    type_name: descriptor.name().to_string(),
                    columns: columns(),
                }),
            }
        }
    }
}

fn describe_columns(rsw: &ColumnSet) -> String {
    rsw.column_names()
        .iter()
        .zip(rsw.jdbc_types())
        .map(|(c, t)| format!("{} {}", c, t))
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_columns(columns: &str) -> impl Iterator<Item = &str> {
    columns.split(',').map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::cursor::MemoryCursor;
    use crate::types::TypeHandlerRegistry;

    fn mapping(property: &str, column: &str) -> ResultMapping {
        ResultMapping::builder(Some(property), Some(column))
            .build(&TypeHandlerRegistry::new())
            .unwrap()
    }

    /// Executor that only hands out its configuration
    struct ConfigOnly(Arc<Configuration>);

    impl Executor for ConfigOnly {
        fn configuration(&self) -> Arc<Configuration> {
            self.0.clone()
        }

        fn query(
            &mut self,
            _statement: &MappedStatement,
            _parameter: &Value,
            _bounds: RowBounds,
            _key: CacheKey,
            _bound_sql: &BoundSql,
        ) -> Result<Vec<Value>> {
            Err(Error::backend("no queries"))
        }

        fn create_cache_key(
            &self,
            _statement: &MappedStatement,
            _parameter: &Value,
            _bounds: RowBounds,
            _bound_sql: &BoundSql,
        ) -> Result<CacheKey> {
            Ok(CacheKey::new())
        }

        fn is_cached(&self, _key: &CacheKey) -> bool {
            false
        }

        fn defer_load(
            &mut self,
            _target: &ObjectRef,
            _property: &str,
            _key: CacheKey,
            _target_type: ValueType,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_null_parent_key_not_pending() {
        let mut executor = ConfigOnly(Arc::new(Configuration::new()));
        let statement = MappedStatement::new(
            "posts",
            crate::mapping::SqlCommandType::Select,
            crate::scripting::SqlSource::static_sql("select * from post", Vec::new()),
        );
        let mut handler = ResultSetHandler::new(&mut executor, &statement, RowBounds::default());
        let comments = ResultMapping::builder(Some("comments"), Some("id"))
            .nested_result_map("ns.comment")
            .result_set("comments")
            .foreign_column("post_id")
            .build(&TypeHandlerRegistry::new())
            .unwrap();
        let cursor = MemoryCursor::from_rows(
            &["id"],
            vec![vec![Value::Null], vec![Value::integer(1)]],
        );
        let mut rsw = ColumnSet::new(Box::new(cursor));
        let parent = ObjectRef::instantiate(&TypeDescriptor::map("map"));

        assert!(rsw.next().unwrap());
        handler
            .add_pending_child_relation(&mut rsw, &parent, &comments)
            .unwrap();
        assert!(handler.pending_relations.is_empty());
        // The result set is still linked for later parents
        assert!(handler.next_result_maps.contains_key("comments"));

        assert!(rsw.next().unwrap());
        handler
            .add_pending_child_relation(&mut rsw, &parent, &comments)
            .unwrap();
        assert_eq!(handler.pending_relations.len(), 1);
    }

    #[test]
    fn test_prepend_prefix() {
        assert_eq!(prepend_prefix(Some("id"), Some("I_")), Some("I_id".to_string()));
        assert_eq!(prepend_prefix(Some("id"), None), Some("id".to_string()));
        assert_eq!(prepend_prefix(Some("id"), Some("")), Some("id".to_string()));
        assert_eq!(prepend_prefix(None, Some("I_")), None);
    }

    #[test]
    fn test_column_prefix_accumulates() {
        let plain = mapping("items", "id");
        assert_eq!(column_prefix(None, &plain), None);
        assert_eq!(column_prefix(Some("o_"), &plain), Some("O_".to_string()));

        let prefixed = ResultMapping::builder(Some("items"), None)
            .nested_result_map("ns.item")
            .column_prefix("i_")
            .build(&TypeHandlerRegistry::new())
            .unwrap();
        assert_eq!(column_prefix(Some("o_"), &prefixed), Some("O_I_".to_string()));
    }

    #[test]
    fn test_split_columns() {
        let parts: Vec<&str> = split_columns(" id, name ,,kind").collect();
        assert_eq!(parts, vec!["id", "name", "kind"]);
    }

    #[test]
    fn test_select_constructor_by_names_and_types() {
        let descriptor = TypeDescriptor::builder("Point")
            .field("x", ValueType::Integer)
            .field("y", ValueType::Integer)
            .field("label", ValueType::Text)
            .constructor(&[("x", ValueType::Integer), ("y", ValueType::Integer)])
            .constructor(&[("x", ValueType::Integer), ("label", ValueType::Text)])
            .build()
            .unwrap();
        let named = vec![mapping("x", "x"), mapping("y", "y")];
        let chosen = select_constructor(&descriptor, &named).unwrap();
        assert_eq!(chosen.params[1].0, "y");

        // Unnamed arguments fall back to arity, then to declared types
        let registry = TypeHandlerRegistry::new();
        let unnamed = vec![
            ResultMapping::builder(None, Some("a"))
                .value_type(ValueType::Integer)
                .build(&registry)
                .unwrap(),
            ResultMapping::builder(None, Some("b"))
                .value_type(ValueType::Text)
                .build(&registry)
                .unwrap(),
        ];
        let chosen = select_constructor(&descriptor, &unnamed).unwrap();
        assert_eq!(chosen.params[1].0, "label");

        let untyped = vec![
            ResultMapping::builder(None, Some("a")).build(&registry).unwrap(),
            ResultMapping::builder(None, Some("b")).build(&registry).unwrap(),
        ];
        assert!(matches!(
            select_constructor(&descriptor, &untyped),
            Err(Error::AmbiguousConstructor { .. })
        ));
    }
}
