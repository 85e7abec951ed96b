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

//! Session executor
//!
//! A [`Session`] runs mapped statements against a [`StatementBackend`] and
//! keeps a local cache of result lists for its lifetime. The cache serves
//! repeated queries and resolves circular nested queries: a sub-query
//! whose key is still executing is queued as a deferred load and filled
//! once the outermost query returns.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::core::{CacheKey, Error, ObjectRef, ParameterMode, Result, Value, ValueType};
use crate::mapping::{Configuration, LocalCacheScope, MappedStatement};
use crate::scripting::BoundSql;

use super::cursor::{OutputParameter, RowCursor};
use super::loader::{DeferredLoad, ResultLoader};
use super::result_handler::ResultHandler;
use super::result_set_handler::ResultSetHandler;
use super::row_bounds::RowBounds;

/// Executes compiled statements for a host database driver
pub trait StatementBackend {
    /// Run a query; one cursor per result set, in order
    fn query(&mut self, sql: &str, parameters: &[Value]) -> Result<Vec<Box<dyn RowCursor>>>;

    /// Run a statement that returns an affected-row count
    fn update(&mut self, sql: &str, parameters: &[Value]) -> Result<u64>;

    /// OUT and INOUT values of the last statement, one per marker in order
    ///
    /// Only called when the statement declares such markers. Backends
    /// without stored procedure support report none.
    fn output_parameters(&mut self) -> Result<Vec<OutputParameter>> {
        Ok(Vec::new())
    }
}

/// Query execution as seen by the result mapping engine
pub trait Executor {
    fn configuration(&self) -> Arc<Configuration>;

    fn query(
        &mut self,
        statement: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>>;

    fn create_cache_key(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<CacheKey>;

    /// Returns true if `key` has results or is executing right now
    fn is_cached(&self, key: &CacheKey) -> bool;

    /// Fill `property` of `target` from the cached results of `key`
    ///
    /// Runs at once when the results are ready, else after the outermost
    /// query returns.
    fn defer_load(
        &mut self,
        target: &ObjectRef,
        property: &str,
        key: CacheKey,
        target_type: ValueType,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
enum CacheEntry {
    /// The query with this key is running
    Placeholder,
    Results(Vec<Value>),
}

/// A unit of work over one backend connection
pub struct Session<B: StatementBackend> {
    configuration: Arc<Configuration>,
    backend: B,
    local_cache: FxHashMap<CacheKey, CacheEntry>,
    /// OUT values of cached calls, restored onto the parameter on a hit
    output_cache: FxHashMap<CacheKey, Vec<(String, Value)>>,
    deferred_loads: VecDeque<DeferredLoad>,
    query_stack: usize,
    closed: bool,
}

impl<B: StatementBackend> Session<B> {
    pub fn new(configuration: Arc<Configuration>, backend: B) -> Self {
        Session {
            configuration,
            backend,
            local_cache: FxHashMap::default(),
            output_cache: FxHashMap::default(),
            deferred_loads: VecDeque::new(),
            query_stack: 0,
            closed: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Every result of a query
    pub fn select_list(&mut self, statement_id: &str, parameter: &Value) -> Result<Vec<Value>> {
        self.select_with_bounds(statement_id, parameter, RowBounds::default())
    }

    /// The single result of a query, if any
    ///
    /// Fails with `TooManyResults` when the query yields more than one.
    pub fn select_one(&mut self, statement_id: &str, parameter: &Value) -> Result<Option<Value>> {
        let mut list = self.select_list(statement_id, parameter)?;
        match list.len() {
            0 => Ok(None),
            1 => Ok(list.pop()),
            n => Err(Error::TooManyResults(n)),
        }
    }

    /// The results of a query within `bounds`
    pub fn select_with_bounds(
        &mut self,
        statement_id: &str,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let statement = self.configuration.statement(statement_id)?;
        let bound_sql = statement.bound_sql(&self.configuration, parameter)?;
        let key = self.create_cache_key(&statement, parameter, bounds, &bound_sql)?;
        self.query(&statement, parameter, bounds, key, &bound_sql)
    }

    /// Stream the results of a query into `handler`
    ///
    /// The local cache is never read for a handled query.
    pub fn select_with_handler(
        &mut self,
        statement_id: &str,
        parameter: &Value,
        bounds: RowBounds,
        handler: &mut dyn ResultHandler,
    ) -> Result<()> {
        self.ensure_open()?;
        let statement = self.configuration.statement(statement_id)?;
        let bound_sql = statement.bound_sql(&self.configuration, parameter)?;
        let key = self.create_cache_key(&statement, parameter, bounds, &bound_sql)?;
        self.run_query(&statement, bounds, key, &bound_sql, Some(handler))?;
        Ok(())
    }

    /// Run an insert, update or delete; clears the local cache first
    pub fn update(&mut self, statement_id: &str, parameter: &Value) -> Result<u64> {
        self.ensure_open()?;
        self.clear_local_cache();
        let statement = self.configuration.statement(statement_id)?;
        let bound_sql = statement.bound_sql(&self.configuration, parameter)?;
        let parameters = bound_sql.parameter_values(&self.configuration)?;
        debug!(statement = %statement.id, sql = %bound_sql.sql(), "executing update");
        let count = self.backend.update(bound_sql.sql(), &parameters)?;
        if bound_sql.has_output_parameters() {
            let outputs = self.backend.output_parameters()?;
            ResultSetHandler::new(self, &statement, RowBounds::default())
                .handle_output_parameters(&bound_sql, outputs)?;
        }
        Ok(count)
    }

    pub fn clear_local_cache(&mut self) {
        if !self.closed {
            self.local_cache.clear();
            self.output_cache.clear();
        }
    }

    /// Release the session; later calls fail with `ExecutorClosed`
    pub fn close(&mut self) {
        self.local_cache.clear();
        self.output_cache.clear();
        self.deferred_loads.clear();
        self.closed = true;
    }

    /// Load every lazy field of `object`
    pub fn load_deferred(&mut self, object: &ObjectRef) -> Result<()> {
        self.ensure_open()?;
        for (property, field) in object.take_deferred() {
            trace!(property = %property, statement = %field.statement_id, "loading lazy property");
            let value = ResultLoader::from_deferred(field).load_result(self)?;
            object.set(&property, value)?;
        }
        Ok(())
    }

    /// Load the lazy fields of every object reachable from `root`
    ///
    /// Each object is visited once, so cyclic graphs terminate.
    pub fn load_graph(&mut self, root: &Value) -> Result<()> {
        let mut visited = FxHashSet::default();
        let mut pending = vec![root.clone()];
        while let Some(value) = pending.pop() {
            match value {
                Value::Object(object) => {
                    if !visited.insert(object.addr()) {
                        continue;
                    }
                    self.load_deferred(&object)?;
                    pending.extend(object.fields().into_iter().map(|(_, state)| state.value()));
                }
                Value::List(items) => pending.extend(items),
                Value::Map(entries) => pending.extend(entries.into_values()),
                _ => {}
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ExecutorClosed);
        }
        Ok(())
    }

    fn run_query(
        &mut self,
        statement: &MappedStatement,
        bounds: RowBounds,
        key: CacheKey,
        bound_sql: &BoundSql,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        if self.query_stack == 0 && statement.flush_cache {
            self.clear_local_cache();
        }
        self.query_stack += 1;
        let cached = match (&handler, self.local_cache.get(&key)) {
            (None, Some(CacheEntry::Results(list))) => Some(list.clone()),
            _ => None,
        };
        let result = match cached {
            Some(list) => {
                debug!(statement = %statement.id, "local cache hit");
                self.restore_output_parameters(&key, bound_sql).map(|()| list)
            }
            None => self.query_from_backend(statement, bounds, key, bound_sql, handler),
        };
        self.query_stack -= 1;

        if self.query_stack == 0 {
            while let Some(load) = self.deferred_loads.pop_front() {
                if let Some(CacheEntry::Results(list)) = self.local_cache.get(load.key()) {
                    load.load(list.clone())?;
                }
            }
            if self.configuration.settings().local_cache_scope == LocalCacheScope::Statement {
                self.clear_local_cache();
            }
        }
        result
    }

    fn query_from_backend(
        &mut self,
        statement: &MappedStatement,
        bounds: RowBounds,
        key: CacheKey,
        bound_sql: &BoundSql,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Value>> {
        // A custom handler consumes the rows, so there is nothing to cache
        let handled = handler.is_some();
        self.local_cache.insert(key.clone(), CacheEntry::Placeholder);
        let result = self.do_query(statement, bounds, bound_sql, handler);
        self.local_cache.remove(&key);
        let list = result?;
        if !handled {
            if bound_sql.has_output_parameters() {
                let outputs = Self::snapshot_output_parameters(bound_sql)?;
                self.output_cache.insert(key.clone(), outputs);
            }
            self.local_cache.insert(key, CacheEntry::Results(list.clone()));
        }
        Ok(list)
    }

    fn do_query(
        &mut self,
        statement: &MappedStatement,
        bounds: RowBounds,
        bound_sql: &BoundSql,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Value>> {
        let parameters = bound_sql.parameter_values(&self.configuration)?;
        debug!(statement = %statement.id, sql = %bound_sql.sql(), "executing query");
        let cursors = self.backend.query(bound_sql.sql(), &parameters)?;
        let outputs = if bound_sql.has_output_parameters() {
            self.backend.output_parameters()?
        } else {
            Vec::new()
        };
        let mut result_handler = ResultSetHandler::new(self, statement, bounds);
        let list = result_handler.handle_result_sets(cursors, handler)?;
        result_handler.handle_output_parameters(bound_sql, outputs)?;
        Ok(list)
    }

    fn snapshot_output_parameters(bound_sql: &BoundSql) -> Result<Vec<(String, Value)>> {
        let parameter = bound_sql.parameter_object();
        bound_sql
            .parameter_mappings()
            .iter()
            .filter(|mapping| mapping.mode != ParameterMode::In)
            .map(|mapping| Ok((mapping.property.clone(), parameter.get_path(&mapping.property)?)))
            .collect()
    }

    fn restore_output_parameters(&self, key: &CacheKey, bound_sql: &BoundSql) -> Result<()> {
        let (Some(outputs), Some(target)) = (
            self.output_cache.get(key),
            bound_sql.parameter_object().as_object(),
        ) else {
            return Ok(());
        };
        for (property, value) in outputs {
            target.set(property, value.clone())?;
        }
        Ok(())
    }

    /// Positional parameter values before conversion, as the cache key sees them
    fn raw_parameter_values(&self, bound_sql: &BoundSql) -> Result<Vec<Value>> {
        let registry = self.configuration.type_handlers();
        let parameter = bound_sql.parameter_object();
        let mut values = Vec::with_capacity(bound_sql.parameter_mappings().len());
        for mapping in bound_sql.parameter_mappings() {
            if mapping.mode == ParameterMode::Out {
                continue;
            }
            let property = mapping.property.as_str();
            let value = if bound_sql.has_additional_parameter(property) {
                bound_sql.additional_parameter(property)?
            } else if parameter.is_null() {
                Value::Null
            } else if registry.has_handler_for_value(parameter) {
                parameter.clone()
            } else {
                parameter.get_path(property)?
            };
            values.push(value);
        }
        Ok(values)
    }
}

impl<B: StatementBackend> Executor for Session<B> {
    fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.configuration)
    }

    fn query(
        &mut self,
        statement: &MappedStatement,
        _parameter: &Value,
        bounds: RowBounds,
        key: CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<Value>> {
        self.run_query(statement, bounds, key, bound_sql, None)
    }

    fn create_cache_key(
        &self,
        statement: &MappedStatement,
        _parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<CacheKey> {
        self.ensure_open()?;
        let mut key = CacheKey::new();
        key.update(statement.id.as_str());
        key.update(bounds.offset());
        key.update(bounds.limit());
        key.update(bound_sql.sql());
        key.update_all(self.raw_parameter_values(bound_sql)?);
        if let Some(environment) = self.configuration.environment_id() {
            key.update(environment);
        }
        Ok(key)
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        self.local_cache.contains_key(key)
    }

    fn defer_load(
        &mut self,
        target: &ObjectRef,
        property: &str,
        key: CacheKey,
        target_type: ValueType,
    ) -> Result<()> {
        self.ensure_open()?;
        let load = DeferredLoad::new(target.clone(), property, key, target_type);
        match self.local_cache.get(load.key()) {
            Some(CacheEntry::Results(list)) => load.load(list.clone()),
            _ => {
                trace!(property, "queueing deferred load");
                self.deferred_loads.push_back(load);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MapperBuilder, StatementDef};
    use crate::executor::cursor::MemoryCursor;
    use crate::scripting::SqlNode;

    #[derive(Default)]
    struct ScriptedBackend {
        rows: Vec<(String, MemoryCursor)>,
        queries: Vec<(String, Vec<Value>)>,
        updates: usize,
    }

    impl ScriptedBackend {
        fn on(mut self, sql_fragment: &str, cursor: MemoryCursor) -> Self {
            self.rows.push((sql_fragment.to_string(), cursor));
            self
        }
    }

    impl StatementBackend for ScriptedBackend {
        fn query(&mut self, sql: &str, parameters: &[Value]) -> Result<Vec<Box<dyn RowCursor>>> {
            self.queries.push((sql.to_string(), parameters.to_vec()));
            let cursor = self
                .rows
                .iter()
                .find(|(fragment, _)| sql.contains(fragment.as_str()))
                .map(|(_, cursor)| cursor.clone())
                .ok_or_else(|| Error::backend(format!("no rows for {}", sql)))?;
            Ok(vec![Box::new(cursor)])
        }

        fn update(&mut self, _sql: &str, _parameters: &[Value]) -> Result<u64> {
            self.updates += 1;
            Ok(1)
        }
    }

    fn config() -> Arc<Configuration> {
        let mut config = Configuration::new();
        let mut builder = MapperBuilder::new(&mut config, "t").unwrap();
        builder
            .add_statement(
                StatementDef::select("names", SqlNode::text("select name from t where id > #{id}"))
                    .result_type(ValueType::Text),
            )
            .unwrap();
        builder
            .add_statement(
                StatementDef::select("fresh", SqlNode::text("select name from t where flushed"))
                    .result_type(ValueType::Text)
                    .flush_cache(true),
            )
            .unwrap();
        builder
            .add_statement(StatementDef::update("touch", SqlNode::text("update t set x = 1")))
            .unwrap();
        builder.finish();
        Arc::new(config)
    }

    fn backend() -> ScriptedBackend {
        let names = MemoryCursor::from_rows(
            &["name"],
            vec![vec![Value::text("a")], vec![Value::text("b")]],
        );
        ScriptedBackend::default()
            .on("where id", names.clone())
            .on("flushed", names)
    }

    fn param(id: i64) -> Value {
        Value::map([("id", Value::integer(id))])
    }

    #[test]
    fn test_repeated_query_hits_local_cache() {
        let mut session = Session::new(config(), backend());
        let first = session.select_list("t.names", &param(1)).unwrap();
        let second = session.select_list("t.names", &param(1)).unwrap();
        assert_eq!(first, vec![Value::text("a"), Value::text("b")]);
        assert_eq!(first, second);
        assert_eq!(session.backend().queries.len(), 1);
        assert_eq!(session.backend().queries[0].1, vec![Value::integer(1)]);

        // A different parameter is a different key
        session.select_list("t.names", &param(2)).unwrap();
        assert_eq!(session.backend().queries.len(), 2);
    }

    #[test]
    fn test_update_clears_cache() {
        let mut session = Session::new(config(), backend());
        session.select_list("t.names", &param(1)).unwrap();
        assert_eq!(session.update("t.touch", &Value::Null).unwrap(), 1);
        session.select_list("t.names", &param(1)).unwrap();
        assert_eq!(session.backend().queries.len(), 2);
        assert_eq!(session.backend().updates, 1);
    }

    #[test]
    fn test_flush_cache_statement() {
        let mut session = Session::new(config(), backend());
        session.select_list("t.fresh", &Value::Null).unwrap();
        session.select_list("t.fresh", &Value::Null).unwrap();
        assert_eq!(session.backend().queries.len(), 2);
    }

    #[test]
    fn test_statement_cache_scope() {
        let mut config = (*config()).clone();
        config.settings_mut().local_cache_scope = LocalCacheScope::Statement;
        let mut session = Session::new(Arc::new(config), backend());
        session.select_list("t.names", &param(1)).unwrap();
        session.select_list("t.names", &param(1)).unwrap();
        assert_eq!(session.backend().queries.len(), 2);
    }

    #[test]
    fn test_select_one() {
        let mut session = Session::new(config(), backend());
        assert_eq!(
            session.select_one("t.names", &param(1)),
            Err(Error::TooManyResults(2))
        );
    }

    #[test]
    fn test_closed_session() {
        let mut session = Session::new(config(), backend());
        session.close();
        assert!(session.is_closed());
        assert_eq!(
            session.select_list("t.names", &param(1)),
            Err(Error::ExecutorClosed)
        );
        assert_eq!(session.update("t.touch", &Value::Null), Err(Error::ExecutorClosed));
    }

    #[test]
    fn test_handler_bypasses_cache() {
        let mut session = Session::new(config(), backend());
        session.select_list("t.names", &param(1)).unwrap();
        let mut seen = Vec::new();
        session
            .select_with_handler(
                "t.names",
                &param(1),
                RowBounds::default(),
                &mut |ctx: &mut crate::executor::ResultContext| -> Result<()> {
                    seen.push(ctx.take_result_object());
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(seen, vec![Value::text("a"), Value::text("b")]);
        assert_eq!(session.backend().queries.len(), 2);
    }

    #[test]
    fn test_unknown_statement() {
        let mut session = Session::new(config(), backend());
        let err = session.select_list("t.missing", &Value::Null).unwrap_err();
        assert!(err.is_not_found());
    }
}
