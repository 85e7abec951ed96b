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

//! Cache Key Tests
//!
//! Statement keys built by a session and the identity rules of row keys

use std::sync::Arc;

use sqlweave::builder::{MapperBuilder, StatementDef};
use sqlweave::executor::{Executor, MemoryCursor, RowCursor, Session, StatementBackend};
use sqlweave::scripting::SqlNode;
use sqlweave::{CacheKey, Configuration, Result, RowBounds, Value, ValueType};

struct NoBackend;

impl StatementBackend for NoBackend {
    fn query(&mut self, _sql: &str, _parameters: &[Value]) -> Result<Vec<Box<dyn RowCursor>>> {
        Ok(vec![Box::new(MemoryCursor::from_rows(&["n"], Vec::new()))])
    }

    fn update(&mut self, _sql: &str, _parameters: &[Value]) -> Result<u64> {
        Ok(0)
    }
}

fn session(environment: Option<&str>) -> Session<NoBackend> {
    let mut config = Configuration::new();
    if let Some(id) = environment {
        config.set_environment_id(id);
    }
    let mut mapper = MapperBuilder::new(&mut config, "k").expect("Failed to create mapper");
    for id in ["byId", "alsoById"] {
        mapper
            .add_statement(
                StatementDef::select(id, SqlNode::text("SELECT * FROM t WHERE id = #{id}"))
                    .parameter_type(ValueType::Integer)
                    .result_type(ValueType::Integer),
            )
            .expect("Failed to add statement");
    }
    mapper.finish();
    Session::new(Arc::new(config), NoBackend)
}

fn statement_key(
    session: &Session<NoBackend>,
    id: &str,
    parameter: Value,
    bounds: RowBounds,
) -> CacheKey {
    let configuration = session.configuration();
    let statement = configuration.statement(id).expect("Failed to find statement");
    let bound_sql = statement
        .bound_sql(&configuration, &parameter)
        .expect("Failed to bind statement");
    session
        .create_cache_key(&statement, &parameter, bounds, &bound_sql)
        .expect("Failed to create key")
}

/// Test identical executions share a key
#[test]
fn test_same_execution_same_key() {
    let session = session(None);
    let a = statement_key(&session, "k.byId", Value::integer(1), RowBounds::default());
    let b = statement_key(&session, "k.byId", Value::integer(1), RowBounds::default());
    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());
}

/// Test every component of an execution changes the key
#[test]
fn test_key_components() {
    let session = session(None);
    let base = statement_key(&session, "k.byId", Value::integer(1), RowBounds::default());
    assert_ne!(
        base,
        statement_key(&session, "k.byId", Value::integer(2), RowBounds::default())
    );
    assert_ne!(
        base,
        statement_key(&session, "k.alsoById", Value::integer(1), RowBounds::default())
    );
    assert_ne!(
        base,
        statement_key(&session, "k.byId", Value::integer(1), RowBounds::new(1, 10))
    );

    let other_environment = self::session(Some("test"));
    assert_ne!(
        base,
        statement_key(&other_environment, "k.byId", Value::integer(1), RowBounds::default())
    );
}

/// Test composite row keys depend on the order of their parts
#[test]
fn test_combined_row_keys() {
    let mut order = CacheKey::new();
    order.update_all(["orderMap", "ID", "1"]);
    let mut item = CacheKey::new();
    item.update_all(["itemMap", "ITEM_ID", "10"]);

    let combined = item.combine(&order);
    assert!(!combined.is_null());
    assert_eq!(combined, item.combine(&order));
    assert_ne!(combined, order.combine(&item));

    // A child without identity never merges with anything
    let mut anonymous = CacheKey::new();
    anonymous.update("itemMap");
    assert!(anonymous.combine(&order).is_null());
    assert_ne!(anonymous.combine(&order), anonymous.combine(&order));
}

/// Test keys of different lengths differ even with shared prefixes
#[test]
fn test_prefix_keys_differ() {
    let mut short = CacheKey::new();
    short.update_all([Value::integer(1), Value::integer(2)]);
    let mut long = short.clone();
    long.update(Value::Null);
    assert_ne!(short, long);
    assert_eq!(long.update_count(), 3);
}
