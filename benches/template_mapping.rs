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

//! Template evaluation and row mapping benchmarks
//!
//! Run with: cargo bench --bench template_mapping

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use sqlweave::builder::{MapperBuilder, ResultMapDef, StatementDef};
use sqlweave::core::TypeDescriptor;
use sqlweave::executor::{MemoryCursor, RowCursor, Session, StatementBackend};
use sqlweave::mapping::ResultMapping;
use sqlweave::scripting::{ForEachSqlNode, SqlNode};
use sqlweave::{Configuration, Result, Value, ValueType};

const ORDER_COUNT: i64 = 1_000;
const ITEMS_PER_ORDER: i64 = 4;

/// Backend that replays one cursor for every query
struct ReplayBackend {
    cursor: MemoryCursor,
}

impl StatementBackend for ReplayBackend {
    fn query(&mut self, _sql: &str, _parameters: &[Value]) -> Result<Vec<Box<dyn RowCursor>>> {
        Ok(vec![Box::new(self.cursor.clone())])
    }

    fn update(&mut self, _sql: &str, _parameters: &[Value]) -> Result<u64> {
        Ok(0)
    }
}

fn setup_configuration() -> Configuration {
    let mut config = Configuration::new();
    for descriptor in [
        TypeDescriptor::builder("Order")
            .field("id", ValueType::Integer)
            .field("customer", ValueType::Text)
            .field("items", ValueType::List),
        TypeDescriptor::builder("Item")
            .field("id", ValueType::Integer)
            .field("sku", ValueType::Text),
    ] {
        config
            .register_type(descriptor.build().unwrap())
            .unwrap();
    }

    let mut mapper = MapperBuilder::new(&mut config, "bench").unwrap();
    let item = vec![
        mapper
            .result_mapping(ResultMapping::builder(Some("id"), Some("item_id")).id())
            .unwrap(),
        mapper
            .result_mapping(ResultMapping::builder(Some("sku"), Some("sku")))
            .unwrap(),
    ];
    mapper
        .add_result_map(ResultMapDef::new("itemMap", ValueType::object("Item"), item))
        .unwrap();
    let order = vec![
        mapper
            .result_mapping(ResultMapping::builder(Some("id"), Some("id")).id())
            .unwrap(),
        mapper
            .result_mapping(ResultMapping::builder(Some("customer"), Some("customer")))
            .unwrap(),
        mapper
            .result_mapping(
                ResultMapping::builder(Some("items"), None).nested_result_map("itemMap"),
            )
            .unwrap(),
    ];
    mapper
        .add_result_map(ResultMapDef::new("orderMap", ValueType::object("Order"), order))
        .unwrap();
    mapper
        .add_statement(
            StatementDef::select("orders", SqlNode::text("SELECT * FROM orders JOIN items"))
                .result_map("orderMap"),
        )
        .unwrap();
    mapper
        .add_statement(
            StatementDef::select("flat", SqlNode::text("SELECT * FROM items"))
                .result_type(ValueType::object("Item")),
        )
        .unwrap();

    let search = SqlNode::mixed(vec![
        SqlNode::text("SELECT * FROM orders"),
        SqlNode::where_clause(SqlNode::mixed(vec![
            SqlNode::if_test("customer != null", SqlNode::text("AND customer = #{customer}"))
                .unwrap(),
            SqlNode::if_test(
                "ids != null and ids.size() > 0",
                SqlNode::mixed(vec![
                    SqlNode::text("AND id IN"),
                    ForEachSqlNode::new("ids", SqlNode::text("#{id}"))
                        .unwrap()
                        .item("id")
                        .open("(")
                        .close(")")
                        .separator(",")
                        .into(),
                ]),
            )
            .unwrap(),
        ])),
    ]);
    mapper
        .add_statement(StatementDef::select("search", search).result_map("orderMap"))
        .unwrap();
    mapper.finish();
    config
}

fn joined_rows() -> MemoryCursor {
    let mut rows = Vec::new();
    for order in 1..=ORDER_COUNT {
        for item in 0..ITEMS_PER_ORDER {
            rows.push(vec![
                Value::integer(order),
                Value::text(format!("customer_{}", order)),
                Value::integer(order * 100 + item),
                Value::text(format!("SKU-{}", item)),
            ]);
        }
    }
    MemoryCursor::from_rows(&["id", "customer", "item_id", "sku"], rows)
}

fn bench_template(c: &mut Criterion) {
    let config = setup_configuration();
    let statement = config.statement("bench.search").unwrap();
    let mut group = c.benchmark_group("template");

    for size in [1usize, 10, 100] {
        let ids: Vec<Value> = (0..size as i64).map(Value::integer).collect();
        let parameter = Value::map([
            ("customer", Value::text("ann")),
            ("ids", Value::list(ids)),
        ]);
        group.bench_with_input(BenchmarkId::new("bind_foreach", size), &parameter, |b, p| {
            b.iter(|| {
                let bound = statement.bound_sql(&config, black_box(p)).unwrap();
                black_box(bound.parameter_values(&config).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_mapping(c: &mut Criterion) {
    let config = Arc::new(setup_configuration());
    let mut group = c.benchmark_group("mapping");
    group.sample_size(20);

    group.bench_function("nested_join", |b| {
        b.iter(|| {
            let backend = ReplayBackend {
                cursor: joined_rows(),
            };
            let mut session = Session::new(Arc::clone(&config), backend);
            black_box(session.select_list("bench.orders", &Value::Null).unwrap())
        })
    });

    group.bench_function("automap_flat", |b| {
        b.iter(|| {
            let backend = ReplayBackend {
                cursor: joined_rows(),
            };
            let mut session = Session::new(Arc::clone(&config), backend);
            black_box(session.select_list("bench.flat", &Value::Null).unwrap())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_template, bench_mapping);
criterion_main!(benches);
