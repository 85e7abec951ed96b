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

//! Dynamic SQL Tests
//!
//! Template evaluation and statement compilation through mapped statements

use sqlweave::builder::{MapperBuilder, StatementDef};
use sqlweave::parsing::TokenParser;
use sqlweave::scripting::{ChooseSqlNode, ForEachSqlNode, IfSqlNode, SqlNode, TrimSqlNode};
use sqlweave::{Configuration, Error, ParameterMode, Value, ValueType};

fn compile(config: &mut Configuration, sql: SqlNode) {
    let mut mapper = MapperBuilder::new(config, "t").expect("Failed to create mapper");
    mapper
        .add_statement(StatementDef::select("q", sql).result_type(ValueType::Map))
        .expect("Failed to add statement");
    mapper.finish();
}

fn bind(sql: SqlNode, parameter: Value) -> (String, Vec<Value>) {
    let mut config = Configuration::new();
    compile(&mut config, sql);
    let statement = config.statement("t.q").expect("Failed to find statement");
    let bound = statement
        .bound_sql(&config, &parameter)
        .expect("Failed to bind statement");
    let values = bound
        .parameter_values(&config)
        .expect("Failed to read parameter values");
    (bound.sql().to_string(), values)
}

/// Test the token parser on payloads, escapes and unterminated markers
#[test]
fn test_token_parser() {
    let parser = TokenParser::parameters();
    let mut seen = Vec::new();
    let out = parser
        .parse("a = #{a} and b = \\#{b} and c = #{c\\}d}", |payload| {
            seen.push(payload.to_string());
            Ok("?".to_string())
        })
        .expect("Failed to parse");
    assert_eq!(out, "a = ? and b = #{b} and c = ?");
    assert_eq!(seen, vec!["a", "c}d"]);

    let out = parser
        .parse("x = #{open", |_| Ok("?".to_string()))
        .expect("Failed to parse");
    assert_eq!(out, "x = #{open");

    // Handler errors stop the scan
    let err = parser.parse("#{a}", |_| Err(Error::internal("boom")));
    assert!(err.is_err());
}

/// Test foreach over a list producing one marker per element
#[test]
fn test_foreach_in_list() {
    let sql = SqlNode::mixed(vec![
        SqlNode::text("SELECT * FROM t WHERE id IN"),
        ForEachSqlNode::new("ids", SqlNode::text("#{id}"))
            .expect("Failed to parse collection")
            .item("id")
            .open("(")
            .close(")")
            .separator(",")
            .into(),
    ]);
    let (sql, values) = bind(sql, Value::map([("ids", Value::from(vec![10, 20, 30]))]));
    assert_eq!(sql, "SELECT * FROM t WHERE id IN (?,?,?)");
    assert_eq!(
        values,
        vec![Value::integer(10), Value::integer(20), Value::integer(30)]
    );
}

/// Test foreach with item properties and an index
#[test]
fn test_foreach_item_properties() {
    let sql = SqlNode::mixed(vec![
        SqlNode::text("INSERT INTO t (pos, name) VALUES"),
        ForEachSqlNode::new("rows", SqlNode::text("(#{i}, #{row.name})"))
            .expect("Failed to parse collection")
            .item("row")
            .index("i")
            .separator(",")
            .into(),
    ]);
    let rows = Value::list(vec![
        Value::map([("name", Value::text("a"))]),
        Value::map([("name", Value::text("b"))]),
    ]);
    let (sql, values) = bind(sql, Value::map([("rows", rows)]));
    assert_eq!(sql, "INSERT INTO t (pos, name) VALUES (?, ?),(?, ?)");
    assert_eq!(
        values,
        vec![
            Value::integer(0),
            Value::text("a"),
            Value::integer(1),
            Value::text("b")
        ]
    );
}

/// Test foreach over a scalar fails
#[test]
fn test_foreach_over_scalar_fails() {
    let mut config = Configuration::new();
    compile(
        &mut config,
        ForEachSqlNode::new("ids", SqlNode::text("#{x}"))
            .expect("Failed to parse collection")
            .item("x")
            .into(),
    );
    let statement = config.statement("t.q").expect("Failed to find statement");
    let err = statement
        .bound_sql(&config, &Value::map([("ids", Value::integer(3))]))
        .unwrap_err();
    assert!(err.is_template_error());
}

/// Test the WHERE preset drops a leading connective and vanishes when empty
#[test]
fn test_where_clause() {
    let sql = || {
        SqlNode::mixed(vec![
            SqlNode::text("SELECT * FROM blog"),
            SqlNode::where_clause(SqlNode::mixed(vec![
                SqlNode::if_test("state != null", SqlNode::text("state = #{state}"))
                    .expect("Failed to parse test"),
                SqlNode::if_test("title != null", SqlNode::text("AND title like #{title}"))
                    .expect("Failed to parse test"),
            ])),
        ])
    };

    let (text, values) = bind(sql(), Value::map([("title", Value::text("%rust%"))]));
    assert_eq!(text, "SELECT * FROM blog WHERE title like ?");
    assert_eq!(values, vec![Value::text("%rust%")]);

    let (text, values) = bind(sql(), Value::map([("state", Value::text("ACTIVE"))]));
    assert_eq!(text, "SELECT * FROM blog WHERE state = ?");
    assert_eq!(values, vec![Value::text("ACTIVE")]);

    let (text, values) = bind(sql(), Value::map(Vec::<(String, Value)>::new()));
    assert_eq!(text, "SELECT * FROM blog");
    assert!(values.is_empty());
}

/// Test the SET preset and a generic trim node
#[test]
fn test_set_clause_and_trim() {
    let sql = SqlNode::mixed(vec![
        SqlNode::text("UPDATE author"),
        SqlNode::set_clause(SqlNode::mixed(vec![
            SqlNode::if_test("name != null", SqlNode::text("name = #{name},"))
                .expect("Failed to parse test"),
            SqlNode::if_test("bio != null", SqlNode::text("bio = #{bio},"))
                .expect("Failed to parse test"),
        ])),
        SqlNode::text("WHERE id = #{id}"),
    ]);
    let (text, values) = bind(
        sql,
        Value::map([("name", Value::text("ann")), ("id", Value::integer(7))]),
    );
    assert_eq!(text, "UPDATE author SET name = ? WHERE id = ?");
    assert_eq!(values, vec![Value::text("ann"), Value::integer(7)]);

    let trim = TrimSqlNode::new(
        SqlNode::text("or a = 1 or"),
        Some("("),
        Some("OR |AND "),
        Some(")"),
        Some(" OR"),
    );
    assert_eq!(trim.trim("or a = 1 or"), "( a = 1 )");
}

/// Test choose takes the first matching branch, else the fallback
#[test]
fn test_choose() {
    let sql = || {
        SqlNode::mixed(vec![
            SqlNode::text("SELECT * FROM blog WHERE"),
            ChooseSqlNode::new(
                vec![
                    IfSqlNode::new("title != null", SqlNode::text("title = #{title}"))
                        .expect("Failed to parse test"),
                    IfSqlNode::new(
                        "author != null and author.name != null",
                        SqlNode::text("author = #{author.name}"),
                    )
                    .expect("Failed to parse test"),
                ],
                Some(SqlNode::text("featured = 1")),
            )
            .into(),
        ])
    };
    let author = Value::map([("name", Value::text("ann"))]);
    let (text, values) = bind(sql(), Value::map([("author", author)]));
    assert_eq!(text, "SELECT * FROM blog WHERE author = ?");
    assert_eq!(values, vec![Value::text("ann")]);

    let (text, _) = bind(sql(), Value::Null);
    assert_eq!(text, "SELECT * FROM blog WHERE featured = 1");
}

/// Test bind nodes and text substitution
#[test]
fn test_bind_and_substitution() {
    let sql = SqlNode::mixed(vec![
        SqlNode::bind("pattern", "'%' + name + '%'").expect("Failed to parse bind"),
        SqlNode::text("SELECT * FROM ${table} WHERE name LIKE #{pattern}"),
    ]);
    let (text, values) = bind(
        sql,
        Value::map([("name", Value::text("ann")), ("table", Value::text("users"))]),
    );
    assert_eq!(text, "SELECT * FROM users WHERE name LIKE ?");
    assert_eq!(values, vec![Value::text("%ann%")]);
}

/// Test parameter attributes reach the compiled descriptors
#[test]
fn test_parameter_attributes() {
    let mut config = Configuration::new();
    compile(
        &mut config,
        SqlNode::text(
            "CALL p(#{total, javaType=double, jdbcType=NUMERIC, mode=INOUT, numericScale=2})",
        ),
    );
    let statement = config.statement("t.q").expect("Failed to find statement");
    let bound = statement
        .bound_sql(&config, &Value::map([("total", Value::float(1.5))]))
        .expect("Failed to bind statement");
    assert_eq!(bound.sql(), "CALL p(?)");
    let mapping = &bound.parameter_mappings()[0];
    assert_eq!(mapping.property, "total");
    assert_eq!(mapping.value_type, ValueType::Float);
    assert_eq!(mapping.mode, ParameterMode::InOut);
    assert_eq!(mapping.numeric_scale, Some(2));
}

/// Test malformed parameter expressions are rejected at definition time
#[test]
fn test_bad_parameter_expression() {
    let mut config = Configuration::new();
    let mut mapper = MapperBuilder::new(&mut config, "t").expect("Failed to create mapper");
    let result = mapper.add_statement(
        StatementDef::select("q", SqlNode::text("SELECT #{a, colour=red}"))
            .result_type(ValueType::Map),
    );
    assert!(matches!(result, Err(Error::UnknownParameterProperty { .. })));
}

/// Test database-specific fragments
#[test]
fn test_database_id_binding() {
    let mut config = Configuration::new();
    config.set_database_id("pg");
    compile(
        &mut config,
        SqlNode::mixed(vec![
            SqlNode::text("SELECT now()"),
            SqlNode::if_test("_databaseId == 'pg'", SqlNode::text("::date"))
                .expect("Failed to parse test"),
        ]),
    );
    let statement = config.statement("t.q").expect("Failed to find statement");
    let bound = statement
        .bound_sql(&config, &Value::Null)
        .expect("Failed to bind statement");
    assert_eq!(bound.sql(), "SELECT now() ::date");
}
