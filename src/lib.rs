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

//! # Sqlweave - Dynamic SQL templates and result-graph mapping
//!
//! Sqlweave sits between an application and a database driver. It turns
//! named statement templates into positional SQL with ordered parameter
//! values, and turns the rows that come back into object graphs.
//!
//! ## Key Features
//!
//! - **Dynamic templates** - `if`, `choose`, `foreach`, `bind` and trim
//!   nodes evaluated against a parameter object
//! - **Statement compilation** - `#{...}` markers become `?` with typed
//!   parameter descriptors; `${...}` is interpolated text
//! - **Result maps** - Ids, constructors, discriminators, nested result
//!   maps over joins, nested queries and secondary result sets
//! - **Automatic mapping** - Columns matched to properties by name, with
//!   optional underscore to camel case folding
//! - **Session cache** - Repeated queries and circular references served
//!   from a per-session cache
//!
//! ## Quick Start
//!
//! ```rust
//! use sqlweave::builder::{MapperBuilder, StatementDef};
//! use sqlweave::scripting::SqlNode;
//! use sqlweave::{Configuration, Value, ValueType};
//!
//! let mut config = Configuration::new();
//! let mut mapper = MapperBuilder::new(&mut config, "user").unwrap();
//! let where_clause = SqlNode::where_clause(
//!     SqlNode::if_test("name != null", SqlNode::text("AND name = #{name}")).unwrap(),
//! );
//! mapper
//!     .add_statement(
//!         StatementDef::select(
//!             "find",
//!             SqlNode::mixed(vec![SqlNode::text("SELECT * FROM users"), where_clause]),
//!         )
//!         .result_type(ValueType::Map),
//!     )
//!     .unwrap();
//! mapper.finish();
//!
//! let statement = config.statement("user.find").unwrap();
//! let parameter = Value::map([("name", Value::text("ann"))]);
//! let bound = statement.bound_sql(&config, &parameter).unwrap();
//! assert_eq!(bound.sql(), "SELECT * FROM users WHERE name = ?");
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`Value`], [`ValueType`], [`ObjectRef`], [`CacheKey`], [`Error`])
//! - [`parsing`] - Placeholder token parser
//! - [`expr`] - Expression language for conditions and bindings
//! - [`scripting`] - Dynamic SQL template tree and SQL sources
//! - [`builder`] - Statement compiler and mapper builder
//! - [`mapping`] - Result maps, statements, settings and configuration
//! - [`types`] - Type conversion registry
//! - [`executor`] - Session executor and the result mapping engine
//! - [`common`] - Utilities (map aliases, naming helpers)

pub mod builder;
pub mod common;
pub mod core;
pub mod executor;
pub mod expr;
pub mod mapping;
pub mod parsing;
pub mod scripting;
pub mod types;

// Re-export main types for convenience
pub use core::{
    CacheKey, Error, ErrorKind, JdbcType, ObjectRef, ParameterMode, Result, TypeDescriptor, Value,
    ValueType,
};

// Re-export mapping types
pub use mapping::{
    AutoMappingBehavior, Configuration, LocalCacheScope, MappedStatement, ResultMap,
    ResultMapping, Settings, UnknownColumnBehavior,
};

// Re-export template and compiler types
pub use builder::{MapperBuilder, ResultMapDef, SqlSourceBuilder, StatementDef};
pub use parsing::TokenParser;
pub use scripting::{BoundSql, SqlNode, SqlSource};

// Re-export executor types
pub use executor::{
    Executor, MemoryCursor, OutputParameter, ResultContext, ResultHandler, RowBounds, RowCursor,
    Session, StatementBackend,
};
