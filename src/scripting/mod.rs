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

//! Dynamic SQL templates
//!
//! A template is a tree of [`SqlNode`]s. Applying it to a parameter
//! object produces SQL text with `#{...}` placeholders and a set of
//! bindings; a [`SqlSource`] then compiles that text into a [`BoundSql`].

pub mod context;
pub mod node;
pub mod sql_source;

pub use context::{DynamicContext, SqlBuffer, DATABASE_ID_KEY, PARAMETER_OBJECT_KEY};
pub use node::{
    ChooseSqlNode, ForEachSqlNode, IfSqlNode, SqlNode, TextSqlNode, TrimSqlNode, VarDeclSqlNode,
    WHERE_PREFIX_OVERRIDES,
};
pub use sql_source::{BoundSql, SqlSource, StaticSqlSource};
