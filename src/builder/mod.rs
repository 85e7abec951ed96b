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

//! Definition-time builders
//!
//! Turns mapper definitions into registered result maps and statements,
//! and compiles placeholder SQL into positional SQL plus parameter
//! descriptors.

pub mod mapper;
pub mod parameter_expression;
pub mod sql_source_builder;

pub use mapper::{MapperBuilder, ResultMapDef, StatementDef};
pub use parameter_expression::ParameterExpression;
pub use sql_source_builder::SqlSourceBuilder;
