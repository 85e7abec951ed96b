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

//! Mapping definitions and configuration
//!
//! - [`ParameterMapping`]: one positional parameter of a compiled statement
//! - [`ResultMap`] / [`ResultMapping`] / [`Discriminator`]: how rows become objects
//! - [`MappedStatement`]: a named statement with its SQL source and result maps
//! - [`Configuration`]: settings, converters, record types and the registries above

pub mod configuration;
pub mod parameter;
pub mod result_map;
pub mod settings;
pub mod statement;

pub use configuration::Configuration;
pub use parameter::{ParameterMapping, ParameterMappingBuilder};
pub use result_map::{
    Discriminator, FetchType, ResultFlag, ResultMap, ResultMapBuilder, ResultMapping,
    ResultMappingBuilder,
};
pub use settings::{AutoMappingBehavior, LocalCacheScope, Settings, UnknownColumnBehavior};
pub use statement::{MappedStatement, SqlCommandType};
