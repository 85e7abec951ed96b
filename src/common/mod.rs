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

//! Common utilities for Sqlweave
//!
//! - [`maps`] - Hash map aliases used across the crate
//! - [`naming`] - Column and property name helpers

pub mod maps;
pub mod naming;

// Re-export main types for convenience
pub use maps::StringMap;
pub use naming::{strip_prefix_ignore_case, underscore_to_camel};
