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

//! Statement execution and result mapping
//!
//! This module turns compiled statements into results:
//!
//! - [`Session`] - Runs statements through a [`StatementBackend`] with a
//!   local result cache and deferred loads
//! - [`ResultSetHandler`] - Maps cursors into object graphs
//! - [`ColumnSet`] - Column metadata and converter cache over one cursor
//! - [`ResultLoader`] / [`DeferredLoad`] - Nested query loads
//! - [`ResultHandler`] / [`ResultContext`] - Streaming result consumers
//! - [`RowBounds`] - Offset and limit applied by skipping rows
//! - [`RowCursor`] / [`MemoryCursor`] - Forward-only row access
//! - [`OutputParameter`] - OUT and CURSOR values reported after a call

pub mod column_set;
pub mod cursor;
pub mod loader;
pub mod result_handler;
pub mod result_set_handler;
pub mod row_bounds;
pub mod session;

pub use column_set::ColumnSet;
pub use cursor::{infer_jdbc_type, MemoryCursor, OutputParameter, RowCursor};
pub use loader::{extract_object_from_list, DeferredLoad, ResultLoader};
pub use result_handler::{DefaultResultHandler, ResultContext, ResultHandler};
pub use result_set_handler::ResultSetHandler;
pub use row_bounds::RowBounds;
pub use session::{Executor, Session, StatementBackend};
