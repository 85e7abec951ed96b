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

//! Core types and definitions for Sqlweave
//!
//! This module contains the fundamental types used throughout the crate:
//!
//! - [`Value`] - Runtime values: scalars, lists, maps and object handles
//! - [`ValueType`] - Logical types used to pick converters
//! - [`JdbcType`] - Column-native kinds reported by cursors
//! - [`TypeDescriptor`] / [`ObjectRef`] - Accessor tables and mapped records
//! - [`CacheKey`] - Row identity key
//! - [`Error`] - Error types for every stage

pub mod cache_key;
pub mod error;
pub mod object;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use cache_key::{CacheKey, KeyPart};
pub use error::{Error, ErrorKind, Result};
pub use object::{
    split_property_path, ConstructorDescriptor, DeferredField, FieldDescriptor, FieldState,
    ObjectRef, PathSegment, Record, TypeDescriptor, TypeDescriptorBuilder,
};
pub use types::{JdbcType, ParameterMode, ValueType};
pub use value::{parse_timestamp, Value};

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Integration test: objects reachable through values and keys
    #[test]
    fn test_object_values_in_keys() {
        let desc = TypeDescriptor::builder("Order")
            .field("id", ValueType::Integer)
            .build()
            .unwrap();
        let order = ObjectRef::instantiate(&desc);
        order.set("id", Value::integer(1)).unwrap();

        // Same handle, same key
        let mut a = CacheKey::new();
        a.update("order");
        a.update(Value::Object(order.clone()));
        let mut b = CacheKey::new();
        b.update("order");
        b.update(Value::Object(order.clone()));
        assert_eq!(a, b);

        // Different instance with equal fields is a different identity
        let twin = ObjectRef::instantiate(&desc);
        twin.set("id", Value::integer(1)).unwrap();
        let mut c = CacheKey::new();
        c.update("order");
        c.update(Value::Object(twin));
        assert_ne!(a, c);
    }

    /// Integration test: value types drive property paths
    #[test]
    fn test_value_type_of_nested_paths() {
        let param = Value::map([("user", Value::map([("age", Value::integer(30))]))]);
        let age = param.get_path("user.age").unwrap();
        assert_eq!(age.value_type(), ValueType::Integer);
        assert_eq!(Value::Null.value_type(), ValueType::Any);
    }
}
