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

//! Row identity key
//!
//! A [`CacheKey`] is an order-sensitive list of values with a running hash.
//! It identifies a logical entity across the rows of a join and keys the
//! session result cache.
//!
//! A key built from fewer than two updates carries no identity: it never
//! compares equal to any key, itself included. Lookups with such a key
//! always miss, which forces a fresh object for every row.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use super::value::Value;

const DEFAULT_MULTIPLIER: i64 = 37;
const DEFAULT_HASHCODE: i64 = 17;

/// One element of a key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Value(Value),
    Key(Box<CacheKey>),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Value(v) => write!(f, "{}", v),
            KeyPart::Key(k) => write!(f, "{}", k),
        }
    }
}

/// Composable row identity key
#[derive(Debug, Clone)]
pub struct CacheKey {
    hashcode: i64,
    checksum: i64,
    count: usize,
    parts: SmallVec<[KeyPart; 8]>,
}

impl CacheKey {
    pub fn new() -> Self {
        CacheKey {
            hashcode: DEFAULT_HASHCODE,
            checksum: 0,
            count: 0,
            parts: SmallVec::new(),
        }
    }

    /// The key with no identity
    pub fn null_key() -> Self {
        CacheKey::new()
    }

    /// Number of updates applied so far
    pub fn update_count(&self) -> usize {
        self.count
    }

    /// Returns true if this key cannot identify anything
    pub fn is_null(&self) -> bool {
        self.count < 2
    }

    /// Append a value
    pub fn update(&mut self, value: impl Into<Value>) {
        let value = value.into();
        let base = if value.is_null() { 1 } else { fx_hash(&value) };
        self.append(base, KeyPart::Value(value));
    }

    /// Append every value in order
    pub fn update_all<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for v in values {
            self.update(v);
        }
    }

    /// Append another key as a single element
    pub fn update_key(&mut self, key: &CacheKey) {
        self.append(key.hashcode, KeyPart::Key(Box::new(key.clone())));
    }

    /// Order-dependent concatenation of `self` followed by `other`
    ///
    /// Returns the null key when either side lacks identity.
    pub fn combine(&self, other: &CacheKey) -> CacheKey {
        if self.is_null() || other.is_null() {
            return CacheKey::null_key();
        }
        let mut combined = self.clone();
        combined.update_key(other);
        combined
    }

    fn append(&mut self, base: i64, part: KeyPart) {
        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base);
        let base = base.wrapping_mul(self.count as i64);
        self.hashcode = DEFAULT_MULTIPLIER
            .wrapping_mul(self.hashcode)
            .wrapping_add(base);
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

fn fx_hash(value: &Value) -> i64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish() as i64
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.hashcode == other.hashcode
            && self.checksum == other.checksum
            && self.count == other.count
            && self.parts == other.parts
    }
}

// Reflexive for every key with identity; null keys are never stored.
impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for part in &self.parts {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_equal_update_sequences() {
        let mut a = CacheKey::new();
        a.update(1);
        a.update("a");
        let mut b = CacheKey::new();
        b.update(1);
        b.update("a");
        assert_eq!(a, b);
        assert_eq!(a.update_count(), 2);
    }

    #[test]
    fn test_order_matters() {
        let mut a = CacheKey::new();
        a.update_all([Value::integer(1), Value::text("a")]);
        let mut b = CacheKey::new();
        b.update_all([Value::text("a"), Value::integer(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_keys_never_equal() {
        let empty = CacheKey::new();
        assert_ne!(empty, CacheKey::new());
        assert_ne!(empty, empty.clone());

        let mut one = CacheKey::new();
        one.update(1);
        let mut other = CacheKey::new();
        other.update(1);
        assert_ne!(one, other);
        assert!(one.is_null());
    }

    #[test]
    fn test_null_values_are_safe() {
        let mut a = CacheKey::new();
        a.update(Value::Null);
        a.update(Value::Null);
        let mut b = CacheKey::new();
        b.update(Value::Null);
        b.update(Value::Null);
        assert_eq!(a, b);
    }

    #[test]
    fn test_combine() {
        let mut parent = CacheKey::new();
        parent.update_all(["order", "1"]);
        let mut child = CacheKey::new();
        child.update_all(["item", "10"]);

        let ab = child.combine(&parent);
        let ab2 = child.combine(&parent);
        assert_eq!(ab, ab2);
        assert_ne!(ab, parent.combine(&child));
        assert!(child.combine(&CacheKey::new()).is_null());
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = FxHashMap::default();
        let mut key = CacheKey::new();
        key.update_all([Value::text("id"), Value::integer(1)]);
        map.insert(key.clone(), "first");
        assert_eq!(map.get(&key), Some(&"first"));

        // Null keys always miss
        map.insert(CacheKey::new(), "lost");
        assert_eq!(map.get(&CacheKey::new()), None);
    }
}
