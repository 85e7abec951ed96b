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

//! Hash map aliases
//!
//! Every internal map is keyed by short strings or row identity keys, so
//! FxHash is used throughout.

use rustc_hash::FxHashMap;

/// Hash map for String keys
pub type StringMap<V> = FxHashMap<String, V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_map() {
        let mut map: StringMap<i32> = StringMap::default();
        map.insert("a".to_string(), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("A"), None);
    }
}
