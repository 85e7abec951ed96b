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

//! Row window applied while mapping

use std::fmt;

/// Offset/limit window over the rows of a result set
///
/// Rows before `offset` are read and discarded; mapping stops once
/// `limit` results were produced. The default window is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    offset: usize,
    limit: usize,
}

impl RowBounds {
    pub const NO_ROW_OFFSET: usize = 0;
    pub const NO_ROW_LIMIT: usize = usize::MAX;

    pub fn new(offset: usize, limit: usize) -> Self {
        RowBounds { offset, limit }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns true if the window restricts anything
    pub fn is_bounded(&self) -> bool {
        self.offset > Self::NO_ROW_OFFSET || self.limit < Self::NO_ROW_LIMIT
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        RowBounds::new(Self::NO_ROW_OFFSET, Self::NO_ROW_LIMIT)
    }
}

impl fmt::Display for RowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.limit == Self::NO_ROW_LIMIT {
            write!(f, "OFFSET {}", self.offset)
        } else {
            write!(f, "OFFSET {} LIMIT {}", self.offset, self.limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let bounds = RowBounds::default();
        assert!(!bounds.is_bounded());
        assert_eq!(bounds.offset(), 0);
        assert_eq!(bounds.limit(), usize::MAX);
    }

    #[test]
    fn test_bounded() {
        assert!(RowBounds::new(1, RowBounds::NO_ROW_LIMIT).is_bounded());
        assert!(RowBounds::new(0, 10).is_bounded());
        assert_eq!(RowBounds::new(5, 10).to_string(), "OFFSET 5 LIMIT 10");
    }
}
