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

//! Placeholder token parser
//!
//! Scans text left to right for `open…close` spans and replaces each with
//! whatever the handler returns for the enclosed payload. A backslash
//! before an open marker makes it literal. Inside a payload, a backslash
//! before a close marker keeps the marker as data. An open marker with no
//! matching close marker is copied through unchanged.

use crate::core::Result;

/// Placeholder scanner for one pair of markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParser {
    open: String,
    close: String,
}

impl TokenParser {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        TokenParser {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Parser for `#{...}` parameter placeholders
    pub fn parameters() -> Self {
        TokenParser::new("#{", "}")
    }

    /// Parser for `${...}` text substitutions
    pub fn substitutions() -> Self {
        TokenParser::new("${", "}")
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// Replace every placeholder in `text` with the handler's output
    pub fn parse<F>(&self, text: &str, handler: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<String>,
    {
        parse_tokens(text, &self.open, &self.close, handler)
    }

    /// Returns true if `text` contains at least one unescaped placeholder
    pub fn has_tokens(&self, text: &str) -> bool {
        let mut found = false;
        // The handler cannot fail, so the result is always Ok
        let _ = self.parse(text, |_| {
            found = true;
            Ok(String::new())
        });
        found
    }
}

/// Single-pass placeholder replacement
pub fn parse_tokens<F>(text: &str, open: &str, close: &str, mut handler: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    if text.is_empty() || open.is_empty() || close.is_empty() {
        return Ok(text.to_string());
    }
    let mut start = match text.find(open) {
        Some(pos) => pos,
        None => return Ok(text.to_string()),
    };

    let bytes = text.as_bytes();
    let mut offset = 0;
    let mut builder = String::with_capacity(text.len());
    let mut expression = String::new();

    loop {
        if start > offset && bytes[start - 1] == b'\\' {
            // Escaped open marker: drop the backslash, keep the marker
            builder.push_str(&text[offset..start - 1]);
            builder.push_str(open);
            offset = start + open.len();
        } else {
            expression.clear();
            builder.push_str(&text[offset..start]);
            offset = start + open.len();

            let mut end = find_from(text, close, offset);
            while let Some(e) = end {
                if e > offset && bytes[e - 1] == b'\\' {
                    expression.push_str(&text[offset..e - 1]);
                    expression.push_str(close);
                    offset = e + close.len();
                    end = find_from(text, close, offset);
                } else {
                    expression.push_str(&text[offset..e]);
                    break;
                }
            }

            match end {
                None => {
                    // Unterminated: emit the rest verbatim
                    builder.push_str(&text[start..]);
                    offset = text.len();
                }
                Some(e) => {
                    builder.push_str(&handler(&expression)?);
                    offset = e + close.len();
                }
            }
        }

        match find_from(text, open, offset) {
            Some(next) => start = next,
            None => break,
        }
    }

    if offset < text.len() {
        builder.push_str(&text[offset..]);
    }
    Ok(builder)
}

fn find_from(text: &str, pattern: &str, from: usize) -> Option<usize> {
    text.get(from..)
        .and_then(|rest| rest.find(pattern))
        .map(|pos| pos + from)
}
