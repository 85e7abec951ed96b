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

//! Grammar of `#{...}` placeholder payloads
//!
//! ```text
//! payload  := ws (property | '(' expression ')') ws [ ':' jdbcType ] [ ',' options ]
//! options  := name '=' value { ',' name '=' value }
//! ```
//!
//! The property form is the only one the statement compiler accepts; the
//! parenthesized form is recognized so it can be rejected explicitly.

use crate::core::{Error, Result};

/// Parsed attributes of one placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterExpression {
    entries: Vec<(String, String)>,
}

impl ParameterExpression {
    pub fn parse(content: &str) -> Result<Self> {
        let mut scanner = Scanner {
            content,
            bytes: content.as_bytes(),
            parsed: ParameterExpression::default(),
        };
        scanner.parse()?;
        Ok(scanner.parsed)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn property(&self) -> Option<&str> {
        self.get("property")
    }

    /// Attributes in the order they were written
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    fn put(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }
}

struct Scanner<'a> {
    content: &'a str,
    bytes: &'a [u8],
    parsed: ParameterExpression,
}

impl Scanner<'_> {
    fn error(&self, position: usize) -> Error {
        Error::parameter_parse(self.content, position)
    }

    fn parse(&mut self) -> Result<()> {
        let p = self.skip_ws(0);
        if p >= self.bytes.len() {
            return Err(self.error(p));
        }
        if self.bytes[p] == b'(' {
            self.expression(p + 1)
        } else {
            self.property(p)
        }
    }

    fn expression(&mut self, left: usize) -> Result<()> {
        let mut depth = 1usize;
        let mut right = left;
        while depth > 0 {
            match self.bytes.get(right) {
                None => return Err(self.error(right)),
                Some(b')') => depth -= 1,
                Some(b'(') => depth += 1,
                Some(_) => {}
            }
            right += 1;
        }
        let expression = self.trimmed(left, right - 1);
        self.parsed.put("expression", &expression);
        self.jdbc_type_opt(right)
    }

    fn property(&mut self, left: usize) -> Result<()> {
        let right = self.skip_until(left, b",:");
        let property = self.trimmed(left, right);
        self.parsed.put("property", &property);
        self.jdbc_type_opt(right)
    }

    fn jdbc_type_opt(&mut self, p: usize) -> Result<()> {
        let p = self.skip_ws(p);
        match self.bytes.get(p) {
            None => Ok(()),
            Some(b':') => self.jdbc_type(p + 1),
            Some(b',') => self.options(p + 1),
            Some(_) => Err(self.error(p)),
        }
    }

    fn jdbc_type(&mut self, p: usize) -> Result<()> {
        let left = self.skip_ws(p);
        let right = self.skip_until(left, b",");
        if right <= left {
            return Err(self.error(p));
        }
        let jdbc_type = self.trimmed(left, right);
        self.parsed.put("jdbcType", &jdbc_type);
        self.options(right + 1)
    }

    fn options(&mut self, mut p: usize) -> Result<()> {
        loop {
            let left = self.skip_ws(p);
            if left >= self.bytes.len() {
                return Ok(());
            }
            let eq = self.skip_until(left, b"=");
            if eq >= self.bytes.len() {
                return Err(self.error(left));
            }
            let name = self.trimmed(left, eq);
            let right = self.skip_until(eq + 1, b",");
            let value = self.trimmed(eq + 1, right);
            self.parsed.put(&name, &value);
            p = right + 1;
        }
    }

    fn skip_ws(&self, p: usize) -> usize {
        (p..self.bytes.len())
            .find(|&i| self.bytes[i] > 0x20)
            .unwrap_or(self.bytes.len())
    }

    fn skip_until(&self, p: usize, end_chars: &[u8]) -> usize {
        (p..self.bytes.len())
            .find(|&i| end_chars.contains(&self.bytes[i]))
            .unwrap_or(self.bytes.len())
    }

    fn trimmed(&self, start: usize, end: usize) -> String {
        let end = end.min(self.bytes.len());
        if start >= end {
            return String::new();
        }
        self.content[start..end]
            .trim_matches(|c: char| c <= ' ')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_property() {
        let p = ParameterExpression::parse("id").unwrap();
        assert_eq!(p.property(), Some("id"));
        assert_eq!(p.entries().len(), 1);
    }

    #[test]
    fn test_property_with_whitespace() {
        let p = ParameterExpression::parse(" id ").unwrap();
        assert_eq!(p.property(), Some("id"));
    }

    #[test]
    fn test_jdbc_type_shorthand() {
        let p = ParameterExpression::parse("id:VARCHAR").unwrap();
        assert_eq!(p.property(), Some("id"));
        assert_eq!(p.get("jdbcType"), Some("VARCHAR"));

        let p = ParameterExpression::parse("id : VARCHAR , mode = OUT").unwrap();
        assert_eq!(p.get("jdbcType"), Some("VARCHAR"));
        assert_eq!(p.get("mode"), Some("OUT"));
    }

    #[test]
    fn test_options() {
        let p =
            ParameterExpression::parse("name,jdbcType=VARCHAR, typeHandler = text ,numericScale=2")
                .unwrap();
        assert_eq!(p.property(), Some("name"));
        assert_eq!(p.get("jdbcType"), Some("VARCHAR"));
        assert_eq!(p.get("typeHandler"), Some("text"));
        assert_eq!(p.get("numericScale"), Some("2"));
    }

    #[test]
    fn test_expression_form() {
        let p = ParameterExpression::parse("(id.toString()):VARCHAR").unwrap();
        assert_eq!(p.get("expression"), Some("id.toString()"));
        assert_eq!(p.get("jdbcType"), Some("VARCHAR"));
        assert_eq!(p.property(), None);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ParameterExpression::parse("(id) x"),
            Err(Error::ParameterParse { position: 5, .. })
        ));
        assert!(ParameterExpression::parse("id:").is_err());
        assert!(ParameterExpression::parse("(unbalanced").is_err());
        assert!(ParameterExpression::parse("id, jdbcType").is_err());
        assert!(ParameterExpression::parse("   ").is_err());
    }

    #[test]
    fn test_error_message() {
        let err = ParameterExpression::parse("(id) x").unwrap_err();
        assert_eq!(err.to_string(), "parsing error in {(id) x} in position 5");
    }
}
