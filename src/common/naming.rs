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

//! Column and property name helpers

/// Convert `user_name` or `USER_NAME` style names to `userName`
pub fn underscore_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Strip `prefix` from the start of `name`, ignoring ASCII case
pub fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if name.len() >= prefix.len()
        && name.is_char_boundary(prefix.len())
        && name[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&name[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_to_camel() {
        assert_eq!(underscore_to_camel("user_name"), "userName");
        assert_eq!(underscore_to_camel("USER_NAME"), "userName");
        assert_eq!(underscore_to_camel("ID"), "id");
        assert_eq!(underscore_to_camel("_private"), "private");
        assert_eq!(underscore_to_camel("plain"), "plain");
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("AUTHOR_ID", "author_"), Some("ID"));
        assert_eq!(strip_prefix_ignore_case("id", "author_"), None);
        assert_eq!(strip_prefix_ignore_case("x", ""), Some("x"));
    }
}
