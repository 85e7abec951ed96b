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

//! Engine settings
//!

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Error, JdbcType, Result};

/// How columns without a declared mapping are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoMappingBehavior {
    /// No automatic mapping
    None,
    /// Automatic mapping for result maps without nested result maps
    #[default]
    Partial,
    /// Automatic mapping everywhere, nested result maps included
    Full,
}

/// What automatic mapping does with a column it cannot place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownColumnBehavior {
    /// Ignore the column
    #[default]
    None,
    /// Log a warning and continue
    Warning,
    /// Fail the row
    Failing,
}

/// Lifetime of the session result cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalCacheScope {
    /// Results live until the session is closed or modified
    #[default]
    Session,
    /// Results are dropped after every outermost query
    Statement,
}

macro_rules! parse_setting_enum {
    ($ty:ident { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.to_ascii_uppercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(Error::invalid_setting(
                        stringify!($ty),
                        format!("unknown value '{}'", s),
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(s)
            }
        }
    };
}

parse_setting_enum!(AutoMappingBehavior {
    "NONE" => None,
    "PARTIAL" => Partial,
    "FULL" => Full,
});

parse_setting_enum!(UnknownColumnBehavior {
    "NONE" => None,
    "WARNING" => Warning,
    "FAILING" => Failing,
});

parse_setting_enum!(LocalCacheScope {
    "SESSION" => Session,
    "STATEMENT" => Statement,
});

/// Settings shared by every statement of a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Which result maps get automatic column mapping
    /// Default: Partial
    pub auto_mapping_behavior: AutoMappingBehavior,

    /// Policy for columns automatic mapping cannot place
    /// Default: None
    pub auto_mapping_unknown_column_behavior: UnknownColumnBehavior,

    /// Match `user_name` columns to `userName` properties
    /// Default: false
    pub map_underscore_to_camel_case: bool,

    /// Write null column values into properties instead of skipping them
    /// Default: false
    pub call_setters_on_nulls: bool,

    /// Return an instance for a row whose columns are all null
    /// Default: false
    pub return_instance_for_empty_row: bool,

    /// Reject row bounds on statements with nested result maps
    /// Default: true
    pub safe_row_bounds_enabled: bool,

    /// Reject custom result handlers on unordered nested result maps
    /// Default: true
    pub safe_result_handler_enabled: bool,

    /// Defer nested queries until their fields are loaded
    /// Default: false
    pub lazy_loading_enabled: bool,

    /// Lifetime of the session result cache
    /// Default: Session
    pub local_cache_scope: LocalCacheScope,

    /// Column kind bound for null parameters without a declared kind
    /// Default: OTHER
    pub jdbc_type_for_null: JdbcType,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_mapping_behavior: AutoMappingBehavior::Partial,
            auto_mapping_unknown_column_behavior: UnknownColumnBehavior::None,
            map_underscore_to_camel_case: false,
            call_setters_on_nulls: false,
            return_instance_for_empty_row: false,
            safe_row_bounds_enabled: true,
            safe_result_handler_enabled: true,
            lazy_loading_enabled: false,
            local_cache_scope: LocalCacheScope::Session,
            jdbc_type_for_null: JdbcType::Other,
        }
    }
}

impl Settings {
    /// Creates settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one setting given by its camelCase name
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "autoMappingBehavior" => self.auto_mapping_behavior = value.parse()?,
            "autoMappingUnknownColumnBehavior" => {
                self.auto_mapping_unknown_column_behavior = value.parse()?
            }
            "mapUnderscoreToCamelCase" => {
                self.map_underscore_to_camel_case = parse_bool(name, value)?
            }
            "callSettersOnNulls" => self.call_setters_on_nulls = parse_bool(name, value)?,
            "returnInstanceForEmptyRow" => {
                self.return_instance_for_empty_row = parse_bool(name, value)?
            }
            "safeRowBoundsEnabled" => self.safe_row_bounds_enabled = parse_bool(name, value)?,
            "safeResultHandlerEnabled" => {
                self.safe_result_handler_enabled = parse_bool(name, value)?
            }
            "lazyLoadingEnabled" => self.lazy_loading_enabled = parse_bool(name, value)?,
            "localCacheScope" => self.local_cache_scope = value.parse()?,
            "jdbcTypeForNull" => {
                self.jdbc_type_for_null = value.parse().map_err(|_| {
                    Error::invalid_setting(name, format!("unknown jdbc type '{}'", value))
                })?
            }
            _ => return Err(Error::invalid_setting(name, "unknown setting")),
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(Error::invalid_setting(
            name,
            format!("expected true or false, found '{}'", value),
        )),
    }
}
