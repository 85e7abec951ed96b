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

//! Core type definitions for Sqlweave
//!
//! This module defines the column-native kinds reported by a row cursor
//! ([`JdbcType`]), the logical types values are converted to
//! ([`ValueType`]) and the direction of statement parameters.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Column-native kind of a value, as declared by a cursor or a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum JdbcType {
    /// NULL literal column
    Null = 0,
    Bit = 1,
    Boolean = 2,
    Tinyint = 3,
    Smallint = 4,
    Integer = 5,
    Bigint = 6,
    Float = 7,
    Real = 8,
    Double = 9,
    Numeric = 10,
    Decimal = 11,
    Char = 12,
    Varchar = 13,
    Longvarchar = 14,
    Nvarchar = 15,
    Clob = 16,
    Date = 17,
    Time = 18,
    Timestamp = 19,
    Binary = 20,
    Blob = 21,
    /// Cursor returned by a stored procedure OUT parameter
    Cursor = 22,
    Array = 23,
    Struct = 24,
    /// Vendor JSON column
    Json = 25,
    /// Anything else
    Other = 26,
    /// Kind could not be determined
    Undefined = 27,
}

impl JdbcType {
    /// Returns true for integral column kinds
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            JdbcType::Tinyint | JdbcType::Smallint | JdbcType::Integer | JdbcType::Bigint
        )
    }

    /// Returns true for character column kinds
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            JdbcType::Char
                | JdbcType::Varchar
                | JdbcType::Longvarchar
                | JdbcType::Nvarchar
                | JdbcType::Clob
        )
    }

    /// The logical type a column of this kind naturally reads as
    pub fn natural_type(&self) -> ValueType {
        match self {
            JdbcType::Bit | JdbcType::Boolean => ValueType::Boolean,
            t if t.is_integral() => ValueType::Integer,
            JdbcType::Float
            | JdbcType::Real
            | JdbcType::Double
            | JdbcType::Numeric
            | JdbcType::Decimal => ValueType::Float,
            t if t.is_character() => ValueType::Text,
            JdbcType::Date | JdbcType::Time | JdbcType::Timestamp => ValueType::Timestamp,
            JdbcType::Json => ValueType::Json,
            JdbcType::Cursor => ValueType::Cursor,
            JdbcType::Array => ValueType::List,
            _ => ValueType::Any,
        }
    }
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JdbcType::Null => "NULL",
            JdbcType::Bit => "BIT",
            JdbcType::Boolean => "BOOLEAN",
            JdbcType::Tinyint => "TINYINT",
            JdbcType::Smallint => "SMALLINT",
            JdbcType::Integer => "INTEGER",
            JdbcType::Bigint => "BIGINT",
            JdbcType::Float => "FLOAT",
            JdbcType::Real => "REAL",
            JdbcType::Double => "DOUBLE",
            JdbcType::Numeric => "NUMERIC",
            JdbcType::Decimal => "DECIMAL",
            JdbcType::Char => "CHAR",
            JdbcType::Varchar => "VARCHAR",
            JdbcType::Longvarchar => "LONGVARCHAR",
            JdbcType::Nvarchar => "NVARCHAR",
            JdbcType::Clob => "CLOB",
            JdbcType::Date => "DATE",
            JdbcType::Time => "TIME",
            JdbcType::Timestamp => "TIMESTAMP",
            JdbcType::Binary => "BINARY",
            JdbcType::Blob => "BLOB",
            JdbcType::Cursor => "CURSOR",
            JdbcType::Array => "ARRAY",
            JdbcType::Struct => "STRUCT",
            JdbcType::Json => "JSON",
            JdbcType::Other => "OTHER",
            JdbcType::Undefined => "UNDEFINED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JdbcType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NULL" => Ok(JdbcType::Null),
            "BIT" => Ok(JdbcType::Bit),
            "BOOLEAN" | "BOOL" => Ok(JdbcType::Boolean),
            "TINYINT" => Ok(JdbcType::Tinyint),
            "SMALLINT" => Ok(JdbcType::Smallint),
            "INTEGER" | "INT" => Ok(JdbcType::Integer),
            "BIGINT" => Ok(JdbcType::Bigint),
            "FLOAT" => Ok(JdbcType::Float),
            "REAL" => Ok(JdbcType::Real),
            "DOUBLE" => Ok(JdbcType::Double),
            "NUMERIC" => Ok(JdbcType::Numeric),
            "DECIMAL" => Ok(JdbcType::Decimal),
            "CHAR" => Ok(JdbcType::Char),
            "VARCHAR" => Ok(JdbcType::Varchar),
            "LONGVARCHAR" => Ok(JdbcType::Longvarchar),
            "NVARCHAR" => Ok(JdbcType::Nvarchar),
            "CLOB" => Ok(JdbcType::Clob),
            "DATE" => Ok(JdbcType::Date),
            "TIME" => Ok(JdbcType::Time),
            "TIMESTAMP" => Ok(JdbcType::Timestamp),
            "BINARY" => Ok(JdbcType::Binary),
            "BLOB" => Ok(JdbcType::Blob),
            "CURSOR" => Ok(JdbcType::Cursor),
            "ARRAY" => Ok(JdbcType::Array),
            "STRUCT" => Ok(JdbcType::Struct),
            "JSON" => Ok(JdbcType::Json),
            "OTHER" => Ok(JdbcType::Other),
            "UNDEFINED" => Ok(JdbcType::Undefined),
            _ => Err(Error::UnknownType(s.to_string())),
        }
    }
}

/// Logical type of a value, used to pick a converter
///
/// `Object` names a record type registered with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Unknown or untyped; converters pass values through
    #[default]
    Any,
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Json,
    /// Result set handle produced by a CURSOR out parameter
    Cursor,
    List,
    Map,
    Object(Arc<str>),
}

impl ValueType {
    /// Create an object type by name
    pub fn object(name: impl AsRef<str>) -> Self {
        ValueType::Object(Arc::from(name.as_ref()))
    }

    /// Returns true for types that hold a single scalar value
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ValueType::Integer
                | ValueType::Float
                | ValueType::Text
                | ValueType::Boolean
                | ValueType::Timestamp
                | ValueType::Json
        )
    }

    /// Name of the record type for `Object`
    pub fn object_name(&self) -> Option<&str> {
        match self {
            ValueType::Object(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::Text => write!(f, "text"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Timestamp => write!(f, "timestamp"),
            ValueType::Json => write!(f, "json"),
            ValueType::Cursor => write!(f, "cursor"),
            ValueType::List => write!(f, "list"),
            ValueType::Map => write!(f, "map"),
            ValueType::Object(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for ValueType {
    type Err = Error;

    /// Parse a type alias; anything unrecognized names a record type
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::UnknownType(s.to_string()));
        }
        Ok(match trimmed.to_lowercase().as_str() {
            "any" | "object" => ValueType::Any,
            "int" | "integer" | "long" | "short" | "byte" | "i64" | "i32" => ValueType::Integer,
            "float" | "double" | "decimal" | "bigdecimal" | "f64" => ValueType::Float,
            "string" | "text" | "str" => ValueType::Text,
            "bool" | "boolean" => ValueType::Boolean,
            "date" | "timestamp" | "datetime" => ValueType::Timestamp,
            "json" => ValueType::Json,
            "cursor" | "resultset" => ValueType::Cursor,
            "list" | "arraylist" | "collection" | "array" => ValueType::List,
            "map" | "hashmap" => ValueType::Map,
            _ => ValueType::object(trimmed),
        })
    }
}

/// Direction of a statement parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterMode::In => write!(f, "IN"),
            ParameterMode::Out => write!(f, "OUT"),
            ParameterMode::InOut => write!(f, "INOUT"),
        }
    }
}

impl FromStr for ParameterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IN" => Ok(ParameterMode::In),
            "OUT" => Ok(ParameterMode::Out),
            "INOUT" => Ok(ParameterMode::InOut),
            _ => Err(Error::UnknownType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jdbc_type_from_str() {
        assert_eq!("VARCHAR".parse::<JdbcType>().unwrap(), JdbcType::Varchar);
        assert_eq!("varchar".parse::<JdbcType>().unwrap(), JdbcType::Varchar);
        assert_eq!("INT".parse::<JdbcType>().unwrap(), JdbcType::Integer);
        assert!("NOPE".parse::<JdbcType>().is_err());
    }

    #[test]
    fn test_jdbc_type_display_roundtrip() {
        for t in [
            JdbcType::Bigint,
            JdbcType::Cursor,
            JdbcType::Timestamp,
            JdbcType::Other,
        ] {
            assert_eq!(t.to_string().parse::<JdbcType>().unwrap(), t);
        }
    }

    #[test]
    fn test_natural_type() {
        assert_eq!(JdbcType::Bigint.natural_type(), ValueType::Integer);
        assert_eq!(JdbcType::Nvarchar.natural_type(), ValueType::Text);
        assert_eq!(JdbcType::Decimal.natural_type(), ValueType::Float);
        assert_eq!(JdbcType::Other.natural_type(), ValueType::Any);
    }

    #[test]
    fn test_value_type_aliases() {
        assert_eq!("int".parse::<ValueType>().unwrap(), ValueType::Integer);
        assert_eq!("String".parse::<ValueType>().unwrap(), ValueType::Text);
        assert_eq!("HashMap".parse::<ValueType>().unwrap(), ValueType::Map);
        assert_eq!(
            "Author".parse::<ValueType>().unwrap(),
            ValueType::object("Author")
        );
        assert!("  ".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_parameter_mode() {
        assert_eq!("inout".parse::<ParameterMode>().unwrap(), ParameterMode::InOut);
        assert_eq!(ParameterMode::default(), ParameterMode::In);
        assert!("sideways".parse::<ParameterMode>().is_err());
    }
}
