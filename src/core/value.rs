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

//! Value type for Sqlweave - runtime values flowing through templates,
//! parameters and mapped results
//!
//! Scalars mirror column values. `List`, `Map` and `Object` carry
//! parameter objects and the graphs built by the result mapping engine.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::error::{Error, Result};
use super::object::{split_property_path, ObjectRef};
use super::types::ValueType;

/// Timestamp formats supported for parsing
/// Order matters - more specific formats first
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z", // RFC3339 with fractional seconds
    "%Y-%m-%dT%H:%M:%S%:z",    // RFC3339
    "%Y-%m-%dT%H:%M:%SZ",      // RFC3339 UTC
    "%Y-%m-%dT%H:%M:%S",       // ISO without timezone
    "%Y-%m-%d %H:%M:%S%.f",    // SQL-style with fractional seconds
    "%Y-%m-%d %H:%M:%S",       // SQL-style
    "%Y-%m-%d",                // Date only
];

/// A runtime value
///
/// Text and Json use Arc<str> for cheap cloning, since rows and bindings
/// are cloned freely while templates and results are built.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// NULL / absent value
    #[default]
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 text string (Arc for cheap cloning)
    Text(Arc<str>),

    /// Boolean value
    Boolean(bool),

    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),

    /// JSON document (Arc for cheap cloning)
    Json(Arc<str>),

    /// Ordered list of values
    List(Vec<Value>),

    /// String-keyed map, iterated in key order
    Map(BTreeMap<String, Value>),

    /// Handle to a mapped record
    Object(ObjectRef),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn null() -> Self {
        Value::Null
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(Arc::from(value.into().as_str()))
    }

    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }

    pub fn json(value: impl Into<String>) -> Self {
        Value::Json(Arc::from(value.into().as_str()))
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Value::List(values.into_iter().collect())
    }

    /// Build a map value from key/value pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn object(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }

    // =========================================================================
    // Type accessors
    // =========================================================================

    /// Logical type of this value; null reads as `Any`
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Json(_) => ValueType::Json,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Object(o) => ValueType::Object(o.type_name()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values a single converter can handle
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Value::List(_) | Value::Map(_) | Value::Object(_) | Value::Null
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Truth value used by template conditions
    ///
    /// Booleans are taken as-is, numbers are true when non-zero, null is
    /// false and every other value is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            _ => true,
        }
    }

    // =========================================================================
    // Value extractors
    // =========================================================================

    /// Extract as i64, with type coercion
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
            Value::Boolean(b) => Some(if *b { 1 } else { 0 }),
            Value::Timestamp(t) => Some(t.timestamp_millis()),
            _ => None,
        }
    }

    /// Extract as f64, with type coercion
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Extract as boolean, with type coercion
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Integer(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::Text(s) => {
                let s_ref: &str = s.as_ref();
                if s_ref.eq_ignore_ascii_case("true")
                    || s_ref.eq_ignore_ascii_case("t")
                    || s_ref.eq_ignore_ascii_case("yes")
                    || s_ref.eq_ignore_ascii_case("y")
                    || s_ref == "1"
                {
                    Some(true)
                } else if s_ref.eq_ignore_ascii_case("false")
                    || s_ref.eq_ignore_ascii_case("f")
                    || s_ref.eq_ignore_ascii_case("no")
                    || s_ref.eq_ignore_ascii_case("n")
                    || s_ref == "0"
                {
                    Some(false)
                } else {
                    None
                }
            }
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract as string reference (avoids clone for Text/Json)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Json(s) => Some(s),
            _ => None,
        }
    }

    /// Extract as DateTime<Utc>
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            Value::Text(s) => parse_timestamp(s).ok(),
            Value::Integer(millis) => Utc.timestamp_millis_opt(*millis).single(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// String used as a discriminator or map key
    ///
    /// Null stringifies as `"null"`.
    pub fn to_key_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }

    // =========================================================================
    // Property navigation
    // =========================================================================

    /// Returns true if `name` can be read from this value
    pub fn has_property(&self, name: &str) -> bool {
        match self {
            Value::Map(m) => m.contains_key(name),
            Value::Object(o) => o.with(|r| r.descriptor().has_getter(name)),
            _ => false,
        }
    }

    /// Read a named property
    ///
    /// Missing map keys and navigation through null read as null. Reading
    /// a property a record type does not declare is an error.
    pub fn property(&self, name: &str) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Map(m) => Ok(m.get(name).cloned().unwrap_or(Value::Null)),
            Value::Object(o) => o.with(|r| {
                if r.descriptor().has_getter(name) {
                    Ok(r.get(name).unwrap_or(Value::Null))
                } else {
                    Err(Error::no_such_property(r.descriptor().name(), name))
                }
            }),
            other => Err(Error::no_such_property(other.value_type().to_string(), name)),
        }
    }

    /// Read an element by list position or map key
    pub fn index(&self, key: &Value) -> Result<Value> {
        match (self, key) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::List(items), k) => {
                let idx = k
                    .as_int64()
                    .filter(|i| *i >= 0)
                    .ok_or_else(|| Error::no_such_property("list", format!("[{}]", k)))?;
                items
                    .get(idx as usize)
                    .cloned()
                    .ok_or_else(|| Error::no_such_property("list", format!("[{}]", idx)))
            }
            (Value::Map(m), k) => Ok(m.get(&k.to_key_string()).cloned().unwrap_or(Value::Null)),
            (Value::Object(_), k) => self.property(&k.to_key_string()),
            (other, k) => Err(Error::no_such_property(
                other.value_type().to_string(),
                format!("[{}]", k),
            )),
        }
    }

    /// Read a property path such as `author.posts[0].title`
    pub fn get_path(&self, path: &str) -> Result<Value> {
        let mut current = self.clone();
        for segment in split_property_path(path) {
            if !segment.name.is_empty() {
                current = current.property(&segment.name)?;
            }
            if let Some(index) = segment.index {
                let key = match index.parse::<i64>() {
                    Ok(i) if current.as_list().is_some() => Value::Integer(i),
                    _ => Value::text(index),
                };
                current = current.index(&key)?;
            }
        }
        Ok(current)
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Compare two values for ordering
    ///
    /// Numbers compare across integer and float, and against numeric text.
    /// Returns None for values that have no ordering between them.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() || b.is_numeric() => {
                let (x, y) = (a.as_float64()?, b.as_float64()?);
                Some(compare_floats(x, y))
            }
            _ => None,
        }
    }

    /// Equality used by expressions: like `==` but numeric text equals
    /// the number it spells
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self == other
            || (self.is_numeric() != other.is_numeric()
                && self.compare(other) == Some(Ordering::Equal))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Json(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(o) => write!(f, "{:?}", o),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // NaN equals NaN so that keys stay reflexive
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            // Cross-type numeric comparison: Integer vs Float
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                *f == (*i as f64)
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integer(5) == Float(5.0), so numbers hash as f64 bits
        match self {
            Value::Null => 0u8.hash(state),
            Value::Integer(v) => {
                1u8.hash(state);
                (*v as f64).to_bits().hash(state);
            }
            Value::Float(v) => {
                1u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Value::Timestamp(t) => {
                4u8.hash(state);
                t.timestamp_nanos_opt().hash(state);
            }
            Value::Json(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            Value::List(items) => {
                6u8.hash(state);
                items.hash(state);
            }
            Value::Map(m) => {
                7u8.hash(state);
                for (k, v) in m {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Object(o) => {
                8u8.hash(state);
                o.hash(state);
            }
        }
    }
}

// =========================================================================
// From implementations
// =========================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Parse a timestamp string in any supported format
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
    }
    Err(Error::type_conversion(format!("'{}'", s), "TIMESTAMP"))
}

/// Format float for display
fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        // Integer-like float, format without decimal
        format!("{:.0}", v)
    } else {
        let s = format!("{:?}", v);
        if s.contains('.') && !s.contains('e') && !s.contains('E') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

/// Compare two floats with proper NaN handling
fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
