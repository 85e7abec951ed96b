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

//! Object model for mapped results
//!
//! A [`TypeDescriptor`] is the accessor table of a target type: its
//! fields, their logical types and its constructors. It is built once when
//! the type is registered and shared by every [`Record`] of that type.
//!
//! Records are handed around as [`ObjectRef`] handles so that the nested
//! object cache, parent collections and circular back-references all point
//! at the same instance. Each field holds a [`FieldState`], which is either
//! a resolved value or a deferred load waiting for a second pass.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::common::naming::underscore_to_camel;

use super::cache_key::CacheKey;
use super::error::{Error, Result};
use super::types::ValueType;
use super::value::Value;

/// A single field of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Arc<str>,
    pub field_type: ValueType,
    pub writable: bool,
}

/// A constructor of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDescriptor {
    /// Parameter names and types in declaration order
    pub params: Vec<(String, ValueType)>,
    /// Preferred when constructors are selected by column types
    pub automap: bool,
}

impl ConstructorDescriptor {
    /// Parameter types in declaration order
    pub fn param_types(&self) -> impl Iterator<Item = &ValueType> {
        self.params.iter().map(|(_, t)| t)
    }

    /// Returns true if the parameter names equal `names` in any order
    pub fn has_param_names(&self, names: &[&str]) -> bool {
        self.params.len() == names.len()
            && names
                .iter()
                .all(|n| self.params.iter().any(|(p, _)| p == n))
    }
}

/// Accessor table of a target type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: Arc<str>,
    fields: Vec<FieldDescriptor>,
    index: FxHashMap<Arc<str>, usize>,
    /// Upper-cased field name to index, for case-insensitive lookup
    folded: FxHashMap<String, usize>,
    constructors: Vec<ConstructorDescriptor>,
    default_constructor: bool,
    dynamic: bool,
}

impl TypeDescriptor {
    /// Start building a record type
    pub fn builder(name: impl AsRef<str>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            name: Arc::from(name.as_ref()),
            fields: Vec::new(),
            constructors: Vec::new(),
            default_constructor: true,
        }
    }

    /// A dynamic string-keyed record: any property may be set
    pub fn map(name: impl AsRef<str>) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            name: Arc::from(name.as_ref()),
            fields: Vec::new(),
            index: FxHashMap::default(),
            folded: FxHashMap::default(),
            constructors: Vec::new(),
            default_constructor: true,
            dynamic: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor
    }

    /// Returns true for map-kind descriptors
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Index of the field with exactly this name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    /// Returns true if the property can be assigned
    pub fn has_setter(&self, name: &str) -> bool {
        self.dynamic || self.field(name).is_some_and(|f| f.writable)
    }

    /// Returns true if the property can be read
    pub fn has_getter(&self, name: &str) -> bool {
        self.dynamic || self.field(name).is_some()
    }

    /// Declared type of a property; `Any` for dynamic records
    pub fn setter_type(&self, name: &str) -> Option<ValueType> {
        if self.dynamic {
            return Some(ValueType::Any);
        }
        self.field(name).map(|f| f.field_type.clone())
    }

    /// Resolve a dotted property path to its declared type
    ///
    /// Only the first segment is known to this descriptor; deeper segments
    /// are resolved through `lookup` for object-typed fields.
    pub fn getter_type_path(
        &self,
        path: &str,
        lookup: &dyn Fn(&str) -> Option<Arc<TypeDescriptor>>,
    ) -> Option<ValueType> {
        let mut segments = path.splitn(2, '.');
        let head = segments.next()?;
        let head = head.split('[').next().unwrap_or(head);
        let field_type = self.setter_type(head)?;
        match segments.next() {
            None => Some(field_type),
            Some(rest) => match &field_type {
                ValueType::Object(name) => lookup(name)?.getter_type_path(rest, lookup),
                ValueType::Map | ValueType::Any => Some(ValueType::Any),
                _ => None,
            },
        }
    }

    /// Case-insensitive property lookup used by automatic mapping
    ///
    /// With `camel_case` the underscores of `name` are dropped first, so a
    /// column `user_name` finds the field `userName`. Dynamic records
    /// accept any name, converted to camel case when asked.
    pub fn find_property(&self, name: &str, camel_case: bool) -> Option<String> {
        if self.dynamic {
            return Some(if camel_case {
                underscore_to_camel(name)
            } else {
                name.to_string()
            });
        }
        let key = if camel_case {
            name.replace('_', "")
        } else {
            name.to_string()
        };
        self.folded
            .get(&key.to_uppercase())
            .map(|&i| self.fields[i].name.to_string())
    }
}

/// Builder for [`TypeDescriptor`]
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: Arc<str>,
    fields: Vec<FieldDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    default_constructor: bool,
}

impl TypeDescriptorBuilder {
    /// Add a writable field
    pub fn field(mut self, name: impl AsRef<str>, field_type: ValueType) -> Self {
        self.fields.push(FieldDescriptor {
            name: Arc::from(name.as_ref()),
            field_type,
            writable: true,
        });
        self
    }

    /// Add a field that only a constructor can assign
    pub fn read_only_field(mut self, name: impl AsRef<str>, field_type: ValueType) -> Self {
        self.fields.push(FieldDescriptor {
            name: Arc::from(name.as_ref()),
            field_type,
            writable: false,
        });
        self
    }

    /// Declare a constructor taking the named fields in order
    pub fn constructor(mut self, params: &[(&str, ValueType)]) -> Self {
        self.constructors.push(ConstructorDescriptor {
            params: params
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
            automap: false,
        });
        self
    }

    /// Declare the constructor preferred by automatic constructor selection
    pub fn automap_constructor(mut self, params: &[(&str, ValueType)]) -> Self {
        self = self.constructor(params);
        if let Some(last) = self.constructors.last_mut() {
            last.automap = true;
        }
        self
    }

    /// The type has no zero-argument constructor
    pub fn without_default_constructor(mut self) -> Self {
        self.default_constructor = false;
        self
    }

    pub fn build(self) -> Result<Arc<TypeDescriptor>> {
        let mut index = FxHashMap::default();
        let mut folded = FxHashMap::default();
        for (i, field) in self.fields.iter().enumerate() {
            if index.insert(Arc::clone(&field.name), i).is_some() {
                return Err(Error::AmbiguousAccessor {
                    type_name: self.name.to_string(),
                    property: field.name.to_string(),
                });
            }
            folded.insert(field.name.to_uppercase(), i);
        }
        for ctor in &self.constructors {
            for (param, _) in &ctor.params {
                if !index.contains_key(param.as_str()) {
                    return Err(Error::no_such_property(self.name.as_ref(), param.as_str()));
                }
            }
        }
        Ok(Arc::new(TypeDescriptor {
            name: self.name,
            fields: self.fields,
            index,
            folded,
            constructors: self.constructors,
            default_constructor: self.default_constructor,
            dynamic: false,
        }))
    }
}

/// A sub-query whose result has not been loaded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredField {
    /// Qualified id of the statement that produces the value
    pub statement_id: String,
    pub parameter: Value,
    pub target_type: ValueType,
    pub cache_key: CacheKey,
}

/// State of one field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Resolved(Value),
    Deferred(DeferredField),
}

impl FieldState {
    pub fn is_deferred(&self) -> bool {
        matches!(self, FieldState::Deferred(_))
    }

    /// Resolved value, null while deferred
    pub fn value(&self) -> Value {
        match self {
            FieldState::Resolved(v) => v.clone(),
            FieldState::Deferred(_) => Value::Null,
        }
    }
}

/// Field storage of one object
#[derive(Debug, Clone)]
pub struct Record {
    descriptor: Arc<TypeDescriptor>,
    slots: Vec<FieldState>,
    /// Properties of dynamic records, in insertion order
    extra: Vec<(String, FieldState)>,
}

impl Record {
    /// A record with every field null
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let slots = vec![FieldState::Resolved(Value::Null); descriptor.fields.len()];
        Record {
            descriptor,
            slots,
            extra: Vec::new(),
        }
    }

    /// A record built through one of its declared constructors
    pub fn with_constructor(
        descriptor: Arc<TypeDescriptor>,
        ctor: &ConstructorDescriptor,
        args: Vec<Value>,
    ) -> Result<Self> {
        let mut record = Record::new(Arc::clone(&descriptor));
        for ((name, _), arg) in ctor.params.iter().zip(args) {
            let idx = descriptor
                .field_index(name)
                .ok_or_else(|| Error::no_such_property(descriptor.name(), name.as_str()))?;
            record.slots[idx] = FieldState::Resolved(arg);
        }
        Ok(record)
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    fn slot(&self, name: &str) -> Option<&FieldState> {
        match self.descriptor.field_index(name) {
            Some(i) => Some(&self.slots[i]),
            None => self
                .extra
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, state)| state),
        }
    }

    fn slot_mut(&mut self, name: &str, for_write: bool) -> Result<&mut FieldState> {
        if let Some(i) = self.descriptor.field_index(name) {
            if for_write && !self.descriptor.fields[i].writable {
                return Err(Error::no_such_property(self.descriptor.name(), name));
            }
            return Ok(&mut self.slots[i]);
        }
        if !self.descriptor.dynamic {
            return Err(Error::no_such_property(self.descriptor.name(), name));
        }
        let pos = match self.extra.iter().position(|(k, _)| k == name) {
            Some(pos) => pos,
            None => {
                self.extra
                    .push((name.to_string(), FieldState::Resolved(Value::Null)));
                self.extra.len() - 1
            }
        };
        Ok(&mut self.extra[pos].1)
    }

    /// Field value; deferred fields read as null
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slot(name).map(FieldState::value)
    }

    pub fn state(&self, name: &str) -> Option<&FieldState> {
        self.slot(name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        *self.slot_mut(name, true)? = FieldState::Resolved(value);
        Ok(())
    }

    pub fn set_deferred(&mut self, name: &str, deferred: DeferredField) -> Result<()> {
        *self.slot_mut(name, true)? = FieldState::Deferred(deferred);
        Ok(())
    }

    /// Append to a list field, creating the list on first use
    pub fn push(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = self.slot_mut(name, true)?;
        match slot {
            FieldState::Resolved(Value::List(items)) => items.push(value),
            other => *other = FieldState::Resolved(Value::List(vec![value])),
        }
        Ok(())
    }

    /// Field names and states in declaration order
    pub fn fields(&self) -> Vec<(String, FieldState)> {
        let declared = self
            .descriptor
            .fields
            .iter()
            .zip(&self.slots)
            .map(|(f, s)| (f.name.to_string(), s.clone()));
        declared.chain(self.extra.iter().cloned()).collect()
    }

    /// Remove and return every deferred field
    pub fn take_deferred(&mut self) -> Vec<(String, DeferredField)> {
        let mut out = Vec::new();
        let names: Vec<Arc<str>> = self.descriptor.fields.iter().map(|f| f.name.clone()).collect();
        for (name, slot) in names.iter().zip(self.slots.iter_mut()) {
            if let FieldState::Deferred(d) = slot {
                out.push((name.to_string(), d.clone()));
                *slot = FieldState::Resolved(Value::Null);
            }
        }
        for (name, slot) in self.extra.iter_mut() {
            if let FieldState::Deferred(d) = slot {
                out.push((name.clone(), d.clone()));
                *slot = FieldState::Resolved(Value::Null);
            }
        }
        out
    }
}

/// Shared handle to a [`Record`]
///
/// Equality and hashing are by identity. Guards are only held for a single
/// read or write, so a handle can be reached through cycles safely.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Record>>);

impl ObjectRef {
    pub fn new(record: Record) -> Self {
        ObjectRef(Arc::new(RwLock::new(record)))
    }

    /// A fresh record of the given type with every field null
    pub fn instantiate(descriptor: &Arc<TypeDescriptor>) -> Self {
        ObjectRef::new(Record::new(Arc::clone(descriptor)))
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address used for identity hashing and visited sets
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(self.0.read().descriptor())
    }

    pub fn type_name(&self) -> Arc<str> {
        self.0.read().descriptor().name_arc()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.read().get(name)
    }

    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        self.0.write().set(name, value)
    }

    pub fn push(&self, name: &str, value: Value) -> Result<()> {
        self.0.write().push(name, value)
    }

    pub fn set_deferred(&self, name: &str, deferred: DeferredField) -> Result<()> {
        self.0.write().set_deferred(name, deferred)
    }

    pub fn is_deferred(&self, name: &str) -> bool {
        self.0
            .read()
            .state(name)
            .is_some_and(FieldState::is_deferred)
    }

    pub fn fields(&self) -> Vec<(String, FieldState)> {
        self.0.read().fields()
    }

    pub fn take_deferred(&self) -> Vec<(String, DeferredField)> {
        self.0.write().take_deferred()
    }

    /// Run `f` with shared access to the record
    pub fn with<R>(&self, f: impl FnOnce(&Record) -> R) -> R {
        f(&self.0.read())
    }
}

impl fmt::Debug for ObjectRef {
    // Fields are not printed: graphs may be cyclic
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.type_name(), self.addr())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

/// One segment of a property path such as `orders[0].lines`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<String>,
}

/// Split a property path into segments
///
/// `a.b[2].c` yields `a`, `b[2]`, `c`. Dots inside brackets are kept.
pub fn split_property_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in path.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '.' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| match s.find('[') {
            Some(open) => {
                let close = s.rfind(']').unwrap_or(s.len());
                let index = s[open + 1..close.max(open + 1)]
                    .trim_matches(|c| c == '\'' || c == '"')
                    .to_string();
                PathSegment {
                    name: s[..open].to_string(),
                    index: Some(index),
                }
            }
            None => PathSegment {
                name: s,
                index: None,
            },
        })
        .collect()
}
