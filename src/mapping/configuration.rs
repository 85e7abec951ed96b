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

//! Configuration: everything statements need at run time
//!

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;

use crate::core::{Error, Result, TypeDescriptor, ValueType};
use crate::types::TypeHandlerRegistry;

use super::result_map::ResultMap;
use super::settings::Settings;
use super::statement::MappedStatement;

static MAP_DESCRIPTOR: LazyLock<Arc<TypeDescriptor>> = LazyLock::new(|| TypeDescriptor::map("map"));

/// Settings, converters, record types, result maps and statements
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    settings: Settings,
    type_handlers: TypeHandlerRegistry,
    types: FxHashMap<String, Arc<TypeDescriptor>>,
    result_maps: FxHashMap<String, Arc<ResultMap>>,
    statements: FxHashMap<String, Arc<MappedStatement>>,
    environment_id: Option<String>,
    database_id: Option<String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Configuration {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn type_handlers(&self) -> &TypeHandlerRegistry {
        &self.type_handlers
    }

    pub fn type_handlers_mut(&mut self) -> &mut TypeHandlerRegistry {
        &mut self.type_handlers
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    pub fn set_environment_id(&mut self, id: impl Into<String>) {
        self.environment_id = Some(id.into());
    }

    pub fn database_id(&self) -> Option<&str> {
        self.database_id.as_deref()
    }

    pub fn set_database_id(&mut self, id: impl Into<String>) {
        self.database_id = Some(id.into());
    }

    // =========================================================================
    // Record types
    // =========================================================================

    pub fn register_type(&mut self, descriptor: Arc<TypeDescriptor>) -> Result<()> {
        let name = descriptor.name().to_string();
        if self.types.contains_key(&name) {
            return Err(Error::DuplicateId(name));
        }
        self.types.insert(name, descriptor);
        Ok(())
    }

    pub fn type_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }

    /// Accessor table used to build objects of `value_type`
    ///
    /// Map and untyped targets use a dynamic record that accepts any
    /// property.
    pub fn descriptor_for(&self, value_type: &ValueType) -> Result<Arc<TypeDescriptor>> {
        match value_type {
            ValueType::Object(name) => self
                .type_descriptor(name)
                .ok_or_else(|| Error::UnknownType(name.to_string())),
            ValueType::Map | ValueType::Any => Ok(Arc::clone(&MAP_DESCRIPTOR)),
            other => Err(Error::CannotInstantiate(other.to_string())),
        }
    }

    // =========================================================================
    // Result maps
    // =========================================================================

    pub fn add_result_map(&mut self, result_map: ResultMap) -> Result<()> {
        let id = result_map.id().to_string();
        if self.result_maps.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        self.result_maps.insert(id, Arc::new(result_map));
        Ok(())
    }

    pub fn result_map(&self, id: &str) -> Result<Arc<ResultMap>> {
        self.result_maps
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ResultMapNotFound(id.to_string()))
    }

    pub fn has_result_map(&self, id: &str) -> bool {
        self.result_maps.contains_key(id)
    }

    /// Flag every result map whose discriminated sub-maps nest result maps
    ///
    /// Runs after all maps of a batch are registered, since cases may
    /// reference maps defined later.
    pub fn resolve_discriminated_nested_result_maps(&mut self) {
        let flagged: Vec<String> = self
            .result_maps
            .values()
            .filter(|rm| !rm.has_nested_result_maps())
            .filter(|rm| {
                rm.discriminator().is_some_and(|d| {
                    d.cases().iter().any(|(_, case_id)| {
                        self.result_maps
                            .get(case_id)
                            .is_some_and(|case| case.has_nested_result_maps())
                    })
                })
            })
            .map(|rm| rm.id().to_string())
            .collect();
        for id in flagged {
            if let Some(rm) = self.result_maps.get_mut(&id) {
                Arc::make_mut(rm).force_nested_result_maps();
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn add_statement(&mut self, statement: MappedStatement) -> Result<()> {
        if self.statements.contains_key(&statement.id) {
            return Err(Error::DuplicateId(statement.id));
        }
        self.statements
            .insert(statement.id.clone(), Arc::new(statement));
        Ok(())
    }

    pub fn statement(&self, id: &str) -> Result<Arc<MappedStatement>> {
        self.statements
            .get(id)
            .cloned()
            .ok_or_else(|| Error::StatementNotFound(id.to_string()))
    }

    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    /// Returns true if any result map of the statement nests result maps
    pub fn has_nested_result_maps(&self, statement: &MappedStatement) -> bool {
        statement
            .result_maps
            .iter()
            .filter_map(|id| self.result_maps.get(id))
            .any(|rm| rm.has_nested_result_maps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::result_map::{Discriminator, ResultMapping};

    #[test]
    fn test_descriptor_lookup() {
        let mut config = Configuration::new();
        let user = TypeDescriptor::builder("User")
            .field("id", ValueType::Integer)
            .build()
            .unwrap();
        config.register_type(Arc::clone(&user)).unwrap();
        assert!(config.register_type(user).is_err());
        assert_eq!(config.descriptor_for(&ValueType::object("User")).unwrap().name(), "User");
        assert!(config.descriptor_for(&ValueType::Map).unwrap().is_dynamic());
        assert!(matches!(
            config.descriptor_for(&ValueType::object("Nope")),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_missing_references() {
        let config = Configuration::new();
        assert!(config.result_map("x").unwrap_err().is_not_found());
        assert!(config.statement("y").unwrap_err().is_not_found());
    }

    #[test]
    fn test_discriminated_nested_maps_are_forced() {
        let mut config = Configuration::new();
        let registry = TypeHandlerRegistry::new();
        let nested = ResultMapping::builder(Some("parts"), None)
            .nested_result_map("ns.part")
            .build(&registry)
            .unwrap();
        let car = ResultMap::builder("ns.car", ValueType::Map, vec![nested])
            .build(None)
            .unwrap();
        let kind = ResultMapping::builder(None, Some("kind")).build(&registry).unwrap();
        let vehicle = ResultMap::builder("ns.vehicle", ValueType::Map, vec![])
            .discriminator(Discriminator::new(kind, vec![("car".into(), "ns.car".into())]))
            .build(None)
            .unwrap();
        config.add_result_map(vehicle).unwrap();
        config.add_result_map(car).unwrap();
        assert!(!config.result_map("ns.vehicle").unwrap().has_nested_result_maps());
        config.resolve_discriminated_nested_result_maps();
        assert!(config.result_map("ns.vehicle").unwrap().has_nested_result_maps());
    }
}
