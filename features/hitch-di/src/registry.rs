use indexmap::IndexMap;

use crate::{definition::ComponentDefinition, errors::RegistrationError, types::TypeInfo};

/// All provided component definitions, keyed by name in registration order
#[derive(Clone, Debug, Default)]
pub struct Registry {
    definitions: IndexMap<String, ComponentDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that a definition can be constructed and has declared its dependencies
    pub fn validate(definition: &ComponentDefinition) -> Result<(), RegistrationError> {
        if definition.constructor.is_none() {
            return Err(RegistrationError::NoConstructor(definition.name.clone()));
        }
        if definition.dependencies.is_none() {
            return Err(RegistrationError::NoAnnotation(definition.name.clone()));
        }
        Ok(())
    }

    /// Validates all definitions, then inserts them.
    ///
    /// Nothing is inserted if one of them is invalid. A definition whose name is already registered
    /// replaces the existing one and keeps its registration position.
    pub fn register(
        &mut self,
        definitions: Vec<ComponentDefinition>,
    ) -> Result<(), RegistrationError> {
        for definition in &definitions {
            Self::validate(definition)?;
        }

        for definition in definitions {
            let name = definition.name.clone();
            if self.definitions.insert(name.clone(), definition).is_some() {
                tracing::debug!("Component {name} was registered again - overwriting");
            } else {
                tracing::debug!("Registered component {name}");
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    /// First registered definition of exactly this type
    pub fn find_by_type(&self, info: &TypeInfo) -> Option<&ComponentDefinition> {
        self.iter()
            .find(|definition| definition.info.type_id == info.type_id)
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
