use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use hitch_di::{Component, Injectable, TypeInfo};

use crate::errors::ConfigError;

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type, one config per type.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Arc<dyn Any + Send + Sync + 'static>>,
}

impl fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("configs", &self.configs.len())
            .finish()
    }
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    ///
    /// Returns `Ok(None)` if no config of type `T` is registered
    pub fn get_config<T: Injectable>(&self) -> Result<Option<Arc<T>>, ConfigError> {
        self.configs
            .get(&TypeId::of::<T>())
            .map(|entry| entry.clone().downcast())
            .transpose()
            .map_err(|_| ConfigError::ConfigMissing(TypeInfo::of::<T>()))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`ConfigError::ConfigAlreadyRegistered`] error
    pub fn add_config<T: Injectable>(&mut self, config: T) -> Result<&mut Self, ConfigError> {
        let info = TypeInfo::of::<T>();

        if self.configs.contains_key(&info.type_id) {
            return Err(ConfigError::ConfigAlreadyRegistered(info));
        }

        tracing::debug!("Registered config {info}");
        self.configs.insert(info.type_id, Arc::new(config));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling
    /// [`ConfigProvider::add_config`].
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Injectable>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, ConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Turns the provider into a component, so dependers can declare it as a dependency
    pub fn into_component(self) -> Component<ConfigProvider> {
        Component::instance(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Database {
        url: String,
    }

    #[test]
    fn add_and_get() {
        let mut provider = ConfigProvider::new();
        provider
            .add_config(Database {
                url: "memory://".to_string(),
            })
            .unwrap()
            .add_config(8080_u16)
            .unwrap();

        let database = provider.get_config::<Database>().unwrap().unwrap();
        assert_eq!(database.url, "memory://");
        assert_eq!(*provider.get_config::<u16>().unwrap().unwrap(), 8080);
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn unknown_config_is_none() {
        let provider = ConfigProvider::new();
        assert!(provider.get_config::<Database>().unwrap().is_none());
    }

    #[test]
    fn duplicate_config_is_rejected() {
        let mut provider = ConfigProvider::new();
        provider.add_config(1_u8).unwrap();

        let err = provider.add_config(2_u8).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConfigAlreadyRegistered(info) if info == TypeInfo::of::<u8>()
        ));
        assert_eq!(*provider.get_config::<u8>().unwrap().unwrap(), 1);
    }

    #[test]
    fn maybe_add_skips_none() {
        let mut provider = ConfigProvider::new();
        provider
            .maybe_add_config::<Database>(None)
            .unwrap()
            .maybe_add_config(Some(true))
            .unwrap();

        assert_eq!(provider.len(), 1);
        assert!(provider.get_config::<Database>().unwrap().is_none());
    }

    #[test]
    fn debug_lists_config_count() {
        let mut provider = ConfigProvider::new();
        provider.add_config(1_u8).unwrap().add_config(true).unwrap();

        assert_eq!(format!("{provider:?}"), "ConfigProvider { configs: 2 }");
    }
}
