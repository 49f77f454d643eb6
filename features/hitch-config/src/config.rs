use std::{ops::Deref, sync::Arc};

use hitch_di::{Dependencies, Injectable, TypeInfo};

use crate::{errors::ConfigError, provider::ConfigProvider};

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry
/// inside the constructor of a component depending on the [ConfigProvider]
///
/// # Example
/// ```ignore
/// struct ServerConfig {
///     port: u16,
/// }
///
/// let mut configs = ConfigProvider::new();
/// configs.add_config(ServerConfig { port: 8080 })?;
///
/// harness.provide((
///     configs.into_component(),
///     Component::<Server>::new()
///         .depends_on::<ConfigProvider>("configs")
///         .constructor(|deps| -> Result<Server, ConfigError> {
///             let config = Config::<ServerConfig>::from_dependencies(deps, "configs")?;
///             Ok(Server::bind(config.port))
///         }),
/// ))?;
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Injectable> Config<T> {
    /// Looks up the config of type `T` in the provider injected for `param`
    pub fn from_dependencies(deps: &Dependencies, param: &str) -> Result<Self, ConfigError> {
        let provider = deps.get::<ConfigProvider>(param)?;

        let inner = provider
            .get_config::<T>()?
            .ok_or_else(|| ConfigError::ConfigMissing(TypeInfo::of::<T>()))?;

        Ok(Config { inner })
    }
}
