use hitch_di::{InjectError, TypeInfo};

/// Errors when registering or retrieving configs
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The required config is not registered
    #[error("The required config '{0}' is not known")]
    ConfigMissing(TypeInfo),
    /// A config of the same type is already registered
    #[error("The config '{0}' is already registered")]
    ConfigAlreadyRegistered(TypeInfo),
    /// The provider itself could not be taken from the dependencies
    #[error(transparent)]
    Inject(#[from] InjectError),
}
