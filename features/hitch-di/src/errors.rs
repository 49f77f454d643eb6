use std::sync::Arc;

use thiserror::Error;

use crate::{
    contract::TypeRef,
    lifecycle::{LifecycleState, Phase},
    matcher::ReturnedUnionType,
    types::DynError,
};

/// Errors raised while validating definitions passed to `provide`
#[derive(Error, Debug, Clone)]
pub enum RegistrationError {
    /// The definition has no way to construct the component
    #[error("Provided component '{0}' does not have a constructor")]
    NoConstructor(String),
    /// The definition never declared its constructor dependencies
    #[error("Provided component '{0}' does not declare its constructor dependencies")]
    NoAnnotation(String),
}

/// Errors while resolving, ordering and constructing components
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// No registered component satisfies a parameter
    #[error("Can't build dependencies for '{component}'. Missing suitable argument for parameter '{parameter}' [{required}]")]
    MissingDependency {
        component: String,
        parameter: String,
        required: TypeRef,
    },
    /// The resolved graph contains a cycle
    #[error("A circular dependency exists between {components:?}")]
    CircularDependency { components: Vec<String> },
    /// A candidate could only be matched through a union return type
    #[error(transparent)]
    ReturnedUnionType(#[from] ReturnedUnionType),
    /// A constructor returned an error
    #[error("Constructor for '{component}' failed - error: {error}")]
    ConstructionFailed {
        component: String,
        error: Arc<DynError>,
    },
}

/// Errors returned by `Harness::provide`
#[derive(Error, Debug, Clone)]
pub enum ProvideError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors during the lifecycle phases
#[derive(Error, Debug, Clone)]
pub enum LifecycleError {
    /// A start or run hook was registered as blocking
    #[error("{component}.{phase} must be an async hook")]
    InvalidLifecycleMethod { component: String, phase: Phase },
    /// A start or run hook returned an error
    #[error("{phase} hook of '{component}' failed - error: {error}")]
    HookFailed {
        component: String,
        phase: Phase,
        error: Arc<DynError>,
    },
    /// The phase barrier was not reached in time
    #[error("{0} phase timed out")]
    PhaseTimeout(Phase),
    /// A stop hook returned an error, remaining teardown was skipped
    #[error("stop hook of '{component}' failed - error: {error}")]
    StopHookFailed {
        component: String,
        error: Arc<DynError>,
    },
    /// The orchestrator is not idle
    #[error("Lifecycle already ran, current state is {0:?}")]
    AlreadyRan(LifecycleState),
    /// The scheduler refused a task
    #[error("Failed to schedule {phase} hook of '{component}'")]
    Spawn { component: String, phase: Phase },
}

/// Errors when a constructor pulls its dependencies
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// The parameter was not declared on the definition
    #[error("Parameter '{0}' was not declared")]
    UnknownParameter(String),
    #[error(transparent)]
    RequireError(#[from] RequireError),
}

/// Errors when trying to require a certain type
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// The required type is not known
    #[error("The required type '{0}' is not known.")]
    TypeMissing(&'static str),
    /// The required component name is not known
    #[error("The component '{0}' is not known.")]
    ComponentMissing(String),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// The instance does not expose the requested view
    #[error("'{actual_type}' does not expose a view as '{required_type}'")]
    ViewMissing {
        required_type: &'static str,
        actual_type: &'static str,
    },
}
