//! Hitch DI wires components together from their declared constructor dependencies and drives
//! them through a start, run and stop lifecycle.
//!
//! 1. Components are declared with [Component] and handed to [Harness::provide]
//! 2. Every parameter is resolved, either to a component of exactly the required type or to the
//!    first registered component structurally satisfying a [Contract]
//! 3. Components are constructed once each, dependencies first, into the [Environment]
//! 4. [Harness::run] starts all components concurrently, runs them concurrently and finally stops
//!    them one by one in reverse construction order
//!
//! ```ignore
//! let mut harness = Harness::new();
//! harness.provide((
//!     Component::instance(Settings::default()),
//!     Component::<Server>::new()
//!         .depends_on::<Settings>("settings")
//!         .constructor(|deps| Ok::<_, DynError>(Server::new(deps.get("settings")?)))
//!         .on_run(|server| async move { server.serve().await })
//!         .on_stop_blocking(|server| server.close()),
//! ))?;
//! harness.run()?;
//! ```

pub mod builder;
pub mod container;
pub mod contract;
pub mod definition;
pub mod dependency_graph;
pub mod errors;
mod initiator;
pub mod lifecycle;
pub mod matcher;
pub mod registry;
pub mod scheduler;
pub mod types;

pub use builder::Harness;
pub use container::Environment;
pub use contract::{Capability, Contract, Shape, Signature, TypeRef};
pub use definition::{Component, ComponentDefinition, Dependencies, IntoDefinitions};
pub use errors::{BuildError, InjectError, LifecycleError, ProvideError, RegistrationError};
pub use lifecycle::{Interrupt, LifecycleOptions, LifecycleState, Phase, RunOutcome};
pub use scheduler::Scheduler;
pub use types::{DynError, Injectable, Instance, TypeInfo};
