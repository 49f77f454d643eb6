use std::{any::type_name, fmt::Debug, sync::Arc};

use indexmap::IndexMap;

use crate::{
    dependency_graph::{DependencyGraph, ExecutionOrder},
    errors::RequireError,
    types::{Injectable, Instance, TypeInfo},
};

/// Every constructed component of one build, read-only once built
#[derive(Clone, Default)]
pub struct Environment(Arc<EnvironmentInner>);

#[derive(Default)]
struct EnvironmentInner {
    instances: IndexMap<String, Instance>,
    graph: DependencyGraph,
    order: ExecutionOrder,
}

impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.instances.keys())
            .finish()
    }
}

impl Environment {
    pub(crate) fn new(
        instances: IndexMap<String, Instance>,
        graph: DependencyGraph,
        order: ExecutionOrder,
    ) -> Self {
        Self(Arc::new(EnvironmentInner {
            instances,
            graph,
            order,
        }))
    }

    /// Attempts to get the instance of the requested type
    pub fn require<T: Injectable>(&self) -> Result<Arc<T>, RequireError> {
        let info = TypeInfo::of::<T>();
        let instance = self
            .0
            .instances
            .values()
            .find(|instance| instance.info == info)
            .ok_or(RequireError::TypeMissing(type_name::<T>()))?;

        instance
            .downcast()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// The instance constructed for a component name
    pub fn get(&self, component: &str) -> Result<&Instance, RequireError> {
        self.0
            .instances
            .get(component)
            .ok_or_else(|| RequireError::ComponentMissing(component.to_string()))
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.0.graph
    }

    pub fn order(&self) -> &ExecutionOrder {
        &self.0.order
    }

    pub fn len(&self) -> usize {
        self.0.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.instances.is_empty()
    }
}
