use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    container::Environment,
    definition::Dependencies,
    dependency_graph::{DependencyGraph, ExecutionOrder},
    errors::{BuildError, RequireError},
    registry::Registry,
    types::{DynError, Instance},
};

/// Builds the [Environment] for a registry
pub(crate) struct Initiator<'a> {
    registry: &'a Registry,
}

impl<'a> Initiator<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Resolves the graph, orders it and constructs every component.
    ///
    /// Nothing is returned unless every step succeeded.
    pub(crate) fn initiate(self) -> Result<Environment, BuildError> {
        tracing::debug!(
            "Building environment with {} components",
            self.registry.len()
        );

        let graph = DependencyGraph::new(self.registry)?;
        let order = ExecutionOrder::resolve(&graph)?;
        let instances = self.instantiate(&graph, &order)?;

        tracing::debug!("All components constructed");
        Ok(Environment::new(instances, graph, order))
    }

    /// Constructs every component exactly once, strictly in execution order
    fn instantiate(
        &self,
        graph: &DependencyGraph,
        order: &ExecutionOrder,
    ) -> Result<IndexMap<String, Instance>, BuildError> {
        let mut instances: IndexMap<String, Instance> = IndexMap::with_capacity(order.len());

        for name in order.iter() {
            let definition = self.registry.get(name).ok_or_else(|| {
                construction_failed(name, RequireError::ComponentMissing(name.to_string()))
            })?;
            let constructor = definition.constructor.as_ref().ok_or_else(|| {
                construction_failed(name, RequireError::ComponentMissing(name.to_string()))
            })?;

            let mut resolved = IndexMap::new();
            for (parameter, dependency) in graph.dependencies_of(name).into_iter().flatten() {
                // Dependencies precede their dependers in the order, so they are already built
                let instance = instances.get(dependency).ok_or_else(|| {
                    construction_failed(
                        name,
                        RequireError::ComponentMissing(dependency.to_string()),
                    )
                })?;
                resolved.insert(parameter.clone(), instance.clone());
            }

            let dependencies = Dependencies {
                component: name.to_string(),
                resolved,
            };
            let instance = constructor(&dependencies)
                .map_err(|error| BuildError::ConstructionFailed {
                    component: name.to_string(),
                    error: Arc::new(error),
                })?
                .with_views(definition.views.clone());

            tracing::debug!("Constructed instance of {name}");
            instances.insert(name.to_string(), instance);
        }

        Ok(instances)
    }
}

fn construction_failed(component: &str, error: RequireError) -> BuildError {
    BuildError::ConstructionFailed {
        component: component.to_string(),
        error: Arc::new(Box::new(error) as DynError),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        any::type_name,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{definition::Component, errors::InjectError};

    struct Pool {
        size: usize,
    }
    struct Repo {
        pool: Arc<Pool>,
    }

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    fn registry_of(definitions: Vec<crate::definition::ComponentDefinition>) -> Registry {
        let mut registry = Registry::new();
        registry.register(definitions).unwrap();
        registry
    }

    #[test]
    fn injects_built_dependencies() {
        let registry = registry_of(vec![
            Component::<Repo>::new()
                .depends_on::<Pool>("pool")
                .constructor(|deps| -> Result<Repo, InjectError> {
                    CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                    Ok(Repo {
                        pool: deps.get("pool")?,
                    })
                })
                .into_definition(),
            Component::instance(Pool { size: 4 }).into_definition(),
        ]);

        let env = Initiator::new(&registry).initiate().unwrap();

        let repo = env.require::<Repo>().unwrap();
        let pool = env.require::<Pool>().unwrap();
        assert!(Arc::ptr_eq(&repo.pool, &pool));
        assert_eq!(repo.pool.size, 4);
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
        assert_eq!(
            env.order().as_slice(),
            [type_name::<Pool>(), type_name::<Repo>()]
        );
    }

    #[test]
    fn constructor_failure_aborts_build() {
        let registry = registry_of(vec![
            Component::instance(Pool { size: 0 }).into_definition(),
            Component::<Repo>::new()
                .depends_on::<Pool>("pool")
                .constructor(|deps| -> Result<Repo, DynError> {
                    let pool = deps.get::<Pool>("pool")?;
                    if pool.size == 0 {
                        return Err(DynError::from("empty pool"));
                    }
                    Ok(Repo { pool })
                })
                .into_definition(),
        ]);

        let Err(BuildError::ConstructionFailed { component, error }) =
            Initiator::new(&registry).initiate()
        else {
            panic!("expected construction to fail");
        };
        assert_eq!(component, type_name::<Repo>());
        assert_eq!(error.to_string(), "empty pool");
    }
}
