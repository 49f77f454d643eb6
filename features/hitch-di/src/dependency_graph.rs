use indexmap::{IndexMap, IndexSet};

use crate::{definition::Dependency, errors::BuildError, matcher::Matcher, registry::Registry};

/// Resolved wiring of the entire application
///
/// component name -> parameter name -> name of the component injected for it
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    map: IndexMap<String, IndexMap<String, String>>,
}

impl DependencyGraph {
    /// Resolves every declared parameter of every registered definition.
    ///
    /// Contract parameters go through the [Matcher], concrete parameters must match a registered
    /// type exactly. The first unresolved parameter fails the whole graph.
    pub fn new(registry: &Registry) -> Result<Self, BuildError> {
        let matcher = Matcher::new(registry);
        let mut map = IndexMap::new();

        for definition in registry.iter() {
            let mut resolved = IndexMap::new();

            for (parameter, dependency) in definition.dependencies.iter().flatten() {
                let found = match dependency {
                    Dependency::Contract(contract) => matcher.find(contract)?,
                    Dependency::Concrete(info) => registry.find_by_type(info),
                };

                let Some(found) = found else {
                    return Err(BuildError::MissingDependency {
                        component: definition.name.clone(),
                        parameter: parameter.clone(),
                        required: dependency.required(),
                    });
                };

                tracing::debug!(
                    "Resolved {}.{parameter} to {}",
                    definition.name,
                    found.name
                );
                resolved.insert(parameter.clone(), found.name.clone());
            }

            map.insert(definition.name.clone(), resolved);
        }

        Ok(Self { map })
    }

    /// Parameter to dependency mapping of a component
    pub fn dependencies_of(&self, component: &str) -> Option<&IndexMap<String, String>> {
        self.map.get(component)
    }

    /// The graph with parameter names stripped: component -> set of dependencies
    pub fn edges(&self) -> IndexMap<&str, IndexSet<&str>> {
        self.map
            .iter()
            .map(|(component, params)| {
                (
                    component.as_str(),
                    params.values().map(String::as_str).collect(),
                )
            })
            .collect()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Construction order: every dependency comes before the components depending on it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder(Vec<String>);

impl ExecutionOrder {
    /// Topologically sorts the graph with Kahn's algorithm.
    ///
    /// Components becoming ready at the same time keep their registration order, so the result is
    /// deterministic. Any component left with unresolved dependencies is part of, or waits on, a
    /// cycle.
    pub fn resolve(graph: &DependencyGraph) -> Result<Self, BuildError> {
        let edges = graph.edges();

        // Build adjacency list and compute in-degrees
        let mut in_degree: IndexMap<&str, usize> =
            edges.iter().map(|(component, deps)| (*component, deps.len())).collect();
        let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (component, deps) in &edges {
            for dependency in deps {
                dependents.entry(*dependency).or_default().push(*component);
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(component, _)| *component)
            .collect();
        let mut order = Vec::with_capacity(edges.len());

        while !ready.is_empty() {
            let mut next = Vec::new();
            for component in ready {
                order.push(component.to_string());

                for dependent in dependents.get(component).into_iter().flatten() {
                    let Some(degree) = in_degree.get_mut(dependent) else {
                        continue;
                    };
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }

            // Keep registration order within a level
            next.sort_by_key(|component| in_degree.get_index_of(component));
            ready = next;
        }

        if order.len() != edges.len() {
            let components = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(component, _)| component.to_string())
                .collect();
            return Err(BuildError::CircularDependency { components });
        }

        Ok(Self(order))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
