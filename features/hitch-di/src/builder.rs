use crate::{
    container::Environment,
    definition::IntoDefinitions,
    errors::{LifecycleError, ProvideError},
    initiator::Initiator,
    lifecycle::{Interrupt, LifecycleOptions, Orchestrator, RunOutcome},
    registry::Registry,
    scheduler::Scheduler,
};

//////////////////////////////////////////////////////////////////////
///
/// The Harness consists of two parts.
/// 1. `provide` registers definitions and rebuilds the whole environment
/// 2. `run` drives the environment through start, run and stop
#[derive(Debug, Default)]
pub struct Harness {
    registry: Registry,
    environment: Environment,
    options: LifecycleOptions,
    interrupt: Interrupt,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers definitions and rebuilds graph, order and environment from scratch.
    ///
    /// Re-providing an already registered component replaces it. On error the harness keeps the
    /// state of the last successful `provide`, nothing of the failed call is retained.
    pub fn provide<D: IntoDefinitions>(
        &mut self,
        definitions: D,
    ) -> Result<&mut Self, ProvideError> {
        let mut registry = self.registry.clone();
        registry.register(definitions.into_definitions())?;

        let environment = Initiator::new(&registry).initiate()?;

        self.registry = registry;
        self.environment = environment;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Handle to interrupt a running lifecycle. Once triggered, it stays triggered.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Runs the full lifecycle on a fresh scheduler
    pub fn run(&self) -> Result<RunOutcome, LifecycleError> {
        self.run_with(Scheduler::new())
    }

    /// Runs the full lifecycle, observing `interrupt` instead of the harness' own handle
    pub fn run_until(&self, interrupt: Interrupt) -> Result<RunOutcome, LifecycleError> {
        self.orchestrate(Scheduler::new(), interrupt)
    }

    /// Runs the full lifecycle on the given scheduler and shuts it down afterwards
    pub fn run_with(&self, scheduler: Scheduler) -> Result<RunOutcome, LifecycleError> {
        self.orchestrate(scheduler, self.interrupt.clone())
    }

    fn orchestrate(
        &self,
        scheduler: Scheduler,
        interrupt: Interrupt,
    ) -> Result<RunOutcome, LifecycleError> {
        let mut orchestrator = Orchestrator::new(scheduler, self.options, interrupt);
        let result = orchestrator.run(&self.registry, &self.environment);
        orchestrator.shutdown();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{definition::Component, lifecycle::Phase, types::DynError};

    struct Service;

    fn service() -> Component<Service> {
        Component::instance(Service).on_run(|_| async { Ok::<_, DynError>(()) })
    }

    #[test]
    fn run_until_observes_the_given_interrupt() {
        let mut harness = Harness::new();
        harness.provide(service()).unwrap();

        let interrupt = Interrupt::new();
        interrupt.trigger();

        let outcome = harness.run_until(interrupt).unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Interrupted {
                phase: Phase::Start
            }
        ));
        assert!(!harness.interrupt().is_triggered());
    }

    #[test]
    fn runs_on_a_given_scheduler() {
        let mut harness = Harness::new();
        harness.provide(service()).unwrap();

        assert!(harness.run_with(Scheduler::new()).unwrap().is_completed());
    }

    #[test]
    fn empty_harness_completes() {
        let harness = Harness::new();
        assert!(harness.environment().is_empty());
        assert!(harness.run().unwrap().is_completed());
    }
}
