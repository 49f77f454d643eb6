//! Drives constructed components through start, run and stop.
//!
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Stopped
//!            |           ^          ^
//!            +-----------|----------+  (failure, timeout or interrupt)
//! ```
//!
//! Start and run hooks of all components are spawned onto the [Scheduler] together and awaited
//! as a single barrier. Stop hooks run one after another in reverse execution order.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
    thread::{self, sleep},
    time::Duration,
};

use futures::{
    future::FusedFuture,
    pin_mut,
    stream::FuturesUnordered,
    task::AtomicWaker,
    FutureExt, StreamExt,
};
use futures_channel::oneshot;

use crate::{
    container::Environment,
    definition::LifecycleHook,
    errors::LifecycleError,
    registry::Registry,
    scheduler::Scheduler,
};

/// One of the three coordinated lifecycle stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Run,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Start => "start",
            Phase::Run => "run",
            Phase::Stop => "stop",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Timeouts for the concurrent phases, none by default
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleOptions {
    pub start_timeout: Option<Duration>,
    pub run_timeout: Option<Duration>,
}

impl LifecycleOptions {
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    fn timeout(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Start => self.start_timeout,
            Phase::Run => self.run_timeout,
            Phase::Stop => None,
        }
    }
}

/// How the start and run phases ended. Stop always ran afterwards.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Start and run completed
    Completed,
    /// The interrupt was observed at the barrier of `phase`
    Interrupted { phase: Phase },
    /// `phase` failed, the phases after it were skipped
    Failed { phase: Phase, error: LifecycleError },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// External request to skip the remaining phases and stop.
///
/// Can be cloned and triggered from any thread, e.g. a signal handler. It is only observed at the
/// start and run phase barriers.
#[derive(Clone, Default)]
pub struct Interrupt(Arc<InterruptInner>);

#[derive(Default)]
struct InterruptInner {
    triggered: AtomicBool,
    waker: AtomicWaker,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.triggered.store(true, Ordering::SeqCst);
        self.0.waker.wake();
    }

    pub fn is_triggered(&self) -> bool {
        self.0.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once triggered
    fn triggered(&self) -> Triggered<'_> {
        Triggered(&self.0)
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Interrupt").field(&self.is_triggered()).finish()
    }
}

struct Triggered<'a>(&'a InterruptInner);

impl Future for Triggered<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.0.triggered.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }
        self.0.waker.register(cx.waker());
        // Check again, trigger might have happened before the waker was registered
        if self.0.triggered.load(Ordering::SeqCst) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Result of waiting on a phase barrier
enum Barrier {
    Completed,
    Interrupted,
    Failed(LifecycleError),
}

/// Runs start, run and stop over an [Environment]
pub struct Orchestrator {
    scheduler: Scheduler,
    state: LifecycleState,
    options: LifecycleOptions,
    interrupt: Interrupt,
}

impl Orchestrator {
    pub fn new(scheduler: Scheduler, options: LifecycleOptions, interrupt: Interrupt) -> Self {
        Self {
            scheduler,
            state: LifecycleState::Idle,
            options,
            interrupt,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Runs start, then run if start completed, then always stop.
    ///
    /// Failures and interrupts during start or run are logged and reported in the [RunOutcome].
    /// Only a failing stop hook is returned as an error, it skips the remaining teardown.
    pub fn run(
        &mut self,
        registry: &Registry,
        env: &Environment,
    ) -> Result<RunOutcome, LifecycleError> {
        if self.state != LifecycleState::Idle {
            return Err(LifecycleError::AlreadyRan(self.state));
        }

        self.transition(LifecycleState::Starting);
        let outcome = match self.concurrent_phase(Phase::Start, registry, env) {
            Barrier::Completed => {
                self.transition(LifecycleState::Running);
                match self.concurrent_phase(Phase::Run, registry, env) {
                    Barrier::Completed => RunOutcome::Completed,
                    barrier => Self::early_stop(Phase::Run, barrier),
                }
            }
            barrier => Self::early_stop(Phase::Start, barrier),
        };

        self.transition(LifecycleState::Stopping);
        let stopped = self.stop_phase(registry, env);
        self.transition(LifecycleState::Stopped);

        stopped.map(|()| outcome)
    }

    /// Releases the scheduler
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }

    fn transition(&mut self, state: LifecycleState) {
        tracing::debug!("Lifecycle {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn early_stop(phase: Phase, barrier: Barrier) -> RunOutcome {
        match barrier {
            Barrier::Completed => RunOutcome::Completed,
            Barrier::Interrupted => {
                tracing::warn!("Interrupted during {phase} phase - proceeding to stop");
                RunOutcome::Interrupted { phase }
            }
            Barrier::Failed(error) => {
                tracing::error!("{phase} phase failed - proceeding to stop: {error}");
                RunOutcome::Failed { phase, error }
            }
        }
    }

    /// Spawns the async hooks of every component and waits for all of them
    fn concurrent_phase(
        &mut self,
        phase: Phase,
        registry: &Registry,
        env: &Environment,
    ) -> Barrier {
        // Collect everything first, a blocking hook aborts before anything was launched
        let mut hooks = Vec::new();
        for name in env.order().iter() {
            let Some(hook) = registry.get(name).and_then(|d| d.hook(phase)) else {
                tracing::debug!("{name} has no {phase} hook - skipping");
                continue;
            };
            let LifecycleHook::Async(hook) = hook else {
                return Barrier::Failed(LifecycleError::InvalidLifecycleMethod {
                    component: name.to_string(),
                    phase,
                });
            };
            let Ok(instance) = env.get(name) else {
                tracing::error!("{name} has a {phase} hook but no instance - skipping");
                continue;
            };
            hooks.push((name.to_string(), hook.clone(), instance.clone()));
        }

        let tasks = FuturesUnordered::new();
        for (component, hook, instance) in hooks {
            let Ok(handle) = self.scheduler.spawn(hook(instance)) else {
                return Barrier::Failed(LifecycleError::Spawn { component, phase });
            };
            tasks.push(async move { (component, handle.await) });
        }

        let task_count = tasks.len();
        tracing::debug!("Waiting for {task_count} {phase} hooks");

        let timeout = timer(self.options.timeout(phase));
        let interrupt = self.interrupt.clone();
        let barrier = async move {
            let mut tasks = tasks;
            let interrupted = interrupt.triggered().fuse();
            pin_mut!(interrupted, timeout);

            loop {
                futures::select_biased! {
                    _ = interrupted => return Barrier::Interrupted,
                    _ = timeout => return Barrier::Failed(LifecycleError::PhaseTimeout(phase)),
                    result = tasks.next() => match result {
                        None => return Barrier::Completed,
                        Some((component, Ok(()))) => {
                            tracing::debug!("{phase} hook of {component} completed");
                        }
                        Some((component, Err(error))) => {
                            return Barrier::Failed(LifecycleError::HookFailed {
                                component,
                                phase,
                                error: Arc::new(error),
                            })
                        }
                    },
                }
            }
        };

        self.scheduler.block_on(barrier)
    }

    /// Runs stop hooks one at a time in reverse execution order
    fn stop_phase(&mut self, registry: &Registry, env: &Environment) -> Result<(), LifecycleError> {
        for name in env.order().iter().rev() {
            let Some(hook) = registry.get(name).and_then(|d| d.hook(Phase::Stop)) else {
                continue;
            };
            let Ok(instance) = env.get(name) else {
                tracing::error!("{name} has a stop hook but no instance - skipping");
                continue;
            };

            tracing::debug!("Stopping {name}");
            let result = match hook {
                LifecycleHook::Async(hook) => self.scheduler.block_on(hook(instance.clone())),
                LifecycleHook::Blocking(hook) => hook(instance.clone()),
            };
            result.map_err(|error| LifecycleError::StopHookFailed {
                component: name.to_string(),
                error: Arc::new(error),
            })?;
        }
        Ok(())
    }
}

/// Resolves after `timeout`, never without one
fn timer(timeout: Option<Duration>) -> impl FusedFuture<Output = ()> {
    let receiver = timeout.map(|timeout| {
        let (timeout_tx, timeout_rx) = oneshot::channel::<()>();
        // We don't join the thread - it will just die after the timeout
        thread::spawn(move || {
            sleep(timeout);
            let _ = timeout_tx.send(());
        });
        timeout_rx
    });

    async move {
        match receiver {
            Some(receiver) => {
                let _ = receiver.await;
            }
            None => futures::future::pending::<()>().await,
        }
    }
    .fuse()
}
