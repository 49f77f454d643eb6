use std::future::Future;

use futures::{
    executor::{LocalPool, LocalSpawner},
    future::RemoteHandle,
    task::{LocalSpawnExt, SpawnError},
};

/// Single threaded cooperative executor driving the lifecycle hooks.
///
/// Tasks only make progress while the scheduler is blocked on a future via
/// [block_on](Scheduler::block_on). Dropping the handle returned by [spawn](Scheduler::spawn)
/// cancels the task.
pub struct Scheduler {
    pool: LocalPool,
    spawner: LocalSpawner,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        tracing::debug!("Scheduler started");
        Self { pool, spawner }
    }

    /// Schedules a task, it starts running the next time the scheduler is driven
    pub fn spawn<F>(&self, future: F) -> Result<RemoteHandle<F::Output>, SpawnError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.spawner.spawn_local_with_handle(future)
    }

    /// Drives all scheduled tasks until `future` completes
    pub fn block_on<F: Future>(&mut self, future: F) -> F::Output {
        self.pool.run_until(future)
    }

    /// Spawner for tasks which want to schedule further work
    pub fn spawner(&self) -> LocalSpawner {
        self.spawner.clone()
    }

    /// Lets remaining tasks run until none can make progress, then drops them
    pub fn shutdown(mut self) {
        self.pool.run_until_stalled();
        tracing::debug!("Scheduler shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use futures::{channel::oneshot, future::join};

    use super::*;

    #[test]
    fn spawned_tasks_interleave() {
        let mut scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (tx, rx) = oneshot::channel::<()>();

        let waiting = {
            let log = log.clone();
            scheduler
                .spawn(async move {
                    log.borrow_mut().push("waiting");
                    let _ = rx.await;
                    log.borrow_mut().push("woken");
                })
                .unwrap()
        };
        let waking = {
            let log = log.clone();
            scheduler
                .spawn(async move {
                    log.borrow_mut().push("waking");
                    let _ = tx.send(());
                })
                .unwrap()
        };

        scheduler.block_on(join(waiting, waking));
        assert_eq!(*log.borrow(), ["waiting", "waking", "woken"]);
    }

    #[test]
    fn dropped_handle_cancels_task() {
        let mut scheduler = Scheduler::new();
        let ran = Rc::new(RefCell::new(false));

        let handle = {
            let ran = ran.clone();
            scheduler
                .spawn(async move {
                    *ran.borrow_mut() = true;
                })
                .unwrap()
        };
        drop(handle);
        scheduler.block_on(async {});
        scheduler.shutdown();

        assert!(!*ran.borrow());
    }
}
