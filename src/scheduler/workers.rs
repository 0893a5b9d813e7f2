// src/scheduler/workers.rs

//! Short and long worker pools.
//!
//! Each pool keeps a configured target size. A worker that blocks inside a
//! wait is counted as blocked, and a replacement is spawned while the pool is
//! below target (bounded by `max_workers_per_pool`). Surplus workers exit the
//! next time they look for work.

use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::scheduler::{SchedulerHandle, Shared, State};
use crate::types::WorkerKind;

thread_local! {
    /// Scheduler id and pool of the worker running on this thread.
    static WORKER: Cell<Option<(u64, WorkerKind)>> = const { Cell::new(None) };
}

/// Pool of the current thread, if it is a worker of scheduler `scheduler_id`.
pub(crate) fn current_worker(scheduler_id: u64) -> Option<WorkerKind> {
    WORKER
        .with(Cell::get)
        .filter(|(id, _)| *id == scheduler_id)
        .map(|(_, kind)| kind)
}

#[derive(Default)]
pub(crate) struct PoolState {
    /// Configured number of active workers.
    pub target: usize,
    /// Live threads, including blocked ones.
    pub allocated: usize,
    /// Workers sleeping inside a wait.
    pub blocked: usize,
    pub handles: Vec<JoinHandle<()>>,
    next_index: usize,
}

impl PoolState {
    pub fn active(&self) -> usize {
        self.allocated.saturating_sub(self.blocked)
    }
}

impl SchedulerHandle {
    /// Resize both pools. Counts are clamped to `1..=max_workers_per_pool`.
    ///
    /// Growing spawns threads right away; shrinking lets surplus workers exit
    /// after their current invocation.
    pub fn set_worker_count(&self, short: usize, long: usize) -> Result<()> {
        let max = self.shared.max_workers_per_pool;
        let mut state = self.shared.state.lock();

        for (kind, requested) in [(WorkerKind::Short, short), (WorkerKind::Long, long)] {
            let target = requested.clamp(1, max);
            state.pool_mut(kind).target = target;
            while state.pool(kind).active() < target && state.pool(kind).allocated < max {
                self.spawn_worker_locked(&mut state, kind)?;
            }
            info!(pool = %kind, target, allocated = state.pool(kind).allocated, "worker pool resized");
            self.shared.pool_signal(kind).notify_all();
        }
        Ok(())
    }

    /// Number of live threads in a pool. May exceed the configured count while
    /// replacement threads cover for blocked workers.
    pub fn allocated_worker_count(&self, kind: WorkerKind) -> usize {
        self.shared.state.lock().pool(kind).allocated
    }

    pub fn configured_worker_count(&self, kind: WorkerKind) -> usize {
        self.shared.state.lock().pool(kind).target
    }

    fn spawn_worker_locked(&self, state: &mut State, kind: WorkerKind) -> Result<()> {
        let pool = state.pool_mut(kind);
        let index = pool.next_index;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("frametasks-{kind}-{index}"))
            .spawn(move || worker_loop(shared, kind))?;

        pool.next_index += 1;
        pool.allocated += 1;
        pool.handles.retain(|h| !h.is_finished());
        pool.handles.push(handle);
        Ok(())
    }

    /// A worker of `kind` is about to sleep inside a wait.
    pub(crate) fn enter_blocked_locked(&self, state: &mut State, kind: WorkerKind) {
        let max = self.shared.max_workers_per_pool;
        let pool = state.pool_mut(kind);
        pool.blocked += 1;
        if pool.active() < pool.target && pool.allocated < max {
            debug!(pool = %kind, blocked = pool.blocked, "spawning replacement for blocked worker");
            if let Err(err) = self.spawn_worker_locked(state, kind) {
                warn!(pool = %kind, error = %err, "failed to spawn replacement worker");
            }
        }
    }

    pub(crate) fn leave_blocked_locked(&self, state: &mut State, kind: WorkerKind) {
        let pool = state.pool_mut(kind);
        pool.blocked = pool.blocked.saturating_sub(1);
        if pool.active() > pool.target {
            self.shared.pool_signal(kind).notify_all();
        }
    }
}

fn worker_loop(shared: Arc<Shared>, kind: WorkerKind) {
    let handle = SchedulerHandle { shared };
    WORKER.with(|w| w.set(Some((handle.shared.id, kind))));
    debug!(pool = %kind, "worker started");

    loop {
        let next = {
            let mut state = handle.shared.state.lock();
            loop {
                let pool = state.pool(kind);
                if state.shutdown || pool.active() > pool.target {
                    state.pool_mut(kind).allocated -= 1;
                    break None;
                }
                if let Some(invocation) = state.queues.pop_first(kind.classes(), |_| true) {
                    invocation.task.begin_invocation();
                    break Some(invocation);
                }
                handle.shared.pool_signal(kind).wait(&mut state);
            }
        };

        match next {
            Some(invocation) => handle.run_invocation(invocation),
            None => break,
        }
    }

    debug!(pool = %kind, "worker exiting");
}
