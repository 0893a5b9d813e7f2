// src/scheduler/mod.rs

//! The scheduler facade.
//!
//! - [`groups`] creates, wires up and starts task groups, and runs the
//!   completion chain when their last invocation is done.
//! - [`execution`] runs a single invocation on the current thread.
//! - [`waiting`] implements worker-assisted waiting.
//! - [`cancel`] withdraws queued work and flags running work.
//! - [`frame`] implements the frame boundary (`finish_frame_tasks`).
//! - [`workers`] owns the short and long worker pools.
//! - [`queues`] holds one FIFO per priority class.
//! - [`stats`] keeps monotonically increasing counters.
//!
//! All shared state sits behind one `parking_lot::Mutex`. Per-task and
//! per-group counters are atomics decremented outside that lock; user
//! callbacks never run while it is held. Lock order is scheduler state, then
//! a group body, then a task's placement.

mod cancel;
mod execution;
mod frame;
mod groups;
pub(crate) mod queues;
pub mod stats;
mod waiting;
pub(crate) mod workers;

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::model::SchedulerSection;
use crate::errors::Result;
use crate::group::arena::GroupArena;
use crate::group::inner::GroupInner;
use crate::types::WorkerKind;

use self::frame::FrameBudget;
use self::queues::PriorityQueues;
use self::stats::StatsCounters;
use self::workers::PoolState;

pub use self::stats::SchedulerStats;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// Construction parameters for a [`Scheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    pub short_workers: usize,
    pub long_workers: usize,
    /// Upper bound per pool, including replacement threads spawned while
    /// workers are blocked in a wait.
    pub max_workers_per_pool: usize,
    pub max_outstanding_groups: usize,
    /// Frame interval below which `SomeFrameMainThread` work is executed freely.
    pub target_frame_time: Duration,
}

impl SchedulerOptions {
    pub fn workers(mut self, short: usize, long: usize) -> Self {
        self.short_workers = short;
        self.long_workers = long;
        self
    }

    pub fn max_outstanding_groups(mut self, max: usize) -> Self {
        self.max_outstanding_groups = max;
        self
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions::from(&SchedulerSection::default())
    }
}

impl From<&SchedulerSection> for SchedulerOptions {
    fn from(section: &SchedulerSection) -> Self {
        Self {
            short_workers: section.short_workers,
            long_workers: section.long_workers,
            max_workers_per_pool: section.max_workers_per_pool,
            max_outstanding_groups: section.max_outstanding_groups,
            target_frame_time: Duration::from_secs_f64(section.target_frame_time_ms / 1000.0),
        }
    }
}

/// Which kind of thread is calling into the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadRole {
    /// The thread that created the scheduler.
    Main,
    Worker(WorkerKind),
    Foreign,
}

pub(crate) struct State {
    pub arena: GroupArena,
    pub queues: PriorityQueues,
    pub pools: [PoolState; 2],
    /// Started groups with a this-frame priority, pruned at every frame boundary.
    pub frame_groups: Vec<Arc<GroupInner>>,
    /// Started groups with a next-frame priority, promoted at the frame boundary.
    pub next_frame_groups: Vec<Arc<GroupInner>>,
    /// Bumped whenever work is queued or finishes; waiters sleep only while
    /// it is unchanged.
    pub epoch: u64,
    pub shutdown: bool,
}

impl State {
    pub fn pool(&self, kind: WorkerKind) -> &PoolState {
        &self.pools[kind.index()]
    }

    pub fn pool_mut(&mut self, kind: WorkerKind) -> &mut PoolState {
        &mut self.pools[kind.index()]
    }
}

pub(crate) struct Shared {
    pub id: u64,
    pub main_thread: ThreadId,
    pub max_workers_per_pool: usize,
    pub state: Mutex<State>,
    pub pool_signals: [Condvar; 2],
    pub waiters: Condvar,
    pub stats: StatsCounters,
    pub frame: Mutex<FrameBudget>,
}

impl Shared {
    pub fn pool_signal(&self, kind: WorkerKind) -> &Condvar {
        &self.pool_signals[kind.index()]
    }
}

/// Cheap, clonable access to a running scheduler.
///
/// Every scheduling operation lives here so task bodies can schedule and wait
/// on further work through [`TaskContext::scheduler`](crate::task::TaskContext::scheduler).
/// Dropping a handle does not stop anything; the owning [`Scheduler`] does.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub(crate) fn current_role(&self) -> ThreadRole {
        if let Some(kind) = workers::current_worker(self.shared.id) {
            ThreadRole::Worker(kind)
        } else if thread::current().id() == self.shared.main_thread {
            ThreadRole::Main
        } else {
            ThreadRole::Foreign
        }
    }

    /// Wake everything sleeping in a wait. Must be called with the lock held.
    pub(crate) fn wake_waiters_locked(&self, state: &mut State) {
        state.epoch = state.epoch.wrapping_add(1);
        self.shared.waiters.notify_all();
    }

    pub(crate) fn wake_waiters(&self) {
        let mut state = self.shared.state.lock();
        self.wake_waiters_locked(&mut state);
    }

    /// Stop all workers after their current invocation and drop queued work.
    ///
    /// Tasks whose invocations were dropped report finished afterwards.
    /// Called automatically when the owning [`Scheduler`] is dropped.
    pub fn shutdown(&self) {
        let (handles, dropped) = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            let dropped = state.queues.clear();
            let handles: Vec<_> = state
                .pools
                .iter_mut()
                .flat_map(|pool| pool.handles.drain(..))
                .collect();
            self.wake_waiters_locked(&mut state);
            (handles, dropped)
        };

        for kind in WorkerKind::ALL {
            self.shared.pool_signal(kind).notify_all();
        }

        info!(
            workers = handles.len(),
            dropped_invocations = dropped.len(),
            "shutting down scheduler"
        );

        for invocation in dropped {
            self.complete_invocations(&invocation.task, &invocation.group, 1);
        }

        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread terminated abnormally");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats.snapshot()
    }
}

/// Owner of a scheduler instance and its worker threads.
///
/// The thread calling [`Scheduler::new`] becomes the main thread: it alone
/// may call [`SchedulerHandle::finish_frame_tasks`] and execute main-thread
/// priorities. Several schedulers may coexist in one process.
pub struct Scheduler {
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Result<Scheduler> {
        let max_workers = options.max_workers_per_pool.max(1);
        let short = options.short_workers.clamp(1, max_workers);
        let long = options.long_workers.clamp(1, max_workers);

        let shared = Arc::new(Shared {
            id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
            main_thread: thread::current().id(),
            max_workers_per_pool: max_workers,
            state: Mutex::new(State {
                arena: GroupArena::new(options.max_outstanding_groups),
                queues: PriorityQueues::new(),
                pools: [PoolState::default(), PoolState::default()],
                frame_groups: Vec::new(),
                next_frame_groups: Vec::new(),
                epoch: 0,
                shutdown: false,
            }),
            pool_signals: [Condvar::new(), Condvar::new()],
            waiters: Condvar::new(),
            stats: StatsCounters::default(),
            frame: Mutex::new(FrameBudget::new(options.target_frame_time)),
        });

        let scheduler = Scheduler {
            handle: SchedulerHandle { shared },
        };
        // On error the partially started pools are joined by `Drop`.
        scheduler.handle.set_worker_count(short, long)?;

        debug!(
            scheduler = scheduler.handle.shared.id,
            short_workers = short,
            long_workers = long,
            max_groups = options.max_outstanding_groups,
            "scheduler started"
        );
        Ok(scheduler)
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }
}

impl Deref for Scheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}
