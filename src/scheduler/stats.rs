// src/scheduler/stats.rs

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of the scheduler counters. All values only grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub groups_created: u64,
    pub groups_finished: u64,
    /// Invocations whose body ran to completion.
    pub invocations_executed: u64,
    /// Invocations that were withdrawn or skipped because of cancellation.
    pub invocations_skipped: u64,
    pub tasks_canceled: u64,
    pub frames_finished: u64,
}

#[derive(Default)]
pub(crate) struct StatsCounters {
    pub groups_created: AtomicU64,
    pub groups_finished: AtomicU64,
    pub invocations_executed: AtomicU64,
    pub invocations_skipped: AtomicU64,
    pub tasks_canceled: AtomicU64,
    pub frames_finished: AtomicU64,
}

pub(crate) fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl StatsCounters {
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            groups_created: self.groups_created.load(Ordering::Relaxed),
            groups_finished: self.groups_finished.load(Ordering::Relaxed),
            invocations_executed: self.invocations_executed.load(Ordering::Relaxed),
            invocations_skipped: self.invocations_skipped.load(Ordering::Relaxed),
            tasks_canceled: self.tasks_canceled.load(Ordering::Relaxed),
            frames_finished: self.frames_finished.load(Ordering::Relaxed),
        }
    }
}
