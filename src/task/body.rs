// src/task/body.rs

//! The callable side of a task.
//!
//! The scheduler talks to a `TaskBody` instead of a concrete closure type, so
//! applications can implement it on their own structs (holding output state,
//! progress counters, ...) while plain closures work out of the box.

use std::sync::Arc;

use crate::scheduler::SchedulerHandle;
use crate::task::Task;

/// Work executed for every invocation of a task.
///
/// Invocations of the same task may run concurrently on different threads.
/// Long bodies should poll [`TaskContext::has_been_canceled`] at safe points
/// and return early once it reports `true`.
pub trait TaskBody: Send + Sync {
    fn execute(&self, ctx: &TaskContext);
}

impl<F> TaskBody for F
where
    F: Fn(&TaskContext) + Send + Sync,
{
    fn execute(&self, ctx: &TaskContext) {
        self(ctx)
    }
}

/// Per-invocation view handed to [`TaskBody::execute`].
pub struct TaskContext {
    task: Arc<Task>,
    invocation: u32,
    scheduler: SchedulerHandle,
}

impl TaskContext {
    pub(crate) fn new(task: Arc<Task>, invocation: u32, scheduler: SchedulerHandle) -> Self {
        Self {
            task,
            invocation,
            scheduler,
        }
    }

    /// Index of this invocation in `0..multiplicity`.
    pub fn invocation_index(&self) -> u32 {
        self.invocation
    }

    pub fn multiplicity(&self) -> u32 {
        self.task.multiplicity()
    }

    pub fn has_been_canceled(&self) -> bool {
        self.task.has_been_canceled()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Scheduler the task runs on, for scheduling or waiting on more work.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}
