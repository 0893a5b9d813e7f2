// src/scheduler/execution.rs

//! Running one invocation on the calling thread.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, trace};

use crate::scheduler::queues::Invocation;
use crate::scheduler::stats::bump;
use crate::scheduler::SchedulerHandle;
use crate::task::{Task, TaskContext};
use crate::types::{NestingPolicy, Priority};

thread_local! {
    /// Innermost task executing on this thread, if any.
    static CURRENT_TASK: RefCell<Option<(NestingPolicy, Arc<Task>)>> = const { RefCell::new(None) };
}

/// Nesting policy and task of the innermost invocation on this thread.
pub(crate) fn current_task() -> Option<(NestingPolicy, Arc<Task>)> {
    CURRENT_TASK.with(|current| current.borrow().clone())
}

impl SchedulerHandle {
    /// Execute (or skip, if canceled) an invocation that was already taken
    /// out of the queues and marked as running.
    pub(crate) fn run_invocation(&self, invocation: Invocation) {
        let Invocation {
            task,
            index,
            group,
            nesting,
        } = invocation;

        if task.has_been_canceled() {
            trace!(task = %task.name(), invocation = index, "skipping canceled invocation");
            bump(&self.shared.stats.invocations_skipped, 1);
        } else {
            let ctx = TaskContext::new(Arc::clone(&task), index, self.clone());
            let previous = CURRENT_TASK.with(|current| current.replace(Some((nesting, Arc::clone(&task)))));
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.execute(&ctx)));
            CURRENT_TASK.with(|current| current.replace(previous));

            if let Err(payload) = outcome {
                error!(
                    task = %task.name(),
                    invocation = index,
                    group = %group.id,
                    panic = %panic_message(payload.as_ref()),
                    "task panicked; aborting process"
                );
                std::process::abort();
            }
            bump(&self.shared.stats.invocations_executed, 1);
        }

        task.end_invocation();
        self.complete_invocations(&task, &group, 1);
    }

    /// Take the first acceptable invocation from `classes` and run it here.
    /// Returns `false` if nothing was runnable.
    pub(crate) fn try_run_one(
        &self,
        classes: &[Priority],
        accept: impl FnMut(&Invocation) -> bool,
    ) -> bool {
        let next = {
            let mut state = self.shared.state.lock();
            let next = state.queues.pop_first(classes, accept);
            if let Some(invocation) = &next {
                invocation.task.begin_invocation();
            }
            next
        };
        match next {
            Some(invocation) => {
                self.run_invocation(invocation);
                true
            }
            None => false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
