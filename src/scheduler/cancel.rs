// src/scheduler/cancel.rs

//! Cooperative cancellation.
//!
//! Work that has not started is withdrawn and counted as done. Invocations
//! that are already executing only get their cancel flag set; the body is
//! expected to notice it through `TaskContext::has_been_canceled`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::group::GroupId;
use crate::scheduler::SchedulerHandle;
use crate::scheduler::queues::Invocation;
use crate::scheduler::stats::bump;
use crate::task::Task;
use crate::types::CancelMode;

enum Withdrawal {
    AlreadyFinished,
    /// The group was not queued yet; the task was taken out of its member list.
    Unscheduled,
    Dequeued {
        removed: Vec<Invocation>,
        running: u32,
    },
}

impl SchedulerHandle {
    /// Cancel one task.
    ///
    /// Returns `true` when no invocation was left running: the task had
    /// already finished, or all of its pending invocations were withdrawn.
    /// Returns `false` when at least one invocation was executing; with
    /// [`CancelMode::WaitTillFinished`] that only happens after those
    /// invocations have returned.
    pub fn cancel_task(&self, task: &Arc<Task>, mode: CancelMode) -> bool {
        let withdrawal = {
            let mut state = self.shared.state.lock();
            if task.is_finished() {
                Withdrawal::AlreadyFinished
            } else {
                task.request_cancel();
                let placement = task.placement();
                if placement.scheduled {
                    Withdrawal::Dequeued {
                        removed: state.queues.remove_task(task),
                        running: task.running_invocations(),
                    }
                } else {
                    if let Some(group) = placement.group.and_then(|id| state.arena.get(id)) {
                        group.body.lock().tasks.retain(|t| !Arc::ptr_eq(t, task));
                    }
                    let withdrawn = task.withdraw();
                    bump(&self.shared.stats.invocations_skipped, u64::from(withdrawn));
                    Withdrawal::Unscheduled
                }
            }
        };

        match withdrawal {
            Withdrawal::AlreadyFinished => true,
            Withdrawal::Unscheduled => {
                bump(&self.shared.stats.tasks_canceled, 1);
                debug!(task = %task.name(), "withdrew task before it was queued");
                task.notify_finished();
                self.wake_waiters();
                true
            }
            Withdrawal::Dequeued { removed, running } => {
                bump(&self.shared.stats.tasks_canceled, 1);
                let count = removed.len() as u32;
                debug!(task = %task.name(), withdrawn = count, running, "canceled queued task");
                if let Some(first) = removed.first() {
                    let group = Arc::clone(&first.group);
                    bump(&self.shared.stats.invocations_skipped, u64::from(count));
                    drop(removed);
                    self.complete_invocations(task, &group, count);
                }

                // An invocation that already returned may not have been
                // counted yet, so `running` alone cannot decide this.
                if running == 0 && task.is_finished() {
                    return true;
                }
                if mode == CancelMode::WaitTillFinished {
                    if let Err(err) = self.wait_for_condition(|| task.is_finished()) {
                        warn!(task = %task.name(), error = %err, "cannot wait for canceled task");
                    }
                }
                false
            }
        }
    }

    /// Cancel every task of a group.
    ///
    /// All tasks are first canceled without blocking. Only if some of them
    /// were already running and `mode` asks for it, the group's tasks are
    /// canceled again while waiting. Returns `true` iff no task was running.
    /// Finished or stale groups return `true`.
    pub fn cancel_group(&self, group: GroupId, mode: CancelMode) -> bool {
        let tasks = {
            let state = self.shared.state.lock();
            match state.arena.get(group) {
                Some(inner) => inner.body.lock().tasks.clone(),
                None => return true,
            }
        };

        let mut all_withdrawn = true;
        for task in &tasks {
            all_withdrawn &= self.cancel_task(task, CancelMode::ReturnWithoutBlocking);
        }

        if !all_withdrawn && mode == CancelMode::WaitTillFinished {
            for task in &tasks {
                self.cancel_task(task, CancelMode::WaitTillFinished);
            }
        }

        debug!(%group, all_withdrawn, "canceled task group");
        all_withdrawn
    }
}
