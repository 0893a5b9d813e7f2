// src/scheduler/waiting.rs

//! Worker-assisted waiting.
//!
//! A waiting thread keeps executing pending invocations it is allowed to take
//! and only sleeps when there is nothing for it to do. Threads other than the
//! main thread only pick up tasks with nesting policy `Never` or tasks of the
//! group they are waiting for, so a wait can never end up underneath an
//! unrelated task that blocks on the waiter's own progress.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::errors::{FrametasksError, Result};
use crate::group::inner::GroupInner;
use crate::group::GroupId;
use crate::scheduler::execution::current_task;
use crate::scheduler::queues::Invocation;
use crate::scheduler::{SchedulerHandle, State, ThreadRole};
use crate::types::{NestingPolicy, Priority};

/// Sleep granularity while waiting, so conditions that depend on state
/// outside the scheduler are still re-evaluated.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

const MAIN_THREAD_CLASSES: [Priority; 4] = [
    Priority::ThisFrameMainThread,
    Priority::EarlyThisFrame,
    Priority::ThisFrame,
    Priority::LateThisFrame,
];

impl ThreadRole {
    /// Classes this thread may help with while waiting, in pick order.
    pub(crate) fn classes(self) -> &'static [Priority] {
        match self {
            ThreadRole::Main => &MAIN_THREAD_CLASSES,
            ThreadRole::Worker(kind) => kind.classes(),
            ThreadRole::Foreign => &Priority::THIS_FRAME,
        }
    }
}

impl SchedulerHandle {
    /// Block until `group` has finished, helping with pending work meanwhile.
    ///
    /// Returns immediately for finished or stale handles. Fails when called
    /// from inside a task whose nesting policy is `Never`.
    pub fn wait_for_group(&self, group: GroupId) -> Result<()> {
        self.ensure_may_wait()?;
        let awaited = self.shared.state.lock().arena.get(group).cloned();
        let Some(awaited) = awaited else {
            return Ok(());
        };
        self.help_until(Some(&awaited), || self.is_group_finished(group))
    }

    /// Block until `condition` returns `true`, helping with pending work meanwhile.
    ///
    /// The condition is re-evaluated whenever work is queued or finishes, and
    /// at least every few milliseconds.
    pub fn wait_for_condition(&self, condition: impl Fn() -> bool) -> Result<()> {
        self.ensure_may_wait()?;
        self.help_until(None, condition)
    }

    fn ensure_may_wait(&self) -> Result<()> {
        match current_task() {
            Some((NestingPolicy::Never, task)) => {
                let name = task.name();
                warn!(task = %name, "task with nesting policy `never` tried to wait");
                Err(FrametasksError::WaitInsideNeverNestingTask(name))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn help_until(
        &self,
        awaited: Option<&Arc<GroupInner>>,
        done: impl Fn() -> bool,
    ) -> Result<()> {
        let role = self.current_role();
        let mut blocked = false;

        let result = loop {
            let epoch = self.shared.state.lock().epoch;
            if done() {
                break Ok(());
            }

            let next = {
                let mut state = self.shared.state.lock();
                match pick_for_waiter(&mut state, role, awaited) {
                    Some(invocation) => Some(invocation),
                    None if state.shutdown => break Err(FrametasksError::ShutDown),
                    None => {
                        if state.epoch == epoch {
                            if let ThreadRole::Worker(kind) = role {
                                if !blocked {
                                    blocked = true;
                                    self.enter_blocked_locked(&mut state, kind);
                                }
                            }
                            self.shared.waiters.wait_for(&mut state, WAIT_POLL_INTERVAL);
                        }
                        None
                    }
                }
            };

            if let Some(invocation) = next {
                self.run_invocation(invocation);
            }
        };

        if blocked {
            if let ThreadRole::Worker(kind) = role {
                let mut state = self.shared.state.lock();
                self.leave_blocked_locked(&mut state, kind);
            }
        }
        result
    }
}

/// Take an invocation the waiting thread is allowed to run, marking it running.
fn pick_for_waiter(
    state: &mut State,
    role: ThreadRole,
    awaited: Option<&Arc<GroupInner>>,
) -> Option<Invocation> {
    let belongs_to_awaited =
        |inv: &Invocation| awaited.is_some_and(|group| Arc::ptr_eq(group, &inv.group));

    let picked = match role {
        ThreadRole::Main => state
            .queues
            .pop_first(role.classes(), |_| true)
            // Main-thread work outside the per-frame classes is only taken
            // when it is exactly what we wait for.
            .or_else(|| {
                state
                    .queues
                    .pop_first(&[Priority::SomeFrameMainThread], belongs_to_awaited)
            }),
        ThreadRole::Worker(_) | ThreadRole::Foreign => state.queues.pop_first(role.classes(), |inv| {
            inv.nesting == NestingPolicy::Never || belongs_to_awaited(inv)
        }),
    };

    if let Some(invocation) = &picked {
        invocation.task.begin_invocation();
    }
    picked
}
