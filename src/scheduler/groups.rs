// src/scheduler/groups.rs

//! Building, starting and completing task groups.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, trace, warn};

use crate::errors::{FrametasksError, Result};
use crate::group::inner::{GroupBody, GroupInner};
use crate::group::{GroupCallback, GroupId};
use crate::scheduler::queues::Invocation;
use crate::scheduler::stats::bump;
use crate::scheduler::{SchedulerHandle, State};
use crate::task::Task;
use crate::types::Priority;

pub(crate) enum Scheduled {
    Queued,
    /// Still waiting for predecessors.
    Blocked,
    /// No invocations to run; the caller must complete the group.
    Empty,
}

impl SchedulerHandle {
    /// Allocate a new, empty group.
    ///
    /// Fails with [`FrametasksError::GroupPoolExhausted`] when the configured
    /// number of outstanding groups is reached; slots come back as groups finish.
    pub fn create_group(
        &self,
        priority: Priority,
        on_finished: Option<GroupCallback>,
    ) -> Result<GroupId> {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(FrametasksError::ShutDown);
        }
        let group = state.arena.allocate(priority, on_finished).inspect_err(|err| {
            warn!(%priority, error = %err, "cannot create task group");
        })?;
        bump(&self.shared.stats.groups_created, 1);
        trace!(group = %group.id, %priority, live = state.arena.live_count(), "created task group");
        Ok(group.id)
    }

    /// Add `task` to a group that has not been started yet.
    ///
    /// Resets the task's cancel flag and invocation counters. The task must not
    /// be in flight in another group.
    pub fn add_task_to_group(&self, group: GroupId, task: &Arc<Task>) -> Result<()> {
        let state = self.shared.state.lock();
        with_unstarted(&state, group, |body| {
            task.prepare_run(group)?;
            body.tasks.push(Arc::clone(task));
            Ok(())
        })
        .inspect_err(|err| warn!(%group, task = %task.name(), error = %err, "cannot add task to group"))
    }

    /// Make `dependent` wait for `dependency`.
    ///
    /// `dependency` may already be finished (or stale), in which case the edge
    /// is satisfied immediately at start. `dependent` must not be started yet.
    pub fn add_group_dependency(&self, dependent: GroupId, dependency: GroupId) -> Result<()> {
        if dependent == dependency {
            warn!(group = %dependent, "rejecting self dependency");
            return Err(FrametasksError::SelfDependency(dependent));
        }
        let state = self.shared.state.lock();
        with_unstarted(&state, dependent, |body| {
            body.depends_on.push(dependency);
            Ok(())
        })
        .inspect_err(|err| warn!(%dependent, %dependency, error = %err, "cannot add group dependency"))
    }

    /// Batch form of [`add_group_dependency`](Self::add_group_dependency):
    /// `(dependent, dependency)` pairs, applied in order until the first error.
    pub fn add_group_dependencies(&self, edges: &[(GroupId, GroupId)]) -> Result<()> {
        for (dependent, dependency) in edges {
            self.add_group_dependency(*dependent, *dependency)?;
        }
        Ok(())
    }

    /// Start a group: its tasks become runnable as soon as every predecessor
    /// has finished. An empty group finishes right away.
    pub fn start_group(&self, group: GroupId) -> Result<()> {
        let (inner, outcome) = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Err(FrametasksError::ShutDown);
            }
            let inner = state
                .arena
                .get(group)
                .cloned()
                .ok_or(FrametasksError::StaleGroup(group))?;

            let (priority, depends_on) = {
                let mut body = inner.body.lock();
                if body.started {
                    warn!(%group, "task group started twice");
                    return Err(FrametasksError::GroupAlreadyStarted(group));
                }
                body.started = true;
                (body.priority, body.depends_on.clone())
            };

            let mut active = 0;
            for dependency in depends_on {
                if let Some(dep) = state.arena.get(dependency) {
                    dep.body.lock().dependents.push(Arc::clone(&inner));
                    active += 1;
                }
            }
            inner.remaining_deps.store(active, Ordering::Release);

            if priority.is_this_frame() {
                state.frame_groups.push(Arc::clone(&inner));
            } else if priority.is_next_frame() {
                state.next_frame_groups.push(Arc::clone(&inner));
            }

            debug!(%group, %priority, waiting_on = active, "started task group");

            let outcome = if active == 0 {
                self.schedule_locked(&mut state, &inner, false)
            } else {
                Scheduled::Blocked
            };
            (inner, outcome)
        };

        if let Scheduled::Empty = outcome {
            self.complete_group(inner);
        }
        Ok(())
    }

    /// Start several groups, stopping at the first error.
    pub fn start_groups(&self, groups: &[GroupId]) -> Result<()> {
        for group in groups {
            self.start_group(*group)?;
        }
        Ok(())
    }

    /// Convenience for a group holding a single task.
    pub fn start_single_task(
        &self,
        task: &Arc<Task>,
        priority: Priority,
        dependency: Option<GroupId>,
        on_finished: Option<GroupCallback>,
    ) -> Result<GroupId> {
        let group = self.create_group(priority, on_finished)?;
        self.add_task_to_group(group, task)?;
        if let Some(dependency) = dependency {
            self.add_group_dependency(group, dependency)?;
        }
        self.start_group(group)?;
        Ok(group)
    }

    /// `true` once the group has finished. Stale handles count as finished.
    pub fn is_group_finished(&self, group: GroupId) -> bool {
        !self.shared.state.lock().arena.is_live(group)
    }

    /// Push one invocation per outstanding task run into the group's queue.
    ///
    /// Groups `released` by their last predecessor go to the front of their
    /// class; freshly started ones to the back.
    pub(crate) fn schedule_locked(
        &self,
        state: &mut State,
        group: &Arc<GroupInner>,
        released: bool,
    ) -> Scheduled {
        let mut body = group.body.lock();
        body.scheduled = true;
        let priority = body.priority;

        let total: u32 = body.tasks.iter().map(|t| t.remaining_invocations()).sum();
        if total == 0 {
            return Scheduled::Empty;
        }
        group.remaining_invocations.store(total, Ordering::Release);

        let mut batch = Vec::with_capacity(total as usize);
        for task in &body.tasks {
            task.mark_scheduled();
            let nesting = task.nesting();
            for index in 0..task.remaining_invocations() {
                batch.push(Invocation {
                    task: Arc::clone(task),
                    index,
                    group: Arc::clone(group),
                    nesting,
                });
            }
        }
        drop(body);
        state.queues.push_all(priority, batch, released);

        trace!(group = %group.id, %priority, invocations = total, released, "queued task group");

        if let Some(kind) = priority.pool() {
            self.shared.pool_signal(kind).notify_all();
        }
        self.wake_waiters_locked(state);
        Scheduled::Queued
    }

    /// Count `n` invocations of `task` (in `group`) as done.
    pub(crate) fn complete_invocations(&self, task: &Arc<Task>, group: &Arc<GroupInner>, n: u32) {
        if n == 0 {
            return;
        }
        if task.finish_invocations(n) {
            task.notify_finished();
            self.wake_waiters();
        }
        if group.remaining_invocations.fetch_sub(n, Ordering::AcqRel) == n {
            self.complete_group(Arc::clone(group));
        }
    }

    /// Finish a group: fire its callback, free the slot and release dependents.
    ///
    /// Dependents that turn out to be empty are completed in the same loop
    /// instead of recursing.
    pub(crate) fn complete_group(&self, group: Arc<GroupInner>) {
        let mut pending = vec![group];

        while let Some(group) = pending.pop() {
            let callback = group.body.lock().on_finished.take();
            if let Some(callback) = callback {
                callback(group.id);
            }

            let mut state = self.shared.state.lock();
            state.arena.release(group.id);
            let dependents = {
                let mut body = group.body.lock();
                body.tasks.clear();
                std::mem::take(&mut body.dependents)
            };
            bump(&self.shared.stats.groups_finished, 1);
            debug!(group = %group.id, dependents = dependents.len(), "task group finished");

            let mut abandoned = Vec::new();
            for dependent in dependents {
                if dependent.remaining_deps.fetch_sub(1, Ordering::AcqRel) == 1 {
                    if state.shutdown {
                        abandoned.push(dependent);
                    } else if let Scheduled::Empty = self.schedule_locked(&mut state, &dependent, true) {
                        pending.push(dependent);
                    }
                }
            }
            self.wake_waiters_locked(&mut state);
            drop(state);

            for dependent in abandoned {
                abandon_group(&dependent);
                pending.push(dependent);
            }
        }
    }
}

/// Count every run of a released group as done without queueing it.
///
/// Only used after shutdown. The group was never scheduled, so none of its
/// invocations can be executing.
fn abandon_group(group: &GroupInner) {
    let tasks = group.body.lock().tasks.clone();
    for task in tasks {
        if task.withdraw() > 0 {
            task.notify_finished();
        }
    }
    trace!(group = %group.id, "dropped released group after shutdown");
}

/// Run `f` on the body of a live group that has not been started.
fn with_unstarted<R>(
    state: &State,
    group: GroupId,
    f: impl FnOnce(&mut GroupBody) -> Result<R>,
) -> Result<R> {
    let inner = state
        .arena
        .get(group)
        .ok_or(FrametasksError::StaleGroup(group))?;
    let mut body = inner.body.lock();
    if body.started {
        return Err(FrametasksError::GroupAlreadyStarted(group));
    }
    f(&mut body)
}
