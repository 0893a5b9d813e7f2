// src/task/mod.rs

//! Tasks: a named body plus the per-run bookkeeping the scheduler needs.
//!
//! - [`body`] defines the [`TaskBody`] trait and the [`TaskContext`] passed
//!   to every invocation.
//! - [`settings`] holds the static configuration (name, nesting, multiplicity).
//!
//! A task is owned by the application as an `Arc<Task>`. The scheduler only
//! keeps clones of that `Arc` while the task is queued or running.

pub mod body;
pub mod settings;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::errors::{FrametasksError, Result};
use crate::group::GroupId;
use crate::types::NestingPolicy;

pub use body::{TaskBody, TaskContext};
pub use settings::TaskSettings;

/// Called every time the task finishes a run (all invocations done or skipped).
pub type TaskCallback = Box<dyn Fn(&Task) + Send + Sync>;

/// Where the current run of a task lives. Only touched under the scheduler lock.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Placement {
    pub group: Option<GroupId>,
    /// Invocations have been pushed into the priority queues.
    pub scheduled: bool,
}

pub struct Task {
    body: Box<dyn TaskBody>,
    settings: Mutex<TaskSettings>,
    on_finished: Mutex<Option<Arc<dyn Fn(&Task) + Send + Sync>>>,
    cancel_requested: AtomicBool,
    /// Invocations of the current run that have neither returned nor been skipped.
    remaining: AtomicU32,
    /// Invocations of the current run that returned or were skipped.
    completed: AtomicU32,
    /// Invocations currently inside `TaskBody::execute`.
    running: AtomicU32,
    placement: Mutex<Placement>,
}

impl Task {
    pub fn new(name: impl Into<String>, body: impl TaskBody + 'static) -> Arc<Task> {
        Self::with_settings(TaskSettings::new(name), body)
    }

    pub fn with_settings(settings: TaskSettings, body: impl TaskBody + 'static) -> Arc<Task> {
        Arc::new(Task {
            body: Box::new(body),
            settings: Mutex::new(settings),
            on_finished: Mutex::new(None),
            cancel_requested: AtomicBool::new(false),
            remaining: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            running: AtomicU32::new(0),
            placement: Mutex::new(Placement::default()),
        })
    }

    /// Replace name, nesting policy, multiplicity and finished callback.
    ///
    /// Fails with [`FrametasksError::TaskInFlight`] while the task is queued
    /// or running.
    pub fn configure(&self, settings: TaskSettings, on_finished: Option<TaskCallback>) -> Result<()> {
        self.ensure_idle()?;
        *self.settings.lock() = settings;
        *self.on_finished.lock() = on_finished.map(Arc::from);
        Ok(())
    }

    pub fn set_on_finished(&self, on_finished: TaskCallback) -> Result<()> {
        self.ensure_idle()?;
        *self.on_finished.lock() = Some(Arc::from(on_finished));
        Ok(())
    }

    pub fn name(&self) -> String {
        self.settings.lock().name.clone()
    }

    pub fn nesting(&self) -> NestingPolicy {
        self.settings.lock().nesting
    }

    pub fn multiplicity(&self) -> u32 {
        self.settings.lock().effective_multiplicity()
    }

    pub fn settings(&self) -> TaskSettings {
        self.settings.lock().clone()
    }

    /// `true` when no run is pending. A task that was never added to a group
    /// counts as finished.
    pub fn is_finished(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    pub fn has_been_canceled(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Invocations of the current (or last) run that returned or were skipped.
    pub fn completed_invocations(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn running_invocations(&self) -> u32 {
        self.running.load(Ordering::Acquire)
    }

    /// Group the current (or last) run belongs to.
    pub fn group(&self) -> Option<GroupId> {
        self.placement.lock().group
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_finished() {
            Ok(())
        } else {
            Err(FrametasksError::TaskInFlight(self.name()))
        }
    }

    pub(crate) fn execute(&self, ctx: &TaskContext) {
        self.body.execute(ctx)
    }

    /// Reset the task for a new run inside `group`.
    pub(crate) fn prepare_run(&self, group: GroupId) -> Result<()> {
        self.ensure_idle()?;
        let multiplicity = self.multiplicity();
        self.cancel_requested.store(false, Ordering::Release);
        self.completed.store(0, Ordering::Release);
        self.remaining.store(multiplicity, Ordering::Release);
        *self.placement.lock() = Placement {
            group: Some(group),
            scheduled: false,
        };
        Ok(())
    }

    pub(crate) fn placement(&self) -> Placement {
        *self.placement.lock()
    }

    pub(crate) fn mark_scheduled(&self) {
        self.placement.lock().scheduled = true;
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub(crate) fn remaining_invocations(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    pub(crate) fn begin_invocation(&self) {
        self.running.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn end_invocation(&self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }

    /// Count `n` invocations as done. Returns `true` for the call that
    /// finished the run.
    pub(crate) fn finish_invocations(&self, n: u32) -> bool {
        self.completed.fetch_add(n, Ordering::AcqRel);
        self.remaining.fetch_sub(n, Ordering::AcqRel) == n
    }

    /// Mark every outstanding invocation as done without running it.
    /// Returns the number of invocations that were withdrawn.
    pub(crate) fn withdraw(&self) -> u32 {
        let n = self.remaining.swap(0, Ordering::AcqRel);
        self.completed.fetch_add(n, Ordering::AcqRel);
        n
    }

    pub(crate) fn notify_finished(&self) {
        let callback = self.on_finished.lock().clone();
        if let Some(callback) = callback {
            callback(self);
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("settings", &*self.settings.lock())
            .field("remaining", &self.remaining.load(Ordering::Relaxed))
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("canceled", &self.has_been_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<Task> {
        Task::new("noop", |_: &TaskContext| {})
    }

    #[test]
    fn fresh_task_counts_as_finished() {
        let task = noop();
        assert!(task.is_finished());
        assert_eq!(task.completed_invocations(), 0);
        assert_eq!(task.group(), None);
    }

    #[test]
    fn zero_multiplicity_is_treated_as_one() {
        let task = Task::with_settings(
            TaskSettings::new("zero").multiplicity(0),
            |_: &TaskContext| {},
        );
        assert_eq!(task.multiplicity(), 1);
    }

    #[test]
    fn configure_is_rejected_while_in_flight() {
        let task = noop();
        task.prepare_run(GroupId::new(0, 1)).unwrap();
        assert!(!task.is_finished());

        let err = task.configure(TaskSettings::new("renamed"), None).unwrap_err();
        assert!(matches!(err, FrametasksError::TaskInFlight(name) if name == "noop"));

        assert!(task.finish_invocations(1));
        task.configure(TaskSettings::new("renamed"), None).unwrap();
        assert_eq!(task.name(), "renamed");
    }

    #[test]
    fn only_the_last_invocation_finishes_the_run() {
        let task = Task::with_settings(
            TaskSettings::new("multi").multiplicity(3),
            |_: &TaskContext| {},
        );
        task.prepare_run(GroupId::new(0, 1)).unwrap();
        assert!(!task.finish_invocations(1));
        assert!(!task.finish_invocations(1));
        assert!(task.finish_invocations(1));
        assert_eq!(task.completed_invocations(), 3);
    }

    #[test]
    fn withdraw_counts_outstanding_invocations() {
        let task = Task::with_settings(
            TaskSettings::new("multi").multiplicity(4),
            |_: &TaskContext| {},
        );
        task.prepare_run(GroupId::new(2, 7)).unwrap();
        assert!(!task.finish_invocations(1));
        assert_eq!(task.withdraw(), 3);
        assert!(task.is_finished());
        assert_eq!(task.completed_invocations(), 4);
    }
}
