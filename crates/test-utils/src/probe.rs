#![allow(dead_code)]

//! Test doubles for task bodies.
//!
//! - [`Recorder`] builds tasks that log every invocation with a global
//!   sequence number, so tests can assert ordering across threads.
//! - [`Gate`] blocks task bodies until the test opens it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use frametasks::{Task, TaskContext, TaskSettings};
use parking_lot::{Condvar, Mutex};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Event {
    pub task: String,
    pub index: u32,
    /// Sequence number taken when the body started.
    pub start: u64,
    /// Sequence number taken when the body returned.
    pub end: u64,
    pub thread: ThreadId,
    pub thread_name: Option<String>,
}

#[derive(Default)]
pub struct Recorder {
    clock: AtomicU64,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Task that only records its invocations.
    pub fn task(self: &Arc<Self>, name: &str) -> Arc<Task> {
        self.task_with(TaskSettings::new(name), |_| {})
    }

    /// Task that records its invocations around `work`.
    pub fn task_with<F>(self: &Arc<Self>, settings: TaskSettings, work: F) -> Arc<Task>
    where
        F: Fn(&TaskContext) + Send + Sync + 'static,
    {
        let recorder = Arc::clone(self);
        let name = settings.name.clone();
        Task::with_settings(settings, move |ctx: &TaskContext| {
            let start = recorder.tick();
            work(ctx);
            let end = recorder.tick();
            let current = thread::current();
            recorder.events.lock().push(Event {
                task: name.clone(),
                index: ctx.invocation_index(),
                start,
                end,
                thread: current.id(),
                thread_name: current.name().map(str::to_string),
            });
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, task: &str) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task == task)
            .cloned()
            .collect()
    }

    pub fn count(&self, task: &str) -> usize {
        self.events_for(task).len()
    }

    pub fn total(&self) -> usize {
        self.events.lock().len()
    }

    /// Invocation indices observed for `task`, sorted.
    pub fn indices_of(&self, task: &str) -> Vec<u32> {
        let mut indices: Vec<u32> = self.events_for(task).iter().map(|e| e.index).collect();
        indices.sort_unstable();
        indices
    }

    pub fn first_start(&self, task: &str) -> Option<u64> {
        self.events_for(task).iter().map(|e| e.start).min()
    }

    pub fn last_end(&self, task: &str) -> Option<u64> {
        self.events_for(task).iter().map(|e| e.end).max()
    }
}

/// A one-way latch: closed until [`Gate::open`] is called.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.signal.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Block until the gate opens.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.signal.wait(&mut open);
        }
    }

    /// Block until the gate opens or `timeout` elapses. Returns whether it opened.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut open = self.open.lock();
        while !*open {
            if self.signal.wait_until(&mut open, deadline).timed_out() {
                break;
            }
        }
        *open
    }

    /// Block until the gate opens or the task is canceled.
    pub fn wait_or_cancel(&self, ctx: &TaskContext) {
        while !ctx.has_been_canceled() {
            if self.wait_timeout(Duration::from_millis(1)) {
                return;
            }
        }
    }
}
