// src/group/inner.rs

use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use parking_lot::Mutex;

use crate::group::GroupId;
use crate::task::Task;
use crate::types::Priority;

/// Fired once when the group finishes, before dependents are released.
pub type GroupCallback = Box<dyn FnOnce(GroupId) + Send>;

/// Shared state of one live task group.
///
/// The counters are decremented without the scheduler lock; whichever
/// decrement reaches zero is responsible for the follow-up work.
pub(crate) struct GroupInner {
    pub id: GroupId,
    /// Unfinished predecessor groups. Only meaningful once started.
    pub remaining_deps: AtomicU32,
    /// Invocations not yet executed or skipped. Only meaningful once scheduled.
    pub remaining_invocations: AtomicU32,
    pub body: Mutex<GroupBody>,
}

pub(crate) struct GroupBody {
    pub priority: Priority,
    pub tasks: Vec<Arc<Task>>,
    /// Predecessors as added, including ones that already finished.
    pub depends_on: Vec<GroupId>,
    /// Started groups waiting for this one.
    pub dependents: Vec<Arc<GroupInner>>,
    pub on_finished: Option<GroupCallback>,
    pub started: bool,
    pub scheduled: bool,
}

impl GroupInner {
    pub fn new(id: GroupId, priority: Priority, on_finished: Option<GroupCallback>) -> Self {
        Self {
            id,
            remaining_deps: AtomicU32::new(0),
            remaining_invocations: AtomicU32::new(0),
            body: Mutex::new(GroupBody {
                priority,
                tasks: Vec::new(),
                depends_on: Vec::new(),
                dependents: Vec::new(),
                on_finished,
                started: false,
                scheduled: false,
            }),
        }
    }
}
