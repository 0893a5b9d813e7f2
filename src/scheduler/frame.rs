// src/scheduler/frame.rs

//! The frame boundary.
//!
//! `finish_frame_tasks` is called once per frame by the main thread. It
//! drains main-thread work, waits for this frame's groups, promotes
//! next-frame work and then spends whatever the frame budget allows on
//! `SomeFrameMainThread` work.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::errors::{FrametasksError, Result};
use crate::group::GroupId;
use crate::group::inner::GroupInner;
use crate::scheduler::{SchedulerHandle, State, ThreadRole};
use crate::types::{Priority, WorkerKind};

/// Added to the skip threshold every frame `SomeFrameMainThread` work is skipped.
const THRESHOLD_STEP: Duration = Duration::from_micros(200);

/// Pending counts above which extra `SomeFrameMainThread` invocations are forced.
const BACKLOG_LEVELS: [usize; 3] = [50, 75, 100];

/// Pacing state for `SomeFrameMainThread` work.
pub(crate) struct FrameBudget {
    target: Duration,
    /// Grows while frames are slow so some progress is eventually guaranteed.
    threshold: Duration,
    last_execution: Option<Instant>,
}

impl FrameBudget {
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            threshold: target,
            last_execution: None,
        }
    }
}

impl SchedulerHandle {
    /// Frame boundary. Main thread only.
    ///
    /// 1. Runs pending `ThisFrameMainThread` invocations on the calling thread
    ///    and helps with this-frame work.
    /// 2. Blocks until every this-frame group started before the call finished,
    ///    except groups still blocked behind work that cannot run before the
    ///    boundary (next-frame or `SomeFrameMainThread` groups, or groups that
    ///    were never started). Those are awaited in a later frame.
    /// 3. Moves leftover `ThisFrame`/`LateThisFrame` work to `EarlyThisFrame`
    ///    and promotes next-frame work to the matching this-frame class.
    /// 4. Executes `SomeFrameMainThread` work within the frame budget.
    pub fn finish_frame_tasks(&self) -> Result<()> {
        if self.current_role() != ThreadRole::Main {
            return Err(FrametasksError::NotMainThread);
        }

        let this_frame: Vec<Arc<GroupInner>> = {
            let mut state = self.shared.state.lock();
            let State {
                arena, frame_groups, ..
            } = &mut *state;
            frame_groups.retain(|group| arena.is_live(group.id));
            awaitable_groups(&state)
        };

        self.wait_for_condition(|| {
            let state = self.shared.state.lock();
            state.queues.len(Priority::ThisFrameMainThread) == 0
                && this_frame.iter().all(|group| !state.arena.is_live(group.id))
        })?;

        {
            let mut state = self.shared.state.lock();
            self.promote_next_frame_locked(&mut state);
        }

        self.run_some_frame_tasks();

        let frame = self.shared.stats.frames_finished.fetch_add(1, Ordering::Relaxed);
        trace!(frame, groups = this_frame.len(), "finished frame tasks");
        Ok(())
    }

    fn promote_next_frame_locked(&self, state: &mut State) {
        let mut moved = state.queues.move_bucket(Priority::ThisFrame, Priority::EarlyThisFrame);
        moved += state
            .queues
            .move_bucket(Priority::LateThisFrame, Priority::EarlyThisFrame);
        for class in [
            Priority::EarlyNextFrame,
            Priority::NextFrame,
            Priority::LateNextFrame,
        ] {
            moved += state.queues.move_bucket(class, class.promoted());
        }

        let next_frame = std::mem::take(&mut state.next_frame_groups);
        let mut promoted_groups = 0;
        for group in next_frame {
            if !state.arena.is_live(group.id) {
                continue;
            }
            {
                let mut body = group.body.lock();
                body.priority = body.priority.promoted();
            }
            state.frame_groups.push(group);
            promoted_groups += 1;
        }

        if moved > 0 || promoted_groups > 0 {
            debug!(invocations = moved, groups = promoted_groups, "promoted next-frame work");
            self.shared.pool_signal(WorkerKind::Short).notify_all();
            self.wake_waiters_locked(state);
        }
    }

    /// Execute `SomeFrameMainThread` work as long as frames are fast enough.
    ///
    /// When frames are slow the work is skipped, but the skip threshold grows
    /// every time so at least one invocation per frame runs eventually. A large
    /// backlog forces a few extra invocations regardless.
    fn run_some_frame_tasks(&self) {
        const CLASS: [Priority; 1] = [Priority::SomeFrameMainThread];

        let (target, threshold, last) = {
            let mut budget = self.shared.frame.lock();
            let last = budget.last_execution.replace(Instant::now());
            (budget.target, budget.threshold, last)
        };
        let since_last = |now: Instant| last.map_or(Duration::MAX, |last| now - last);

        let mut now = Instant::now();
        while since_last(now) < target {
            if !self.try_run_one(&CLASS, |_| true) {
                self.shared.frame.lock().threshold = target;
                return;
            }
            now = Instant::now();
        }

        let pending = self.shared.state.lock().queues.len(Priority::SomeFrameMainThread);
        if pending == 0 {
            return;
        }

        if since_last(now) < threshold {
            self.try_run_one(&CLASS, |_| true);
        } else {
            self.shared.frame.lock().threshold = threshold + THRESHOLD_STEP;
        }

        for level in BACKLOG_LEVELS {
            if pending > level {
                self.try_run_one(&CLASS, |_| true);
            }
        }
    }
}

/// This-frame groups whose unfinished predecessors can all finish before the
/// frame boundary.
fn awaitable_groups(state: &State) -> Vec<Arc<GroupInner>> {
    let mut memo = HashMap::new();
    let awaitable: Vec<_> = state
        .frame_groups
        .iter()
        .filter(|group| drains_this_frame(state, group, &mut memo))
        .cloned()
        .collect();

    let deferred = state.frame_groups.len() - awaitable.len();
    if deferred > 0 {
        debug!(deferred, "this-frame groups blocked behind later work");
    }
    awaitable
}

fn drains_this_frame(
    state: &State,
    group: &GroupInner,
    memo: &mut HashMap<GroupId, bool>,
) -> bool {
    if let Some(known) = memo.get(&group.id) {
        return *known;
    }
    // Provisional entry; a dependency cycle is never awaited.
    memo.insert(group.id, false);

    let (priority, started, depends_on) = {
        let body = group.body.lock();
        (body.priority, body.started, body.depends_on.clone())
    };
    let runnable = started
        && !priority.is_next_frame()
        && priority != Priority::SomeFrameMainThread;

    let drains = runnable
        && depends_on.into_iter().all(|id| match state.arena.get(id) {
            Some(dependency) => drains_this_frame(state, dependency, memo),
            None => true,
        });
    memo.insert(group.id, drains);
    drains
}
