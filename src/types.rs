// src/types.rs

//! Small shared enums: priorities, nesting policy, worker kinds, cancel modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Priority class of a task group.
///
/// The declaration order is the pick order: a thread that serves several
/// classes always looks at the earlier class first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    EarlyThisFrame,
    ThisFrame,
    LateThisFrame,
    /// Only executed by the main thread inside `finish_frame_tasks`.
    ThisFrameMainThread,
    /// Main-thread work that may be spread over several frames.
    SomeFrameMainThread,
    EarlyNextFrame,
    NextFrame,
    LateNextFrame,
    LongRunningHighPriority,
    LongRunning,
}

impl Priority {
    pub const COUNT: usize = 10;

    pub const ALL: [Priority; Priority::COUNT] = [
        Priority::EarlyThisFrame,
        Priority::ThisFrame,
        Priority::LateThisFrame,
        Priority::ThisFrameMainThread,
        Priority::SomeFrameMainThread,
        Priority::EarlyNextFrame,
        Priority::NextFrame,
        Priority::LateNextFrame,
        Priority::LongRunningHighPriority,
        Priority::LongRunning,
    ];

    /// Classes served by the short worker pool.
    pub const THIS_FRAME: [Priority; 3] = [
        Priority::EarlyThisFrame,
        Priority::ThisFrame,
        Priority::LateThisFrame,
    ];

    /// Classes served by the long worker pool.
    pub const LONG_RUNNING: [Priority; 2] =
        [Priority::LongRunningHighPriority, Priority::LongRunning];

    pub fn index(self) -> usize {
        self as usize
    }

    /// `EarlyThisFrame`, `ThisFrame` or `LateThisFrame`.
    pub fn is_this_frame(self) -> bool {
        matches!(
            self,
            Priority::EarlyThisFrame | Priority::ThisFrame | Priority::LateThisFrame
        )
    }

    pub fn is_next_frame(self) -> bool {
        matches!(
            self,
            Priority::EarlyNextFrame | Priority::NextFrame | Priority::LateNextFrame
        )
    }

    /// The class a next-frame priority turns into at the frame boundary.
    /// Every other class maps to itself.
    pub fn promoted(self) -> Priority {
        match self {
            Priority::EarlyNextFrame => Priority::EarlyThisFrame,
            Priority::NextFrame => Priority::ThisFrame,
            Priority::LateNextFrame => Priority::LateThisFrame,
            other => other,
        }
    }

    /// Worker pool that executes this class, if any.
    ///
    /// Main-thread classes and not-yet-promoted next-frame classes have no pool.
    pub fn pool(self) -> Option<WorkerKind> {
        if self.is_this_frame() {
            Some(WorkerKind::Short)
        } else if matches!(
            self,
            Priority::LongRunningHighPriority | Priority::LongRunning
        ) {
            Some(WorkerKind::Long)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::EarlyThisFrame => "early_this_frame",
            Priority::ThisFrame => "this_frame",
            Priority::LateThisFrame => "late_this_frame",
            Priority::ThisFrameMainThread => "this_frame_main_thread",
            Priority::SomeFrameMainThread => "some_frame_main_thread",
            Priority::EarlyNextFrame => "early_next_frame",
            Priority::NextFrame => "next_frame",
            Priority::LateNextFrame => "late_next_frame",
            Priority::LongRunningHighPriority => "long_running_high_priority",
            Priority::LongRunning => "long_running",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::ThisFrame
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("invalid priority: {s}"))
    }
}

/// Whether a task may block on other tasks while it runs.
///
/// `Never` tasks promise not to wait, which makes them safe to execute nested
/// inside another task's wait. `Maybe` tasks are only picked up by a waiting
/// worker when they belong to the group being waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingPolicy {
    Never,
    Maybe,
}

impl Default for NestingPolicy {
    fn default() -> Self {
        NestingPolicy::Maybe
    }
}

impl FromStr for NestingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(NestingPolicy::Never),
            "maybe" => Ok(NestingPolicy::Maybe),
            other => Err(format!(
                "invalid nesting policy: {other} (expected \"never\" or \"maybe\")"
            )),
        }
    }
}

/// The two worker pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    /// Low-latency work that has to finish within the frame.
    Short,
    /// Work that may span many frames.
    Long,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 2] = [WorkerKind::Short, WorkerKind::Long];

    pub fn index(self) -> usize {
        match self {
            WorkerKind::Short => 0,
            WorkerKind::Long => 1,
        }
    }

    /// Priority classes a worker of this kind picks from, in pick order.
    pub fn classes(self) -> &'static [Priority] {
        match self {
            WorkerKind::Short => &Priority::THIS_FRAME,
            WorkerKind::Long => &Priority::LONG_RUNNING,
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Short => f.write_str("short"),
            WorkerKind::Long => f.write_str("long"),
        }
    }
}

/// How `cancel_task` / `cancel_group` behave when work is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelMode {
    #[default]
    ReturnWithoutBlocking,
    WaitTillFinished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_pick_order() {
        for pair in Priority::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].index() + 1, pair[1].index());
        }
    }

    #[test]
    fn next_frame_classes_promote_to_this_frame() {
        assert_eq!(Priority::EarlyNextFrame.promoted(), Priority::EarlyThisFrame);
        assert_eq!(Priority::NextFrame.promoted(), Priority::ThisFrame);
        assert_eq!(Priority::LateNextFrame.promoted(), Priority::LateThisFrame);
        assert_eq!(Priority::LongRunning.promoted(), Priority::LongRunning);
        assert!(Priority::ALL.iter().all(|p| !p.promoted().is_next_frame()));
    }

    #[test]
    fn only_worker_classes_have_a_pool() {
        assert_eq!(Priority::LateThisFrame.pool(), Some(WorkerKind::Short));
        assert_eq!(Priority::LongRunningHighPriority.pool(), Some(WorkerKind::Long));
        assert_eq!(Priority::ThisFrameMainThread.pool(), None);
        assert_eq!(Priority::NextFrame.pool(), None);
    }

    #[test]
    fn parses_priorities_leniently() {
        assert_eq!("this_frame".parse::<Priority>(), Ok(Priority::ThisFrame));
        assert_eq!(
            " Long-Running-High-Priority ".parse::<Priority>(),
            Ok(Priority::LongRunningHighPriority)
        );
        assert!("soon".parse::<Priority>().is_err());
        assert_eq!("NEVER".parse::<NestingPolicy>(), Ok(NestingPolicy::Never));
    }
}
