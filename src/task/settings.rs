// src/task/settings.rs

use crate::types::NestingPolicy;

/// Static configuration of a task.
///
/// Can only be changed while the task is not queued or running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    /// Used for logging and diagnostics only.
    pub name: String,
    pub nesting: NestingPolicy,
    /// Number of independent invocations; `0` is treated as `1`.
    pub multiplicity: u32,
}

impl TaskSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nesting: NestingPolicy::default(),
            multiplicity: 1,
        }
    }

    pub fn nesting(mut self, nesting: NestingPolicy) -> Self {
        self.nesting = nesting;
        self
    }

    pub fn multiplicity(mut self, multiplicity: u32) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub(crate) fn effective_multiplicity(&self) -> u32 {
        self.multiplicity.max(1)
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self::new("unnamed")
    }
}
