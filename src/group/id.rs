// src/group/id.rs

use std::fmt;

use serde::Serialize;

/// Handle to a task group: an arena slot plus the generation it was issued for.
///
/// Once the group finishes the slot's generation moves on, so an old handle
/// can never alias a newer group living in the same slot. A stale handle
/// therefore always denotes a finished group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId {
    index: u32,
    generation: u32,
}

impl GroupId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// A handle that never refers to a live group.
    pub const INVALID: GroupId = GroupId {
        index: u32::MAX,
        generation: 0,
    };

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}
