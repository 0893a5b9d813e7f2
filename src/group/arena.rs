// src/group/arena.rs

//! Slot arena for task groups.
//!
//! Slots are recycled through a free list. Every release bumps the slot's
//! generation, which is what makes old [`GroupId`]s detectably stale.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{FrametasksError, Result};
use crate::group::inner::{GroupCallback, GroupInner};
use crate::group::GroupId;
use crate::types::Priority;

struct Slot {
    generation: u32,
    group: Option<Arc<GroupInner>>,
}

pub(crate) struct GroupArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    max_groups: usize,
    live: usize,
}

impl GroupArena {
    pub fn new(max_groups: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            max_groups: max_groups.max(1),
            live: 0,
        }
    }

    pub fn allocate(
        &mut self,
        priority: Priority,
        on_finished: Option<GroupCallback>,
    ) -> Result<Arc<GroupInner>> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.max_groups => {
                self.slots.push(Slot {
                    generation: 1,
                    group: None,
                });
                (self.slots.len() - 1) as u32
            }
            None => {
                return Err(FrametasksError::GroupPoolExhausted {
                    max: self.max_groups,
                });
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = GroupId::new(index, slot.generation);
        let group = Arc::new(GroupInner::new(id, priority, on_finished));
        slot.group = Some(Arc::clone(&group));
        self.live += 1;
        Ok(group)
    }

    pub fn get(&self, id: GroupId) -> Option<&Arc<GroupInner>> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.group.as_ref()
    }

    pub fn is_live(&self, id: GroupId) -> bool {
        self.get(id).is_some()
    }

    /// Free the slot of a finished group. Returns `false` for stale handles.
    pub fn release(&mut self, id: GroupId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return false;
        };
        if slot.generation != id.generation() || slot.group.is_none() {
            return false;
        }

        slot.group = None;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(id.index());
        self.live -= 1;
        debug!(group = %id, "released task group slot");
        true
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.max_groups
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Arc<GroupInner>> {
        self.slots.iter().filter_map(|slot| slot.group.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_slot_is_reused_with_new_generation() {
        let mut arena = GroupArena::new(4);
        let first = arena.allocate(Priority::ThisFrame, None).unwrap().id;
        assert!(arena.is_live(first));

        assert!(arena.release(first));
        assert!(!arena.is_live(first));
        assert!(!arena.release(first), "double release must be rejected");

        let second = arena.allocate(Priority::ThisFrame, None).unwrap().id;
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(arena.is_live(second));
        assert!(!arena.is_live(first));
    }

    #[test]
    fn exhaustion_is_reported_and_recovers() {
        let mut arena = GroupArena::new(2);
        let a = arena.allocate(Priority::ThisFrame, None).unwrap().id;
        let _b = arena.allocate(Priority::ThisFrame, None).unwrap().id;

        assert!(matches!(
            arena.allocate(Priority::ThisFrame, None),
            Err(FrametasksError::GroupPoolExhausted { max: 2 })
        ));

        arena.release(a);
        assert!(arena.allocate(Priority::ThisFrame, None).is_ok());
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn invalid_handle_is_never_live() {
        let mut arena = GroupArena::new(1);
        let _ = arena.allocate(Priority::LongRunning, None).unwrap();
        assert!(!arena.is_live(GroupId::INVALID));
        assert!(!arena.is_live(GroupId::new(0, 0)));
    }
}
