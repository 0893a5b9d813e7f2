// src/scheduler/queues.rs

//! One FIFO per priority class, holding individual task invocations.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::group::inner::GroupInner;
use crate::task::Task;
use crate::types::{NestingPolicy, Priority};

/// A single runnable invocation of a task.
pub(crate) struct Invocation {
    pub task: Arc<Task>,
    pub index: u32,
    pub group: Arc<GroupInner>,
    /// Copied from the task when the group was scheduled.
    pub nesting: NestingPolicy,
}

pub(crate) struct PriorityQueues {
    buckets: [VecDeque<Invocation>; Priority::COUNT],
}

impl PriorityQueues {
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| VecDeque::new()),
        }
    }

    pub fn push(&mut self, priority: Priority, invocation: Invocation) {
        self.buckets[priority.index()].push_back(invocation);
    }

    /// Queue a batch, keeping its order. With `front` the batch goes ahead of
    /// everything already waiting in that class.
    pub fn push_all(&mut self, priority: Priority, invocations: Vec<Invocation>, front: bool) {
        if !front {
            for invocation in invocations {
                self.push(priority, invocation);
            }
            return;
        }
        let bucket = &mut self.buckets[priority.index()];
        for invocation in invocations.into_iter().rev() {
            bucket.push_front(invocation);
        }
    }

    /// Remove the first invocation accepted by `accept`, scanning `classes`
    /// in order and each bucket front to back.
    pub fn pop_first(
        &mut self,
        classes: &[Priority],
        mut accept: impl FnMut(&Invocation) -> bool,
    ) -> Option<Invocation> {
        for class in classes {
            let bucket = &mut self.buckets[class.index()];
            if let Some(pos) = bucket.iter().position(&mut accept) {
                return bucket.remove(pos);
            }
        }
        None
    }

    /// Take every queued invocation of `task` out of all buckets.
    pub fn remove_task(&mut self, task: &Arc<Task>) -> Vec<Invocation> {
        let mut removed = Vec::new();
        for bucket in self.buckets.iter_mut() {
            if !bucket.iter().any(|inv| Arc::ptr_eq(&inv.task, task)) {
                continue;
            }
            let (taken, kept): (VecDeque<_>, VecDeque<_>) = bucket
                .drain(..)
                .partition(|inv| Arc::ptr_eq(&inv.task, task));
            *bucket = kept;
            removed.extend(taken);
        }
        removed
    }

    /// Append everything queued under `from` to the back of `to`.
    pub fn move_bucket(&mut self, from: Priority, to: Priority) -> usize {
        if from == to {
            return 0;
        }
        let mut moved = std::mem::take(&mut self.buckets[from.index()]);
        let count = moved.len();
        self.buckets[to.index()].append(&mut moved);
        count
    }

    pub fn len(&self, priority: Priority) -> usize {
        self.buckets[priority.index()].len()
    }

    pub fn clear(&mut self) -> Vec<Invocation> {
        self.buckets
            .iter_mut()
            .flat_map(|bucket| bucket.drain(..))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupId;
    use crate::task::TaskContext;

    fn invocation(task: &Arc<Task>, index: u32, nesting: NestingPolicy) -> Invocation {
        Invocation {
            task: Arc::clone(task),
            index,
            group: Arc::new(GroupInner::new(GroupId::new(0, 1), Priority::ThisFrame, None)),
            nesting,
        }
    }

    fn task(name: &str) -> Arc<Task> {
        Task::new(name, |_: &TaskContext| {})
    }

    #[test]
    fn picks_higher_priority_first_and_fifo_within_a_class() {
        let a = task("a");
        let b = task("b");
        let mut queues = PriorityQueues::new();
        queues.push(Priority::ThisFrame, invocation(&a, 0, NestingPolicy::Maybe));
        queues.push(Priority::ThisFrame, invocation(&a, 1, NestingPolicy::Maybe));
        queues.push(Priority::EarlyThisFrame, invocation(&b, 0, NestingPolicy::Maybe));

        let order: Vec<(String, u32)> = std::iter::from_fn(|| {
            queues
                .pop_first(&Priority::THIS_FRAME, |_| true)
                .map(|inv| (inv.task.name(), inv.index))
        })
        .collect();

        assert_eq!(
            order,
            vec![("b".to_string(), 0), ("a".to_string(), 0), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn filter_skips_rejected_invocations_without_reordering() {
        let a = task("a");
        let b = task("b");
        let mut queues = PriorityQueues::new();
        queues.push(Priority::ThisFrame, invocation(&a, 0, NestingPolicy::Maybe));
        queues.push(Priority::ThisFrame, invocation(&b, 0, NestingPolicy::Never));

        let picked = queues
            .pop_first(&Priority::THIS_FRAME, |inv| inv.nesting == NestingPolicy::Never)
            .unwrap();
        assert_eq!(picked.task.name(), "b");
        assert_eq!(queues.len(Priority::ThisFrame), 1);
        assert!(queues.pop_first(&[Priority::LongRunning], |_| true).is_none());
    }

    #[test]
    fn remove_task_takes_all_invocations_of_that_task() {
        let a = task("a");
        let b = task("b");
        let mut queues = PriorityQueues::new();
        for i in 0..3 {
            queues.push(Priority::LongRunning, invocation(&a, i, NestingPolicy::Maybe));
        }
        queues.push(Priority::LongRunning, invocation(&b, 0, NestingPolicy::Maybe));

        let removed = queues.remove_task(&a);
        assert_eq!(removed.len(), 3);
        assert_eq!(queues.len(Priority::LongRunning), 1);
    }

    #[test]
    fn front_batch_jumps_the_queue_in_order() {
        let waiting = task("waiting");
        let released = task("released");
        let mut queues = PriorityQueues::new();
        queues.push(Priority::ThisFrame, invocation(&waiting, 0, NestingPolicy::Maybe));
        queues.push_all(
            Priority::ThisFrame,
            (0..3).map(|i| invocation(&released, i, NestingPolicy::Maybe)).collect(),
            true,
        );

        let order: Vec<_> = std::iter::from_fn(|| queues.pop_first(&[Priority::ThisFrame], |_| true))
            .map(|inv| (inv.task.name(), inv.index))
            .collect();
        assert_eq!(
            order,
            vec![
                ("released".to_string(), 0),
                ("released".to_string(), 1),
                ("released".to_string(), 2),
                ("waiting".to_string(), 0),
            ]
        );
    }

    #[test]
    fn move_bucket_appends_behind_existing_work() {
        let a = task("a");
        let b = task("b");
        let mut queues = PriorityQueues::new();
        queues.push(Priority::ThisFrame, invocation(&a, 0, NestingPolicy::Maybe));
        queues.push(Priority::NextFrame, invocation(&b, 0, NestingPolicy::Maybe));

        assert_eq!(queues.move_bucket(Priority::NextFrame, Priority::ThisFrame), 1);
        assert_eq!(queues.len(Priority::NextFrame), 0);
        let first = queues.pop_first(&[Priority::ThisFrame], |_| true).unwrap();
        assert_eq!(first.task.name(), "a");
    }
}
