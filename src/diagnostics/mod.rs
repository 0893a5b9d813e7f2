// src/diagnostics/mod.rs

//! Read-only snapshots of the scheduler for debugging and tooling.
//!
//! A [`GraphSnapshot`] is taken under the scheduler lock and copied out, so it
//! has no effect on scheduling. It serializes with `serde` and renders to
//! Graphviz DOT through [`GraphSnapshot::to_dot`].

pub mod dot;

use serde::Serialize;

use crate::group::GroupId;
use crate::scheduler::{SchedulerHandle, SchedulerStats};
use crate::types::{NestingPolicy, Priority, WorkerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    /// Created, tasks and dependencies may still be added.
    Building,
    /// Started, waiting for predecessors.
    Blocked,
    /// Invocations are queued or running.
    Running,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub nesting: NestingPolicy,
    pub multiplicity: u32,
    pub completed: u32,
    pub running: u32,
    pub canceled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSnapshot {
    pub id: GroupId,
    pub priority: Priority,
    pub state: GroupState,
    /// Predecessors that have not finished yet.
    pub depends_on: Vec<GroupId>,
    pub remaining_dependencies: u32,
    pub remaining_invocations: u32,
    pub tasks: Vec<TaskSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub priority: Priority,
    pub invocations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub kind: WorkerKind,
    pub configured: usize,
    pub allocated: usize,
    pub blocked: usize,
}

/// Everything live in a scheduler at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub groups: Vec<GroupSnapshot>,
    pub queues: Vec<QueueSnapshot>,
    pub pools: Vec<PoolSnapshot>,
    pub group_capacity: usize,
    pub stats: SchedulerStats,
}

impl GraphSnapshot {
    pub fn group(&self, id: GroupId) -> Option<&GroupSnapshot> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn queued(&self, priority: Priority) -> usize {
        self.queues
            .iter()
            .find(|q| q.priority == priority)
            .map_or(0, |q| q.invocations)
    }

    /// Dependency edges `(dependency, dependent)` between live groups.
    pub fn edges(&self) -> impl Iterator<Item = (GroupId, GroupId)> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.depends_on.iter().map(move |dep| (*dep, g.id)))
    }
}

impl SchedulerHandle {
    pub fn snapshot(&self) -> GraphSnapshot {
        use std::sync::atomic::Ordering;

        let state = self.shared.state.lock();

        let groups = state
            .arena
            .iter_live()
            .map(|inner| {
                let body = inner.body.lock();
                let group_state = if !body.started {
                    GroupState::Building
                } else if body.scheduled {
                    GroupState::Running
                } else {
                    GroupState::Blocked
                };
                let remaining_invocations = if body.scheduled {
                    inner.remaining_invocations.load(Ordering::Acquire)
                } else {
                    body.tasks.iter().map(|t| t.multiplicity()).sum()
                };
                GroupSnapshot {
                    id: inner.id,
                    priority: body.priority,
                    state: group_state,
                    depends_on: body
                        .depends_on
                        .iter()
                        .copied()
                        .filter(|dep| state.arena.is_live(*dep))
                        .collect(),
                    remaining_dependencies: if body.started {
                        inner.remaining_deps.load(Ordering::Acquire)
                    } else {
                        0
                    },
                    remaining_invocations,
                    tasks: body
                        .tasks
                        .iter()
                        .map(|task| {
                            let settings = task.settings();
                            TaskSnapshot {
                                name: settings.name,
                                nesting: settings.nesting,
                                multiplicity: settings.multiplicity.max(1),
                                completed: task.completed_invocations(),
                                running: task.running_invocations(),
                                canceled: task.has_been_canceled(),
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        let queues = Priority::ALL
            .into_iter()
            .map(|priority| QueueSnapshot {
                priority,
                invocations: state.queues.len(priority),
            })
            .collect();

        let pools = WorkerKind::ALL
            .into_iter()
            .map(|kind| {
                let pool = state.pool(kind);
                PoolSnapshot {
                    kind,
                    configured: pool.target,
                    allocated: pool.allocated,
                    blocked: pool.blocked,
                }
            })
            .collect();

        GraphSnapshot {
            groups,
            queues,
            pools,
            group_capacity: state.arena.capacity(),
            stats: self.stats(),
        }
    }
}
