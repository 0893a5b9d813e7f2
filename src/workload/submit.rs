// src/workload/submit.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::model::{ConfigFile, JobConfig};
use crate::errors::{FrametasksError, Result};
use crate::group::GroupId;
use crate::scheduler::SchedulerHandle;
use crate::task::{Task, TaskBody, TaskContext, TaskSettings};
use crate::workload::graph::JobGraph;

/// Longest single sleep while simulating work, so cancellation is noticed quickly.
const WORK_SLICE: Duration = Duration::from_micros(250);

/// Sleeps for a fixed time per invocation, polling for cancellation.
struct SimulatedWork {
    per_invocation: Duration,
    executed: Arc<AtomicU64>,
}

impl TaskBody for SimulatedWork {
    fn execute(&self, ctx: &TaskContext) {
        let deadline = Instant::now() + self.per_invocation;
        loop {
            if ctx.has_been_canceled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(WORK_SLICE));
        }
        self.executed.fetch_add(1, Ordering::Relaxed);
    }
}

struct Job {
    config: JobConfig,
    task: Arc<Task>,
}

/// Result of submitting one frame of jobs.
#[derive(Debug, Clone, Default)]
pub struct FrameSubmission {
    pub groups: Vec<GroupId>,
    /// Jobs still in flight from an earlier frame.
    pub skipped: Vec<String>,
}

/// The `[job.*]` sections of a config, turned into one reusable task per job.
pub struct Workload {
    graph: JobGraph,
    jobs: BTreeMap<String, Job>,
    last_group: HashMap<String, GroupId>,
    executed: Arc<AtomicU64>,
}

impl Workload {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let graph = JobGraph::from_config(cfg)?;
        let executed = Arc::new(AtomicU64::new(0));

        let jobs = cfg
            .job
            .iter()
            .map(|(name, config)| {
                let settings = TaskSettings::new(name.clone())
                    .nesting(config.nesting)
                    .multiplicity(config.multiplicity);
                let body = SimulatedWork {
                    per_invocation: Duration::from_micros(config.work_us),
                    executed: Arc::clone(&executed),
                };
                let job = Job {
                    config: config.clone(),
                    task: Task::with_settings(settings, body),
                };
                (name.clone(), job)
            })
            .collect();

        Ok(Self {
            graph,
            jobs,
            last_group: HashMap::new(),
            executed,
        })
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// Create, wire up and start one group per job.
    ///
    /// A job whose previous run is still in flight (long-running or next-frame
    /// work) is skipped; its dependents then wait on that earlier run instead.
    pub fn submit_frame(&mut self, scheduler: &SchedulerHandle) -> Result<FrameSubmission> {
        let mut submission = FrameSubmission::default();
        let mut this_frame: HashMap<String, GroupId> = HashMap::new();

        for name in self.graph.order() {
            let job = self
                .jobs
                .get(name)
                .ok_or_else(|| FrametasksError::JobNotFound(name.clone()))?;

            if !job.task.is_finished() {
                debug!(job = %name, "job still in flight, skipping this frame");
                submission.skipped.push(name.clone());
                continue;
            }

            let group = scheduler.create_group(job.config.priority, None)?;
            scheduler.add_task_to_group(group, &job.task)?;
            for dep in self.graph.dependencies_of(name) {
                let dep_group = this_frame
                    .get(dep)
                    .or_else(|| self.last_group.get(dep))
                    .copied();
                if let Some(dep_group) = dep_group {
                    scheduler.add_group_dependency(group, dep_group)?;
                }
            }

            this_frame.insert(name.clone(), group);
            submission.groups.push(group);
        }

        scheduler.start_groups(&submission.groups)?;
        self.last_group.extend(this_frame);

        debug!(
            groups = submission.groups.len(),
            skipped = submission.skipped.len(),
            "submitted frame workload"
        );
        Ok(submission)
    }

    /// `true` once no job has work in flight.
    pub fn is_idle(&self) -> bool {
        self.jobs.values().all(|job| job.task.is_finished())
    }

    /// Invocations that ran to completion across all jobs and frames.
    pub fn executed_invocations(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }
}
