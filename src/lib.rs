// src/lib.rs

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod group;
pub mod logging;
pub mod scheduler;
pub mod task;
pub mod types;
pub mod workload;

pub use diagnostics::GraphSnapshot;
pub use errors::{FrametasksError, Result};
pub use group::{GroupCallback, GroupId};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerOptions, SchedulerStats};
pub use task::{Task, TaskBody, TaskCallback, TaskContext, TaskSettings};
pub use types::{CancelMode, NestingPolicy, Priority, WorkerKind};

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::workload::{JobGraph, Workload};

/// Frames to keep finishing after the last one before giving up on
/// long-running or next-frame work still in flight.
const MAX_DRAIN_FRAMES: u32 = 10_000;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, starts a scheduler on the calling thread (which becomes
/// the main thread), submits the job workload once per frame and finishes
/// each frame. Afterwards it keeps finishing frames until every job is idle.
pub fn run(args: CliArgs) -> anyhow::Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let scheduler = Scheduler::new(SchedulerOptions::from(&cfg.scheduler))?;
    let mut workload = Workload::from_config(&cfg)?;

    info!(
        jobs = workload.graph().len(),
        frames = args.frames,
        "starting frame loop"
    );

    for frame in 0..args.frames {
        let submission = workload.submit_frame(&scheduler)?;

        if frame + 1 == args.frames {
            if let Some(ref path) = args.dot {
                fs::write(path, scheduler.snapshot().to_dot())?;
                info!(path = %path.display(), "wrote scheduler snapshot");
            }
        }

        scheduler.finish_frame_tasks()?;
        debug!(
            frame,
            groups = submission.groups.len(),
            skipped = submission.skipped.len(),
            "frame done"
        );
    }

    let mut drained = 0;
    while !workload.is_idle() {
        if drained == MAX_DRAIN_FRAMES {
            warn!("work still in flight after draining, shutting down anyway");
            break;
        }
        scheduler.finish_frame_tasks()?;
        thread::sleep(Duration::from_millis(1));
        drained += 1;
    }

    let stats = scheduler.stats();
    info!(
        executed = workload.executed_invocations(),
        groups_finished = stats.groups_finished,
        frames = stats.frames_finished,
        "frame loop complete"
    );

    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

/// Simple dry-run output: print scheduler settings and jobs in dependency order.
fn print_dry_run(cfg: &ConfigFile) -> anyhow::Result<()> {
    let graph = JobGraph::from_config(cfg)?;

    println!("frametasks dry-run");
    println!("  scheduler.short_workers = {}", cfg.scheduler.short_workers);
    println!("  scheduler.long_workers = {}", cfg.scheduler.long_workers);
    println!(
        "  scheduler.max_workers_per_pool = {}",
        cfg.scheduler.max_workers_per_pool
    );
    println!(
        "  scheduler.max_outstanding_groups = {}",
        cfg.scheduler.max_outstanding_groups
    );
    println!(
        "  scheduler.target_frame_time_ms = {:.3}",
        cfg.scheduler.target_frame_time_ms
    );
    println!();

    let roots: Vec<&str> = graph.roots().collect();
    println!("jobs ({}), roots: {:?}", graph.len(), roots);
    for name in graph.order() {
        let Some(job) = cfg.job.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      priority: {}", job.priority);
        if job.multiplicity != 1 {
            println!("      multiplicity: {}", job.multiplicity);
        }
        if job.nesting == NestingPolicy::Never {
            println!("      nesting: never");
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
        if job.work_us > 0 {
            println!("      work_us: {}", job.work_us);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
