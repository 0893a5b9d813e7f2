// tests/diagnostics.rs

mod common;
use crate::common::probe::{Gate, Recorder};
use crate::common::{eventually, init_tracing, scheduler};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use frametasks::diagnostics::GroupState;
use frametasks::{Priority, TaskSettings, WorkerKind};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn snapshot_reflects_group_lifecycle() -> TestResult {
    init_tracing();
    let scheduler = scheduler(1, 1);
    let recorder = Recorder::new();
    let gate = Gate::new();

    let gated = {
        let gate = Arc::clone(&gate);
        recorder.task_with(TaskSettings::new("gated"), move |ctx| gate.wait_or_cancel(ctx))
    };
    let running = scheduler.start_single_task(&gated, Priority::ThisFrame, None, None)?;
    assert!(eventually(Duration::from_secs(2), || gated.running_invocations() == 1));

    let blocked = scheduler.create_group(Priority::LateThisFrame, None)?;
    scheduler.add_task_to_group(
        blocked,
        &recorder.task_with(TaskSettings::new("wide").multiplicity(3), |_| {}),
    )?;
    scheduler.add_group_dependency(blocked, running)?;
    scheduler.start_group(blocked)?;

    let building = scheduler.create_group(Priority::NextFrame, None)?;

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.groups.len(), 3);
    assert_eq!(snapshot.group(running).map(|g| g.state), Some(GroupState::Running));
    assert_eq!(snapshot.group(blocked).map(|g| g.state), Some(GroupState::Blocked));
    assert_eq!(snapshot.group(building).map(|g| g.state), Some(GroupState::Building));

    let blocked_group = snapshot.group(blocked).ok_or("blocked group missing")?;
    assert_eq!(blocked_group.remaining_dependencies, 1);
    assert_eq!(blocked_group.remaining_invocations, 3);
    assert_eq!(blocked_group.tasks[0].name, "wide");

    let running_group = snapshot.group(running).ok_or("running group missing")?;
    assert_eq!(running_group.tasks[0].running, 1);

    let edges: Vec<_> = snapshot.edges().collect();
    assert_eq!(edges, vec![(running, blocked)]);

    let short = snapshot
        .pools
        .iter()
        .find(|p| p.kind == WorkerKind::Short)
        .ok_or("short pool missing")?;
    assert_eq!(short.configured, 1);

    gate.open();
    scheduler.wait_for_group(blocked)?;
    scheduler.start_group(building)?;
    assert!(scheduler.snapshot().groups.is_empty());
    Ok(())
}

#[test]
fn snapshot_renders_to_dot_and_json() -> TestResult {
    init_tracing();
    let scheduler = scheduler(1, 1);
    let recorder = Recorder::new();

    let first = scheduler.create_group(Priority::EarlyThisFrame, None)?;
    scheduler.add_task_to_group(first, &recorder.task("produce"))?;
    let second = scheduler.create_group(Priority::ThisFrame, None)?;
    scheduler.add_task_to_group(second, &recorder.task("consume"))?;
    scheduler.add_group_dependency(second, first)?;
    scheduler.start_group(second)?;

    let snapshot = scheduler.snapshot();
    let dot = snapshot.to_dot();
    assert!(dot.contains("digraph"));
    assert!(dot.contains("->"));
    assert!(dot.contains("produce"));
    assert!(dot.contains("consume"));

    let json = serde_json::to_string(&snapshot)?;
    assert!(json.contains("\"blocked\""));
    assert!(json.contains("\"building\""));
    assert!(json.contains("\"this_frame\""));

    scheduler.start_group(first)?;
    scheduler.wait_for_group(second)?;
    Ok(())
}

#[test]
fn stats_count_groups_and_invocations() -> TestResult {
    init_tracing();
    let scheduler = scheduler(2, 1);
    let recorder = Recorder::new();

    for i in 0..5 {
        let task = recorder.task_with(TaskSettings::new(format!("t{i}")).multiplicity(4), |_| {});
        let group = scheduler.start_single_task(&task, Priority::ThisFrame, None, None)?;
        scheduler.wait_for_group(group)?;
    }
    scheduler.finish_frame_tasks()?;
    scheduler.finish_frame_tasks()?;

    let stats = scheduler.stats();
    assert_eq!(stats.groups_created, 5);
    assert_eq!(stats.groups_finished, 5);
    assert_eq!(stats.invocations_executed, 20);
    assert_eq!(stats.invocations_skipped, 0);
    assert_eq!(stats.frames_finished, 2);
    assert_eq!(scheduler.snapshot().stats, stats);
    Ok(())
}
