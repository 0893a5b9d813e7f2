// tests/frame_boundary.rs

mod common;
use crate::common::init_tracing;
use crate::common::probe::{Gate, Recorder};
use crate::common::{scheduler, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use frametasks::{FrametasksError, Priority, TaskSettings};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn next_frame_work_waits_for_the_frame_boundary() -> TestResult {
    init_tracing();
    let scheduler = scheduler(2, 1);
    let recorder = Recorder::new();
    let gate = Gate::new();

    let task = {
        let gate = Arc::clone(&gate);
        recorder.task_with(TaskSettings::new("next"), move |_| {
            gate.wait_timeout(Duration::from_secs(5));
        })
    };
    let group = scheduler.start_single_task(&task, Priority::NextFrame, None, None)?;

    thread::sleep(Duration::from_millis(50));
    assert_eq!(recorder.count("next"), 0, "next-frame work ran before the frame ended");
    assert_eq!(scheduler.snapshot().queued(Priority::NextFrame), 1);

    // First boundary promotes the work but does not wait for it.
    scheduler.finish_frame_tasks()?;
    assert!(!scheduler.is_group_finished(group));
    assert_eq!(scheduler.snapshot().queued(Priority::NextFrame), 0);

    // Second boundary waits for it, since it is this-frame work now.
    gate.open();
    scheduler.finish_frame_tasks()?;
    assert!(scheduler.is_group_finished(group));
    assert_eq!(recorder.count("next"), 1);
    Ok(())
}

#[test]
fn this_frame_groups_are_finished_when_the_frame_ends() -> TestResult {
    init_tracing();
    let scheduler = scheduler(2, 1);
    let recorder = Recorder::new();

    let mut groups = Vec::new();
    for (i, priority) in [
        Priority::EarlyThisFrame,
        Priority::ThisFrame,
        Priority::LateThisFrame,
    ]
    .into_iter()
    .enumerate()
    {
        let task = recorder.task_with(TaskSettings::new(format!("t{i}")).multiplicity(8), |_| {
            thread::sleep(Duration::from_millis(1));
        });
        groups.push(scheduler.start_single_task(&task, priority, None, None)?);
    }

    scheduler.finish_frame_tasks()?;

    for group in groups {
        assert!(scheduler.is_group_finished(group));
    }
    assert_eq!(recorder.total(), 24);
    Ok(())
}

#[test]
fn this_frame_main_thread_work_runs_on_the_calling_thread() -> TestResult {
    init_tracing();
    let scheduler = scheduler(2, 1);
    let recorder = Recorder::new();
    let task = recorder.task_with(TaskSettings::new("main-only").multiplicity(4), |_| {});

    let group = scheduler.start_single_task(&task, Priority::ThisFrameMainThread, None, None)?;

    thread::sleep(Duration::from_millis(20));
    assert_eq!(recorder.count("main-only"), 0, "workers must not take main-thread work");

    scheduler.finish_frame_tasks()?;
    assert!(scheduler.is_group_finished(group));

    let me = thread::current().id();
    let events = recorder.events_for("main-only");
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.thread == me));
    Ok(())
}

#[test]
fn frame_boundary_rejects_other_threads() -> TestResult {
    init_tracing();
    let scheduler = scheduler(1, 1);
    let handle = scheduler.handle();

    let result = thread::spawn(move || handle.finish_frame_tasks())
        .join()
        .map_err(|_| "helper thread panicked")?;
    assert!(matches!(result, Err(FrametasksError::NotMainThread)));

    scheduler.finish_frame_tasks()?;
    Ok(())
}

#[test]
fn some_frame_main_thread_work_completes_within_a_few_frames() -> TestResult {
    init_tracing();
    let scheduler = scheduler(2, 1);
    let recorder = Recorder::new();
    let task = recorder.task_with(TaskSettings::new("deferred").multiplicity(3), |_| {});

    let group = scheduler.start_single_task(&task, Priority::SomeFrameMainThread, None, None)?;

    let mut frames = 0;
    while !scheduler.is_group_finished(group) {
        assert!(frames < 200, "some-frame work never completed");
        scheduler.finish_frame_tasks()?;
        frames += 1;
    }

    let me = thread::current().id();
    let events = recorder.events_for("deferred");
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.thread == me));
    assert!(scheduler.stats().frames_finished >= 1);
    Ok(())
}

#[test]
fn main_thread_wait_runs_awaited_some_frame_work() -> TestResult {
    init_tracing();
    let scheduler = scheduler(1, 1);
    let recorder = Recorder::new();
    let task = recorder.task("awaited");

    let group = scheduler.start_single_task(&task, Priority::SomeFrameMainThread, None, None)?;
    scheduler.wait_for_group(group)?;

    assert_eq!(recorder.count("awaited"), 1);
    assert_eq!(recorder.events_for("awaited")[0].thread, thread::current().id());
    Ok(())
}

#[test]
fn frame_waits_for_this_frame_groups_behind_long_work() -> TestResult {
    init_tracing();
    let scheduler = scheduler(1, 1);
    let recorder = Recorder::new();
    let gate = Gate::new();

    let blocker = {
        let gate = Arc::clone(&gate);
        recorder.task_with(TaskSettings::new("blocker"), move |_| {
            gate.wait_timeout(Duration::from_secs(5));
        })
    };
    let first = scheduler.start_single_task(&blocker, Priority::LongRunning, None, None)?;
    let late = recorder.task("late");
    let late_group = scheduler.start_single_task(&late, Priority::LateThisFrame, Some(first), None)?;

    let opener = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            gate.open();
        })
    };

    scheduler.finish_frame_tasks()?;
    assert!(scheduler.is_group_finished(late_group));
    assert!(recorder.last_end("blocker") < recorder.first_start("late"));
    opener.join().map_err(|_| "opener thread panicked")?;
    Ok(())
}

#[test]
fn frame_does_not_wait_for_groups_behind_next_frame_work() -> TestResult {
    init_tracing();
    // The scheduler lives on the helper thread, which makes it the main thread.
    with_timeout(|| -> frametasks::Result<()> {
        let scheduler = scheduler(2, 1);
        let recorder = Recorder::new();

        let later = scheduler.start_single_task(&recorder.task("later"), Priority::NextFrame, None, None)?;
        let now = scheduler.start_single_task(
            &recorder.task("now"),
            Priority::ThisFrame,
            Some(later),
            None,
        )?;

        scheduler.finish_frame_tasks()?;
        scheduler.finish_frame_tasks()?;

        assert!(scheduler.is_group_finished(later));
        assert!(scheduler.is_group_finished(now));
        assert!(recorder.last_end("later") < recorder.first_start("now"));
        Ok(())
    })?;
    Ok(())
}

#[test]
fn frame_does_not_wait_for_groups_behind_some_frame_work() -> TestResult {
    init_tracing();
    with_timeout(|| -> frametasks::Result<()> {
        let scheduler = scheduler(2, 1);
        let recorder = Recorder::new();

        let deferred = scheduler.start_single_task(
            &recorder.task("deferred"),
            Priority::SomeFrameMainThread,
            None,
            None,
        )?;
        let dependent = scheduler.start_single_task(
            &recorder.task("dependent"),
            Priority::ThisFrame,
            Some(deferred),
            None,
        )?;

        let mut frames = 0;
        while !scheduler.is_group_finished(dependent) {
            assert!(frames < 200, "dependent of some-frame work never completed");
            scheduler.finish_frame_tasks()?;
            frames += 1;
        }
        assert_eq!(recorder.count("deferred"), 1);
        assert_eq!(recorder.count("dependent"), 1);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn frame_does_not_wait_for_groups_behind_unstarted_groups() -> TestResult {
    init_tracing();
    with_timeout(|| -> frametasks::Result<()> {
        let scheduler = scheduler(2, 1);
        let recorder = Recorder::new();

        let pending = scheduler.create_group(Priority::ThisFrame, None)?;
        scheduler.add_task_to_group(pending, &recorder.task("pending"))?;
        let dependent = scheduler.start_single_task(
            &recorder.task("dependent"),
            Priority::LateThisFrame,
            Some(pending),
            None,
        )?;

        scheduler.finish_frame_tasks()?;
        assert!(!scheduler.is_group_finished(dependent));

        scheduler.start_group(pending)?;
        scheduler.finish_frame_tasks()?;
        assert!(scheduler.is_group_finished(dependent));
        assert_eq!(recorder.count("dependent"), 1);
        Ok(())
    })?;
    Ok(())
}
