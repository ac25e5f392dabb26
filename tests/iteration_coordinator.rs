// tests/iteration_coordinator.rs

mod common;
use crate::common::builders::{CommandSpecBuilder, IterationOptionsBuilder};
use crate::common::{init_tracing, mkdirs, with_timeout, ScriptedRunner};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use cmdrun::exec::CancelSignal;
use cmdrun::iterate::{
    DirectoryScanner, IterationCoordinator, IterationOptions, IterationProgress, NoProgress,
};

type TestResult = Result<(), Box<dyn Error>>;

fn coordinator(runner: &ScriptedRunner) -> IterationCoordinator<ScriptedRunner> {
    IterationCoordinator::new(Arc::new(runner.clone()), DirectoryScanner::default())
}

async fn run(
    runner: &ScriptedRunner,
    root: &Path,
    options: &IterationOptions,
    cancel: &CancelSignal,
) -> IterationProgress {
    let command = CommandSpecBuilder::new("echo").args("hi").iterative().build();
    with_timeout(coordinator(runner).run(&command, root, options, &NoProgress, cancel)).await
}

/// `root/a`, `root/b_fail`, `root/c`
fn three_targets() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "a");
    mkdirs(root.path(), "b_fail");
    mkdirs(root.path(), "c");
    Ok(root)
}

#[tokio::test]
async fn all_items_succeed() -> TestResult {
    init_tracing();
    let root = three_targets()?;
    let runner = ScriptedRunner::new();

    let progress = run(&runner, root.path(), &IterationOptions::default(), &CancelSignal::new()).await;

    assert_eq!(progress.total_items, 3);
    assert_eq!(progress.processed_items, 3);
    assert_eq!(progress.successful_items, 3);
    assert!(progress.is_completed);
    assert_eq!(progress.status_message(), "Completed");
    assert_eq!(progress.progress_percentage(), 100.0);
    assert!(progress.completed_at.is_some());
    assert!(progress.item_results[0].output.starts_with("ran in "));
    assert_eq!(runner.executed().len(), 3);
    Ok(())
}

#[tokio::test]
async fn stop_on_first_failure_skips_the_remaining_items() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "a_fail");
    mkdirs(root.path(), "b");
    let runner = ScriptedRunner::new().fail_when_path_contains("fail");
    let options = IterationOptionsBuilder::new()
        .skip_errors(false)
        .stop_on_first_failure(true)
        .max_depth(1)
        .build();

    let progress = run(&runner, root.path(), &options, &CancelSignal::new()).await;

    assert_eq!(progress.failed_items, 1);
    assert_eq!(progress.skipped_items, 1);
    assert!(!progress.is_completed);
    assert_eq!(progress.processed_items + progress.skipped_items, progress.total_items);
    assert_eq!(runner.executed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn skip_errors_runs_everything() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "x_fail");
    mkdirs(root.path(), "y_fail");
    let runner = ScriptedRunner::new().fail_when_path_contains("fail");
    let options = IterationOptionsBuilder::new()
        .skip_errors(true)
        .stop_on_first_failure(true)
        .build();

    let progress = run(&runner, root.path(), &options, &CancelSignal::new()).await;

    assert_eq!(progress.failed_items, 2);
    assert_eq!(progress.skipped_items, 0);
    assert!(progress.is_completed);
    for item in &progress.item_results {
        assert_eq!(item.error_message.as_deref(), Some("Process exited with code 1"));
        assert_eq!(item.error_output, "scripted failure\n");
    }
    Ok(())
}

#[tokio::test]
async fn skip_errors_off_without_stop_flag_still_runs_everything() -> TestResult {
    init_tracing();
    let root = three_targets()?;
    let runner = ScriptedRunner::new().fail_when_path_contains("fail");
    let options = IterationOptionsBuilder::new()
        .skip_errors(false)
        .stop_on_first_failure(false)
        .build();

    let progress = run(&runner, root.path(), &options, &CancelSignal::new()).await;

    assert_eq!(progress.processed_items, 3);
    assert_eq!(progress.failed_items, 1);
    assert_eq!(progress.skipped_items, 0);
    assert!(progress.is_completed);
    Ok(())
}

#[tokio::test]
async fn zero_subdirectories_completes_immediately() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let runner = ScriptedRunner::new();

    let progress = run(&runner, root.path(), &IterationOptions::default(), &CancelSignal::new()).await;

    assert_eq!(progress.total_items, 0);
    assert!(progress.is_completed);
    assert!(progress.item_results.is_empty());
    assert!(runner.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_root_becomes_a_single_failed_item() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let missing = root.path().join("gone");
    let runner = ScriptedRunner::new();

    let progress = run(&runner, &missing, &IterationOptions::default(), &CancelSignal::new()).await;

    assert!(!progress.is_completed);
    assert!(progress.completed_at.is_some());
    assert_eq!(progress.item_results.len(), 1);
    let item = &progress.item_results[0];
    assert_eq!(item.path, missing);
    assert!(!item.was_successful);
    assert_eq!(
        item.error_message.as_deref(),
        Some(format!("Iteration failed: Root directory does not exist: {}", missing.display()).as_str())
    );
    Ok(())
}

#[tokio::test]
async fn panicking_item_is_recorded_and_the_run_continues() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "a_boom");
    mkdirs(root.path(), "b");
    let runner = ScriptedRunner::new().panic_when_path_contains("boom");

    let progress = run(&runner, root.path(), &IterationOptions::default(), &CancelSignal::new()).await;

    assert_eq!(progress.processed_items, 2);
    assert_eq!(progress.failed_items, 1);
    assert_eq!(progress.successful_items, 1);
    assert!(!progress.item_results[0].was_successful);
    assert!(progress.item_results[0].error_message.is_some());
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_before_the_next_item() -> TestResult {
    init_tracing();
    let root = three_targets()?;
    let cancel = CancelSignal::new();
    let runner = ScriptedRunner::new().cancel_after(1, cancel.clone());

    let progress = run(&runner, root.path(), &IterationOptions::default(), &cancel).await;

    assert!(progress.was_cancelled);
    assert!(!progress.is_completed);
    assert_eq!(progress.processed_items, 1);
    assert_eq!(progress.status_message(), "Cancelled");
    assert_eq!(runner.executed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn progress_snapshots_track_each_item() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let only = mkdirs(root.path(), "only");
    let runner = ScriptedRunner::new();
    let command = CommandSpecBuilder::new("echo").id("c1").name("Echo").build();
    let (tx, mut rx) = mpsc::unbounded_channel::<IterationProgress>();

    let final_progress = with_timeout(coordinator(&runner).run(
        &command,
        root.path(),
        &IterationOptions::default(),
        &tx,
        &CancelSignal::new(),
    ))
    .await;
    drop(tx);

    let mut snapshots = Vec::new();
    while let Some(s) = rx.recv().await {
        snapshots.push(s);
    }

    // begin, start item, item recorded, finish
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots[0].total_items, 1);
    assert_eq!(snapshots[0].processed_items, 0);
    assert_eq!(snapshots[1].current_item.as_deref(), Some("only"));
    assert_eq!(snapshots[1].current_directory.as_deref(), Some(only.as_path()));
    assert_eq!(snapshots[2].processed_items, 1);
    assert_eq!(snapshots[3], final_progress);
    assert_eq!(final_progress.command_id, "c1");
    assert_eq!(final_progress.command_name, "Echo");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn real_processes_run_in_each_target() -> TestResult {
    use cmdrun::exec::ProcessExecutor;

    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "one");
    mkdirs(root.path(), "two");
    std::fs::write(root.path().join("one/marker-one"), "")?;
    std::fs::write(root.path().join("two/marker-two"), "")?;

    let coordinator = IterationCoordinator::new(Arc::new(ProcessExecutor::default()), DirectoryScanner::default());
    let command = CommandSpecBuilder::new("ls").iterative().build();

    let progress = with_timeout(coordinator.run(
        &command,
        root.path(),
        &IterationOptions::default(),
        &NoProgress,
        &CancelSignal::new(),
    ))
    .await;

    assert!(progress.is_completed);
    assert_eq!(progress.successful_items, 2);
    let outputs: Vec<_> = progress.item_results.iter().map(|i| i.output.trim()).collect();
    assert!(outputs.contains(&"marker-one"));
    assert!(outputs.contains(&"marker-two"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn item_cancelled_mid_run_says_so() -> TestResult {
    use cmdrun::exec::ProcessExecutor;
    use std::time::Duration;

    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "first");
    mkdirs(root.path(), "second");
    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });
    }

    let coordinator = IterationCoordinator::new(Arc::new(ProcessExecutor::default()), DirectoryScanner::default());
    let command = CommandSpecBuilder::new("sleep").args("30").iterative().build();

    let progress = with_timeout(coordinator.run(
        &command,
        root.path(),
        &IterationOptions::default(),
        &NoProgress,
        &cancel,
    ))
    .await;

    assert!(progress.was_cancelled);
    assert_eq!(progress.processed_items, 1);
    assert_eq!(progress.item_results[0].error_message.as_deref(), Some("Cancelled"));
    Ok(())
}
