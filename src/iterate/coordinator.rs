// src/iterate/coordinator.rs

//! Async shell around [`IterationState`]: discovery, the per-item loop, and
//! progress reporting.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::exec::{CancelSignal, CommandRunner};
use crate::iterate::options::{validate_iteration_options, IterationOptions};
use crate::iterate::progress::{ItemResult, IterationProgress, ProgressSink};
use crate::iterate::scanner::DirectoryScanner;
use crate::iterate::state::{ItemDecision, IterationState};
use crate::types::{CommandSpec, ExecutionResult, ValidationResult};

/// Runs one command across every directory the scanner finds.
///
/// Items run strictly one at a time, in discovery order.
pub struct IterationCoordinator<R> {
    runner: Arc<R>,
    scanner: DirectoryScanner,
}

impl<R> fmt::Debug for IterationCoordinator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterationCoordinator")
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl<R> IterationCoordinator<R>
where
    R: CommandRunner + 'static,
{
    pub fn new(runner: Arc<R>, scanner: DirectoryScanner) -> Self {
        Self { runner, scanner }
    }

    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    pub fn validate_options(&self, root: &Path, options: &IterationOptions) -> ValidationResult {
        validate_iteration_options(self.scanner.file_system(), root, options)
    }

    /// Run `command` in every target under `root`.
    ///
    /// Never fails: a discovery error becomes a single failed item at the
    /// root, and per-item failures are recorded according to the failure
    /// policy in `options`. `sink` sees a snapshot after every change.
    pub async fn run(
        &self,
        command: &CommandSpec,
        root: &Path,
        options: &IterationOptions,
        sink: &dyn ProgressSink,
        cancel: &CancelSignal,
    ) -> IterationProgress {
        let mut state = IterationState::new(command, options);

        info!(
            command = %command.name,
            root = %root.display(),
            max_depth = options.max_depth,
            "starting iterative execution"
        );

        let report = match self.scanner.scan(root, options, cancel).await {
            Ok(report) => report,
            Err(e) => {
                error!(root = %root.display(), error = %e, "target discovery failed");
                state.record_discovery_failure(root, &e.to_string());
                state.finish();
                sink.report(state.progress());
                return state.into_progress();
            }
        };

        state.begin(&report);
        sink.report(state.progress());

        for target in &report.targets {
            if cancel.is_cancelled() {
                info!(command = %command.name, "iteration cancelled");
                state.record_cancelled();
                break;
            }

            state.start_item(target);
            sink.report(state.progress());

            let item = self.run_item(command, target, cancel).await;
            if !item.was_successful {
                warn!(
                    command = %command.name,
                    dir = %target.display(),
                    error = item.error_message.as_deref().unwrap_or(""),
                    "item failed"
                );
            }

            let decision = state.record_item(item);
            sink.report(state.progress());

            if decision == ItemDecision::Stop {
                info!(
                    command = %command.name,
                    skipped = state.progress().skipped_items,
                    "stopping after first failure"
                );
                break;
            }
        }

        if cancel.is_cancelled() && !state.progress().was_cancelled {
            state.record_cancelled();
        }

        state.finish();
        sink.report(state.progress());

        let progress = state.into_progress();
        info!(
            command = %command.name,
            processed = progress.processed_items,
            succeeded = progress.successful_items,
            failed = progress.failed_items,
            skipped = progress.skipped_items,
            cancelled = progress.was_cancelled,
            "iterative execution finished"
        );
        progress
    }

    /// Run in a separate task so a panicking runner costs one item, not the run.
    async fn run_item(&self, command: &CommandSpec, target: &Path, cancel: &CancelSignal) -> ItemResult {
        let runner = Arc::clone(&self.runner);
        let scoped = command.for_directory(target);
        let dir = target.to_path_buf();
        let cancel = cancel.clone();

        let joined = tokio::spawn(async move { runner.run(&scoped, &dir, &cancel).await }).await;

        match joined {
            Ok(result) => item_from_execution(target.to_path_buf(), result),
            Err(e) => {
                error!(dir = %target.display(), error = %e, "item task failed");
                ItemResult {
                    path: target.to_path_buf(),
                    was_successful: false,
                    error_message: Some(e.to_string()),
                    output: String::new(),
                    error_output: String::new(),
                    execution_time: std::time::Duration::ZERO,
                    executed_at: Utc::now(),
                }
            }
        }
    }
}

fn item_from_execution(path: PathBuf, result: ExecutionResult) -> ItemResult {
    let was_successful = result.was_successful();
    let error_message = if was_successful {
        None
    } else if result.was_cancelled {
        Some("Cancelled".to_string())
    } else if result.execution_errors.is_empty() {
        Some(format!("Process exited with code {}", result.exit_code))
    } else {
        Some(result.execution_errors.join("\n"))
    };

    ItemResult {
        path,
        was_successful,
        error_message,
        output: result.standard_output,
        error_output: result.standard_error,
        execution_time: result.execution_time,
        executed_at: Utc::now(),
    }
}
