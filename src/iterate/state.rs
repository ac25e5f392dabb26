// src/iterate/state.rs

//! Pure bookkeeping for an iterative run.
//!
//! `IterationState` owns the progress record and applies the failure policy.
//! It has no Tokio types and performs no IO, so the counting rules can be
//! unit tested directly; [`crate::iterate::coordinator`] is the async shell
//! that feeds it.

use std::path::Path;

use chrono::Utc;

use crate::iterate::options::IterationOptions;
use crate::iterate::progress::{ItemResult, IterationProgress};
use crate::iterate::scanner::ScanReport;
use crate::types::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPhase {
    NotStarted,
    Running,
    Completed,
    Cancelled,
    /// Stopped early on a failure, or discovery failed.
    Aborted,
}

/// What the loop should do after an item has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDecision {
    Continue,
    Stop,
}

#[derive(Debug, Clone)]
pub struct IterationState {
    progress: IterationProgress,
    stops_on_failure: bool,
    phase: IterationPhase,
    discovery_failed: bool,
}

impl IterationState {
    pub fn new(command: &CommandSpec, options: &IterationOptions) -> Self {
        Self {
            progress: IterationProgress::new(&command.id, &command.name),
            stops_on_failure: options.stops_on_failure(),
            phase: IterationPhase::NotStarted,
            discovery_failed: false,
        }
    }

    pub fn phase(&self) -> IterationPhase {
        self.phase
    }

    pub fn progress(&self) -> &IterationProgress {
        &self.progress
    }

    pub fn into_progress(self) -> IterationProgress {
        self.progress
    }

    /// Targets are known; the run starts.
    pub fn begin(&mut self, report: &ScanReport) {
        self.progress.total_items = report.targets.len();
        self.progress.inaccessible_directories = report.skipped.clone();
        self.phase = IterationPhase::Running;
    }

    pub fn start_item(&mut self, target: &Path) {
        self.progress.current_item = Some(
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| target.display().to_string()),
        );
        self.progress.current_directory = Some(target.to_path_buf());
    }

    pub fn record_item(&mut self, item: ItemResult) -> ItemDecision {
        let failed = !item.was_successful;
        if failed {
            self.progress.failed_items += 1;
        } else {
            self.progress.successful_items += 1;
        }

        self.progress.item_results.push(item);
        self.progress.processed_items += 1;

        if failed && self.stops_on_failure {
            self.progress.skipped_items =
                self.progress.total_items - self.progress.processed_items;
            self.phase = IterationPhase::Aborted;
            return ItemDecision::Stop;
        }

        ItemDecision::Continue
    }

    pub fn record_cancelled(&mut self) {
        self.progress.was_cancelled = true;
        self.phase = IterationPhase::Cancelled;
    }

    /// Discovery itself failed: record one failed item at the root.
    pub fn record_discovery_failure(&mut self, root: &Path, message: &str) {
        let now = Utc::now();
        self.progress.item_results.push(ItemResult {
            path: root.to_path_buf(),
            was_successful: false,
            error_message: Some(format!("Iteration failed: {message}")),
            output: String::new(),
            error_output: String::new(),
            execution_time: std::time::Duration::ZERO,
            executed_at: now,
        });
        self.discovery_failed = true;
        self.phase = IterationPhase::Aborted;
    }

    /// Stamp the completion time and settle `is_completed`.
    pub fn finish(&mut self) {
        self.progress.completed_at = Some(Utc::now());
        self.progress.current_item = None;
        self.progress.is_completed = !self.progress.was_cancelled
            && self.progress.skipped_items == 0
            && !self.discovery_failed;

        if self.progress.is_completed {
            self.phase = IterationPhase::Completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report(n: usize) -> ScanReport {
        ScanReport {
            targets: (0..n).map(|i| PathBuf::from(format!("/r/{i}"))).collect(),
            skipped: Vec::new(),
        }
    }

    fn item(i: usize, ok: bool) -> ItemResult {
        ItemResult {
            path: PathBuf::from(format!("/r/{i}")),
            was_successful: ok,
            error_message: (!ok).then(|| "boom".to_string()),
            output: String::new(),
            error_output: String::new(),
            execution_time: Duration::ZERO,
            executed_at: Utc::now(),
        }
    }

    fn state(skip_errors: bool, stop_on_first_failure: bool) -> IterationState {
        let command = CommandSpec::new("c", "cmd", "echo");
        let options = IterationOptions {
            skip_errors,
            stop_on_first_failure,
            ..IterationOptions::default()
        };
        IterationState::new(&command, &options)
    }

    #[test]
    fn all_successful_run_completes() {
        let mut s = state(true, false);
        s.begin(&report(2));
        assert_eq!(s.phase(), IterationPhase::Running);

        assert_eq!(s.record_item(item(0, true)), ItemDecision::Continue);
        assert_eq!(s.record_item(item(1, true)), ItemDecision::Continue);
        s.finish();

        let p = s.progress();
        assert_eq!((p.processed_items, p.successful_items, p.failed_items), (2, 2, 0));
        assert!(p.is_completed);
        assert!(p.completed_at.is_some());
        assert_eq!(s.phase(), IterationPhase::Completed);
    }

    #[test]
    fn stop_on_first_failure_skips_the_rest() {
        let mut s = state(false, true);
        s.begin(&report(3));

        assert_eq!(s.record_item(item(0, false)), ItemDecision::Stop);
        s.finish();

        let p = s.progress();
        assert_eq!(p.failed_items, 1);
        assert_eq!(p.processed_items, 1);
        assert_eq!(p.skipped_items, 2);
        assert_eq!(p.processed_items + p.skipped_items, p.total_items);
        assert!(!p.is_completed);
        assert_eq!(s.phase(), IterationPhase::Aborted);
    }

    #[test]
    fn skip_errors_wins_over_stop_flag() {
        let mut s = state(true, true);
        s.begin(&report(2));

        assert_eq!(s.record_item(item(0, false)), ItemDecision::Continue);
        assert_eq!(s.record_item(item(1, false)), ItemDecision::Continue);
        s.finish();

        assert_eq!(s.progress().failed_items, 2);
        assert!(s.progress().is_completed);
    }

    #[test]
    fn neither_flag_set_behaves_like_skip_errors() {
        let mut s = state(false, false);
        s.begin(&report(2));

        assert_eq!(s.record_item(item(0, false)), ItemDecision::Continue);
        assert_eq!(s.record_item(item(1, true)), ItemDecision::Continue);
        s.finish();

        let p = s.progress();
        assert_eq!((p.successful_items, p.failed_items, p.skipped_items), (1, 1, 0));
        assert!(p.is_completed);
    }

    #[test]
    fn cancellation_prevents_completion() {
        let mut s = state(true, false);
        s.begin(&report(2));
        s.record_item(item(0, true));
        s.record_cancelled();
        s.finish();

        assert!(s.progress().was_cancelled);
        assert!(!s.progress().is_completed);
        assert_eq!(s.phase(), IterationPhase::Cancelled);
    }

    #[test]
    fn discovery_failure_is_a_single_failed_item() {
        let mut s = state(true, false);
        s.record_discovery_failure(Path::new("/gone"), "Root directory does not exist: /gone");
        s.finish();

        let p = s.progress();
        assert_eq!(p.item_results.len(), 1);
        assert_eq!(
            p.item_results[0].error_message.as_deref(),
            Some("Iteration failed: Root directory does not exist: /gone")
        );
        assert!(!p.is_completed);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn empty_run_is_complete() {
        let mut s = state(true, false);
        s.begin(&report(0));
        s.finish();

        assert!(s.progress().is_completed);
        assert_eq!(s.progress().progress_percentage(), 0.0);
    }
}
