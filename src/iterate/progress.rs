// src/iterate/progress.rs

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::iterate::scanner::SkippedDirectory;

/// Outcome of running the command in one target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub path: PathBuf,
    pub was_successful: bool,
    pub error_message: Option<String>,
    pub output: String,
    pub error_output: String,
    pub execution_time: Duration,
    pub executed_at: DateTime<Utc>,
}

/// Snapshot of an iterative run.
///
/// A fresh copy is handed to the [`ProgressSink`] after every state change;
/// observers never share the coordinator's working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationProgress {
    pub command_id: String,
    pub command_name: String,
    pub total_items: usize,
    pub processed_items: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    /// Items never attempted because the run stopped on a failure.
    pub skipped_items: usize,
    pub current_item: Option<String>,
    pub current_directory: Option<PathBuf>,
    pub is_completed: bool,
    pub was_cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub item_results: Vec<ItemResult>,
    /// Directories discovery could not list.
    pub inaccessible_directories: Vec<SkippedDirectory>,
}

impl IterationProgress {
    pub fn new(command_id: impl Into<String>, command_name: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            command_name: command_name.into(),
            total_items: 0,
            processed_items: 0,
            successful_items: 0,
            failed_items: 0,
            skipped_items: 0,
            current_item: None,
            current_directory: None,
            is_completed: false,
            was_cancelled: false,
            started_at: Utc::now(),
            completed_at: None,
            item_results: Vec::new(),
            inaccessible_directories: Vec::new(),
        }
    }

    /// Processed share of the total, 0.0 to 100.0. Zero when there is nothing to do.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        self.processed_items as f64 / self.total_items as f64 * 100.0
    }

    /// Time since start, or the full run time once finished.
    pub fn elapsed(&self) -> Duration {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn status_message(&self) -> String {
        if self.is_completed {
            "Completed".to_string()
        } else if self.was_cancelled {
            "Cancelled".to_string()
        } else {
            format!("Processing {}/{}", self.processed_items, self.total_items)
        }
    }
}

/// Receives progress snapshots as an iterative run advances.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &IterationProgress);
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &IterationProgress) {}
}

impl ProgressSink for mpsc::UnboundedSender<IterationProgress> {
    fn report(&self, progress: &IterationProgress) {
        // A dropped receiver just means nobody is watching any more.
        let _ = self.send(progress.clone());
    }
}
