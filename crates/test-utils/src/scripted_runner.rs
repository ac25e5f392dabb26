use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use cmdrun::exec::{CancelSignal, CommandRunner, RunFuture};
use cmdrun::types::{CommandSpec, ExecutionResult};

/// A fake runner that:
/// - records every directory it was asked to run in
/// - fails (exit 1) when the directory path contains a configured marker
/// - panics when the directory path contains a panic marker
/// - optionally fires a cancel signal after N runs
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    fail_markers: Vec<String>,
    panic_markers: Vec<String>,
    cancel_after: Option<(usize, CancelSignal)>,
    executed: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_when_path_contains(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    pub fn panic_when_path_contains(mut self, marker: &str) -> Self {
        self.panic_markers.push(marker.to_string());
        self
    }

    /// Cancel `signal` once `runs` items have finished.
    pub fn cancel_after(mut self, runs: usize, signal: CancelSignal) -> Self {
        self.cancel_after = Some((runs, signal));
        self
    }

    /// Directories run so far, in order.
    pub fn executed(&self) -> Vec<PathBuf> {
        self.executed.lock().unwrap().clone()
    }

    fn matches(markers: &[String], dir: &Path) -> bool {
        let dir = dir.to_string_lossy();
        markers.iter().any(|m| dir.contains(m.as_str()))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        working_dir: &'a Path,
        _cancel: &'a CancelSignal,
    ) -> RunFuture<'a> {
        Box::pin(async move {
            let runs = {
                let mut guard = self.executed.lock().unwrap();
                guard.push(working_dir.to_path_buf());
                guard.len()
            };

            assert_eq!(
                command.working_directory, working_dir,
                "each item must get a command scoped to its directory"
            );

            if Self::matches(&self.panic_markers, working_dir) {
                panic!("scripted panic in {}", working_dir.display());
            }

            let failed = Self::matches(&self.fail_markers, working_dir);
            let now = Utc::now();
            let result = ExecutionResult {
                command_id: command.id.clone(),
                command_name: command.name.clone(),
                exit_code: if failed { 1 } else { 0 },
                standard_output: format!("ran in {}\n", working_dir.display()),
                standard_error: if failed { "scripted failure\n".to_string() } else { String::new() },
                execution_time: Duration::from_millis(1),
                started_at: now,
                completed_at: now,
                was_cancelled: false,
                working_directory: working_dir.to_path_buf(),
                environment: command.environment.clone(),
                execution_errors: Vec::new(),
            };

            if let Some((after, signal)) = &self.cancel_after {
                if runs >= *after {
                    signal.cancel();
                }
            }

            result
        })
    }
}
