// src/security/policy.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Execution policy, usually read from the `[security]` section of the
/// config file.
///
/// ```toml
/// [security]
/// require_confirmation_for_dangerous = true
/// blocked_commands = ["shutdown"]
/// dangerous_patterns = ["rm -rf", "mkfs"]
/// ```
///
/// Every field is optional and falls back to [`SecurityPolicy::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Ask before running anything that matches a dangerous pattern.
    pub require_confirmation_for_dangerous: bool,

    /// Advisory only: no sandbox is applied to spawned processes.
    pub sandbox_execution: bool,

    /// Upper bound for a single process execution.
    pub max_execution_time_secs: u64,

    /// Executable names that are refused outright (case-insensitive).
    pub blocked_commands: Vec<String>,

    /// Case-insensitive substrings that flag a command as high-risk.
    pub dangerous_patterns: Vec<String>,

    pub log_command_executions: bool,

    /// Directory for the execution log file, if any.
    pub log_directory: Option<PathBuf>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            require_confirmation_for_dangerous: true,
            sandbox_execution: true,
            max_execution_time_secs: 300,
            blocked_commands: Vec::new(),
            dangerous_patterns: default_dangerous_patterns(),
            log_command_executions: true,
            log_directory: None,
        }
    }
}

fn default_dangerous_patterns() -> Vec<String> {
    ["rm -rf", "del /f /q", "format", "fdisk", "dd if=", "mkfs"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl SecurityPolicy {
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_secs(self.max_execution_time_secs)
    }
}
