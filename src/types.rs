// src/types.rs

//! Shared data model: command definitions, execution results and
//! validation diagnostics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A named command as defined in a profile.
///
/// The engine only ever borrows a `CommandSpec`; iteration derives a fresh
/// copy per target through [`CommandSpec::for_directory`] instead of mutating
/// a shared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub id: String,
    pub name: String,
    /// Executable name (resolved via `PATH`) or absolute path.
    pub executable: String,
    /// Raw argument string, split shell-style unless a `shell` is set.
    pub arguments: String,
    pub working_directory: PathBuf,
    /// Optional interpreter (`bash`, `sh`, `cmd`, `powershell`, ...).
    pub shell: Option<String>,
    /// Overlay applied on top of the inherited environment.
    pub environment: BTreeMap<String, String>,
    pub iteration_enabled: bool,
    pub require_confirmation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommandSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, executable: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            executable: executable.into(),
            arguments: String::new(),
            working_directory: PathBuf::new(),
            shell: None,
            environment: BTreeMap::new(),
            iteration_enabled: false,
            require_confirmation: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this command with only `working_directory` replaced.
    pub fn for_directory(&self, dir: impl AsRef<Path>) -> Self {
        Self {
            working_directory: dir.as_ref().to_path_buf(),
            ..self.clone()
        }
    }

    /// `executable` and `arguments` joined by a single space.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.executable, self.arguments)
            .trim()
            .to_string()
    }

    /// The configured shell, if it is set to something non-blank.
    pub fn effective_shell(&self) -> Option<&str> {
        self.shell
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Outcome of one process execution.
///
/// `execution_errors` holds engine-level failures (validation, spawn, kill,
/// timeout); the process's own stderr lives in `standard_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub command_id: String,
    pub command_name: String,
    pub exit_code: i32,
    pub standard_output: String,
    pub standard_error: String,
    pub execution_time: Duration,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub was_cancelled: bool,
    pub working_directory: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub execution_errors: Vec<String>,
}

impl ExecutionResult {
    pub fn was_successful(&self) -> bool {
        self.exit_code == 0
    }
}

/// A single line of process output, as delivered by the streaming executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

/// Accumulated errors (hard failures) and warnings (advisory) from a check.
///
/// `data` carries supplementary diagnostics, e.g. the resolved path of an
/// executable found through `PATH` under the key `resolvedPath`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub data: BTreeMap<String, String>,
}

/// Result of `SecurityGate::validate_security`; same shape as validation.
pub type SecurityAssessment = ValidationResult;

impl ValidationResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn add_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Append another result's errors and warnings, keeping order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.data.extend(other.data);
    }
}
