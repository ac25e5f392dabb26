// src/validation.rs

//! Pre-flight checks run before any process is spawned.
//!
//! Every check is accumulated into a single [`ValidationResult`]; nothing
//! short-circuits, so callers see all problems at once.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{CommandSpec, ValidationResult};

/// Key under which the PATH-resolved executable is stored in
/// [`ValidationResult::data`].
pub const RESOLVED_PATH_KEY: &str = "resolvedPath";

const MAX_ENV_VARS: usize = 20;
const MAX_ENV_VALUE_CHARS: usize = 10_000;

static ENV_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$").expect("environment variable name regex compiles")
});

static PROBE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Validates a command definition against a working directory.
#[derive(Debug, Clone)]
pub struct Validator {
    fs: Arc<dyn FileSystem>,
    /// Overrides the process `PATH` for executable lookup.
    search_path: Option<OsString>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl Validator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            search_path: None,
        }
    }

    /// Use this `PATH`-style list instead of the process environment.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Async entry point; the filesystem probes run on the blocking pool.
    pub async fn validate(&self, command: &CommandSpec, working_dir: &Path) -> ValidationResult {
        let validator = self.clone();
        let command = command.clone();
        let working_dir = working_dir.to_path_buf();

        match tokio::task::spawn_blocking(move || validator.check(&command, &working_dir)).await {
            Ok(result) => result,
            Err(e) => ValidationResult::failure([format!("Validation task failed: {e}")]),
        }
    }

    /// Run every check synchronously.
    pub fn check(&self, command: &CommandSpec, working_dir: &Path) -> ValidationResult {
        let mut result = ValidationResult::success();

        if command.name.trim().is_empty() {
            result.add_error("Command name is required");
        }

        let executable = command.executable.trim();
        if executable.is_empty() {
            result.add_error("Executable is required");
        }

        result.merge(self.check_working_directory(working_dir));

        if !executable.is_empty() {
            result.merge(self.check_executable(executable));
        }

        result.merge(self.check_environment(&command.environment));

        if command.environment.len() > MAX_ENV_VARS {
            result.add_warning("Large number of environment variables may impact performance");
        }

        if command.iteration_enabled && command.arguments.trim().is_empty() {
            result.add_warning(
                "Iteration enabled but no arguments provided - command will run with default parameters",
            );
        }

        debug!(
            command = %command.name,
            dir = %working_dir.display(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated command"
        );

        result
    }

    /// The directory must exist and accept a throwaway file.
    pub fn check_working_directory(&self, dir: &Path) -> ValidationResult {
        let mut result = ValidationResult::success();

        if dir.to_string_lossy().trim().is_empty() {
            result.add_error("Working directory is required");
            return result;
        }

        if !self.fs.is_dir(dir) {
            result.add_error(format!("Working directory does not exist: {}", dir.display()));
            return result;
        }

        let probe = dir.join(format!(
            ".cmdrun_probe_{}_{}",
            std::process::id(),
            PROBE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let probed = self
            .fs
            .write(&probe, b"probe")
            .and_then(|()| self.fs.remove_file(&probe));

        if let Err(e) = probed {
            result.add_error(format!(
                "Working directory is not writable: {} ({e:#})",
                dir.display()
            ));
        }

        result
    }

    /// Absolute paths must point at a file; bare names are searched on `PATH`.
    pub fn check_executable(&self, executable: &str) -> ValidationResult {
        let mut result = ValidationResult::success();
        let executable = executable.trim();

        if executable.is_empty() {
            result.add_error("Executable path is required");
            return result;
        }

        let path = Path::new(executable);
        if path.is_absolute() {
            if self.fs.is_file(path) {
                result.add_data(RESOLVED_PATH_KEY, executable);
            } else {
                result.add_error(format!("Executable not found: {executable}"));
            }
            return result;
        }

        match self.resolve_on_path(executable) {
            Some(resolved) => {
                result.add_data(RESOLVED_PATH_KEY, resolved.to_string_lossy());
            }
            None => {
                result.add_error(format!("Executable not found in PATH: {executable}"));
            }
        }

        result
    }

    pub fn check_environment(&self, environment: &BTreeMap<String, String>) -> ValidationResult {
        let mut result = ValidationResult::success();

        for (key, value) in environment {
            if key.trim().is_empty() {
                result.add_error("Environment variable key cannot be empty");
            }

            if !key.is_empty() && !ENV_NAME.is_match(key) {
                result.add_error(format!("Invalid environment variable name: {key}"));
            }

            let len = value.chars().count();
            if len > MAX_ENV_VALUE_CHARS {
                result.add_warning(format!(
                    "Environment variable '{key}' has a very long value ({len} characters)"
                ));
            }
        }

        result
    }

    fn resolve_on_path(&self, executable: &str) -> Option<PathBuf> {
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"))?;
        let extensions = executable_extensions();

        for dir in env::split_paths(&search_path) {
            let candidate = dir.join(executable);
            if self.fs.is_file(&candidate) {
                return Some(candidate);
            }

            for ext in &extensions {
                let mut with_ext = candidate.clone().into_os_string();
                with_ext.push(ext);
                let with_ext = PathBuf::from(with_ext);
                if self.fs.is_file(&with_ext) {
                    return Some(with_ext);
                }
            }
        }

        None
    }
}

/// Extra suffixes tried during `PATH` lookup (Windows only).
fn executable_extensions() -> Vec<String> {
    if !cfg!(windows) {
        return Vec::new();
    }

    env::var("PATHEXT")
        .ok()
        .map(|s| {
            s.split(';')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|exts| !exts.is_empty())
        .unwrap_or_else(|| vec![".exe".into(), ".bat".into(), ".cmd".into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn mock_validator() -> (MockFileSystem, Validator) {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");
        fs.add_file("/usr/bin/echo", b"binary");
        let validator = Validator::new(Arc::new(fs.clone())).with_search_path("/usr/bin");
        (fs, validator)
    }

    fn echo_command() -> CommandSpec {
        let mut cmd = CommandSpec::new("c1", "Echo", "echo");
        cmd.arguments = "hello".into();
        cmd
    }

    #[test]
    fn valid_command_has_no_errors_and_records_resolved_path() {
        let (_fs, validator) = mock_validator();
        let result = validator.check(&echo_command(), Path::new("/work"));

        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
        assert_eq!(
            result.data.get(RESOLVED_PATH_KEY).map(String::as_str),
            Some("/usr/bin/echo")
        );
    }

    #[test]
    fn errors_are_accumulated_not_short_circuited() {
        let (_fs, validator) = mock_validator();
        let mut cmd = CommandSpec::new("c1", "", "");
        cmd.environment.insert("BAD-NAME".into(), "x".into());

        let result = validator.check(&cmd, Path::new("/missing"));

        assert_eq!(
            result.errors,
            vec![
                "Command name is required".to_string(),
                "Executable is required".to_string(),
                "Working directory does not exist: /missing".to_string(),
                "Invalid environment variable name: BAD-NAME".to_string(),
            ]
        );
    }

    #[test]
    fn read_only_working_directory_is_rejected_with_path() {
        let (fs, validator) = mock_validator();
        fs.set_read_only("/work");

        let result = validator.check_working_directory(Path::new("/work"));

        assert!(!result.is_valid());
        assert!(result.errors[0].starts_with("Working directory is not writable: /work"));
    }

    #[test]
    fn probe_file_is_cleaned_up() {
        let (fs, validator) = mock_validator();
        let result = validator.check_working_directory(Path::new("/work"));

        assert!(result.is_valid());
        assert!(fs.read_dir(Path::new("/work")).unwrap().is_empty());
    }

    #[test]
    fn empty_working_directory_is_required() {
        let (_fs, validator) = mock_validator();
        let result = validator.check_working_directory(Path::new(""));
        assert_eq!(result.errors, vec!["Working directory is required".to_string()]);
    }

    #[test]
    fn absolute_executable_must_exist() {
        let (_fs, validator) = mock_validator();

        assert!(validator.check_executable("/usr/bin/echo").is_valid());

        let missing = validator.check_executable("/opt/nope");
        assert_eq!(missing.errors, vec!["Executable not found: /opt/nope".to_string()]);
    }

    #[test]
    fn unresolved_executable_names_the_executable() {
        let (_fs, validator) = mock_validator();
        let result = validator.check_executable("definitely-not-here");
        assert_eq!(
            result.errors,
            vec!["Executable not found in PATH: definitely-not-here".to_string()]
        );
    }

    #[test]
    fn environment_key_rules() {
        let (_fs, validator) = mock_validator();
        let mut env = BTreeMap::new();
        env.insert(String::new(), "v".into());
        env.insert("GOOD_NAME_1".into(), "v".into());
        env.insert("has space".into(), "v".into());

        let result = validator.check_environment(&env);

        assert_eq!(
            result.errors,
            vec![
                "Environment variable key cannot be empty".to_string(),
                "Invalid environment variable name: has space".to_string(),
            ]
        );
    }

    #[test]
    fn long_values_and_many_variables_only_warn() {
        let (_fs, validator) = mock_validator();
        let mut cmd = echo_command();
        cmd.environment.insert("LONG_VAR".into(), "x".repeat(10_001));
        for i in 0..20 {
            cmd.environment.insert(format!("VAR_{i}"), "v".into());
        }

        let result = validator.check(&cmd, Path::new("/work"));

        assert!(result.is_valid());
        assert!(result.warnings.contains(
            &"Environment variable 'LONG_VAR' has a very long value (10001 characters)".to_string()
        ));
        assert!(result
            .warnings
            .contains(&"Large number of environment variables may impact performance".to_string()));
    }

    #[test]
    fn iteration_without_arguments_warns() {
        let (_fs, validator) = mock_validator();
        let mut cmd = echo_command();
        cmd.arguments = "   ".into();
        cmd.iteration_enabled = true;

        let result = validator.check(&cmd, Path::new("/work"));

        assert!(result.is_valid());
        assert_eq!(
            result.warnings,
            vec![
                "Iteration enabled but no arguments provided - command will run with default parameters"
                    .to_string()
            ]
        );
    }
}
