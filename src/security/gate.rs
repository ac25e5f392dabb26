// src/security/gate.rs

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::security::policy::SecurityPolicy;
use crate::types::{CommandSpec, SecurityAssessment};

/// Characters that let an argument string escape into shell syntax.
pub const SHELL_METACHARACTERS: [char; 7] = [';', '&', '|', '`', '$', '(', ')'];

const TRAVERSAL_TOKENS: [&str; 2] = ["../", "..\\"];

/// Policy engine for command safety.
///
/// The policy is held behind an `Arc` and replaced wholesale by
/// [`SecurityGate::set_policy`]; readers take a snapshot and never observe
/// a half-updated policy.
#[derive(Debug, Default)]
pub struct SecurityGate {
    policy: RwLock<Arc<SecurityPolicy>>,
}

impl SecurityGate {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> Arc<SecurityPolicy> {
        let guard = self.policy.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the whole policy.
    pub fn set_policy(&self, policy: SecurityPolicy) {
        let mut guard = self.policy.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(policy);
        debug!("security policy replaced");
    }

    /// True if the executable, the arguments, or `"<executable> <arguments>"`
    /// contain any dangerous pattern (case-insensitive).
    pub fn is_dangerous(&self, command: &CommandSpec) -> bool {
        let policy = self.policy();
        matches_dangerous_pattern(&policy, command)
    }

    pub fn requires_confirmation(&self, command: &CommandSpec) -> bool {
        if command.require_confirmation {
            return true;
        }

        let policy = self.policy();
        policy.require_confirmation_for_dangerous && matches_dangerous_pattern(&policy, command)
    }

    /// Hard-fails on blocked executables, shell metacharacters or path
    /// traversal in the arguments, and dangerous executables.
    pub fn validate_security(&self, command: &CommandSpec) -> SecurityAssessment {
        let policy = self.policy();
        let mut result = SecurityAssessment::success();
        let executable = command.executable.trim();

        if policy
            .blocked_commands
            .iter()
            .any(|blocked| blocked.trim().eq_ignore_ascii_case(executable))
        {
            result.add_error(format!(
                "Command '{}' is blocked for security reasons",
                command.executable
            ));
        }

        if !command.arguments.trim().is_empty() {
            if command.arguments.contains(SHELL_METACHARACTERS) {
                result.add_error("Command arguments contain potentially dangerous characters");
            }

            if contains_traversal(&command.arguments) {
                result.add_error("Command arguments contain path traversal patterns");
            }
        }

        if !executable.is_empty() && contains_any_pattern(&policy, executable) {
            result.add_error(format!(
                "Executable '{}' contains dangerous patterns",
                command.executable
            ));
        }

        if policy.sandbox_execution {
            result.add_warning(
                "Sandboxed execution is requested but not enforced; the process runs with the caller's privileges",
            );
        }

        if policy.log_command_executions {
            info!(
                command = %command.name,
                executable = %command.executable,
                valid = result.is_valid(),
                errors = ?result.errors,
                "security assessment"
            );
        }

        result
    }

    pub fn sanitize_arguments(&self, arguments: &str) -> String {
        sanitize_arguments(arguments)
    }
}

fn matches_dangerous_pattern(policy: &SecurityPolicy, command: &CommandSpec) -> bool {
    contains_any_pattern(policy, &command.executable)
        || contains_any_pattern(policy, &command.arguments)
        || contains_any_pattern(policy, &command.command_line())
}

fn contains_any_pattern(policy: &SecurityPolicy, haystack: &str) -> bool {
    let haystack = haystack.to_lowercase();
    policy
        .dangerous_patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .any(|p| haystack.contains(&p.to_lowercase()))
}

fn contains_traversal(text: &str) -> bool {
    TRAVERSAL_TOKENS.iter().any(|t| text.contains(t))
}

/// Best-effort scrubbing of an argument string.
///
/// Strips shell metacharacters and `../` / `..\` sequences and turns
/// backslashes into forward slashes. Traversal removal repeats until none
/// remain, so applying this twice gives the same result as applying it once.
///
/// This is not a security boundary; pair it with
/// [`SecurityGate::validate_security`].
pub fn sanitize_arguments(arguments: &str) -> String {
    if arguments.trim().is_empty() {
        return arguments.to_string();
    }

    let mut sanitized: String = arguments
        .chars()
        .filter(|c| !SHELL_METACHARACTERS.contains(c))
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    while sanitized.contains("../") {
        sanitized = sanitized.replace("../", "");
    }

    sanitized.trim().to_string()
}
