// src/engine.rs

//! The surface callers drive: validation, security checks, single runs and
//! iterative runs behind one handle.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{CmdrunError, Result};
use crate::exec::{CancelSignal, ProcessExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::iterate::{
    DirectoryScanner, IterationCoordinator, IterationOptions, IterationProgress, ProgressSink,
};
use crate::security::{SecurityGate, SecurityPolicy};
use crate::types::{CommandSpec, ExecutionResult, OutputLine, SecurityAssessment, ValidationResult};
use crate::validation::Validator;

/// Command execution and iteration engine.
///
/// The process time limit is read from the current security policy on every
/// run, so [`SecurityGate::set_policy`] takes effect for the next execution.
#[derive(Debug)]
pub struct Engine {
    gate: Arc<SecurityGate>,
    validator: Validator,
    scanner: DirectoryScanner,
}

impl Engine {
    /// Engine over the real filesystem.
    pub fn new(policy: SecurityPolicy) -> Self {
        Self::with_file_system(policy, Arc::new(RealFileSystem))
    }

    pub fn with_file_system(policy: SecurityPolicy, fs: Arc<dyn FileSystem>) -> Self {
        Self::from_parts(
            Arc::new(SecurityGate::new(policy)),
            Validator::new(Arc::clone(&fs)),
            DirectoryScanner::new(fs),
        )
    }

    pub fn from_parts(gate: Arc<SecurityGate>, validator: Validator, scanner: DirectoryScanner) -> Self {
        Self {
            gate,
            validator,
            scanner,
        }
    }

    pub fn security(&self) -> &SecurityGate {
        &self.gate
    }

    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// Executor configured with the current policy's time limit.
    pub fn executor(&self) -> ProcessExecutor {
        ProcessExecutor::new(self.validator.clone())
            .with_timeout(self.gate.policy().max_execution_time())
    }

    pub async fn validate_command(&self, command: &CommandSpec, working_dir: &Path) -> ValidationResult {
        self.validator.validate(command, working_dir).await
    }

    pub fn requires_confirmation(&self, command: &CommandSpec) -> bool {
        self.gate.requires_confirmation(command)
    }

    pub fn validate_security(&self, command: &CommandSpec) -> SecurityAssessment {
        self.gate.validate_security(command)
    }

    pub fn validate_options(&self, root: &Path, options: &IterationOptions) -> ValidationResult {
        crate::iterate::validate_iteration_options(self.scanner.file_system(), root, options)
    }

    pub async fn execute(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
    ) -> ExecutionResult {
        self.executor().execute(command, working_dir, cancel).await
    }

    pub async fn execute_streaming(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
        lines: tokio::sync::mpsc::Sender<OutputLine>,
    ) -> ExecutionResult {
        self.executor()
            .execute_streaming(command, working_dir, cancel, lines)
            .await
    }

    pub async fn execute_iteratively(
        &self,
        command: &CommandSpec,
        root: &Path,
        options: &IterationOptions,
        sink: &dyn ProgressSink,
        cancel: &CancelSignal,
    ) -> IterationProgress {
        let coordinator = IterationCoordinator::new(Arc::new(self.executor()), self.scanner.clone());
        coordinator.run(command, root, options, sink, cancel).await
    }

    /// [`Engine::execute`], refused unless confirmed when confirmation is required.
    pub async fn execute_confirmed(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        confirmed: bool,
        cancel: &CancelSignal,
    ) -> Result<ExecutionResult> {
        self.ensure_confirmed(command, confirmed)?;
        Ok(self.execute(command, working_dir, cancel).await)
    }

    /// [`Engine::execute_iteratively`] with the confirmation gate and
    /// up-front option validation.
    pub async fn execute_iteratively_confirmed(
        &self,
        command: &CommandSpec,
        root: &Path,
        options: &IterationOptions,
        confirmed: bool,
        sink: &dyn ProgressSink,
        cancel: &CancelSignal,
    ) -> Result<IterationProgress> {
        self.ensure_confirmed(command, confirmed)?;

        let check = self.validate_options(root, options);
        if !check.is_valid() {
            return Err(CmdrunError::InvalidOptions(check.errors.join("; ")));
        }
        for warning in &check.warnings {
            warn!(command = %command.name, "{warning}");
        }

        Ok(self
            .execute_iteratively(command, root, options, sink, cancel)
            .await)
    }

    fn ensure_confirmed(&self, command: &CommandSpec, confirmed: bool) -> Result<()> {
        if !confirmed && self.requires_confirmation(command) {
            info!(command = %command.name, "confirmation required; refusing to run");
            return Err(CmdrunError::ConfirmationRequired(command.name.clone()));
        }
        Ok(())
    }
}
