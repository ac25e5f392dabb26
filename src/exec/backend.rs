// src/exec/backend.rs

//! Pluggable command runner.
//!
//! The iteration coordinator talks to a `CommandRunner` instead of a
//! concrete [`ProcessExecutor`], so tests can script outcomes per directory
//! without spawning processes.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::exec::cancel::CancelSignal;
use crate::exec::process::ProcessExecutor;
use crate::types::{CommandSpec, ExecutionResult};

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>>;

/// Runs one command in one directory.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        working_dir: &'a Path,
        cancel: &'a CancelSignal,
    ) -> RunFuture<'a>;
}

impl CommandRunner for ProcessExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        working_dir: &'a Path,
        cancel: &'a CancelSignal,
    ) -> RunFuture<'a> {
        Box::pin(self.execute(command, working_dir, cancel))
    }
}
