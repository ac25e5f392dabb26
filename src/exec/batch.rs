// src/exec/batch.rs

//! Running several commands against one working directory.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::exec::cancel::CancelSignal;
use crate::exec::process::ProcessExecutor;
use crate::types::{CommandSpec, ExecutionResult};

impl ProcessExecutor {
    /// Run `commands` one after another, in order.
    ///
    /// Stops before starting the next command once `cancel` is signalled.
    /// Each result is also sent to `results` when a sink is given.
    pub async fn execute_sequential(
        &self,
        commands: &[CommandSpec],
        working_dir: &Path,
        cancel: &CancelSignal,
        results: Option<mpsc::UnboundedSender<ExecutionResult>>,
    ) -> Vec<ExecutionResult> {
        let mut collected = Vec::with_capacity(commands.len());

        for command in commands {
            if cancel.is_cancelled() {
                info!(
                    remaining = commands.len() - collected.len(),
                    "sequential batch cancelled"
                );
                break;
            }

            let result = self.execute(command, working_dir, cancel).await;
            if let Some(tx) = &results {
                let _ = tx.send(result.clone());
            }
            collected.push(result);
        }

        collected
    }

    /// Run `commands` concurrently, at most `max_parallelism` at a time.
    ///
    /// Results come back in completion order. Commands still waiting for a
    /// slot when `cancel` fires produce no result.
    pub async fn execute_parallel(
        &self,
        commands: Vec<CommandSpec>,
        working_dir: &Path,
        max_parallelism: usize,
        cancel: &CancelSignal,
        results: Option<mpsc::UnboundedSender<ExecutionResult>>,
    ) -> Vec<ExecutionResult> {
        let total = commands.len();
        let slots = Arc::new(Semaphore::new(max_parallelism.max(1)));
        let mut tasks = JoinSet::new();

        for command in commands {
            let executor = self.clone();
            let working_dir = working_dir.to_path_buf();
            let cancel = cancel.clone();
            let slots = Arc::clone(&slots);
            let results = results.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    permit = slots.acquire_owned() => permit.ok()?,
                    () = cancel.cancelled() => {
                        debug!(command = %command.name, "cancelled while waiting for a slot");
                        return None;
                    }
                };
                if cancel.is_cancelled() {
                    return None;
                }

                let result = executor.execute(&command, &working_dir, &cancel).await;
                drop(permit);

                if let Some(tx) = &results {
                    let _ = tx.send(result.clone());
                }
                Some(result)
            });
        }

        let mut collected = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(result)) => collected.push(result),
                Ok(None) => {}
                Err(e) => error!(error = %e, "parallel command task failed"),
            }
        }

        info!(
            total,
            completed = collected.len(),
            max_parallelism,
            "parallel batch finished"
        );
        collected
    }
}
