// src/exec/process.rs

//! Single-process execution with output capture, cancellation and timeout.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::exec::cancel::CancelSignal;
use crate::exec::invocation::Invocation;
use crate::types::{CommandSpec, ExecutionResult, OutputLine};
use crate::validation::Validator;

/// How long to wait for the output readers after the process is gone.
///
/// A grandchild that inherited the pipes can keep them open indefinitely;
/// whatever was captured by then is returned.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// Runs one command as a child process and reports an [`ExecutionResult`].
///
/// Every failure (validation, spawn, wait, kill, timeout) is reported inside
/// the result; `execute` never returns an error.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    validator: Validator,
    timeout: Option<Duration>,
}

enum Outcome {
    Exited(i32),
    Cancelled,
    TimedOut(Duration),
}

impl ProcessExecutor {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            timeout: None,
        }
    }

    /// Kill processes that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn execute(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
    ) -> ExecutionResult {
        self.run(command, working_dir, cancel, None).await
    }

    /// Like [`ProcessExecutor::execute`], but every output line is also sent
    /// to `lines` as it is read.
    ///
    /// The channel is bounded, so a receiver that stops draining it will
    /// eventually stall the child on a full pipe. The sender is dropped
    /// before the result is returned.
    pub async fn execute_streaming(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
        lines: mpsc::Sender<OutputLine>,
    ) -> ExecutionResult {
        self.run(command, working_dir, cancel, Some(lines)).await
    }

    async fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
        lines: Option<mpsc::Sender<OutputLine>>,
    ) -> ExecutionResult {
        let validation = self.validator.validate(command, working_dir).await;
        let started_at = Utc::now();

        let mut result = ExecutionResult {
            command_id: command.id.clone(),
            command_name: command.name.clone(),
            exit_code: -1,
            standard_output: String::new(),
            standard_error: String::new(),
            execution_time: Duration::ZERO,
            started_at,
            completed_at: started_at,
            was_cancelled: false,
            working_directory: working_dir.to_path_buf(),
            environment: command.environment.clone(),
            execution_errors: Vec::new(),
        };

        if !validation.is_valid() {
            warn!(
                command = %command.name,
                dir = %working_dir.display(),
                errors = ?validation.errors,
                "command failed validation; not starting process"
            );
            result.execution_errors = validation.errors;
            return result;
        }

        if cancel.is_cancelled() {
            debug!(command = %command.name, "cancelled before start");
            result.was_cancelled = true;
            return result;
        }

        let clock = Instant::now();
        if let Err(err) = self
            .run_process(command, working_dir, cancel, lines, &mut result)
            .await
        {
            error!(
                command = %command.name,
                dir = %working_dir.display(),
                error = %format!("{err:#}"),
                "command execution error"
            );
            result.exit_code = -1;
            result
                .execution_errors
                .push(format!("Execution failed: {err:#}"));
        }

        result.execution_time = clock.elapsed();
        result.completed_at = Utc::now();
        result
    }

    async fn run_process(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        cancel: &CancelSignal,
        lines: Option<mpsc::Sender<OutputLine>>,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        let invocation = Invocation::for_command(command);
        info!(
            command = %command.name,
            program = %invocation.program,
            args = ?invocation.args,
            dir = %working_dir.display(),
            "starting process"
        );

        let mut child = invocation
            .to_command(command, working_dir)
            .spawn()
            .with_context(|| format!("spawning '{}'", invocation.program))?;

        let stdout = Capture::spawn(child.stdout.take(), "stdout", lines.clone(), OutputLine::Stdout);
        let stderr = Capture::spawn(child.stderr.take(), "stderr", lines, OutputLine::Stderr);

        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => {
                let status = status
                    .with_context(|| format!("waiting for '{}'", invocation.program))?;
                Outcome::Exited(status.code().unwrap_or(-1))
            }
            () = cancel.cancelled() => Outcome::Cancelled,
            limit = deadline => Outcome::TimedOut(limit),
        };

        match outcome {
            Outcome::Exited(code) => {
                result.exit_code = code;
                info!(command = %command.name, exit_code = code, "process exited");
            }
            Outcome::Cancelled => {
                info!(command = %command.name, "cancellation requested; killing process");
                result.was_cancelled = true;
                stop(&mut child, command, result).await;
            }
            Outcome::TimedOut(limit) => {
                warn!(
                    command = %command.name,
                    limit_secs = limit.as_secs(),
                    "process timed out; killing"
                );
                result
                    .execution_errors
                    .push(format!("Execution timed out after {}s", limit.as_secs()));
                stop(&mut child, command, result).await;
            }
        }

        let stdout = stdout.finish(&command.name).await;
        let stderr = stderr.finish(&command.name).await;
        result.standard_output = stdout.text;
        result.standard_error = stderr.text;
        result.execution_errors.extend(stdout.errors);
        result.execution_errors.extend(stderr.errors);

        Ok(())
    }
}

async fn stop(child: &mut Child, command: &CommandSpec, result: &mut ExecutionResult) {
    result.exit_code = -1;
    if let Err(e) = child.kill().await {
        warn!(
            command = %command.name,
            error = %e,
            "failed to kill child process"
        );
        result
            .execution_errors
            .push(format!("Failed to cancel process: {e}"));
    }
}

/// Consecutive read errors tolerated on one pipe before the reader gives up.
const MAX_READ_ERRORS: usize = 3;

#[derive(Default)]
struct Captured {
    text: String,
    errors: Vec<String>,
}

/// Background reader for one output pipe.
///
/// Reads raw lines and decodes them lossily, so a child writing bytes that
/// are not UTF-8 keeps its output and its pipe.
struct Capture {
    buffer: Arc<Mutex<Captured>>,
    handle: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(
        reader: Option<R>,
        stream: &'static str,
        lines: Option<mpsc::Sender<OutputLine>>,
        wrap: fn(String) -> OutputLine,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let sink = Arc::clone(&buffer);

        let handle = tokio::spawn(async move {
            let Some(reader) = reader else {
                return;
            };
            let mut reader = BufReader::new(reader);
            let mut raw = Vec::new();
            let mut failures = 0;

            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw).await {
                    Ok(0) => break,
                    Ok(_) => {
                        failures = 0;
                        let line = decode_line(&raw);
                        {
                            let mut captured = sink.lock().unwrap_or_else(PoisonError::into_inner);
                            captured.text.push_str(&line);
                            captured.text.push('\n');
                        }
                        if let Some(tx) = &lines {
                            let _ = tx.send(wrap(line)).await;
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(stream, error = %e, "error reading process output");
                        sink.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .errors
                            .push(format!("Failed to read {stream}: {e}"));
                        if failures >= MAX_READ_ERRORS {
                            break;
                        }
                    }
                }
            }
        });

        Self { buffer, handle }
    }

    async fn finish(mut self, command: &str) -> Captured {
        if tokio::time::timeout(CAPTURE_GRACE, &mut self.handle)
            .await
            .is_err()
        {
            warn!(
                command = %command,
                "output pipe still open after process exit; returning partial output"
            );
            self.handle.abort();
        }

        let mut captured = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *captured)
    }
}

/// One raw line without its `\n` or `\r\n` terminator, decoded lossily.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_strips_terminators_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"plain\n"), "plain");
        assert_eq!(decode_line(b"crlf\r\n"), "crlf");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn capture_keeps_reading_past_invalid_utf8() {
        let input: &[u8] = b"\xff\xfe\nafter\n";
        let capture = Capture::spawn(Some(input), "stdout", None, OutputLine::Stdout);

        let captured = capture.finish("test").await;

        assert_eq!(captured.text, "\u{FFFD}\u{FFFD}\nafter\n");
        assert!(captured.errors.is_empty());
    }
}
