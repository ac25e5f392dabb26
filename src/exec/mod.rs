// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invocation`] turns a `CommandSpec` into a `tokio::process::Command`.
//! - [`process`] owns `ProcessExecutor`, which validates, spawns, captures
//!   output and handles cancellation and timeouts for a single process.
//! - [`batch`] adds sequential and bounded-parallel runs of many commands.
//! - [`backend`] provides the `CommandRunner` trait that the iteration
//!   coordinator uses, and which tests replace with a scripted runner.
//! - [`cancel`] is the shared cancellation signal.

pub mod backend;
pub mod batch;
pub mod cancel;
pub mod invocation;
pub mod process;

pub use backend::{CommandRunner, RunFuture};
pub use cancel::CancelSignal;
pub use invocation::{split_arguments, Invocation};
pub use process::ProcessExecutor;
