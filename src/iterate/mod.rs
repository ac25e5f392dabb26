// src/iterate/mod.rs

//! Replaying one command across a directory tree.
//!
//! - [`scanner`] discovers target directories.
//! - [`state`] is the pure counting and failure-policy core.
//! - [`coordinator`] drives discovery and the per-item loop.
//! - [`progress`] holds the snapshot types and the sink trait.

pub mod coordinator;
pub mod options;
pub mod progress;
pub mod scanner;
pub mod state;

pub use coordinator::IterationCoordinator;
pub use options::{validate_iteration_options, IterationOptions};
pub use progress::{ItemResult, IterationProgress, NoProgress, ProgressSink};
pub use scanner::{DirectoryScanner, ScanReport, SkippedDirectory};
pub use state::{ItemDecision, IterationPhase, IterationState};
