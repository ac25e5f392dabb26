// src/iterate/options.rs

use std::path::Path;

use crate::fs::FileSystem;
use crate::types::ValidationResult;

/// Knobs for a multi-directory run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOptions {
    /// Keep going after a failed item.
    pub skip_errors: bool,
    /// Abort on the first failure; only honoured when `skip_errors` is off.
    pub stop_on_first_failure: bool,
    /// Depth limit for discovery; immediate children of the root are depth 1.
    pub max_depth: usize,
    /// A directory must match at least one of these, if any are given.
    pub include_patterns: Vec<String>,
    /// A directory matching any of these is dropped.
    pub exclude_patterns: Vec<String>,
    /// Visit the root itself before its descendants.
    pub include_root_directory: bool,
    /// Validated but not used; items always run one at a time.
    pub max_parallelism: usize,
}

impl Default for IterationOptions {
    fn default() -> Self {
        Self {
            skip_errors: true,
            stop_on_first_failure: false,
            max_depth: 10,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            include_root_directory: false,
            max_parallelism: 1,
        }
    }
}

impl IterationOptions {
    /// Include/exclude filtering by case-sensitive substring.
    ///
    /// A pattern matches when it occurs in either the directory's bare name
    /// or its path relative to the parent being scanned.
    pub fn admits(&self, name: &str, relative: &str) -> bool {
        let matches = |pattern: &String| name.contains(pattern.as_str()) || relative.contains(pattern.as_str());

        if !self.include_patterns.is_empty() && !self.include_patterns.iter().any(matches) {
            return false;
        }

        !self.exclude_patterns.iter().any(matches)
    }

    /// True when a failed item should end the run.
    pub fn stops_on_failure(&self) -> bool {
        !self.skip_errors && self.stop_on_first_failure
    }
}

/// Check a root directory and option set before iterating.
pub fn validate_iteration_options(
    fs: &dyn FileSystem,
    root: &Path,
    options: &IterationOptions,
) -> ValidationResult {
    let mut result = ValidationResult::success();

    if root.as_os_str().is_empty() || root.to_string_lossy().trim().is_empty() {
        result.add_error("Root directory is required");
    } else if !fs.is_dir(root) {
        result.add_error(format!("Root directory does not exist: {}", root.display()));
    }

    if options.max_parallelism < 1 {
        result.add_error("Max parallelism must be at least 1");
    }

    if options.max_depth == 0 && !options.include_root_directory {
        result.add_warning("Max depth is 0 and the root is excluded; nothing will be visited");
    }

    if !options.skip_errors && !options.stop_on_first_failure {
        result.add_warning(
            "skip_errors is off but stop_on_first_failure is not set; failures will not stop the run",
        );
    }

    result
}
