// src/iterate/scanner.rs

//! Directory discovery for iterative runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::errors::{CmdrunError, Result};
use crate::exec::CancelSignal;
use crate::fs::{FileSystem, RealFileSystem};
use crate::iterate::options::IterationOptions;

/// A directory the scan could not list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDirectory {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a scan produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Directories to visit, parents before their children.
    pub targets: Vec<PathBuf>,
    /// Directories whose listing failed; their subtrees were not explored.
    pub skipped: Vec<SkippedDirectory>,
}

/// Finds the directories an iterative run should visit.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    fs: Arc<dyn FileSystem>,
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl DirectoryScanner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Ordered target list; see [`DirectoryScanner::scan`].
    pub async fn find_targets(
        &self,
        root: &Path,
        options: &IterationOptions,
        cancel: &CancelSignal,
    ) -> Result<Vec<PathBuf>> {
        Ok(self.scan(root, options, cancel).await?.targets)
    }

    /// Walk `root` on the blocking pool.
    pub async fn scan(
        &self,
        root: &Path,
        options: &IterationOptions,
        cancel: &CancelSignal,
    ) -> Result<ScanReport> {
        let scanner = self.clone();
        let root = root.to_path_buf();
        let options = options.clone();
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || scanner.scan_blocking(&root, &options, &cancel))
            .await
            .map_err(|e| CmdrunError::Other(anyhow!("directory scan task failed: {e}")))?
    }

    /// Depth-first pre-order walk.
    ///
    /// The root comes first when `include_root_directory` is set. Children of
    /// a directory are visited in name order, each followed by its own
    /// subtree, down to `max_depth` levels below the root. A child that fails
    /// the include/exclude filters is dropped together with its subtree.
    /// Unlistable directories are recorded and skipped, and a cancelled scan
    /// returns what it found so far.
    pub fn scan_blocking(
        &self,
        root: &Path,
        options: &IterationOptions,
        cancel: &CancelSignal,
    ) -> Result<ScanReport> {
        if !self.fs.is_dir(root) {
            return Err(CmdrunError::RootNotFound(root.to_path_buf()));
        }

        let mut report = ScanReport::default();
        if options.include_root_directory {
            report.targets.push(root.to_path_buf());
        }

        self.visit(root, 0, options, cancel, &mut report);

        info!(
            root = %root.display(),
            targets = report.targets.len(),
            skipped = report.skipped.len(),
            cancelled = cancel.is_cancelled(),
            "directory scan finished"
        );

        Ok(report)
    }

    fn visit(
        &self,
        dir: &Path,
        depth: usize,
        options: &IterationOptions,
        cancel: &CancelSignal,
        report: &mut ScanReport,
    ) {
        if depth >= options.max_depth || cancel.is_cancelled() {
            return;
        }

        let mut children: Vec<PathBuf> = match self.fs.read_dir(dir) {
            Ok(entries) => entries.into_iter().filter(|p| self.fs.is_dir(p)).collect(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %format!("{e:#}"), "cannot list directory; skipping");
                report.skipped.push(SkippedDirectory {
                    path: dir.to_path_buf(),
                    reason: format!("{e:#}"),
                });
                return;
            }
        };
        children.sort();

        for child in children {
            if cancel.is_cancelled() {
                debug!(dir = %dir.display(), "scan cancelled");
                return;
            }

            let name = child
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative = relative_str(dir, &child);

            if !options.admits(&name, &relative) {
                debug!(dir = %child.display(), "filtered out");
                continue;
            }

            report.targets.push(child.clone());
            self.visit(&child, depth + 1, options, cancel, report);
        }
    }
}

/// `child` relative to `parent`, with `/` separators.
fn relative_str(parent: &Path, child: &Path) -> String {
    child
        .strip_prefix(parent)
        .unwrap_or(child)
        .to_string_lossy()
        .replace('\\', "/")
}
