#![allow(dead_code)]

pub use cmdrun_test_utils::{builders, init_tracing, with_timeout, ScriptedRunner};

use std::path::{Path, PathBuf};

/// Create `rel` (and parents) under `root`, returning the full path.
pub fn mkdirs(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(&path).expect("create test directory");
    path
}
