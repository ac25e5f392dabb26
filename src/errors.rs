// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Process-level failures never show up here: `ProcessExecutor::execute`
//! folds them into `ExecutionResult::execution_errors`. These variants cover
//! the conditions a caller is expected to branch on (missing root, unknown
//! profile, refused confirmation, bad config).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Root directory does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Command '{command}' not found in profile '{profile}'")]
    CommandNotFound { profile: String, command: String },

    #[error("Invalid iteration options: {0}")]
    InvalidOptions(String),

    #[error("Command '{0}' requires confirmation before execution")]
    ConfirmationRequired(String),

    #[error("Security violation: {}", .0.join("; "))]
    SecurityViolation(Vec<String>),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CmdrunError>;
