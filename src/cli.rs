// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::iterate::IterationOptions;

/// Command-line arguments for `cmdrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdrun",
    version,
    about = "Run named commands from profiles, once or across a directory tree.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Cmdrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run a command once.
    Run {
        profile: String,
        command: String,

        /// Working directory; defaults to the command's configured one.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Confirm commands that require confirmation.
        #[arg(long)]
        yes: bool,

        /// Print output lines as they arrive instead of at the end.
        #[arg(long)]
        stream: bool,
    },

    /// Run a command in every matching directory under a root.
    Iterate {
        profile: String,
        command: String,

        /// Root directory; defaults to the command's working directory.
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Confirm commands that require confirmation.
        #[arg(long)]
        yes: bool,

        #[command(flatten)]
        scan: ScanArgs,

        /// Abort the remaining directories after the first failure.
        #[arg(long)]
        stop_on_first_failure: bool,

        /// Do not skip past failures (needed for --stop-on-first-failure).
        #[arg(long)]
        no_skip_errors: bool,
    },

    /// Check a command without running it.
    Validate {
        profile: String,
        command: String,

        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// List the directories an iterative run would visit.
    Targets {
        root: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,
    },

    /// List configured profiles and commands.
    List,

    /// Print an argument string with shell metacharacters and traversal removed.
    Sanitize {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}

/// Discovery options shared by `iterate` and `targets`.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// How many levels below the root to descend.
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub max_depth: usize,

    /// Only directories whose name or relative path contains this.
    #[arg(long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Skip directories whose name or relative path contains this.
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Treat the root itself as a target.
    #[arg(long)]
    pub include_root: bool,
}

impl ScanArgs {
    pub fn to_options(&self) -> IterationOptions {
        IterationOptions {
            max_depth: self.max_depth,
            include_patterns: self.include.clone(),
            exclude_patterns: self.exclude.clone(),
            include_root_directory: self.include_root,
            ..IterationOptions::default()
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
