// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod iterate;
pub mod logging;
pub mod security;
pub mod types;
pub mod validation;

use std::path::Path;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, CliCommand};
use crate::config::{CommandLookup, ConfigFile, ProfileStore};
use crate::engine::Engine;
use crate::errors::CmdrunError;
use crate::exec::CancelSignal;
use crate::iterate::{IterationOptions, IterationProgress};
use crate::security::sanitize_arguments;
use crate::types::{CommandSpec, ExecutionResult, OutputLine, ValidationResult};

const STREAM_CHANNEL_CAPACITY: usize = 256;

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(false)` when the requested work ran but did not succeed
/// (failed process, failed items, invalid command), so the binary can exit
/// non-zero without printing an error chain.
pub async fn run(args: CliArgs, config: ConfigFile) -> Result<bool> {
    let engine = Engine::new(config.security().clone());
    let store = ProfileStore::new(config);

    // Ctrl-C → cancel whatever is running.
    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling");
            cancel.cancel();
        });
    }

    match args.command {
        CliCommand::Run {
            profile,
            command,
            dir,
            yes,
            stream,
        } => {
            let spec = store.lookup(&profile, &command)?;
            let dir = dir.unwrap_or_else(|| spec.working_directory.clone());
            ensure_secure(&engine, &spec)?;

            let result = if stream {
                run_streaming(&engine, &spec, &dir, yes, &cancel).await?
            } else {
                let result = engine.execute_confirmed(&spec, &dir, yes, &cancel).await?;
                print_output(&result);
                result
            };

            print_execution_summary(&result);
            Ok(result.was_successful())
        }

        CliCommand::Iterate {
            profile,
            command,
            root,
            yes,
            scan,
            stop_on_first_failure,
            no_skip_errors,
        } => {
            let spec = store.lookup(&profile, &command)?;
            let root = root.unwrap_or_else(|| spec.working_directory.clone());
            ensure_secure(&engine, &spec)?;

            let options = IterationOptions {
                skip_errors: !no_skip_errors,
                stop_on_first_failure,
                ..scan.to_options()
            };

            let (tx, mut rx) = mpsc::unbounded_channel::<IterationProgress>();
            let printer = tokio::spawn(async move {
                let mut printed = 0;
                while let Some(snapshot) = rx.recv().await {
                    printed = print_new_items(&snapshot, printed);
                }
            });

            let progress = engine
                .execute_iteratively_confirmed(&spec, &root, &options, yes, &tx, &cancel)
                .await?;
            drop(tx);
            let _ = printer.await;

            print_iteration_summary(&progress);
            Ok(progress.is_completed && progress.failed_items == 0)
        }

        CliCommand::Validate {
            profile,
            command,
            dir,
        } => {
            let spec = store.lookup(&profile, &command)?;
            let dir = dir.unwrap_or_else(|| spec.working_directory.clone());

            let validation = engine.validate_command(&spec, &dir).await;
            print_diagnostics("validation", &validation);

            let security = engine.validate_security(&spec);
            print_diagnostics("security", &security);

            println!(
                "requires confirmation: {}",
                if engine.requires_confirmation(&spec) { "yes" } else { "no" }
            );
            Ok(validation.is_valid() && security.is_valid())
        }

        CliCommand::Targets { root, scan } => {
            let report = engine
                .scanner()
                .scan(&root, &scan.to_options(), &cancel)
                .await?;
            for target in &report.targets {
                println!("{}", target.display());
            }
            for skipped in &report.skipped {
                eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
            }
            Ok(true)
        }

        CliCommand::List => {
            print_profiles(&store);
            Ok(true)
        }

        CliCommand::Sanitize { text } => {
            println!("{}", sanitize_arguments(&text));
            Ok(true)
        }
    }
}

/// Refuse to run anything the security gate rejects; print its warnings.
fn ensure_secure(engine: &Engine, spec: &CommandSpec) -> std::result::Result<(), CmdrunError> {
    let assessment = engine.validate_security(spec);
    for warning in &assessment.warnings {
        eprintln!("warning: {warning}");
    }
    if !assessment.is_valid() {
        return Err(CmdrunError::SecurityViolation(assessment.errors));
    }
    Ok(())
}

async fn run_streaming(
    engine: &Engine,
    spec: &CommandSpec,
    dir: &Path,
    confirmed: bool,
    cancel: &CancelSignal,
) -> std::result::Result<ExecutionResult, CmdrunError> {
    if !confirmed && engine.requires_confirmation(spec) {
        return Err(CmdrunError::ConfirmationRequired(spec.name.clone()));
    }

    let (tx, mut rx) = mpsc::channel::<OutputLine>(STREAM_CHANNEL_CAPACITY);
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            match line {
                OutputLine::Stdout(_) => println!("{}", line.text()),
                OutputLine::Stderr(_) => eprintln!("{}", line.text()),
            }
        }
    });

    let result = engine.execute_streaming(spec, dir, cancel, tx).await;
    let _ = printer.await;
    Ok(result)
}

fn print_output(result: &ExecutionResult) {
    if !result.standard_output.is_empty() {
        print!("{}", result.standard_output);
    }
    if !result.standard_error.is_empty() {
        eprint!("{}", result.standard_error);
    }
}

fn print_execution_summary(result: &ExecutionResult) {
    for error in &result.execution_errors {
        eprintln!("error: {error}");
    }

    let status = if result.was_cancelled {
        "cancelled"
    } else if result.was_successful() {
        "ok"
    } else {
        "failed"
    };

    eprintln!(
        "{} {} (exit code {}, {:.2}s) in {}",
        result.command_name,
        status,
        result.exit_code,
        result.execution_time.as_secs_f64(),
        result.working_directory.display()
    );
}

/// Print item results not yet printed; returns the new printed count.
fn print_new_items(progress: &IterationProgress, already_printed: usize) -> usize {
    for (index, item) in progress.item_results.iter().enumerate().skip(already_printed) {
        let status = if item.was_successful { "ok" } else { "FAILED" };
        println!(
            "[{}/{}] {} {}",
            index + 1,
            progress.total_items,
            status,
            item.path.display()
        );
        if let Some(message) = &item.error_message {
            for line in message.lines() {
                println!("    {line}");
            }
        }
    }
    progress.item_results.len()
}

fn print_iteration_summary(progress: &IterationProgress) {
    for skipped in &progress.inaccessible_directories {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    eprintln!(
        "{}: {} total, {} succeeded, {} failed, {} skipped ({:.1}%, {:.2}s)",
        progress.status_message(),
        progress.total_items,
        progress.successful_items,
        progress.failed_items,
        progress.skipped_items,
        progress.progress_percentage(),
        progress.elapsed().as_secs_f64()
    );
}

fn print_diagnostics(label: &str, result: &ValidationResult) {
    println!("{label}: {}", if result.is_valid() { "ok" } else { "failed" });
    for error in &result.errors {
        println!("  error: {error}");
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    for (key, value) in &result.data {
        println!("  {key}: {value}");
    }
}

fn print_profiles(store: &ProfileStore) {
    let mut any = false;
    for (id, profile) in store.profiles() {
        any = true;
        println!("{id} ({})", profile.display_name(id));
        if let Some(description) = &profile.description {
            println!("  {description}");
        }
        for (command_id, command) in &profile.command {
            let spec = command.to_spec(command_id);
            let mut flags = Vec::new();
            if spec.iteration_enabled {
                flags.push("iterative");
            }
            if spec.require_confirmation {
                flags.push("confirm");
            }
            println!(
                "  - {command_id}: {}{}",
                spec.command_line(),
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }
    }

    if !any {
        println!("no profiles configured");
    }
    debug!("listed profiles");
}
