// tests/engine.rs

mod common;
use crate::common::builders::{CommandSpecBuilder, IterationOptionsBuilder};
use crate::common::{init_tracing, mkdirs, with_timeout};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cmdrun::engine::Engine;
use cmdrun::errors::CmdrunError;
use cmdrun::exec::CancelSignal;
use cmdrun::fs::mock::MockFileSystem;
use cmdrun::iterate::NoProgress;
use cmdrun::security::SecurityPolicy;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn dangerous_command_is_refused_without_confirmation() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let victim = mkdirs(dir.path(), "victim");
    let engine = Engine::new(SecurityPolicy::default());
    let cmd = CommandSpecBuilder::new("rm")
        .args(&format!("-rf {}", victim.display()))
        .build();

    let err = engine
        .execute_confirmed(&cmd, dir.path(), false, &CancelSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CmdrunError::ConfirmationRequired(ref name) if *name == cmd.name));
    assert!(victim.exists());
    Ok(())
}

#[tokio::test]
async fn flagged_command_is_refused_without_confirmation() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let engine = Engine::new(SecurityPolicy::default());
    let cmd = CommandSpecBuilder::new("echo").args("hi").confirm().build();

    let err = engine
        .execute_iteratively_confirmed(
            &cmd,
            dir.path(),
            &IterationOptionsBuilder::new().build(),
            false,
            &NoProgress,
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CmdrunError::ConfirmationRequired(_)));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn confirmed_command_runs() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let engine = Engine::new(SecurityPolicy::default());
    let cmd = CommandSpecBuilder::new("echo").args("confirmed").confirm().build();

    let result = with_timeout(engine.execute_confirmed(&cmd, dir.path(), true, &CancelSignal::new())).await?;

    assert!(result.was_successful(), "errors: {:?}", result.execution_errors);
    assert_eq!(result.standard_output.trim(), "confirmed");
    Ok(())
}

#[tokio::test]
async fn invalid_iteration_options_are_rejected_up_front() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing");
    let engine = Engine::new(SecurityPolicy::default());
    let cmd = CommandSpecBuilder::new("echo").iterative().build();

    let err = engine
        .execute_iteratively_confirmed(
            &cmd,
            &missing,
            &IterationOptionsBuilder::new().build(),
            true,
            &NoProgress,
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();

    match err {
        CmdrunError::InvalidOptions(msg) => {
            assert!(msg.contains("Root directory does not exist"), "{msg}");
        }
        other => panic!("Expected InvalidOptions, got: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn validate_options_uses_the_engine_file_system() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("/workspace");
    let engine = Engine::with_file_system(SecurityPolicy::default(), Arc::new(fs));

    let ok = engine.validate_options(Path::new("/workspace"), &IterationOptionsBuilder::new().build());
    assert!(ok.is_valid());

    let missing = engine.validate_options(Path::new("/elsewhere"), &IterationOptionsBuilder::new().build());
    assert!(!missing.is_valid());
    Ok(())
}

#[tokio::test]
async fn policy_changes_apply_to_the_next_run() -> TestResult {
    let engine = Engine::new(SecurityPolicy::default());
    assert_eq!(engine.executor().timeout(), Some(Duration::from_secs(300)));

    engine.security().set_policy(SecurityPolicy {
        max_execution_time_secs: 5,
        blocked_commands: vec!["curl".into()],
        ..SecurityPolicy::default()
    });

    assert_eq!(engine.executor().timeout(), Some(Duration::from_secs(5)));
    let assessment = engine.validate_security(&CommandSpecBuilder::new("curl").build());
    assert!(!assessment.is_valid());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn iterative_run_through_the_engine() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    mkdirs(root.path(), "a");
    mkdirs(root.path(), "b");
    let engine = Engine::new(SecurityPolicy::default());
    let cmd = CommandSpecBuilder::new("pwd").iterative().build();

    let progress = with_timeout(engine.execute_iteratively_confirmed(
        &cmd,
        root.path(),
        &IterationOptionsBuilder::new().build(),
        false,
        &NoProgress,
        &CancelSignal::new(),
    ))
    .await?;

    assert!(progress.is_completed);
    assert_eq!(progress.successful_items, 2);
    assert!(progress.item_results[0].output.trim().ends_with("a"));
    assert!(progress.item_results[1].output.trim().ends_with("b"));
    Ok(())
}
