//! Tests for the process-backed engine.
#![cfg(unix)]

use ensemble_core::{Run, RunStatus};
use ensemble_error::RunErrorKind;
use ensemble_interface::{EngineContext, NullRenderer, OrchestrationEngine};
use ensemble_rate_limit::{EngineConfig, EnsembleConfig};
use ensemble_runner::{ProcessEngine, RunDriver, RunOutcome};
use ensemble_storage::{FileSystemTranscriptStore, TranscriptStore};
use futures_util::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;

/// Engine config running `script` through `sh -c`, the task arriving as `$1`.
fn shell(script: &str) -> EngineConfig {
    EngineConfig {
        command: Some("sh".to_string()),
        args: vec!["-c".to_string(), script.to_string(), "engine".to_string()],
        required_env: Vec::new(),
    }
}

fn context(temp_dir: &TempDir) -> EngineContext {
    let run = Run::new("Shell task");
    EngineContext::new(run.id().clone(), run.task().clone(), Some(temp_dir.path().to_path_buf()))
}

#[tokio::test]
async fn test_initialize_requires_command() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(EngineConfig {
        command: None,
        args: Vec::new(),
        required_env: Vec::new(),
    });

    let err = engine.initialize(&context(&temp_dir)).await.unwrap_err();
    assert!(matches!(err.run_kind(), Some(RunErrorKind::Init(_))));
}

#[tokio::test]
async fn test_initialize_requires_env() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = shell("true");
    config.required_env = vec!["ENSEMBLE_TEST_SURELY_UNSET_VARIABLE".to_string()];
    let engine = ProcessEngine::new(config);

    let err = engine.initialize(&context(&temp_dir)).await.unwrap_err();
    match err.run_kind() {
        Some(RunErrorKind::Init(message)) => {
            assert!(message.contains("ENSEMBLE_TEST_SURELY_UNSET_VARIABLE"))
        }
        other => panic!("expected init error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stdout_lines_become_events() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(shell(
        r#"echo '{"source":"Orchestrator","message":"Task: '"$1"'"}'
echo 'not json'
echo '{"source":"Orchestrator","message":"Final Answer: 7","final_answer":"7"}'"#,
    ));
    engine.initialize(&context(&temp_dir)).await.unwrap();

    engine.run_task("count to seven").await.unwrap();
    let items: Vec<_> = engine.stream_events().collect().await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().message, "Task: count to seven");
    assert!(matches!(
        items[1].as_ref().unwrap_err().run_kind(),
        Some(RunErrorKind::Stream(_))
    ));
    assert_eq!(engine.final_answer().await.as_deref(), Some("7"));

    // the stream is handed out once
    assert_eq!(engine.stream_events().count().await, 0);
}

#[tokio::test]
async fn test_runs_inside_run_directory() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(shell(
        r#"echo hello > notes.txt
printf '{"source":"FileSurfer","message":"%s"}\n' "$ENSEMBLE_RUN_ID""#,
    ));
    let context = context(&temp_dir);
    engine.initialize(&context).await.unwrap();

    engine.run_task("write notes").await.unwrap();
    let items: Vec<_> = engine.stream_events().collect().await;

    assert!(temp_dir.path().join("notes.txt").exists());
    assert_eq!(items[0].as_ref().unwrap().message, context.run_id().as_str());
}

#[tokio::test]
async fn test_non_zero_exit_is_invocation_error() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(shell("echo 'model exploded' >&2; exit 3"));
    engine.initialize(&context(&temp_dir)).await.unwrap();

    let err = engine.run_task("anything").await.unwrap_err();
    match err.run_kind() {
        Some(RunErrorKind::Invocation(message)) => assert!(message.contains("model exploded")),
        other => panic!("expected invocation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_stderr_is_retryable() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(shell(
        "echo 'Rate limit reached for gpt-4o. Please try again in 2s.' >&2; exit 1",
    ));
    engine.initialize(&context(&temp_dir)).await.unwrap();

    let err = engine.run_task("anything").await.unwrap_err();
    match err.run_kind() {
        Some(RunErrorKind::RateLimited { message, .. }) => {
            assert!(message.contains("Please try again in 2s"))
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_driver_with_process_engine() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileSystemTranscriptStore::new(temp_dir.path()).unwrap());
    let driver = RunDriver::new(store.clone(), &EnsembleConfig::default());
    let engine = ProcessEngine::new(shell(
        r#"echo '{"source":"Orchestrator","message":"Plan: answer"}'
echo '{"source":"Orchestrator","message":"Final Answer: done"}'"#,
    ));
    let mut run = Run::new("End to end");

    let outcome = driver
        .execute(&mut run, &engine, &mut NullRenderer)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            final_answer: "done".to_string()
        }
    );
    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.run.events().len(), 2);
    assert_eq!(*loaded.run.status(), RunStatus::Completed);
}

#[tokio::test]
async fn test_non_utf8_line_does_not_end_the_stream() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileSystemTranscriptStore::new(temp_dir.path()).unwrap());
    let driver = RunDriver::new(store.clone(), &EnsembleConfig::default());
    let engine = ProcessEngine::new(shell(
        r#"echo '{"source":"WebSurfer","message":"a"}'
printf '\377\n'
echo '{"source":"Orchestrator","message":"Final Answer: 42"}'"#,
    ));
    let mut run = Run::new("Binary noise");

    let outcome = driver
        .execute(&mut run, &engine, &mut NullRenderer)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            final_answer: "42".to_string()
        }
    );
    assert_eq!(run.events().len(), 2);
    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.run.events().len(), 2);
}

#[tokio::test]
async fn test_non_utf8_line_is_a_stream_error() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ProcessEngine::new(shell(
        r#"printf '\377\n'
echo '{"source":"Coder","message":"still here"}'"#,
    ));
    engine.initialize(&context(&temp_dir)).await.unwrap();

    engine.run_task("noise").await.unwrap();
    let items: Vec<_> = engine.stream_events().collect().await;

    assert_eq!(items.len(), 2);
    assert!(matches!(
        items[0].as_ref().unwrap_err().run_kind(),
        Some(RunErrorKind::Stream(_))
    ));
    assert_eq!(items[1].as_ref().unwrap().message, "still here");
}
