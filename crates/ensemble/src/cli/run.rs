//! Task execution command handler.

use super::open_store;
use ensemble::{
    ConfigError, EnsembleConfig, EnsembleResult, ProcessEngine, Run, RunDriver, RunOutcome,
    TaskTemplate, TerminalRenderer,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build the task text from the command line.
fn task_text(words: &[String], template: Option<&str>) -> EnsembleResult<String> {
    let text = words.join(" ");
    let task = match template {
        Some(name) => TaskTemplate::find(name)
            .ok_or_else(|| ConfigError::new(format!("unknown template '{}'", name)))?
            .fill(text.trim()),
        None => text,
    };
    if task.trim().is_empty() {
        return Err(ConfigError::new("task must not be empty").into());
    }
    Ok(task.trim().to_string())
}

/// Execute one task through the configured process engine.
pub async fn run_task(
    config: &EnsembleConfig,
    words: &[String],
    template: Option<&str>,
) -> EnsembleResult<RunOutcome> {
    let task = task_text(words, template)?;
    let store = Arc::new(open_store(config)?);
    let driver = RunDriver::new(store, config);
    let engine = ProcessEngine::new(config.engine.clone());
    let mut run = Run::new(task);

    println!("📜 Task: {}", run.task());
    println!("🕒 {}  ({})\n", run.created_at().format("%Y-%m-%d %H:%M:%S"), run.id());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let mut renderer = TerminalRenderer::stdout();
    let outcome = driver
        .execute_with_cancel(&mut run, &engine, &mut renderer, cancel)
        .await?;
    info!(run_id = %run.id(), events = run.events().len(), "Run finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fills_placeholder() {
        let words = vec!["Rust".to_string(), "async".to_string()];
        let task = task_text(&words, Some("Web Research")).unwrap();
        assert!(task.contains("Rust async"));
        assert!(!task.contains('['));
    }

    #[test]
    fn empty_task_is_rejected() {
        assert!(task_text(&[], None).is_err());
        assert!(task_text(&["  ".to_string()], Some("custom task")).is_err());
    }

    #[test]
    fn unknown_template_is_rejected() {
        assert!(task_text(&["x".to_string()], Some("no such template")).is_err());
    }
}
