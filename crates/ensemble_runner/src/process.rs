//! Orchestration engine backed by an external helper process.
//!
//! The helper is started once per task invocation as
//! `<command> <args...> <task>`, inside the run directory, and prints one
//! JSON event per line on stdout:
//!
//! ```text
//! {"source": "Orchestrator", "message": "Plan: ..."}
//! {"source": "WebSurfer", "message": "Visited https://example.com"}
//! {"source": "Orchestrator", "message": "Final Answer: 42", "final_answer": "42"}
//! ```

use async_trait::async_trait;
use ensemble_core::Event;
use ensemble_error::{EnsembleResult, RunError, RunErrorKind};
use ensemble_interface::{EngineContext, EventStream, OrchestrationEngine};
use ensemble_rate_limit::EngineConfig;
use serde_json::Value as JsonValue;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Marker a provider puts in rate-limit messages.
const RATE_LIMIT_MARKER: &str = "Please try again in ";

/// Record field carrying the engine's own final answer.
const FINAL_ANSWER_FIELD: &str = "final_answer";

/// Environment variable holding the run id for the helper.
pub const RUN_ID_ENV: &str = "ENSEMBLE_RUN_ID";

/// Environment variable holding the run directory for the helper.
pub const RUN_DIR_ENV: &str = "ENSEMBLE_RUN_DIR";

type EventSender = mpsc::UnboundedSender<EnsembleResult<Event>>;
type EventReceiver = mpsc::UnboundedReceiver<EnsembleResult<Event>>;

/// Engine adapter that runs an external program per task.
///
/// One `ProcessEngine` serves one run: its event stream can be taken once.
/// The stream stays open across rate-limited invocations so that retries
/// keep feeding the same transcript, and closes once an invocation ends any
/// other way.
#[derive(Debug)]
pub struct ProcessEngine {
    config: EngineConfig,
    context: Mutex<Option<EngineContext>>,
    sender: Mutex<Option<EventSender>>,
    receiver: Mutex<Option<EventReceiver>>,
    final_answer: Mutex<Option<String>>,
}

impl ProcessEngine {
    /// Create an engine for one run.
    pub fn new(config: EngineConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            context: Mutex::new(None),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            final_answer: Mutex::new(None),
        }
    }

    fn context(&self) -> EnsembleResult<EngineContext> {
        self.context
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| {
                RunError::new(RunErrorKind::InvalidState(
                    "engine used before initialize".to_string(),
                ))
                .into()
            })
    }

    fn event_sender(&self) -> Option<EventSender> {
        self.sender.lock().ok().and_then(|guard| guard.clone())
    }

    fn close_stream(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    fn record_final_answer(&self, event: &Event) {
        let answer = event
            .extra
            .get(FINAL_ANSWER_FIELD)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|answer| !answer.is_empty());
        if let (Some(answer), Ok(mut guard)) = (answer, self.final_answer.lock()) {
            *guard = Some(answer.to_string());
        }
    }

    /// Decode one raw stdout line and forward it.
    ///
    /// Lines that are not UTF-8 or not an event are forwarded as stream
    /// errors; reading carries on either way.
    fn forward_line(&self, sender: Option<&EventSender>, number: usize, raw: &[u8]) {
        let item = match std::str::from_utf8(raw) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    return;
                }
                match serde_json::from_str::<Event>(line) {
                    Ok(event) => {
                        self.record_final_answer(&event);
                        Ok(event)
                    }
                    Err(e) => Err(RunError::new(RunErrorKind::Stream(format!(
                        "stdout line {}: {}",
                        number, e
                    )))
                    .into()),
                }
            }
            Err(e) => Err(RunError::new(RunErrorKind::Stream(format!(
                "stdout line {}: {}",
                number, e
            )))
            .into()),
        };
        match sender {
            Some(sender) if sender.send(item).is_ok() => {}
            _ => debug!(line = number, "Event stream closed, dropping output"),
        }
    }
}

#[async_trait]
impl OrchestrationEngine for ProcessEngine {
    #[instrument(skip(self, context), fields(run_id = %context.run_id()))]
    async fn initialize(&self, context: &EngineContext) -> EnsembleResult<()> {
        let command = self.config.command.as_deref().unwrap_or_default();
        if command.trim().is_empty() {
            return Err(RunError::new(RunErrorKind::Init(
                "no engine command configured (set engine.command)".to_string(),
            ))
            .into());
        }

        for name in &self.config.required_env {
            let present = std::env::var(name)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(RunError::new(RunErrorKind::Init(format!(
                    "{} is not set in the environment or .env file",
                    name
                )))
                .into());
            }
        }

        if let Ok(mut guard) = self.context.lock() {
            *guard = Some(context.clone());
        }
        info!(command, "Process engine initialized");
        Ok(())
    }

    #[instrument(skip(self, task))]
    async fn run_task(&self, task: &str) -> EnsembleResult<()> {
        let context = self.context()?;
        let program = self.config.command.clone().unwrap_or_default();

        let mut command = Command::new(&program);
        command
            .args(&self.config.args)
            .arg(task)
            .env(RUN_ID_ENV, context.run_id().as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = context.workspace() {
            command.current_dir(dir).env(RUN_DIR_ENV, dir);
        }

        let mut child = command.spawn().map_err(|e| {
            RunError::new(RunErrorKind::Invocation(format!("failed to start {}: {}", program, e)))
        })?;
        debug!(pid = child.id(), "Spawned engine process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let sender = self.event_sender();

        let read_stdout = async {
            let Some(stdout) = stdout else { return };
            let mut reader = BufReader::new(stdout);
            let mut line = Vec::new();
            let mut number = 0;
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        number += 1;
                        self.forward_line(sender.as_ref(), number, &line);
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed reading engine stdout");
                        break;
                    }
                }
            }
        };
        let read_stderr = async {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_string(&mut text).await {
                    warn!(error = %e, "Failed reading engine stderr");
                }
            }
            text
        };

        let ((), stderr_text, status) = tokio::join!(read_stdout, read_stderr, child.wait());
        let status = status.map_err(|e| {
            RunError::new(RunErrorKind::Invocation(format!("waiting for {}: {}", program, e)))
        })?;

        if status.success() {
            self.close_stream();
            info!("Engine process finished");
            return Ok(());
        }

        let detail = stderr_text.trim();
        if detail.contains(RATE_LIMIT_MARKER) {
            warn!(%status, "Engine process was rate limited");
            return Err(RunError::new(RunErrorKind::RateLimited {
                message: detail.to_string(),
                retry_after: None,
            })
            .into());
        }

        self.close_stream();
        Err(RunError::new(RunErrorKind::Invocation(format!(
            "{} exited with {}: {}",
            program, status, detail
        )))
        .into())
    }

    fn stream_events(&self) -> EventStream<'_> {
        let receiver = self.receiver.lock().ok().and_then(|mut guard| guard.take());
        Box::pin(async_stream::stream! {
            let Some(mut receiver) = receiver else { return };
            while let Some(item) = receiver.recv().await {
                yield item;
            }
        })
    }

    async fn final_answer(&self) -> Option<String> {
        self.final_answer.lock().ok().and_then(|guard| guard.clone())
    }

    fn name(&self) -> &str {
        self.config.command.as_deref().unwrap_or("process")
    }
}
