//! Run driver: one run, one engine, one renderer.

use ensemble_core::{Event, Run, RunId, RunStatus, derive_final_answer};
use ensemble_error::{EnsembleError, EnsembleResult, RunError, RunErrorKind};
use ensemble_interface::{EngineContext, OrchestrationEngine, Renderer};
use ensemble_rate_limit::{EnsembleConfig, RetryPolicy, RunConfig, with_retry};
use ensemble_storage::TranscriptStore;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Failure reason recorded on runs stopped by cancellation.
const CANCELLED_REASON: &str = "Cancelled";

/// How a successfully executed run ended.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RunOutcome {
    /// The run completed with a final answer
    #[display("Final Answer: {}", final_answer)]
    Completed {
        /// The derived final answer
        final_answer: String,
    },
    /// The engine finished but no final answer could be derived
    #[display("No final answer found")]
    NoFinalAnswer,
}

impl RunOutcome {
    /// The final answer, if there is one.
    pub fn final_answer(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed { final_answer } => Some(final_answer),
            RunOutcome::NoFinalAnswer => None,
        }
    }
}

/// Executes runs against an orchestration engine.
///
/// Each event the engine emits is, in order, appended to the transcript
/// store, pushed onto the run, and handed to the renderer through a bounded
/// channel. The renderer runs as a concurrent future in the caller's task,
/// so a slow renderer delays the stream by at most the channel's capacity.
///
/// `execute` must not be called concurrently for the same run.
///
/// # Example
///
/// ```rust,ignore
/// use ensemble_runner::{RunDriver, RunOutcome};
///
/// let driver = RunDriver::new(store, &config);
/// let mut run = Run::new("Web Research");
/// match driver.execute(&mut run, &engine, &mut renderer).await? {
///     RunOutcome::Completed { final_answer } => println!("{}", final_answer),
///     RunOutcome::NoFinalAnswer => println!("No final answer found"),
/// }
/// ```
pub struct RunDriver {
    store: Arc<dyn TranscriptStore>,
    run_config: RunConfig,
    retry: RetryPolicy,
}

impl RunDriver {
    /// Create a driver persisting into `store`.
    pub fn new(store: Arc<dyn TranscriptStore>, config: &EnsembleConfig) -> Self {
        Self {
            store,
            run_config: config.run.clone(),
            retry: config.retry,
        }
    }

    /// The transcript store runs are persisted into.
    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    /// Execute a pending run to completion.
    ///
    /// # Errors
    ///
    /// - `RunErrorKind::InvalidState` if the run is not pending (the run is
    ///   left untouched)
    /// - store errors creating the run's storage
    /// - `RunErrorKind::Init`, `Invocation` or `RetryExhausted` when the
    ///   engine fails; the run is then marked failed
    pub async fn execute<E, R>(
        &self,
        run: &mut Run,
        engine: &E,
        renderer: &mut R,
    ) -> EnsembleResult<RunOutcome>
    where
        E: OrchestrationEngine + ?Sized,
        R: Renderer + ?Sized,
    {
        self.execute_with_cancel(run, engine, renderer, CancellationToken::new())
            .await
    }

    /// Execute a pending run, stopping early if `cancel` fires.
    ///
    /// Cancellation is observed between events, so no record is left half
    /// written. A cancelled run is marked failed with reason `Cancelled` and
    /// `RunErrorKind::Cancelled` is returned.
    #[instrument(skip_all, fields(run_id = %run.id(), engine = engine.name()))]
    pub async fn execute_with_cancel<E, R>(
        &self,
        run: &mut Run,
        engine: &E,
        renderer: &mut R,
        cancel: CancellationToken,
    ) -> EnsembleResult<RunOutcome>
    where
        E: OrchestrationEngine + ?Sized,
        R: Renderer + ?Sized,
    {
        if *run.status() != RunStatus::Pending {
            return Err(RunError::new(RunErrorKind::InvalidState(format!(
                "{} is {}, expected pending",
                run.id(),
                run.status()
            )))
            .into());
        }

        self.store.create(&run.summary()).await?;
        run.start()?;
        self.persist_status(run).await;
        info!(task = %run.task(), "Run started");

        let context = EngineContext::new(
            run.id().clone(),
            run.task().clone(),
            self.store.location(run.id()),
        );
        if let Err(e) = engine.initialize(&context).await {
            error!(error = %e, "Engine initialization failed");
            return Err(self.fail(run, renderer, e).await);
        }

        let run_id = run.id().clone();
        let (sender, receiver) = mpsc::channel(self.run_config.render_buffer.max(1));
        let (result, ()) = tokio::join!(
            self.pump(run, engine, sender, &cancel),
            render_events(renderer, receiver, &run_id),
        );

        if let Err(e) = result {
            return Err(self.fail(run, renderer, e).await);
        }

        let final_answer = match self.derive_answer(run).await {
            Some(answer) => Some(answer),
            None => engine.final_answer().await,
        };
        run.complete(final_answer.clone())?;
        self.persist_status(run).await;
        finish(renderer, run).await;

        match final_answer {
            Some(final_answer) => {
                info!(events = run.events().len(), "Run completed");
                Ok(RunOutcome::Completed { final_answer })
            }
            None => {
                warn!(events = run.events().len(), "Run completed without a final answer");
                Ok(RunOutcome::NoFinalAnswer)
            }
        }
    }

    /// Invoke the task and consume the event stream until both are done.
    ///
    /// Returns the invocation outcome. The sender is dropped on return, which
    /// lets the renderer drain and stop.
    async fn pump<E>(
        &self,
        run: &mut Run,
        engine: &E,
        sender: mpsc::Sender<Event>,
        cancel: &CancellationToken,
    ) -> EnsembleResult<()>
    where
        E: OrchestrationEngine + ?Sized,
    {
        let task_text = run.task().clone();
        let task = task_text.as_str();
        let invocation = with_retry(&self.retry, || engine.run_task(task));
        tokio::pin!(invocation);

        let mut events = engine.stream_events();
        let mut stream_open = true;
        let mut outcome: Option<EnsembleResult<()>> = None;
        let mut grace_deadline: Option<Instant> = None;

        loop {
            if !stream_open {
                if let Some(result) = outcome.take() {
                    return result;
                }
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    warn!(events = run.events().len(), "Run cancelled");
                    return Err(RunError::new(RunErrorKind::Cancelled).into());
                }

                next = events.next(), if stream_open => match next {
                    Some(Ok(event)) => self.record(run, &sender, event).await,
                    Some(Err(e)) => {
                        warn!(run_id = %run.id(), error = %e, "Skipping undecodable event");
                    }
                    None => {
                        debug!("Event stream ended");
                        stream_open = false;
                    }
                },

                result = &mut invocation, if outcome.is_none() => {
                    debug!(ok = result.is_ok(), "Task invocation finished");
                    outcome = Some(result);
                    grace_deadline =
                        Some(Instant::now() + Duration::from_millis(self.run_config.drain_grace_ms));
                }

                _ = tokio::time::sleep_until(grace_deadline.unwrap_or_else(Instant::now)),
                    if stream_open && grace_deadline.is_some() =>
                {
                    warn!(
                        grace_ms = self.run_config.drain_grace_ms,
                        "Event stream still open after the task finished, closing it"
                    );
                    stream_open = false;
                }
            }
        }
    }

    /// Persist, record and forward one event.
    async fn record(&self, run: &mut Run, sender: &mpsc::Sender<Event>, event: Event) {
        if let Err(e) = self.store.append(run.id(), &event).await {
            warn!(run_id = %run.id(), source = %event.source, error = %e, "Failed to persist event");
        }
        run.push_event(event.clone());
        if sender.send(event).await.is_err() {
            debug!(run_id = %run.id(), "Renderer gone, event not forwarded");
        }
    }

    /// Final answer from the persisted transcript, or the in-memory events
    /// when the transcript cannot be read back.
    async fn derive_answer(&self, run: &Run) -> Option<String> {
        match self.store.load(run.id()).await {
            Ok(loaded) => loaded.run.final_answer().clone(),
            Err(e) => {
                warn!(run_id = %run.id(), error = %e, "Could not reload transcript, using in-memory events");
                derive_final_answer(run.events(), &self.run_config.orchestrator_role)
            }
        }
    }

    /// Mark the run failed, persist and announce it, and hand back the error.
    async fn fail<R>(&self, run: &mut Run, renderer: &mut R, err: EnsembleError) -> EnsembleError
    where
        R: Renderer + ?Sized,
    {
        let reason = match err.run_kind() {
            Some(RunErrorKind::Cancelled) => CANCELLED_REASON.to_string(),
            _ => err.to_string(),
        };
        if let Err(e) = run.fail(reason) {
            error!(run_id = %run.id(), error = %e, "Could not mark run failed");
        }
        self.persist_status(run).await;
        finish(renderer, run).await;
        err
    }

    async fn persist_status(&self, run: &Run) {
        if let Err(e) = self.store.update(&run.summary()).await {
            warn!(run_id = %run.id(), status = %run.status(), error = %e, "Failed to persist run status");
        }
    }
}

/// Forward channel contents to the renderer until the sender is dropped.
async fn render_events<R>(renderer: &mut R, mut receiver: mpsc::Receiver<Event>, run_id: &RunId)
where
    R: Renderer + ?Sized,
{
    while let Some(event) = receiver.recv().await {
        if let Err(e) = renderer.on_event(&event).await {
            warn!(run_id = %run_id, error = %e, "Renderer failed on event");
        }
    }
}

async fn finish<R>(renderer: &mut R, run: &Run)
where
    R: Renderer + ?Sized,
{
    if let Err(e) = renderer.finish(&run.summary()).await {
        warn!(run_id = %run.id(), error = %e, "Renderer failed to finish");
    }
}
