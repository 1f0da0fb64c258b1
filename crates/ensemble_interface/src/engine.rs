//! Orchestration engine boundary.

use async_trait::async_trait;
use derive_getters::Getters;
use ensemble_core::{Event, RunId};
use ensemble_error::EnsembleResult;
use futures_util::stream::Stream;
use std::path::PathBuf;
use std::pin::Pin;

/// Lazy, in-order sequence of events produced by an engine.
///
/// Individual items may be errors (an undecodable event); the sequence ends
/// when the engine's work for the run is done.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = EnsembleResult<Event>> + Send + 'a>>;

/// What an engine is told about the run it is about to execute.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EngineContext {
    /// Run being executed
    run_id: RunId,
    /// Task text
    task: String,
    /// Directory the engine may write files into
    workspace: Option<PathBuf>,
}

impl EngineContext {
    /// Create a context for one run.
    pub fn new(run_id: RunId, task: impl Into<String>, workspace: Option<PathBuf>) -> Self {
        Self {
            run_id,
            task: task.into(),
            workspace,
        }
    }
}

/// A multi-agent orchestration engine.
///
/// The run driver calls [`initialize`](Self::initialize) once, then polls
/// [`run_task`](Self::run_task) and the stream from
/// [`stream_events`](Self::stream_events) concurrently, so both are in flight
/// before either completes. `run_task` may be invoked again after a
/// rate-limit error; the event stream is taken only once per run.
#[async_trait]
pub trait OrchestrationEngine: Send + Sync {
    /// Prepare the engine for one run.
    ///
    /// Errors here are fatal to the run and should be `RunErrorKind::Init`.
    async fn initialize(&self, context: &EngineContext) -> EnsembleResult<()>;

    /// Execute the task, resolving when the engine is done with it.
    ///
    /// Rate-limit failures should be reported as `RunErrorKind::RateLimited`
    /// so the driver can retry them.
    async fn run_task(&self, task: &str) -> EnsembleResult<()>;

    /// The events emitted while the task runs.
    fn stream_events(&self) -> EventStream<'_>;

    /// The engine's own record of the final answer, if it keeps one.
    async fn final_answer(&self) -> Option<String> {
        None
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        "engine"
    }
}
