//! Live event consumers.

use async_trait::async_trait;
use ensemble_core::{Event, RunSummary};
use ensemble_error::EnsembleResult;

/// Shows a run's events as they arrive.
///
/// The driver owns the renderer for the duration of a run. It never calls
/// [`on_event`](Self::on_event) after [`finish`](Self::finish).
#[async_trait]
pub trait Renderer: Send {
    /// Display one event. Errors are logged by the driver and do not stop
    /// the run.
    async fn on_event(&mut self, event: &Event) -> EnsembleResult<()>;

    /// Called once with the run's terminal metadata.
    async fn finish(&mut self, summary: &RunSummary) -> EnsembleResult<()> {
        let _ = summary;
        Ok(())
    }
}

/// Renderer that discards everything, for runs without a live view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullRenderer;

#[async_trait]
impl Renderer for NullRenderer {
    async fn on_event(&mut self, _event: &Event) -> EnsembleResult<()> {
        Ok(())
    }
}
