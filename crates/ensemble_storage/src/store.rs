//! Transcript store trait definition.

use ensemble_core::{Event, Run, RunId, RunSummary};
use ensemble_error::EnsembleResult;
use futures_util::stream::Stream;
use std::path::PathBuf;
use std::pin::Pin;

/// Lazy sequence of run metadata produced by [`TranscriptStore::list`].
pub type RunSummaryStream<'a> = Pin<Box<dyn Stream<Item = EnsembleResult<RunSummary>> + Send + 'a>>;

/// A run reconstructed from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRun {
    /// The run, events in persisted order
    pub run: Run,
    /// Records that failed to parse and were skipped
    pub skipped: usize,
}

/// A file kept in a run's storage location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunFile {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Trait for pluggable transcript storage backends.
///
/// Mutations for one run id are serialised by the implementation; different
/// run ids never contend.
#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Allocate storage for a new run and record its metadata.
    ///
    /// Fails if the run's location already exists and is not empty.
    async fn create(&self, summary: &RunSummary) -> EnsembleResult<()>;

    /// Append one event as a single record.
    ///
    /// A record is either written whole or, after a crash mid-write, left as
    /// a torn last line that [`load`](Self::load) skips. On serialization
    /// failure nothing is written and the error is returned.
    async fn append(&self, run_id: &RunId, event: &Event) -> EnsembleResult<()>;

    /// Replace the run's metadata (status, final answer, failure reason).
    async fn update(&self, summary: &RunSummary) -> EnsembleResult<()>;

    /// Stream the metadata of every stored run without reading event bodies,
    /// newest first.
    ///
    /// Each call re-scans storage. Per-run problems are yielded as errors
    /// and the scan continues.
    fn list(&self) -> RunSummaryStream<'_>;

    /// Reconstruct a run with all its events.
    ///
    /// Unparseable records are skipped and counted. The final answer is
    /// derived from the events when they contain one.
    async fn load(&self, run_id: &RunId) -> EnsembleResult<LoadedRun>;

    /// Remove everything stored for a run. Deleting an unknown run is a no-op.
    async fn delete(&self, run_id: &RunId) -> EnsembleResult<()>;

    /// Files kept in the run's location, sorted by name.
    async fn files(&self, run_id: &RunId) -> EnsembleResult<Vec<RunFile>>;

    /// Filesystem location of the run, if the backend has one.
    ///
    /// Engines use it as their working directory.
    fn location(&self, run_id: &RunId) -> Option<PathBuf> {
        let _ = run_id;
        None
    }
}
