//! In-memory index over stored runs.

use crate::{SessionAction, SessionState};
use ensemble_core::{RunId, RunStatus, RunSummary};
use ensemble_error::EnsembleResult;
use ensemble_storage::TranscriptStore;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Catalog of known runs, newest first.
///
/// # Examples
///
/// ```rust,no_run
/// use ensemble_history::HistoryIndex;
/// use ensemble_storage::FileSystemTranscriptStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(FileSystemTranscriptStore::new("my_logs")?);
/// let mut index = HistoryIndex::new(store);
/// index.refresh().await;
///
/// for summary in index.search("web") {
///     println!("{} {}", summary.created_at, summary.task);
/// }
/// # Ok(())
/// # }
/// ```
pub struct HistoryIndex {
    store: Arc<dyn TranscriptStore>,
    entries: Vec<RunSummary>,
}

impl HistoryIndex {
    /// Create an empty index over `store`. Call [`refresh`](Self::refresh)
    /// to populate it.
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            store,
            entries: Vec::new(),
        }
    }

    /// Rebuild the index from the store.
    ///
    /// Runs the store cannot describe are logged and left out. Returns the
    /// number of runs indexed.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> usize {
        let mut entries = Vec::new();
        let mut listing = self.store.list();
        while let Some(item) = listing.next().await {
            match item {
                Ok(summary) => entries.push(summary),
                Err(e) => warn!(error = %e, "Skipping run that could not be listed"),
            }
        }
        drop(listing);

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.entries = entries;
        info!(runs = self.entries.len(), "History refreshed");
        self.entries.len()
    }

    /// Runs whose task contains `query`, ignoring case.
    ///
    /// An empty query matches every run. The iterator borrows the index and
    /// can be recreated at will.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a RunSummary> + use<'a> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(move |summary| needle.is_empty() || summary.task.to_lowercase().contains(&needle))
    }

    /// Add a run, keeping newest-first order. Replaces an entry with the
    /// same id.
    pub fn insert(&mut self, summary: RunSummary) {
        self.entries.retain(|entry| entry.id != summary.id);
        let position = self
            .entries
            .partition_point(|entry| entry.created_at > summary.created_at);
        debug!(run_id = %summary.id, position, "Indexed run");
        self.entries.insert(position, summary);
    }

    /// Look up a run by id.
    pub fn get(&self, run_id: &RunId) -> Option<&RunSummary> {
        self.entries.iter().find(|entry| entry.id == *run_id)
    }

    /// Record how a run ended. Returns false if the run is not indexed.
    pub fn record_outcome(
        &mut self,
        run_id: &RunId,
        status: RunStatus,
        final_answer: Option<String>,
        failure: Option<String>,
    ) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == *run_id) {
            Some(entry) => {
                entry.status = status;
                entry.final_answer = final_answer;
                entry.failure = failure;
                true
            }
            None => false,
        }
    }

    /// Delete a run from the store and drop it from the index.
    ///
    /// Clears the session's selection if it pointed at the removed run.
    /// Removing an unknown run is not an error.
    #[instrument(skip(self, session), fields(run_id = %run_id))]
    pub async fn remove(&mut self, run_id: &RunId, session: &mut SessionState) -> EnsembleResult<()> {
        self.store.delete(run_id).await?;
        self.entries.retain(|entry| entry.id != *run_id);
        *session = std::mem::take(session).apply(SessionAction::Removed(run_id.clone()));
        info!("Removed run from history");
        Ok(())
    }

    /// Number of indexed runs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no runs are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All indexed runs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &RunSummary> {
        self.entries.iter()
    }
}

impl std::fmt::Debug for HistoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryIndex")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
