//! Filesystem transcript store.
//!
//! One directory per run under a root directory:
//!
//! ```text
//! my_logs/
//! ├── 20250314_1a2b3c4d_web-research/
//! │   ├── log.jsonl   (one JSON event per line, append-only)
//! │   ├── run.json    (task, created_at, status, final answer)
//! │   └── ...         (files the engine wrote while working)
//! └── 20250315_9f8e7d6c_analyze-the-code-in/
//!     └── ...
//! ```

use crate::{LoadedRun, RunFile, RunSummaryStream, TranscriptStore};
use ensemble_core::{DEFAULT_ORCHESTRATOR_ROLE, Event, Run, RunId, RunStatus, RunSummary, derive_final_answer};
use ensemble_error::{EnsembleResult, StoreError, StoreErrorKind};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Name of the metadata record inside each run directory.
pub const METADATA_FILE: &str = "run.json";

/// Default name of the event log inside each run directory.
const DEFAULT_LOG_FILE: &str = "log.jsonl";

/// Filesystem transcript store backend.
///
/// # Features
///
/// - **Append-only logs**: each event is one line written with a single write
/// - **Atomic metadata**: `run.json` is replaced via temp file + rename
/// - **Per-run locking**: appends, updates and deletes of one run never interleave
/// - **Legacy directories**: run directories without `run.json` are still listed,
///   with task and date decoded from the directory name
#[derive(Debug)]
pub struct FileSystemTranscriptStore {
    root: PathBuf,
    log_file: String,
    orchestrator_role: String,
    sync_writes: bool,
    locks: Mutex<HashMap<RunId, Arc<Mutex<()>>>>,
}

impl FileSystemTranscriptStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> EnsembleResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            StoreError::new(StoreErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        info!(path = %root.display(), "Opened transcript store");
        Ok(Self {
            root,
            log_file: DEFAULT_LOG_FILE.to_string(),
            orchestrator_role: DEFAULT_ORCHESTRATOR_ROLE.to_string(),
            sync_writes: false,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Use a different event log file name.
    pub fn with_log_file(mut self, log_file: impl Into<String>) -> Self {
        self.log_file = log_file.into();
        self
    }

    /// Use a different role name when deriving final answers.
    pub fn with_orchestrator_role(mut self, role: impl Into<String>) -> Self {
        self.orchestrator_role = role.into();
        self
    }

    /// fsync the log after every append.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Root directory holding the run directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }

    fn log_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join(&self.log_file)
    }

    /// The mutex serialising mutations of one run.
    async fn lock_for(&self, run_id: &RunId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(run_id.clone()).or_default().clone()
    }

    /// Replace a file's contents via temp file + rename.
    async fn write_atomic(path: &Path, contents: &[u8]) -> EnsembleResult<()> {
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, contents).await.map_err(|e| {
            StoreError::new(StoreErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            StoreError::new(StoreErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;
        Ok(())
    }

    async fn write_summary(&self, summary: &RunSummary) -> EnsembleResult<()> {
        let json = serde_json::to_vec_pretty(summary).map_err(|e| {
            StoreError::new(StoreErrorKind::Serialization(format!(
                "metadata of {}: {}",
                summary.id, e
            )))
        })?;
        Self::write_atomic(&self.run_dir(&summary.id).join(METADATA_FILE), &json).await
    }

    /// Read a run's metadata, falling back to what its directory name encodes.
    ///
    /// Returns `Ok(None)` for directories that do not look like runs at all.
    async fn read_summary(&self, run_id: &RunId) -> EnsembleResult<Option<RunSummary>> {
        let dir = self.run_dir(run_id);
        match tokio::fs::read(dir.join(METADATA_FILE)).await {
            Ok(bytes) => match serde_json::from_slice::<RunSummary>(&bytes) {
                Ok(summary) if summary.id == *run_id => return Ok(Some(summary)),
                Ok(summary) => {
                    warn!(run_id = %run_id, recorded = %summary.id, "Metadata names another run, decoding directory name");
                }
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "Unreadable run metadata, decoding directory name");
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::new(StoreErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.join(METADATA_FILE).display(),
                    e
                )))
                .into());
            }
        }

        if !tokio::fs::try_exists(self.log_path(run_id)).await.unwrap_or(false) {
            return Ok(None);
        }
        Ok(legacy_summary(run_id))
    }
}

/// Metadata for a run directory written without `run.json`.
fn legacy_summary(run_id: &RunId) -> Option<RunSummary> {
    Some(RunSummary {
        id: run_id.clone(),
        task: run_id.encoded_task()?,
        created_at: run_id.encoded_timestamp()?,
        status: RunStatus::Completed,
        final_answer: None,
        failure: None,
    })
}

/// Parse a log's lines, skipping blank lines and counting unparseable ones.
fn parse_records(run_id: &RunId, contents: &str) -> (Vec<Event>, usize) {
    let mut events = Vec::new();
    let mut skipped = 0;
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                skipped += 1;
                warn!(run_id = %run_id, line = index + 1, error = %e, "Skipping unparseable record");
            }
        }
    }
    (events, skipped)
}

#[async_trait::async_trait]
impl TranscriptStore for FileSystemTranscriptStore {
    #[instrument(skip(self, summary), fields(run_id = %summary.id))]
    async fn create(&self, summary: &RunSummary) -> EnsembleResult<()> {
        let dir = self.run_dir(&summary.id);
        let lock = self.lock_for(&summary.id).await;
        let _guard = lock.lock().await;

        match tokio::fs::read_dir(&dir).await {
            Ok(mut entries) => {
                let occupied = entries
                    .next_entry()
                    .await
                    .map_err(|e| {
                        StoreError::new(StoreErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
                    })?
                    .is_some();
                if occupied {
                    return Err(StoreError::new(StoreErrorKind::AlreadyExists(summary.id.to_string())).into());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                    StoreError::new(StoreErrorKind::DirectoryCreation(format!(
                        "{}: {}",
                        dir.display(),
                        e
                    )))
                })?;
            }
            Err(e) => {
                return Err(StoreError::new(StoreErrorKind::FileRead(format!("{}: {}", dir.display(), e))).into());
            }
        }

        self.write_summary(summary).await?;
        info!(path = %dir.display(), "Created run directory");
        Ok(())
    }

    #[instrument(skip(self, event), fields(run_id = %run_id, source = %event.source))]
    async fn append(&self, run_id: &RunId, event: &Event) -> EnsembleResult<()> {
        let mut line = serde_json::to_vec(event).map_err(|e| {
            StoreError::new(StoreErrorKind::Serialization(format!("event of {}: {}", run_id, e)))
        })?;
        line.push(b'\n');

        let path = self.log_path(run_id);
        let lock = self.lock_for(run_id).await;
        let _guard = lock.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    StoreError::new(StoreErrorKind::NotFound(run_id.to_string()))
                } else {
                    StoreError::new(StoreErrorKind::FileWrite(format!("{}: {}", path.display(), e)))
                }
            })?;

        let write_err =
            |e: std::io::Error| StoreError::new(StoreErrorKind::FileWrite(format!("{}: {}", path.display(), e)));
        file.write_all(&line).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        if self.sync_writes {
            file.sync_data().await.map_err(write_err)?;
        }

        debug!(bytes = line.len(), "Appended event");
        Ok(())
    }

    #[instrument(skip(self, summary), fields(run_id = %summary.id, status = %summary.status))]
    async fn update(&self, summary: &RunSummary) -> EnsembleResult<()> {
        let lock = self.lock_for(&summary.id).await;
        let _guard = lock.lock().await;

        if !tokio::fs::try_exists(self.run_dir(&summary.id)).await.unwrap_or(false) {
            return Err(StoreError::new(StoreErrorKind::NotFound(summary.id.to_string())).into());
        }
        self.write_summary(summary).await?;
        debug!("Updated run metadata");
        Ok(())
    }

    fn list(&self) -> RunSummaryStream<'_> {
        Box::pin(async_stream::stream! {
            let mut entries = match tokio::fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return,
                Err(e) => {
                    yield Err(StoreError::new(StoreErrorKind::FileRead(format!(
                        "{}: {}",
                        self.root.display(),
                        e
                    )))
                    .into());
                    return;
                }
            };

            let mut found = Vec::new();
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(StoreError::new(StoreErrorKind::FileRead(format!(
                            "{}: {}",
                            self.root.display(),
                            e
                        )))
                        .into());
                        break;
                    }
                };

                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let run_id: RunId = match name.parse() {
                    Ok(id) => id,
                    Err(_) => {
                        debug!(name = %name, "Ignoring directory that is not a run id");
                        continue;
                    }
                };

                match self.read_summary(&run_id).await {
                    Ok(Some(summary)) => found.push(summary),
                    Ok(None) => debug!(run_id = %run_id, "Ignoring directory without run data"),
                    Err(e) => yield Err(e),
                }
            }

            // Newest first; ties keep scan order.
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            for summary in found {
                yield Ok(summary);
            }
        })
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn load(&self, run_id: &RunId) -> EnsembleResult<LoadedRun> {
        if !tokio::fs::try_exists(self.run_dir(run_id)).await.unwrap_or(false) {
            return Err(StoreError::new(StoreErrorKind::NotFound(run_id.to_string())).into());
        }
        let mut summary = self
            .read_summary(run_id)
            .await?
            .or_else(|| legacy_summary(run_id))
            .ok_or_else(|| StoreError::new(StoreErrorKind::NotFound(run_id.to_string())))?;

        let path = self.log_path(run_id);
        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StoreError::new(StoreErrorKind::FileRead(format!("{}: {}", path.display(), e))).into());
            }
        };

        let (events, skipped) = parse_records(run_id, &contents);
        if let Some(answer) = derive_final_answer(&events, &self.orchestrator_role) {
            summary.final_answer = Some(answer);
        }

        debug!(events = events.len(), skipped, "Loaded run");
        Ok(LoadedRun {
            run: Run::from_parts(summary, events),
            skipped,
        })
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn delete(&self, run_id: &RunId) -> EnsembleResult<()> {
        let dir = self.run_dir(run_id);
        // Lock entries are never removed: every caller for an id shares one mutex.
        let lock = self.lock_for(run_id).await;
        let _guard = lock.lock().await;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => info!(path = %dir.display(), "Deleted run directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Run already absent");
            }
            Err(e) => {
                return Err(StoreError::new(StoreErrorKind::FileWrite(format!(
                    "delete {}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn files(&self, run_id: &RunId) -> EnsembleResult<Vec<RunFile>> {
        let dir = self.run_dir(run_id);
        let read_err = |e: std::io::Error| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::new(StoreErrorKind::NotFound(run_id.to_string()))
            } else {
                StoreError::new(StoreErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
            }
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(read_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let metadata = entry.metadata().await.map_err(read_err)?;
            if metadata.is_file() {
                files.push(RunFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: metadata.len(),
                });
            }
        }
        files.sort();
        Ok(files)
    }

    fn location(&self, run_id: &RunId) -> Option<PathBuf> {
        Some(self.run_dir(run_id))
    }
}
