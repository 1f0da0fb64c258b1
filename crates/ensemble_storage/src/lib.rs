//! Durable transcripts for ensemble runs.
//!
//! A transcript store keeps, per run, an append-only log of the events the
//! orchestration engine emitted plus a small metadata record (task, creation
//! time, status, final answer). Runs are reconstructed from it at start-up
//! and when a user reopens one from history.
//!
//! # Example
//!
//! ```rust,no_run
//! use ensemble_core::{Event, Run};
//! use ensemble_storage::{FileSystemTranscriptStore, TranscriptStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemTranscriptStore::new("/tmp/ensemble")?;
//! let run = Run::new("Web Research");
//!
//! store.create(&run.summary()).await?;
//! store.append(run.id(), &Event::new("Orchestrator", "Final Answer: 42")).await?;
//!
//! let loaded = store.load(run.id()).await?;
//! assert_eq!(loaded.run.final_answer().as_deref(), Some("42"));
//! # Ok(())
//! # }
//! ```

mod filesystem;
mod store;

pub use filesystem::{FileSystemTranscriptStore, METADATA_FILE};
pub use store::{LoadedRun, RunFile, RunSummaryStream, TranscriptStore};
