//! Ensemble: persistent, streaming front end for multi-agent task runs.
//!
//! Ensemble submits a task to a multi-agent orchestration engine, streams the
//! events its agents emit to a live view while writing every one of them to a
//! durable transcript, and keeps a searchable history of past runs.
//!
//! # Architecture
//!
//! Ensemble is organized as a workspace with focused crates:
//!
//! - `ensemble_error` - Error types
//! - `ensemble_core` - Runs, events, run ids, task templates
//! - `ensemble_rate_limit` - Rate-limit retry and configuration
//! - `ensemble_storage` - Transcript storage
//! - `ensemble_interface` - Engine and renderer traits
//! - `ensemble_runner` - Run driver and process engine
//! - `ensemble_history` - History index and session state
//!
//! This crate re-exports everything for convenience and ships the `ensemble`
//! command-line front end.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ensemble::{EnsembleConfig, FileSystemTranscriptStore, ProcessEngine, Run, RunDriver, TerminalRenderer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EnsembleConfig::load()?;
//!     let store = Arc::new(FileSystemTranscriptStore::new(&config.storage.logs_dir)?);
//!     let driver = RunDriver::new(store, &config);
//!
//!     let mut run = Run::new("Summarize the latest Rust release notes");
//!     let engine = ProcessEngine::new(config.engine.clone());
//!     let mut renderer = TerminalRenderer::stdout();
//!     let outcome = driver.execute(&mut run, &engine, &mut renderer).await?;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod render;

pub use render::TerminalRenderer;

pub use ensemble_core::{
    AgentRole, DEFAULT_ORCHESTRATOR_ROLE, Event, EventBuilder, FINAL_ANSWER_MARKER, Run, RunId,
    RunStatus, RunSummary, TaskTemplate, derive_final_answer, init_tracing, slugify,
};
pub use ensemble_error::{
    ConfigError, EnsembleError, EnsembleErrorKind, EnsembleResult, RunError,
    RunErrorKind, StoreError, StoreErrorKind,
};
pub use ensemble_history::{
    FormattedEvent, HistoryIndex, SessionAction, SessionState, format_event, share_text,
};
pub use ensemble_interface::{
    EngineContext, EventStream, NullRenderer, OrchestrationEngine, Renderer,
};
pub use ensemble_rate_limit::{
    EngineConfig, EnsembleConfig, RetryPolicy, RetrySignal, RetryableError, RunConfig,
    StorageConfig, parse_retry_after, with_retry,
};
pub use ensemble_runner::{ProcessEngine, RUN_DIR_ENV, RUN_ID_ENV, RunDriver, RunOutcome};
pub use ensemble_storage::{
    FileSystemTranscriptStore, LoadedRun, METADATA_FILE, RunFile, RunSummaryStream,
    TranscriptStore,
};
