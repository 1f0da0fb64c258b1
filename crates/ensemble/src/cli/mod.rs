//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the ensemble binary.

mod commands;
mod history;
mod run;

pub use commands::{Cli, Commands};
pub use history::{handle_history_command, print_templates};
pub use run::run_task;

use ensemble::{EnsembleConfig, EnsembleResult, FileSystemTranscriptStore};

/// Open the transcript store described by the configuration.
pub fn open_store(config: &EnsembleConfig) -> EnsembleResult<FileSystemTranscriptStore> {
    Ok(FileSystemTranscriptStore::new(&config.storage.logs_dir)?
        .with_log_file(config.storage.log_file.clone())
        .with_orchestrator_role(config.run.orchestrator_role.clone())
        .with_sync_writes(config.storage.sync_writes))
}
