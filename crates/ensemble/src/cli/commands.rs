//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ensemble - run multi-agent tasks with persistent, streaming transcripts
#[derive(Parser, Debug)]
#[command(name = "ensemble")]
#[command(about = "Run multi-agent tasks with persistent, streaming transcripts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file to use instead of the user configuration files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task and stream its events
    Run {
        /// Task description
        #[arg(required_unless_present = "template")]
        task: Vec<String>,

        /// Fill a named task template with the task text
        #[arg(short, long)]
        template: Option<String>,
    },

    /// List past runs, newest first
    List,

    /// Find past runs whose task contains the query, ignoring case
    Search {
        /// Text to look for
        query: String,
    },

    /// Show a run's full transcript
    Show {
        /// Run id (directory name)
        run_id: String,
    },

    /// Delete a run and its files
    Delete {
        /// Run id (directory name)
        run_id: String,
    },

    /// Print a shareable summary of a run
    Share {
        /// Run id (directory name)
        run_id: String,
    },

    /// List the files in a run's directory
    Files {
        /// Run id (directory name)
        run_id: String,
    },

    /// List the built-in task templates
    Templates,
}
