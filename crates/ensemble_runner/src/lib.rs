//! Run execution for ensemble.
//!
//! [`RunDriver`] executes one [`Run`](ensemble_core::Run) against an
//! [`OrchestrationEngine`](ensemble_interface::OrchestrationEngine): it
//! invokes the task (retrying rate limits) while consuming the engine's
//! event stream, persisting every event to the transcript store and fanning
//! it out to a live renderer.
//!
//! [`ProcessEngine`] is an engine adapter that drives an external helper
//! program which prints one JSON event per line.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod process;

pub use driver::{RunDriver, RunOutcome};
pub use process::{ProcessEngine, RUN_DIR_ENV, RUN_ID_ENV};
