//! Core data types for ensemble.
//!
//! A [`Run`] is one execution of a user task through an orchestration engine.
//! It owns the ordered [`Event`]s the engine's agents emit and, once the
//! engine finishes, an optional final answer derived from those events.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agent;
mod event;
mod run;
mod run_id;
mod telemetry;
mod template;

pub use agent::AgentRole;
pub use event::{Event, EventBuilder, FINAL_ANSWER_MARKER, derive_final_answer};
pub use run::{Run, RunStatus, RunSummary};
pub use run_id::{RunId, slugify};
pub use telemetry::init_tracing;
pub use template::TaskTemplate;

/// Default role name of the coordinating agent.
pub const DEFAULT_ORCHESTRATOR_ROLE: &str = "Orchestrator";
