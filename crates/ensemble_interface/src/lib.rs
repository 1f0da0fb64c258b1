//! Trait definitions for the ensemble run driver's collaborators.
//!
//! The driver consumes an [`OrchestrationEngine`] (anything that can run a
//! task and stream the events its agents emit) and feeds a [`Renderer`]
//! (anything that shows those events live).

mod engine;
mod renderer;

pub use engine::{EngineContext, EventStream, OrchestrationEngine};
pub use renderer::{NullRenderer, Renderer};
