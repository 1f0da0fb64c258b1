//! Runs, their lifecycle, and the metadata summary persisted alongside them.

use crate::{Event, RunId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use ensemble_error::{RunError, RunErrorKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle state of a run.
///
/// Transitions are `Pending -> Running -> {Completed | Failed}`; terminal
/// states never change again.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not yet started
    #[default]
    #[display("pending")]
    Pending,
    /// Engine is executing the task
    #[display("running")]
    Running,
    /// Engine finished successfully
    #[display("completed")]
    Completed,
    /// Engine setup, invocation or retries failed
    #[display("failed")]
    Failed,
}

impl RunStatus {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
                // setup can fail before the run ever starts
                | (RunStatus::Pending, RunStatus::Failed)
        )
    }
}

/// Run metadata without the event bodies.
///
/// This is what history listings work with, and what the store keeps next to
/// each run's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier
    pub id: RunId,
    /// User-supplied task text
    pub task: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Lifecycle state
    #[serde(default)]
    pub status: RunStatus,
    /// Final answer, once the run completed with one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    /// Human-readable failure reason for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunSummary {
    /// Whether the run completed but no answer could be derived.
    pub fn missing_answer(&self) -> bool {
        self.status == RunStatus::Completed && self.final_answer.is_none()
    }
}

/// One execution of a user task.
///
/// Only the run driver mutates a run: it appends events in the order the
/// engine emitted them and moves the status forward.
///
/// # Examples
///
/// ```
/// use ensemble_core::{Event, Run, RunStatus};
///
/// let mut run = Run::new("Summarize customer feedback");
/// run.start().unwrap();
/// run.push_event(Event::new("Orchestrator", "Final Answer: done"));
/// run.complete(Some("done".to_string())).unwrap();
///
/// assert_eq!(*run.status(), RunStatus::Completed);
/// assert_eq!(run.final_answer().as_deref(), Some("done"));
/// assert!(run.start().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Run {
    /// Run identifier
    id: RunId,
    /// User-supplied task text, immutable
    task: String,
    /// Creation time, immutable
    created_at: DateTime<Utc>,
    /// Events in emission order
    events: Vec<Event>,
    /// Final answer, set at most once
    final_answer: Option<String>,
    /// Lifecycle state
    status: RunStatus,
    /// Failure reason for failed runs
    failure: Option<String>,
}

impl Run {
    /// Create a pending run for `task`, stamped with the current time.
    pub fn new(task: impl Into<String>) -> Self {
        Self::new_at(task, Utc::now())
    }

    /// Create a pending run with an explicit creation time.
    pub fn new_at(task: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let task = task.into();
        let id = RunId::generate(created_at, &task);
        debug!(run_id = %id, "Created run");
        Self {
            id,
            task,
            created_at,
            events: Vec::new(),
            final_answer: None,
            status: RunStatus::Pending,
            failure: None,
        }
    }

    /// Rebuild a run from persisted metadata and events.
    pub fn from_parts(summary: RunSummary, events: Vec<Event>) -> Self {
        Self {
            id: summary.id,
            task: summary.task,
            created_at: summary.created_at,
            events,
            final_answer: summary.final_answer,
            status: summary.status,
            failure: summary.failure,
        }
    }

    /// Metadata view of this run.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id.clone(),
            task: self.task.clone(),
            created_at: self.created_at,
            status: self.status,
            final_answer: self.final_answer.clone(),
            failure: self.failure.clone(),
        }
    }

    /// Move a pending run to running.
    pub fn start(&mut self) -> Result<(), RunError> {
        self.transition(RunStatus::Running)
    }

    /// Append an event. Events are never modified once appended.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Mark the run completed, recording its answer if there is one.
    pub fn complete(&mut self, final_answer: Option<String>) -> Result<(), RunError> {
        if self.final_answer.is_some() && final_answer.is_some() {
            return Err(RunError::new(RunErrorKind::InvalidState(format!(
                "final answer of {} already set",
                self.id
            ))));
        }
        self.transition(RunStatus::Completed)?;
        if final_answer.is_some() {
            self.final_answer = final_answer;
        }
        Ok(())
    }

    /// Mark the run failed with a human-readable reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), RunError> {
        self.transition(RunStatus::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), RunError> {
        if !self.status.can_transition_to(next) {
            return Err(RunError::new(RunErrorKind::InvalidState(format!(
                "{} cannot move from {} to {}",
                self.id, self.status, next
            ))));
        }
        debug!(run_id = %self.id, from = %self.status, to = %next, "Run status transition");
        self.status = next;
        Ok(())
    }
}
