//! Run lifecycle error types.

use std::time::Duration;

/// Error conditions raised while driving a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RunErrorKind {
    /// Engine setup failed; fatal to the run
    #[display("Engine initialization failed: {}", _0)]
    Init(String),
    /// A single event could not be decoded or persisted; the stream continues
    #[display("Event stream error: {}", _0)]
    Stream(String),
    /// The task invocation itself failed; fatal to the run
    #[display("Task invocation failed: {}", _0)]
    Invocation(String),
    /// The provider asked the caller to slow down
    #[display("Rate limited: {}", message)]
    RateLimited {
        /// Provider message, possibly containing a suggested wait
        message: String,
        /// Structured retry-after hint, when the provider supplied one
        retry_after: Option<Duration>,
    },
    /// Rate-limit retries were used up
    #[display("Retries exhausted after {} attempts: {}", attempts, last)]
    RetryExhausted {
        /// Total calls made
        attempts: u32,
        /// Message of the last rate-limit error
        last: String,
    },
    /// The run was cancelled before completion
    #[display("Run cancelled")]
    Cancelled,
    /// The run is not in a state that allows the requested operation
    #[display("Invalid run state: {}", _0)]
    InvalidState(String),
}

/// Run error with source location tracking.
///
/// # Examples
///
/// ```
/// use ensemble_error::{RunError, RunErrorKind};
///
/// let err = RunError::new(RunErrorKind::Init("missing OPENAI_API_KEY".to_string()));
/// assert!(format!("{}", err).contains("OPENAI_API_KEY"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Run Error: {} at line {} in {}", kind, line, file)]
pub struct RunError {
    /// The kind of error that occurred
    pub kind: RunErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RunError {
    /// Create a new RunError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RunErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
