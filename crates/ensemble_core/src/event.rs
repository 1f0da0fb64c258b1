//! Agent events emitted during a run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Literal marker the orchestrator uses to announce its answer.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// One message emitted by an agent during a run.
///
/// Fields other than `source` and `message` are kept in `extra` and written
/// back unchanged, so records produced by newer engines survive a round trip.
///
/// # Examples
///
/// ```
/// use ensemble_core::Event;
///
/// let event: Event = serde_json::from_str(
///     r#"{"source":"WebSurfer","message":"searching","timestamp":"12:00"}"#,
/// ).unwrap();
///
/// assert_eq!(event.source, "WebSurfer");
/// assert_eq!(event.extra["timestamp"], "12:00");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct Event {
    /// Emitting agent (free-form, usually a role name)
    #[serde(default)]
    pub source: String,
    /// Free-form text payload
    #[serde(default)]
    pub message: String,
    /// Any additional fields, preserved verbatim
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Map<String, JsonValue>,
}

impl Event {
    /// Create an event with no extra fields.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Creates a new event builder.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// Whether this record carries an agent message worth showing.
    ///
    /// Engines also log bookkeeping records without a source.
    pub fn is_displayable(&self) -> bool {
        !self.source.is_empty()
    }

    /// The answer this event announces, if it is a marked orchestrator message.
    ///
    /// Returns the text after the first [`FINAL_ANSWER_MARKER`], trimmed.
    pub fn final_answer(&self, orchestrator_role: &str) -> Option<&str> {
        if self.source != orchestrator_role {
            return None;
        }
        self.message
            .split_once(FINAL_ANSWER_MARKER)
            .map(|(_, answer)| answer.trim())
    }
}

/// Derive a run's final answer from its events.
///
/// Scans newest to oldest; the first orchestrator event containing the marker
/// decides. A marker followed only by whitespace counts as no answer.
///
/// # Examples
///
/// ```
/// use ensemble_core::{Event, derive_final_answer};
///
/// let events = vec![
///     Event::new("Orchestrator", "working..."),
///     Event::new("Orchestrator", "Final Answer: 42"),
/// ];
/// assert_eq!(derive_final_answer(&events, "Orchestrator").as_deref(), Some("42"));
/// assert_eq!(derive_final_answer(&events[..1], "Orchestrator"), None);
/// ```
pub fn derive_final_answer(events: &[Event], orchestrator_role: &str) -> Option<String> {
    events
        .iter()
        .rev()
        .find_map(|event| event.final_answer(orchestrator_role))
        .filter(|answer| !answer.is_empty())
        .map(str::to_string)
}
