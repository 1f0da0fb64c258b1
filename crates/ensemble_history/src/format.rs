//! Text renderings of runs and events.

use ensemble_core::{AgentRole, Event, RunSummary};
use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'`]+"#).unwrap_or_else(|e| panic!("invalid URL pattern: {e}"))
});

/// An event prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEvent {
    /// Icon of the emitting agent
    pub icon: &'static str,
    /// Emitting agent, as recorded
    pub source: String,
    /// Message text
    pub body: String,
    /// Links mentioned in the message, in order of appearance
    pub urls: Vec<String>,
}

impl std::fmt::Display for FormattedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}\n{}", self.icon, self.source, self.body)
    }
}

/// Prepare an event for display.
///
/// # Examples
///
/// ```
/// use ensemble_core::Event;
/// use ensemble_history::format_event;
///
/// let formatted = format_event(&Event::new("WebSurfer (browser)", "See https://docs.rs."));
/// assert_eq!(formatted.icon, "🌐");
/// assert_eq!(formatted.urls, vec!["https://docs.rs".to_string()]);
/// ```
pub fn format_event(event: &Event) -> FormattedEvent {
    let urls = URL_PATTERN
        .find_iter(&event.message)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']']))
        .filter(|url| !url.ends_with("://"))
        .map(str::to_string)
        .collect();

    FormattedEvent {
        icon: AgentRole::from_source(&event.source).icon(),
        source: event.source.clone(),
        body: event.message.clone(),
        urls,
    }
}

/// Plain-text summary of a run for sharing.
///
/// ```text
/// Task: Web Research
/// Timestamp: 2025-03-14 09:26:53
///
/// Final Answer: 42
/// ```
pub fn share_text(summary: &RunSummary) -> String {
    let mut text = format!(
        "Task: {}\nTimestamp: {}\n\n",
        summary.task,
        summary.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(answer) = &summary.final_answer {
        text.push_str(&format!("Final Answer: {}\n", answer));
    }
    text
}
