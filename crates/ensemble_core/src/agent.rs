//! Well-known agent roles of the orchestration team.

/// An agent role, recognised from an event's `source`.
///
/// # Examples
///
/// ```
/// use ensemble_core::AgentRole;
///
/// assert_eq!(AgentRole::from_source("WebSurfer (thinking)"), AgentRole::WebSurfer);
/// assert_eq!(AgentRole::from_source("Planner"), AgentRole::Other);
/// assert_eq!(AgentRole::Coder.icon(), "💻");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter, derive_more::Display,
)]
pub enum AgentRole {
    /// Plans the task and coordinates the other agents
    Orchestrator,
    /// Browses the web
    WebSurfer,
    /// Reads local files
    FileSurfer,
    /// Writes code
    Coder,
    /// Executes code and shell commands
    ComputerTerminal,
    /// Any agent not known here
    Other,
}

impl AgentRole {
    /// Recognise a role from the first word of an event source.
    pub fn from_source(source: &str) -> Self {
        match source.split_whitespace().next().unwrap_or_default() {
            "Orchestrator" => AgentRole::Orchestrator,
            "WebSurfer" => AgentRole::WebSurfer,
            "FileSurfer" => AgentRole::FileSurfer,
            "Coder" => AgentRole::Coder,
            "ComputerTerminal" => AgentRole::ComputerTerminal,
            _ => AgentRole::Other,
        }
    }

    /// Icon shown next to this role's messages.
    pub fn icon(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "🎯",
            AgentRole::WebSurfer => "🌐",
            AgentRole::FileSurfer => "📁",
            AgentRole::Coder => "💻",
            AgentRole::ComputerTerminal => "⌨️",
            AgentRole::Other => "🤖",
        }
    }

    /// One-line description of what the role does.
    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "Coordinates tasks",
            AgentRole::WebSurfer => "Finds web info",
            AgentRole::FileSurfer => "Manages files",
            AgentRole::Coder => "Writes code",
            AgentRole::ComputerTerminal => "Runs code and commands",
            AgentRole::Other => "Assists the team",
        }
    }
}
