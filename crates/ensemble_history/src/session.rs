//! Front-end session state as an explicit value.

use derive_getters::Getters;
use ensemble_core::RunId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Something the user did that changes what the front end shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    /// Back to the new-task form
    NewChat,
    /// A new run was submitted and is now live
    Started(RunId),
    /// Open a past run
    Select(RunId),
    /// Expand or collapse a run's menu
    ToggleMenu(RunId),
    /// Browse a run's files
    ViewFiles(RunId),
    /// Leave the files view
    CloseFiles,
    /// A run was deleted
    Removed(RunId),
    /// A run reached a terminal state
    RunFinished(RunId),
}

/// What the front end currently shows.
///
/// Transitions are pure: [`apply`](Self::apply) consumes the state and
/// returns the next one.
///
/// # Examples
///
/// ```
/// use ensemble_core::Run;
/// use ensemble_history::{SessionAction, SessionState};
///
/// let run = Run::new("Web Research");
/// let state = SessionState::default()
///     .apply(SessionAction::Started(run.id().clone()))
///     .apply(SessionAction::RunFinished(run.id().clone()));
///
/// assert_eq!(state.selected().as_ref(), Some(run.id()));
/// assert!(*state.task_completed());
///
/// let state = state.apply(SessionAction::Removed(run.id().clone()));
/// assert_eq!(state.selected(), &None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct SessionState {
    /// Run being shown, `None` on the new-task form
    selected: Option<RunId>,
    /// Whether the shown run is finished (history view) rather than live
    task_completed: bool,
    /// Runs whose menu is expanded
    open_menus: BTreeSet<RunId>,
    /// Run whose files are being browsed
    viewing_files: Option<RunId>,
}

impl SessionState {
    /// Compute the state after `action`.
    pub fn apply(mut self, action: SessionAction) -> Self {
        match action {
            SessionAction::NewChat => {
                self.selected = None;
                self.task_completed = false;
                self.viewing_files = None;
            }
            SessionAction::Started(id) => {
                self.selected = Some(id);
                self.task_completed = false;
                self.viewing_files = None;
            }
            SessionAction::Select(id) => {
                self.open_menus.remove(&id);
                self.selected = Some(id);
                self.task_completed = true;
                self.viewing_files = None;
            }
            SessionAction::ToggleMenu(id) => {
                if !self.open_menus.remove(&id) {
                    self.open_menus.insert(id);
                }
            }
            SessionAction::ViewFiles(id) => {
                self.open_menus.remove(&id);
                self.viewing_files = Some(id);
            }
            SessionAction::CloseFiles => {
                self.viewing_files = None;
            }
            SessionAction::Removed(id) => {
                self.open_menus.remove(&id);
                if self.selected.as_ref() == Some(&id) {
                    self.selected = None;
                    self.task_completed = false;
                }
                if self.viewing_files.as_ref() == Some(&id) {
                    self.viewing_files = None;
                }
            }
            SessionAction::RunFinished(id) => {
                if self.selected.as_ref() == Some(&id) {
                    self.task_completed = true;
                }
            }
        }
        self
    }

    /// Whether `id`'s menu is expanded.
    pub fn menu_open(&self, id: &RunId) -> bool {
        self.open_menus.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> RunId {
        name.parse().unwrap()
    }

    #[test]
    fn toggle_menu_flips() {
        let a = id("20250101_00000000_a");
        let state = SessionState::default().apply(SessionAction::ToggleMenu(a.clone()));
        assert!(state.menu_open(&a));
        let state = state.apply(SessionAction::ToggleMenu(a.clone()));
        assert!(!state.menu_open(&a));
    }

    #[test]
    fn removing_other_run_keeps_selection() {
        let a = id("20250101_00000000_a");
        let b = id("20250101_00000000_b");
        let state = SessionState::default()
            .apply(SessionAction::Select(a.clone()))
            .apply(SessionAction::ToggleMenu(b.clone()))
            .apply(SessionAction::Removed(b.clone()));
        assert_eq!(state.selected(), &Some(a));
        assert!(*state.task_completed());
        assert!(!state.menu_open(&b));
    }

    #[test]
    fn finishing_unselected_run_changes_nothing() {
        let a = id("20250101_00000000_a");
        let b = id("20250101_00000000_b");
        let before = SessionState::default().apply(SessionAction::Started(a));
        let after = before.clone().apply(SessionAction::RunFinished(b));
        assert_eq!(before, after);
    }

    #[test]
    fn files_view_opens_and_closes() {
        let a = id("20250101_00000000_a");
        let state = SessionState::default()
            .apply(SessionAction::ToggleMenu(a.clone()))
            .apply(SessionAction::ViewFiles(a.clone()));
        assert_eq!(state.viewing_files(), &Some(a.clone()));
        assert!(!state.menu_open(&a));
        let state = state.apply(SessionAction::CloseFiles);
        assert_eq!(state.viewing_files(), &None);
    }

    #[test]
    fn new_chat_clears_selection() {
        let a = id("20250101_00000000_a");
        let state = SessionState::default()
            .apply(SessionAction::Select(a))
            .apply(SessionAction::NewChat);
        assert_eq!(state.selected(), &None);
        assert!(!*state.task_completed());
    }
}
