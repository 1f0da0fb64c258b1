//! Run history and session state for ensemble front ends.
//!
//! [`HistoryIndex`] is an in-memory catalog of the runs a transcript store
//! knows about, newest first. It is a cache: the store stays the source of
//! truth and [`HistoryIndex::refresh`] rebuilds it.
//!
//! [`SessionState`] holds what a front end would otherwise keep in globals
//! (the open run, expanded menus) and changes only through
//! [`SessionState::apply`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod format;
mod index;
mod session;

pub use format::{FormattedEvent, format_event, share_text};
pub use index::HistoryIndex;
pub use session::{SessionAction, SessionState};
