use serde::Serialize;

use crate::db::SessionRecord;

use super::format::format_history;

/// Controller-owned view of the tracked sessions. Only the tracker's worker
/// task ever mutates it.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    pub current: Option<SessionRecord>,
    pub history: Vec<SessionRecord>,
    formatted_history: Vec<String>,
    pub initialized: bool,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts the latest stored record as the current session only while it
    /// is still active.
    pub fn seed_current(&mut self, latest: Option<SessionRecord>) {
        self.current = latest.filter(SessionRecord::is_active);
    }

    /// Replaces the history; the formatted projection is rebuilt only when
    /// the records actually changed.
    pub fn set_history(&mut self, history: Vec<SessionRecord>) {
        if history == self.history {
            return;
        }
        self.formatted_history = format_history(&history);
        self.history = history;
    }

    pub fn can_start(&self) -> bool {
        self.current.is_none()
    }

    pub fn can_stop(&self) -> bool {
        self.current.is_some()
    }

    pub fn can_clear(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            current: self.current.clone(),
            history: self.history.clone(),
            formatted_history: self.formatted_history.clone(),
            can_start: self.can_start(),
            can_stop: self.can_stop(),
            can_clear: self.can_clear(),
            initialized: self.initialized,
        }
    }
}

/// Everything the display observes about the tracker, published as one value
/// so the derived flags always change together.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub current: Option<SessionRecord>,
    pub history: Vec<SessionRecord>,
    pub formatted_history: Vec<String>,
    pub can_start: bool,
    pub can_stop: bool,
    pub can_clear: bool,
    /// Set once the startup lookup of an in-flight session has finished.
    pub initialized: bool,
}

impl Default for TrackerSnapshot {
    fn default() -> Self {
        TrackerState::new().snapshot()
    }
}
