use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::window::{DisplayState, Geometry, TabEntry, Window};

/// A window's state captured at hard-save time, one file per window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedWindowSnapshot {
    /// Sequence id, also embedded in the filename.
    pub window_id: u64,
    pub geometry: Geometry,
    #[serde(default)]
    pub display_state: DisplayState,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<TabEntry>,
    #[serde(default)]
    pub current_tab_index: usize,
    /// File the snapshot was read from; never serialized.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl PersistedWindowSnapshot {
    /// Captures `window` under the given sequence id.
    pub fn capture(window: &Window, sequence: u64) -> Self {
        Self {
            window_id: sequence,
            geometry: window.geometry,
            display_state: window.display_state,
            focused: window.focused,
            tabs: window.tabs.clone(),
            current_tab_index: window.current_tab_index,
            path: None,
        }
    }

    /// Index of the tab that should receive focus after replay, if any.
    pub fn focus_index(&self) -> Option<usize> {
        if self.current_tab_index < self.tabs.len() {
            Some(self.current_tab_index)
        } else {
            None
        }
    }
}
