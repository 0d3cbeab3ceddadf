use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a top-level window, assigned by the windowing host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Window position and size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

pub const DEFAULT_WIDTH: i32 = 1080;
pub const DEFAULT_HEIGHT: i32 = 720;
pub const MIN_WIDTH: i32 = 320;
pub const MIN_HEIGHT: i32 = 500;

/// Window-manager state of a window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

/// A tab as the window's chrome reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabEntry {
    pub url: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Where a window is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLifecycle {
    Open,
    /// Close requested; waiting for the host to confirm.
    Closing,
}

/// One-shot action run when a window's chrome first reports content-ready.
#[derive(Debug, Clone, PartialEq)]
pub enum FirstContent {
    /// Open a single focused `about:newtab` tab.
    NewTab,
    /// Open the given url.
    OpenUrl { url: String, follow: bool },
    /// Replay a persisted snapshot.
    Replay(super::snapshot::PersistedWindowSnapshot),
}

/// Options for opening a window.
///
/// `None` fields fall back to the defaults (1080x720, host-chosen position).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WindowOptions {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl WindowOptions {
    pub fn sized(width: i32, height: i32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn from_geometry(geometry: &Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
        }
    }

    /// Geometry the window will be created with, minimum size enforced.
    pub fn resolved_geometry(&self) -> Geometry {
        Geometry {
            x: self.x.unwrap_or(0),
            y: self.y.unwrap_or(0),
            width: self.width.unwrap_or(DEFAULT_WIDTH).max(MIN_WIDTH),
            height: self.height.unwrap_or(DEFAULT_HEIGHT).max(MIN_HEIGHT),
        }
    }
}

/// A top-level application window, owned by the window registry.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub geometry: Geometry,
    pub display_state: DisplayState,
    pub focused: bool,
    pub tabs: Vec<TabEntry>,
    pub current_tab_index: usize,
    pub title: Option<String>,
    pub lifecycle: WindowLifecycle,
    pub(crate) first_content: Option<FirstContent>,
    /// Creation order; later windows get larger values.
    pub(crate) created_seq: u64,
}

impl Window {
    pub fn is_closing(&self) -> bool {
        self.lifecycle == WindowLifecycle::Closing
    }
}
