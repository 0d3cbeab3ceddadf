use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::permission::{Origin, RequestToken};
use super::state::PreferenceKey;
use super::view::{Rect, ViewId};
use super::window::TabEntry;

/// Direction for cycling tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabDirection {
    Next,
    Previous,
}

/// Messages delivered to a window's chrome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Select the tab at `index`; -1 selects the last tab.
    TabClick { index: i32 },
    TabSelect { direction: TabDirection },
    EscapeFullScreen,
    RestoreRecentlyClosedTab,
    NewTab { url: String, follow: bool },
    /// A snapshot was restored into this window: open these tabs in order.
    ReplayTabs {
        tabs: Vec<TabEntry>,
        focus_index: Option<usize>,
    },
    PreferenceChanged {
        key: PreferenceKey,
        value: Value,
        origin: Option<Origin>,
    },
    PermissionRequest {
        token: RequestToken,
        requester: Origin,
        permission: String,
        label: String,
    },
    /// Ask the chrome to report its content rectangle via `view.set_bounds`.
    MeasureViewBounds,
    ViewBoundsChanged { view_id: ViewId, bounds: Rect },
    Reload,
}
