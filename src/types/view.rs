use std::fmt;

use serde::{Deserialize, Serialize};

use super::window::WindowId;

/// Identity of a content view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

impl ViewId {
    /// Raw value callers send to mean "no view".
    pub const NONE_SENTINEL: i64 = -1;

    /// Interprets a raw id from a caller. The sentinel and other negative
    /// values map to `None`.
    pub fn from_raw(raw: i64) -> Option<ViewId> {
        if raw < 0 {
            None
        } else {
            Some(ViewId(raw as u64))
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rectangle relative to the owner window's client area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Bounds for a view below chrome of height `self.y`: the height is
    /// `height - y + 1` so the view never runs past the bottom edge.
    /// Saturates at the `i32` limits.
    pub fn clamped_below_chrome(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height.saturating_sub(self.y).saturating_add(1),
        }
    }
}

/// The content-rendering surface attached to a window.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserView {
    pub id: ViewId,
    /// Window the view was created for.
    pub home_window: WindowId,
    pub owner_window_id: Option<WindowId>,
    pub bounds: Option<Rect>,
    pub url: String,
}
