//! The windowing host seam.
//!
//! Everything that creates, closes or draws windows lives on the other side
//! of [`WindowHost`]. The core calls into the host synchronously; anything
//! the host reports later comes back as a [`HostEvent`].

pub mod stdio;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::errors::HostError;
use crate::types::notification::Notification;
use crate::types::view::{Rect, ViewId};
use crate::types::window::{DisplayState, Geometry, TabEntry, WindowId, WindowOptions};

/// Handle for a host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub u64);

/// How the process should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// State written, all windows drained.
    Normal,
    /// Startup could not produce a window.
    Failure,
    /// A restart-requiring setting was persisted; relaunch.
    Restart,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Normal | ExitStatus::Restart => 0,
            ExitStatus::Failure => 1,
        }
    }
}

/// Operations the core needs from the windowing host.
pub trait WindowHost {
    fn create_window(&mut self, options: &WindowOptions) -> Result<WindowId, HostError>;
    /// Requests a close; the host confirms later with [`HostEvent::WindowClosed`].
    fn close_window(&mut self, window: WindowId) -> Result<(), HostError>;
    fn focus_window(&mut self, window: WindowId) -> Result<(), HostError>;
    fn set_display_state(&mut self, window: WindowId, state: DisplayState) -> Result<(), HostError>;
    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), HostError>;
    fn register_accelerator(&mut self, window: WindowId, accelerator: &str) -> Result<(), HostError>;
    fn send(&mut self, window: WindowId, notification: &Notification) -> Result<(), HostError>;

    fn create_view(&mut self, window: WindowId, url: &str) -> Result<ViewId, HostError>;
    fn destroy_view(&mut self, view: ViewId) -> Result<(), HostError>;
    /// Views the host currently has attached to `window`.
    fn attached_views(&self, window: WindowId) -> Vec<ViewId>;
    fn add_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError>;
    fn remove_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError>;
    fn set_view_bounds(&mut self, view: ViewId, bounds: Rect) -> Result<(), HostError>;
    fn load_url(&mut self, view: ViewId, url: &str) -> Result<(), HostError>;

    /// Starts a timer that fires [`HostEvent::TimerFired`] after `period`,
    /// every `period` when `repeat` is set.
    fn start_timer(&mut self, period: Duration, repeat: bool) -> TimerId;
    fn cancel_timer(&mut self, timer: TimerId);

    fn exit(&mut self, status: ExitStatus);

    /// Sees every event before the core handles it.
    fn on_event(&mut self, _event: &HostEvent) {}
}

/// Things the host reports asynchronously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    WindowClosed {
        window_id: WindowId,
    },
    /// The window's chrome finished loading and can take tabs.
    ContentReady {
        window_id: WindowId,
    },
    WindowStateChanged {
        window_id: WindowId,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        display_state: Option<DisplayState>,
        #[serde(default)]
        focused: Option<bool>,
    },
    TabsChanged {
        window_id: WindowId,
        tabs: Vec<TabEntry>,
        current_tab_index: usize,
    },
    TimerFired {
        timer_id: TimerId,
    },
    AcceleratorTriggered {
        window_id: WindowId,
        accelerator: String,
    },
}
