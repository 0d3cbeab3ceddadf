//! Window Registry for TabHost.
//!
//! The authoritative map of window identity to window record. A window enters
//! the registry when the host creates it and leaves only when the host
//! confirms it closed; in between it may be marked `Closing`.

use std::collections::btree_map::Values;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::host::WindowHost;
use crate::types::errors::WindowError;
use crate::types::notification::Notification;
use crate::types::window::{
    DisplayState, FirstContent, Geometry, TabEntry, Window, WindowId, WindowLifecycle,
    WindowOptions,
};

#[derive(Default)]
pub struct WindowRegistry {
    windows: BTreeMap<WindowId, Window>,
    next_created_seq: u64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a window through the host, binds `accelerators` to it and
    /// registers it. `first_content` runs at the window's first content-ready.
    ///
    /// The record is removed again by [`WindowRegistry::remove`] once the host
    /// reports the window closed.
    pub fn open(
        &mut self,
        host: &mut dyn WindowHost,
        options: &WindowOptions,
        first_content: FirstContent,
        accelerators: &[&str],
    ) -> Result<WindowId, WindowError> {
        let geometry = options.resolved_geometry();
        let id = host.create_window(options)?;

        for accelerator in accelerators {
            if let Err(e) = host.register_accelerator(id, accelerator) {
                warn!(window = %id, accelerator, "failed to register accelerator: {}", e);
            }
        }

        let window = Window {
            id,
            geometry,
            display_state: DisplayState::Normal,
            focused: false,
            tabs: Vec::new(),
            current_tab_index: 0,
            title: None,
            lifecycle: WindowLifecycle::Open,
            first_content: Some(first_content),
            created_seq: self.next_created_seq,
        };
        self.next_created_seq += 1;
        self.windows.insert(id, window);
        debug!(window = %id, count = self.windows.len(), "window opened");
        Ok(id)
    }

    /// Marks the window closing and asks the host to close it.
    pub fn close(&mut self, host: &mut dyn WindowHost, id: WindowId) -> Result<(), WindowError> {
        let window = self.windows.get_mut(&id).ok_or(WindowError::NotFound(id))?;
        if window.is_closing() {
            return Err(WindowError::AlreadyClosing(id));
        }
        window.lifecycle = WindowLifecycle::Closing;
        host.close_window(id)?;
        Ok(())
    }

    /// Drops a window the host confirmed closed.
    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        let removed = self.windows.remove(&id);
        if removed.is_some() {
            debug!(window = %id, count = self.windows.len(), "window removed");
        }
        removed
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    /// Live view of the open set. Holding it borrows the registry, so callers
    /// that act on windows while iterating take [`WindowRegistry::ids`] first.
    pub fn all(&self) -> Values<'_, WindowId, Window> {
        self.windows.values()
    }

    /// Point-in-time copy of the registered ids, ascending.
    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    /// Windows in creation order.
    pub fn in_creation_order(&self) -> Vec<&Window> {
        let mut windows: Vec<&Window> = self.windows.values().collect();
        windows.sort_by_key(|w| w.created_seq);
        windows
    }

    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.windows.values().find(|w| w.focused).map(|w| w.id)
    }

    /// Records host-reported geometry, display state and focus. A window
    /// gaining focus clears focus on every other window.
    pub fn update_state(
        &mut self,
        id: WindowId,
        geometry: Option<Geometry>,
        display_state: Option<DisplayState>,
        focused: Option<bool>,
    ) -> Result<(), WindowError> {
        let window = self.windows.get_mut(&id).ok_or(WindowError::NotFound(id))?;
        if let Some(geometry) = geometry {
            window.geometry = geometry;
        }
        if let Some(display_state) = display_state {
            window.display_state = display_state;
        }
        if let Some(focused) = focused {
            window.focused = focused;
            if focused {
                for other in self.windows.values_mut().filter(|w| w.id != id) {
                    other.focused = false;
                }
            }
        }
        Ok(())
    }

    pub fn update_tabs(
        &mut self,
        id: WindowId,
        tabs: Vec<TabEntry>,
        current_tab_index: usize,
    ) -> Result<(), WindowError> {
        let window = self.windows.get_mut(&id).ok_or(WindowError::NotFound(id))?;
        window.tabs = tabs;
        window.current_tab_index = current_tab_index;
        Ok(())
    }

    pub fn set_title(
        &mut self,
        host: &mut dyn WindowHost,
        id: WindowId,
        title: &str,
    ) -> Result<(), WindowError> {
        let window = self.windows.get_mut(&id).ok_or(WindowError::NotFound(id))?;
        host.set_title(id, title)?;
        window.title = Some(title.to_string());
        Ok(())
    }

    /// Takes the window's one-shot first-content action.
    pub fn take_first_content(&mut self, id: WindowId) -> Option<FirstContent> {
        self.windows.get_mut(&id).and_then(|w| w.first_content.take())
    }

    /// Sends `notification` to every window registered when the call starts.
    /// Delivery failures (a window closing mid-broadcast) are dropped.
    /// Returns how many windows accepted the message.
    pub fn broadcast(&self, host: &mut dyn WindowHost, notification: &Notification) -> usize {
        let mut delivered = 0;
        for id in self.ids() {
            match host.send(id, notification) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(window = %id, "broadcast dropped: {}", e),
            }
        }
        delivered
    }
}
