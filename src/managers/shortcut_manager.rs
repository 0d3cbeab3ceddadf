//! Shortcut Manager for TabHost.
//!
//! Holds the keyboard accelerators every window gets at open time and the
//! notification each one sends to the window's chrome. `CmdOrCtrl` is
//! resolved per platform before binding.

use std::collections::BTreeMap;

use crate::platform;
use crate::types::errors::ShortcutError;
use crate::types::notification::{Notification, TabDirection};

/// Trait defining shortcut management operations.
pub trait ShortcutManagerTrait {
    fn register_shortcut(&mut self, accelerator: &str, action: Notification) -> Result<(), ShortcutError>;
    fn action_for(&self, accelerator: &str) -> Option<&Notification>;
    fn accelerators(&self) -> Vec<&str>;
    fn has_conflict(&self, accelerator: &str) -> bool;
    fn reset_to_defaults(&mut self);
}

/// Accelerator table shared by all windows.
pub struct ShortcutManager {
    bindings: BTreeMap<String, Notification>,
}

impl ShortcutManager {
    pub fn new() -> Self {
        Self {
            bindings: Self::default_bindings(),
        }
    }

    /// Tab shortcuts, fullscreen escape and reopen-closed-tab; tab cycling
    /// is bound explicitly outside macOS, where the menu does not provide it.
    pub fn default_bindings() -> BTreeMap<String, Notification> {
        let mut bindings = BTreeMap::new();
        for index in 1..9 {
            bindings.insert(
                platform::resolve_accelerator(&format!("CmdOrCtrl+{}", index)),
                Notification::TabClick { index: index - 1 },
            );
        }
        if !platform::is_macos() {
            bindings.insert(
                "Ctrl+Tab".to_string(),
                Notification::TabSelect { direction: TabDirection::Next },
            );
            bindings.insert(
                "Ctrl+Shift+Tab".to_string(),
                Notification::TabSelect { direction: TabDirection::Previous },
            );
        }
        bindings.insert("Escape".to_string(), Notification::EscapeFullScreen);
        // 9 always jumps to the last tab
        bindings.insert(
            platform::resolve_accelerator("CmdOrCtrl+9"),
            Notification::TabClick { index: -1 },
        );
        bindings.insert(
            platform::resolve_accelerator("CmdOrCtrl+Shift+T"),
            Notification::RestoreRecentlyClosedTab,
        );
        bindings
    }
}

impl Default for ShortcutManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcutManagerTrait for ShortcutManager {
    fn register_shortcut(&mut self, accelerator: &str, action: Notification) -> Result<(), ShortcutError> {
        if accelerator.trim().is_empty() {
            return Err(ShortcutError::InvalidKeys("Accelerator cannot be empty".to_string()));
        }
        let resolved = platform::resolve_accelerator(accelerator);
        if self.has_conflict(&resolved) {
            return Err(ShortcutError::Conflict(resolved));
        }
        self.bindings.insert(resolved, action);
        Ok(())
    }

    fn action_for(&self, accelerator: &str) -> Option<&Notification> {
        self.bindings
            .get(accelerator)
            .or_else(|| self.bindings.get(&platform::resolve_accelerator(accelerator)))
    }

    fn accelerators(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    fn has_conflict(&self, accelerator: &str) -> bool {
        self.bindings
            .contains_key(&platform::resolve_accelerator(accelerator))
    }

    fn reset_to_defaults(&mut self) {
        self.bindings = Self::default_bindings();
    }
}
