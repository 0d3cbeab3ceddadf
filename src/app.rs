//! App Core for TabHost.
//!
//! Central struct holding the host and every manager. Built once at launch;
//! all requests and host events go through it on one control thread.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::HostConfig;
use crate::host::{ExitStatus, HostEvent, TimerId, WindowHost};
use crate::managers::persistence_manager::{PersistenceManager, SaveOutcome};
use crate::managers::restore_flow::RestoreFlow;
use crate::managers::settings_gate::SettingsGate;
use crate::managers::shortcut_manager::{ShortcutManager, ShortcutManagerTrait};
use crate::managers::view_manager::{AttachOutcome, ViewManager, ViewManagerTrait};
use crate::managers::window_registry::WindowRegistry;
use crate::platform;
use crate::services::state_store::StateStore;
use crate::types::errors::{GateError, PersistenceError, RestoreError, ViewError, WindowError};
use crate::types::notification::Notification;
use crate::types::permission::{Origin, PermissionOutcome, RequestToken, RestartMutation};
use crate::types::snapshot::PersistedWindowSnapshot;
use crate::types::state::PreferenceKey;
use crate::types::view::{Rect, ViewId};
use crate::types::window::{DisplayState, FirstContent, WindowId, WindowOptions};

/// Size of windows opened for a single url.
pub const URL_WINDOW_WIDTH: i32 = 800;
pub const URL_WINDOW_HEIGHT: i32 = 500;

/// Central application struct holding the host and all managers.
pub struct App<H: WindowHost> {
    pub host: H,
    pub config: HostConfig,
    pub registry: WindowRegistry,
    pub views: ViewManager,
    pub persistence: PersistenceManager,
    pub restore: RestoreFlow,
    pub gate: SettingsGate,
    pub shortcuts: ShortcutManager,
    online: bool,
    retry_timer: Option<TimerId>,
}

impl<H: WindowHost> App<H> {
    pub fn new(host: H, config: HostConfig) -> Self {
        let store = StateStore::new(&config.profile_dir, &config.relocation_dir);
        let gate = SettingsGate::new(config.permission_timeout());
        Self {
            host,
            registry: WindowRegistry::new(),
            views: ViewManager::new(),
            persistence: PersistenceManager::new(store.clone()),
            restore: RestoreFlow::new(store),
            gate,
            shortcuts: ShortcutManager::new(),
            config,
            online: true,
            retry_timer: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Startup sequence: load state (defaults on any read problem), then
    /// open the first window. If that window cannot be created the host is
    /// told to exit with a failure status.
    pub fn startup(&mut self) -> Result<WindowId, WindowError> {
        let state = self.persistence.load_or_default();
        info!(
            language = %state.language,
            saved_windows = state.windows.len(),
            "state loaded"
        );

        match self.open_window(WindowOptions::default()) {
            Ok(id) => Ok(id),
            Err(e) => {
                error!("Could not create the first window: {}", e);
                self.host.exit(ExitStatus::Failure);
                Err(e)
            }
        }
    }

    // ─── Windows ───

    fn open_with(&mut self, options: &WindowOptions, first: FirstContent) -> Result<WindowId, WindowError> {
        let accelerators = self.shortcuts.accelerators();
        let id = self.registry.open(&mut self.host, options, first, &accelerators)?;
        // Autosave begins with the first window of the process
        self.persistence
            .autosave_start(&mut self.host, self.config.autosave_interval());
        Ok(id)
    }

    /// Opens a window whose first content is a single new tab.
    pub fn open_window(&mut self, options: WindowOptions) -> Result<WindowId, WindowError> {
        self.open_with(&options, FirstContent::NewTab)
    }

    /// Opens an 800x500 window showing `url`.
    pub fn open_window_with_url(&mut self, url: &str, follow: bool) -> Result<WindowId, WindowError> {
        self.open_with(
            &WindowOptions::sized(URL_WINDOW_WIDTH, URL_WINDOW_HEIGHT),
            FirstContent::OpenUrl {
                url: url.to_string(),
                follow,
            },
        )
    }

    pub fn close_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        self.registry.close(&mut self.host, id)
    }

    pub fn set_window_title(&mut self, id: WindowId, title: &str) -> Result<(), WindowError> {
        self.registry.set_title(&mut self.host, id, title)
    }

    /// Opens a window when none is open (re-activation on macOS).
    pub fn activate(&mut self) -> Result<Option<WindowId>, WindowError> {
        if !self.registry.is_empty() || self.persistence.is_shutting_down() {
            return Ok(None);
        }
        self.open_window(WindowOptions::default()).map(Some)
    }

    /// A second launch was attempted: bring the oldest window forward.
    pub fn second_instance(&mut self) -> Option<WindowId> {
        let (id, minimized) = self
            .registry
            .in_creation_order()
            .first()
            .map(|w| (w.id, w.display_state == DisplayState::Minimized))?;
        if minimized {
            if let Err(e) = self.host.set_display_state(id, DisplayState::Normal) {
                warn!(window = %id, "restore from minimized failed: {}", e);
            } else if let Err(e) =
                self.registry
                    .update_state(id, None, Some(DisplayState::Normal), None)
            {
                debug!(window = %id, "display state not recorded: {}", e);
            }
        }
        if let Err(e) = self.host.focus_window(id) {
            warn!(window = %id, "focus failed: {}", e);
        }
        Some(id)
    }

    /// Records connectivity; coming back online reloads every window.
    pub fn set_online(&mut self, online: bool) -> usize {
        let was_online = std::mem::replace(&mut self.online, online);
        if online && !was_online {
            info!("back online, reloading windows");
            return self.registry.broadcast(&mut self.host, &Notification::Reload);
        }
        0
    }

    // ─── Views ───

    pub fn create_view(&mut self, window: WindowId, url: &str) -> Result<ViewId, ViewError> {
        self.views
            .create_view(&mut self.host, &self.registry, window, url)
    }

    pub fn destroy_view(&mut self, view: Option<ViewId>) -> Result<(), ViewError> {
        if let Some(id) = view {
            self.gate.discard_for_view(&mut self.host, id);
        }
        self.views.destroy_view(&mut self.host, view).map(|_| ())
    }

    pub fn attach_view(&mut self, window: WindowId, view: Option<ViewId>) -> Result<AttachOutcome, ViewError> {
        self.views
            .attach(&mut self.host, &self.registry, window, view)
    }

    pub fn set_view_bounds(&mut self, window: WindowId, rect: Rect) -> Result<Option<(ViewId, Rect)>, ViewError> {
        self.views.set_bounds(&mut self.host, window, rect)
    }

    pub fn navigate_view(&mut self, view: ViewId, url: &str) -> Result<(), ViewError> {
        self.views.navigate(&mut self.host, view, url)
    }

    // ─── Preferences ───

    pub fn preference(&self, key: PreferenceKey) -> Value {
        self.persistence.state().preference(key)
    }

    /// Stores a preference and pushes the new value to every open window.
    pub fn set_preference(
        &mut self,
        key: PreferenceKey,
        value: Value,
        origin: Option<Origin>,
    ) -> Result<usize, PersistenceError> {
        self.persistence.set_preference(key, value)?;
        let changed = Notification::PreferenceChanged {
            key,
            value: self.preference(key),
            origin,
        };
        Ok(self.registry.broadcast(&mut self.host, &changed))
    }

    pub fn language(&self) -> String {
        self.persistence.read_language()
    }

    pub fn request_language_change(
        &mut self,
        origin: Origin,
        lang: &str,
        label: &str,
    ) -> Result<RequestToken, GateError> {
        let mutation = RestartMutation::Language {
            lang: lang.to_string(),
            label: label.to_string(),
        };
        self.gate
            .request(&mut self.host, &self.registry, origin, mutation)
    }

    /// Resolves a permission prompt. A grant persists the value and starts
    /// the shutdown that ends in a restart.
    pub fn respond_permission(&mut self, token: RequestToken, accept: bool) -> Result<PermissionOutcome, GateError> {
        let outcome = self
            .gate
            .respond(&mut self.host, &mut self.persistence, token, accept)?;
        if outcome == PermissionOutcome::Granted {
            self.request_quit()?;
        }
        Ok(outcome)
    }

    // ─── Snapshots ───

    pub fn list_snapshots(&self) -> Result<Vec<PersistedWindowSnapshot>, RestoreError> {
        self.restore.list_snapshots()
    }

    pub fn restore_snapshot(&mut self, path: &Path) -> Result<Option<WindowId>, RestoreError> {
        let Some(snapshot) = self.restore.load_snapshot(path)? else {
            return Ok(None);
        };
        let accelerators = self.shortcuts.accelerators();
        let id = self
            .restore
            .restore(&mut self.host, &mut self.registry, &accelerators, &snapshot)?;
        if id.is_some() {
            self.persistence
                .autosave_start(&mut self.host, self.config.autosave_interval());
        }
        Ok(id)
    }

    pub fn restore_all(&mut self) -> Result<Vec<WindowId>, RestoreError> {
        let accelerators = self.shortcuts.accelerators();
        let opened = self
            .restore
            .restore_all(&mut self.host, &mut self.registry, &accelerators)?;
        if !opened.is_empty() {
            self.persistence
                .autosave_start(&mut self.host, self.config.autosave_interval());
        }
        Ok(opened)
    }

    // ─── Shutdown ───

    /// Stops autosave and starts the hard save.
    pub fn request_quit(&mut self) -> Result<SaveOutcome, PersistenceError> {
        self.persistence.autosave_stop(&mut self.host);
        let outcome = self
            .persistence
            .save(false, &mut self.host, &mut self.registry)?;
        self.apply_save_outcome(&outcome);
        Ok(outcome)
    }

    /// The shell disconnected. Finishes whatever save is outstanding, or
    /// does a soft save, and records the exit. A write that still fails
    /// exits with [`ExitStatus::Failure`].
    pub fn disconnect(&mut self) -> ExitStatus {
        self.persistence.autosave_stop(&mut self.host);
        let outcome = match self.persistence.finish_on_disconnect() {
            Some(outcome) => Ok(outcome),
            None => self
                .persistence
                .save(true, &mut self.host, &mut self.registry),
        };
        let status = match outcome {
            Ok(SaveOutcome::RestartReady) => ExitStatus::Restart,
            Ok(SaveOutcome::WriteFailed) => ExitStatus::Failure,
            Ok(_) => ExitStatus::Normal,
            Err(e) => {
                error!("Final save failed: {}", e);
                ExitStatus::Failure
            }
        };
        self.host.exit(status);
        status
    }

    fn apply_save_outcome(&mut self, outcome: &SaveOutcome) {
        match outcome {
            SaveOutcome::Completed { exit: Some(status) } => self.host.exit(*status),
            SaveOutcome::RestartReady => self.host.exit(ExitStatus::Restart),
            SaveOutcome::WriteFailed if self.retry_timer.is_none() => {
                let timer = self
                    .host
                    .start_timer(self.config.autosave_interval(), false);
                self.retry_timer = Some(timer);
            }
            _ => {}
        }
    }

    // ─── Host events ───

    pub fn handle_event(&mut self, event: HostEvent) {
        self.host.on_event(&event);
        match event {
            HostEvent::WindowClosed { window_id } => self.on_window_closed(window_id),
            HostEvent::ContentReady { window_id } => self.on_content_ready(window_id),
            HostEvent::WindowStateChanged {
                window_id,
                geometry,
                display_state,
                focused,
            } => {
                if let Err(e) = self
                    .registry
                    .update_state(window_id, geometry, display_state, focused)
                {
                    debug!("state update ignored: {}", e);
                }
            }
            HostEvent::TabsChanged {
                window_id,
                tabs,
                current_tab_index,
            } => {
                if let Err(e) = self.registry.update_tabs(window_id, tabs, current_tab_index) {
                    debug!("tab update ignored: {}", e);
                }
            }
            HostEvent::TimerFired { timer_id } => self.on_timer(timer_id),
            HostEvent::AcceleratorTriggered {
                window_id,
                accelerator,
            } => {
                let Some(action) = self.shortcuts.action_for(&accelerator).cloned() else {
                    debug!(accelerator = %accelerator, "no binding");
                    return;
                };
                if let Err(e) = self.host.send(window_id, &action) {
                    debug!(window = %window_id, "accelerator action dropped: {}", e);
                }
            }
        }
    }

    fn on_window_closed(&mut self, window_id: WindowId) {
        if self.registry.remove(window_id).is_none() {
            debug!(window = %window_id, "close for unknown window");
        }
        self.views.forget_window(window_id);
        self.restore.release_window(window_id);
        self.gate.discard_for_window(&mut self.host, window_id);

        if let Some(outcome) = self.persistence.on_window_closed(window_id) {
            self.apply_save_outcome(&outcome);
            return;
        }

        if self.registry.is_empty() && !self.persistence.is_shutting_down() && !platform::is_macos() {
            info!("last window closed, quitting");
            if let Err(e) = self.request_quit() {
                error!("Quit after last window failed: {}", e);
            }
        }
    }

    fn on_content_ready(&mut self, window_id: WindowId) {
        let Some(first) = self.registry.take_first_content(window_id) else {
            return;
        };
        let result = match first {
            FirstContent::NewTab => {
                let url = self.persistence.state().tab_config.default_url.clone();
                self.host
                    .send(window_id, &Notification::NewTab { url, follow: true })
            }
            FirstContent::OpenUrl { url, follow } => self
                .host
                .send(window_id, &Notification::NewTab { url, follow }),
            FirstContent::Replay(snapshot) => {
                self.restore
                    .complete_replay(&mut self.host, window_id, &snapshot);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(window = %window_id, "first content not delivered: {}", e);
        }
    }

    fn on_timer(&mut self, timer_id: TimerId) {
        if self.retry_timer == Some(timer_id) {
            self.retry_timer = None;
            if let Some(outcome) = self.persistence.retry_pending() {
                self.apply_save_outcome(&outcome);
            }
        } else if self.persistence.is_autosave_timer(timer_id) {
            let outcome = self
                .persistence
                .save(true, &mut self.host, &mut self.registry);
            if let Err(e) = outcome {
                warn!("Autosave failed: {}", e);
            }
        } else if let Some(outcome) = self.gate.on_timer(timer_id) {
            debug!(?outcome, "permission request resolved by timer");
        }
    }
}
