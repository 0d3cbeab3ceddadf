//! Window Restore Flow for TabHost.
//!
//! Lists the per-window snapshots left by the last hard save, newest first,
//! and reopens a window for each. Tabs are replayed at the new window's first
//! content-ready; the snapshot file is moved out of the profile directory
//! only after the replay was delivered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::host::WindowHost;
use crate::managers::window_registry::WindowRegistry;
use crate::services::state_codec::StateCodec;
use crate::services::state_store::{parse_snapshot_sequence, StateStore};
use crate::types::errors::RestoreError;
use crate::types::notification::Notification;
use crate::types::snapshot::PersistedWindowSnapshot;
use crate::types::window::{DisplayState, FirstContent, WindowId, WindowOptions};

pub struct RestoreFlow {
    store: StateStore,
    codec: StateCodec,
    /// Snapshot files claimed by a window whose replay has not run yet.
    in_flight: HashMap<PathBuf, WindowId>,
}

impl RestoreFlow {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            codec: StateCodec,
            in_flight: HashMap::new(),
        }
    }

    /// Snapshots in the profile directory, highest sequence first.
    /// Unreadable snapshot files are skipped.
    pub fn list_snapshots(&self) -> Result<Vec<PersistedWindowSnapshot>, RestoreError> {
        let mut files = self
            .store
            .snapshot_files()
            .map_err(|e| RestoreError::Scan(e.to_string()))?;
        files.sort_by(|a, b| b.0.cmp(&a.0));

        let mut snapshots = Vec::with_capacity(files.len());
        for (sequence, path) in files {
            match self.read_snapshot(&path) {
                Ok(Some(mut snapshot)) => {
                    // The filename is authoritative for ordering
                    snapshot.window_id = sequence;
                    snapshots.push(snapshot);
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), "Skipping snapshot: {}", e),
            }
        }
        Ok(snapshots)
    }

    /// Loads the snapshot at `path`, which must be a snapshot file inside
    /// the profile directory. A file that has already gone is `Ok(None)`.
    pub fn load_snapshot(&self, path: &Path) -> Result<Option<PersistedWindowSnapshot>, RestoreError> {
        let name = path.file_name().and_then(|n| n.to_str());
        let sequence = name
            .and_then(parse_snapshot_sequence)
            .ok_or_else(|| RestoreError::InvalidPath(path.display().to_string()))?;
        if path.parent() != Some(self.store.profile_dir()) {
            return Err(RestoreError::InvalidPath(path.display().to_string()));
        }
        let snapshot = self
            .read_snapshot(path)
            .map_err(|e| RestoreError::Scan(e.to_string()))?;
        Ok(snapshot.map(|mut s| {
            s.window_id = sequence;
            s
        }))
    }

    fn read_snapshot(&self, path: &Path) -> Result<Option<PersistedWindowSnapshot>, String> {
        let Some(bytes) = self.store.read(path).map_err(|e| e.to_string())? else {
            return Ok(None);
        };
        let mut snapshot = self
            .codec
            .decode_snapshot(&bytes)
            .map_err(|e| e.to_string())?;
        snapshot.path = Some(path.to_path_buf());
        Ok(Some(snapshot))
    }

    /// Opens a window for `snapshot`. Returns `Ok(None)` when the snapshot
    /// file has already been consumed or another window is replaying it.
    ///
    /// Display state and focus are applied after the window exists and its
    /// tab replay is queued, never in the creation options.
    pub fn restore(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &mut WindowRegistry,
        accelerators: &[&str],
        snapshot: &PersistedWindowSnapshot,
    ) -> Result<Option<WindowId>, RestoreError> {
        if let Some(path) = &snapshot.path {
            if let Some(owner) = self.in_flight.get(path) {
                debug!(path = %path.display(), window = %owner, "snapshot already being restored");
                return Ok(None);
            }
            if !path.exists() {
                debug!(path = %path.display(), "snapshot already consumed");
                return Ok(None);
            }
        }

        let options = WindowOptions::from_geometry(&snapshot.geometry);
        let id = registry.open(
            host,
            &options,
            FirstContent::Replay(snapshot.clone()),
            accelerators,
        )?;
        if let Some(path) = &snapshot.path {
            self.in_flight.insert(path.clone(), id);
        }

        if snapshot.focused {
            if let Err(e) = host.focus_window(id) {
                warn!(window = %id, "focus after restore failed: {}", e);
            } else if let Err(e) = registry.update_state(id, None, None, Some(true)) {
                debug!(window = %id, "focus not recorded: {}", e);
            }
        }
        if snapshot.display_state != DisplayState::Normal {
            if let Err(e) = host.set_display_state(id, snapshot.display_state) {
                warn!(window = %id, "display state after restore failed: {}", e);
            } else if let Err(e) =
                registry.update_state(id, None, Some(snapshot.display_state), None)
            {
                debug!(window = %id, "display state not recorded: {}", e);
            }
        }

        info!(window = %id, sequence = snapshot.window_id, tabs = snapshot.tabs.len(), "window restored");
        Ok(Some(id))
    }

    /// Restores every snapshot on disk, newest first.
    pub fn restore_all(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &mut WindowRegistry,
        accelerators: &[&str],
    ) -> Result<Vec<WindowId>, RestoreError> {
        let mut opened = Vec::new();
        for snapshot in self.list_snapshots()? {
            if let Some(id) = self.restore(host, registry, accelerators, &snapshot)? {
                opened.push(id);
            }
        }
        Ok(opened)
    }

    /// Releases the claim of a restored window that closed before its
    /// replay ran, so the snapshot can be restored again.
    pub fn release_window(&mut self, window: WindowId) {
        self.in_flight.retain(|path, owner| {
            if *owner == window {
                debug!(window = %window, path = %path.display(), "restore claim released");
                false
            } else {
                true
            }
        });
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.contains_key(path)
    }

    /// Sends the snapshot's tabs to the restored window, then moves the
    /// snapshot file to the relocation directory. Returns the new location.
    pub fn complete_replay(
        &mut self,
        host: &mut dyn WindowHost,
        window: WindowId,
        snapshot: &PersistedWindowSnapshot,
    ) -> Option<PathBuf> {
        if let Some(path) = &snapshot.path {
            self.in_flight.remove(path);
        }
        let replay = Notification::ReplayTabs {
            tabs: snapshot.tabs.clone(),
            focus_index: snapshot.focus_index(),
        };
        if let Err(e) = host.send(window, &replay) {
            warn!(window = %window, "tab replay not delivered, snapshot kept: {}", e);
            return None;
        }

        let path = snapshot.path.as_ref()?;
        match self.store.relocate(path) {
            Ok(target) => {
                debug!(from = %path.display(), to = %target.display(), "snapshot relocated");
                Some(target)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}
