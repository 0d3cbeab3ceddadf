//! Persistence Manager for TabHost.
//!
//! Owns the in-memory aggregate state and every write of it. A soft save
//! captures the open windows and writes the aggregate file. A hard save asks
//! every window to close and writes nothing until the host has confirmed
//! each close; only then are the snapshot files, the window sequence and the
//! aggregate written. While a restart is pending the hard save only writes
//! snapshots and bumps the sequence: the restart itself is driven by the
//! settings gate.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::host::{ExitStatus, TimerId, WindowHost};
use crate::managers::window_registry::WindowRegistry;
use crate::services::state_codec::StateCodec;
use crate::services::state_store::StateStore;
use crate::types::errors::{PersistenceError, WindowError};
use crate::types::snapshot::PersistedWindowSnapshot;
use crate::types::window::WindowId;
use crate::types::state::{AggregateAppState, PreferenceKey, DEFAULT_LANGUAGE};

/// Result of a save step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Soft save written.
    Written,
    /// Soft save not attempted (restart pending or shutdown under way).
    Skipped,
    /// Hard save waiting for `remaining` windows to report closed.
    Draining { remaining: usize },
    /// Hard save written. `exit` is set only for the save that owns
    /// process exit.
    Completed { exit: Option<ExitStatus> },
    /// Hard save under a pending restart: snapshots and sequence written,
    /// aggregate untouched.
    RestartReady,
    /// Windows drained but the write failed; kept for a retry.
    WriteFailed,
}

struct HardSave {
    /// Windows asked to close that have not confirmed yet.
    awaiting: HashSet<WindowId>,
    snapshots: Vec<PersistedWindowSnapshot>,
}

pub struct PersistenceManager {
    store: StateStore,
    codec: StateCodec,
    state: AggregateAppState,
    autosave: Option<TimerId>,
    autosave_cleared: bool,
    hard_save: Option<HardSave>,
    /// Drained snapshots whose write failed.
    pending_write: Option<Vec<PersistedWindowSnapshot>>,
    restart_pending: bool,
    exit_claimed: bool,
    shutting_down: bool,
    next_sequence: u64,
}

impl PersistenceManager {
    pub fn new(store: StateStore) -> Self {
        let codec = StateCodec;
        let next_sequence = Self::read_next_sequence(&store, &codec);
        Self {
            store,
            codec,
            state: AggregateAppState::default(),
            autosave: None,
            autosave_cleared: false,
            hard_save: None,
            pending_write: None,
            restart_pending: false,
            exit_claimed: false,
            shutting_down: false,
            next_sequence,
        }
    }

    /// The stored counter, raised past any snapshot still on disk so new
    /// files never overwrite unrestored ones.
    fn read_next_sequence(store: &StateStore, codec: &StateCodec) -> u64 {
        let stored = match store.read(&store.sequence_path()) {
            Ok(Some(bytes)) => codec.decode_sequence(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable window sequence: {}", e);
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!("{}", e);
                0
            }
        };
        let on_disk = store
            .snapshot_files()
            .unwrap_or_default()
            .into_iter()
            .map(|(seq, _)| seq.saturating_add(1))
            .max()
            .unwrap_or(0);
        stored.max(on_disk)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn state(&self) -> &AggregateAppState {
        &self.state
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    // --- Load ---

    /// Reads the aggregate state file. Missing and unparsable files both
    /// yield `None`; neither is an error for the caller.
    pub fn load(&self) -> Option<AggregateAppState> {
        let path = self.store.state_path();
        let bytes = match self.store.read(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(path = %path.display(), "no saved state");
                return None;
            }
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        match self.codec.decode_state(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), "Saved state is corrupt, using defaults: {}", e);
                None
            }
        }
    }

    /// Loads the saved state into memory, falling back to defaults.
    pub fn load_or_default(&mut self) -> &AggregateAppState {
        self.state = self.load().unwrap_or_default();
        self.state.language = self.read_language();
        &self.state
    }

    // --- Preferences ---

    pub fn set_preference(
        &mut self,
        key: PreferenceKey,
        value: serde_json::Value,
    ) -> Result<(), PersistenceError> {
        self.state.set_preference(key, value)
    }

    /// Locale from the language file; `en-US` when missing or unreadable.
    pub fn read_language(&self) -> String {
        let path = self.store.language_path();
        match self.store.read(&path) {
            Ok(Some(bytes)) => self.codec.decode_language(&bytes).unwrap_or_else(|e| {
                warn!("Language file unreadable, using {}: {}", DEFAULT_LANGUAGE, e);
                DEFAULT_LANGUAGE.to_string()
            }),
            Ok(None) => DEFAULT_LANGUAGE.to_string(),
            Err(e) => {
                warn!("{}", e);
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }

    pub fn write_language(&mut self, lang: &str) -> Result<(), PersistenceError> {
        let bytes = self.codec.encode_language(lang)?;
        self.store.write_atomic(&self.store.language_path(), &bytes)?;
        self.state.language = lang.to_string();
        info!(lang, "language persisted");
        Ok(())
    }

    pub fn set_restart_pending(&mut self) {
        self.restart_pending = true;
    }

    pub fn is_restart_pending(&self) -> bool {
        self.restart_pending
    }

    /// True from the first hard save on.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn is_draining(&self) -> bool {
        self.hard_save.is_some()
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write.is_some()
    }

    // --- Autosave ---

    /// Starts the autosave timer. It runs at most once per process: later
    /// calls, and calls after [`PersistenceManager::autosave_stop`], do nothing.
    pub fn autosave_start(&mut self, host: &mut dyn WindowHost, interval: Duration) -> bool {
        if self.autosave.is_some() || self.autosave_cleared {
            return false;
        }
        let timer = host.start_timer(interval, true);
        debug!(timer = timer.0, secs = interval.as_secs(), "autosave started");
        self.autosave = Some(timer);
        true
    }

    /// Clears the autosave timer; returns false if it was already cleared.
    pub fn autosave_stop(&mut self, host: &mut dyn WindowHost) -> bool {
        match self.autosave.take() {
            Some(timer) => {
                host.cancel_timer(timer);
                self.autosave_cleared = true;
                debug!(timer = timer.0, "autosave stopped");
                true
            }
            None => {
                self.autosave_cleared = true;
                false
            }
        }
    }

    pub fn is_autosave_timer(&self, timer: TimerId) -> bool {
        self.autosave == Some(timer)
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave.is_some()
    }

    // --- Save ---

    /// Soft save (`soft == true`) writes the aggregate now. Hard save closes
    /// every open window and returns [`SaveOutcome::Draining`]; the write
    /// happens in [`PersistenceManager::on_window_closed`] once all have
    /// closed.
    pub fn save(
        &mut self,
        soft: bool,
        host: &mut dyn WindowHost,
        registry: &mut WindowRegistry,
    ) -> Result<SaveOutcome, PersistenceError> {
        if soft {
            return self.soft_save(registry);
        }
        if self.hard_save.is_some() {
            return Err(PersistenceError::HardSaveInProgress);
        }
        if self.pending_write.is_some() {
            return Ok(self.retry_pending().unwrap_or(SaveOutcome::WriteFailed));
        }

        self.shutting_down = true;
        let snapshots: Vec<PersistedWindowSnapshot> = registry
            .in_creation_order()
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                PersistedWindowSnapshot::capture(w, self.next_sequence.saturating_add(i as u64))
            })
            .collect();
        let ids = registry.ids();
        info!(windows = ids.len(), "hard save: closing windows");
        if ids.is_empty() {
            return Ok(self.finish_hard_save(snapshots));
        }

        self.hard_save = Some(HardSave {
            awaiting: ids.iter().copied().collect(),
            snapshots,
        });

        let mut unclosable = Vec::new();
        for id in ids {
            match registry.close(host, id) {
                Ok(()) | Err(WindowError::AlreadyClosing(_)) => {}
                Err(e) => {
                    // The host will never confirm this one
                    warn!(window = %id, "close failed during hard save: {}", e);
                    registry.remove(id);
                    unclosable.push(id);
                }
            }
        }

        let mut outcome = None;
        for id in unclosable {
            outcome = self.on_window_closed(id);
        }
        match self.hard_save.as_ref() {
            Some(hard) => Ok(SaveOutcome::Draining {
                remaining: hard.awaiting.len(),
            }),
            None => Ok(outcome.unwrap_or(SaveOutcome::WriteFailed)),
        }
    }

    fn soft_save(&mut self, registry: &WindowRegistry) -> Result<SaveOutcome, PersistenceError> {
        if self.restart_pending || self.shutting_down {
            return Ok(SaveOutcome::Skipped);
        }
        self.state.windows = registry
            .in_creation_order()
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                PersistedWindowSnapshot::capture(w, self.next_sequence.saturating_add(i as u64))
            })
            .collect();
        self.write_aggregate()?;
        debug!(windows = self.state.windows.len(), "soft save written");
        Ok(SaveOutcome::Written)
    }

    /// Counts a host-confirmed close. Returns `None` when no hard save is
    /// draining, otherwise the hard save's progress. Only windows the hard
    /// save asked to close count, each once.
    pub fn on_window_closed(&mut self, window: WindowId) -> Option<SaveOutcome> {
        let hard = self.hard_save.as_mut()?;
        if !hard.awaiting.remove(&window) {
            debug!(window = %window, "close not awaited by hard save");
        }
        if !hard.awaiting.is_empty() {
            return Some(SaveOutcome::Draining {
                remaining: hard.awaiting.len(),
            });
        }
        let hard = self.hard_save.take()?;
        Some(self.finish_hard_save(hard.snapshots))
    }

    /// The host is gone and no further close will be confirmed. Writes a
    /// draining hard save with the snapshots it captured, or retries a
    /// failed write. `None` when neither is outstanding.
    pub fn finish_on_disconnect(&mut self) -> Option<SaveOutcome> {
        if let Some(hard) = self.hard_save.take() {
            warn!(unconfirmed = hard.awaiting.len(), "host gone mid-drain, writing captured windows");
            return Some(self.finish_hard_save(hard.snapshots));
        }
        self.retry_pending()
    }

    /// Retries a drained hard save whose write failed.
    pub fn retry_pending(&mut self) -> Option<SaveOutcome> {
        let snapshots = self.pending_write.take()?;
        info!("retrying failed state write");
        Some(self.finish_hard_save(snapshots))
    }

    fn finish_hard_save(&mut self, snapshots: Vec<PersistedWindowSnapshot>) -> SaveOutcome {
        let next = self.next_sequence.saturating_add(snapshots.len() as u64);

        if self.restart_pending {
            if let Err(e) = self
                .write_snapshots(&snapshots)
                .and_then(|_| self.write_sequence(next))
            {
                warn!("Failed to record windows before restart: {}", e);
            }
            self.next_sequence = next;
            info!(next_sequence = next, "hard save: restart pending, aggregate not written");
            return SaveOutcome::RestartReady;
        }

        self.state.windows = snapshots.clone();
        let written = self
            .write_snapshots(&snapshots)
            .and_then(|_| self.write_sequence(next))
            .and_then(|_| self.write_aggregate());
        match written {
            Ok(()) => {
                self.next_sequence = next;
                info!(windows = snapshots.len(), "hard save written");
                let exit = if self.exit_claimed {
                    None
                } else {
                    self.exit_claimed = true;
                    Some(ExitStatus::Normal)
                };
                SaveOutcome::Completed { exit }
            }
            Err(e) => {
                warn!("Hard save write failed, process kept alive: {}", e);
                self.pending_write = Some(snapshots);
                SaveOutcome::WriteFailed
            }
        }
    }

    fn write_snapshots(&self, snapshots: &[PersistedWindowSnapshot]) -> Result<(), PersistenceError> {
        for snapshot in snapshots {
            let bytes = self.codec.encode_snapshot(snapshot)?;
            self.store
                .write_atomic(&self.store.snapshot_path(snapshot.window_id), &bytes)?;
        }
        Ok(())
    }

    fn write_sequence(&self, next: u64) -> Result<(), PersistenceError> {
        let bytes = self.codec.encode_sequence(next)?;
        self.store.write_atomic(&self.store.sequence_path(), &bytes)
    }

    fn write_aggregate(&self) -> Result<(), PersistenceError> {
        let bytes = self.codec.encode_state(&self.state)?;
        self.store.write_atomic(&self.store.state_path(), &bytes)
    }
}
