use thiserror::Error;

use super::view::ViewId;
use super::window::WindowId;

// === HostError ===

/// Failures reported by the windowing host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host could not create a window.
    #[error("Window creation failed: {0}")]
    CreateWindow(String),
    /// The host does not know the window.
    #[error("Host has no window: {0}")]
    UnknownWindow(WindowId),
    /// The host does not know the view.
    #[error("Host has no view: {0}")]
    UnknownView(ViewId),
    /// Delivering a message to a window failed.
    #[error("Message delivery failed: {0}")]
    Delivery(String),
    /// Writing to the host channel failed.
    #[error("Host I/O error: {0}")]
    Io(String),
}

// === WindowError ===

/// Errors related to the window registry.
#[derive(Debug, Error)]
pub enum WindowError {
    /// Window with the given ID is not registered.
    #[error("Window not found: {0}")]
    NotFound(WindowId),
    /// The window is already closing.
    #[error("Window already closing: {0}")]
    AlreadyClosing(WindowId),
    /// The host failed the operation.
    #[error("Window host error: {0}")]
    Host(#[from] HostError),
}

// === ViewError ===

/// Errors related to view attachment.
#[derive(Debug, Error)]
pub enum ViewError {
    /// View with the given ID is not in the view table.
    #[error("View not found: {0}")]
    NotFound(ViewId),
    /// Owner window is not registered.
    #[error("View owner window not found: {0}")]
    WindowNotFound(WindowId),
    /// The host failed the operation.
    #[error("View host error: {0}")]
    Host(#[from] HostError),
}

// === CodecError ===

/// Errors encoding or decoding persisted state.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Failed to serialize.
    #[error("State encode error: {0}")]
    Encode(String),
    /// Failed to parse.
    #[error("State decode error: {0}")]
    Decode(String),
}

// === PersistenceError ===

/// Errors related to state persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// An I/O error occurred while reading or writing state files.
    #[error("Persistence I/O error: {0}")]
    Io(String),
    /// The state could not be encoded or decoded.
    #[error("Persistence codec error: {0}")]
    Codec(#[from] CodecError),
    /// A preference value did not match its type.
    #[error("Invalid preference value: {0}")]
    InvalidPreference(String),
    /// A hard save is already draining windows.
    #[error("Hard save already in progress")]
    HardSaveInProgress,
}

// === RestoreError ===

/// Errors related to restoring window snapshots.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Failed to scan the profile directory.
    #[error("Snapshot scan failed: {0}")]
    Scan(String),
    /// The path does not name a snapshot file in the profile directory.
    #[error("Not a snapshot file: {0}")]
    InvalidPath(String),
    /// The window for the snapshot could not be opened.
    #[error("Restore window error: {0}")]
    Window(#[from] WindowError),
}

// === GateError ===

/// Errors related to restart-class settings mutations.
#[derive(Debug, Error)]
pub enum GateError {
    /// A mutation is already awaiting permission or restarting.
    #[error("A restart-requiring change is already pending")]
    Busy,
    /// The mutation value is invalid.
    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
    /// Persisting the granted value failed.
    #[error("Failed to persist setting: {0}")]
    Persist(#[from] PersistenceError),
}

// === ShortcutError ===

/// Errors related to accelerator bindings.
#[derive(Debug, Error)]
pub enum ShortcutError {
    /// The accelerator is already bound.
    #[error("Shortcut conflict: {0}")]
    Conflict(String),
    /// The accelerator string is invalid.
    #[error("Invalid shortcut keys: {0}")]
    InvalidKeys(String),
}

// === ConfigError ===

/// Errors loading host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Config I/O error: {0}")]
    Io(String),
    /// Failed to parse the config file.
    #[error("Config parse error: {0}")]
    Parse(String),
}
