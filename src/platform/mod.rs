// TabHost platform abstraction
// Provides platform-specific paths and behaviour for Windows, macOS, and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for TabHost.
///
/// - **Linux**: `~/.config/tabhost` (or `$XDG_CONFIG_HOME/tabhost`)
/// - **macOS**: `~/Library/Preferences/TabHost`
/// - **Windows**: `%APPDATA%/TabHost`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific profile directory, where state files live.
///
/// - **Linux**: `~/.local/share/tabhost` (or `$XDG_DATA_HOME/tabhost`)
/// - **macOS**: `~/Library/Application Support/TabHost`
/// - **Windows**: `%LOCALAPPDATA%/TabHost/profile`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}

/// Directory consumed snapshots are moved into.
pub fn get_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Whether this platform is macOS, where `CmdOrCtrl` means `Cmd` and the
/// process outlives its last window.
pub const fn is_macos() -> bool {
    cfg!(target_os = "macos")
}

/// Resolves the `CmdOrCtrl` placeholder in an accelerator.
pub fn resolve_accelerator(accelerator: &str) -> String {
    if is_macos() {
        accelerator.replace("CmdOrCtrl+", "Cmd+")
    } else {
        accelerator.replace("CmdOrCtrl+", "Ctrl+")
    }
}
