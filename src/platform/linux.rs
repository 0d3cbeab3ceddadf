// TabHost platform paths for Linux
// Config: ~/.config/tabhost
// Data:   ~/.local/share/tabhost

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Uses `$XDG_CONFIG_HOME/tabhost` if set, otherwise `~/.config/tabhost`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("tabhost"),
        _ => home_dir().join(".config").join("tabhost"),
    }
}

/// Uses `$XDG_DATA_HOME/tabhost` if set, otherwise `~/.local/share/tabhost`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("tabhost"),
        _ => home_dir().join(".local").join("share").join("tabhost"),
    }
}
