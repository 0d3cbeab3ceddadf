// TabHost platform paths for macOS
// Config: ~/Library/Preferences/TabHost
// Data:   ~/Library/Application Support/TabHost

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

pub fn get_config_dir() -> PathBuf {
    home_dir().join("Library").join("Preferences").join("TabHost")
}

pub fn get_data_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("TabHost")
}
