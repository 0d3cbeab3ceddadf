// TabHost platform paths for Windows
// Config: %APPDATA%/TabHost
// Data:   %LOCALAPPDATA%/TabHost/profile

use std::env;
use std::path::PathBuf;

pub fn get_config_dir() -> PathBuf {
    let appdata = env::var("APPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("TabHost")
}

pub fn get_data_dir() -> PathBuf {
    let local_appdata = env::var("LOCALAPPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Local"));
    PathBuf::from(local_appdata).join("TabHost").join("profile")
}
