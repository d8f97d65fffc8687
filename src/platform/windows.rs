// smartmarks platform paths for Windows
// Config: %APPDATA%/Smartmarks
// Data:   %APPDATA%/Smartmarks

use std::env;
use std::path::PathBuf;

/// `%APPDATA%/Smartmarks`
pub fn get_config_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("Smartmarks")
}

/// Same as the config directory on Windows.
pub fn get_data_dir() -> PathBuf {
    get_config_dir()
}
