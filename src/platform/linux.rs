// smartmarks platform paths for Linux
// Config: ~/.config/smartmarks
// Data:   ~/.local/share/smartmarks

use std::env;
use std::path::PathBuf;

/// Resolves an XDG base directory: the override if set, otherwise `$HOME/<fallback>`.
fn xdg_dir(xdg: Option<String>, home: Option<String>, fallback: &[&str]) -> PathBuf {
    match xdg {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("smartmarks"),
        _ => {
            let mut path = PathBuf::from(home.unwrap_or_else(|| String::from("/tmp")));
            for part in fallback {
                path.push(part);
            }
            path.join("smartmarks")
        }
    }
}

/// Returns the configuration directory for smartmarks on Linux.
/// Uses `$XDG_CONFIG_HOME/smartmarks` if set, otherwise `~/.config/smartmarks`.
pub fn get_config_dir() -> PathBuf {
    xdg_dir(
        env::var("XDG_CONFIG_HOME").ok(),
        env::var("HOME").ok(),
        &[".config"],
    )
}

/// Returns the data directory for smartmarks on Linux.
/// Uses `$XDG_DATA_HOME/smartmarks` if set, otherwise `~/.local/share/smartmarks`.
pub fn get_data_dir() -> PathBuf {
    xdg_dir(
        env::var("XDG_DATA_HOME").ok(),
        env::var("HOME").ok(),
        &[".local", "share"],
    )
}
