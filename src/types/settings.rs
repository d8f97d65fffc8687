use serde::{Deserialize, Serialize};

/// Top-level application settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    pub notifications: NotificationSettings,
    pub sync: SyncSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// How long notifications stay visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub display_duration_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            display_duration_ms: 3000,
        }
    }
}

/// Behaviour of the bookmark synchronization store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Re-fetch the collection when the change feed reports a reconnect.
    pub reconcile_on_reconnect: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            reconcile_on_reconnect: true,
        }
    }
}

/// Where the local backing store keeps its data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSettings {
    /// Database file path. `None` uses the platform data directory.
    pub database_path: Option<String>,
}

/// Log output configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
