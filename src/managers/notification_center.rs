//! Notification Center for smartmarks.
//!
//! Collects user-visible notifications, broadcasts each one as it is shown,
//! and keeps a list of the ones still on screen. Every notification expires
//! on its own clock, `ttl` after it was shown.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use crate::types::notification::{Notification, NotificationKind};

/// Display duration used when none is configured.
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(3);

const CHANNEL_CAPACITY: usize = 64;

struct ActiveNotification {
    notification: Notification,
    expires_at: Instant,
}

/// Thread-safe notification sink shared by the app and its sync stores.
pub struct NotificationCenter {
    ttl: Duration,
    active: Mutex<Vec<ActiveNotification>>,
    events: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    /// Creates a center whose notifications stay visible for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            ttl,
            active: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Shows a notification and returns it.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            kind,
        };

        match kind {
            NotificationKind::Error => tracing::warn!(text = %notification.message, "notification"),
            _ => tracing::info!(text = %notification.message, kind = ?kind, "notification"),
        }

        if let Ok(mut active) = self.active.lock() {
            let now = Instant::now();
            active.retain(|a| a.expires_at > now);
            active.push(ActiveNotification {
                notification: notification.clone(),
                expires_at: now + self.ttl,
            });
        }

        // No receivers is fine: nobody is listening right now.
        let _ = self.events.send(notification.clone());
        notification
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.notify(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.notify(message, NotificationKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.notify(message, NotificationKind::Info)
    }

    /// Notifications still on screen, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        let Ok(mut active) = self.active.lock() else {
            return Vec::new();
        };
        let now = Instant::now();
        active.retain(|a| a.expires_at > now);
        active.iter().map(|a| a.notification.clone()).collect()
    }

    /// Removes a notification before it expires. Returns `false` if it was not on screen.
    pub fn dismiss(&self, id: &str) -> bool {
        let Ok(mut active) = self.active.lock() else {
            return false;
        };
        let before = active.len();
        active.retain(|a| a.notification.id != id);
        active.len() != before
    }

    /// Stream of every notification shown from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_DURATION)
    }
}
