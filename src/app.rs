//! App Core for smartmarks.
//!
//! Central struct wiring the database, auth service, change hub, and
//! notification center together, and owning the sync store of the signed-in
//! user.

use std::sync::Arc;
use std::time::Duration;

use crate::database::{self, Database, SharedDatabase};
use crate::managers::bookmark_sync::{BookmarkSync, SyncOptions};
use crate::managers::notification_center::NotificationCenter;
use crate::services::auth::{AuthService, LocalAuth};
use crate::services::backing_store::SqliteBookmarkStore;
use crate::services::change_feed::ChangeHub;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::bookmark::User;
use crate::types::errors::AppError;
use crate::types::settings::AppSettings;

/// Central application struct.
///
/// At most one [`BookmarkSync`] is alive at a time. It belongs to the
/// signed-in user and is shut down before another user's store starts.
pub struct App {
    db: SharedDatabase,
    hub: Arc<ChangeHub>,
    auth: Arc<LocalAuth>,
    notifications: Arc<NotificationCenter>,
    settings: SettingsEngine,
    session: Option<BookmarkSync>,
}

impl App {
    /// Opens (or creates) the database at `db_path` and sets up all services.
    pub fn new(db_path: &str, settings: SettingsEngine) -> Result<Self, AppError> {
        let db = Database::open(db_path).map_err(|e| AppError::DatabaseError(e.to_string()))?;
        tracing::info!(path = db_path, "database opened");
        Ok(Self::with_database(db, settings))
    }

    /// Same as [`new`](Self::new) with a throwaway in-memory database.
    pub fn open_in_memory(settings: SettingsEngine) -> Result<Self, AppError> {
        let db = Database::open_in_memory().map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(Self::with_database(db, settings))
    }

    fn with_database(db: Database, settings: SettingsEngine) -> Self {
        let db = database::shared(db);
        let ttl = Duration::from_millis(settings.get_settings().notifications.display_duration_ms);
        Self {
            auth: Arc::new(LocalAuth::new(db.clone())),
            hub: Arc::new(ChangeHub::new()),
            notifications: Arc::new(NotificationCenter::new(ttl)),
            db,
            settings,
            session: None,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        self.settings.get_settings()
    }

    /// Updates one setting by dot-notation key and saves it.
    ///
    /// Sync options apply to the next session; the notification lifetime
    /// applies after a restart.
    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        self.settings.set_value(key, value)?;
        tracing::info!(key, "setting updated");
        Ok(())
    }

    /// Restores and saves the default settings.
    pub fn reset_settings(&mut self) -> Result<(), AppError> {
        self.settings.reset()?;
        tracing::info!("settings reset to defaults");
        Ok(())
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.db
    }

    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    /// Sync store of the signed-in user, if any.
    pub fn session(&self) -> Option<&BookmarkSync> {
        self.session.as_ref()
    }

    pub async fn current_user(&self) -> Result<Option<User>, AppError> {
        Ok(self.auth.current_user().await?)
    }

    /// Signs in as `email` and starts that user's sync store.
    pub async fn sign_in(&mut self, email: &str) -> Result<User, AppError> {
        let user = self.auth.sign_in(email)?;
        self.open_session().await?;
        Ok(user)
    }

    /// Starts the sync store for the signed-in user.
    ///
    /// A store already running for the same user is kept; one running for a
    /// different user is shut down first.
    pub async fn open_session(&mut self) -> Result<&BookmarkSync, AppError> {
        let user = self
            .auth
            .current_user()
            .await?
            .ok_or(AppError::NotSignedIn)?;

        let current = self
            .session
            .as_ref()
            .is_some_and(|s| s.owner() == &user.id && !s.is_closed());
        if !current {
            self.close_session().await;
            let store = SqliteBookmarkStore::new(self.db.clone(), self.hub.clone(), user.id.clone());
            let sync = BookmarkSync::start(
                user.id.clone(),
                Arc::new(store),
                self.hub.clone(),
                self.notifications.clone(),
                SyncOptions::from(&self.settings().sync),
            );
            self.session = Some(sync);
        }

        self.session.as_ref().ok_or(AppError::NotSignedIn)
    }

    /// Stops the running sync store, if any.
    pub async fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    /// Stops the sync store, then signs out.
    pub async fn sign_out(&mut self) -> Result<(), AppError> {
        self.close_session().await;
        self.auth.sign_out().await?;
        Ok(())
    }

    /// Shutdown sequence: stop the sync store so its subscription is released.
    pub async fn shutdown(&mut self) {
        self.close_session().await;
        tracing::info!("app shut down");
    }
}
