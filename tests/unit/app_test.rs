//! End-to-end tests of the App: auth, SQLite store, change hub, and the
//! sync store wired together the way the RPC server runs them.

#[path = "../common/mod.rs"]
mod common;

use common::{messages, wait_for_state};
use smartmarks::app::App;
use smartmarks::services::backing_store::{BookmarkStore, SqliteBookmarkStore};
use smartmarks::types::bookmark::NewBookmark;
use smartmarks::services::settings_engine::SettingsEngine;
use smartmarks::types::errors::AppError;
use smartmarks::types::settings::AppSettings;
use tempfile::TempDir;

/// Settings are never saved by these tests, so the path is not created.
fn settings() -> SettingsEngine {
    let mut settings = AppSettings::default();
    settings.notifications.display_duration_ms = 600_000;
    let path = std::env::temp_dir().join("smartmarks-app-test").join("settings.json");
    SettingsEngine::with_settings(path.to_string_lossy().to_string(), settings)
}

fn app() -> App {
    App::open_in_memory(settings()).expect("Failed to init App")
}

#[tokio::test]
async fn test_open_session_requires_sign_in() {
    let mut app = app();
    assert!(matches!(app.open_session().await, Err(AppError::NotSignedIn)));
    assert!(app.session().is_none());
}

#[tokio::test]
async fn test_sign_in_starts_session() {
    let mut app = app();
    let user = app.sign_in("alice@example.com").await.unwrap();

    let session = app.session().expect("session should be running");
    assert_eq!(session.owner(), &user.id);
    session.wait_until_loaded().await;
    assert!(session.snapshot().bookmarks.is_empty());
    assert_eq!(app.hub().subscriber_count(), 1);
}

#[tokio::test]
async fn test_added_bookmark_arrives_through_feed() {
    let mut app = app();
    app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;

    session.add_bookmark("Rust", "https://rust-lang.org", "The book").await;

    let snapshot = wait_for_state(session, |s| s.bookmarks.len() == 1).await;
    assert_eq!(snapshot.bookmarks[0].title, "Rust");
    assert_eq!(snapshot.bookmarks[0].description.as_deref(), Some("The book"));
    assert!(messages(app.notifications()).contains(&"Bookmark added successfully!".to_string()));
}

#[tokio::test]
async fn test_invalid_bookmark_is_reported() {
    let mut app = app();
    app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;

    session.add_bookmark("  ", "https://rust-lang.org", "").await;
    assert_eq!(
        messages(app.notifications()),
        vec!["Invalid bookmark: title must not be empty"]
    );
    assert!(session.snapshot().bookmarks.is_empty());
}

#[tokio::test]
async fn test_changes_from_another_client_are_applied() {
    let mut app = app();
    let user = app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;

    let other_client = SqliteBookmarkStore::new(app.database().clone(), app.hub().clone(), user.id.clone());
    let created = other_client
        .insert(NewBookmark::new(user.id.clone(), "Docs", "https://docs.rs", ""))
        .await
        .unwrap();
    wait_for_state(session, |s| s.bookmarks.len() == 1).await;

    other_client.delete_by_id(&created.id).await.unwrap();
    wait_for_state(session, |s| s.bookmarks.is_empty()).await;

    let shown = messages(app.notifications());
    assert!(shown.contains(&"Received new bookmark!".to_string()));
    assert!(shown.contains(&"Bookmark deleted remotely".to_string()));
}

#[tokio::test]
async fn test_delete_removes_row_from_store() {
    let mut app = app();
    let user = app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;

    session.add_bookmark("Rust", "https://rust-lang.org", "").await;
    let snapshot = wait_for_state(session, |s| s.bookmarks.len() == 1).await;
    let id = snapshot.bookmarks[0].id.clone();

    session.delete_bookmark(&id).await;
    assert!(session.snapshot().bookmarks.is_empty());

    let store = SqliteBookmarkStore::new(app.database().clone(), app.hub().clone(), user.id);
    assert!(store.select(store.caller()).await.unwrap().is_empty());
    assert!(messages(app.notifications()).contains(&"Bookmark deleted".to_string()));
}

#[tokio::test]
async fn test_users_do_not_see_each_other() {
    let mut app = app();
    app.sign_in("bob@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;
    session.add_bookmark("Bob's", "https://example.com", "").await;
    wait_for_state(session, |s| s.bookmarks.len() == 1).await;

    let alice = app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    assert_eq!(session.owner(), &alice.id);
    let snapshot = wait_for_state(session, |s| !s.loading).await;
    assert!(snapshot.bookmarks.is_empty());
    assert_eq!(app.hub().subscriber_count(), 1);
}

#[tokio::test]
async fn test_sign_in_again_keeps_running_session() {
    let mut app = app();
    app.sign_in("alice@example.com").await.unwrap();
    app.session().unwrap().wait_until_loaded().await;

    app.sign_in("alice@example.com").await.unwrap();
    assert_eq!(app.hub().subscriber_count(), 1);
    assert!(!app.session().unwrap().snapshot().loading);
}

#[tokio::test]
async fn test_sign_out_closes_session() {
    let mut app = app();
    app.sign_in("alice@example.com").await.unwrap();
    app.session().unwrap().wait_until_loaded().await;

    app.sign_out().await.unwrap();
    assert!(app.session().is_none());
    assert_eq!(app.hub().subscriber_count(), 0);
    assert_eq!(app.current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_reconnect_recovers_missed_rows() {
    let mut app = app();
    let user = app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    session.wait_until_loaded().await;

    // A row written while the feed was down: no change event for it.
    {
        let mut db = app.database().lock().unwrap();
        let now = db.next_timestamp();
        db.connection()
            .execute(
                "INSERT INTO bookmarks (id, user_id, title, url, description, created_at)
                 VALUES ('missed', ?1, 'Missed', 'https://example.com', NULL, ?2)",
                rusqlite::params![user.id.as_str(), now],
            )
            .unwrap();
    }
    app.hub().announce_reconnect(None);

    let snapshot = wait_for_state(session, |s| s.bookmarks.len() == 1).await;
    assert_eq!(snapshot.bookmarks[0].id.as_str(), "missed");
}

#[tokio::test]
async fn test_bookmarks_persist_across_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("smartmarks.db");
    let path = path.to_str().unwrap();

    {
        let mut app = App::new(path, settings()).unwrap();
        app.sign_in("alice@example.com").await.unwrap();
        let session = app.session().unwrap();
        session.wait_until_loaded().await;
        session.add_bookmark("Rust", "https://rust-lang.org", "").await;
        wait_for_state(session, |s| s.bookmarks.len() == 1).await;
        app.shutdown().await;
    }

    let mut app = App::new(path, settings()).unwrap();
    app.sign_in("alice@example.com").await.unwrap();
    let session = app.session().unwrap();
    let snapshot = wait_for_state(session, |s| !s.loading).await;
    assert_eq!(snapshot.bookmarks.len(), 1);
    assert_eq!(snapshot.bookmarks[0].title, "Rust");
}
