//! RPC method handler for the smartmarks JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches method calls to the `App` and the sync store
//! of the signed-in user.

use tokio::sync::Mutex;

use crate::app::App;
use crate::managers::bookmark_sync::BookmarkSync;
use crate::types::bookmark::BookmarkId;

use serde_json::{json, Value};

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", name))
}

fn session(app: &App) -> Result<&BookmarkSync, String> {
    app.session().ok_or_else(|| "not signed in".to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// `bookmark.add` and `bookmark.delete` hold the `App` lock only long enough
/// to find the session, so callers may run them concurrently.
pub async fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── Auth ───
        "auth.sign_in" => {
            let email = str_param(params, "email")?;
            let mut a = app.lock().await;
            let user = a.sign_in(email).await.map_err(|e| e.to_string())?;
            serde_json::to_value(user).map_err(|e| e.to_string())
        }
        "auth.current_user" => {
            let a = app.lock().await;
            let user = a.current_user().await.map_err(|e| e.to_string())?;
            serde_json::to_value(user).map_err(|e| e.to_string())
        }
        "auth.sign_out" => {
            let mut a = app.lock().await;
            a.sign_out().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let a = app.lock().await;
            let snapshot = session(&a)?.snapshot();
            let items = serde_json::to_value(&snapshot.bookmarks).map_err(|e| e.to_string())?;
            Ok(json!({"items": items, "loading": snapshot.loading}))
        }
        // The lock is released before waiting on the store.
        "bookmark.add" => {
            let title = str_param(params, "title")?;
            let url = str_param(params, "url")?;
            let description = params.get("description").and_then(|v| v.as_str()).unwrap_or("");
            let client = session(&*app.lock().await)?.client();
            client.add_bookmark(title, url, description).await;
            Ok(json!({"ok": true}))
        }
        "bookmark.delete" => {
            let id = BookmarkId::from(str_param(params, "id")?);
            let client = session(&*app.lock().await)?.client();
            client.delete_bookmark(&id).await;
            Ok(json!({"ok": true}))
        }

        // ─── Notifications ───
        "notification.active" => {
            let a = app.lock().await;
            serde_json::to_value(a.notifications().active()).map_err(|e| e.to_string())
        }
        "notification.dismiss" => {
            let id = str_param(params, "id")?;
            let a = app.lock().await;
            Ok(json!({"dismissed": a.notifications().dismiss(id)}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().await;
            serde_json::to_value(a.settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().await;
            a.set_setting(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut a = app.lock().await;
            a.reset_settings().map_err(|e| e.to_string())?;
            serde_json::to_value(a.settings()).map_err(|e| e.to_string())
        }

        "ping" => Ok(json!({"pong": true})),

        _ => Err(format!("unknown method: {}", method)),
    }
}
