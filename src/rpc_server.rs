//! smartmarks RPC Server: JSON-RPC over stdin/stdout for a desktop front end.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"notification", ...} and {"event":"bookmarks", ...}, unsolicited.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use smartmarks::app::App;
use smartmarks::managers::bookmark_sync::BookmarkSnapshot;
use smartmarks::platform;
use smartmarks::rpc_handler::handle_method;
use smartmarks::services::logging;
use smartmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use smartmarks::types::settings::AppSettings;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Database location: settings first, then `SMARTMARKS_DATA_DIR`, then the platform data dir.
fn database_path(settings: &AppSettings) -> PathBuf {
    if let Some(path) = &settings.storage.database_path {
        return PathBuf::from(path);
    }
    match std::env::var("SMARTMARKS_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir).join("smartmarks.db"),
        Err(_) => platform::default_database_path(),
    }
}

fn response(id: Value, result: Result<Value, String>) -> Value {
    match result {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    }
}

/// Mutations wait on the backing store, so they run off the read loop.
fn is_mutation(method: &str) -> bool {
    matches!(method, "bookmark.add" | "bookmark.delete")
}

fn spawn_writer(mut out: mpsc::UnboundedReceiver<Value>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = out.recv().await {
            let line = format!("{}\n", message);
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    })
}

fn forward_notifications(
    mut notifications: broadcast::Receiver<smartmarks::types::notification::Notification>,
    out: mpsc::UnboundedSender<Value>,
) {
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    if out.send(json!({"event": "notification", "notification": notification})).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn forward_snapshots(
    mut state: watch::Receiver<BookmarkSnapshot>,
    out: mpsc::UnboundedSender<Value>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let snapshot = state.borrow_and_update().clone();
            let event = json!({
                "event": "bookmarks",
                "items": snapshot.bookmarks,
                "loading": snapshot.loading,
            });
            if out.send(event).is_err() {
                break;
            }
        }
    })
}

#[tokio::main]
async fn main() {
    let config_override = std::env::var("SMARTMARKS_CONFIG").ok();
    let mut settings_engine = SettingsEngine::new(config_override);
    let load_result = settings_engine.load();
    let settings = settings_engine.get_settings().clone();

    logging::init(&settings.logging);
    if let Err(e) = load_result {
        tracing::warn!(path = settings_engine.get_config_path(), error = %e, "using default settings");
    }

    let db_path = database_path(&settings);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(dir = %parent.display(), error = %e, "could not create data directory");
        }
    }
    let app = match App::new(&db_path.to_string_lossy(), settings_engine) {
        Ok(app) => Arc::new(Mutex::new(app)),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize smartmarks");
            std::process::exit(1);
        }
    };

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = spawn_writer(out_rx);
    forward_notifications(app.lock().await.notifications().subscribe(), out_tx.clone());
    let mut snapshot_forwarder: Option<JoinHandle<()>> = None;

    // Signal ready
    let _ = out_tx.send(json!({"event":"ready","version":env!("CARGO_PKG_VERSION")}));

    // Max 200 RPC requests per second
    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(l)) => l,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };
        if line.trim().is_empty() { continue; }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id":null,"error":format!("parse error: {}",e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out_tx.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        if is_mutation(method) {
            let app = Arc::clone(&app);
            let out = out_tx.clone();
            let method = method.to_string();
            tokio::spawn(async move {
                let result = handle_method(&app, &method, &params).await;
                let _ = out.send(response(id, result));
            });
            continue;
        }

        let result = handle_method(&app, method, &params).await;

        if method == "auth.sign_in" && result.is_ok() {
            if let Some(previous) = snapshot_forwarder.take() {
                previous.abort();
            }
            if let Some(session) = app.lock().await.session() {
                snapshot_forwarder = Some(forward_snapshots(session.watch(), out_tx.clone()));
            }
        }

        let _ = out_tx.send(response(id, result));
    }

    app.lock().await.shutdown().await;
    // Forwarders and in-flight mutations end once the app and its senders are gone; then the writer drains.
    drop(app);
    drop(out_tx);
    let _ = writer.await;
}
