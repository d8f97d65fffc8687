//! Bookmark synchronization store.
//!
//! Keeps one user's bookmark collection consistent across the initial
//! authoritative fetch, local mutations, and remote change events.
//!
//! A single worker task owns the [`BookmarkCollection`]. Everything that can
//! change it arrives as a message on one of two ordered channels: the command
//! inbox (requests from the [`BookmarkSync`] handle and results posted back
//! by network legs) and the change-feed subscription. Network legs run on
//! their own tasks, so remote events keep flowing while a mutation is in
//! flight.
//!
//! The current state is published through a `watch` channel as a
//! [`BookmarkSnapshot`]; user-visible outcomes go to the shared
//! [`NotificationCenter`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::managers::bookmark_collection::{ApplyOutcome, BookmarkCollection, Removal};
use crate::managers::notification_center::NotificationCenter;
use crate::services::backing_store::BookmarkStore;
use crate::services::change_feed::{ChangeFeed, Subscription};
use crate::types::bookmark::{Bookmark, BookmarkId, NewBookmark, UserId};
use crate::types::change::{ChangeEvent, FeedMessage};
use crate::types::errors::StoreError;
use crate::types::settings::SyncSettings;

pub const MSG_LOAD_FAILED: &str = "Failed to load bookmarks";
pub const MSG_ADDED: &str = "Bookmark added successfully!";
pub const MSG_DELETED: &str = "Bookmark deleted";
pub const MSG_DELETE_FAILED: &str = "Failed to delete bookmark";
pub const MSG_REMOTE_INSERT: &str = "Received new bookmark!";
pub const MSG_REMOTE_DELETE: &str = "Bookmark deleted remotely";

/// Tuning knobs for a sync store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Re-fetch the collection after the change feed reconnects.
    pub reconcile_on_reconnect: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reconcile_on_reconnect: true,
        }
    }
}

impl From<&SyncSettings> for SyncOptions {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            reconcile_on_reconnect: settings.reconcile_on_reconnect,
        }
    }
}

/// What consumers render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkSnapshot {
    pub bookmarks: Vec<Bookmark>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    Initial,
    Reconcile,
}

enum Message {
    Add {
        bookmark: NewBookmark,
        done: oneshot::Sender<()>,
    },
    Delete {
        id: BookmarkId,
        done: oneshot::Sender<()>,
    },
    Fetched {
        purpose: FetchPurpose,
        result: Result<Vec<Bookmark>, StoreError>,
    },
    Added {
        result: Result<Bookmark, StoreError>,
        done: oneshot::Sender<()>,
    },
    DeleteSettled {
        request: u64,
        result: Result<(), StoreError>,
        done: oneshot::Sender<()>,
    },
}

struct PendingDelete {
    id: BookmarkId,
    removal: Option<Removal>,
    /// A remote delete for the row arrived while the request was in flight.
    gone: bool,
}

/// The open subscription, shared by the worker and its handle so whichever
/// stops first closes it.
type SubscriptionSlot = Arc<Mutex<Option<Subscription>>>;

fn close_subscription(feed: &dyn ChangeFeed, slot: &Mutex<Option<Subscription>>) {
    let taken = match slot.lock() {
        Ok(mut subscription) => subscription.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(subscription) = taken {
        feed.unsubscribe(subscription);
    }
}

struct Worker {
    collection: BookmarkCollection,
    loading: bool,
    fetching: Option<FetchPurpose>,
    /// A reconnect arrived while a fetch was running; re-fetch once it lands.
    reconcile_pending: bool,
    buffered: Vec<ChangeEvent>,
    pending_deletes: HashMap<u64, PendingDelete>,
    next_request: u64,
    store: Arc<dyn BookmarkStore>,
    feed: Arc<dyn ChangeFeed>,
    subscription: SubscriptionSlot,
    notifications: Arc<NotificationCenter>,
    options: SyncOptions,
    inbox: mpsc::UnboundedSender<Message>,
    state: watch::Sender<BookmarkSnapshot>,
}

async fn next_feed_message(
    feed: &mut Option<mpsc::UnboundedReceiver<FeedMessage>>,
) -> Option<FeedMessage> {
    match feed {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Message>,
        mut feed: Option<mpsc::UnboundedReceiver<FeedMessage>>,
        cancel: CancellationToken,
    ) {
        self.start_fetch(FetchPurpose::Initial);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(message) = inbox.recv() => self.handle_message(message),
                message = next_feed_message(&mut feed) => match message {
                    Some(message) => self.handle_feed(message),
                    None => {
                        tracing::warn!(owner = %self.collection.owner(), "change feed closed; live updates stopped");
                        feed = None;
                    }
                },
            }
        }

        self.close_subscription();
        tracing::debug!(owner = %self.collection.owner(), "sync worker stopped");
    }

    fn owner(&self) -> UserId {
        self.collection.owner().clone()
    }

    fn publish(&self) {
        self.state.send_replace(BookmarkSnapshot {
            bookmarks: self.collection.as_slice().to_vec(),
            loading: self.loading,
        });
    }

    fn close_subscription(&mut self) {
        close_subscription(self.feed.as_ref(), &self.subscription);
    }

    fn start_fetch(&mut self, purpose: FetchPurpose) {
        self.fetching = Some(purpose);
        let store = Arc::clone(&self.store);
        let inbox = self.inbox.clone();
        let owner = self.owner();
        tokio::spawn(async move {
            let result = store.select(&owner).await;
            let _ = inbox.send(Message::Fetched { purpose, result });
        });
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Add { bookmark, done } => {
                let store = Arc::clone(&self.store);
                let inbox = self.inbox.clone();
                tokio::spawn(async move {
                    let result = store.insert(bookmark).await;
                    let _ = inbox.send(Message::Added { result, done });
                });
            }
            Message::Added { result, done } => {
                match result {
                    Ok(bookmark) => {
                        tracing::debug!(id = %bookmark.id, "insert accepted");
                        self.notifications.success(MSG_ADDED);
                    }
                    Err(e) => {
                        tracing::warn!(owner = %self.collection.owner(), error = %e, "insert rejected");
                        self.notifications.error(e.to_string());
                    }
                }
                let _ = done.send(());
            }
            Message::Delete { id, done } => self.delete_optimistically(id, done),
            Message::DeleteSettled {
                request,
                result,
                done,
            } => {
                self.settle_delete(request, result);
                let _ = done.send(());
            }
            Message::Fetched { purpose, result } => self.finish_fetch(purpose, result),
        }
    }

    fn delete_optimistically(&mut self, id: BookmarkId, done: oneshot::Sender<()>) {
        let request = self.next_request;
        self.next_request += 1;

        let removal = self.collection.remove(&id);
        if removal.is_some() {
            self.publish();
        } else {
            tracing::debug!(id = %id, "delete requested for bookmark not in collection");
        }
        self.notifications.success(MSG_DELETED);

        self.pending_deletes.insert(
            request,
            PendingDelete {
                id: id.clone(),
                removal,
                gone: false,
            },
        );

        let store = Arc::clone(&self.store);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = store.delete_by_id(&id).await;
            let _ = inbox.send(Message::DeleteSettled {
                request,
                result,
                done,
            });
        });
    }

    fn settle_delete(&mut self, request: u64, result: Result<(), StoreError>) {
        let Some(pending) = self.pending_deletes.remove(&request) else {
            return;
        };
        let Err(e) = result else {
            tracing::debug!(id = %pending.id, "delete confirmed");
            return;
        };

        tracing::warn!(id = %pending.id, error = %e, "delete rejected, rolling back");
        if let Some(removal) = pending.removal {
            if pending.gone {
                tracing::debug!(id = %pending.id, "row deleted remotely meanwhile; not restoring");
            } else if self.collection.restore(removal) {
                self.publish();
            }
        }
        self.notifications
            .error(format!("{}: {}", MSG_DELETE_FAILED, e));
    }

    fn finish_fetch(&mut self, purpose: FetchPurpose, result: Result<Vec<Bookmark>, StoreError>) {
        self.fetching = None;
        match (purpose, result) {
            (FetchPurpose::Initial, Ok(rows)) => {
                let dropped = self.collection.replace_all(rows);
                if dropped > 0 {
                    tracing::warn!(dropped, "initial fetch contained foreign or duplicate rows");
                }
                tracing::info!(owner = %self.collection.owner(), count = self.collection.len(), "bookmarks loaded");
                self.replay_buffered();
            }
            (FetchPurpose::Initial, Err(e)) => {
                tracing::error!(owner = %self.collection.owner(), error = %e, "initial fetch failed");
                self.buffered.clear();
                self.reconcile_pending = false;
                self.notifications.error(MSG_LOAD_FAILED);
            }
            (FetchPurpose::Reconcile, Ok(rows)) => {
                let in_flight: Vec<&BookmarkId> =
                    self.pending_deletes.values().map(|p| &p.id).collect();
                let rows: Vec<Bookmark> = rows
                    .into_iter()
                    .filter(|b| !in_flight.contains(&&b.id))
                    .collect();
                self.collection.replace_all(rows);
                tracing::info!(owner = %self.collection.owner(), count = self.collection.len(), "collection reconciled after reconnect");
                self.replay_buffered();
            }
            (FetchPurpose::Reconcile, Err(e)) => {
                tracing::warn!(owner = %self.collection.owner(), error = %e, "reconcile fetch failed; keeping current collection");
                self.replay_buffered();
            }
        }
        self.loading = false;
        self.publish();

        if std::mem::take(&mut self.reconcile_pending) {
            tracing::info!(owner = %self.collection.owner(), "running reconcile deferred by reconnect");
            self.start_fetch(FetchPurpose::Reconcile);
        }
    }

    fn replay_buffered(&mut self) {
        for event in std::mem::take(&mut self.buffered) {
            self.apply_change(&event);
        }
    }

    fn handle_feed(&mut self, message: FeedMessage) {
        match message {
            FeedMessage::Change(event) => {
                if event.owner().is_some_and(|o| o != self.collection.owner()) {
                    tracing::debug!(id = %event.id(), "discarding event for another owner");
                    return;
                }
                if let ChangeEvent::Deleted { id, .. } = &event {
                    for pending in self.pending_deletes.values_mut() {
                        if &pending.id == id {
                            pending.gone = true;
                        }
                    }
                }
                if self.fetching.is_some() {
                    self.buffered.push(event);
                    return;
                }
                if self.apply_change(&event) {
                    self.publish();
                }
            }
            FeedMessage::Reconnected => {
                if !self.options.reconcile_on_reconnect {
                    tracing::warn!(owner = %self.collection.owner(), "change feed reconnected; events missed during the gap are not recovered");
                    return;
                }
                if self.fetching.is_some() {
                    // The running fetch may predate the gap.
                    tracing::debug!("change feed reconnected during a fetch; reconcile deferred");
                    self.reconcile_pending = true;
                    return;
                }
                tracing::info!(owner = %self.collection.owner(), "change feed reconnected; reconciling");
                self.start_fetch(FetchPurpose::Reconcile);
            }
        }
    }

    /// Applies one remote event. Returns whether the collection changed.
    fn apply_change(&mut self, event: &ChangeEvent) -> bool {
        let outcome = self.collection.apply(event);
        match outcome {
            ApplyOutcome::Inserted => {
                self.notifications.info(MSG_REMOTE_INSERT);
            }
            ApplyOutcome::Removed => {
                self.notifications.info(MSG_REMOTE_DELETE);
            }
            ApplyOutcome::Duplicate | ApplyOutcome::Absent => {
                tracing::debug!(id = %event.id(), outcome = ?outcome, "event already reflected");
            }
            ApplyOutcome::ForeignOwner => {
                tracing::debug!(id = %event.id(), "discarding event for another owner");
            }
        }
        outcome.changed()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.close_subscription();
    }
}

/// Cloneable sender for local mutations of one sync store.
///
/// Holds no borrow of the [`BookmarkSync`], so a caller can drop any lock
/// guarding the handle before awaiting the store's answer.
#[derive(Clone)]
pub struct BookmarkClient {
    owner: UserId,
    inbox: mpsc::UnboundedSender<Message>,
}

impl BookmarkClient {
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Submits an insert. The collection is not touched; the new row shows
    /// up when the change feed delivers it. Resolves once the store answered.
    pub async fn add_bookmark(&self, title: &str, url: &str, description: &str) {
        let bookmark = NewBookmark::new(self.owner.clone(), title, url, description);
        let (done, finished) = oneshot::channel();
        if self.inbox.send(Message::Add { bookmark, done }).is_err() {
            tracing::debug!(owner = %self.owner, "add on a stopped sync store");
            return;
        }
        let _ = finished.await;
    }

    /// Removes the bookmark locally right away, then asks the store to delete
    /// it, rolling back if the store refuses. Resolves once the store answered.
    pub async fn delete_bookmark(&self, id: &BookmarkId) {
        let (done, finished) = oneshot::channel();
        if self
            .inbox
            .send(Message::Delete {
                id: id.clone(),
                done,
            })
            .is_err()
        {
            tracing::debug!(owner = %self.owner, "delete on a stopped sync store");
            return;
        }
        let _ = finished.await;
    }
}

/// Handle to a running synchronization store for one user.
///
/// Dropping the handle closes the change-feed subscription on the spot and
/// stops the worker. [`shutdown`](Self::shutdown) does the same and also
/// waits for the worker to exit.
pub struct BookmarkSync {
    client: BookmarkClient,
    state: watch::Receiver<BookmarkSnapshot>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    feed: Arc<dyn ChangeFeed>,
    subscription: SubscriptionSlot,
}

impl BookmarkSync {
    /// Subscribes to the change feed for `owner` and starts the initial fetch.
    ///
    /// Must be called from within a tokio runtime. A feed that refuses the
    /// subscription is logged and the store runs without live updates.
    pub fn start(
        owner: UserId,
        store: Arc<dyn BookmarkStore>,
        feed: Arc<dyn ChangeFeed>,
        notifications: Arc<NotificationCenter>,
        options: SyncOptions,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(BookmarkSnapshot {
            bookmarks: Vec::new(),
            loading: true,
        });

        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (subscription, feed_rx) = match feed.subscribe(&owner, feed_tx) {
            Ok(subscription) => (Some(subscription), Some(feed_rx)),
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "could not subscribe to change feed");
                (None, None)
            }
        };
        let subscription: SubscriptionSlot = Arc::new(Mutex::new(subscription));

        let worker = Worker {
            collection: BookmarkCollection::new(owner.clone()),
            loading: true,
            fetching: None,
            reconcile_pending: false,
            buffered: Vec::new(),
            pending_deletes: HashMap::new(),
            next_request: 0,
            store,
            feed: Arc::clone(&feed),
            subscription: Arc::clone(&subscription),
            notifications,
            options,
            inbox: inbox_tx.clone(),
            state: state_tx,
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(inbox_rx, feed_rx, cancel.clone()));
        tracing::info!(owner = %owner, "bookmark sync started");

        Self {
            client: BookmarkClient {
                owner,
                inbox: inbox_tx,
            },
            state: state_rx,
            cancel,
            worker: Some(handle),
            feed,
            subscription,
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.client.owner
    }

    /// Current state.
    pub fn snapshot(&self) -> BookmarkSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn watch(&self) -> watch::Receiver<BookmarkSnapshot> {
        self.state.clone()
    }

    /// Resolves once the initial fetch has finished, successfully or not.
    pub async fn wait_until_loaded(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| !s.loading).await;
    }

    /// A mutation sender that can outlive this borrow.
    pub fn client(&self) -> BookmarkClient {
        self.client.clone()
    }

    /// See [`BookmarkClient::add_bookmark`].
    pub async fn add_bookmark(&self, title: &str, url: &str, description: &str) {
        self.client.add_bookmark(title, url, description).await;
    }

    /// See [`BookmarkClient::delete_bookmark`].
    pub async fn delete_bookmark(&self, id: &BookmarkId) {
        self.client.delete_bookmark(id).await;
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the worker and waits until it has exited.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(owner = %self.client.owner, error = %e, "sync worker ended abnormally");
            }
        }
        tracing::info!(owner = %self.client.owner, "bookmark sync stopped");
    }
}

impl Drop for BookmarkSync {
    fn drop(&mut self) {
        self.cancel.cancel();
        close_subscription(self.feed.as_ref(), &self.subscription);
    }
}
