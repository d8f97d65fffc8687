//! Change feed for smartmarks.
//!
//! Defines the `ChangeFeed` collaborator used by the synchronization store
//! and `ChangeHub`, an in-process implementation that fans row changes out
//! to subscribers, filtered by owner on the publishing side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::types::bookmark::UserId;
use crate::types::change::{ChangeEvent, FeedMessage};
use crate::types::errors::FeedError;

/// Handle for an open subscription.
///
/// Not `Clone`: `ChangeFeed::unsubscribe` consumes it, so a subscription can
/// be closed at most once.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    owner: UserId,
}

impl Subscription {
    /// Used by feed implementations when a subscription is opened.
    pub fn new(id: u64, owner: UserId) -> Self {
        Self { id, owner }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }
}

/// Trait defining the change-notification feed.
pub trait ChangeFeed: Send + Sync {
    /// Opens a subscription delivering events for `owner` into `sink`, in order.
    fn subscribe(
        &self,
        owner: &UserId,
        sink: mpsc::UnboundedSender<FeedMessage>,
    ) -> Result<Subscription, FeedError>;

    /// Closes a subscription. No messages are delivered for it afterwards.
    fn unsubscribe(&self, subscription: Subscription);
}

struct Subscriber {
    owner: UserId,
    sink: mpsc::UnboundedSender<FeedMessage>,
}

/// In-process change feed.
pub struct ChangeHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Delivers `event` to every subscriber of `owner`.
    ///
    /// Subscribers whose receiving side has gone away are pruned.
    pub fn publish(&self, owner: &UserId, event: ChangeEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            tracing::error!("change hub lock poisoned, dropping event");
            return;
        };
        let mut closed = Vec::new();
        for (id, subscriber) in subscribers.iter() {
            if &subscriber.owner != owner {
                continue;
            }
            if subscriber
                .sink
                .send(FeedMessage::Change(event.clone()))
                .is_err()
            {
                closed.push(*id);
            }
        }
        for id in closed {
            tracing::debug!(subscription = id, "pruning closed subscriber");
            subscribers.remove(&id);
        }
    }

    /// Tells subscribers the connection was re-established, optionally only those of `owner`.
    pub fn announce_reconnect(&self, owner: Option<&UserId>) {
        let Ok(subscribers) = self.subscribers.lock() else {
            return;
        };
        for subscriber in subscribers.values() {
            if owner.map_or(true, |o| o == &subscriber.owner) {
                let _ = subscriber.sink.send(FeedMessage::Reconnected);
            }
        }
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for ChangeHub {
    fn subscribe(
        &self,
        owner: &UserId,
        sink: mpsc::UnboundedSender<FeedMessage>,
    ) -> Result<Subscription, FeedError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| FeedError::SubscribeFailed(e.to_string()))?;
        subscribers.insert(
            id,
            Subscriber {
                owner: owner.clone(),
                sink,
            },
        );
        tracing::debug!(subscription = id, owner = %owner, "subscription opened");
        Ok(Subscription::new(id, owner.clone()))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let removed = self
            .subscribers
            .lock()
            .map(|mut s| s.remove(&subscription.id).is_some())
            .unwrap_or(false);
        if removed {
            tracing::debug!(subscription = subscription.id, owner = %subscription.owner, "subscription closed");
        } else {
            tracing::warn!(subscription = subscription.id, "unsubscribe for unknown subscription");
        }
    }
}
