//! Change-feed event types.
//!
//! Feeds hand the sync store decoded [`ChangeEvent`]s; anything a feed cannot
//! turn into one (unknown kinds, missing rows) never reaches the store.

use super::bookmark::{Bookmark, BookmarkId, UserId};

/// A row-level change to the bookmarks table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted(Bookmark),
    /// A deleted row. Deletes may only carry the primary key, so the owner is optional.
    Deleted {
        id: BookmarkId,
        owner: Option<UserId>,
    },
}

/// A message delivered on a change-feed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    /// The feed dropped and re-established its connection; events may have been missed.
    Reconnected,
}

impl ChangeEvent {
    /// Returns the id of the affected row.
    pub fn id(&self) -> &BookmarkId {
        match self {
            ChangeEvent::Inserted(bookmark) => &bookmark.id,
            ChangeEvent::Deleted { id, .. } => id,
        }
    }

    /// Returns the owner of the affected row, when the event carries one.
    pub fn owner(&self) -> Option<&UserId> {
        match self {
            ChangeEvent::Inserted(bookmark) => Some(&bookmark.owner),
            ChangeEvent::Deleted { owner, .. } => owner.as_ref(),
        }
    }
}
