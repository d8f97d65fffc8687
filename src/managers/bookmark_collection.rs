//! In-memory bookmark collection for one user.
//!
//! A plain state machine with no I/O. It upholds the collection invariants
//! on every mutation:
//!
//! - at most one entry per id,
//! - only entries owned by the collection's user,
//! - ordered by `created_at`, newest first.
//!
//! The sync worker in `bookmark_sync` is its only writer.

use std::collections::HashSet;

use crate::types::bookmark::{Bookmark, BookmarkId, UserId};
use crate::types::change::ChangeEvent;

/// What applying an event did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Removed,
    /// Insert for an id that is already present.
    Duplicate,
    /// Delete for an id that is not present.
    Absent,
    /// Event for another user's row.
    ForeignOwner,
}

impl ApplyOutcome {
    /// Whether the collection changed.
    pub fn changed(self) -> bool {
        matches!(self, ApplyOutcome::Inserted | ApplyOutcome::Removed)
    }
}

/// Capture of an entry taken out by an optimistic delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub bookmark: Bookmark,
    /// Index the entry occupied before removal.
    pub index: usize,
    /// Collection revision right after the removal.
    pub revision: u64,
}

/// Ordered, deduplicated bookmark collection of a single owner.
#[derive(Debug, Clone)]
pub struct BookmarkCollection {
    owner: UserId,
    items: Vec<Bookmark>,
    revision: u64,
}

impl BookmarkCollection {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            items: Vec::new(),
            revision: 0,
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Counter bumped on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: &BookmarkId) -> bool {
        self.items.iter().any(|b| &b.id == id)
    }

    pub fn get(&self, id: &BookmarkId) -> Option<&Bookmark> {
        self.items.iter().find(|b| &b.id == id)
    }

    /// Index where a row created at `created_at` belongs. Ties go first.
    fn position_for(&self, created_at: i64) -> usize {
        self.items.partition_point(|b| b.created_at > created_at)
    }

    /// Replaces the contents with an authoritative fetch result.
    ///
    /// Rows of other owners and repeated ids are dropped; the rest is sorted
    /// newest first, keeping the fetch order among equal timestamps.
    /// Returns the number of rows dropped.
    pub fn replace_all(&mut self, fetched: Vec<Bookmark>) -> usize {
        let total = fetched.len();
        let mut seen = HashSet::new();
        let mut items: Vec<Bookmark> = fetched
            .into_iter()
            .filter(|b| b.owner == self.owner && seen.insert(b.id.clone()))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let dropped = total - items.len();
        self.items = items;
        self.revision += 1;
        dropped
    }

    /// Applies a remote change event.
    pub fn apply(&mut self, event: &ChangeEvent) -> ApplyOutcome {
        match event {
            ChangeEvent::Inserted(bookmark) => self.insert(bookmark.clone()),
            ChangeEvent::Deleted { id, owner } => self.delete(id, owner.as_ref()),
        }
    }

    /// Inserts `bookmark` at its ordered position unless its id is already present.
    pub fn insert(&mut self, bookmark: Bookmark) -> ApplyOutcome {
        if bookmark.owner != self.owner {
            return ApplyOutcome::ForeignOwner;
        }
        if self.contains(&bookmark.id) {
            return ApplyOutcome::Duplicate;
        }
        let index = self.position_for(bookmark.created_at);
        self.items.insert(index, bookmark);
        self.revision += 1;
        ApplyOutcome::Inserted
    }

    /// Removes the entry with `id`. `owner`, when known, must match.
    pub fn delete(&mut self, id: &BookmarkId, owner: Option<&UserId>) -> ApplyOutcome {
        if owner.is_some_and(|o| o != &self.owner) {
            return ApplyOutcome::ForeignOwner;
        }
        match self.remove(id) {
            Some(_) => ApplyOutcome::Removed,
            None => ApplyOutcome::Absent,
        }
    }

    /// Takes the entry with `id` out and returns a capture for [`restore`](Self::restore).
    pub fn remove(&mut self, id: &BookmarkId) -> Option<Removal> {
        let index = self.items.iter().position(|b| &b.id == id)?;
        let bookmark = self.items.remove(index);
        self.revision += 1;
        Some(Removal {
            bookmark,
            index,
            revision: self.revision,
        })
    }

    /// Puts a removed entry back.
    ///
    /// If nothing changed since the removal the entry returns to its exact
    /// former index; otherwise it goes to its `created_at` position, keeping
    /// whatever happened in between. Returns `false` if the id is present again.
    pub fn restore(&mut self, removal: Removal) -> bool {
        if removal.bookmark.owner != self.owner || self.contains(&removal.bookmark.id) {
            return false;
        }
        let index = if removal.revision == self.revision && removal.index <= self.items.len() {
            removal.index
        } else {
            self.position_for(removal.bookmark.created_at)
        };
        self.items.insert(index, removal.bookmark);
        self.revision += 1;
        true
    }
}
