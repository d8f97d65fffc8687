//! Bookmark backing store for smartmarks.
//!
//! `BookmarkStore` is the data-store collaborator consumed by the
//! synchronization store. `SqliteBookmarkStore` is the local implementation:
//! it runs on `rusqlite`, acts on behalf of one authenticated caller, and
//! publishes every committed change to a `ChangeHub`.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::SharedDatabase;
use crate::services::change_feed::ChangeHub;
use crate::types::bookmark::{Bookmark, BookmarkId, NewBookmark, UserId};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;

/// Trait defining the backing-store operations used by the sync store.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Returns all bookmarks of `owner`, newest first.
    async fn select(&self, owner: &UserId) -> Result<Vec<Bookmark>, StoreError>;
    /// Inserts a bookmark; the store assigns `id` and `created_at`.
    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError>;
    /// Deletes a bookmark by id. Ownership is enforced by the store.
    async fn delete_by_id(&self, id: &BookmarkId) -> Result<(), StoreError>;
}

/// Bookmark store backed by the shared SQLite database, scoped to one caller.
#[derive(Clone)]
pub struct SqliteBookmarkStore {
    db: SharedDatabase,
    hub: Arc<ChangeHub>,
    caller: UserId,
}

impl SqliteBookmarkStore {
    /// Creates a store acting on behalf of `caller`.
    pub fn new(db: SharedDatabase, hub: Arc<ChangeHub>, caller: UserId) -> Self {
        Self { db, hub, caller }
    }

    pub fn caller(&self) -> &UserId {
        &self.caller
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: BookmarkId(row.get(0)?),
            owner: UserId(row.get(1)?),
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn validate(bookmark: &NewBookmark) -> Result<(), StoreError> {
        if bookmark.title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".to_string()));
        }
        url::Url::parse(&bookmark.url)
            .map_err(|e| StoreError::Validation(format!("invalid url '{}': {}", bookmark.url, e)))?;
        Ok(())
    }
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn select(&self, owner: &UserId) -> Result<Vec<Bookmark>, StoreError> {
        // Row-level security: other users' rows are invisible.
        if owner != &self.caller {
            return Ok(Vec::new());
        }

        let db = self
            .db
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let mut stmt = db
            .connection()
            .prepare(
                "SELECT id, user_id, title, url, description, created_at \
                 FROM bookmarks WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![owner.as_str()], Self::row_to_bookmark)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }

    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError> {
        if bookmark.owner != self.caller {
            return Err(StoreError::Forbidden(format!(
                "cannot insert bookmarks for user {}",
                bookmark.owner
            )));
        }
        Self::validate(&bookmark)?;

        let mut db = self
            .db
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let created = Bookmark {
            id: BookmarkId(Uuid::new_v4().to_string()),
            owner: bookmark.owner,
            title: bookmark.title,
            url: bookmark.url,
            description: bookmark.description,
            created_at: db.next_timestamp(),
        };

        db.connection()
            .execute(
                "INSERT INTO bookmarks (id, user_id, title, url, description, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    created.id.as_str(),
                    created.owner.as_str(),
                    created.title,
                    created.url,
                    created.description,
                    created.created_at
                ],
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        // Published under the database lock so feed order matches commit order.
        self.hub
            .publish(&created.owner, ChangeEvent::Inserted(created.clone()));
        drop(db);

        tracing::debug!(id = %created.id, owner = %created.owner, "bookmark inserted");
        Ok(created)
    }

    async fn delete_by_id(&self, id: &BookmarkId) -> Result<(), StoreError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let conn = db.connection();

        let owner: Option<String> = conn
            .query_row(
                "SELECT user_id FROM bookmarks WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        match owner {
            None => {
                tracing::debug!(id = %id, "delete of absent bookmark");
                Ok(())
            }
            Some(owner) if owner != self.caller.as_str() => Err(StoreError::Forbidden(format!(
                "bookmark {} belongs to another user",
                id
            ))),
            Some(_) => {
                conn.execute(
                    "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                    params![id.as_str(), self.caller.as_str()],
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

                self.hub.publish(
                    &self.caller,
                    ChangeEvent::Deleted {
                        id: id.clone(),
                        owner: Some(self.caller.clone()),
                    },
                );
                tracing::debug!(id = %id, owner = %self.caller, "bookmark deleted");
                Ok(())
            }
        }
    }
}
