use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a bookmark row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub String);

impl BookmarkId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookmarkId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BookmarkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a user; the partition key for every bookmark row and event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A saved link as stored by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(rename = "user_id")]
    pub owner: UserId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// UNIX timestamp in milliseconds, assigned by the store.
    pub created_at: i64,
}

/// Insert request for the backing store. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    #[serde(rename = "user_id")]
    pub owner: UserId,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

impl NewBookmark {
    /// Builds an insert request; an empty description is treated as absent.
    pub fn new(owner: UserId, title: &str, url: &str, description: &str) -> Self {
        let description = if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        };
        Self {
            owner,
            title: title.to_string(),
            url: url.to_string(),
            description,
        }
    }
}

/// The signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}
