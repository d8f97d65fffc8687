//! Auth service for smartmarks.
//!
//! `AuthService` is the collaborator the application asks for the signed-in
//! user. `LocalAuth` keeps users in the local database and tracks a single
//! signed-in user per process. It does not implement any real sign-in
//! protocol: `sign_in` trusts the email it is given.

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::SharedDatabase;
use crate::types::bookmark::{User, UserId};
use crate::types::errors::AuthError;

/// Trait defining the auth operations the application depends on.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_user(&self) -> Result<Option<User>, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Auth service backed by the `users` table.
pub struct LocalAuth {
    db: SharedDatabase,
    current: Mutex<Option<User>>,
}

impl LocalAuth {
    pub fn new(db: SharedDatabase) -> Self {
        Self {
            db,
            current: Mutex::new(None),
        }
    }

    /// Signs in as `email`, creating the user on first sign-in.
    pub fn sign_in(&self, email: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        let valid = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            None => false,
        };
        if !valid {
            return Err(AuthError::InvalidEmail(email));
        }

        let mut db = self
            .db
            .lock()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let existing: Option<String> = db
            .connection()
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                let now = db.next_timestamp();
                db.connection()
                    .execute(
                        "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                        params![id, email, now],
                    )
                    .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
                tracing::info!(user = %id, "created user");
                id
            }
        };
        drop(db);

        let user = User {
            id: UserId(id),
            email,
        };
        let mut current = self
            .current
            .lock()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        *current = Some(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let current = self
            .current
            .lock()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        Ok(current.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut current = self
            .current
            .lock()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if let Some(user) = current.take() {
            tracing::info!(user = %user.id, "signed out");
        }
        Ok(())
    }
}
