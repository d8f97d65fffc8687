//! smartmarks database layer.
//!
//! Provides SQLite connection management and schema migrations for the
//! local backing store.
//!
//! # Usage
//!
//! ```no_run
//! use smartmarks::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("smartmarks.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

use std::sync::{Arc, Mutex};

pub mod connection;
pub mod migrations;

pub use connection::Database;

/// A database shared between the auth service and the bookmark store.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Wraps an opened database for sharing.
pub fn shared(db: Database) -> SharedDatabase {
    Arc::new(Mutex::new(db))
}
