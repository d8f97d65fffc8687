//! Unit tests for the smartmarks database layer (connection + migrations).

use smartmarks::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use smartmarks::database::Database;
use tempfile::TempDir;

fn table_exists(db: &Database, kind: &str, name: &str) -> bool {
    db.connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap_or(false)
}

fn insert_user(db: &Database, id: &str) {
    db.connection()
        .execute(
            "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, 0)",
            rusqlite::params![id, format!("{}@example.com", id)],
        )
        .expect("Should be able to insert into users table");
}

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_all_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");

    for table in ["schema_version", "users", "bookmarks"] {
        assert!(table_exists(&db, "table", table), "Table '{}' should exist after migrations", table);
    }
    assert!(table_exists(&db, "index", "idx_bookmarks_user_created"));
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let result = run_all(db.connection());
    assert!(result.is_ok(), "Running migrations twice should succeed (idempotent)");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);

    let recorded: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(recorded, CURRENT_SCHEMA_VERSION as i64);
}

#[test]
fn test_open_file_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    let db = Database::open(&db_path);
    assert!(db.is_ok(), "open with file path should succeed");
    assert!(db_path.exists(), "Database file should exist on disk");
}

#[test]
fn test_bookmark_requires_existing_user() {
    let db = Database::open_in_memory().expect("open_in_memory failed");

    let orphan = db.connection().execute(
        "INSERT INTO bookmarks (id, user_id, title, url, description, created_at)
         VALUES ('bk-1', 'ghost', 'Example', 'https://example.com', NULL, 1)",
        [],
    );
    assert!(orphan.is_err(), "foreign keys should be enforced");

    insert_user(&db, "u1");
    db.connection()
        .execute(
            "INSERT INTO bookmarks (id, user_id, title, url, description, created_at)
             VALUES ('bk-1', 'u1', 'Example', 'https://example.com', NULL, 1)",
            [],
        )
        .expect("Should be able to insert into bookmarks table");
}

#[test]
fn test_deleting_user_cascades_to_bookmarks() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    insert_user(&db, "u1");
    db.connection()
        .execute(
            "INSERT INTO bookmarks (id, user_id, title, url, description, created_at)
             VALUES ('bk-1', 'u1', 'Example', 'https://example.com', 'desc', 1)",
            [],
        )
        .unwrap();

    db.connection().execute("DELETE FROM users WHERE id = 'u1'", []).unwrap();
    let remaining: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn test_timestamps_strictly_increase() {
    let mut db = Database::open_in_memory().expect("open_in_memory failed");
    let mut last = db.next_timestamp();
    for _ in 0..1000 {
        let next = db.next_timestamp();
        assert!(next > last, "{} should be greater than {}", next, last);
        last = next;
    }
}

#[test]
fn test_timestamps_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let far_future = i64::MAX / 2;

    {
        let db = Database::open(&db_path).unwrap();
        insert_user(&db, "u1");
        db.connection()
            .execute(
                "INSERT INTO bookmarks (id, user_id, title, url, description, created_at)
                 VALUES ('bk-1', 'u1', 'Example', 'https://example.com', NULL, ?1)",
                [far_future],
            )
            .unwrap();
    }

    let mut db = Database::open(&db_path).unwrap();
    assert!(db.next_timestamp() > far_future);
}
