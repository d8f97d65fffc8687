//! Unit tests for the in-memory BookmarkCollection.

use rstest::rstest;
use smartmarks::managers::bookmark_collection::{ApplyOutcome, BookmarkCollection};
use smartmarks::types::bookmark::{Bookmark, BookmarkId, UserId};
use smartmarks::types::change::ChangeEvent;

fn alice() -> UserId {
    UserId::from("alice")
}

fn bm(id: &str, owner: &str, created_at: i64) -> Bookmark {
    Bookmark {
        id: BookmarkId::from(id),
        owner: UserId::from(owner),
        title: id.to_uppercase(),
        url: format!("https://example.com/{}", id),
        description: None,
        created_at,
    }
}

fn ids(collection: &BookmarkCollection) -> Vec<&str> {
    collection.as_slice().iter().map(|b| b.id.as_str()).collect()
}

/// Collection holding c(3), b(2), a(1).
fn abc() -> BookmarkCollection {
    let mut collection = BookmarkCollection::new(alice());
    collection.replace_all(vec![bm("a", "alice", 1), bm("b", "alice", 2), bm("c", "alice", 3)]);
    collection
}

#[test]
fn test_new_collection_is_empty() {
    let collection = BookmarkCollection::new(alice());
    assert!(collection.is_empty());
    assert_eq!(collection.len(), 0);
    assert_eq!(collection.owner(), &alice());
}

#[test]
fn test_replace_all_sorts_and_drops_foreign_and_duplicates() {
    let mut collection = BookmarkCollection::new(alice());
    let dropped = collection.replace_all(vec![
        bm("a", "alice", 1),
        bm("x", "bob", 9),
        bm("c", "alice", 3),
        bm("a", "alice", 1),
        bm("b", "alice", 2),
    ]);
    assert_eq!(dropped, 2);
    assert_eq!(ids(&collection), vec!["c", "b", "a"]);
}

#[test]
fn test_replace_all_keeps_fetch_order_for_equal_timestamps() {
    let mut collection = BookmarkCollection::new(alice());
    collection.replace_all(vec![bm("first", "alice", 5), bm("second", "alice", 5)]);
    assert_eq!(ids(&collection), vec!["first", "second"]);
}

#[rstest]
#[case(4, vec!["d", "c", "b", "a"])]
#[case(0, vec!["c", "b", "a", "d"])]
#[case(2, vec!["c", "d", "b", "a"])]
fn test_insert_goes_to_created_at_position(#[case] created_at: i64, #[case] expected: Vec<&str>) {
    let mut collection = abc();
    assert_eq!(collection.insert(bm("d", "alice", created_at)), ApplyOutcome::Inserted);
    assert_eq!(ids(&collection), expected);
}

#[test]
fn test_insert_duplicate_is_noop() {
    let mut collection = abc();
    let revision = collection.revision();
    assert_eq!(collection.insert(bm("b", "alice", 7)), ApplyOutcome::Duplicate);
    assert_eq!(ids(&collection), vec!["c", "b", "a"]);
    assert_eq!(collection.revision(), revision);
}

#[test]
fn test_foreign_events_are_rejected() {
    let mut collection = abc();
    assert_eq!(collection.insert(bm("x", "bob", 9)), ApplyOutcome::ForeignOwner);
    assert_eq!(
        collection.delete(&BookmarkId::from("a"), Some(&UserId::from("bob"))),
        ApplyOutcome::ForeignOwner
    );
    assert_eq!(ids(&collection), vec!["c", "b", "a"]);
}

#[test]
fn test_delete_with_and_without_owner() {
    let mut collection = abc();
    assert_eq!(collection.delete(&BookmarkId::from("b"), None), ApplyOutcome::Removed);
    assert_eq!(
        collection.delete(&BookmarkId::from("a"), Some(&alice())),
        ApplyOutcome::Removed
    );
    assert_eq!(collection.delete(&BookmarkId::from("a"), None), ApplyOutcome::Absent);
    assert_eq!(ids(&collection), vec!["c"]);
}

#[test]
fn test_apply_dispatches_events() {
    let mut collection = abc();
    assert_eq!(
        collection.apply(&ChangeEvent::Inserted(bm("d", "alice", 4))),
        ApplyOutcome::Inserted
    );
    assert_eq!(
        collection.apply(&ChangeEvent::Deleted { id: BookmarkId::from("c"), owner: None }),
        ApplyOutcome::Removed
    );
    assert!(collection.contains(&BookmarkId::from("d")));
    assert!(!collection.contains(&BookmarkId::from("c")));
    assert_eq!(collection.get(&BookmarkId::from("d")).map(|b| b.title.as_str()), Some("D"));
}

#[test]
fn test_outcome_changed() {
    assert!(ApplyOutcome::Inserted.changed());
    assert!(ApplyOutcome::Removed.changed());
    assert!(!ApplyOutcome::Duplicate.changed());
    assert!(!ApplyOutcome::Absent.changed());
    assert!(!ApplyOutcome::ForeignOwner.changed());
}

#[test]
fn test_restore_without_interleaving_is_exact() {
    let mut collection = abc();
    let removal = collection.remove(&BookmarkId::from("b")).unwrap();
    assert_eq!(removal.index, 1);
    assert_eq!(ids(&collection), vec!["c", "a"]);

    assert!(collection.restore(removal));
    assert_eq!(ids(&collection), vec!["c", "b", "a"]);
}

#[test]
fn test_restore_exact_index_with_equal_timestamps() {
    let mut collection = BookmarkCollection::new(alice());
    collection.replace_all(vec![bm("x", "alice", 5), bm("y", "alice", 5), bm("z", "alice", 5)]);
    let removal = collection.remove(&BookmarkId::from("z")).unwrap();
    assert!(collection.restore(removal));
    assert_eq!(ids(&collection), vec!["x", "y", "z"]);
}

#[test]
fn test_restore_after_interleaved_changes_keeps_them() {
    let mut collection = abc();
    let removal = collection.remove(&BookmarkId::from("b")).unwrap();
    collection.insert(bm("d", "alice", 4));
    collection.delete(&BookmarkId::from("c"), None);

    assert!(collection.restore(removal));
    assert_eq!(ids(&collection), vec!["d", "b", "a"]);
}

#[test]
fn test_restore_skips_when_id_is_back() {
    let mut collection = abc();
    let removal = collection.remove(&BookmarkId::from("b")).unwrap();
    collection.insert(bm("b", "alice", 2));

    assert!(!collection.restore(removal));
    assert_eq!(ids(&collection), vec!["c", "b", "a"]);
}

#[test]
fn test_remove_absent_returns_none() {
    let mut collection = abc();
    let revision = collection.revision();
    assert!(collection.remove(&BookmarkId::from("zzz")).is_none());
    assert_eq!(collection.revision(), revision);
}
