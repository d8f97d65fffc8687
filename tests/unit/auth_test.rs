//! Unit tests for the local auth service.

use smartmarks::database::{self, Database};
use smartmarks::services::auth::{AuthService, LocalAuth};
use smartmarks::types::errors::AuthError;

fn auth() -> LocalAuth {
    LocalAuth::new(database::shared(
        Database::open_in_memory().expect("open_in_memory failed"),
    ))
}

#[tokio::test]
async fn test_no_user_before_sign_in() {
    let auth = auth();
    assert_eq!(auth.current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_in_sets_current_user() {
    let auth = auth();
    let user = auth.sign_in("Alice@Example.com ").unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(auth.current_user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_sign_in_is_stable_per_email() {
    let auth = auth();
    let first = auth.sign_in("alice@example.com").unwrap();
    let other = auth.sign_in("bob@example.com").unwrap();
    let again = auth.sign_in("ALICE@example.com").unwrap();

    assert_eq!(first.id, again.id);
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn test_sign_out_clears_current_user() {
    let auth = auth();
    auth.sign_in("alice@example.com").unwrap();
    auth.sign_out().await.unwrap();
    assert_eq!(auth.current_user().await.unwrap(), None);

    // Signing out twice is harmless.
    auth.sign_out().await.unwrap();
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let auth = auth();
    for email in ["", "alice", "@example.com", "alice@", "a@b@c"] {
        let result = auth.sign_in(email);
        assert!(
            matches!(result, Err(AuthError::InvalidEmail(_))),
            "{:?} should be rejected",
            email
        );
    }
    assert_eq!(auth.current_user().await.unwrap(), None);
}
