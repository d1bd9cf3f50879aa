mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tallysync::auth::{CredentialManager, SessionPhase, SessionStore, REFRESH_TOKEN_KEY, USER_ID_KEY};
use tallysync::error::AuthError;

use common::{signed_in, store, FakeAuthBackend, EMAIL, PASSWORD, USER_ID};

#[tokio::test]
async fn test_sign_in_persists_session() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::new());
    let manager = CredentialManager::new(Some(backend.clone()), SessionStore::new(store.clone()));

    let session = manager.sign_in("  ANA@example.com ", PASSWORD).await.unwrap();
    assert_eq!(session.user_id, USER_ID);
    assert_eq!(session.email.as_deref(), Some(EMAIL));

    assert_eq!(store.get_setting(USER_ID_KEY).await.unwrap().as_deref(), Some(USER_ID));
    assert_eq!(
        store.get_setting(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("refresh-1")
    );
    assert_eq!(manager.get_access_token().await.as_deref(), Some("token-1"));
    assert_eq!(manager.phase().await, SessionPhase::TokenValid);
}

#[tokio::test]
async fn test_client_side_validation_skips_backend() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::new());
    let manager = CredentialManager::new(Some(backend.clone()), SessionStore::new(store));

    assert_eq!(
        manager.sign_in("not-an-email", PASSWORD).await.unwrap_err(),
        AuthError::InvalidEmail
    );
    assert_eq!(
        manager.sign_up("new@example.com", "12345").await.unwrap_err(),
        AuthError::WeakPassword
    );
    assert_eq!(backend.sign_ins.load(Ordering::SeqCst), 0);
    assert_eq!(backend.sign_ups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_backend_errors_pass_through() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::new());
    let manager = CredentialManager::new(Some(backend), SessionStore::new(store));

    assert_eq!(
        manager.sign_in(EMAIL, "wrong-password").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(
        manager.sign_up(EMAIL, PASSWORD).await.unwrap_err(),
        AuthError::EmailAlreadyExists
    );
    assert!(!manager.is_authenticated().await);
}

#[tokio::test]
async fn test_without_backend_everything_is_not_configured() {
    let store = store().await;
    let manager = CredentialManager::new(None, SessionStore::new(store));

    assert_eq!(
        manager.sign_in(EMAIL, PASSWORD).await.unwrap_err(),
        AuthError::NotConfigured
    );
    assert!(manager.get_access_token().await.is_none());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::new());
    signed_in(&store, backend.clone()).await;

    // New manager over the same database: nothing in memory yet.
    let manager = CredentialManager::new(Some(backend.clone()), SessionStore::new(store.clone()));
    assert!(manager.is_authenticated().await);
    assert_eq!(manager.email().await.as_deref(), Some(EMAIL));
    assert_eq!(manager.phase().await, SessionPhase::TokenStale);

    // No access token cached, so exactly one refresh.
    assert_eq!(manager.get_access_token().await.as_deref(), Some("token-2"));
    assert_eq!(backend.refresh_count(), 1);
    assert_eq!(manager.get_access_token().await.as_deref(), Some("token-2"));
    assert_eq!(backend.refresh_count(), 1);

    // The rotated refresh token was stored.
    assert_eq!(
        store.get_setting(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_stale_token_is_refreshed_once() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::with_expiry(Duration::from_secs(60)));
    let manager = signed_in(&store, backend.clone()).await;

    assert_eq!(manager.phase().await, SessionPhase::TokenStale);
    assert_eq!(manager.get_access_token().await.as_deref(), Some("token-2"));
    assert_eq!(backend.refresh_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_session() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::with_expiry(Duration::from_secs(60)));
    let manager = signed_in(&store, backend.clone()).await;
    backend.fail_refresh_with(AuthError::Rejected("TOKEN_EXPIRED".into()));

    assert!(manager.get_access_token().await.is_none());
    assert_eq!(backend.refresh_count(), 1);
    assert!(manager.force_refresh().await.is_err());
    assert_eq!(backend.refresh_count(), 2);

    assert!(manager.is_authenticated().await);
    assert!(manager.has_refresh_token().await);
    assert_eq!(store.get_setting(USER_ID_KEY).await.unwrap().as_deref(), Some(USER_ID));
}

#[tokio::test]
async fn test_sign_out_clears_memory_and_store() {
    let store = store().await;
    let backend = Arc::new(FakeAuthBackend::new());
    let manager = signed_in(&store, backend).await;

    manager.sign_out().await.unwrap();

    assert!(!manager.is_authenticated().await);
    assert_eq!(manager.phase().await, SessionPhase::SignedOut);
    assert!(manager.get_access_token().await.is_none());
    assert!(store.get_setting(USER_ID_KEY).await.unwrap().is_none());
    assert!(store.get_setting(REFRESH_TOKEN_KEY).await.unwrap().is_none());
}
