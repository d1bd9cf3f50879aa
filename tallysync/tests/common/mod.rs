#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tallysync::auth::{AuthBackend, AuthTokens, CredentialManager, SessionStore};
use tallysync::entity::task::{self, TaskStatus};
use tallysync::error::{AuthError, SyncError};
use tallysync::local::LocalStore;
use tallysync::remote::RemoteStore;
use tallysync::sea_orm::ConnectOptions;

pub const USER_ID: &str = "uid-1";
pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "hunter22";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh in-memory store. One pooled connection so every query sees the same
/// database.
pub async fn store() -> LocalStore {
    init_logger();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    LocalStore::connect_with(options)
        .await
        .expect("failed to open in-memory store")
}

pub fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn day(d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn task_model(id: i32, title: &str, updated_at: chrono::NaiveDateTime) -> task::Model {
    task::Model {
        id,
        title: title.into(),
        description: None,
        due_date: None,
        status: TaskStatus::Pending,
        created_at: Some(updated_at),
        updated_at: Some(updated_at),
    }
}

/// Identity backend that issues `token-N` / `refresh-N` pairs from a counter.
pub struct FakeAuthBackend {
    pub sign_ins: AtomicUsize,
    pub sign_ups: AtomicUsize,
    pub refreshes: AtomicUsize,
    issued: AtomicUsize,
    expires_in: Duration,
    refresh_failure: Mutex<Option<AuthError>>,
}

impl FakeAuthBackend {
    pub fn new() -> Self {
        Self::with_expiry(Duration::from_secs(3600))
    }

    pub fn with_expiry(expires_in: Duration) -> Self {
        Self {
            sign_ins: AtomicUsize::new(0),
            sign_ups: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            expires_in,
            refresh_failure: Mutex::new(None),
        }
    }

    /// Make every following refresh fail with `err`.
    pub fn fail_refresh_with(&self, err: AuthError) {
        *self.refresh_failure.lock().unwrap() = Some(err);
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn issue(&self, email: Option<&str>) -> AuthTokens {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        AuthTokens {
            user_id: USER_ID.into(),
            email: email.map(str::to_owned),
            id_token: format!("token-{n}"),
            refresh_token: format!("refresh-{n}"),
            expires_in: self.expires_in,
        }
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        if email != EMAIL || password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.issue(Some(email)))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthTokens, AuthError> {
        self.sign_ups.fetch_add(1, Ordering::SeqCst);
        if email == EMAIL {
            return Err(AuthError::EmailAlreadyExists);
        }
        Ok(self.issue(Some(email)))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<AuthTokens, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.refresh_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.issue(None))
    }
}

/// Credential manager over `store`, already signed in as [`USER_ID`].
pub async fn signed_in(
    store: &LocalStore,
    backend: Arc<FakeAuthBackend>,
) -> Arc<CredentialManager> {
    let manager = CredentialManager::new(Some(backend), SessionStore::new(store.clone()));
    manager
        .sign_in(EMAIL, PASSWORD)
        .await
        .expect("sign in with fake backend");
    Arc::new(manager)
}

/// Remote that fails every call with the given error and counts attempts.
pub struct FailingRemote {
    pub calls: AtomicUsize,
    error: fn() -> SyncError,
}

impl FailingRemote {
    pub fn denying() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            error: || SyncError::PermissionDenied("Permission denied".into()),
        }
    }

    pub fn offline() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            error: || SyncError::Network("connection refused".into()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> SyncError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.error)()
    }
}

#[async_trait]
impl RemoteStore for FailingRemote {
    async fn get(&self, _path: &str, _token: Option<&str>) -> Result<Value, SyncError> {
        Err(self.fail())
    }

    async fn set(&self, _path: &str, _value: Value, _token: Option<&str>) -> Result<(), SyncError> {
        Err(self.fail())
    }

    async fn update(
        &self,
        _path: &str,
        _fields: Map<String, Value>,
        _token: Option<&str>,
    ) -> Result<(), SyncError> {
        Err(self.fail())
    }

    async fn remove(&self, _path: &str, _token: Option<&str>) -> Result<(), SyncError> {
        Err(self.fail())
    }
}
