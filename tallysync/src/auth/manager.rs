//! Session lifecycle and access-token handling.
//!
//! ```text
//! SignedOut --sign_in / sign_up--> TokenValid
//! TokenValid --expiry--> TokenStale
//! TokenStale --refresh ok--> TokenValid
//! TokenStale --refresh failed--> TokenStale   (session kept)
//! any --sign_out--> SignedOut
//! ```
//!
//! The persisted half of the session (user id, refresh token, email) is read
//! from the [`SessionStore`] whenever an in-memory field is missing, so a fresh
//! process resumes where the last one stopped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sea_orm::DbErr;
use tokio::sync::Mutex;

use super::backend::{AuthBackend, AuthTokens};
use super::session::{PersistedSession, SessionStore};
use crate::error::{AuthError, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_stale(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    SignedOut,
    TokenValid,
    TokenStale,
}

#[derive(Debug, Default)]
struct SessionState {
    user_id: Option<String>,
    email: Option<String>,
    refresh_token: Option<String>,
    access: Option<AccessToken>,
}

pub struct CredentialManager {
    backend: Option<Arc<dyn AuthBackend>>,
    sessions: SessionStore,
    state: Mutex<SessionState>,
}

/// Trim and lower-case an email address, rejecting obviously malformed ones.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::MalformedEmail(raw.trim().to_string()));
    }
    Ok(email)
}

impl CredentialManager {
    /// `backend` is `None` when no remote project is configured; every remote
    /// operation then fails with [`AuthError::NotConfigured`].
    pub fn new(backend: Option<Arc<dyn AuthBackend>>, sessions: SessionStore) -> Self {
        Self {
            backend,
            sessions,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn backend(&self) -> Result<&Arc<dyn AuthBackend>, AuthError> {
        self.backend.as_ref().ok_or(AuthError::NotConfigured)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let backend = self.backend()?;
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let tokens = backend.sign_in(&email, password).await?;
        log::info!("signed in as {email}");
        let mut state = self.state.lock().await;
        self.install(&mut state, tokens).await
    }

    /// Create an account. Passwords shorter than [`MIN_PASSWORD_LEN`] are
    /// rejected before the backend is called.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let backend = self.backend()?;
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            }
            .into());
        }
        let tokens = backend.sign_up(&email, password).await?;
        log::info!("account created for {email}");
        let mut state = self.state.lock().await;
        self.install(&mut state, tokens).await
    }

    /// Forget the session in memory and in the local store.
    pub async fn sign_out(&self) -> Result<(), DbErr> {
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        self.sessions.clear().await?;
        log::info!("signed out");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user_id().await.is_some()
    }

    pub async fn user_id(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        state.user_id.clone()
    }

    pub async fn email(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        state.email.clone()
    }

    pub async fn has_refresh_token(&self) -> bool {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        state.refresh_token.is_some()
    }

    pub async fn phase(&self) -> SessionPhase {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        match (&state.user_id, &state.access) {
            (None, _) => SessionPhase::SignedOut,
            (Some(_), Some(token)) if !token.is_stale() => SessionPhase::TokenValid,
            (Some(_), _) => SessionPhase::TokenStale,
        }
    }

    /// A usable access token, refreshing once if the cached one is missing or
    /// stale. `None` when no token could be obtained.
    pub async fn get_access_token(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;

        if let Some(token) = state.access.as_ref().filter(|t| !t.is_stale()) {
            return Some(token.value().to_owned());
        }
        if state.refresh_token.is_none() {
            return None;
        }
        match self.refresh_locked(&mut state).await {
            Ok(token) => Some(token),
            Err(err) => {
                log::warn!("token refresh failed: {err}");
                None
            }
        }
    }

    /// Refresh the access token even if the cached one looks valid.
    pub async fn force_refresh(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut SessionState) -> Result<String, AuthError> {
        let backend = self.backend()?;
        let refresh_token = state
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Rejected("no refresh token available".into()))?;

        // On failure the session is left exactly as it was.
        let tokens = backend.refresh(&refresh_token).await?;
        log::debug!("access token refreshed");

        let value = tokens.id_token.clone();
        let rotated = tokens.refresh_token != refresh_token;
        if !tokens.user_id.is_empty() {
            state.user_id = Some(tokens.user_id);
        }
        state.refresh_token = Some(tokens.refresh_token);
        state.access = Some(AccessToken::new(tokens.id_token, tokens.expires_in));

        if rotated {
            if let Some(persisted) = Self::persisted(state) {
                if let Err(err) = self.sessions.persist(&persisted).await {
                    log::warn!("could not store rotated refresh token: {err}");
                }
            }
        }
        Ok(value)
    }

    async fn install(&self, state: &mut SessionState, tokens: AuthTokens) -> Result<Session, AuthError> {
        let session = Session {
            user_id: tokens.user_id,
            email: tokens.email,
        };
        *state = SessionState {
            user_id: Some(session.user_id.clone()),
            email: session.email.clone(),
            refresh_token: Some(tokens.refresh_token),
            access: Some(AccessToken::new(tokens.id_token, tokens.expires_in)),
        };
        if let Some(persisted) = Self::persisted(state) {
            self.sessions
                .persist(&persisted)
                .await
                .map_err(|e| AuthError::SessionStorage(e.to_string()))?;
        }
        Ok(session)
    }

    fn persisted(state: &SessionState) -> Option<PersistedSession> {
        Some(PersistedSession {
            user_id: state.user_id.clone()?,
            refresh_token: state.refresh_token.clone(),
            email: state.email.clone(),
        })
    }

    /// Fill missing in-memory fields from the persisted session.
    async fn hydrate(&self, state: &mut SessionState) {
        if state.user_id.is_some() && state.refresh_token.is_some() {
            return;
        }
        match self.sessions.load().await {
            Ok(Some(saved)) => {
                if state.user_id.is_none() {
                    log::debug!("session restored for {}", saved.user_id);
                    state.user_id = Some(saved.user_id);
                }
                if state.refresh_token.is_none() {
                    state.refresh_token = saved.refresh_token;
                }
                if state.email.is_none() {
                    state.email = saved.email;
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("could not load persisted session: {err}"),
        }
    }
}
