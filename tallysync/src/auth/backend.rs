use std::time::Duration;

use async_trait::async_trait;

use crate::error::AuthError;

/// Tokens issued by the identity backend on sign-in, sign-up or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub user_id: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}

/// Email/password identity provider.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError>;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
}
