use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::backend::{AuthBackend, AuthTokens};
use crate::config::RemoteConfig;
use crate::error::AuthError;

const SIGN_UP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";
const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Identity Toolkit REST backend (email/password).
#[derive(Debug, Clone)]
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

fn parse_expiry(raw: &str) -> Duration {
    Duration::from_secs(raw.trim().parse().unwrap_or(3600))
}

impl FirebaseAuth {
    pub fn new(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, &config.api_key))
    }

    pub fn with_client(client: Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<T, AuthError> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                log::warn!("identity request failed: {e}");
                AuthError::NetworkUnavailable
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|_| AuthError::NetworkUnavailable)?;
        if !status.is_success() {
            return Err(classify_auth_message(&error_message(&text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| AuthError::Rejected(format!("unexpected identity response: {e}")))
    }

    async fn account_call(&self, url: &str, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let res: AccountResponse = self.post_json(url, &body).await?;
        Ok(AuthTokens {
            user_id: res.local_id,
            email: res.email.or_else(|| Some(email.to_string())),
            id_token: res.id_token,
            refresh_token: res.refresh_token,
            expires_in: parse_expiry(&res.expires_in),
        })
    }
}

#[async_trait]
impl AuthBackend for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.account_call(SIGN_IN_URL, email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.account_call(SIGN_UP_URL, email, password).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });
        let res: RefreshResponse = self.post_json(REFRESH_URL, &body).await?;
        Ok(AuthTokens {
            user_id: res.user_id,
            email: None,
            id_token: res.id_token,
            refresh_token: res.refresh_token,
            expires_in: parse_expiry(&res.expires_in),
        })
    }
}

/// Error bodies look like `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map an identity backend error code onto [`AuthError`].
///
/// Codes may carry a suffix, e.g. `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn classify_auth_message(message: &str) -> AuthError {
    let code = message.split(':').next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => AuthError::EmailAlreadyExists,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
        | "USER_NOT_FOUND" | "MISSING_PASSWORD" => AuthError::InvalidCredentials,
        "USER_DISABLED" => AuthError::UserDisabled,
        "CONFIGURATION_NOT_FOUND" | "OPERATION_NOT_ALLOWED" | "PROJECT_NOT_FOUND" => {
            AuthError::BackendMisconfigured(code.to_string())
        }
        _ if code.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword,
        _ => AuthError::Rejected(message.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(classify_auth_message("EMAIL_EXISTS"), AuthError::EmailAlreadyExists);
        assert_eq!(
            classify_auth_message("INVALID_LOGIN_CREDENTIALS"),
            AuthError::InvalidCredentials
        );
        assert_eq!(classify_auth_message("USER_DISABLED"), AuthError::UserDisabled);
        assert_eq!(
            classify_auth_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert!(matches!(
            classify_auth_message("CONFIGURATION_NOT_FOUND"),
            AuthError::BackendMisconfigured(_)
        ));
    }

    #[test]
    fn test_unknown_code_is_rejected_verbatim() {
        assert_eq!(
            classify_auth_message("TOKEN_EXPIRED"),
            AuthError::Rejected("TOKEN_EXPIRED".into())
        );
    }

    #[test]
    fn test_error_body_extraction() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_EMAIL", "errors": []}}"#;
        assert_eq!(error_message(body), "INVALID_EMAIL");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_expiry_parsing() {
        assert_eq!(parse_expiry("3600"), Duration::from_secs(3600));
        assert_eq!(parse_expiry("soon"), Duration::from_secs(3600));
    }
}
