use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};

use super::RemoteStore;
use crate::config::RemoteConfig;
use crate::error::SyncError;

/// Realtime database REST adapter: `{database_url}/{path}.json?auth={token}`.
#[derive(Debug, Clone)]
pub struct FirebaseRemote {
    client: Client,
    base_url: String,
}

impl FirebaseRemote {
    /// Build a client that applies the configured timeout to every call.
    pub fn new(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, &config.database_url))
    }

    pub fn with_client(client: Client, database_url: &str) -> Self {
        Self {
            client,
            base_url: database_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SyncError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SyncError::Remote {
            status: status.as_u16(),
            message: format!("response is not valid JSON: {e}"),
        })
    }
}

#[async_trait]
impl RemoteStore for FirebaseRemote {
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, SyncError> {
        let request = Self::authorize(self.client.get(self.url(path)), token);
        self.send(request).await
    }

    async fn set(&self, path: &str, value: Value, token: Option<&str>) -> Result<(), SyncError> {
        log::debug!("PUT {path}");
        let request = Self::authorize(self.client.put(self.url(path)), token).json(&value);
        self.send(request).await.map(drop)
    }

    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), SyncError> {
        log::debug!("PATCH {path} ({} fields)", fields.len());
        let request = Self::authorize(self.client.patch(self.url(path)), token).json(&fields);
        self.send(request).await.map(drop)
    }

    async fn remove(&self, path: &str, token: Option<&str>) -> Result<(), SyncError> {
        log::debug!("DELETE {path}");
        let request = Self::authorize(self.client.delete(self.url(path)), token);
        self.send(request).await.map(drop)
    }
}

fn transport_error(err: reqwest::Error) -> SyncError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        SyncError::Network(err.to_string())
    } else {
        SyncError::Remote {
            status: err.status().map(|s| s.as_u16()).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

/// Error bodies look like `{"error": "Permission denied"}`.
fn status_error(status: StatusCode, body: &str) -> SyncError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::PermissionDenied(message),
        _ => SyncError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}
