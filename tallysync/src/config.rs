//! Remote project configuration.
//!
//! A [`RemoteConfig`] names the identity API key, the project and the realtime
//! database root. It can be built by hand or read from a `google-services.json`
//! file exported from the project console.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub api_key: String,
    pub project_id: String,
    pub database_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RemoteConfig {
    /// Configuration with the project's default realtime database URL and a
    /// ten second request timeout.
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        Self {
            api_key: api_key.into(),
            database_url: default_database_url(&project_id),
            project_id,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the contents of a `google-services.json` file.
    pub fn from_google_services_json(raw: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_json::from_str(raw)?;

        let project_id = doc
            .pointer("/project_info/project_id")
            .and_then(Value::as_str)
            .ok_or(ConfigError::Missing("project_info.project_id"))?;
        let api_key = doc
            .pointer("/client/0/api_key/0/current_key")
            .and_then(Value::as_str)
            .ok_or(ConfigError::Missing("client[0].api_key[0].current_key"))?;

        let mut config = Self::new(api_key, project_id);
        if let Some(url) = doc
            .pointer("/project_info/firebase_url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            config = config.with_database_url(url);
        }
        Ok(config)
    }

    /// Read and parse a `google-services.json` file from disk.
    pub fn from_google_services(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_google_services_json(&raw)
    }
}

fn default_database_url(project_id: &str) -> String {
    format!("https://{project_id}-default-rtdb.firebaseio.com")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_project_id() {
        let config = RemoteConfig::new("key", "habits-app");
        assert_eq!(
            config.database_url,
            "https://habits-app-default-rtdb.firebaseio.com"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_google_services_with_firebase_url() {
        let raw = r#"{
            "project_info": {
                "project_id": "habits-app",
                "firebase_url": "https://habits-app-eu.europe-west1.firebasedatabase.app/"
            },
            "client": [{ "api_key": [{ "current_key": "AIzaTest" }] }]
        }"#;
        let config = RemoteConfig::from_google_services_json(raw).unwrap();
        assert_eq!(config.api_key, "AIzaTest");
        assert_eq!(config.project_id, "habits-app");
        assert_eq!(
            config.database_url,
            "https://habits-app-eu.europe-west1.firebasedatabase.app"
        );
    }

    #[test]
    fn test_google_services_missing_key() {
        let raw = r#"{ "project_info": { "project_id": "habits-app" }, "client": [] }"#;
        let err = RemoteConfig::from_google_services_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(field) if field.contains("api_key")));
    }

    #[test]
    fn test_google_services_without_url_uses_default() {
        let raw = r#"{
            "project_info": { "project_id": "p1" },
            "client": [{ "api_key": [{ "current_key": "k" }] }]
        }"#;
        let config = RemoteConfig::from_google_services_json(raw).unwrap();
        assert_eq!(config.database_url, "https://p1-default-rtdb.firebaseio.com");
    }
}
