use std::sync::Arc;

use sea_orm::ConnectOptions;

use crate::auth::{AuthBackend, CredentialManager, FirebaseAuth, SessionStore};
use crate::config::RemoteConfig;
use crate::entity::sync_run;
use crate::error::BuildError;
use crate::local::LocalStore;
use crate::remote::{FirebaseRemote, RemoteStore};
use crate::sync::{Direction, SyncResult, SyncService};

/// Opened local store plus the optional remote side.
///
/// Local operations go through [`TallySync::local`] and work with or without
/// a remote project. Sync calls without one report a "not configured" result.
pub struct TallySync {
    local: LocalStore,
    credentials: Arc<CredentialManager>,
    sync: SyncService,
}

impl TallySync {
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn sync(&self) -> &SyncService {
        &self.sync
    }

    pub async fn push(&self) -> SyncResult {
        self.sync.push().await
    }

    pub async fn pull(&self) -> SyncResult {
        self.sync.pull().await
    }

    pub async fn last_successful_run(
        &self,
        direction: Direction,
    ) -> Result<Option<sync_run::Model>, sea_orm::DbErr> {
        self.sync.last_successful_run(direction).await
    }
}

pub struct TallySyncBuilder {
    database_url: String,
    max_connections: Option<u32>,
    remote_config: Option<RemoteConfig>,
    remote_store: Option<Arc<dyn RemoteStore>>,
    auth_backend: Option<Arc<dyn AuthBackend>>,
}

impl TallySyncBuilder {
    pub fn new(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            max_connections: None,
            remote_config: None,
            remote_store: None,
            auth_backend: None,
        }
    }

    /// Use the REST backends of this remote project. Explicit stores and
    /// backends set with the other `with_*` methods take precedence.
    pub fn with_remote_config(mut self, config: RemoteConfig) -> Self {
        self.remote_config = Some(config);
        self
    }

    pub fn with_remote_store(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote_store = Some(remote);
        self
    }

    pub fn with_auth_backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.auth_backend = Some(backend);
        self
    }

    /// Cap the pool size. `sqlite::memory:` needs 1 so every query sees the
    /// same database.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub async fn build(self) -> Result<TallySync, BuildError> {
        let mut options = ConnectOptions::new(self.database_url.clone());
        if let Some(max) = self.max_connections {
            options.max_connections(max);
        }
        let local = LocalStore::connect_with(options).await?;

        let remote_store = match (self.remote_store, &self.remote_config) {
            (Some(remote), _) => Some(remote),
            (None, Some(config)) => Some(Arc::new(FirebaseRemote::new(config)?) as Arc<dyn RemoteStore>),
            (None, None) => None,
        };
        let auth_backend = match (self.auth_backend, &self.remote_config) {
            (Some(backend), _) => Some(backend),
            (None, Some(config)) => Some(Arc::new(FirebaseAuth::new(config)?) as Arc<dyn AuthBackend>),
            (None, None) => None,
        };
        if remote_store.is_none() {
            log::info!("no remote project configured, running offline only");
        }

        let credentials = Arc::new(CredentialManager::new(
            auth_backend,
            SessionStore::new(local.clone()),
        ));
        let sync = SyncService::new(local.clone(), remote_store, credentials.clone());

        Ok(TallySync {
            local,
            credentials,
            sync,
        })
    }
}
