//! Orchestration of a sync pass: session checks, error classification and the
//! single refresh-and-retry.
//!
//! The engine never catches errors. Every failure of a pass lands here exactly
//! once, is classified through [`SyncError::class`] and turned into a
//! [`SyncResult`]. An authentication failure earns one forced token refresh and
//! one re-run of the whole pass; nothing else is retried. A failed pass never
//! clears the session.

use std::sync::Arc;

use super::engine::SyncEngine;
use super::protocol::{Direction, SyncPass, SyncResult};
use super::sync_log::SyncLog;
use crate::auth::CredentialManager;
use crate::entity::sync_run;
use crate::error::{AuthError, ErrorClass, SyncError};
use crate::local::LocalStore;
use crate::remote::RemoteStore;

pub const NOT_CONFIGURED_MESSAGE: &str = "Cloud sync is not configured.";
pub const NOT_SIGNED_IN_MESSAGE: &str = "Sign in to sync your data.";
pub const TOKEN_UNAVAILABLE_MESSAGE: &str = "Could not obtain a valid token, please sign in again.";
pub const REAUTHENTICATE_MESSAGE: &str =
    "The server rejected your session, please sign in again.";
pub const OFFLINE_MESSAGE: &str =
    "No internet connection. The app keeps working offline; sync again once you are connected.";

pub struct SyncService {
    engine: Option<SyncEngine>,
    credentials: Arc<CredentialManager>,
    log: SyncLog,
}

impl SyncService {
    /// `remote` is `None` when no remote project is configured.
    pub fn new(
        local: LocalStore,
        remote: Option<Arc<dyn RemoteStore>>,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            engine: remote.map(|remote| SyncEngine::new(local.clone(), remote)),
            credentials,
            log: SyncLog::new(local),
        }
    }

    /// Upload every local change.
    pub async fn push(&self) -> SyncResult {
        self.run(SyncPass::push()).await
    }

    /// Download every remote change.
    pub async fn pull(&self) -> SyncResult {
        self.run(SyncPass::pull()).await
    }

    /// Push then pull. A failed push skips the pull.
    ///
    /// Each pass is retried and logged on its own; the result carries the
    /// counters of both, prefixed `push_` and `pull_`.
    pub async fn sync(&self) -> SyncResult {
        let pushed = self.push().await;
        if !pushed.success {
            return pushed;
        }
        let pulled = self.pull().await;
        SyncResult::combine(pushed, pulled)
    }

    /// Run `pass` and record its outcome in the run log.
    pub async fn run(&self, pass: SyncPass) -> SyncResult {
        let result = self.execute(&pass).await;
        if result.success {
            log::info!("{} finished: {}", pass.direction, result.message);
        } else {
            log::warn!(
                "{} failed: {} ({})",
                pass.direction,
                result.message,
                result.error_detail.as_deref().unwrap_or("no detail")
            );
        }
        if let Err(err) = self.log.record(pass.direction, &result).await {
            log::warn!("could not record sync run: {err}");
        }
        result
    }

    pub async fn last_successful_run(
        &self,
        direction: Direction,
    ) -> Result<Option<sync_run::Model>, sea_orm::DbErr> {
        self.log.last_successful_run(direction).await
    }

    pub fn log(&self) -> &SyncLog {
        &self.log
    }

    async fn execute(&self, pass: &SyncPass) -> SyncResult {
        let Some(engine) = &self.engine else {
            return SyncResult::failure(NOT_CONFIGURED_MESSAGE, SyncError::NotConfigured);
        };
        let Some(user_id) = self.credentials.user_id().await else {
            return SyncResult::failure(NOT_SIGNED_IN_MESSAGE, SyncError::SessionMissing);
        };
        let Some(token) = self.credentials.get_access_token().await else {
            return SyncResult::failure(TOKEN_UNAVAILABLE_MESSAGE, SyncError::TokenUnavailable);
        };

        log::info!("starting {} for user {user_id}", pass.direction);
        match engine.run(pass, &user_id, &token).await {
            Ok(stats) => SyncResult::success(pass.direction, stats),
            Err(err) => self.recover(engine, pass, &user_id, err).await,
        }
    }

    async fn recover(
        &self,
        engine: &SyncEngine,
        pass: &SyncPass,
        user_id: &str,
        err: SyncError,
    ) -> SyncResult {
        if err.class() != ErrorClass::Auth || !self.credentials.has_refresh_token().await {
            return classify_failure(err);
        }

        log::info!("{} rejected ({err}), refreshing token and retrying once", pass.direction);
        let token = match self.credentials.force_refresh().await {
            Ok(token) => token,
            Err(AuthError::NetworkUnavailable) => {
                return SyncResult::failure(OFFLINE_MESSAGE, err);
            }
            Err(refresh_err) => {
                log::warn!("token refresh failed: {refresh_err}");
                return SyncResult::failure(
                    REAUTHENTICATE_MESSAGE,
                    format!("{err}; refresh failed: {refresh_err}"),
                );
            }
        };

        match engine.run(pass, user_id, &token).await {
            Ok(stats) => SyncResult::success(pass.direction, stats),
            Err(retry_err) if retry_err.class() == ErrorClass::Auth => {
                SyncResult::failure(REAUTHENTICATE_MESSAGE, retry_err)
            }
            Err(retry_err) => classify_failure(retry_err),
        }
    }
}

fn classify_failure(err: SyncError) -> SyncResult {
    match err.class() {
        ErrorClass::Network => SyncResult::failure(OFFLINE_MESSAGE, err),
        _ => SyncResult::failure(format!("Sync failed: {err}"), err),
    }
}
