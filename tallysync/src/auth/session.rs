//! Persisted session fields, kept in the local settings table.

use sea_orm::DbErr;

use crate::local::LocalStore;

pub const USER_ID_KEY: &str = "remote_user_id";
pub const REFRESH_TOKEN_KEY: &str = "remote_refresh_token";
pub const EMAIL_KEY: &str = "remote_email";

/// What survives a restart. The access token is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub user_id: String,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    store: LocalStore,
}

impl SessionStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// The stored session, or `None` when no user id is stored.
    pub async fn load(&self) -> Result<Option<PersistedSession>, DbErr> {
        let Some(user_id) = self.non_empty(USER_ID_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(PersistedSession {
            user_id,
            refresh_token: self.non_empty(REFRESH_TOKEN_KEY).await?,
            email: self.non_empty(EMAIL_KEY).await?,
        }))
    }

    pub async fn persist(&self, session: &PersistedSession) -> Result<(), DbErr> {
        self.store.set_setting(USER_ID_KEY, &session.user_id).await?;
        match &session.refresh_token {
            Some(token) => self.store.set_setting(REFRESH_TOKEN_KEY, token).await?,
            None => {
                self.store.delete_setting(REFRESH_TOKEN_KEY).await?;
            }
        }
        match &session.email {
            Some(email) => self.store.set_setting(EMAIL_KEY, email).await?,
            None => {
                self.store.delete_setting(EMAIL_KEY).await?;
            }
        }
        log::debug!("session persisted for {}", session.user_id);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), DbErr> {
        for key in [USER_ID_KEY, REFRESH_TOKEN_KEY, EMAIL_KEY] {
            self.store.delete_setting(key).await?;
        }
        log::debug!("persisted session cleared");
        Ok(())
    }

    async fn non_empty(&self, key: &str) -> Result<Option<String>, DbErr> {
        Ok(self
            .store
            .get_setting(key)
            .await?
            .filter(|v| !v.trim().is_empty()))
    }
}
