use sea_orm::sea_query::OnConflict;
use sea_orm::{DbErr, EntityTrait, Set};

use super::{now_timestamp, require_text, LocalStore};
use crate::entity::user_setting;
use crate::error::StoreError;

pub const USER_NAME_KEY: &str = "user_name";
pub const DEFAULT_USER_NAME: &str = "User";

impl LocalStore {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, DbErr> {
        let row = user_setting::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.value))
    }

    /// Insert or replace a setting. Last write wins.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), DbErr> {
        let row = user_setting::ActiveModel {
            key: Set(key.to_owned()),
            value: Set(value.to_owned()),
            updated_at: Set(Some(now_timestamp())),
        };
        user_setting::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user_setting::Column::Key)
                    .update_columns([user_setting::Column::Value, user_setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, DbErr> {
        let res = user_setting::Entity::delete_by_id(key.to_owned())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Display name, `"User"` when none has been set.
    pub async fn user_name(&self) -> Result<String, DbErr> {
        Ok(self
            .get_setting(USER_NAME_KEY)
            .await?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()))
    }

    pub async fn set_user_name(&self, name: &str) -> Result<(), StoreError> {
        let name = require_text("user_name", name)?;
        self.set_setting(USER_NAME_KEY, &name).await?;
        Ok(())
    }
}
