use sea_orm::sea_query::OnConflict;
use sea_orm::{DbErr, EntityTrait, Set};

use super::levels::{LevelInfo, SkillLevel};
use super::{now_timestamp, LocalStore};
use crate::entity::user_points;

/// The balance lives in a single row with this id.
pub const POINTS_ROW_ID: i32 = 1;

/// Points move in steps of 0.01; round away float drift.
fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl LocalStore {
    pub async fn total_points(&self) -> Result<f64, DbErr> {
        let row = user_points::Entity::find_by_id(POINTS_ROW_ID)
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.total_points).unwrap_or(0.0))
    }

    /// Current tier and sublevel for the stored balance.
    pub async fn level(&self) -> Result<(SkillLevel, f64), DbErr> {
        Ok(SkillLevel::from_points(self.total_points().await?))
    }

    pub async fn level_info(&self) -> Result<LevelInfo, DbErr> {
        Ok(LevelInfo::from_points(self.total_points().await?))
    }

    /// Add `delta` (negative to deduct) to the balance, clamped at zero.
    ///
    /// Reward statuses are re-derived afterwards. Returns the new total.
    pub async fn add_points(&self, delta: f64) -> Result<f64, DbErr> {
        let current = self.total_points().await?;
        let total = round_points((current + delta).max(0.0));

        let row = user_points::ActiveModel {
            id: Set(POINTS_ROW_ID),
            total_points: Set(total),
            last_updated: Set(Some(now_timestamp())),
        };
        user_points::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user_points::Column::Id)
                    .update_columns([
                        user_points::Column::TotalPoints,
                        user_points::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        log::debug!("points {current:.2} -> {total:.2} (delta {delta:+.2})");
        self.update_reward_statuses().await?;
        Ok(total)
    }
}
