use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, NotSet, Set};

use super::collections::reward_active;
use super::{now_timestamp, optional_text, require_text, LocalCollection, LocalStore, Rewards};
use crate::entity::reward::{self, RewardStatus};
use crate::error::{StoreError, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct NewReward {
    pub name: String,
    pub description: Option<String>,
    pub target_points: f64,
}

fn check_target_points(value: f64) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::NonPositive {
            field: "target_points",
            value,
        });
    }
    Ok(())
}

impl LocalStore {
    pub fn rewards(&self) -> Rewards {
        Rewards::new(self.clone())
    }

    /// All rewards, with statuses re-derived from the current balance first.
    pub async fn list_rewards(&self) -> Result<Vec<reward::Model>, DbErr> {
        self.update_reward_statuses().await?;
        self.rewards().all().await
    }

    pub async fn get_reward(&self, id: i32) -> Result<Option<reward::Model>, DbErr> {
        self.rewards().get(id).await
    }

    pub async fn create_reward(&self, new: NewReward) -> Result<reward::Model, StoreError> {
        let name = require_text("name", &new.name)?;
        check_target_points(new.target_points)?;
        let now = now_timestamp();
        let active = reward::ActiveModel {
            id: NotSet,
            name: Set(name),
            description: Set(optional_text(new.description)),
            target_points: Set(new.target_points),
            status: Set(RewardStatus::ToReach),
            claimed_at: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };
        let created = active.insert(&self.db).await?;
        self.update_reward_statuses().await?;
        Ok(self.get_reward(created.id).await?.unwrap_or(created))
    }

    /// Persist edits to a reward's name, description or target.
    pub async fn update_reward(&self, mut reward: reward::Model) -> Result<reward::Model, StoreError> {
        reward.name = require_text("name", &reward.name)?;
        check_target_points(reward.target_points)?;
        reward.description = optional_text(reward.description);
        reward.updated_at = Some(now_timestamp());
        let saved = reward_active(reward).update(&self.db).await?;
        self.update_reward_statuses().await?;
        Ok(self.get_reward(saved.id).await?.unwrap_or(saved))
    }

    /// Move every unclaimed reward to `claimable` or `to_reach` according to
    /// the current balance. Returns how many rewards changed.
    pub async fn update_reward_statuses(&self) -> Result<usize, DbErr> {
        let points = self.total_points().await?;
        let mut changed = 0;
        for mut reward in self.rewards().all().await? {
            if reward.status == RewardStatus::Claimed {
                continue;
            }
            let wanted = if points >= reward.target_points {
                RewardStatus::Claimable
            } else {
                RewardStatus::ToReach
            };
            if reward.status != wanted {
                log::debug!("reward #{} {:?} -> {:?}", reward.id, reward.status, wanted);
                reward.status = wanted;
                reward.updated_at = Some(now_timestamp());
                reward_active(reward).update(&self.db).await?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn claimable_reward(&self, id: i32) -> Result<reward::Model, StoreError> {
        self.update_reward_statuses().await?;
        let reward = self
            .get_reward(id)
            .await?
            .ok_or(ValidationError::NotFound { kind: "reward", id })?;
        if reward.status != RewardStatus::Claimable {
            return Err(ValidationError::InvalidState(format!(
                "reward #{id} is not claimable (status: {:?})",
                reward.status
            ))
            .into());
        }
        Ok(reward)
    }

    pub async fn claim_reward(&self, id: i32) -> Result<reward::Model, StoreError> {
        let mut reward = self.claimable_reward(id).await?;
        let now = now_timestamp();
        reward.status = RewardStatus::Claimed;
        reward.claimed_at = Some(now);
        reward.updated_at = Some(now);
        Ok(reward_active(reward).update(&self.db).await?)
    }

    /// Put a claimable reward back in play with a higher target.
    ///
    /// `new_target` must exceed the current balance.
    pub async fn reuse_reward(&self, id: i32, new_target: f64) -> Result<reward::Model, StoreError> {
        let mut reward = self.claimable_reward(id).await?;
        let points = self.total_points().await?;
        if new_target <= points {
            return Err(ValidationError::InvalidState(format!(
                "new target ({new_target}) must exceed current points ({points})"
            ))
            .into());
        }
        reward.target_points = new_target;
        reward.status = RewardStatus::ToReach;
        reward.claimed_at = None;
        reward.updated_at = Some(now_timestamp());
        Ok(reward_active(reward).update(&self.db).await?)
    }

    pub async fn delete_reward(&self, id: i32) -> Result<bool, DbErr> {
        let res = reward::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}
