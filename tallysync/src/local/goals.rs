use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, NotSet, Set};

use super::collections::goal_active;
use super::{now_timestamp, optional_text, require_text, Goals, LocalCollection, LocalStore};
use crate::entity::goal;
use crate::error::{StoreError, ValidationError};

/// Points awarded when a goal reaches its target.
pub const GOAL_POINTS: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub period: Option<String>,
}

fn check_target(target: Option<f64>) -> Result<(), ValidationError> {
    match target {
        Some(value) if value <= 0.0 || !value.is_finite() => Err(ValidationError::NonPositive {
            field: "target_value",
            value,
        }),
        _ => Ok(()),
    }
}

impl LocalStore {
    pub fn goals(&self) -> Goals {
        Goals::new(self.clone())
    }

    pub async fn list_goals(&self) -> Result<Vec<goal::Model>, DbErr> {
        self.goals().all().await
    }

    pub async fn get_goal(&self, id: i32) -> Result<Option<goal::Model>, DbErr> {
        self.goals().get(id).await
    }

    pub async fn create_goal(&self, new: NewGoal) -> Result<goal::Model, StoreError> {
        let title = require_text("title", &new.title)?;
        check_target(new.target_value)?;
        let now = now_timestamp();
        let active = goal::ActiveModel {
            id: NotSet,
            title: Set(title),
            description: Set(optional_text(new.description)),
            target_value: Set(new.target_value),
            current_value: Set(0.0),
            unit: Set(optional_text(new.unit)),
            period: Set(optional_text(new.period)),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };
        Ok(active.insert(&self.db).await?)
    }

    /// Persist edits to a goal. Crossing its target awards [`GOAL_POINTS`] once.
    pub async fn update_goal(&self, mut goal: goal::Model) -> Result<goal::Model, StoreError> {
        goal.title = require_text("title", &goal.title)?;
        check_target(goal.target_value)?;
        goal.description = optional_text(goal.description);
        goal.updated_at = Some(now_timestamp());

        let was_reached = self
            .get_goal(goal.id)
            .await?
            .ok_or(ValidationError::NotFound {
                kind: "goal",
                id: goal.id,
            })?
            .is_reached();

        let saved = goal_active(goal).update(&self.db).await?;
        if !was_reached && saved.is_reached() {
            log::info!("goal #{} reached, awarding {GOAL_POINTS} points", saved.id);
            self.add_points(GOAL_POINTS).await?;
        }
        Ok(saved)
    }

    pub async fn set_goal_progress(&self, id: i32, value: f64) -> Result<goal::Model, StoreError> {
        let mut goal = self
            .get_goal(id)
            .await?
            .ok_or(ValidationError::NotFound { kind: "goal", id })?;
        goal.current_value = value.max(0.0);
        self.update_goal(goal).await
    }

    pub async fn delete_goal(&self, id: i32) -> Result<bool, DbErr> {
        let res = goal::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}
