use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::collections::habit_active;
use super::{now_timestamp, optional_text, require_text, Habits, LocalCollection, LocalStore};
use crate::entity::habit::{self, HabitFrequency};
use crate::entity::habit_completion;
use crate::error::{StoreError, ValidationError};

/// Points awarded for one completed day.
pub const COMPLETION_POINTS: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub title: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub target_days: i32,
}

impl Default for NewHabit {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            frequency: HabitFrequency::Daily,
            target_days: 1,
        }
    }
}

/// Parse a `YYYY-MM-DD` day. A trailing time part is ignored.
pub fn parse_day(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ValidationError::MalformedDate(raw.to_string()))
}

fn check_target_days(days: i32) -> Result<(), ValidationError> {
    if !(1..=7).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "target_days",
            min: 1,
            max: 7,
            value: days.into(),
        });
    }
    Ok(())
}

impl LocalStore {
    pub fn habits(&self) -> Habits {
        Habits::new(self.clone())
    }

    pub async fn list_habits(&self) -> Result<Vec<habit::Model>, DbErr> {
        self.habits().all().await
    }

    pub async fn get_habit(&self, id: i32) -> Result<Option<habit::Model>, DbErr> {
        self.habits().get(id).await
    }

    pub async fn create_habit(&self, new: NewHabit) -> Result<habit::Model, StoreError> {
        let title = require_text("title", &new.title)?;
        check_target_days(new.target_days)?;
        let now = now_timestamp();
        let active = habit::ActiveModel {
            id: NotSet,
            title: Set(title),
            description: Set(optional_text(new.description)),
            frequency: Set(new.frequency),
            target_days: Set(new.target_days),
            active: Set(true),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn update_habit(&self, mut habit: habit::Model) -> Result<habit::Model, StoreError> {
        habit.title = require_text("title", &habit.title)?;
        check_target_days(habit.target_days)?;
        habit.description = optional_text(habit.description);
        habit.updated_at = Some(now_timestamp());
        Ok(habit_active(habit).update(&self.db).await?)
    }

    /// Delete a habit and its completion history.
    pub async fn delete_habit(&self, id: i32) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;
        habit_completion::Entity::delete_many()
            .filter(habit_completion::Column::HabitId.eq(id))
            .exec(&txn)
            .await?;
        let res = habit::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    async fn find_completion(
        &self,
        habit_id: i32,
        day: NaiveDate,
    ) -> Result<Option<habit_completion::Model>, DbErr> {
        habit_completion::Entity::find()
            .filter(habit_completion::Column::HabitId.eq(habit_id))
            .filter(habit_completion::Column::CompletionDate.eq(day))
            .one(&self.db)
            .await
    }

    /// Mark `day` as completed and award [`COMPLETION_POINTS`].
    ///
    /// Returns `false` without touching points when the day is already recorded.
    pub async fn add_completion(&self, habit_id: i32, day: NaiveDate) -> Result<bool, StoreError> {
        if self.get_habit(habit_id).await?.is_none() {
            return Err(ValidationError::NotFound {
                kind: "habit",
                id: habit_id,
            }
            .into());
        }
        if self.find_completion(habit_id, day).await?.is_some() {
            return Ok(false);
        }

        let active = habit_completion::ActiveModel {
            id: NotSet,
            habit_id: Set(habit_id),
            completion_date: Set(day),
            created_at: Set(Some(now_timestamp())),
        };
        active.insert(&self.db).await?;
        self.add_points(COMPLETION_POINTS).await?;
        Ok(true)
    }

    /// Remove the completion for `day`, deducting [`COMPLETION_POINTS`].
    pub async fn remove_completion(&self, habit_id: i32, day: NaiveDate) -> Result<bool, StoreError> {
        let res = habit_completion::Entity::delete_many()
            .filter(habit_completion::Column::HabitId.eq(habit_id))
            .filter(habit_completion::Column::CompletionDate.eq(day))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Ok(false);
        }
        self.add_points(-COMPLETION_POINTS).await?;
        Ok(true)
    }

    /// Add or remove the completion for `day`. Returns whether the day is
    /// completed afterwards.
    pub async fn toggle_completion(&self, habit_id: i32, day: NaiveDate) -> Result<bool, StoreError> {
        if self.find_completion(habit_id, day).await?.is_some() {
            self.remove_completion(habit_id, day).await?;
            Ok(false)
        } else {
            self.add_completion(habit_id, day).await?;
            Ok(true)
        }
    }

    pub async fn is_completed_on(&self, habit_id: i32, day: NaiveDate) -> Result<bool, DbErr> {
        Ok(self.find_completion(habit_id, day).await?.is_some())
    }

    /// Completed days of a habit, oldest first.
    pub async fn completion_dates(&self, habit_id: i32) -> Result<Vec<NaiveDate>, DbErr> {
        let rows = habit_completion::Entity::find()
            .filter(habit_completion::Column::HabitId.eq(habit_id))
            .order_by_asc(habit_completion::Column::CompletionDate)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|c| c.completion_date).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_accepts_timestamps() {
        let day = parse_day("2024-01-02T00:00:00").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert!(matches!(
            parse_day("tomorrow"),
            Err(ValidationError::MalformedDate(_))
        ));
    }

    #[test]
    fn test_target_days_bounds() {
        assert!(check_target_days(1).is_ok());
        assert!(check_target_days(7).is_ok());
        assert!(check_target_days(0).is_err());
        assert!(check_target_days(8).is_err());
    }
}
