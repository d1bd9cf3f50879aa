//! Local store adapter.
//!
//! [`LocalStore`] owns the SeaORM connection and creates the schema on connect.
//! Two kinds of API sit on top of it:
//!
//! - application operations (`create_task`, `add_completion`, `claim_reward`, ...)
//!   which validate input, refresh `updated_at` and fire point side effects
//! - collection handles implementing [`LocalCollection`], used by the sync engine
//!   to read snapshots and write records under their remote-carried ids and
//!   timestamps

mod collections;
mod goals;
mod habits;
mod levels;
mod points;
mod rewards;
mod settings;
mod tasks;

pub use collections::{Goals, Habits, LocalCollection, Rewards, TaskSubtasks, Tasks};
pub use goals::{NewGoal, GOAL_POINTS};
pub use habits::{parse_day, NewHabit, COMPLETION_POINTS};
pub use levels::{LevelInfo, SkillLevel};
pub use points::POINTS_ROW_ID;
pub use rewards::NewReward;
pub use settings::{DEFAULT_USER_NAME, USER_NAME_KEY};
pub use tasks::{NewSubtask, NewTask};

use chrono::{Local, NaiveDateTime, SubsecRound};
use sea_orm::{
    sea_query::SqliteQueryBuilder, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, Schema,
};

use crate::entity::{
    goal, habit, habit_completion, reward, subtask, sync_run, task, user_points, user_setting,
};
use crate::error::ValidationError;

/// Current local time, truncated to microseconds so it survives a round trip
/// through the database and the remote text encoding unchanged.
pub fn now_timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

/// Handle to the local SQLite database.
#[derive(Debug, Clone)]
pub struct LocalStore {
    db: DatabaseConnection,
}

impl LocalStore {
    /// Connect to `url` (e.g. `sqlite:./tally.db?mode=rwc`) and create any
    /// missing tables.
    pub async fn connect(url: &str) -> Result<Self, DbErr> {
        Self::connect_with(ConnectOptions::new(url.to_owned())).await
    }

    pub async fn connect_with(options: ConnectOptions) -> Result<Self, DbErr> {
        let db = Database::connect(options).await?;
        let store = Self { db };
        store.create_schema().await?;
        Ok(store)
    }

    /// Wrap an existing connection. The schema is not touched.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create every table (if not exists) plus the completion uniqueness index.
    pub async fn create_schema(&self) -> Result<(), DbErr> {
        self.create_table(task::Entity).await?;
        self.create_table(subtask::Entity).await?;
        self.create_table(habit::Entity).await?;
        self.create_table(habit_completion::Entity).await?;
        self.create_table(goal::Entity).await?;
        self.create_table(reward::Entity).await?;
        self.create_table(user_points::Entity).await?;
        self.create_table(user_setting::Entity).await?;
        self.create_table(sync_run::Entity).await?;

        self.db
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_habit_completions_day
                 ON habit_completions (habit_id, completion_date)",
            )
            .await?;
        self.db
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks (task_id)",
            )
            .await?;
        Ok(())
    }

    async fn create_table<E: EntityTrait>(&self, entity: E) -> Result<(), DbErr> {
        let schema = Schema::new(self.db.get_database_backend());
        let stmt = schema
            .create_table_from_entity(entity)
            .if_not_exists()
            .to_owned();
        self.db
            .execute_unprepared(&stmt.to_string(SqliteQueryBuilder))
            .await?;
        Ok(())
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
