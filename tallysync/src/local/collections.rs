//! Per-entity collection handles consumed by the sync engine.
//!
//! Writes through these handles store records exactly as given: ids and
//! timestamps are not reassigned. Application code goes through the
//! `LocalStore` operations instead.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::LocalStore;
use crate::entity::{goal, habit, reward, subtask, task};

/// Get-all / get-by-id / create-with-id / update / delete over one collection.
#[async_trait]
pub trait LocalCollection: Send + Sync {
    type Record: Clone + Send + Sync + 'static;

    async fn all(&self) -> Result<Vec<Self::Record>, DbErr>;

    async fn get(&self, id: i32) -> Result<Option<Self::Record>, DbErr>;

    /// Insert `record` keeping its id.
    async fn create_with_id(&self, record: Self::Record) -> Result<Self::Record, DbErr>;

    /// Replace the stored row with `record`, timestamps included.
    async fn overwrite(&self, record: Self::Record) -> Result<Self::Record, DbErr>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: i32) -> Result<bool, DbErr>;
}

pub(crate) fn task_active(m: task::Model) -> task::ActiveModel {
    task::ActiveModel {
        id: Set(m.id),
        title: Set(m.title),
        description: Set(m.description),
        due_date: Set(m.due_date),
        status: Set(m.status),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}

pub(crate) fn subtask_active(m: subtask::Model) -> subtask::ActiveModel {
    subtask::ActiveModel {
        id: Set(m.id),
        task_id: Set(m.task_id),
        title: Set(m.title),
        description: Set(m.description),
        deadline: Set(m.deadline),
        completed: Set(m.completed),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}

pub(crate) fn habit_active(m: habit::Model) -> habit::ActiveModel {
    habit::ActiveModel {
        id: Set(m.id),
        title: Set(m.title),
        description: Set(m.description),
        frequency: Set(m.frequency),
        target_days: Set(m.target_days),
        active: Set(m.active),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}

pub(crate) fn goal_active(m: goal::Model) -> goal::ActiveModel {
    goal::ActiveModel {
        id: Set(m.id),
        title: Set(m.title),
        description: Set(m.description),
        target_value: Set(m.target_value),
        current_value: Set(m.current_value),
        unit: Set(m.unit),
        period: Set(m.period),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}

pub(crate) fn reward_active(m: reward::Model) -> reward::ActiveModel {
    reward::ActiveModel {
        id: Set(m.id),
        name: Set(m.name),
        description: Set(m.description),
        target_points: Set(m.target_points),
        status: Set(m.status),
        claimed_at: Set(m.claimed_at),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}

/// Implements [`LocalCollection`] for a top-level (non-nested) collection.
/// `$delete` names the `LocalStore` method that removes a row and its children.
macro_rules! top_level_collection {
    ($(#[$meta:meta])* $handle:ident, $module:ident, $to_active:ident, $delete:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $handle {
            store: LocalStore,
        }

        impl $handle {
            pub(crate) fn new(store: LocalStore) -> Self {
                Self { store }
            }
        }

        #[async_trait]
        impl LocalCollection for $handle {
            type Record = $module::Model;

            async fn all(&self) -> Result<Vec<Self::Record>, DbErr> {
                $module::Entity::find()
                    .order_by_asc($module::Column::Id)
                    .all(self.store.connection())
                    .await
            }

            async fn get(&self, id: i32) -> Result<Option<Self::Record>, DbErr> {
                $module::Entity::find_by_id(id)
                    .one(self.store.connection())
                    .await
            }

            async fn create_with_id(&self, record: Self::Record) -> Result<Self::Record, DbErr> {
                $to_active(record).insert(self.store.connection()).await
            }

            async fn overwrite(&self, record: Self::Record) -> Result<Self::Record, DbErr> {
                $to_active(record).update(self.store.connection()).await
            }

            async fn delete(&self, id: i32) -> Result<bool, DbErr> {
                self.store.$delete(id).await
            }
        }
    };
}

top_level_collection!(
    /// All tasks. Deleting a task deletes its subtasks.
    Tasks,
    task,
    task_active,
    delete_task
);
top_level_collection!(
    /// All habits. Deleting a habit deletes its completions.
    Habits,
    habit,
    habit_active,
    delete_habit
);
top_level_collection!(Goals, goal, goal_active, delete_goal);
top_level_collection!(Rewards, reward, reward_active, delete_reward);

/// The subtasks of one task.
#[derive(Debug, Clone)]
pub struct TaskSubtasks {
    store: LocalStore,
    task_id: i32,
}

impl TaskSubtasks {
    pub(crate) fn new(store: LocalStore, task_id: i32) -> Self {
        Self { store, task_id }
    }

    pub fn task_id(&self) -> i32 {
        self.task_id
    }
}

#[async_trait]
impl LocalCollection for TaskSubtasks {
    type Record = subtask::Model;

    async fn all(&self) -> Result<Vec<Self::Record>, DbErr> {
        subtask::Entity::find()
            .filter(subtask::Column::TaskId.eq(self.task_id))
            .order_by_asc(subtask::Column::Id)
            .all(self.store.connection())
            .await
    }

    /// Subtask ids are unique across tasks, so the lookup is not limited to
    /// this task. A record found under another task moves here on `overwrite`.
    async fn get(&self, id: i32) -> Result<Option<Self::Record>, DbErr> {
        subtask::Entity::find_by_id(id)
            .one(self.store.connection())
            .await
    }

    async fn create_with_id(&self, mut record: Self::Record) -> Result<Self::Record, DbErr> {
        record.task_id = self.task_id;
        subtask_active(record).insert(self.store.connection()).await
    }

    async fn overwrite(&self, mut record: Self::Record) -> Result<Self::Record, DbErr> {
        record.task_id = self.task_id;
        subtask_active(record).update(self.store.connection()).await
    }

    async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let res = subtask::Entity::delete_many()
            .filter(subtask::Column::Id.eq(id))
            .filter(subtask::Column::TaskId.eq(self.task_id))
            .exec(self.store.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }
}
