use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, Set, TransactionTrait,
};

use super::collections::{subtask_active, task_active};
use super::{now_timestamp, optional_text, require_text, LocalCollection, LocalStore, TaskSubtasks, Tasks};
use crate::entity::subtask;
use crate::entity::task::{self, TaskStatus};
use crate::error::{StoreError, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSubtask {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDateTime>,
}

impl LocalStore {
    pub fn tasks(&self) -> Tasks {
        Tasks::new(self.clone())
    }

    pub fn subtasks(&self, task_id: i32) -> TaskSubtasks {
        TaskSubtasks::new(self.clone(), task_id)
    }

    pub async fn list_tasks(&self) -> Result<Vec<task::Model>, DbErr> {
        self.tasks().all().await
    }

    pub async fn get_task(&self, id: i32) -> Result<Option<task::Model>, DbErr> {
        self.tasks().get(id).await
    }

    pub async fn create_task(&self, new: NewTask) -> Result<task::Model, StoreError> {
        let title = require_text("title", &new.title)?;
        let now = now_timestamp();
        let active = task::ActiveModel {
            id: NotSet,
            title: Set(title),
            description: Set(optional_text(new.description)),
            due_date: Set(new.due_date),
            status: Set(TaskStatus::Pending),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };
        Ok(active.insert(&self.db).await?)
    }

    /// Persist edits to a task and refresh its `updated_at`.
    pub async fn update_task(&self, mut task: task::Model) -> Result<task::Model, StoreError> {
        task.title = require_text("title", &task.title)?;
        task.description = optional_text(task.description);
        task.updated_at = Some(now_timestamp());
        Ok(task_active(task).update(&self.db).await?)
    }

    pub async fn set_task_status(
        &self,
        id: i32,
        status: TaskStatus,
    ) -> Result<task::Model, StoreError> {
        let mut task = self
            .get_task(id)
            .await?
            .ok_or(ValidationError::NotFound { kind: "task", id })?;
        task.status = status;
        self.update_task(task).await
    }

    /// Delete a task together with its subtasks.
    pub async fn delete_task(&self, id: i32) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;
        subtask::Entity::delete_many()
            .filter(subtask::Column::TaskId.eq(id))
            .exec(&txn)
            .await?;
        let res = task::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn create_subtask(
        &self,
        task_id: i32,
        new: NewSubtask,
    ) -> Result<subtask::Model, StoreError> {
        let title = require_text("title", &new.title)?;
        if self.get_task(task_id).await?.is_none() {
            return Err(ValidationError::NotFound {
                kind: "task",
                id: task_id,
            }
            .into());
        }
        let now = now_timestamp();
        let active = subtask::ActiveModel {
            id: NotSet,
            task_id: Set(task_id),
            title: Set(title),
            description: Set(optional_text(new.description)),
            deadline: Set(new.deadline),
            completed: Set(false),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn update_subtask(
        &self,
        mut subtask: subtask::Model,
    ) -> Result<subtask::Model, StoreError> {
        subtask.title = require_text("title", &subtask.title)?;
        subtask.description = optional_text(subtask.description);
        subtask.updated_at = Some(now_timestamp());
        Ok(subtask_active(subtask).update(&self.db).await?)
    }

    /// Flip a subtask's completion flag.
    pub async fn toggle_subtask(&self, id: i32) -> Result<subtask::Model, StoreError> {
        let mut subtask = subtask::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ValidationError::NotFound { kind: "subtask", id })?;
        subtask.completed = !subtask.completed;
        self.update_subtask(subtask).await
    }

    pub async fn delete_subtask(&self, id: i32) -> Result<bool, DbErr> {
        let res = subtask::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}
