use chrono::NaiveDate;

use crate::sync::fields::format_date;

/// Remote paths for one user's data, all rooted at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    root: String,
}

impl RemotePaths {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            root: format!("users/{user_id}"),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn tasks(&self) -> String {
        format!("{}/tasks", self.root)
    }

    pub fn subtasks(&self, task_id: i32) -> String {
        format!("{}/tasks/{task_id}/subtasks", self.root)
    }

    pub fn habits(&self) -> String {
        format!("{}/habits", self.root)
    }

    pub fn completions(&self, habit_id: i32) -> String {
        format!("{}/habits/{habit_id}/completions", self.root)
    }

    pub fn completion(&self, habit_id: i32, day: NaiveDate) -> String {
        format!("{}/{}", self.completions(habit_id), format_date(day))
    }

    pub fn goals(&self) -> String {
        format!("{}/goals", self.root)
    }

    pub fn rewards(&self) -> String {
        format!("{}/rewards", self.root)
    }

    pub fn points(&self) -> String {
        format!("{}/points", self.root)
    }

    pub fn user_name(&self) -> String {
        format!("{}/settings/user_name", self.root)
    }
}
