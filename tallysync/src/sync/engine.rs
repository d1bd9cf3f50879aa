//! Runs one pass over the entity kinds it covers.
//!
//! Each kind fetches its own remote snapshot right before it is reconciled, so
//! child kinds see the parent nodes the previous stage just wrote. Errors are
//! returned as-is; classification happens in [`SyncService`](super::SyncService).

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::fields::{float_value, format_date, parse_date, to_f64};
use super::protocol::{Direction, SyncPass, SyncStats};
use super::reconcile::{pull_collection, push_collection, IdMap};
use super::registry::EntityKind;
use crate::error::SyncError;
use crate::local::{LocalStore, USER_NAME_KEY};
use crate::remote::{RemotePaths, RemoteStore, RemoteValue};

/// Point totals closer than this are considered equal.
pub const POINTS_TOLERANCE: f64 = 0.001;

#[derive(Clone)]
pub struct SyncEngine {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
}

impl SyncEngine {
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteStore>) -> Self {
        Self { local, remote }
    }

    /// Reconcile every kind of `pass`, in order, for `user_id`.
    pub async fn run(
        &self,
        pass: &SyncPass,
        user_id: &str,
        token: &str,
    ) -> Result<SyncStats, SyncError> {
        let paths = RemotePaths::for_user(user_id);
        let mut stats = SyncStats::default();

        for &kind in pass.kinds() {
            log::debug!("{} {kind}", pass.direction);
            match pass.direction {
                Direction::Push => self.push_kind(kind, &paths, token, &mut stats).await?,
                Direction::Pull => self.pull_kind(kind, &paths, token, &mut stats).await?,
            }
        }

        if pass.direction == Direction::Pull {
            self.local.update_reward_statuses().await?;
        }
        Ok(stats)
    }

    async fn snapshot(&self, kind: EntityKind, path: &str, token: &str) -> Result<IdMap, SyncError> {
        let raw = self.remote.get(path, Some(token)).await?;
        Ok(IdMap::from_remote(kind, raw))
    }

    async fn push_kind(
        &self,
        kind: EntityKind,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let remote = self.remote.as_ref();
        match kind {
            EntityKind::Tasks => {
                let base = paths.tasks();
                let snapshot = self.snapshot(kind, &base, token).await?;
                push_collection(remote, token, &base, kind, &self.local.tasks(), &snapshot, stats).await
            }
            EntityKind::Subtasks => self.push_subtasks(paths, token, stats).await,
            EntityKind::Habits => {
                let base = paths.habits();
                let snapshot = self.snapshot(kind, &base, token).await?;
                push_collection(remote, token, &base, kind, &self.local.habits(), &snapshot, stats).await
            }
            EntityKind::Completions => self.push_completions(paths, token, stats).await,
            EntityKind::Goals => {
                let base = paths.goals();
                let snapshot = self.snapshot(kind, &base, token).await?;
                push_collection(remote, token, &base, kind, &self.local.goals(), &snapshot, stats).await
            }
            EntityKind::Rewards => {
                self.local.update_reward_statuses().await?;
                let base = paths.rewards();
                let snapshot = self.snapshot(kind, &base, token).await?;
                push_collection(remote, token, &base, kind, &self.local.rewards(), &snapshot, stats).await
            }
            EntityKind::Points => self.push_points(paths, token, stats).await,
            EntityKind::Settings => self.push_settings(paths, token, stats).await,
        }
    }

    async fn pull_kind(
        &self,
        kind: EntityKind,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        match kind {
            EntityKind::Tasks => {
                let snapshot = self.snapshot(kind, &paths.tasks(), token).await?;
                pull_collection(kind, &self.local.tasks(), &snapshot, stats).await
            }
            EntityKind::Subtasks => self.pull_subtasks(paths, token, stats).await,
            EntityKind::Habits => {
                let snapshot = self.snapshot(kind, &paths.habits(), token).await?;
                pull_collection(kind, &self.local.habits(), &snapshot, stats).await
            }
            EntityKind::Completions => self.pull_completions(paths, token, stats).await,
            EntityKind::Goals => {
                let snapshot = self.snapshot(kind, &paths.goals(), token).await?;
                pull_collection(kind, &self.local.goals(), &snapshot, stats).await
            }
            EntityKind::Rewards => {
                let snapshot = self.snapshot(kind, &paths.rewards(), token).await?;
                pull_collection(kind, &self.local.rewards(), &snapshot, stats).await
            }
            EntityKind::Points => self.pull_points(paths, token, stats).await,
            EntityKind::Settings => self.pull_settings(paths, token, stats).await,
        }
    }

    // Subtasks are reconciled task by task under `tasks/{id}/subtasks`.

    async fn push_subtasks(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let parents = self.snapshot(EntityKind::Tasks, &paths.tasks(), token).await?;
        for task in self.local.list_tasks().await? {
            let nested = parents
                .get(task.id)
                .and_then(|fields| fields.get("subtasks"))
                .cloned()
                .unwrap_or(Value::Null);
            let snapshot = IdMap::from_remote(EntityKind::Subtasks, nested);
            push_collection(
                self.remote.as_ref(),
                token,
                &paths.subtasks(task.id),
                EntityKind::Subtasks,
                &self.local.subtasks(task.id),
                &snapshot,
                stats,
            )
            .await?;
        }
        Ok(())
    }

    async fn pull_subtasks(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let parents = self.snapshot(EntityKind::Tasks, &paths.tasks(), token).await?;
        for (task_id, fields) in parents.iter() {
            if self.local.get_task(task_id).await?.is_none() {
                continue;
            }
            let nested = fields.get("subtasks").cloned().unwrap_or(Value::Null);
            let snapshot = IdMap::from_remote(EntityKind::Subtasks, nested);
            pull_collection(
                EntityKind::Subtasks,
                &self.local.subtasks(task_id),
                &snapshot,
                stats,
            )
            .await?;
        }
        Ok(())
    }

    // Completions are a set of `YYYY-MM-DD -> true` flags per habit.

    async fn push_completions(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let parents = self.snapshot(EntityKind::Habits, &paths.habits(), token).await?;
        for habit in self.local.list_habits().await? {
            let local_days: BTreeSet<String> = self
                .local
                .completion_dates(habit.id)
                .await?
                .into_iter()
                .map(format_date)
                .collect();
            let remote_days = completion_keys(parents.get(habit.id));
            let base = paths.completions(habit.id);

            for day in local_days.difference(&remote_days) {
                self.remote
                    .set(&format!("{base}/{day}"), Value::Bool(true), Some(token))
                    .await?;
                stats.bump(EntityKind::Completions, "added");
            }
            for day in remote_days.difference(&local_days) {
                self.remote.remove(&format!("{base}/{day}"), Some(token)).await?;
                stats.bump(EntityKind::Completions, "removed");
            }
        }
        Ok(())
    }

    async fn pull_completions(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let parents = self.snapshot(EntityKind::Habits, &paths.habits(), token).await?;
        for (habit_id, fields) in parents.iter() {
            if self.local.get_habit(habit_id).await?.is_none() {
                continue;
            }

            let mut remote_days = BTreeSet::new();
            for key in completion_keys(Some(fields)) {
                match parse_date("completion_date", &key) {
                    Ok(day) => {
                        remote_days.insert(day);
                    }
                    Err(err) => {
                        log::warn!("habit {habit_id}: skipping completion {key:?}: {err}");
                        stats.bump(EntityKind::Completions, "skipped");
                    }
                }
            }
            let local_days: BTreeSet<NaiveDate> =
                self.local.completion_dates(habit_id).await?.into_iter().collect();

            for &day in remote_days.difference(&local_days) {
                if self.local.add_completion(habit_id, day).await? {
                    stats.bump(EntityKind::Completions, "added");
                }
            }
            for &day in local_days.difference(&remote_days) {
                if self.local.remove_completion(habit_id, day).await? {
                    stats.bump(EntityKind::Completions, "removed");
                }
            }
        }
        Ok(())
    }

    async fn remote_points(&self, paths: &RemotePaths, token: &str) -> Result<Option<f64>, SyncError> {
        let raw = self.remote.get(&paths.points(), Some(token)).await?;
        if raw.is_null() {
            return Ok(None);
        }
        match to_f64("points", &raw) {
            Ok(points) => Ok(Some(points)),
            Err(err) => {
                log::warn!("ignoring remote points: {err}");
                Ok(None)
            }
        }
    }

    async fn push_points(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let local = self.local.total_points().await?;
        let remote = self.remote_points(paths, token).await?;
        if remote.is_none_or(|remote| (local - remote).abs() > POINTS_TOLERANCE) {
            self.remote
                .set(&paths.points(), float_value(local), Some(token))
                .await?;
            stats.bump(EntityKind::Points, "updated");
        }
        Ok(())
    }

    /// Points only ever grow on pull: a higher remote total is added as the
    /// difference, a lower one is ignored.
    async fn pull_points(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let Some(remote) = self.remote_points(paths, token).await? else {
            return Ok(());
        };
        let local = self.local.total_points().await?;
        if remote - local > POINTS_TOLERANCE {
            self.local.add_points(remote - local).await?;
            stats.bump(EntityKind::Points, "updated");
        }
        Ok(())
    }

    async fn remote_user_name(&self, paths: &RemotePaths, token: &str) -> Result<Option<String>, SyncError> {
        let raw = self.remote.get(&paths.user_name(), Some(token)).await?;
        Ok(raw
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned))
    }

    async fn push_settings(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let Some(local) = self.local.get_setting(USER_NAME_KEY).await? else {
            return Ok(());
        };
        if self.remote_user_name(paths, token).await?.as_deref() != Some(local.as_str()) {
            self.remote
                .set(&paths.user_name(), Value::String(local), Some(token))
                .await?;
            stats.bump(EntityKind::Settings, "updated");
        }
        Ok(())
    }

    async fn pull_settings(
        &self,
        paths: &RemotePaths,
        token: &str,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        let Some(remote) = self.remote_user_name(paths, token).await? else {
            return Ok(());
        };
        if self.local.get_setting(USER_NAME_KEY).await?.as_deref() != Some(remote.as_str()) {
            self.local.set_setting(USER_NAME_KEY, &remote).await?;
            stats.bump(EntityKind::Settings, "updated");
        }
        Ok(())
    }
}

/// Dates flagged under a habit's `completions` node. `false` flags count as absent.
fn completion_keys(habit: Option<&Map<String, Value>>) -> BTreeSet<String> {
    let raw = habit
        .and_then(|fields| fields.get("completions"))
        .cloned()
        .unwrap_or(Value::Null);
    RemoteValue::from(raw)
        .into_mapping()
        .into_iter()
        .filter(|(_, flag)| *flag != Value::Bool(false))
        .map(|(day, _)| day)
        .collect()
}
