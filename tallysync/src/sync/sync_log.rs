//! Persistent history of sync passes.
//!
//! Every orchestrated push or pull appends one row to `sync_runs`, whether it
//! succeeded or not. The history backs "last synced" hints and lets a failed
//! pass be inspected after the fact.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::protocol::{Direction, SyncResult};
use crate::entity::sync_run;
use crate::local::{now_timestamp, LocalStore};

#[derive(Debug, Clone)]
pub struct SyncLog {
    store: LocalStore,
}

impl SyncLog {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Append the outcome of a pass.
    pub async fn record(
        &self,
        direction: Direction,
        result: &SyncResult,
    ) -> Result<sync_run::Model, DbErr> {
        let stats = serde_json::to_string(&result.stats)
            .map_err(|e| DbErr::Custom(format!("failed to encode sync stats: {e}")))?;
        sync_run::ActiveModel {
            id: NotSet,
            direction: Set(direction.as_str().to_owned()),
            success: Set(result.success),
            message: Set(result.message.clone()),
            stats: Set(stats),
            error_detail: Set(result.error_detail.clone()),
            finished_at: Set(now_timestamp()),
        }
        .insert(self.store.connection())
        .await
    }

    /// Most recent successful pass in `direction`.
    pub async fn last_successful_run(
        &self,
        direction: Direction,
    ) -> Result<Option<sync_run::Model>, DbErr> {
        sync_run::Entity::find()
            .filter(sync_run::Column::Direction.eq(direction.as_str()))
            .filter(sync_run::Column::Success.eq(true))
            .order_by_desc(sync_run::Column::Id)
            .one(self.store.connection())
            .await
    }

    /// Up to `limit` passes, newest first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<sync_run::Model>, DbErr> {
        sync_run::Entity::find()
            .order_by_desc(sync_run::Column::Id)
            .limit(limit)
            .all(self.store.connection())
            .await
    }
}
