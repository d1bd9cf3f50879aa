use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    #[sea_orm(string_value = "to_reach")]
    ToReach,
    #[sea_orm(string_value = "claimable")]
    Claimable,
    #[sea_orm(string_value = "claimed")]
    Claimed,
}

/// A reward unlocked by accumulated points.
///
/// `status` is derived from the point total; only
/// [`update_reward_statuses`](crate::local::LocalStore::update_reward_statuses)
/// and the claim/reuse operations change it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub target_points: f64,
    pub status: RewardStatus,
    pub claimed_at: Option<DateTime>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
