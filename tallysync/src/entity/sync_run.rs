use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One finished push or pull, successful or not.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub direction: String,
    pub success: bool,
    pub message: String,
    /// Counters serialized as a JSON object.
    pub stats: String,
    pub error_detail: Option<String>,
    pub finished_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
