use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One day on which a habit was completed.
///
/// `(habit_id, completion_date)` is unique; the index is created alongside the
/// table by [`LocalStore::create_schema`](crate::local::LocalStore::create_schema).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habit_completions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub habit_id: i32,
    pub completion_date: Date,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
