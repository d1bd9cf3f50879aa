//! SeaORM entities for the local store.
//!
//! Every synced table carries an integer `id` that doubles as the remote path
//! segment, plus nullable `created_at` / `updated_at` timestamps.

pub mod goal;
pub mod habit;
pub mod habit_completion;
pub mod reward;
pub mod subtask;
pub mod sync_run;
pub mod task;
pub mod user_points;
pub mod user_setting;
