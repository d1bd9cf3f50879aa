//! Conversion between local models and remote record payloads.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use super::conflict::claim_wins;
use super::fields::{
    date_value, enum_value, float_value, require, text_value, timestamp_value, to_bool, to_enum,
    to_f64, to_i32, to_opt_date, to_opt_f64, to_opt_string, to_opt_timestamp, to_string,
};
use crate::entity::habit::HabitFrequency;
use crate::entity::reward::RewardStatus;
use crate::entity::task::TaskStatus;
use crate::entity::{goal, habit, reward, subtask, task};
use crate::error::ParseError;

/// A local model that can be diffed against and merged from a remote payload.
pub trait SyncRecord: Clone + Send + Sync + Sized + 'static {
    /// Singular name used in logs.
    const KIND: &'static str;

    /// Domain fields compared by the push diff. Excludes `id` and timestamps.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> i32;

    fn updated_at(&self) -> Option<NaiveDateTime>;

    /// Full payload: `id`, `created_at`, `updated_at` and every field in `FIELDS`.
    fn to_fields(&self) -> Map<String, Value>;

    /// Overwrite the fields present in `fields`; absent keys are left alone.
    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError>;

    /// Build a new record for `id` from a remote payload.
    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError>;

    /// Merge fields that follow their own conflict rule when both copies
    /// carry the same `updated_at`. Returns whether anything changed.
    fn merge_independent_fields(&mut self, _fields: &Map<String, Value>) -> Result<bool, ParseError> {
        Ok(false)
    }
}

fn common_fields(
    id: i32,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("id".into(), Value::from(id));
    map.insert("created_at".into(), timestamp_value(created_at));
    map.insert("updated_at".into(), timestamp_value(updated_at));
    map
}

fn apply_timestamps(
    fields: &Map<String, Value>,
    created_at: &mut Option<NaiveDateTime>,
    updated_at: &mut Option<NaiveDateTime>,
) -> Result<(), ParseError> {
    if let Some(v) = fields.get("created_at") {
        *created_at = to_opt_timestamp("created_at", v)?;
    }
    if let Some(v) = fields.get("updated_at") {
        *updated_at = to_opt_timestamp("updated_at", v)?;
    }
    Ok(())
}

impl SyncRecord for task::Model {
    const KIND: &'static str = "task";
    const FIELDS: &'static [&'static str] = &["title", "description", "due_date", "status"];

    fn id(&self) -> i32 {
        self.id
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut map = common_fields(self.id, self.created_at, self.updated_at);
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("description".into(), text_value(self.description.as_deref()));
        map.insert("due_date".into(), date_value(self.due_date));
        map.insert("status".into(), enum_value(&self.status));
        map
    }

    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError> {
        if let Some(v) = fields.get("title") {
            self.title = to_string("title", v)?;
        }
        if let Some(v) = fields.get("description") {
            self.description = to_opt_string("description", v)?;
        }
        if let Some(v) = fields.get("due_date") {
            self.due_date = to_opt_date("due_date", v)?;
        }
        if let Some(v) = fields.get("status") {
            self.status = to_enum("status", v)?;
        }
        apply_timestamps(fields, &mut self.created_at, &mut self.updated_at)
    }

    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError> {
        require(fields, "title")?;
        let mut task = task::Model {
            id,
            title: String::new(),
            description: None,
            due_date: None,
            status: TaskStatus::Pending,
            created_at: None,
            updated_at: None,
        };
        task.apply_fields(fields)?;
        Ok(task)
    }
}

impl SyncRecord for subtask::Model {
    const KIND: &'static str = "subtask";
    const FIELDS: &'static [&'static str] = &["title", "description", "deadline", "completed"];

    fn id(&self) -> i32 {
        self.id
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut map = common_fields(self.id, self.created_at, self.updated_at);
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("description".into(), text_value(self.description.as_deref()));
        map.insert("deadline".into(), timestamp_value(self.deadline));
        map.insert("completed".into(), Value::Bool(self.completed));
        map
    }

    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError> {
        if let Some(v) = fields.get("title") {
            self.title = to_string("title", v)?;
        }
        if let Some(v) = fields.get("description") {
            self.description = to_opt_string("description", v)?;
        }
        if let Some(v) = fields.get("deadline") {
            self.deadline = to_opt_timestamp("deadline", v)?;
        }
        if let Some(v) = fields.get("completed") {
            self.completed = to_bool("completed", v)?;
        }
        apply_timestamps(fields, &mut self.created_at, &mut self.updated_at)
    }

    /// `task_id` is filled in by the owning collection.
    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError> {
        require(fields, "title")?;
        let mut subtask = subtask::Model {
            id,
            task_id: 0,
            title: String::new(),
            description: None,
            deadline: None,
            completed: false,
            created_at: None,
            updated_at: None,
        };
        subtask.apply_fields(fields)?;
        Ok(subtask)
    }
}

impl SyncRecord for habit::Model {
    const KIND: &'static str = "habit";
    const FIELDS: &'static [&'static str] =
        &["title", "description", "frequency", "target_days", "active"];

    fn id(&self) -> i32 {
        self.id
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut map = common_fields(self.id, self.created_at, self.updated_at);
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("description".into(), text_value(self.description.as_deref()));
        map.insert("frequency".into(), enum_value(&self.frequency));
        map.insert("target_days".into(), Value::from(self.target_days));
        map.insert("active".into(), Value::Bool(self.active));
        map
    }

    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError> {
        if let Some(v) = fields.get("title") {
            self.title = to_string("title", v)?;
        }
        if let Some(v) = fields.get("description") {
            self.description = to_opt_string("description", v)?;
        }
        if let Some(v) = fields.get("frequency") {
            self.frequency = to_enum("frequency", v)?;
        }
        if let Some(v) = fields.get("target_days") {
            self.target_days = to_i32("target_days", v)?.clamp(1, 7);
        }
        if let Some(v) = fields.get("active") {
            self.active = to_bool("active", v)?;
        }
        apply_timestamps(fields, &mut self.created_at, &mut self.updated_at)
    }

    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError> {
        require(fields, "title")?;
        let mut habit = habit::Model {
            id,
            title: String::new(),
            description: None,
            frequency: HabitFrequency::Daily,
            target_days: 1,
            active: true,
            created_at: None,
            updated_at: None,
        };
        habit.apply_fields(fields)?;
        Ok(habit)
    }
}

impl SyncRecord for goal::Model {
    const KIND: &'static str = "goal";
    const FIELDS: &'static [&'static str] = &[
        "title",
        "description",
        "target_value",
        "current_value",
        "unit",
        "period",
    ];

    fn id(&self) -> i32 {
        self.id
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut map = common_fields(self.id, self.created_at, self.updated_at);
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("description".into(), text_value(self.description.as_deref()));
        map.insert(
            "target_value".into(),
            self.target_value.map_or(Value::Null, float_value),
        );
        map.insert("current_value".into(), float_value(self.current_value));
        map.insert("unit".into(), text_value(self.unit.as_deref()));
        map.insert("period".into(), text_value(self.period.as_deref()));
        map
    }

    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError> {
        if let Some(v) = fields.get("title") {
            self.title = to_string("title", v)?;
        }
        if let Some(v) = fields.get("description") {
            self.description = to_opt_string("description", v)?;
        }
        if let Some(v) = fields.get("target_value") {
            self.target_value = to_opt_f64("target_value", v)?;
        }
        if let Some(v) = fields.get("current_value") {
            self.current_value = to_opt_f64("current_value", v)?.unwrap_or(0.0);
        }
        if let Some(v) = fields.get("unit") {
            self.unit = to_opt_string("unit", v)?;
        }
        if let Some(v) = fields.get("period") {
            self.period = to_opt_string("period", v)?;
        }
        apply_timestamps(fields, &mut self.created_at, &mut self.updated_at)
    }

    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError> {
        require(fields, "title")?;
        let mut goal = goal::Model {
            id,
            title: String::new(),
            description: None,
            target_value: None,
            current_value: 0.0,
            unit: None,
            period: None,
            created_at: None,
            updated_at: None,
        };
        goal.apply_fields(fields)?;
        Ok(goal)
    }
}

impl SyncRecord for reward::Model {
    const KIND: &'static str = "reward";
    const FIELDS: &'static [&'static str] =
        &["name", "description", "target_points", "status", "claimed_at"];

    fn id(&self) -> i32 {
        self.id
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut map = common_fields(self.id, self.created_at, self.updated_at);
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("description".into(), text_value(self.description.as_deref()));
        map.insert("target_points".into(), float_value(self.target_points));
        map.insert("status".into(), enum_value(&self.status));
        map.insert("claimed_at".into(), timestamp_value(self.claimed_at));
        map
    }

    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), ParseError> {
        if let Some(v) = fields.get("name") {
            self.name = to_string("name", v)?;
        }
        if let Some(v) = fields.get("description") {
            self.description = to_opt_string("description", v)?;
        }
        if let Some(v) = fields.get("target_points") {
            self.target_points = to_f64("target_points", v)?;
        }
        if let Some(v) = fields.get("status") {
            self.status = to_enum("status", v)?;
        }
        if let Some(v) = fields.get("claimed_at") {
            self.claimed_at = to_opt_timestamp("claimed_at", v)?;
        }
        apply_timestamps(fields, &mut self.created_at, &mut self.updated_at)
    }

    fn from_fields(id: i32, fields: &Map<String, Value>) -> Result<Self, ParseError> {
        require(fields, "name")?;
        require(fields, "target_points")?;
        let mut reward = reward::Model {
            id,
            name: String::new(),
            description: None,
            target_points: 0.0,
            status: RewardStatus::ToReach,
            claimed_at: None,
            created_at: None,
            updated_at: None,
        };
        reward.apply_fields(fields)?;
        Ok(reward)
    }

    /// A remote claim wins when it is at least as recent as the local claim.
    fn merge_independent_fields(&mut self, fields: &Map<String, Value>) -> Result<bool, ParseError> {
        let remote_claim = match fields.get("claimed_at") {
            Some(v) => to_opt_timestamp("claimed_at", v)?,
            None => None,
        };
        if !claim_wins(remote_claim, self.claimed_at) {
            return Ok(false);
        }
        if self.claimed_at == remote_claim && self.status == RewardStatus::Claimed {
            return Ok(false);
        }
        self.claimed_at = remote_claim;
        self.status = RewardStatus::Claimed;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample_task() -> task::Model {
        task::Model {
            id: 5,
            title: "Buy milk".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            status: TaskStatus::Pending,
            created_at: Some(ts(1, 8)),
            updated_at: Some(ts(1, 9)),
        }
    }

    #[test]
    fn test_task_payload_shape() {
        let fields = sample_task().to_fields();
        assert_eq!(fields["id"], json!(5));
        assert_eq!(fields["title"], json!("Buy milk"));
        assert_eq!(fields["due_date"], json!("2024-01-10"));
        assert_eq!(fields["status"], json!("pending"));
        assert_eq!(fields["description"], Value::Null);
        assert_eq!(fields["updated_at"], json!("2024-01-01T09:00:00"));
    }

    #[test]
    fn test_apply_leaves_absent_fields() {
        let mut task = sample_task();
        let patch = json!({"status": "completed"}).as_object().cloned().unwrap();
        task.apply_fields(&patch).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 1, 10));
    }

    #[test]
    fn test_from_fields_requires_title() {
        let fields = json!({"status": "pending"}).as_object().cloned().unwrap();
        assert_eq!(
            task::Model::from_fields(1, &fields),
            Err(ParseError::MissingField("title"))
        );
    }

    #[test]
    fn test_bad_field_is_reported_by_name() {
        let fields = json!({"title": "x", "due_date": "someday"})
            .as_object()
            .cloned()
            .unwrap();
        let err = task::Model::from_fields(1, &fields).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDate { field: "due_date", .. }));
    }

    #[test]
    fn test_remote_claim_wins_on_tie() {
        let mut reward = reward::Model {
            id: 1,
            name: "Cinema".into(),
            description: None,
            target_points: 1.0,
            status: RewardStatus::Claimable,
            claimed_at: Some(ts(3, 12)),
            created_at: None,
            updated_at: None,
        };
        let fields = json!({"claimed_at": "2024-01-03T12:00:00"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(reward.merge_independent_fields(&fields).unwrap());
        assert_eq!(reward.status, RewardStatus::Claimed);

        let older = json!({"claimed_at": "2024-01-02T12:00:00"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(!reward.merge_independent_fields(&older).unwrap());
        assert_eq!(reward.claimed_at, Some(ts(3, 12)));
    }
}
