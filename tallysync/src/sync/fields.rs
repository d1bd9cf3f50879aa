//! Field codecs between local column values and remote JSON.
//!
//! Timestamps travel as ISO-8601 strings without offset, dates as `YYYY-MM-DD`.
//! Every decoder returns a [`ParseError`] naming the offending field.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::ActiveEnum;
use serde_json::{Map, Number, Value};

use crate::error::ParseError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, ParseError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_local()))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| ParseError::InvalidTimestamp {
            field,
            value: raw.to_string(),
        })
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ParseError> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| ParseError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

// Encoders.

pub fn timestamp_value(ts: Option<NaiveDateTime>) -> Value {
    ts.map_or(Value::Null, |ts| Value::String(format_timestamp(ts)))
}

pub fn date_value(day: Option<NaiveDate>) -> Value {
    day.map_or(Value::Null, |d| Value::String(format_date(d)))
}

pub fn text_value(text: Option<&str>) -> Value {
    text.map_or(Value::Null, |s| Value::String(s.to_owned()))
}

pub fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

pub fn enum_value<E: ActiveEnum<Value = String>>(value: &E) -> Value {
    Value::String(value.to_value())
}

// Decoders. `None` / `Option` results come from JSON null.

pub fn require<'a>(fields: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ParseError> {
    match fields.get(field) {
        Some(Value::Null) | None => Err(ParseError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

pub fn to_string(field: &'static str, value: &Value) -> Result<String, ParseError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ParseError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

pub fn to_opt_string(field: &'static str, value: &Value) -> Result<Option<String>, ParseError> {
    match value {
        Value::Null => Ok(None),
        other => to_string(field, other).map(|s| Some(s).filter(|s| !s.is_empty())),
    }
}

pub fn to_f64(field: &'static str, value: &Value) -> Result<f64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or(ParseError::WrongType {
        field,
        expected: "a number",
    })
}

pub fn to_opt_f64(field: &'static str, value: &Value) -> Result<Option<f64>, ParseError> {
    match value {
        Value::Null => Ok(None),
        other => to_f64(field, other).map(Some),
    }
}

pub fn to_i32(field: &'static str, value: &Value) -> Result<i32, ParseError> {
    let wrong = ParseError::WrongType {
        field,
        expected: "an integer",
    };
    let n = to_f64(field, value).map_err(|_| wrong.clone())?;
    if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
        return Err(wrong);
    }
    Ok(n as i32)
}

/// Booleans also arrive as `0`/`1` from older clients.
pub fn to_bool(field: &'static str, value: &Value) -> Result<bool, ParseError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ParseError::WrongType {
                field,
                expected: "a boolean",
            }),
        },
        _ => Err(ParseError::WrongType {
            field,
            expected: "a boolean",
        }),
    }
}

pub fn to_opt_timestamp(
    field: &'static str,
    value: &Value,
) -> Result<Option<NaiveDateTime>, ParseError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_timestamp(field, s).map(Some),
        _ => Err(ParseError::WrongType {
            field,
            expected: "a timestamp string",
        }),
    }
}

pub fn to_opt_date(field: &'static str, value: &Value) -> Result<Option<NaiveDate>, ParseError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_date(field, s).map(Some),
        _ => Err(ParseError::WrongType {
            field,
            expected: "a date string",
        }),
    }
}

pub fn to_enum<E: ActiveEnum<Value = String>>(
    field: &'static str,
    value: &Value,
) -> Result<E, ParseError> {
    let raw = to_string(field, value)?;
    E::try_from_value(&raw.trim().to_lowercase())
        .map_err(|_| ParseError::InvalidEnum { field, value: raw })
}

/// The `updated_at` carried by a remote record.
pub fn updated_at_of(fields: &Map<String, Value>) -> Result<Option<NaiveDateTime>, ParseError> {
    fields
        .get("updated_at")
        .map_or(Ok(None), |v| to_opt_timestamp("updated_at", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::task::TaskStatus;
    use serde_json::json;

    #[test]
    fn test_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 250_000)
            .unwrap();
        assert_eq!(parse_timestamp("t", "2024-03-01T09:30:00.250").unwrap(), expected);
        assert_eq!(parse_timestamp("t", "2024-03-01 09:30:00.25").unwrap(), expected);
        assert_eq!(parse_timestamp("t", &format_timestamp(expected)).unwrap(), expected);
        assert!(parse_timestamp("t", "2024-03-01").is_ok());
        assert!(matches!(
            parse_timestamp("t", "yesterday"),
            Err(ParseError::InvalidTimestamp { field: "t", .. })
        ));
    }

    #[test]
    fn test_enum_decoding() {
        let status: TaskStatus = to_enum("status", &json!("Completed")).unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert!(matches!(
            to_enum::<TaskStatus>("status", &json!("archived")),
            Err(ParseError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn test_loose_scalars() {
        assert!(to_bool("completed", &json!(1)).unwrap());
        assert!(!to_bool("completed", &json!("false")).unwrap());
        assert_eq!(to_i32("target_days", &json!(3.0)).unwrap(), 3);
        assert!(to_i32("target_days", &json!(3.5)).is_err());
        assert_eq!(to_f64("target_points", &json!("12.5")).unwrap(), 12.5);
    }

    #[test]
    fn test_require_treats_null_as_missing() {
        let fields = json!({"title": null}).as_object().cloned().unwrap();
        assert_eq!(require(&fields, "title"), Err(ParseError::MissingField("title")));
    }
}
