use serde_json::{Map, Value};

/// A raw node read from the remote tree.
///
/// The backend encodes a collection whose keys are mostly dense integers as a
/// JSON array (with `null` holes), and anything else as an object. Collection
/// code must go through [`RemoteValue::into_mapping`] so positional indices are
/// never mistaken for record ids.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
    Scalar(Value),
    Null,
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RemoteValue::Mapping(map),
            Value::Array(items) => RemoteValue::Sequence(items),
            Value::Null => RemoteValue::Null,
            scalar => RemoteValue::Scalar(scalar),
        }
    }
}

impl RemoteValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RemoteValue::Null)
    }

    /// Canonical key -> node mapping.
    ///
    /// - mappings keep their keys; `null` children are dropped
    /// - sequence elements are keyed by their embedded `id` field when present,
    ///   else by position; `null` holes are dropped
    /// - scalars and null yield an empty mapping
    pub fn into_mapping(self) -> Map<String, Value> {
        match self {
            RemoteValue::Mapping(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            RemoteValue::Sequence(items) => {
                let mut map = Map::new();
                for (index, item) in items.into_iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }
                    let key = embedded_id(&item).unwrap_or_else(|| index.to_string());
                    map.insert(key, item);
                }
                map
            }
            RemoteValue::Scalar(value) => {
                log::warn!("expected a collection, found scalar {value}; treating as empty");
                Map::new()
            }
            RemoteValue::Null => Map::new(),
        }
    }
}

fn embedded_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| (f as i64).to_string())),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
