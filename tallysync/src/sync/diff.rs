//! Field-level diff between a local payload and the remote copy.

use serde_json::{Map, Value};

/// Numbers compare by value (`5` equals `5.0`); everything else structurally.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// The entries of `fields` whose local and remote values differ.
/// A key missing on either side counts as `null`.
pub fn changed_fields<'f>(
    local: &Map<String, Value>,
    remote: &Map<String, Value>,
    fields: &[&'f str],
) -> Vec<&'f str> {
    fields
        .iter()
        .copied()
        .filter(|field| {
            let l = local.get(*field).unwrap_or(&Value::Null);
            let r = remote.get(*field).unwrap_or(&Value::Null);
            !values_equal(l, r)
        })
        .collect()
}

/// Partial update carrying the changed fields plus the local `updated_at`.
pub fn build_patch(local: &Map<String, Value>, changed: &[&str]) -> Map<String, Value> {
    let mut patch: Map<String, Value> = changed
        .iter()
        .map(|f| (f.to_string(), local.get(*f).cloned().unwrap_or(Value::Null)))
        .collect();
    patch.insert(
        "updated_at".into(),
        local.get("updated_at").cloned().unwrap_or(Value::Null),
    );
    patch
}
