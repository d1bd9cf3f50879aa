//! In-process remote tree.
//!
//! Behaves like the realtime database for the operations the sync engine uses:
//! writes of `null` delete, emptied parents disappear, and reads return
//! integer-keyed objects as arrays when more than half of the slots up to the
//! highest key are filled.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::RemoteStore;
use crate::error::SyncError;

#[derive(Debug, Default)]
struct Inner {
    tree: Value,
    required_token: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call whose token differs from `token`.
    pub fn with_required_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tree: Value::Null,
                required_token: Some(token.into()),
            }),
            ..Self::default()
        }
    }

    pub async fn set_required_token(&self, token: Option<String>) {
        self.inner.lock().await.required_token = token;
    }

    /// Write `value` at `path` without a token check or write count.
    pub async fn seed(&self, path: &str, value: Value) {
        let mut inner = self.inner.lock().await;
        write_node(&mut inner.tree, &segments(path), stored_form(value));
    }

    /// Read `path` as stored, without the array encoding.
    pub async fn raw(&self, path: &str) -> Value {
        let inner = self.inner.lock().await;
        read_node(&inner.tree, &segments(path)).cloned().unwrap_or(Value::Null)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of set / update / remove calls accepted so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_token(inner: &Inner, token: Option<&str>) -> Result<(), SyncError> {
        match &inner.required_token {
            Some(expected) if token != Some(expected.as_str()) => {
                Err(SyncError::PermissionDenied("Permission denied".into()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, SyncError> {
        let inner = self.inner.lock().await;
        Self::check_token(&inner, token)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let node = read_node(&inner.tree, &segments(path))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(wire_form(node))
    }

    async fn set(&self, path: &str, value: Value, token: Option<&str>) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        Self::check_token(&inner, token)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        write_node(&mut inner.tree, &segments(path), stored_form(value));
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        Self::check_token(&inner, token)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let base = segments(path);
        for (key, value) in fields {
            let mut target = base.clone();
            target.extend(segments(&key));
            write_node(&mut inner.tree, &target, stored_form(value));
        }
        Ok(())
    }

    async fn remove(&self, path: &str, token: Option<&str>) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        Self::check_token(&inner, token)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        write_node(&mut inner.tree, &segments(path), Value::Null);
        Ok(())
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn read_node<'a>(tree: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.get(key.as_str()))
}

/// Write `value` at `path`; `Null` deletes. Returns whether `node` is now empty.
fn write_node(node: &mut Value, path: &[String], value: Value) -> bool {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return node.is_null();
    };

    if !node.is_object() {
        if value.is_null() {
            return node.is_null();
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(children) = node else {
        return false;
    };

    let child = children.entry(head.clone()).or_insert(Value::Null);
    if write_node(child, rest, value) {
        children.remove(head);
    }
    if children.is_empty() {
        *node = Value::Null;
        return true;
    }
    false
}

/// Arrays are stored as index-keyed objects; nulls and empty objects vanish.
fn stored_form(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let map: Map<String, Value> = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), stored_form(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() { Value::Null } else { Value::Object(map) }
        }
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, stored_form(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() { Value::Null } else { Value::Object(map) }
        }
        other => other,
    }
}

/// Apply the backend's array heuristic recursively.
fn wire_form(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let map: Map<String, Value> = map.into_iter().map(|(k, v)| (k, wire_form(v))).collect();

    let indices: Option<Vec<usize>> = map.keys().map(|k| array_index(k)).collect();
    match indices {
        Some(indices) if !indices.is_empty() => {
            let max = indices.iter().copied().max().unwrap_or(0);
            if indices.len() * 2 > max + 1 {
                let mut items = vec![Value::Null; max + 1];
                for (key, v) in map {
                    if let Some(i) = array_index(&key) {
                        items[i] = v;
                    }
                }
                return Value::Array(items);
            }
            Value::Object(map)
        }
        _ => Value::Object(map),
    }
}

fn array_index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dense_integer_keys_read_as_array() {
        let remote = MemoryRemote::new();
        remote.seed("tasks/1", json!({"title": "a"})).await;
        remote.seed("tasks/2", json!({"title": "b"})).await;
        let value = remote.get("tasks", None).await.unwrap();
        assert_eq!(value, json!([null, {"title": "a"}, {"title": "b"}]));
    }

    #[tokio::test]
    async fn test_sparse_integer_keys_read_as_object() {
        let remote = MemoryRemote::new();
        remote.seed("tasks/1", json!({"title": "a"})).await;
        remote.seed("tasks/9", json!({"title": "b"})).await;
        let value = remote.get("tasks", None).await.unwrap();
        assert!(value.is_object());
    }

    #[tokio::test]
    async fn test_update_keeps_siblings() {
        let remote = MemoryRemote::new();
        remote
            .set("tasks/5", json!({"title": "a", "status": "pending"}), None)
            .await
            .unwrap();
        let mut patch = Map::new();
        patch.insert("status".into(), json!("completed"));
        remote.update("tasks/5", patch, None).await.unwrap();
        assert_eq!(
            remote.raw("tasks/5").await,
            json!({"title": "a", "status": "completed"})
        );
        assert_eq!(remote.write_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_prunes_empty_parents() {
        let remote = MemoryRemote::new();
        remote.seed("habits/7/completions/2024-01-01", json!(true)).await;
        remote
            .remove("habits/7/completions/2024-01-01", None)
            .await
            .unwrap();
        assert_eq!(remote.raw("habits").await, Value::Null);
    }

    #[tokio::test]
    async fn test_wrong_token_is_denied() {
        let remote = MemoryRemote::with_required_token("good");
        let err = remote.get("tasks", Some("bad")).await.unwrap_err();
        assert!(matches!(err, SyncError::PermissionDenied(_)));
        assert!(remote.get("tasks", Some("good")).await.is_ok());
    }
}
