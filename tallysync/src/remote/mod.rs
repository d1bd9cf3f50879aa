//! Remote store adapter.
//!
//! The remote side is a path-addressable JSON tree. [`RemoteStore`] exposes the
//! four operations the sync engine needs; [`FirebaseRemote`] speaks the realtime
//! database REST protocol and [`MemoryRemote`] keeps the tree in process.
//!
//! Adapters return values as the backend sends them. Turning list-encoded
//! collections back into id-keyed mappings is done by [`RemoteValue`].

mod firebase;
mod memory;
mod paths;
mod value;

pub use firebase::FirebaseRemote;
pub use memory::MemoryRemote;
pub use paths::RemotePaths;
pub use value::RemoteValue;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::SyncError;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the node at `path`. A missing node reads as `Value::Null`.
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, SyncError>;

    /// Replace the node at `path`.
    async fn set(&self, path: &str, value: Value, token: Option<&str>) -> Result<(), SyncError>;

    /// Write only the given children of `path`, leaving siblings untouched.
    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), SyncError>;

    async fn remove(&self, path: &str, token: Option<&str>) -> Result<(), SyncError>;
}
