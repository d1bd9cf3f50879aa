//! Collection reconciliation shared by every record kind.
//!
//! Push walks the local records: unchanged ones cost no remote call, changed
//! ones get a partial update, missing ones a full create, and remote ids with
//! no local counterpart are removed. Pull walks the remote records and applies
//! the timestamp rule from [`conflict`](super::conflict). Neither direction
//! catches errors: the first failed call aborts the collection.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::conflict::should_apply;
use super::diff::{build_patch, changed_fields};
use super::fields::updated_at_of;
use super::protocol::SyncStats;
use super::record::SyncRecord;
use super::registry::EntityKind;
use crate::error::{ParseError, SyncError};
use crate::local::LocalCollection;
use crate::remote::{RemoteStore, RemoteValue};

/// Remote records of one collection keyed by local id.
///
/// Built from a normalized snapshot, so list-encoded collections are keyed by
/// their records' ids rather than by position. Keys that are not ids are kept
/// aside as strays.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    records: BTreeMap<i32, Map<String, Value>>,
    strays: Vec<String>,
}

impl IdMap {
    pub fn from_remote(kind: EntityKind, raw: Value) -> Self {
        let mut map = IdMap::default();
        for (key, node) in RemoteValue::from(raw).into_mapping() {
            let Ok(id) = key.trim().parse::<i32>() else {
                log::warn!("{kind}: ignoring remote key {key:?}: {}", ParseError::InvalidKey(key.clone()));
                map.strays.push(key);
                continue;
            };
            let fields = match node {
                Value::Object(fields) => fields,
                other => {
                    log::warn!("{kind}: remote record {id} is not an object ({other})");
                    Map::new()
                }
            };
            map.records.insert(id, fields);
        }
        map
    }

    pub fn get(&self, id: i32) -> Option<&Map<String, Value>> {
        self.records.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &Map<String, Value>)> {
        self.records.iter().map(|(id, fields)| (*id, fields))
    }

    pub fn strays(&self) -> &[String] {
        &self.strays
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Push every record of `collection` to `base/{id}` and delete remote records
/// that no longer exist locally.
pub async fn push_collection<C>(
    remote: &dyn RemoteStore,
    token: &str,
    base: &str,
    kind: EntityKind,
    collection: &C,
    snapshot: &IdMap,
    stats: &mut SyncStats,
) -> Result<(), SyncError>
where
    C: LocalCollection,
    C::Record: SyncRecord,
{
    let records = collection.all().await?;
    let mut local_ids = BTreeSet::new();

    for record in &records {
        let id = record.id();
        local_ids.insert(id);
        let path = format!("{base}/{id}");
        let local = record.to_fields();

        match snapshot.get(id) {
            Some(existing) => {
                let changed = changed_fields(&local, existing, C::Record::FIELDS);
                if changed.is_empty() {
                    continue;
                }
                log::debug!("{} {id}: updating {changed:?}", C::Record::KIND);
                remote
                    .update(&path, build_patch(&local, &changed), Some(token))
                    .await?;
                stats.bump(kind, "updated");
            }
            None => {
                log::debug!("{} {id}: creating", C::Record::KIND);
                remote.set(&path, Value::Object(local), Some(token)).await?;
                stats.bump(kind, "created");
            }
        }
    }

    for id in snapshot.ids().filter(|id| !local_ids.contains(id)) {
        log::debug!("{} {id}: deleted locally, removing", C::Record::KIND);
        remote.remove(&format!("{base}/{id}"), Some(token)).await?;
        stats.bump(kind, "deleted");
    }
    for key in snapshot.strays() {
        remote.remove(&format!("{base}/{key}"), Some(token)).await?;
        stats.bump(kind, "deleted");
    }
    Ok(())
}

/// Merge every remote record of `snapshot` into `collection`.
///
/// Existing records are overwritten only when the remote `updated_at` is
/// strictly newer; missing ones are created under the remote id. Records that
/// fail to decode are skipped and counted. Nothing is deleted locally.
pub async fn pull_collection<C>(
    kind: EntityKind,
    collection: &C,
    snapshot: &IdMap,
    stats: &mut SyncStats,
) -> Result<(), SyncError>
where
    C: LocalCollection,
    C::Record: SyncRecord,
{
    for (id, fields) in snapshot.iter() {
        let outcome = match collection.get(id).await? {
            Some(local) => merge_existing(local, fields),
            None => C::Record::from_fields(id, fields).map(Merge::Create),
        };

        match outcome {
            Ok(Merge::Create(record)) => {
                log::debug!("{} {id}: creating locally", C::Record::KIND);
                collection.create_with_id(record).await?;
                stats.bump(kind, "created");
            }
            Ok(Merge::Overwrite(record)) => {
                log::debug!("{} {id}: updating locally", C::Record::KIND);
                collection.overwrite(record).await?;
                stats.bump(kind, "updated");
            }
            Ok(Merge::Keep) => {}
            Err(err) => {
                log::warn!("{} {id}: skipping malformed remote record: {err}", C::Record::KIND);
                stats.bump(kind, "skipped");
            }
        }
    }
    Ok(())
}

enum Merge<R> {
    Create(R),
    Overwrite(R),
    Keep,
}

fn merge_existing<R: SyncRecord>(mut local: R, fields: &Map<String, Value>) -> Result<Merge<R>, ParseError> {
    let remote_updated = updated_at_of(fields)?;
    if should_apply(remote_updated, local.updated_at()) {
        local.apply_fields(fields)?;
        return Ok(Merge::Overwrite(local));
    }
    // Only a record-level tie leaves room for field-specific rules.
    if remote_updated.is_some()
        && remote_updated == local.updated_at()
        && local.merge_independent_fields(fields)?
    {
        return Ok(Merge::Overwrite(local));
    }
    Ok(Merge::Keep)
}
