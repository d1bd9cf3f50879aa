//! Field-level sync between the local store and the remote tree.
//!
//! - [`SyncRecord`] encodes a local model as a remote payload and merges one back
//! - [`reconcile`] diffs and merges one collection in one direction
//! - [`SyncEngine`] runs a [`SyncPass`] over every kind it names, parents first
//! - [`SyncService`] wraps a pass with session checks, error classification and
//!   the single refresh-and-retry, and records the outcome in the [`SyncLog`]

pub mod conflict;
pub mod diff;
mod engine;
pub mod fields;
mod protocol;
pub mod reconcile;
mod record;
mod registry;
mod service;
mod sync_log;

pub use engine::{SyncEngine, POINTS_TOLERANCE};
pub use protocol::{Direction, SyncPass, SyncResult, SyncStats};
pub use record::SyncRecord;
pub use registry::EntityKind;
pub use service::{
    SyncService, NOT_CONFIGURED_MESSAGE, NOT_SIGNED_IN_MESSAGE, OFFLINE_MESSAGE,
    REAUTHENTICATE_MESSAGE, TOKEN_UNAVAILABLE_MESSAGE,
};
pub use sync_log::SyncLog;
