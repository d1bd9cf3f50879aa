//! Pass descriptions and results exchanged with callers of the sync service.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::registry::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Local store -> remote store.
    Push,
    /// Remote store -> local store.
    Pull,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Push => "push",
            Direction::Pull => "pull",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sync pass: a direction and the kinds it covers.
///
/// Kinds are kept sorted and unique, so iterating them always follows
/// [`EntityKind::ALL`] order. A pass is plain data and can be run again as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPass {
    pub direction: Direction,
    kinds: Vec<EntityKind>,
}

impl SyncPass {
    pub fn push() -> Self {
        Self::all(Direction::Push)
    }

    pub fn pull() -> Self {
        Self::all(Direction::Pull)
    }

    pub fn all(direction: Direction) -> Self {
        Self {
            direction,
            kinds: EntityKind::ALL.to_vec(),
        }
    }

    pub fn only(direction: Direction, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        let mut kinds: Vec<EntityKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { direction, kinds }
    }

    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }
}

/// Per-collection counters keyed `<collection>_<action>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats(BTreeMap<String, u64>);

impl SyncStats {
    pub fn bump(&mut self, kind: EntityKind, action: &str) {
        *self
            .0
            .entry(format!("{}_{action}", kind.collection()))
            .or_default() += 1;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn into_map(self) -> BTreeMap<String, u64> {
        self.0
    }

    /// Human-readable summary, e.g. `tasks: 1 created, 2 updated; points: 1 updated`.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for kind in EntityKind::ALL {
            let prefix = format!("{}_", kind.collection());
            let actions: Vec<String> = self
                .0
                .iter()
                .filter(|(_, n)| **n > 0)
                .filter_map(|(key, n)| {
                    key.strip_prefix(&prefix)
                        .map(|action| format!("{n} {action}"))
                })
                .collect();
            if !actions.is_empty() {
                parts.push(format!("{}: {}", kind.collection(), actions.join(", ")));
            }
        }
        parts.join("; ")
    }
}

/// Outcome of an orchestrated pass, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub stats: BTreeMap<String, u64>,
    /// Raw error text for diagnostics.
    pub error_detail: Option<String>,
}

impl SyncResult {
    pub fn success(direction: Direction, stats: SyncStats) -> Self {
        let verb = match direction {
            Direction::Push => "Upload",
            Direction::Pull => "Download",
        };
        let message = if stats.total() == 0 {
            format!("{verb} complete: everything is up to date")
        } else {
            format!("{verb} complete: {}", stats.summary())
        };
        Self {
            success: true,
            message,
            stats: stats.into_map(),
            error_detail: None,
        }
    }

    /// Merge a successful push with the pull that followed it.
    ///
    /// Success, message and error detail come from the pull when it failed.
    pub fn combine(push: SyncResult, pull: SyncResult) -> Self {
        let stats = prefixed(Direction::Push, push.stats)
            .chain(prefixed(Direction::Pull, pull.stats))
            .collect();
        let message = if pull.success {
            format!("{} {}", with_period(&push.message), with_period(&pull.message))
        } else {
            pull.message
        };
        Self {
            success: push.success && pull.success,
            message,
            stats,
            error_detail: pull.error_detail.or(push.error_detail),
        }
    }

    pub fn failure(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self {
            success: false,
            message: message.into(),
            stats: BTreeMap::new(),
            error_detail: Some(detail.to_string()),
        }
    }
}

fn prefixed(
    direction: Direction,
    stats: BTreeMap<String, u64>,
) -> impl Iterator<Item = (String, u64)> {
    stats
        .into_iter()
        .map(move |(key, n)| (format!("{direction}_{key}"), n))
}

fn with_period(message: &str) -> String {
    if message.ends_with('.') {
        message.to_string()
    } else {
        format!("{message}.")
    }
}
