//! The entity kinds that take part in sync, in pass order.
//!
//! Parents come before children so a child's remote path always hangs off a
//! parent that the same pass has already reconciled.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tasks,
    Subtasks,
    Habits,
    Completions,
    Goals,
    Rewards,
    Points,
    Settings,
}

impl EntityKind {
    /// Every kind, in the order a pass reconciles them.
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Tasks,
        EntityKind::Subtasks,
        EntityKind::Habits,
        EntityKind::Completions,
        EntityKind::Goals,
        EntityKind::Rewards,
        EntityKind::Points,
        EntityKind::Settings,
    ];

    /// Prefix of this kind's counters (`tasks_created`, ...).
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Tasks => "tasks",
            EntityKind::Subtasks => "subtasks",
            EntityKind::Habits => "habits",
            EntityKind::Completions => "completions",
            EntityKind::Goals => "goals",
            EntityKind::Rewards => "rewards",
            EntityKind::Points => "points",
            EntityKind::Settings => "settings",
        }
    }

    /// The kind this one is nested under remotely, if any.
    pub fn parent(self) -> Option<EntityKind> {
        match self {
            EntityKind::Subtasks => Some(EntityKind::Tasks),
            EntityKind::Completions => Some(EntityKind::Habits),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}
