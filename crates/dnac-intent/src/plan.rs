//! Decide the single action that moves an entity to its desired state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::diff::Diff;

/// Which state the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Entities should exist with the declared attributes.
    #[default]
    Merged,
    /// Entities should not exist.
    Deleted,
}

impl Lifecycle {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Merged => "merged",
            Lifecycle::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merged" => Ok(Lifecycle::Merged),
            "deleted" => Ok(Lifecycle::Deleted),
            _ => Err(format!("invalid state '{s}', expected 'merged' or 'deleted'")),
        }
    }
}

/// Why nothing needs to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    /// The entity already matches.
    UpToDate,
    /// The entity to delete does not exist.
    NotFound,
}

/// The action planned for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "reason")]
pub enum Action {
    Noop(NoopReason),
    Create,
    Update,
    Delete,
}

impl Action {
    /// Check if the action mutates the controller.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::Noop(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Noop(_) => "noop",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan the action for a site or tag.
///
/// A present entity without a diff is treated as changed.
#[must_use]
pub fn plan(lifecycle: Lifecycle, exists: bool, diff: Option<&Diff>) -> Action {
    match (lifecycle, exists) {
        (Lifecycle::Merged, false) => Action::Create,
        (Lifecycle::Merged, true) => {
            if diff.is_some_and(|d| !d.changed) {
                Action::Noop(NoopReason::UpToDate)
            } else {
                Action::Update
            }
        }
        (Lifecycle::Deleted, true) => Action::Delete,
        (Lifecycle::Deleted, false) => Action::Noop(NoopReason::NotFound),
    }
}

/// Plan the action for a tag membership.
///
/// Memberships are never diffed; additions are always submitted. Returns
/// `None` when the tag is missing under `merged`, which cannot be planned.
#[must_use]
pub fn plan_membership(lifecycle: Lifecycle, tag_exists: bool) -> Option<Action> {
    match (lifecycle, tag_exists) {
        (Lifecycle::Merged, true) => Some(Action::Create),
        (Lifecycle::Merged, false) => None,
        (Lifecycle::Deleted, true) => Some(Action::Delete),
        (Lifecycle::Deleted, false) => Some(Action::Noop(NoopReason::NotFound)),
    }
}
