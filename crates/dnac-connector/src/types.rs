//! Inventory type definitions
//!
//! Enums shared by every inventory client implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of managed object on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityFamily {
    /// Site hierarchy element (area, building, floor)
    Site,
    /// Tag (also used as a device group)
    Tag,
    /// Membership of devices/interfaces in a tag
    TagMember,
}

impl EntityFamily {
    /// Get all entity families.
    #[must_use]
    pub fn all() -> &'static [EntityFamily] {
        &[EntityFamily::Site, EntityFamily::Tag, EntityFamily::TagMember]
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityFamily::Site => "site",
            EntityFamily::Tag => "tag",
            EntityFamily::TagMember => "tagMember",
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityFamily {
    type Err = ParseEntityFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "site" | "sites" => Ok(EntityFamily::Site),
            "tag" | "tags" => Ok(EntityFamily::Tag),
            "tagmember" | "tag_member" | "tag-member" => Ok(EntityFamily::TagMember),
            _ => Err(ParseEntityFamilyError(s.to_string())),
        }
    }
}

/// Error parsing entity family from string.
#[derive(Debug, Clone)]
pub struct ParseEntityFamilyError(String);

impl fmt::Display for ParseEntityFamilyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid entity family '{}', expected one of: site, tag, tagMember",
            self.0
        )
    }
}

impl std::error::Error for ParseEntityFamilyError {}

/// Which status endpoint tracks an asynchronous mutation.
///
/// Site mutations go through the business API and report an execution id;
/// tag mutations return a task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// Business API execution (`executionId`)
    #[default]
    Execution,
    /// Task API (`taskId`)
    Task,
}

impl HandleKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKind::Execution => "execution",
            HandleKind::Task => "task",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an asynchronous controller-side mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Accepted, not finished yet
    #[default]
    Pending,
    /// Finished successfully
    Success,
    /// Finished with an error
    Failed,
}

impl ExecutionStatus {
    /// Map the controller's status string.
    ///
    /// Only `SUCCESS` and the failure spellings are terminal; anything else
    /// (`IN_PROGRESS`, empty, unknown) is still pending.
    #[must_use]
    pub fn from_controller(status: &str) -> Self {
        match status {
            "SUCCESS" => ExecutionStatus::Success,
            "FAILURE" | "FAILED" => ExecutionStatus::Failed,
            _ => ExecutionStatus::Pending,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    /// Check if the status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_family_roundtrip() {
        for family in EntityFamily::all() {
            let parsed: EntityFamily = family.as_str().parse().unwrap();
            assert_eq!(parsed, *family);
        }
        assert!("device".parse::<EntityFamily>().is_err());
    }

    #[test]
    fn test_entity_family_serde() {
        let json = serde_json::to_string(&EntityFamily::TagMember).unwrap();
        assert_eq!(json, "\"tagMember\"");
    }

    #[test]
    fn test_execution_status_from_controller() {
        assert_eq!(
            ExecutionStatus::from_controller("SUCCESS"),
            ExecutionStatus::Success
        );
        assert_eq!(
            ExecutionStatus::from_controller("FAILURE"),
            ExecutionStatus::Failed
        );
        assert_eq!(
            ExecutionStatus::from_controller("IN_PROGRESS"),
            ExecutionStatus::Pending
        );
        // Case-sensitive, like the controller
        assert_eq!(
            ExecutionStatus::from_controller("success"),
            ExecutionStatus::Pending
        );
    }

    #[test]
    fn test_execution_status_terminal() {
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
    }
}
