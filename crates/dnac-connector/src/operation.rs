//! Inventory operation types
//!
//! Request and response shapes exchanged with an inventory client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::ExecutionId;
use crate::types::{ExecutionStatus, HandleKind};

/// Filter for an existence lookup.
///
/// Sites are looked up by their full hierarchy name, tags by name or id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LookupFilter {
    /// Name to match (site hierarchy name for sites).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Controller id to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl LookupFilter {
    /// Look up by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            id: None,
        }
    }

    /// Look up by controller id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            name: None,
            id: Some(id.into()),
        }
    }

    /// Human-readable key used in logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.name, &self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("id={id}"),
            (None, None) => "<empty filter>".to_string(),
        }
    }
}

/// Outcome of an existence lookup.
///
/// Transport failures are reported as `Err` by the client, never as
/// `NotFound`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The entity exists; carries the first matching raw record.
    Found(Value),
    /// The controller has no such entity.
    NotFound,
}

impl Lookup {
    /// Check whether the lookup found an entity.
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Get the raw record, if any.
    #[must_use]
    pub fn into_found(self) -> Option<Value> {
        match self {
            Lookup::Found(raw) => Some(raw),
            Lookup::NotFound => None,
        }
    }
}

/// Acknowledgement of an accepted asynchronous mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionAccepted {
    /// Handle to poll.
    pub execution_id: ExecutionId,

    /// Which status endpoint tracks the handle.
    pub kind: HandleKind,

    /// Status URL reported by the controller, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,

    /// Acceptance message reported by the controller, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionAccepted {
    /// Create an acknowledgement for a business API execution.
    pub fn execution(execution_id: impl Into<ExecutionId>) -> Self {
        Self {
            execution_id: execution_id.into(),
            kind: HandleKind::Execution,
            status_url: None,
            message: None,
        }
    }

    /// Create an acknowledgement for a task.
    pub fn task(task_id: impl Into<ExecutionId>) -> Self {
        Self {
            execution_id: task_id.into(),
            kind: HandleKind::Task,
            status_url: None,
            message: None,
        }
    }

    /// Set the status URL.
    #[must_use]
    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = Some(url.into());
        self
    }

    /// Set the acceptance message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One observation of an asynchronous mutation's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetails {
    /// Normalized status.
    pub status: ExecutionStatus,

    /// Controller-reported failure text (`bapiError`, or `failureReason` for
    /// tasks). Empty strings are normalized to `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bapi_error: Option<String>,

    /// Full execution-detail payload.
    pub raw: Value,
}

impl ExecutionDetails {
    /// Build details from a status and payload.
    pub fn new(status: ExecutionStatus, raw: Value) -> Self {
        Self {
            status,
            bapi_error: None,
            raw,
        }
    }

    /// Attach a failure message. Blank messages are ignored.
    #[must_use]
    pub fn with_bapi_error(mut self, error: Option<impl Into<String>>) -> Self {
        self.bapi_error = error.map(Into::into).filter(|e| !e.trim().is_empty());
        self
    }

    /// Check whether the mutation completed successfully.
    ///
    /// A `SUCCESS` status is final even when a `bapiError` rides along.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Get the failure message, if the mutation failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        if self.is_success() {
            None
        } else {
            self.bapi_error.as_deref()
        }
    }

    /// Check whether polling can stop.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() || self.bapi_error.is_some()
    }
}

/// Query parameters for listing tag members.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMemberQuery {
    /// Entity type of the member (see `member_types`).
    pub member_type: String,

    /// Starting row number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,

    /// Maximum number of members to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// `DYNAMIC`, `STATIC` or `MIXED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_association_type: Option<String>,

    /// Level query parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl TagMemberQuery {
    pub fn new(member_type: impl Into<String>) -> Self {
        Self {
            member_type: member_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_association_type(mut self, association: impl Into<String>) -> Self {
        self.member_association_type = Some(association.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Render as query string pairs, in a stable order.
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("memberType".to_string(), self.member_type.clone())];
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ref association) = self.member_association_type {
            params.push(("memberAssociationType".to_string(), association.clone()));
        }
        if let Some(ref level) = self.level {
            params.push(("level".to_string(), level.clone()));
        }
        params
    }
}

/// Pagination request for list queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Row number to start at (the controller counts from 1).
    #[serde(default = "default_offset")]
    pub offset: u32,

    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Optional sort attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    /// Sort order (`asc` / `desc`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

fn default_offset() -> u32 {
    1
}

fn default_limit() -> u32 {
    500
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: default_offset(),
            limit: default_limit(),
            sort_by: None,
            order: None,
        }
    }
}

impl PageRequest {
    /// Create a new page request.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }

    /// Set the sort attribute and order.
    #[must_use]
    pub fn sorted_by(mut self, attribute: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort_by = Some(attribute.into());
        self.order = Some(order.into());
        self
    }

    /// Render as query string pairs.
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(ref sort_by) = self.sort_by {
            params.push(("sortBy".to_string(), sort_by.clone()));
        }
        if let Some(ref order) = self.order {
            params.push(("order".to_string(), order.clone()));
        }
        params
    }
}

/// Membership update: only the listed members are added to / retained in
/// each tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipUpdate {
    /// Member id to tag ids.
    pub member_to_tags: BTreeMap<String, Vec<String>>,

    /// Entity type of the members.
    pub member_type: String,
}

impl MembershipUpdate {
    pub fn new(member_type: impl Into<String>) -> Self {
        Self {
            member_to_tags: BTreeMap::new(),
            member_type: member_type.into(),
        }
    }

    /// Assign a member to a set of tags.
    #[must_use]
    pub fn with_member(mut self, member_id: impl Into<String>, tag_ids: Vec<String>) -> Self {
        self.member_to_tags.insert(member_id.into(), tag_ids);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member_to_tags.is_empty()
    }
}
