//! Mutation submission.
//!
//! The executor turns a planned [`Action`] into client calls and hands back
//! one [`ExecutionHandle`] per accepted mutation for the poller to drive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use dnac_connector::ids::{EntityId, ExecutionId};
use dnac_connector::operation::{ExecutionAccepted, ExecutionDetails, Lookup, LookupFilter};
use dnac_connector::traits::InventoryApi;
use dnac_connector::types::{ExecutionStatus, HandleKind};

use crate::error::{IntentError, IntentResult};
use crate::model::{CurrentState, DesiredSpec, EntityFields};
use crate::normalize::normalize_current;
use crate::plan::Action;
use crate::poller::TaskPoller;

/// Where a handle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    /// The controller accepted the mutation.
    Submitted,
    /// At least one status check saw no outcome yet.
    Polling,
    Succeeded,
    Failed,
}

/// One asynchronous mutation in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    pub execution_id: ExecutionId,
    pub kind: HandleKind,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Phases passed through, in order.
    pub phases: Vec<PollPhase>,
}

impl ExecutionHandle {
    /// Start tracking an accepted mutation.
    #[must_use]
    pub fn from_accepted(accepted: &ExecutionAccepted) -> Self {
        Self {
            execution_id: accepted.execution_id.clone(),
            kind: accepted.kind,
            status: ExecutionStatus::Pending,
            error_detail: None,
            phases: vec![PollPhase::Submitted],
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        self.phases.last().copied().unwrap_or(PollPhase::Submitted)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase(), PollPhase::Succeeded | PollPhase::Failed)
    }

    /// Record a status observation and return the resulting phase.
    ///
    /// `SUCCESS` is checked first, then a reported error, then `FAILURE`.
    pub fn observe(&mut self, details: &ExecutionDetails) -> PollPhase {
        if details.is_success() {
            self.status = ExecutionStatus::Success;
            self.enter(PollPhase::Succeeded);
        } else if details.error_message().is_some() || details.status == ExecutionStatus::Failed {
            self.status = ExecutionStatus::Failed;
            self.error_detail = details.error_message().map(str::to_string);
            self.enter(PollPhase::Failed);
        } else {
            self.status = details.status;
            self.enter(PollPhase::Polling);
        }
        self.phase()
    }

    /// Record a status check that produced no observation.
    pub fn mark_polling(&mut self) {
        self.enter(PollPhase::Polling);
    }

    fn enter(&mut self, phase: PollPhase) {
        if self.phase() != phase {
            self.phases.push(phase);
        }
    }
}

/// Look up what the controller currently has for a spec.
///
/// Transport failures are errors, never `Absent`.
#[instrument(skip(client, spec), fields(name = %spec.lookup_name()))]
pub async fn lookup_current<C>(client: &C, spec: &DesiredSpec) -> IntentResult<CurrentState>
where
    C: InventoryApi + ?Sized,
{
    let name = spec.lookup_name();
    let family = spec.entity_type().lookup_family();

    let found = client
        .lookup(family, &LookupFilter::by_name(&name))
        .await
        .map_err(|source| IntentError::Lookup {
            name: name.clone(),
            source,
        })?;

    match found {
        Lookup::Found(raw) => {
            let entity = normalize_current(family, &raw)?;
            debug!(id = %entity.id, "Entity exists");
            Ok(CurrentState::Present(entity))
        }
        Lookup::NotFound => {
            debug!("Entity not found");
            Ok(CurrentState::Absent)
        }
    }
}

/// Submits planned actions through an inventory client.
pub struct Executor<'a, C: ?Sized> {
    client: &'a C,
    poller: &'a TaskPoller,
}

impl<'a, C> Executor<'a, C>
where
    C: InventoryApi + ?Sized,
{
    #[must_use]
    pub fn new(client: &'a C, poller: &'a TaskPoller) -> Self {
        Self { client, poller }
    }

    /// Submit the mutation for `action`.
    ///
    /// Returns one handle per accepted mutation: none for a no-op, one per
    /// removed member for a membership deletion, one otherwise.
    #[instrument(skip(self, spec, current), fields(name = %spec.lookup_name(), action = %action))]
    pub async fn execute(
        &self,
        action: Action,
        spec: &DesiredSpec,
        current: &CurrentState,
    ) -> IntentResult<Vec<ExecutionHandle>> {
        let family = spec.entity_type().lookup_family();

        let accepted = match (action, spec.fields()) {
            (Action::Noop(_), _) => return Ok(Vec::new()),
            (
                Action::Create,
                EntityFields::TagMember {
                    member_type,
                    member_ids,
                    ..
                },
            ) => {
                let tag_id = existing_id(current, spec)?;
                vec![
                    self.client
                        .add_members(tag_id, member_type, member_ids)
                        .await?,
                ]
            }
            (Action::Delete, EntityFields::TagMember { member_ids, .. }) => {
                let tag_id = existing_id(current, spec)?;
                let mut accepted = Vec::with_capacity(member_ids.len());
                for member_id in member_ids {
                    accepted.push(self.client.remove_member(tag_id, member_id).await?);
                }
                accepted
            }
            (Action::Update, EntityFields::TagMember { .. }) => {
                return Err(IntentError::internal(
                    "tag memberships are added or removed, never updated",
                ))
            }
            (Action::Create, _) => vec![self.client.create(family, &spec.payload()).await?],
            (Action::Update, _) => {
                let id = existing_id(current, spec)?;
                vec![self.client.update(family, id, &spec.payload()).await?]
            }
            (Action::Delete, _) => {
                let id = existing_id(current, spec)?;
                vec![self.client.delete(family, id).await?]
            }
        };

        let handles: Vec<ExecutionHandle> =
            accepted.iter().map(ExecutionHandle::from_accepted).collect();

        for handle in &handles {
            info!(
                execution_id = %handle.execution_id,
                kind = %handle.kind,
                "Mutation submitted"
            );
        }

        Ok(handles)
    }

    /// Poll a handle to completion and return the execution detail.
    pub async fn await_completion(&self, handle: &mut ExecutionHandle) -> IntentResult<Value> {
        self.poller.await_completion(self.client, handle).await
    }

    /// Re-run the existence lookup after a create.
    ///
    /// `Absent` here means the controller has not made the entity visible yet.
    pub async fn confirm_created(&self, spec: &DesiredSpec) -> IntentResult<CurrentState> {
        lookup_current(self.client, spec).await
    }
}

fn existing_id<'c>(current: &'c CurrentState, spec: &DesiredSpec) -> IntentResult<&'c EntityId> {
    current.as_present().map(|entity| &entity.id).ok_or_else(|| {
        IntentError::internal(format!(
            "'{}' has no current entity to act on",
            spec.lookup_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(status: ExecutionStatus, error: Option<&str>) -> ExecutionDetails {
        ExecutionDetails::new(status, json!({})).with_bapi_error(error)
    }

    #[test]
    fn test_handle_phases() {
        let mut handle = ExecutionHandle::from_accepted(&ExecutionAccepted::execution("e1"));
        assert_eq!(handle.phase(), PollPhase::Submitted);

        handle.observe(&details(ExecutionStatus::Pending, None));
        handle.observe(&details(ExecutionStatus::Pending, None));
        assert_eq!(handle.phases, vec![PollPhase::Submitted, PollPhase::Polling]);
        assert!(!handle.is_terminal());

        handle.observe(&details(ExecutionStatus::Success, None));
        assert_eq!(
            handle.phases,
            vec![PollPhase::Submitted, PollPhase::Polling, PollPhase::Succeeded]
        );
        assert!(handle.is_terminal());
    }

    #[test]
    fn test_success_status_wins_over_error() {
        let mut handle = ExecutionHandle::from_accepted(&ExecutionAccepted::execution("e1"));
        let phase = handle.observe(&details(ExecutionStatus::Success, Some("stale warning")));

        assert_eq!(phase, PollPhase::Succeeded);
        assert_eq!(handle.status, ExecutionStatus::Success);
        assert!(handle.error_detail.is_none());
    }

    #[test]
    fn test_error_fails_unfinished_status() {
        let mut handle = ExecutionHandle::from_accepted(&ExecutionAccepted::task("t1"));
        let phase = handle.observe(&details(ExecutionStatus::Pending, Some("Invalid parent")));

        assert_eq!(phase, PollPhase::Failed);
        assert_eq!(handle.status, ExecutionStatus::Failed);
        assert_eq!(handle.error_detail.as_deref(), Some("Invalid parent"));
    }

    #[test]
    fn test_handle_serialization() {
        let handle = ExecutionHandle::from_accepted(&ExecutionAccepted::execution("e1"));
        let value = serde_json::to_value(&handle).unwrap();
        assert_eq!(value["execution_id"], "e1");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["phases"], json!(["submitted"]));
        assert!(value.get("error_detail").is_none());
    }
}
