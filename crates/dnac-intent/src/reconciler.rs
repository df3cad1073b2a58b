//! Reconciliation entry points.
//!
//! For each configured entity, in order: normalize, look up, diff, plan,
//! submit, poll. Entities are reconciled one at a time; the first error ends
//! the invocation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use dnac_connector::ids::EntityId;
use dnac_connector::traits::InventoryApi;

use crate::diff::{diff, Diff, DiffOptions};
use crate::error::{IntentError, IntentResult};
use crate::executor::{lookup_current, ExecutionHandle, Executor};
use crate::model::{CurrentState, DesiredSpec, EntityType};
use crate::normalize::normalize_desired;
use crate::plan::{plan, plan_membership, Action, Lifecycle, NoopReason};
use crate::poller::{PollPolicy, TaskPoller};
use crate::validate::validate_entries;

/// Reconciliation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Plan and report without submitting any mutation.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub diff: DiffOptions,

    #[serde(default)]
    pub poll: PollPolicy,
}

impl ReconcileOptions {
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }

    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

/// What happened to one configured entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityOutcome {
    /// Lookup name (full hierarchy for sites).
    pub name: String,
    pub entity_type: EntityType,
    pub action: Action,
    pub changed: bool,
    pub msg: String,
    /// Controller id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    pub response: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<ExecutionHandle>,
}

/// Result of one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub msg: String,
    pub response: Value,
    pub warnings: Vec<String>,
    pub outcomes: Vec<EntityOutcome>,
}

impl ReconcileResult {
    /// Aggregate per-entity outcomes.
    ///
    /// A single outcome is reported as is; several are combined, with the
    /// responses collected into a list.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<EntityOutcome>, warnings: Vec<String>) -> Self {
        let changed = outcomes.iter().any(|o| o.changed);

        let (msg, response) = match outcomes.as_slice() {
            [single] => (single.msg.clone(), single.response.clone()),
            many => (
                many.iter()
                    .map(|o| format!("{}: {}", o.name, o.msg))
                    .collect::<Vec<_>>()
                    .join("; "),
                Value::Array(many.iter().map(|o| o.response.clone()).collect()),
            ),
        };

        Self {
            changed,
            msg,
            response,
            warnings,
            outcomes,
        }
    }
}

/// Reconciles configured entities against the controller.
pub struct Reconciler<C: ?Sized> {
    client: Arc<C>,
    options: ReconcileOptions,
    poller: TaskPoller,
    cancel: CancellationToken,
}

impl<C> Reconciler<C>
where
    C: InventoryApi + ?Sized,
{
    pub fn new(client: Arc<C>) -> Self {
        let options = ReconcileOptions::default();
        let cancel = CancellationToken::new();
        Self {
            poller: TaskPoller::new(options.poll.clone()).with_cancellation(cancel.clone()),
            client,
            options,
            cancel,
        }
    }

    /// Replace the reconciliation settings.
    #[must_use]
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.poller = TaskPoller::new(options.poll.clone()).with_cancellation(self.cancel.clone());
        self.options = options;
        self
    }

    /// Cancel polling through a caller-owned token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poller = TaskPoller::new(self.options.poll.clone()).with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Make the configured entities exist as declared.
    pub async fn merged(&self, entries: &[Value]) -> IntentResult<ReconcileResult> {
        self.reconcile(entries, Lifecycle::Merged).await
    }

    /// Make the configured entities not exist.
    pub async fn deleted(&self, entries: &[Value]) -> IntentResult<ReconcileResult> {
        self.reconcile(entries, Lifecycle::Deleted).await
    }

    /// Validate raw configuration entries and reconcile them.
    ///
    /// Nothing reaches the controller when any entry is invalid.
    #[instrument(skip(self, entries), fields(entries = entries.len(), state = %lifecycle, dry_run = self.options.dry_run))]
    pub async fn reconcile(
        &self,
        entries: &[Value],
        lifecycle: Lifecycle,
    ) -> IntentResult<ReconcileResult> {
        let validated = validate_entries(entries)?;
        let specs: Vec<DesiredSpec> = validated.iter().map(normalize_desired).collect();
        self.reconcile_specs(&specs, lifecycle).await
    }

    /// Reconcile already-built specs, serially and in order.
    pub async fn reconcile_specs(
        &self,
        specs: &[DesiredSpec],
        lifecycle: Lifecycle,
    ) -> IntentResult<ReconcileResult> {
        let mut outcomes = Vec::with_capacity(specs.len());
        let mut warnings = Vec::new();

        for spec in specs {
            match self.reconcile_one(spec, lifecycle, &mut warnings).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if outcomes.is_empty() => return Err(e),
                Err(e) => {
                    for done in outcomes.iter().filter(|o| o.changed) {
                        warn!(name = %done.name, action = %done.action, "Applied before the run failed");
                    }
                    return Err(IntentError::Interrupted {
                        completed: outcomes,
                        source: Box::new(e),
                    });
                }
            }
        }

        let result = ReconcileResult::from_outcomes(outcomes, warnings);
        info!(
            changed = result.changed,
            entities = result.outcomes.len(),
            warnings = result.warnings.len(),
            "Reconciliation finished"
        );
        Ok(result)
    }

    #[instrument(skip(self, spec, warnings), fields(name = %spec.lookup_name(), entity_type = %spec.entity_type()))]
    async fn reconcile_one(
        &self,
        spec: &DesiredSpec,
        lifecycle: Lifecycle,
        warnings: &mut Vec<String>,
    ) -> IntentResult<EntityOutcome> {
        let client = self.client.as_ref();
        let current = lookup_current(client, spec).await?;

        let (action, changes) = if spec.entity_type() == EntityType::TagMember {
            let action = plan_membership(lifecycle, current.exists()).ok_or_else(|| {
                IntentError::TagNotFound {
                    name: spec.name().to_string(),
                }
            })?;
            (action, None)
        } else {
            let changes = match (lifecycle, current.as_present()) {
                (Lifecycle::Merged, Some(existing)) => {
                    Some(diff(existing, spec, &self.options.diff)?)
                }
                _ => None,
            };
            (plan(lifecycle, current.exists(), changes.as_ref()), changes)
        };

        info!(action = %action, "Planned action");

        let mut outcome = EntityOutcome {
            name: spec.lookup_name(),
            entity_type: spec.entity_type(),
            action,
            changed: false,
            msg: String::new(),
            id: current.as_present().map(|e| e.id.clone()),
            diff: changes,
            response: Value::Null,
            executions: Vec::new(),
        };

        match action {
            Action::Noop(NoopReason::UpToDate) => {
                outcome.msg = format!("{} does not need update", spec.entity_type().label());
                outcome.response = current
                    .as_present()
                    .map_or(Value::Null, |existing| existing.normalized());
            }
            Action::Noop(NoopReason::NotFound) => {
                outcome.msg = not_found_message(spec.entity_type());
            }
            _ if self.options.dry_run => {
                outcome.changed = true;
                outcome.msg = dry_run_message(spec.entity_type(), action);
                outcome.response = planned_response(action, spec, &current);
            }
            _ => {
                let executor = Executor::new(client, &self.poller);
                let mut handles = executor.execute(action, spec, &current).await?;

                let mut responses = Vec::with_capacity(handles.len());
                for handle in &mut handles {
                    responses.push(executor.await_completion(handle).await?);
                }

                outcome.changed = true;
                outcome.msg = done_message(spec.entity_type(), action);
                outcome.response = if responses.len() == 1 {
                    responses.remove(0)
                } else {
                    Value::Array(responses)
                };
                outcome.executions = handles;

                if action == Action::Create && spec.entity_type() != EntityType::TagMember {
                    match executor.confirm_created(spec).await {
                        Ok(CurrentState::Present(created)) => {
                            info!(id = %created.id, "Created entity confirmed");
                            outcome.id = Some(created.id);
                        }
                        Ok(CurrentState::Absent) => {
                            warn!("Created entity not visible yet");
                            warnings.push(format!(
                                "{} '{}' was created but is not visible yet",
                                spec.entity_type().label(),
                                spec.lookup_name()
                            ));
                        }
                        Err(e) => {
                            warn!(error = %e, "Could not confirm created entity");
                            warnings.push(format!(
                                "could not confirm creation of '{}': {e}",
                                spec.lookup_name()
                            ));
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

fn not_found_message(entity_type: EntityType) -> String {
    match entity_type {
        EntityType::TagMember => "Tag Not Found".to_string(),
        other => format!("{} Not Found", other.label()),
    }
}

fn done_message(entity_type: EntityType, action: Action) -> String {
    match (entity_type, action) {
        (EntityType::TagMember, Action::Delete) => "Tag Members Removed Successfully".to_string(),
        (EntityType::TagMember, _) => "Tag Members Added Successfully".to_string(),
        (other, Action::Create) => format!("{} Created Successfully", other.label()),
        (other, Action::Delete) => format!("{} Deleted Successfully", other.label()),
        (other, _) => format!("{} Updated Successfully", other.label()),
    }
}

fn dry_run_message(entity_type: EntityType, action: Action) -> String {
    match (entity_type, action) {
        (EntityType::TagMember, Action::Delete) => "Tag members would be removed".to_string(),
        (EntityType::TagMember, _) => "Tag members would be added".to_string(),
        (other, action) => format!("{} would be {}d", other.label(), action.as_str()),
    }
}

fn planned_response(action: Action, spec: &DesiredSpec, current: &CurrentState) -> Value {
    let current = current.as_present().map(|existing| existing.normalized());
    match action {
        Action::Create => json!({ "payload": spec.payload() }),
        Action::Update => json!({ "payload": spec.payload(), "current": current }),
        _ if spec.entity_type() == EntityType::TagMember => {
            json!({ "payload": spec.payload(), "current": current })
        }
        _ => json!({ "current": current }),
    }
}
