//! # Inventory Intent Reconciliation
//!
//! Brings a controller's sites, tags and tag memberships to a declared
//! state.
//!
//! ## Pipeline
//!
//! 1. [`validate`] - Check raw configuration entries before anything is sent
//! 2. [`normalize`] - Build canonical desired specs and current entities
//! 3. [`diff`] - Compare declared fields with what the controller has
//! 4. [`plan`] - Choose `create`, `update`, `delete` or a no-op
//! 5. [`executor`] - Submit the mutation and obtain execution handles
//! 6. [`poller`] - Poll each handle until it succeeds, fails or times out
//!
//! [`Reconciler`] runs the pipeline for every configured entity in order.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dnac_intent::{Lifecycle, Reconciler};
//!
//! let reconciler = Reconciler::new(Arc::new(client));
//! let result = reconciler.reconcile(&entries, Lifecycle::Merged).await?;
//! println!("changed={} msg={}", result.changed, result.msg);
//! ```

pub mod diff;
pub mod error;
pub mod executor;
pub mod model;
pub mod normalize;
pub mod plan;
pub mod poller;
pub mod reconciler;
pub mod validate;

pub use diff::{Diff, DiffOptions, FieldChange};
pub use error::{DiffError, IntentError, IntentResult, NormalizationError};
pub use executor::{lookup_current, ExecutionHandle, Executor, PollPhase};
pub use model::{
    CurrentState, DesiredSpec, EntityFields, EntityType, ExistingEntity, HierarchyPath, RfModel,
};
pub use normalize::{normalize_current, normalize_desired};
pub use plan::{plan, plan_membership, Action, Lifecycle, NoopReason};
pub use poller::{PollPolicy, TaskPoller};
pub use reconciler::{EntityOutcome, ReconcileOptions, ReconcileResult, Reconciler};
pub use validate::{validate_entries, validate_entry, ValidatedEntry};
