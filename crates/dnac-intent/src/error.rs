//! Reconciliation error types.

use std::time::Duration;

use thiserror::Error;

use dnac_connector::error::ConnectorError;
use dnac_connector::ids::ExecutionId;

use crate::model::EntityType;
use crate::reconciler::EntityOutcome;

/// A controller payload could not be brought into comparable form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// A required attribute is absent.
    #[error("controller record has no '{field}'")]
    MissingField { field: String },

    /// An `additionalInfo` namespace is absent.
    #[error("controller record has no '{namespace}' namespace")]
    MissingNamespace { namespace: String },

    /// The `Location` namespace names a site type this engine does not know.
    #[error("unknown site type '{value}'")]
    UnknownSiteType { value: String },

    /// The floor's RF model code is not in the code table.
    #[error("unknown RF model code '{code}'")]
    UnknownRfModel { code: String },

    /// A dimension or coordinate is neither a number nor a numeric string.
    #[error("attribute '{field}' is not numeric: {value}")]
    NotNumeric { field: String, value: String },

    /// The hierarchy does not end with the entity's own name.
    #[error("hierarchy '{hierarchy}' does not end with '/{name}'")]
    HierarchyMismatch { hierarchy: String, name: String },
}

/// The current entity is of a different type than the desired one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("'{name}' exists as {current} but is declared as {desired}")]
    EntityTypeMismatch {
        name: String,
        current: EntityType,
        desired: EntityType,
    },
}

/// Errors that end a reconciliation invocation.
#[derive(Debug, Error)]
pub enum IntentError {
    /// The configuration failed validation; nothing was sent to the controller.
    #[error("invalid parameters in configuration: {}", messages.join("\n"))]
    Validation { messages: Vec<String> },

    /// The controller returned a record that could not be normalized.
    #[error("normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    /// The existence lookup failed at the transport level.
    #[error("lookup of '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: ConnectorError,
    },

    /// The controller reported the mutation as failed. The message is the
    /// controller's text, unchanged.
    #[error("{message}")]
    RemoteExecution { message: String },

    /// The execution did not reach a terminal status within the poll policy.
    #[error("execution {execution_id} still pending after {attempts} polls ({elapsed:?})")]
    PollTimeout {
        execution_id: ExecutionId,
        attempts: u32,
        elapsed: Duration,
    },

    /// Polling was cancelled by the caller.
    #[error("polling of execution {execution_id} was cancelled")]
    Cancelled { execution_id: ExecutionId },

    /// Current and desired entity types differ.
    #[error("{0}")]
    EntityTypeMismatch(#[from] DiffError),

    /// A membership names a tag the controller does not have.
    #[error("tag '{name}' not found")]
    TagNotFound { name: String },

    /// Any other client failure.
    #[error("controller error: {0}")]
    Connector(#[from] ConnectorError),

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },

    /// A later entry failed after earlier entries were already applied.
    #[error("{source}")]
    Interrupted {
        completed: Vec<EntityOutcome>,
        #[source]
        source: Box<IntentError>,
    },
}

impl IntentError {
    /// Create a validation error from collected messages.
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation { messages }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Normalization(_) => "NORMALIZATION_FAILED",
            Self::Lookup { .. } => "LOOKUP_FAILED",
            Self::RemoteExecution { .. } => "REMOTE_EXECUTION_FAILED",
            Self::PollTimeout { .. } => "POLL_TIMEOUT",
            Self::Cancelled { .. } => "CANCELLED",
            Self::EntityTypeMismatch(_) => "ENTITY_TYPE_MISMATCH",
            Self::TagNotFound { .. } => "TAG_NOT_FOUND",
            Self::Connector(e) => e.error_code(),
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Interrupted { source, .. } => source.error_code(),
        }
    }

    /// Check whether retrying the whole invocation may help.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Lookup { source, .. } | Self::Connector(source) => source.is_transient(),
            Self::PollTimeout { .. } => true,
            Self::Interrupted { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// The error that ended the run, without the applied-entries wrapper.
    pub fn root(&self) -> &IntentError {
        match self {
            Self::Interrupted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Outcomes of entries applied before the failure.
    pub fn completed(&self) -> &[EntityOutcome] {
        match self {
            Self::Interrupted { completed, .. } => completed,
            _ => &[],
        }
    }
}

/// Result type for reconciliation operations.
pub type IntentResult<T> = Result<T, IntentError>;
