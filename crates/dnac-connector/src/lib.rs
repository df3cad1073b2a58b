//! # Inventory Client Framework
//!
//! Core abstractions for talking to a network controller's inventory.
//!
//! The reconciliation engine never speaks HTTP itself; it drives a client
//! through the capability traits defined here. The REST implementation
//! lives in `dnac-connector-rest`, tests use in-memory clients.
//!
//! ## Architecture
//!
//! - [`InventoryConnector`] - Base trait all clients implement
//! - [`LookupOp`] - Existence lookups (`Found` / `NotFound` / `Err`)
//! - [`MutateOp`] - Asynchronous create, update, delete
//! - [`ExecutionStatusOp`] - Execution and task status
//! - [`TagMemberOp`] - Tag membership management
//! - [`DeviceInsightOp`] - Device insight queries
//!
//! ## Example
//!
//! ```ignore
//! use dnac_connector::prelude::*;
//!
//! let found = client
//!     .lookup(EntityFamily::Site, &LookupFilter::by_name("Global/USA"))
//!     .await?;
//!
//! if let Lookup::Found(raw) = found {
//!     println!("{raw}");
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`ids`] - Opaque controller identifiers
//! - [`types`] - Enums and status types
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Client capability traits
//! - [`operation`] - Request and response shapes
//! - [`config`] - Configuration types and traits
//! - [`resilience`] - Backoff schedule

pub mod config;
pub mod error;
pub mod ids;
pub mod operation;
pub mod resilience;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use dnac_connector::prelude::*;
/// ```
pub mod prelude {
    // IDs
    pub use crate::ids::{EntityId, ExecutionId};

    // Types and enums
    pub use crate::types::{EntityFamily, ExecutionStatus, HandleKind};

    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Traits
    pub use crate::traits::{
        DeviceInsightOp, ExecutionStatusOp, InventoryApi, InventoryConnector, LookupOp, MutateOp,
        TagMemberOp,
    };

    // Operations
    pub use crate::operation::{
        ExecutionAccepted, ExecutionDetails, Lookup, LookupFilter, MembershipUpdate, PageRequest,
        TagMemberQuery,
    };

    // Configuration
    pub use crate::config::{ConnectionSettings, ConnectorConfig, TlsConfig};

    // Backoff
    pub use crate::resilience::Backoff;
}

// Re-export async_trait for client implementors
pub use async_trait::async_trait;

// Top-level re-exports
pub use error::{ConnectorError, ConnectorResult};
pub use traits::{
    DeviceInsightOp, ExecutionStatusOp, InventoryApi, InventoryConnector, LookupOp, MutateOp,
    TagMemberOp,
};
