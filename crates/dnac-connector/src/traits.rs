//! Inventory client traits
//!
//! Capability-based trait definitions for controller inventory clients.
//! A client implements only the capabilities its controller offers; the
//! reconciliation engine requires [`InventoryApi`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ConnectorResult;
use crate::ids::{EntityId, ExecutionId};
use crate::operation::{
    ExecutionAccepted, ExecutionDetails, Lookup, LookupFilter, MembershipUpdate, PageRequest,
    TagMemberQuery,
};
use crate::types::{EntityFamily, HandleKind};

/// Base trait for all inventory clients.
#[async_trait]
pub trait InventoryConnector: Send + Sync {
    /// Get the display name for this client instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the controller.
    ///
    /// Returns `Ok(())` if the controller is reachable and accepts the
    /// configured credentials.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Capability for existence lookups.
#[async_trait]
pub trait LookupOp: InventoryConnector {
    /// Look up a single entity.
    ///
    /// Returns `Lookup::NotFound` when the controller reports no match
    /// (empty list or "not found" answer). Any transport or decoding failure
    /// is an `Err`, never `NotFound`.
    async fn lookup(&self, family: EntityFamily, filter: &LookupFilter)
        -> ConnectorResult<Lookup>;

    /// Check whether an entity exists.
    async fn exists(&self, family: EntityFamily, filter: &LookupFilter) -> ConnectorResult<bool> {
        Ok(self.lookup(family, filter).await?.exists())
    }
}

/// Capability for asynchronous mutations.
///
/// Every mutation is accepted by the controller and completed later; the
/// returned acknowledgement carries the handle to poll.
#[async_trait]
pub trait MutateOp: InventoryConnector {
    /// Create an entity.
    ///
    /// # Arguments
    /// * `family` - The kind of entity to create
    /// * `payload` - The controller-shaped request body
    async fn create(&self, family: EntityFamily, payload: &Value)
        -> ConnectorResult<ExecutionAccepted>;

    /// Update an existing entity.
    async fn update(
        &self,
        family: EntityFamily,
        id: &EntityId,
        payload: &Value,
    ) -> ConnectorResult<ExecutionAccepted>;

    /// Delete an entity.
    async fn delete(&self, family: EntityFamily, id: &EntityId)
        -> ConnectorResult<ExecutionAccepted>;
}

/// Capability for observing asynchronous mutations.
#[async_trait]
pub trait ExecutionStatusOp: InventoryConnector {
    /// Fetch the current status of an accepted mutation.
    async fn execution_status(
        &self,
        kind: HandleKind,
        execution_id: &ExecutionId,
    ) -> ConnectorResult<ExecutionDetails>;
}

/// Capability for managing tag membership.
#[async_trait]
pub trait TagMemberOp: InventoryConnector {
    /// Add members of one type to a tag.
    async fn add_members(
        &self,
        tag_id: &EntityId,
        member_type: &str,
        member_ids: &[String],
    ) -> ConnectorResult<ExecutionAccepted>;

    /// Remove a single member from a tag.
    async fn remove_member(
        &self,
        tag_id: &EntityId,
        member_id: &str,
    ) -> ConnectorResult<ExecutionAccepted>;

    /// List members of a tag.
    async fn list_members(
        &self,
        tag_id: &EntityId,
        query: &TagMemberQuery,
    ) -> ConnectorResult<Vec<Value>>;

    /// Count members of a tag.
    async fn count_members(&self, tag_id: &EntityId, query: &TagMemberQuery)
        -> ConnectorResult<u64>;

    /// List the member types the controller supports.
    async fn member_types(&self) -> ConnectorResult<Vec<String>>;

    /// Replace membership for the listed members.
    async fn update_membership(
        &self,
        update: &MembershipUpdate,
    ) -> ConnectorResult<ExecutionAccepted>;
}

/// Capability for device insight queries.
#[async_trait]
pub trait DeviceInsightOp: InventoryConnector {
    /// List devices of a site that still use SNMPv3 with DES privacy.
    async fn devices_with_snmp_v3_des(
        &self,
        site_id: &EntityId,
        page: &PageRequest,
    ) -> ConnectorResult<Vec<Value>>;
}

/// Marker trait for clients that support everything reconciliation needs.
pub trait InventoryApi: LookupOp + MutateOp + ExecutionStatusOp + TagMemberOp {}

// Blanket implementation for any client that implements all required ops
impl<T> InventoryApi for T where T: LookupOp + MutateOp + ExecutionStatusOp + TagMemberOp {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use crate::types::ExecutionStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    // Mock client for testing
    struct MockClient {
        name: String,
        reachable: Arc<AtomicBool>,
    }

    impl MockClient {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                reachable: Arc::new(AtomicBool::new(true)),
            }
        }
    }

    #[async_trait]
    impl InventoryConnector for MockClient {
        fn display_name(&self) -> &str {
            &self.name
        }

        async fn test_connection(&self) -> ConnectorResult<()> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ConnectorError::connection_failed("unreachable"))
            }
        }
    }

    #[async_trait]
    impl LookupOp for MockClient {
        async fn lookup(
            &self,
            _family: EntityFamily,
            filter: &LookupFilter,
        ) -> ConnectorResult<Lookup> {
            match filter.name.as_deref() {
                Some("Global/USA") => Ok(Lookup::Found(json!({"id": "usa"}))),
                Some("broken") => Err(ConnectorError::connection_failed("reset")),
                _ => Ok(Lookup::NotFound),
            }
        }
    }

    #[async_trait]
    impl ExecutionStatusOp for MockClient {
        async fn execution_status(
            &self,
            _kind: HandleKind,
            _execution_id: &ExecutionId,
        ) -> ConnectorResult<ExecutionDetails> {
            Ok(ExecutionDetails::new(ExecutionStatus::Success, json!({})))
        }
    }

    #[tokio::test]
    async fn test_mock_client() {
        let client = MockClient::new("test");
        assert_eq!(client.display_name(), "test");
        assert!(client.test_connection().await.is_ok());

        client.reachable.store(false, Ordering::SeqCst);
        assert!(client.test_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_exists_default_method() {
        let client = MockClient::new("test");
        assert!(client
            .exists(EntityFamily::Site, &LookupFilter::by_name("Global/USA"))
            .await
            .unwrap());
        assert!(!client
            .exists(EntityFamily::Site, &LookupFilter::by_name("Global/Mars"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_exists_propagates_transport_error() {
        let client = MockClient::new("test");
        let err = client
            .exists(EntityFamily::Site, &LookupFilter::by_name("broken"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_execution_status_through_trait_object() {
        let client: Box<dyn ExecutionStatusOp> = Box::new(MockClient::new("boxed"));
        let details = client
            .execution_status(HandleKind::Execution, &ExecutionId::new("e-1"))
            .await
            .unwrap();
        assert!(details.is_success());
    }
}
