//! End-to-end reconciliation scenarios against an in-memory controller.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dnac_connector::error::{ConnectorError, ConnectorResult};
use dnac_connector::ids::{EntityId, ExecutionId};
use dnac_connector::operation::{
    ExecutionAccepted, ExecutionDetails, Lookup, LookupFilter, MembershipUpdate, TagMemberQuery,
};
use dnac_connector::traits::{
    ExecutionStatusOp, InventoryConnector, LookupOp, MutateOp, TagMemberOp,
};
use dnac_connector::types::{EntityFamily, ExecutionStatus, HandleKind};
use dnac_intent::{
    Action, IntentError, NoopReason, PollPhase, PollPolicy, ReconcileOptions, Reconciler,
    RfModel,
};

// =============================================================================
// In-memory controller
// =============================================================================

#[derive(Default)]
struct FakeController {
    sites: Mutex<HashMap<String, Value>>,
    tags: Mutex<HashMap<String, Value>>,
    statuses: Mutex<VecDeque<ExecutionDetails>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU32,
    fail_lookups: AtomicBool,
}

impl FakeController {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("lookup") && !c.starts_with("status"))
            .collect()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn script(&self, statuses: Vec<ExecutionDetails>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    fn with_site(self, site_type: &str, hierarchy: &str, attributes: Value) -> Self {
        let name = hierarchy.rsplit('/').next().unwrap().to_string();
        let mut location = json!({"type": site_type});
        if let (Some(target), Some(extra)) = (location.as_object_mut(), attributes.as_object()) {
            target.extend(extra.clone());
        }
        let id = self.next("site");
        self.sites.lock().unwrap().insert(
            hierarchy.to_string(),
            json!({
                "id": id,
                "name": name,
                "siteNameHierarchy": hierarchy,
                "additionalInfo": [{"nameSpace": "Location", "attributes": location}]
            }),
        );
        self
    }

    fn with_tag(self, id: &str, name: &str) -> Self {
        self.tags
            .lock()
            .unwrap()
            .insert(name.to_string(), json!({"id": id, "name": name}));
        self
    }

    fn store_site(&self, payload: &Value) {
        let site_type = payload["type"].as_str().unwrap().to_string();
        let body = payload["site"][&site_type].clone();
        let name = body["name"].as_str().unwrap().to_string();
        let hierarchy = match body["parentName"].as_str() {
            Some(parent) => format!("{parent}/{name}"),
            None => name.clone(),
        };

        let mut location = json!({"type": site_type});
        for key in ["address", "latitude", "longitude"] {
            if let Some(value) = body.get(key) {
                location[key] = value.clone();
            }
        }

        let mut additional_info = vec![json!({"nameSpace": "Location", "attributes": location})];
        if site_type == "floor" {
            let mut geometry = json!({});
            for key in ["width", "length", "height"] {
                if let Some(value) = body.get(key).and_then(Value::as_f64) {
                    geometry[key] = json!(value.to_string());
                }
            }
            let rf_code = body["rfModel"]
                .as_str()
                .and_then(RfModel::from_name)
                .unwrap()
                .code();
            additional_info.push(json!({"nameSpace": "mapGeometry", "attributes": geometry}));
            additional_info.push(json!({"nameSpace": "mapsSummary", "attributes": {"rfModel": rf_code}}));
        }

        let id = self.next("site");
        self.sites.lock().unwrap().insert(
            hierarchy.clone(),
            json!({
                "id": id,
                "name": name,
                "siteNameHierarchy": hierarchy,
                "additionalInfo": additional_info
            }),
        );
    }

    fn accepted(&self) -> ExecutionAccepted {
        ExecutionAccepted::execution(self.next("exec"))
    }
}

#[async_trait]
impl InventoryConnector for FakeController {
    fn display_name(&self) -> &str {
        "fake"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LookupOp for FakeController {
    async fn lookup(&self, family: EntityFamily, filter: &LookupFilter) -> ConnectorResult<Lookup> {
        let name = filter.name.clone().unwrap_or_default();
        self.record(format!("lookup {family:?} {name}"));

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("connection reset by peer"));
        }

        let store = match family {
            EntityFamily::Site => &self.sites,
            _ => &self.tags,
        };
        Ok(match store.lock().unwrap().get(&name) {
            Some(record) => Lookup::Found(record.clone()),
            None => Lookup::NotFound,
        })
    }
}

#[async_trait]
impl MutateOp for FakeController {
    async fn create(
        &self,
        family: EntityFamily,
        payload: &Value,
    ) -> ConnectorResult<ExecutionAccepted> {
        self.record(format!("create {family:?}"));
        match family {
            EntityFamily::Site => self.store_site(payload),
            _ => {
                let name = payload["name"].as_str().unwrap_or_default().to_string();
                let id = self.next("tag");
                let mut record = payload.clone();
                record["id"] = json!(id);
                self.tags.lock().unwrap().insert(name, record);
            }
        }
        Ok(self.accepted())
    }

    async fn update(
        &self,
        family: EntityFamily,
        id: &EntityId,
        _payload: &Value,
    ) -> ConnectorResult<ExecutionAccepted> {
        self.record(format!("update {family:?} {id}"));
        Ok(self.accepted())
    }

    async fn delete(&self, family: EntityFamily, id: &EntityId) -> ConnectorResult<ExecutionAccepted> {
        self.record(format!("delete {family:?} {id}"));
        self.sites
            .lock()
            .unwrap()
            .retain(|_, record| record["id"] != json!(id.as_str()));
        Ok(self.accepted())
    }
}

#[async_trait]
impl ExecutionStatusOp for FakeController {
    async fn execution_status(
        &self,
        _kind: HandleKind,
        execution_id: &ExecutionId,
    ) -> ConnectorResult<ExecutionDetails> {
        self.record(format!("status {execution_id}"));
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(success))
    }
}

#[async_trait]
impl TagMemberOp for FakeController {
    async fn add_members(
        &self,
        tag_id: &EntityId,
        member_type: &str,
        member_ids: &[String],
    ) -> ConnectorResult<ExecutionAccepted> {
        self.record(format!("add_members {tag_id} {member_type} {}", member_ids.join(",")));
        Ok(ExecutionAccepted::task(self.next("task")))
    }

    async fn remove_member(
        &self,
        tag_id: &EntityId,
        member_id: &str,
    ) -> ConnectorResult<ExecutionAccepted> {
        self.record(format!("remove_member {tag_id} {member_id}"));
        Ok(ExecutionAccepted::task(self.next("task")))
    }

    async fn list_members(
        &self,
        _tag_id: &EntityId,
        _query: &TagMemberQuery,
    ) -> ConnectorResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn count_members(&self, _tag_id: &EntityId, _query: &TagMemberQuery) -> ConnectorResult<u64> {
        Ok(0)
    }

    async fn member_types(&self) -> ConnectorResult<Vec<String>> {
        Ok(vec!["networkdevice".to_string()])
    }

    async fn update_membership(&self, _update: &MembershipUpdate) -> ConnectorResult<ExecutionAccepted> {
        Ok(ExecutionAccepted::task(self.next("task")))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn success() -> ExecutionDetails {
    ExecutionDetails::new(ExecutionStatus::Success, json!({"status": "SUCCESS"}))
}

fn pending() -> ExecutionDetails {
    ExecutionDetails::new(ExecutionStatus::Pending, json!({"status": "IN_PROGRESS"}))
}

fn fast_options() -> ReconcileOptions {
    ReconcileOptions::default().with_poll_policy(
        PollPolicy::default()
            .with_max_attempts(5)
            .with_intervals(Duration::from_millis(1), Duration::from_millis(5))
            .with_jitter(false),
    )
}

fn reconciler(controller: &Arc<FakeController>) -> Reconciler<FakeController> {
    Reconciler::new(Arc::clone(controller)).with_options(fast_options())
}

fn building_entry() -> Value {
    json!({
        "type": "building",
        "site": {"building": {
            "name": "Building1",
            "parentName": "Global/USA",
            "address": "123 Main St",
            "latitude": 37.338,
            "longitude": -121.832
        }}
    })
}

fn floor_entry() -> Value {
    json!({
        "type": "floor",
        "site": {"floor": {
            "name": "Floor1",
            "parentName": "Global/USA/Building1",
            "rfModel": "Cubes And Walled Offices",
            "width": 100,
            "length": 80.5,
            "height": 10
        }}
    })
}

fn area_entry(name: &str, parent: &str) -> Value {
    json!({"type": "area", "site": {"area": {"name": name, "parentName": parent}}})
}

fn membership_entry(member_ids: &[&str]) -> Value {
    json!({
        "type": "tagMember",
        "tagMember": {
            "tagName": "Floor-APs",
            "memberType": "networkdevice",
            "memberIds": member_ids
        }
    })
}

// =============================================================================
// Sites
// =============================================================================

#[tokio::test]
async fn test_create_building_polls_to_success() {
    let controller = Arc::new(FakeController::default());
    controller.script(vec![pending(), success()]);

    let result = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.msg, "Site Created Successfully");
    assert!(result.warnings.is_empty());

    let outcome = &result.outcomes[0];
    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.name, "Global/USA/Building1");
    assert!(outcome.id.is_some());
    assert_eq!(
        outcome.executions[0].phases,
        vec![PollPhase::Submitted, PollPhase::Polling, PollPhase::Succeeded]
    );
    assert_eq!(controller.mutations(), vec!["create Site"]);
}

#[tokio::test]
async fn test_second_run_is_a_noop() {
    let controller = Arc::new(FakeController::default());
    let reconciler = reconciler(&controller);

    let first = reconciler.merged(&[building_entry()]).await.unwrap();
    assert!(first.changed);

    let second = reconciler.merged(&[building_entry()]).await.unwrap();
    assert!(!second.changed);
    assert_eq!(second.msg, "Site does not need update");
    assert_eq!(second.outcomes[0].action, Action::Noop(NoopReason::UpToDate));
    assert_eq!(second.response["site"]["building"]["address"], "123 Main St");
    assert_eq!(controller.mutations(), vec!["create Site"]);
}

#[tokio::test]
async fn test_second_floor_run_is_a_noop() {
    let controller = Arc::new(FakeController::default());
    let reconciler = reconciler(&controller);

    let first = reconciler.merged(&[floor_entry()]).await.unwrap();
    assert!(first.changed);
    assert_eq!(first.msg, "Site Created Successfully");

    let second = reconciler.merged(&[floor_entry()]).await.unwrap();
    assert!(!second.changed);
    assert_eq!(second.outcomes[0].action, Action::Noop(NoopReason::UpToDate));
    assert_eq!(
        second.response["site"]["floor"]["rfModel"],
        "CUBES AND WALLED OFFICES"
    );
    assert_eq!(controller.mutations(), vec!["create Site"]);
}

#[tokio::test]
async fn test_changed_attribute_updates_by_id() {
    let controller = Arc::new(FakeController::default().with_site(
        "building",
        "Global/USA/Building1",
        json!({"address": "1 Market St", "latitude": "37.338", "longitude": "-121.832"}),
    ));

    let result = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.msg, "Site Updated Successfully");
    let diff = result.outcomes[0].diff.as_ref().unwrap();
    assert_eq!(diff.field_names(), vec!["address"]);
    assert_eq!(controller.mutations(), vec!["update Site site-1"]);
}

#[tokio::test]
async fn test_delete_existing_site() {
    let controller = Arc::new(FakeController::default().with_site(
        "area",
        "Global/USA",
        json!({}),
    ));

    let result = reconciler(&controller)
        .deleted(&[area_entry("USA", "Global")])
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.msg, "Site Deleted Successfully");
    assert_eq!(controller.mutations(), vec!["delete Site site-1"]);
}

#[tokio::test]
async fn test_delete_missing_site_is_not_found() {
    let controller = Arc::new(FakeController::default());

    let result = reconciler(&controller)
        .deleted(&[area_entry("Mars", "Global")])
        .await
        .unwrap();

    assert!(!result.changed);
    assert_eq!(result.msg, "Site Not Found");
    assert!(controller.mutations().is_empty());
}

#[tokio::test]
async fn test_remote_failure_surfaces_controller_message() {
    let controller = Arc::new(FakeController::default());
    controller.script(vec![
        pending(),
        ExecutionDetails::new(ExecutionStatus::Failed, json!({})).with_bapi_error(Some("Invalid parent")),
    ]);

    let err = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap_err();

    assert!(matches!(err, IntentError::RemoteExecution { .. }));
    assert_eq!(err.to_string(), "Invalid parent");
}

#[tokio::test]
async fn test_poll_exhaustion_times_out() {
    let controller = Arc::new(FakeController::default());
    controller.script(vec![pending(); 10]);

    let err = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "POLL_TIMEOUT");
}

// =============================================================================
// Failures before any mutation
// =============================================================================

#[tokio::test]
async fn test_invalid_config_sends_nothing() {
    let controller = Arc::new(FakeController::default());
    let invalid = json!({"type": "building", "site": {"building": {"name": "B2", "parentName": "Global", "latitude": 120.0}}});

    let err = reconciler(&controller)
        .merged(&[building_entry(), invalid])
        .await
        .unwrap_err();

    match err {
        IntentError::Validation { messages } => {
            assert_eq!(messages, vec!["entry 1: latitude: must be between -90 and 90"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(controller.calls().is_empty());
}

#[tokio::test]
async fn test_lookup_transport_error_is_not_absent() {
    let controller = Arc::new(FakeController::default());
    controller.fail_lookups.store(true, Ordering::SeqCst);

    let err = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "LOOKUP_FAILED");
    assert!(err.is_transient());
    assert!(controller.mutations().is_empty());
}

#[tokio::test]
async fn test_entity_type_mismatch() {
    let controller = Arc::new(FakeController::default().with_site(
        "area",
        "Global/USA/Building1",
        json!({}),
    ));

    let err = reconciler(&controller)
        .merged(&[building_entry()])
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "ENTITY_TYPE_MISMATCH");
    assert!(controller.mutations().is_empty());
}

// =============================================================================
// Tags and memberships
// =============================================================================

#[tokio::test]
async fn test_create_tag() {
    let controller = Arc::new(FakeController::default());

    let result = reconciler(&controller)
        .merged(&[json!({"type": "tag", "tag": {"name": "Floor-APs", "description": "APs"}})])
        .await
        .unwrap();

    assert_eq!(result.msg, "Tag Created Successfully");
    assert_eq!(controller.mutations(), vec!["create Tag"]);
}

#[tokio::test]
async fn test_add_members_to_existing_tag() {
    let controller = Arc::new(FakeController::default().with_tag("t1", "Floor-APs"));

    let result = reconciler(&controller)
        .merged(&[membership_entry(&["d1", "d2"])])
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.msg, "Tag Members Added Successfully");
    assert_eq!(controller.mutations(), vec!["add_members t1 networkdevice d1,d2"]);
}

#[tokio::test]
async fn test_remove_members_one_call_each() {
    let controller = Arc::new(FakeController::default().with_tag("t1", "Floor-APs"));

    let result = reconciler(&controller)
        .deleted(&[membership_entry(&["d1", "d2"])])
        .await
        .unwrap();

    assert_eq!(result.msg, "Tag Members Removed Successfully");
    assert_eq!(result.outcomes[0].executions.len(), 2);
    assert_eq!(result.response.as_array().map(Vec::len), Some(2));
    assert_eq!(
        controller.mutations(),
        vec!["remove_member t1 d1", "remove_member t1 d2"]
    );
}

#[tokio::test]
async fn test_members_of_missing_tag() {
    let controller = Arc::new(FakeController::default());

    let err = reconciler(&controller)
        .merged(&[membership_entry(&["d1"])])
        .await
        .unwrap_err();
    assert!(matches!(err, IntentError::TagNotFound { ref name } if name == "Floor-APs"));

    let result = reconciler(&controller)
        .deleted(&[membership_entry(&["d1"])])
        .await
        .unwrap();
    assert!(!result.changed);
    assert_eq!(result.msg, "Tag Not Found");
    assert!(controller.mutations().is_empty());
}

// =============================================================================
// Options and aggregation
// =============================================================================

#[tokio::test]
async fn test_dry_run_submits_nothing() {
    let controller = Arc::new(FakeController::default());
    let reconciler = Reconciler::new(Arc::clone(&controller))
        .with_options(fast_options().with_dry_run(true));

    let result = reconciler.merged(&[building_entry()]).await.unwrap();

    assert!(result.changed);
    assert_eq!(result.msg, "Site would be created");
    assert_eq!(
        result.response["payload"]["site"]["building"]["parentName"],
        "Global/USA"
    );
    assert!(controller.mutations().is_empty());
}

#[tokio::test]
async fn test_multiple_entries_in_order() {
    let controller = Arc::new(FakeController::default().with_site("area", "Global/USA", json!({})));

    let result = reconciler(&controller)
        .merged(&[area_entry("USA", "Global"), building_entry()])
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(
        result.msg,
        "Global/USA: Site does not need update; Global/USA/Building1: Site Created Successfully"
    );
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.response.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let controller = Arc::new(FakeController::default());
    controller.script(vec![
        ExecutionDetails::new(ExecutionStatus::Failed, json!({})).with_bapi_error(Some("Invalid parent")),
    ]);

    let err = reconciler(&controller)
        .merged(&[building_entry(), area_entry("Canada", "Global")])
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "REMOTE_EXECUTION_FAILED");
    assert!(err.completed().is_empty());
    assert_eq!(controller.mutations(), vec!["create Site"]);
}

#[tokio::test]
async fn test_failure_keeps_applied_outcomes() {
    let controller = Arc::new(FakeController::default());
    controller.script(vec![
        success(),
        ExecutionDetails::new(ExecutionStatus::Failed, json!({})).with_bapi_error(Some("Invalid parent")),
    ]);

    let err = reconciler(&controller)
        .merged(&[area_entry("USA", "Global"), area_entry("Canada", "Global/Nowhere")])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid parent");
    assert_eq!(err.error_code(), "REMOTE_EXECUTION_FAILED");
    assert!(matches!(err.root(), IntentError::RemoteExecution { .. }));

    let completed = err.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].name, "Global/USA");
    assert_eq!(completed[0].action, Action::Create);
    assert!(completed[0].changed);
}
