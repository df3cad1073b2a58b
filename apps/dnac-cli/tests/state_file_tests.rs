//! Integration tests for desired-state file loading
//!
//! Tests cover:
//! - Loading a bare list and a document with `state`
//! - Missing file and invalid YAML
//! - Loaded entries passing (or failing) entry validation

use std::io::Write;

use dnac_cli::state_file::load_state;
use dnac_intent::{validate_entries, EntityType, IntentError, Lifecycle};
use tempfile::NamedTempFile;

fn write_state(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

// =========================================================================
// Loading
// =========================================================================

#[test]
fn test_load_document_with_state() {
    let file = write_state(
        r#"
state: merged
config:
  - type: area
    site:
      area:
        name: USA
        parentName: Global
  - type: building
    site:
      building:
        name: Building1
        parentName: Global/USA
        address: 123 Main St
        latitude: 37.338
        longitude: -121.832
  - type: floor
    site:
      floor:
        name: Floor1
        parentName: Global/USA/Building1
        rfModel: Cubes And Walled Offices
        width: 100
        length: 100
        height: 10
"#,
    );

    let state = load_state(file.path()).unwrap();
    assert_eq!(state.state, Some(Lifecycle::Merged));
    assert_eq!(state.entries.len(), 3);

    let entries = validate_entries(&state.entries).unwrap();
    let types: Vec<EntityType> = entries.iter().map(|e| e.entity_type()).collect();
    assert_eq!(
        types,
        vec![EntityType::Area, EntityType::Building, EntityType::Floor]
    );
}

#[test]
fn test_load_bare_list_of_tags() {
    let file = write_state(
        r#"
- type: tag
  tag:
    name: Floor-APs
    description: Access points on floor 1
- type: tagMember
  tagMember:
    tagName: Floor-APs
    memberType: networkdevice
    memberIds: [d1, d2]
"#,
    );

    let state = load_state(file.path()).unwrap();
    assert_eq!(state.state, None);

    let entries = validate_entries(&state.entries).unwrap();
    assert_eq!(entries[1].entity_type(), EntityType::TagMember);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_state(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("File not found"));
}

#[test]
fn test_invalid_yaml() {
    let file = write_state("config:\n  - type: area\n    site: [unclosed\n");
    let err = load_state(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid YAML"));
}

// =========================================================================
// Validation of loaded entries
// =========================================================================

#[test]
fn test_invalid_entries_reported_together() {
    let file = write_state(
        r#"
- type: building
  site:
    building:
      name: Building1
      parentName: Global/USA
      latitude: 137.0
- type: floor
  site:
    floor:
      name: Floor1
      parentName: Global/USA/Building1
      rfModel: Warehouse
"#,
    );

    let state = load_state(file.path()).unwrap();
    match validate_entries(&state.entries).unwrap_err() {
        IntentError::Validation { messages } => {
            assert_eq!(messages.len(), 2);
            assert!(messages[0].starts_with("entry 0: latitude"));
            assert!(messages[1].starts_with("entry 1: rf_model"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_unknown_field_rejected() {
    let file = write_state(
        r#"
- type: area
  site:
    area:
      name: USA
      parentName: Global
      color: blue
"#,
    );

    let state = load_state(file.path()).unwrap();
    let err = validate_entries(&state.entries).unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_FAILED");
    assert!(err.to_string().contains("color"));
}
