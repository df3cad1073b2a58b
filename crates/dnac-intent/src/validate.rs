//! Configuration entry validation.
//!
//! Every entry of a configuration list is checked before anything is sent to
//! the controller. Problems are collected across all entries so the caller
//! sees the full list at once.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{IntentError, IntentResult};
use crate::model::{EntityType, RfModel};

/// `site.area` section.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaParams {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub parent_name: String,
}

/// `site.building` section.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildingParams {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub parent_name: String,

    pub address: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

/// `site.floor` section.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FloorParams {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub parent_name: String,

    #[validate(custom(function = "validate_rf_model"))]
    pub rf_model: String,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub width: Option<f64>,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub length: Option<f64>,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub height: Option<f64>,
}

/// `tag` section.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagParams {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// How a member is associated with a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberAssociation {
    Static,
    Dynamic,
    Mixed,
}

impl MemberAssociation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAssociation::Static => "STATIC",
            MemberAssociation::Dynamic => "DYNAMIC",
            MemberAssociation::Mixed => "MIXED",
        }
    }
}

/// `tagMember` section.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagMemberParams {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub tag_name: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub member_type: String,

    #[validate(
        length(min = 1, message = "must list at least one member"),
        custom(function = "validate_member_ids")
    )]
    pub member_ids: Vec<String>,

    pub member_association_type: Option<MemberAssociation>,
}

fn validate_rf_model(rf_model: &str) -> Result<(), ValidationError> {
    if RfModel::from_name(rf_model).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_rf_model");
        err.message = Some(
            "must be one of 'Cubes And Walled Offices', 'Drywall Office Only', 'Free Space', \
             'Indoor High Ceiling', 'Outdoor Open Space'"
                .into(),
        );
        Err(err)
    }
}

fn validate_member_ids(member_ids: &[String]) -> Result<(), ValidationError> {
    if member_ids.iter().all(|id| !id.trim().is_empty()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("blank_member_id");
        err.message = Some("member ids must not be blank".into());
        Err(err)
    }
}

/// A configuration entry that passed validation.
#[derive(Debug, Clone)]
pub enum ValidatedEntry {
    Area(AreaParams),
    Building(BuildingParams),
    Floor(FloorParams),
    Tag(TagParams),
    TagMember(TagMemberParams),
}

impl ValidatedEntry {
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match self {
            ValidatedEntry::Area(_) => EntityType::Area,
            ValidatedEntry::Building(_) => EntityType::Building,
            ValidatedEntry::Floor(_) => EntityType::Floor,
            ValidatedEntry::Tag(_) => EntityType::Tag,
            ValidatedEntry::TagMember(_) => EntityType::TagMember,
        }
    }
}

/// Validate a configuration list.
///
/// Returns the typed entries in order, or every problem found, each prefixed
/// with the entry's index.
pub fn validate_entries(raw: &[Value]) -> IntentResult<Vec<ValidatedEntry>> {
    if raw.is_empty() {
        return Err(IntentError::validation(vec![
            "config must list at least one entry".to_string(),
        ]));
    }

    let mut entries = Vec::with_capacity(raw.len());
    let mut messages = Vec::new();

    for (index, value) in raw.iter().enumerate() {
        match validate_entry(value) {
            Ok(entry) => entries.push(entry),
            Err(problems) => messages.extend(
                problems
                    .into_iter()
                    .map(|problem| format!("entry {index}: {problem}")),
            ),
        }
    }

    if messages.is_empty() {
        Ok(entries)
    } else {
        Err(IntentError::validation(messages))
    }
}

/// Validate one entry.
pub fn validate_entry(value: &Value) -> Result<ValidatedEntry, Vec<String>> {
    let object = value
        .as_object()
        .ok_or_else(|| vec!["entry must be a mapping".to_string()])?;

    let entity_type: EntityType = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| vec!["'type' is required".to_string()])?
        .parse()
        .map_err(|e: String| vec![e])?;

    match entity_type {
        EntityType::Area => parse(site_section(object, entity_type)?).map(ValidatedEntry::Area),
        EntityType::Building => {
            parse(site_section(object, entity_type)?).map(ValidatedEntry::Building)
        }
        EntityType::Floor => parse(site_section(object, entity_type)?).map(ValidatedEntry::Floor),
        EntityType::Tag => parse(section(object, "tag")?).map(ValidatedEntry::Tag),
        EntityType::TagMember => {
            parse(section(object, "tagMember")?).map(ValidatedEntry::TagMember)
        }
    }
}

fn site_section(object: &Map<String, Value>, entity_type: EntityType) -> Result<&Value, Vec<String>> {
    let key = entity_type.as_str();
    object
        .get("site")
        .and_then(|site| site.get(key))
        .ok_or_else(|| vec![format!("'site.{key}' is required for type '{key}'")])
}

fn section<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Value, Vec<String>> {
    object
        .get(key)
        .ok_or_else(|| vec![format!("'{key}' is required for type '{key}'")])
}

fn parse<T>(value: &Value) -> Result<T, Vec<String>>
where
    T: DeserializeOwned + Validate,
{
    let params: T = serde_json::from_value(value.clone()).map_err(|e| vec![e.to_string()])?;
    params.validate().map_err(|errors| describe(&errors))?;
    Ok(params)
}

fn describe(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid value ({})", e.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn building() -> Value {
        json!({
            "type": "building",
            "site": {
                "building": {
                    "name": "Building1",
                    "parentName": "Global/USA",
                    "address": "123 Main St",
                    "latitude": 37.338,
                    "longitude": -121.832
                }
            }
        })
    }

    #[test]
    fn test_valid_building() {
        let entries = validate_entries(&[building()]).unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            ValidatedEntry::Building(params) => {
                assert_eq!(params.name, "Building1");
                assert_eq!(params.latitude, Some(37.338));
            }
            other => panic!("expected building, got {other:?}"),
        }
    }

    #[test]
    fn test_all_problems_are_reported() {
        let raw = vec![
            building(),
            json!({"type": "campus", "site": {}}),
            json!({
                "type": "floor",
                "site": {"floor": {"name": "", "parentName": "Global", "rfModel": "Basement"}}
            }),
        ];

        let err = validate_entries(&raw).unwrap_err();
        let IntentError::Validation { messages } = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 3, "{messages:?}");
        assert!(messages[0].starts_with("entry 1: unknown type 'campus'"));
        assert!(messages.iter().any(|m| m.starts_with("entry 2: name")));
        assert!(messages.iter().any(|m| m.starts_with("entry 2: rf_model")));
    }

    #[test]
    fn test_missing_section_and_type() {
        let err = validate_entry(&json!({"type": "area"})).unwrap_err();
        assert_eq!(err, vec!["'site.area' is required for type 'area'"]);

        let err = validate_entry(&json!({"site": {}})).unwrap_err();
        assert_eq!(err, vec!["'type' is required"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = validate_entry(&json!({
            "type": "area",
            "site": {"area": {"name": "USA", "parentName": "Global", "colour": "red"}}
        }))
        .unwrap_err();
        assert!(err[0].contains("colour"));
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let err = validate_entry(&json!({
            "type": "building",
            "site": {"building": {"name": "B", "parentName": "Global", "latitude": 91.0}}
        }))
        .unwrap_err();
        assert_eq!(err, vec!["latitude: must be between -90 and 90"]);
    }

    #[test]
    fn test_rf_model_case_insensitive() {
        let entry = validate_entry(&json!({
            "type": "floor",
            "site": {"floor": {"name": "F1", "parentName": "Global/B", "rfModel": "free space"}}
        }));
        assert!(entry.is_ok());
    }

    #[test]
    fn test_tag_member_entry() {
        let entry = validate_entry(&json!({
            "type": "tagMember",
            "tagMember": {
                "tagName": "Floor-APs",
                "memberType": "networkdevice",
                "memberIds": ["d1", "d2"],
                "memberAssociationType": "STATIC"
            }
        }))
        .unwrap();
        assert_eq!(entry.entity_type(), EntityType::TagMember);

        let err = validate_entry(&json!({
            "type": "tagMember",
            "tagMember": {"tagName": "Floor-APs", "memberType": "networkdevice", "memberIds": []}
        }))
        .unwrap_err();
        assert_eq!(err, vec!["member_ids: must list at least one member"]);
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(matches!(
            validate_entries(&[]),
            Err(IntentError::Validation { .. })
        ));
    }
}
