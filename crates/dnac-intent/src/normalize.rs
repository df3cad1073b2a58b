//! Bring controller records and configuration entries into comparable form.

use serde_json::Value;

use dnac_connector::ids::EntityId;
use dnac_connector::types::EntityFamily;

use crate::error::NormalizationError;
use crate::model::{DesiredSpec, EntityFields, EntityType, ExistingEntity, HierarchyPath, RfModel};
use crate::validate::ValidatedEntry;

const LOCATION: &str = "Location";
const MAP_GEOMETRY: &str = "mapGeometry";
const MAPS_SUMMARY: &str = "mapsSummary";

/// Normalize a record returned by a lookup of `family`.
pub fn normalize_current(
    family: EntityFamily,
    raw: &Value,
) -> Result<ExistingEntity, NormalizationError> {
    match family {
        EntityFamily::Site => normalize_site(raw),
        EntityFamily::Tag | EntityFamily::TagMember => normalize_tag(raw),
    }
}

/// Build the desired spec for a validated entry.
///
/// The floor RF model is resolved to its canonical upper-case name.
#[must_use]
pub fn normalize_desired(entry: &ValidatedEntry) -> DesiredSpec {
    match entry {
        ValidatedEntry::Area(area) => DesiredSpec::new(
            HierarchyPath::under(&area.parent_name, &area.name),
            EntityFields::Area,
        ),
        ValidatedEntry::Building(building) => DesiredSpec::new(
            HierarchyPath::under(&building.parent_name, &building.name),
            EntityFields::Building {
                address: building.address.clone(),
                latitude: building.latitude,
                longitude: building.longitude,
            },
        ),
        ValidatedEntry::Floor(floor) => DesiredSpec::new(
            HierarchyPath::under(&floor.parent_name, &floor.name),
            EntityFields::Floor {
                rf_model: RfModel::from_name(&floor.rf_model),
                width: floor.width,
                length: floor.length,
                height: floor.height,
            },
        ),
        ValidatedEntry::Tag(tag) => DesiredSpec::new(
            HierarchyPath::single(&tag.name),
            EntityFields::Tag {
                description: tag.description.clone(),
            },
        ),
        ValidatedEntry::TagMember(member) => DesiredSpec::new(
            HierarchyPath::single(&member.tag_name),
            EntityFields::TagMember {
                member_type: member.member_type.clone(),
                member_ids: member.member_ids.clone(),
                association_type: member
                    .member_association_type
                    .map(|a| a.as_str().to_string()),
            },
        ),
    }
}

fn normalize_site(raw: &Value) -> Result<ExistingEntity, NormalizationError> {
    let id = required_str(raw, "id")?;
    let name = required_str(raw, "name")?;
    let hierarchy = required_str(raw, "siteNameHierarchy")?;
    let hierarchy_path = HierarchyPath::from_hierarchy(hierarchy, name)?;

    let location = namespace_attributes(raw, LOCATION)?;
    let site_type = location
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("Location.type"))?;

    let fields = match site_type.parse::<EntityType>() {
        Ok(EntityType::Area) => EntityFields::Area,
        Ok(EntityType::Building) => EntityFields::Building {
            address: location
                .get("address")
                .and_then(Value::as_str)
                .map(str::to_string),
            latitude: optional_number(location, "latitude")?,
            longitude: optional_number(location, "longitude")?,
        },
        Ok(EntityType::Floor) => {
            let geometry = namespace_attributes(raw, MAP_GEOMETRY)?;
            let summary = namespace_attributes(raw, MAPS_SUMMARY)?;
            let code = match summary.get("rfModel") {
                Some(Value::String(code)) => code.clone(),
                Some(Value::Number(code)) => code.to_string(),
                _ => return Err(missing("mapsSummary.rfModel")),
            };
            let rf_model = RfModel::from_code(&code)
                .ok_or(NormalizationError::UnknownRfModel { code })?;

            EntityFields::Floor {
                rf_model: Some(rf_model),
                width: optional_number(geometry, "width")?,
                length: optional_number(geometry, "length")?,
                height: optional_number(geometry, "height")?,
            }
        }
        _ => {
            return Err(NormalizationError::UnknownSiteType {
                value: site_type.to_string(),
            })
        }
    };

    Ok(ExistingEntity {
        id: EntityId::new(id),
        hierarchy_path,
        fields,
        raw: raw.clone(),
    })
}

fn normalize_tag(raw: &Value) -> Result<ExistingEntity, NormalizationError> {
    let id = required_str(raw, "id")?;
    let name = required_str(raw, "name")?;

    Ok(ExistingEntity {
        id: EntityId::new(id),
        hierarchy_path: HierarchyPath::single(name),
        fields: EntityFields::Tag {
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        raw: raw.clone(),
    })
}

fn missing(field: &str) -> NormalizationError {
    NormalizationError::MissingField {
        field: field.to_string(),
    }
}

fn required_str<'a>(raw: &'a Value, field: &str) -> Result<&'a str, NormalizationError> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(field))
}

/// `attributes` of the `additionalInfo` entry whose `nameSpace` matches.
fn namespace_attributes<'a>(
    raw: &'a Value,
    namespace: &str,
) -> Result<&'a Value, NormalizationError> {
    raw.get("additionalInfo")
        .and_then(Value::as_array)
        .and_then(|sections| {
            sections
                .iter()
                .find(|s| s.get("nameSpace").and_then(Value::as_str) == Some(namespace))
        })
        .and_then(|section| section.get("attributes"))
        .ok_or_else(|| NormalizationError::MissingNamespace {
            namespace: namespace.to_string(),
        })
}

/// A number the controller may report either as JSON number or as string.
fn optional_number(attributes: &Value, field: &str) -> Result<Option<f64>, NormalizationError> {
    match attributes.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            s.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| NormalizationError::NotNumeric {
                    field: field.to_string(),
                    value: s.clone(),
                })
        }
        Some(other) => Err(NormalizationError::NotNumeric {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}
