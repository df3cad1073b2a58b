//! Desired and current entity model.
//!
//! Both sides of a comparison are brought into the same shape: a
//! [`HierarchyPath`] naming the entity plus type-specific [`EntityFields`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use dnac_connector::ids::EntityId;
use dnac_connector::types::EntityFamily;

use crate::error::NormalizationError;

/// Kind of entity a configuration entry declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Area,
    Building,
    Floor,
    Tag,
    TagMember,
}

impl EntityType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Area => "area",
            EntityType::Building => "building",
            EntityType::Floor => "floor",
            EntityType::Tag => "tag",
            EntityType::TagMember => "tagMember",
        }
    }

    /// Check if this is a site hierarchy element.
    #[must_use]
    pub fn is_site(&self) -> bool {
        matches!(
            self,
            EntityType::Area | EntityType::Building | EntityType::Floor
        )
    }

    /// Controller family used to look the entity up.
    ///
    /// Memberships are looked up through their tag.
    #[must_use]
    pub fn lookup_family(&self) -> EntityFamily {
        if self.is_site() {
            EntityFamily::Site
        } else {
            EntityFamily::Tag
        }
    }

    /// Label used in result messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Area | EntityType::Building | EntityType::Floor => "Site",
            EntityType::Tag => "Tag",
            EntityType::TagMember => "Tag membership",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "area" => Ok(EntityType::Area),
            "building" => Ok(EntityType::Building),
            "floor" => Ok(EntityType::Floor),
            "tag" => Ok(EntityType::Tag),
            "tagmember" | "tag_member" | "tag-member" => Ok(EntityType::TagMember),
            _ => Err(format!(
                "unknown type '{s}', expected one of: area, building, floor, tag, tagMember"
            )),
        }
    }
}

/// Ordered ancestor names ending in the entity's own name.
///
/// Never empty. Tags and memberships use a single-element path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyPath(Vec<String>);

impl HierarchyPath {
    /// Build a path from segments; `None` when there are none.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// A path with no ancestors.
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// A path for `name` below the `/`-separated `parent`.
    #[must_use]
    pub fn under(parent: &str, name: &str) -> Self {
        let mut segments: Vec<String> = parent
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Recover the path from a controller `siteNameHierarchy`.
    ///
    /// The hierarchy must be exactly `name` or end with `"/" + name`.
    pub fn from_hierarchy(hierarchy: &str, name: &str) -> Result<Self, NormalizationError> {
        if hierarchy == name {
            return Ok(Self::single(name));
        }

        hierarchy
            .strip_suffix(name)
            .and_then(|rest| rest.strip_suffix('/'))
            .filter(|parent| !parent.is_empty())
            .map(|parent| Self::under(parent, name))
            .ok_or_else(|| NormalizationError::HierarchyMismatch {
                hierarchy: hierarchy.to_string(),
                name: name.to_string(),
            })
    }

    /// The entity's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// The ancestors joined with `/`, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<String> {
        match self.0.split_last() {
            Some((_, ancestors)) if !ancestors.is_empty() => Some(ancestors.join("/")),
            _ => None,
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The full `/`-separated name the controller looks sites up by.
    #[must_use]
    pub fn compose(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for HierarchyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// Floor RF propagation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RfModel {
    #[serde(rename = "CUBES AND WALLED OFFICES")]
    CubesAndWalledOffices,
    #[serde(rename = "DRYWALL OFFICE ONLY")]
    DrywallOfficeOnly,
    #[serde(rename = "FREE SPACE")]
    FreeSpace,
    #[serde(rename = "INDOOR HIGH CEILING")]
    IndoorHighCeiling,
    #[serde(rename = "OUTDOOR OPEN SPACE")]
    OutdoorOpenSpace,
}

/// Controller code and canonical name of every RF model.
pub const RF_MODEL_TABLE: [(RfModel, &str, &str); 5] = [
    (RfModel::CubesAndWalledOffices, "57057", "CUBES AND WALLED OFFICES"),
    (RfModel::DrywallOfficeOnly, "57058", "DRYWALL OFFICE ONLY"),
    (RfModel::FreeSpace, "41541500", "FREE SPACE"),
    (RfModel::IndoorHighCeiling, "57060", "INDOOR HIGH CEILING"),
    (RfModel::OutdoorOpenSpace, "57059", "OUTDOOR OPEN SPACE"),
];

impl RfModel {
    /// Controller code for this model.
    #[must_use]
    pub fn code(self) -> &'static str {
        RF_MODEL_TABLE
            .iter()
            .find(|(model, _, _)| *model == self)
            .map_or("", |(_, code, _)| code)
    }

    /// Canonical upper-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        RF_MODEL_TABLE
            .iter()
            .find(|(model, _, _)| *model == self)
            .map_or("", |(_, _, name)| name)
    }

    /// Look a model up by controller code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        RF_MODEL_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(model, _, _)| *model)
    }

    /// Look a model up by name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        RF_MODEL_TABLE
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(model, _, _)| *model)
    }
}

impl fmt::Display for RfModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-specific attributes of an entity.
///
/// Optional attributes left unset on the desired side are not compared.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityFields {
    Area,
    Building {
        address: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    },
    Floor {
        rf_model: Option<RfModel>,
        width: Option<f64>,
        length: Option<f64>,
        height: Option<f64>,
    },
    Tag {
        description: Option<String>,
    },
    TagMember {
        member_type: String,
        member_ids: Vec<String>,
        association_type: Option<String>,
    },
}

impl EntityFields {
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityFields::Area => EntityType::Area,
            EntityFields::Building { .. } => EntityType::Building,
            EntityFields::Floor { .. } => EntityType::Floor,
            EntityFields::Tag { .. } => EntityType::Tag,
            EntityFields::TagMember { .. } => EntityType::TagMember,
        }
    }

    /// Append the declared attributes to a controller body.
    fn write_into(&self, body: &mut Map<String, Value>) {
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                body.insert(key.to_string(), value);
            }
        };

        match self {
            EntityFields::Area => {}
            EntityFields::Building {
                address,
                latitude,
                longitude,
            } => {
                put("address", address.as_ref().map(|v| json!(v)));
                put("latitude", latitude.map(|v| json!(v)));
                put("longitude", longitude.map(|v| json!(v)));
            }
            EntityFields::Floor {
                rf_model,
                width,
                length,
                height,
            } => {
                put("rfModel", rf_model.map(|m| json!(m.name())));
                put("width", width.map(|v| json!(v)));
                put("length", length.map(|v| json!(v)));
                put("height", height.map(|v| json!(v)));
            }
            EntityFields::Tag { description } => {
                put("description", description.as_ref().map(|v| json!(v)));
            }
            EntityFields::TagMember {
                member_type,
                member_ids,
                association_type,
            } => {
                put("memberType", Some(json!(member_type)));
                put("memberIds", Some(json!(member_ids)));
                put(
                    "memberAssociationType",
                    association_type.as_ref().map(|v| json!(v)),
                );
            }
        }
    }
}

/// Site body in the controller's `{type, site: {<type>: {...}}}` layout.
fn site_payload(path: &HierarchyPath, fields: &EntityFields) -> Value {
    let entity_type = fields.entity_type();

    let mut body = Map::new();
    body.insert("name".to_string(), json!(path.name()));
    if let Some(parent) = path.parent() {
        body.insert("parentName".to_string(), json!(parent));
    }
    fields.write_into(&mut body);

    let mut site = Map::new();
    site.insert(entity_type.as_str().to_string(), Value::Object(body));

    json!({
        "type": entity_type.as_str(),
        "site": site,
    })
}

/// A user-declared target entity. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredSpec {
    hierarchy_path: HierarchyPath,
    fields: EntityFields,
}

impl DesiredSpec {
    #[must_use]
    pub fn new(hierarchy_path: HierarchyPath, fields: EntityFields) -> Self {
        Self {
            hierarchy_path,
            fields,
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.fields.entity_type()
    }

    #[must_use]
    pub fn hierarchy_path(&self) -> &HierarchyPath {
        &self.hierarchy_path
    }

    #[must_use]
    pub fn fields(&self) -> &EntityFields {
        &self.fields
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.hierarchy_path.name()
    }

    #[must_use]
    pub fn parent_name(&self) -> Option<String> {
        self.hierarchy_path.parent()
    }

    /// Name the controller lookup is keyed by: the full hierarchy for sites,
    /// the tag name otherwise.
    #[must_use]
    pub fn lookup_name(&self) -> String {
        if self.entity_type().is_site() {
            self.hierarchy_path.compose()
        } else {
            self.hierarchy_path.name().to_string()
        }
    }

    /// Body submitted on create and update.
    #[must_use]
    pub fn payload(&self) -> Value {
        match &self.fields {
            EntityFields::TagMember {
                member_type,
                member_ids,
                ..
            } => {
                let mut body = Map::new();
                body.insert(member_type.clone(), json!(member_ids));
                Value::Object(body)
            }
            EntityFields::Tag { .. } => {
                let mut body = Map::new();
                body.insert("name".to_string(), json!(self.name()));
                self.fields.write_into(&mut body);
                Value::Object(body)
            }
            _ => site_payload(&self.hierarchy_path, &self.fields),
        }
    }
}

/// An entity as the controller currently has it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingEntity {
    /// Stable controller id.
    pub id: EntityId,
    pub hierarchy_path: HierarchyPath,
    pub fields: EntityFields,
    /// The record the controller returned.
    pub raw: Value,
}

impl ExistingEntity {
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.fields.entity_type()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.hierarchy_path.name()
    }

    /// The normalized view reported when nothing needs to change.
    #[must_use]
    pub fn normalized(&self) -> Value {
        if self.entity_type().is_site() {
            let mut view = site_payload(&self.hierarchy_path, &self.fields);
            if let Value::Object(ref mut map) = view {
                map.insert("siteId".to_string(), json!(self.id.as_str()));
            }
            view
        } else {
            let mut body = Map::new();
            body.insert("id".to_string(), json!(self.id.as_str()));
            body.insert("name".to_string(), json!(self.name()));
            self.fields.write_into(&mut body);
            Value::Object(body)
        }
    }
}

/// What the controller has for a desired entity.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentState {
    Absent,
    Present(ExistingEntity),
}

impl CurrentState {
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, CurrentState::Present(_))
    }

    #[must_use]
    pub fn as_present(&self) -> Option<&ExistingEntity> {
        match self {
            CurrentState::Present(entity) => Some(entity),
            CurrentState::Absent => None,
        }
    }
}
