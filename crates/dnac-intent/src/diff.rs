//! Field-by-field comparison of current and desired state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::DiffError;
use crate::model::{DesiredSpec, EntityFields, ExistingEntity};

/// Comparison settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiffOptions {
    /// Absolute tolerance for coordinates and dimensions (default: exact).
    #[serde(default)]
    pub tolerance: f64,
}

impl DiffOptions {
    /// Set the numeric tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }
}

/// One field whose current value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub current: Value,
    pub desired: Value,
}

/// Outcome of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Diff {
    pub changed: bool,
    pub changed_fields: Vec<FieldChange>,
}

impl Diff {
    #[must_use]
    pub fn from_changes(changed_fields: Vec<FieldChange>) -> Self {
        Self {
            changed: !changed_fields.is_empty(),
            changed_fields,
        }
    }

    /// Names of the changed fields, in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.changed_fields.iter().map(|c| c.field.as_str()).collect()
    }
}

struct Collector<'a> {
    options: &'a DiffOptions,
    changes: Vec<FieldChange>,
}

impl Collector<'_> {
    fn push(&mut self, field: &str, current: Value, desired: Value) {
        self.changes.push(FieldChange {
            field: field.to_string(),
            current,
            desired,
        });
    }

    fn text(&mut self, field: &str, current: Option<&str>, desired: Option<&str>) {
        let Some(desired) = desired else { return };
        if current != Some(desired) {
            self.push(field, json!(current), json!(desired));
        }
    }

    fn number(&mut self, field: &str, current: Option<f64>, desired: Option<f64>) {
        let Some(desired) = desired else { return };
        let same = current.is_some_and(|c| (c - desired).abs() <= self.options.tolerance);
        if !same {
            self.push(field, json!(current), json!(desired));
        }
    }

    fn value(&mut self, field: &str, current: Value, desired: Value) {
        if current != desired {
            self.push(field, current, desired);
        }
    }
}

/// Compare an existing entity with its desired spec.
///
/// Name and parent are always compared; other attributes only when the
/// desired spec declares them.
pub fn diff(
    current: &ExistingEntity,
    desired: &DesiredSpec,
    options: &DiffOptions,
) -> Result<Diff, DiffError> {
    if current.entity_type() != desired.entity_type() {
        return Err(DiffError::EntityTypeMismatch {
            name: desired.lookup_name(),
            current: current.entity_type(),
            desired: desired.entity_type(),
        });
    }

    let mut collector = Collector {
        options,
        changes: Vec::new(),
    };

    collector.value("name", json!(current.name()), json!(desired.name()));
    collector.value(
        "parentName",
        json!(current.hierarchy_path.parent()),
        json!(desired.parent_name()),
    );

    match (&current.fields, desired.fields()) {
        (
            EntityFields::Building {
                address: current_address,
                latitude: current_latitude,
                longitude: current_longitude,
            },
            EntityFields::Building {
                address,
                latitude,
                longitude,
            },
        ) => {
            collector.text("address", current_address.as_deref(), address.as_deref());
            collector.number("latitude", *current_latitude, *latitude);
            collector.number("longitude", *current_longitude, *longitude);
        }
        (
            EntityFields::Floor {
                rf_model: current_rf_model,
                width: current_width,
                length: current_length,
                height: current_height,
            },
            EntityFields::Floor {
                rf_model,
                width,
                length,
                height,
            },
        ) => {
            if let Some(rf_model) = rf_model {
                collector.value(
                    "rfModel",
                    json!(current_rf_model.map(|m| m.name())),
                    json!(rf_model.name()),
                );
            }
            collector.number("width", *current_width, *width);
            collector.number("length", *current_length, *length);
            collector.number("height", *current_height, *height);
        }
        (
            EntityFields::Tag {
                description: current_description,
            },
            EntityFields::Tag { description },
        ) => {
            collector.text(
                "description",
                current_description.as_deref(),
                description.as_deref(),
            );
        }
        (current_fields, desired_fields) => {
            collector.value(
                "fields",
                json!(format!("{current_fields:?}")),
                json!(format!("{desired_fields:?}")),
            );
        }
    }

    Ok(Diff::from_changes(collector.changes))
}
