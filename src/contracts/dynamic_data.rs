//! Dynamic data - typed key/value attributes on entities
//!
//! Extends the entity schema without migrations. At the API boundary the
//! value is a tagged union (`FieldValue`); at the persistence boundary it
//! flattens to one nullable column per type with `field_type` naming the
//! authoritative slot. Conversion is checked both ways: a row whose
//! populated slot disagrees with `field_type` is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::smart_code::SmartCode;
use crate::types::{HeraError, Result};

/// Typed attribute value, tagged by field type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Json(serde_json::Value),
    /// Stored as a URL to the uploaded file
    File(String),
}

impl FieldValue {
    /// The `field_type` discriminator this value flattens to
    pub fn field_type(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Json(_) => "json",
            FieldValue::File(_) => "file",
        }
    }
}

/// A dynamic attribute attached to exactly one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicData {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Owning entity
    pub entity_id: Uuid,
    /// Attribute name, unique per entity by convention
    pub field_name: String,
    /// The typed value
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    /// Edge-validated rules blob, never destructured by the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_required: bool,
    /// Display ordering among an entity's fields
    #[serde(default)]
    pub field_order: i32,
}

/// Flat multi-column row shape used at the persistence boundary
///
/// Exactly one `field_value_*` column is populated, determined by
/// `field_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynamicDataRow {
    pub id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub field_name: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_json: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub field_order: i32,
}

impl DynamicData {
    /// Flatten to the persistence row, populating exactly one value slot
    pub fn to_row(&self) -> DynamicDataRow {
        let mut row = DynamicDataRow {
            id: Some(self.id),
            organization_id: Some(self.organization_id),
            entity_id: Some(self.entity_id),
            field_name: self.field_name.clone(),
            field_type: self.value.field_type().to_string(),
            smart_code: self.smart_code.clone(),
            validation_rules: self.validation_rules.clone(),
            is_searchable: self.is_searchable,
            is_required: self.is_required,
            field_order: self.field_order,
            ..Default::default()
        };

        match &self.value {
            FieldValue::Text(v) => row.field_value_text = Some(v.clone()),
            FieldValue::Number(v) => row.field_value_number = Some(*v),
            FieldValue::Boolean(v) => row.field_value_boolean = Some(*v),
            FieldValue::Date(v) => row.field_value_date = Some(*v),
            FieldValue::Json(v) => row.field_value_json = Some(v.clone()),
            FieldValue::File(v) => row.field_value_file_url = Some(v.clone()),
        }

        row
    }

    /// Reconstruct from a persistence row, enforcing the one-slot invariant
    pub fn from_row(row: DynamicDataRow) -> Result<Self> {
        let value = match row.field_type.as_str() {
            "text" => row.field_value_text.map(FieldValue::Text),
            "number" => row.field_value_number.map(FieldValue::Number),
            "boolean" => row.field_value_boolean.map(FieldValue::Boolean),
            "date" => row.field_value_date.map(FieldValue::Date),
            "json" => row.field_value_json.map(FieldValue::Json),
            "file" => row.field_value_file_url.map(FieldValue::File),
            other => {
                return Err(HeraError::DynamicData(format!(
                    "unknown field_type {other:?} for field {}",
                    row.field_name
                )))
            }
        };

        let value = value.ok_or_else(|| {
            HeraError::DynamicData(format!(
                "field {} declares type {} but that value slot is empty",
                row.field_name, row.field_type
            ))
        })?;

        Ok(Self {
            id: row.id.unwrap_or_else(Uuid::new_v4),
            organization_id: row.organization_id.unwrap_or_default(),
            entity_id: row.entity_id.unwrap_or_default(),
            field_name: row.field_name,
            value,
            smart_code: row.smart_code,
            validation_rules: row.validation_rules,
            is_searchable: row.is_searchable,
            is_required: row.is_required,
            field_order: row.field_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(value: FieldValue) -> DynamicData {
        DynamicData {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            entity_id: Uuid::new_v4(),
            field_name: "test_field".to_string(),
            value,
            smart_code: None,
            validation_rules: None,
            is_searchable: false,
            is_required: false,
            field_order: 0,
        }
    }

    #[test]
    fn number_populates_only_its_slot() {
        let row = field(FieldValue::Number(42.0)).to_row();
        assert_eq!(row.field_type, "number");
        assert_eq!(row.field_value_number, Some(42.0));
        assert!(row.field_value_text.is_none());
        assert!(row.field_value_boolean.is_none());
        assert!(row.field_value_date.is_none());
        assert!(row.field_value_json.is_none());
        assert!(row.field_value_file_url.is_none());

        let back = DynamicData::from_row(row).unwrap();
        assert_eq!(back.value, FieldValue::Number(42.0));
    }

    #[test]
    fn every_variant_round_trips() {
        let values = vec![
            FieldValue::Text("hello".to_string()),
            FieldValue::Number(1.5),
            FieldValue::Boolean(true),
            FieldValue::Date(Utc::now()),
            FieldValue::Json(serde_json::json!({"nested": [1, 2]})),
            FieldValue::File("https://cdn.example/receipt.pdf".to_string()),
        ];

        for value in values {
            let original = field(value.clone());
            let back = DynamicData::from_row(original.to_row()).unwrap();
            assert_eq!(back.value, value);
        }
    }

    #[test]
    fn rejects_type_slot_mismatch() {
        let row = DynamicDataRow {
            field_name: "rating".to_string(),
            field_type: "number".to_string(),
            field_value_text: Some("not a number".to_string()),
            ..Default::default()
        };
        assert!(DynamicData::from_row(row).is_err());
    }

    #[test]
    fn rejects_unknown_field_type() {
        let row = DynamicDataRow {
            field_name: "rating".to_string(),
            field_type: "decimal".to_string(),
            field_value_number: Some(3.0),
            ..Default::default()
        };
        assert!(DynamicData::from_row(row).is_err());
    }

    #[test]
    fn tagged_union_serializes_with_type_tag() {
        let json = serde_json::to_value(FieldValue::Boolean(true)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "boolean", "value": true}));
    }
}
