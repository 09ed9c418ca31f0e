//! Exchange models for the composite-attribute engine
//!
//! These are the shapes the engine hands to and receives from its
//! callers (route handlers, batch jobs). Row extraction lives next to
//! the services that run the queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gemelo_common::{Datatype, TypedValue};

/// A registered attribute identifier (coordinate or measure definition)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIdentifier {
    pub id: i64,
    pub name: String,
    pub unit: Option<String>,
    pub datatype: Datatype,
}

/// A schema row without its identifier list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A schema with its resolved identifiers in canonical order
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDetails {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub identifiers: Vec<AttributeIdentifier>,
}

impl SchemaDetails {
    /// Look up one of the schema's identifiers by attribute name
    pub fn identifier(&self, name: &str) -> Option<&AttributeIdentifier> {
        self.identifiers.iter().find(|i| i.name == name)
    }
}

/// One reconstructed composite row: the entity id plus one typed value
/// per schema attribute
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositeRecord {
    pub id: i64,
    #[serde(flatten)]
    pub values: HashMap<String, TypedValue>,
}

impl CompositeRecord {
    pub fn value(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }
}

/// An inline identifier declaration with its value, used by the
/// auto-schema insert flow
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValueSpec {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub datatype: Datatype,
    pub value: TypedValue,
}

/// A readings subject (sensor, model run) with its declared schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub schema_id: i64,
}

/// One time-series point
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPoint {
    pub value: TypedValue,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_record_serializes_flat() {
        let mut values = HashMap::new();
        values.insert("latitude".to_string(), TypedValue::Float(-2.0));
        let record = CompositeRecord { id: 7, values };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("\"latitude\":-2.0"));
    }

    #[test]
    fn test_attribute_identifier_serializes_camel_case() {
        let identifier = AttributeIdentifier {
            id: 1,
            name: "temperature".to_string(),
            unit: Some("celsius".to_string()),
            datatype: Datatype::Float,
        };
        let json = serde_json::to_string(&identifier).unwrap();
        assert!(json.contains("\"datatype\":\"float\""));
        assert!(json.contains("\"unit\":\"celsius\""));
    }

    #[test]
    fn test_attribute_value_spec_parses_without_unit() {
        let spec: AttributeValueSpec =
            serde_json::from_str(r#"{"name":"latitude","datatype":"float","value":-2.0}"#).unwrap();
        assert_eq!(spec.unit, None);
        assert_eq!(spec.value, TypedValue::Float(-2.0));
    }

    #[test]
    fn test_schema_details_identifier_lookup() {
        let schema = SchemaDetails {
            id: 1,
            name: "latlong".to_string(),
            description: None,
            identifiers: vec![AttributeIdentifier {
                id: 2,
                name: "latitude".to_string(),
                unit: None,
                datatype: Datatype::Float,
            }],
        };
        assert!(schema.identifier("latitude").is_some());
        assert!(schema.identifier("longitude").is_none());
    }
}
