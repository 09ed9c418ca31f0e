//! Error types for Gemelo
//!
//! This module defines:
//! - `GemeloError`: Application-specific error enum shared by all services
//!
//! Services return `anyhow::Result` and wrap one of these variants; HTTP
//! adapters downcast to map each kind to a response status.

use crate::value::Datatype;

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum GemeloError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("unrecognized datatype '{0}'")]
    InvalidDatatype(String),

    #[error("identifier '{0}' not exist")]
    IdentifierNotFound(String),

    #[error("identifier name '{0}' matches more than one identifier")]
    IdentifierAmbiguous(String),

    #[error("identifier '{name}' already exist")]
    IdentifierAlreadyExists { name: String, unit: Option<String> },

    #[error("identifier '{identifier}' is still used by schema '{schema}'")]
    IdentifierInUse { identifier: String, schema: String },

    #[error("schema '{0}' not exist")]
    SchemaNotFound(String),

    #[error("schema '{0}' already exist")]
    SchemaAlreadyExists(String),

    #[error("schema '{schema}' is still referenced by {dependents} rows")]
    SchemaInUse { schema: String, dependents: i64 },

    #[error("schema '{schema}' attribute set differs: missing {missing:?}, unexpected {unexpected:?}")]
    AttributeSetMismatch {
        schema: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("attribute '{attribute}' expects a {expected} value, got {actual}")]
    DatatypeMismatch {
        attribute: String,
        expected: Datatype,
        actual: Datatype,
    },

    #[error("attribute '{attribute}' does not belong to schema '{schema}'")]
    UnknownAttribute { schema: String, attribute: String },

    #[error("an entity with these attribute values already exist in schema '{0}'")]
    EntityAlreadyExists(String),

    #[error("no entity matches these attribute values in schema '{0}'")]
    EntityNotFound(String),

    #[error("{count} entities match these attribute values in schema '{schema}'")]
    EntityNotUnique { schema: String, count: usize },

    #[error("entity {entity} already has a value for attribute '{attribute}'")]
    ValueAlreadyExists { entity: i64, attribute: String },

    #[error("subject {0} not exist")]
    SubjectNotFound(i64),

    #[error("subject '{0}' already exist")]
    SubjectAlreadyExists(String),

    #[error("measure '{measure}' is not declared for subject {subject}")]
    InvalidMeasure { subject: i64, measure: String },

    #[error("got {values} values and {timestamps} timestamps")]
    LengthMismatch { values: usize, timestamps: usize },

    #[error("a reading for this subject, measure and timestamp already exist")]
    ReadingAlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = GemeloError::SchemaNotFound("latlong".to_string());
        assert_eq!(err.to_string(), "schema 'latlong' not exist");

        let err = GemeloError::DatatypeMismatch {
            attribute: "latitude".to_string(),
            expected: Datatype::Float,
            actual: Datatype::String,
        };
        assert!(err.to_string().contains("latitude"));
        assert!(err.to_string().contains("float"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_attribute_set_mismatch_reports_both_sides() {
        let err = GemeloError::AttributeSetMismatch {
            schema: "latlong".to_string(),
            missing: vec!["longitude".to_string()],
            unexpected: vec!["altitude".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("longitude"));
        assert!(message.contains("altitude"));
    }
}
