//! Domain definitions and physical table identifiers
//!
//! Each domain (locations, sensor measures, model measures) owns its own
//! copy of the typed composite-attribute tables, distinguished by a
//! table-name prefix. `DomainDef` derives every physical identifier from
//! that prefix, so the engine is written once and instantiated per domain
//! instead of once per table set.

use sea_orm::DeriveIden;
use sea_orm::sea_query::Alias;

use gemelo_common::Datatype;

/// A storage domain: table-name prefix plus the storage flavor it uses
///
/// Composite-entity domains store one row per entity across the value
/// partitions; readings domains store (subject, measure, timestamp) rows
/// across the reading partitions. Both flavors share the identifier and
/// schema tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomainDef {
    prefix: &'static str,
    composite_entities: bool,
    readings: bool,
}

/// Physical locations identified by named typed coordinates
pub const LOCATIONS: DomainDef = DomainDef {
    prefix: "location",
    composite_entities: true,
    readings: false,
};

/// Sensor measures and their time-series readings
pub const SENSORS: DomainDef = DomainDef {
    prefix: "sensor",
    composite_entities: false,
    readings: true,
};

/// Model measures and model-run products
pub const MODELS: DomainDef = DomainDef {
    prefix: "model",
    composite_entities: false,
    readings: true,
};

impl DomainDef {
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn has_composite_entities(&self) -> bool {
        self.composite_entities
    }

    pub fn has_readings(&self) -> bool {
        self.readings
    }

    /// `{prefix}_identifier` - registered attribute identifiers
    pub fn identifier_table(&self) -> Alias {
        self.table("identifier")
    }

    /// `{prefix}_schema` - named identifier sets
    pub fn schema_table(&self) -> Alias {
        self.table("schema")
    }

    /// `{prefix}_schema_identifier` - schema membership rows
    pub fn schema_identifier_table(&self) -> Alias {
        self.table("schema_identifier")
    }

    /// `{prefix}_entity` - composite entity rows
    pub fn entity_table(&self) -> Alias {
        self.table("entity")
    }

    /// `{prefix}_subject` - readings subjects (sensors, model runs)
    pub fn subject_table(&self) -> Alias {
        self.table("subject")
    }

    /// `{prefix}_value_{datatype}` - the value partition for one datatype
    pub fn value_table(&self, datatype: Datatype) -> Alias {
        self.table(&format!("value_{}", datatype.as_str()))
    }

    /// `{prefix}_reading_{datatype}` - the reading partition for one datatype
    pub fn reading_table(&self, datatype: Datatype) -> Alias {
        self.table(&format!("reading_{}", datatype.as_str()))
    }

    fn table(&self, suffix: &str) -> Alias {
        Alias::new(format!("{}_{}", self.prefix, suffix))
    }
}

/// Columns of `{prefix}_identifier`
#[derive(DeriveIden)]
pub enum IdentifierCol {
    Id,
    Name,
    Unit,
    Datatype,
    CreatedAt,
}

/// Columns of `{prefix}_schema`
#[derive(DeriveIden)]
pub enum SchemaCol {
    Id,
    Name,
    Description,
    CreatedAt,
}

/// Columns of `{prefix}_schema_identifier`
#[derive(DeriveIden)]
pub enum SchemaIdentifierCol {
    Id,
    SchemaId,
    IdentifierId,
    Ordinal,
}

/// Columns of `{prefix}_entity`
#[derive(DeriveIden)]
pub enum EntityCol {
    Id,
    SchemaId,
}

/// Columns of `{prefix}_subject`
#[derive(DeriveIden)]
pub enum SubjectCol {
    Id,
    Name,
    SchemaId,
    CreatedAt,
}

/// Columns of the four `{prefix}_value_*` partitions
#[derive(DeriveIden)]
pub enum ValueCol {
    Id,
    EntityId,
    IdentifierId,
    Value,
}

/// Columns of the four `{prefix}_reading_*` partitions
#[derive(DeriveIden)]
pub enum ReadingCol {
    Id,
    SubjectId,
    IdentifierId,
    Ts,
    Value,
}

#[cfg(test)]
mod tests {
    use sea_orm::sea_query::Iden;

    use super::*;

    #[test]
    fn test_table_names_carry_the_domain_prefix() {
        assert_eq!(LOCATIONS.entity_table().to_string(), "location_entity");
        assert_eq!(
            SENSORS.reading_table(Datatype::Float).to_string(),
            "sensor_reading_float"
        );
        assert_eq!(
            MODELS.value_table(Datatype::Boolean).to_string(),
            "model_value_boolean"
        );
        assert_eq!(
            LOCATIONS.schema_identifier_table().to_string(),
            "location_schema_identifier"
        );
    }

    #[test]
    fn test_domain_flavors() {
        assert!(LOCATIONS.has_composite_entities());
        assert!(!LOCATIONS.has_readings());
        assert!(SENSORS.has_readings());
        assert!(!SENSORS.has_composite_entities());
        assert!(MODELS.has_readings());
    }

    #[test]
    fn test_column_idents_are_snake_case() {
        assert_eq!(IdentifierCol::CreatedAt.to_string(), "created_at");
        assert_eq!(ValueCol::EntityId.to_string(), "entity_id");
        assert_eq!(ReadingCol::Ts.to_string(), "ts");
    }
}
