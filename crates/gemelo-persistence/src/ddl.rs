//! DDL builders for the per-domain table layout
//!
//! The composite pattern is seven tables: identifiers, schemas, schema
//! membership, entities, and one value partition per primitive datatype.
//! Readings domains swap the entity side for subjects plus one reading
//! partition per datatype. Statements are built against the domain's
//! runtime table names and applied by the migration crate.

use sea_orm::sea_query::{
    ColumnDef, ForeignKey, Index, IndexCreateStatement, IntoIden, Table, TableCreateStatement,
    TableDropStatement,
};

use gemelo_common::Datatype;

use crate::domain::{
    DomainDef, EntityCol, IdentifierCol, ReadingCol, SchemaCol, SchemaIdentifierCol, SubjectCol,
    ValueCol,
};

/// Everything a domain needs created, tables first
pub struct DomainDdl {
    pub tables: Vec<TableCreateStatement>,
    pub indexes: Vec<IndexCreateStatement>,
}

/// Build the create statements for one domain
pub fn create_statements(domain: &DomainDef) -> DomainDdl {
    let mut tables = vec![
        identifier_table(domain),
        schema_table(domain),
        schema_identifier_table(domain),
    ];
    let mut indexes = vec![
        unique_identifier_index(domain),
        unique_schema_index(domain),
        unique_membership_index(domain),
    ];

    if domain.has_composite_entities() {
        tables.push(entity_table(domain));
        for datatype in Datatype::ALL {
            tables.push(value_table(domain, datatype));
            indexes.push(unique_value_index(domain, datatype));
        }
    }

    if domain.has_readings() {
        tables.push(subject_table(domain));
        indexes.push(unique_subject_index(domain));
        for datatype in Datatype::ALL {
            tables.push(reading_table(domain, datatype));
            indexes.push(unique_reading_index(domain, datatype));
        }
    }

    DomainDdl { tables, indexes }
}

/// Drop statements for one domain, children before parents
pub fn drop_statements(domain: &DomainDef) -> Vec<TableDropStatement> {
    let mut tables = Vec::new();
    if domain.has_readings() {
        for datatype in Datatype::ALL {
            tables.push(domain.reading_table(datatype));
        }
        tables.push(domain.subject_table());
    }
    if domain.has_composite_entities() {
        for datatype in Datatype::ALL {
            tables.push(domain.value_table(datatype));
        }
        tables.push(domain.entity_table());
    }
    tables.push(domain.schema_identifier_table());
    tables.push(domain.schema_table());
    tables.push(domain.identifier_table());

    tables
        .into_iter()
        .map(|table| Table::drop().table(table).if_exists().to_owned())
        .collect()
}

// The id column has the same shape in every table
fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    def.big_integer().not_null().auto_increment().primary_key();
    def
}

fn identifier_table(domain: &DomainDef) -> TableCreateStatement {
    Table::create()
        .table(domain.identifier_table())
        .col(&mut id_column(IdentifierCol::Id))
        .col(ColumnDef::new(IdentifierCol::Name).string().not_null())
        .col(ColumnDef::new(IdentifierCol::Unit).string())
        .col(ColumnDef::new(IdentifierCol::Datatype).string().not_null())
        .col(
            ColumnDef::new(IdentifierCol::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

fn schema_table(domain: &DomainDef) -> TableCreateStatement {
    Table::create()
        .table(domain.schema_table())
        .col(&mut id_column(SchemaCol::Id))
        .col(ColumnDef::new(SchemaCol::Name).string().not_null())
        .col(ColumnDef::new(SchemaCol::Description).string())
        .col(
            ColumnDef::new(SchemaCol::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

fn schema_identifier_table(domain: &DomainDef) -> TableCreateStatement {
    let fk_schema = format!("fk_{}_schema_identifier_schema", domain.prefix());
    let fk_identifier = format!("fk_{}_schema_identifier_identifier", domain.prefix());
    Table::create()
        .table(domain.schema_identifier_table())
        .col(&mut id_column(SchemaIdentifierCol::Id))
        .col(
            ColumnDef::new(SchemaIdentifierCol::SchemaId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(SchemaIdentifierCol::IdentifierId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(SchemaIdentifierCol::Ordinal)
                .integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_schema.as_str())
                .from(domain.schema_identifier_table(), SchemaIdentifierCol::SchemaId)
                .to(domain.schema_table(), SchemaCol::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_identifier.as_str())
                .from(
                    domain.schema_identifier_table(),
                    SchemaIdentifierCol::IdentifierId,
                )
                .to(domain.identifier_table(), IdentifierCol::Id),
        )
        .to_owned()
}

fn entity_table(domain: &DomainDef) -> TableCreateStatement {
    let fk_schema = format!("fk_{}_entity_schema", domain.prefix());
    Table::create()
        .table(domain.entity_table())
        .col(&mut id_column(EntityCol::Id))
        .col(ColumnDef::new(EntityCol::SchemaId).big_integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .name(fk_schema.as_str())
                .from(domain.entity_table(), EntityCol::SchemaId)
                .to(domain.schema_table(), SchemaCol::Id),
        )
        .to_owned()
}

fn subject_table(domain: &DomainDef) -> TableCreateStatement {
    let fk_schema = format!("fk_{}_subject_schema", domain.prefix());
    Table::create()
        .table(domain.subject_table())
        .col(&mut id_column(SubjectCol::Id))
        .col(ColumnDef::new(SubjectCol::Name).string().not_null())
        .col(ColumnDef::new(SubjectCol::SchemaId).big_integer().not_null())
        .col(
            ColumnDef::new(SubjectCol::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_schema.as_str())
                .from(domain.subject_table(), SubjectCol::SchemaId)
                .to(domain.schema_table(), SchemaCol::Id),
        )
        .to_owned()
}

fn value_table(domain: &DomainDef, datatype: Datatype) -> TableCreateStatement {
    let fk_entity = format!("fk_{}_value_{}_entity", domain.prefix(), datatype.as_str());
    let fk_identifier = format!(
        "fk_{}_value_{}_identifier",
        domain.prefix(),
        datatype.as_str()
    );
    let mut value_col = ColumnDef::new(ValueCol::Value);
    typed_value_column(&mut value_col, datatype).not_null();
    Table::create()
        .table(domain.value_table(datatype))
        .col(&mut id_column(ValueCol::Id))
        .col(ColumnDef::new(ValueCol::EntityId).big_integer().not_null())
        .col(ColumnDef::new(ValueCol::IdentifierId).big_integer().not_null())
        .col(&mut value_col)
        .foreign_key(
            ForeignKey::create()
                .name(fk_entity.as_str())
                .from(domain.value_table(datatype), ValueCol::EntityId)
                .to(domain.entity_table(), EntityCol::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_identifier.as_str())
                .from(domain.value_table(datatype), ValueCol::IdentifierId)
                .to(domain.identifier_table(), IdentifierCol::Id),
        )
        .to_owned()
}

fn reading_table(domain: &DomainDef, datatype: Datatype) -> TableCreateStatement {
    let fk_subject = format!(
        "fk_{}_reading_{}_subject",
        domain.prefix(),
        datatype.as_str()
    );
    let fk_identifier = format!(
        "fk_{}_reading_{}_identifier",
        domain.prefix(),
        datatype.as_str()
    );
    let mut value_col = ColumnDef::new(ReadingCol::Value);
    typed_value_column(&mut value_col, datatype).not_null();
    Table::create()
        .table(domain.reading_table(datatype))
        .col(&mut id_column(ReadingCol::Id))
        .col(ColumnDef::new(ReadingCol::SubjectId).big_integer().not_null())
        .col(
            ColumnDef::new(ReadingCol::IdentifierId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ReadingCol::Ts)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(&mut value_col)
        .foreign_key(
            ForeignKey::create()
                .name(fk_subject.as_str())
                .from(domain.reading_table(datatype), ReadingCol::SubjectId)
                .to(domain.subject_table(), SubjectCol::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_identifier.as_str())
                .from(domain.reading_table(datatype), ReadingCol::IdentifierId)
                .to(domain.identifier_table(), IdentifierCol::Id),
        )
        .to_owned()
}

fn typed_value_column(col: &mut ColumnDef, datatype: Datatype) -> &mut ColumnDef {
    match datatype {
        Datatype::String => col.string(),
        Datatype::Integer => col.big_integer(),
        Datatype::Float => col.double(),
        Datatype::Boolean => col.boolean(),
    }
}

fn unique_identifier_index(domain: &DomainDef) -> IndexCreateStatement {
    let name = format!("uq_{}_identifier_name_unit", domain.prefix());
    Index::create()
        .name(name.as_str())
        .table(domain.identifier_table())
        .col(IdentifierCol::Name)
        .col(IdentifierCol::Unit)
        .unique()
        .to_owned()
}

fn unique_schema_index(domain: &DomainDef) -> IndexCreateStatement {
    let name = format!("uq_{}_schema_name", domain.prefix());
    Index::create()
        .name(name.as_str())
        .table(domain.schema_table())
        .col(SchemaCol::Name)
        .unique()
        .to_owned()
}

fn unique_membership_index(domain: &DomainDef) -> IndexCreateStatement {
    let name = format!("uq_{}_schema_identifier", domain.prefix());
    Index::create()
        .name(name.as_str())
        .table(domain.schema_identifier_table())
        .col(SchemaIdentifierCol::SchemaId)
        .col(SchemaIdentifierCol::IdentifierId)
        .unique()
        .to_owned()
}

fn unique_subject_index(domain: &DomainDef) -> IndexCreateStatement {
    let name = format!("uq_{}_subject_name", domain.prefix());
    Index::create()
        .name(name.as_str())
        .table(domain.subject_table())
        .col(SubjectCol::Name)
        .unique()
        .to_owned()
}

fn unique_value_index(domain: &DomainDef, datatype: Datatype) -> IndexCreateStatement {
    let name = format!("uq_{}_value_{}", domain.prefix(), datatype.as_str());
    Index::create()
        .name(name.as_str())
        .table(domain.value_table(datatype))
        .col(ValueCol::EntityId)
        .col(ValueCol::IdentifierId)
        .unique()
        .to_owned()
}

fn unique_reading_index(domain: &DomainDef, datatype: Datatype) -> IndexCreateStatement {
    let name = format!("uq_{}_reading_{}", domain.prefix(), datatype.as_str());
    Index::create()
        .name(name.as_str())
        .table(domain.reading_table(datatype))
        .col(ReadingCol::SubjectId)
        .col(ReadingCol::IdentifierId)
        .col(ReadingCol::Ts)
        .unique()
        .to_owned()
}
