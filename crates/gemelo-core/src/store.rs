//! Typed value store - the four per-datatype partitions
//!
//! Each partition maps (entity_id, identifier_id) to one value of its
//! primitive type. Partition selection is an exhaustive match on the
//! attribute's declared datatype; per-pair uniqueness is enforced by the
//! partition's unique index and surfaced as an already-exists conflict.

use std::collections::HashMap;

use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Expr, Query};

use gemelo_common::{Datatype, GemeloError, TypedValue};
use gemelo_persistence::domain::{DomainDef, ValueCol};
use gemelo_persistence::sql::{db_value, is_unique_violation, read_value};

use crate::model::AttributeIdentifier;

/// Store one value for (entity, attribute) in the partition matching
/// the attribute's declared datatype
pub async fn put<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    entity_id: i64,
    attribute: &AttributeIdentifier,
    value: &TypedValue,
) -> anyhow::Result<()> {
    if value.datatype() != attribute.datatype {
        return Err(GemeloError::DatatypeMismatch {
            attribute: attribute.name.clone(),
            expected: attribute.datatype,
            actual: value.datatype(),
        }
        .into());
    }

    let stmt = Query::insert()
        .into_table(domain.value_table(attribute.datatype))
        .columns([ValueCol::EntityId, ValueCol::IdentifierId, ValueCol::Value])
        .values_panic([entity_id.into(), attribute.id.into(), db_value(value).into()])
        .to_owned();

    let backend = db.get_database_backend();
    match db.execute(backend.build(&stmt)).await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(GemeloError::ValueAlreadyExists {
            entity: entity_id,
            attribute: attribute.name.clone(),
        }
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Fetch one attribute's value for many entities at once
pub async fn get_many<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    entity_ids: &[i64],
    attribute: &AttributeIdentifier,
) -> anyhow::Result<HashMap<i64, TypedValue>> {
    if entity_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let stmt = Query::select()
        .columns([ValueCol::EntityId, ValueCol::Value])
        .from(domain.value_table(attribute.datatype))
        .and_where(Expr::col(ValueCol::IdentifierId).eq(attribute.id))
        .and_where(Expr::col(ValueCol::EntityId).is_in(entity_ids.iter().copied()))
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    let mut values = HashMap::with_capacity(rows.len());
    for row in rows {
        let entity_id: i64 = row.try_get("", "entity_id")?;
        values.insert(entity_id, read_value(&row, "value", attribute.datatype)?);
    }
    Ok(values)
}

/// Delete every value an entity owns, across all four partitions
///
/// Idempotent: an entity need not have a value in every partition.
pub async fn delete_all_for_entity<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    entity_id: i64,
) -> anyhow::Result<()> {
    let backend = db.get_database_backend();
    for datatype in Datatype::ALL {
        let stmt = Query::delete()
            .from_table(domain.value_table(datatype))
            .and_where(Expr::col(ValueCol::EntityId).eq(entity_id))
            .to_owned();
        db.execute(backend.build(&stmt)).await?;
    }
    Ok(())
}
