//! Attribute identifier registry
//!
//! Identifiers give a name, an optional unit and a declared primitive
//! datatype to every coordinate and measure a domain knows about. They
//! are immutable once registered; deletion is blocked while any schema
//! still includes them.

use chrono::Utc;
use sea_orm::ConnectionTrait;
use sea_orm::QueryResult;
use sea_orm::sea_query::{Alias, Expr, JoinType, Order, Query};

use gemelo_common::{Datatype, GemeloError};
use gemelo_persistence::domain::{DomainDef, IdentifierCol, SchemaCol, SchemaIdentifierCol};
use gemelo_persistence::sql::{insert_returning_id, is_unique_violation};

use crate::model::AttributeIdentifier;

pub(crate) fn identifier_from_row(row: &QueryResult) -> anyhow::Result<AttributeIdentifier> {
    let datatype: String = row.try_get("", "datatype")?;
    Ok(AttributeIdentifier {
        id: row.try_get("", "id")?,
        name: row.try_get("", "name")?,
        unit: row.try_get("", "unit")?,
        datatype: datatype.parse()?,
    })
}

/// Register a new attribute identifier
pub async fn register<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
    unit: Option<&str>,
    datatype: Datatype,
) -> anyhow::Result<i64> {
    if find_by_name_and_unit(db, domain, name, unit).await?.is_some() {
        return Err(already_exists(name, unit).into());
    }

    let stmt = Query::insert()
        .into_table(domain.identifier_table())
        .columns([
            IdentifierCol::Name,
            IdentifierCol::Unit,
            IdentifierCol::Datatype,
            IdentifierCol::CreatedAt,
        ])
        .values_panic([
            name.into(),
            unit.into(),
            datatype.as_str().into(),
            Utc::now().into(),
        ])
        .to_owned();

    match insert_returning_id(db, stmt, IdentifierCol::Id).await {
        Ok(id) => Ok(id),
        // Lost a race to a concurrent registration; surface the conflict.
        Err(e) if is_unique_violation(&e) => Err(already_exists(name, unit).into()),
        Err(e) => Err(e.into()),
    }
}

/// Register an identifier unless an identical one already exists
///
/// Re-registering the same (name, unit, datatype) is treated as success
/// and returns the existing id. Re-declaring the same (name, unit) with
/// a different datatype is still a conflict - continuing would silently
/// change which partition the identifier's values land in.
pub async fn register_if_absent<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
    unit: Option<&str>,
    datatype: Datatype,
) -> anyhow::Result<i64> {
    if let Some(existing) = find_by_name_and_unit(db, domain, name, unit).await? {
        if existing.datatype != datatype {
            return Err(already_exists(name, unit).into());
        }
        return Ok(existing.id);
    }

    match register(db, domain, name, unit, datatype).await {
        Ok(id) => Ok(id),
        Err(e) => {
            // A concurrent caller may have registered it in between.
            if let Some(GemeloError::IdentifierAlreadyExists { .. }) =
                e.downcast_ref::<GemeloError>()
            {
                let existing = find_by_name_and_unit(db, domain, name, unit)
                    .await?
                    .ok_or_else(|| already_exists(name, unit))?;
                if existing.datatype != datatype {
                    return Err(already_exists(name, unit).into());
                }
                return Ok(existing.id);
            }
            Err(e)
        }
    }
}

/// Resolve an identifier by name
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<AttributeIdentifier> {
    let stmt = Query::select()
        .columns([
            IdentifierCol::Id,
            IdentifierCol::Name,
            IdentifierCol::Unit,
            IdentifierCol::Datatype,
        ])
        .from(domain.identifier_table())
        .and_where(Expr::col(IdentifierCol::Name).eq(name))
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    match rows.as_slice() {
        [] => Err(GemeloError::IdentifierNotFound(name.to_string()).into()),
        [row] => identifier_from_row(row),
        _ => Err(GemeloError::IdentifierAmbiguous(name.to_string()).into()),
    }
}

/// Delete an identifier by name
///
/// Fails while any schema still includes the identifier; the conflict
/// names the referencing schema.
pub async fn delete<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<()> {
    let identifier = resolve(db, domain, name).await?;

    if let Some(schema) = first_referencing_schema(db, domain, identifier.id).await? {
        return Err(GemeloError::IdentifierInUse {
            identifier: name.to_string(),
            schema,
        }
        .into());
    }

    let stmt = Query::delete()
        .from_table(domain.identifier_table())
        .and_where(Expr::col(IdentifierCol::Id).eq(identifier.id))
        .to_owned();
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// List all identifiers in registration order
pub async fn list<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
) -> anyhow::Result<Vec<AttributeIdentifier>> {
    let stmt = Query::select()
        .columns([
            IdentifierCol::Id,
            IdentifierCol::Name,
            IdentifierCol::Unit,
            IdentifierCol::Datatype,
        ])
        .from(domain.identifier_table())
        .order_by(IdentifierCol::Id, Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    rows.iter().map(identifier_from_row).collect()
}

pub(crate) async fn find_by_name_and_unit<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
    unit: Option<&str>,
) -> anyhow::Result<Option<AttributeIdentifier>> {
    let unit_condition = match unit {
        Some(unit) => Expr::col(IdentifierCol::Unit).eq(unit),
        None => Expr::col(IdentifierCol::Unit).is_null(),
    };
    let stmt = Query::select()
        .columns([
            IdentifierCol::Id,
            IdentifierCol::Name,
            IdentifierCol::Unit,
            IdentifierCol::Datatype,
        ])
        .from(domain.identifier_table())
        .and_where(Expr::col(IdentifierCol::Name).eq(name))
        .and_where(unit_condition)
        .to_owned();

    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => Ok(Some(identifier_from_row(&row)?)),
        None => Ok(None),
    }
}

async fn first_referencing_schema<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    identifier_id: i64,
) -> anyhow::Result<Option<String>> {
    let membership = Alias::new("m");
    let schema = Alias::new("s");
    let stmt = Query::select()
        .expr_as(
            Expr::col((schema.clone(), SchemaCol::Name)),
            Alias::new("name"),
        )
        .from_as(domain.schema_identifier_table(), membership.clone())
        .join_as(
            JoinType::InnerJoin,
            domain.schema_table(),
            schema.clone(),
            Expr::col((membership.clone(), SchemaIdentifierCol::SchemaId))
                .equals((schema, SchemaCol::Id)),
        )
        .and_where(
            Expr::col((membership, SchemaIdentifierCol::IdentifierId)).eq(identifier_id),
        )
        .limit(1)
        .to_owned();

    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => Ok(Some(row.try_get("", "name")?)),
        None => Ok(None),
    }
}

fn already_exists(name: &str, unit: Option<&str>) -> GemeloError {
    GemeloError::IdentifierAlreadyExists {
        name: name.to_string(),
        unit: unit.map(str::to_string),
    }
}
