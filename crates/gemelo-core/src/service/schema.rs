//! Schema registry
//!
//! A schema is a named, deduplicated set of attribute identifiers held
//! in canonical (lexicographic) order. The identifier set is fixed at
//! creation; deletion is blocked while any entity or subject still uses
//! the schema.

use chrono::Utc;
use sea_orm::ConnectionTrait;
use sea_orm::QueryResult;
use sea_orm::sea_query::{Alias, Expr, JoinType, Order, Query};

use gemelo_common::GemeloError;
use gemelo_persistence::domain::{
    DomainDef, EntityCol, IdentifierCol, SchemaCol, SchemaIdentifierCol, SubjectCol,
};
use gemelo_persistence::sql::{fetch_count, insert_returning_id, is_unique_violation};

use crate::model::{AttributeIdentifier, SchemaDetails, SchemaSummary};
use crate::service::attribute;

/// Canonical identifier order: lexicographically sorted, deduplicated
pub fn canonical_order(identifier_names: &[String]) -> Vec<String> {
    let mut names = identifier_names.to_vec();
    names.sort();
    names.dedup();
    names
}

/// The schema name derived from an identifier set
///
/// Two callers who supply the same identifiers in different order
/// converge on the same schema instead of creating duplicates.
pub fn canonical_name(identifier_names: &[String]) -> String {
    canonical_order(identifier_names).join("-")
}

/// Create a schema from existing identifiers
pub async fn create<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
    description: Option<&str>,
    identifier_names: &[String],
) -> anyhow::Result<i64> {
    let ordered = canonical_order(identifier_names);
    if ordered.is_empty() {
        return Err(
            GemeloError::IllegalArgument("a schema needs at least one identifier".to_string())
                .into(),
        );
    }
    let mut identifiers = Vec::with_capacity(ordered.len());
    for identifier_name in &ordered {
        identifiers.push(attribute::resolve(db, domain, identifier_name).await?);
    }

    if find_by_name(db, domain, name).await?.is_some() {
        return Err(GemeloError::SchemaAlreadyExists(name.to_string()).into());
    }

    let stmt = Query::insert()
        .into_table(domain.schema_table())
        .columns([SchemaCol::Name, SchemaCol::Description, SchemaCol::CreatedAt])
        .values_panic([name.into(), description.into(), Utc::now().into()])
        .to_owned();

    let schema_id = match insert_returning_id(db, stmt, SchemaCol::Id).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(GemeloError::SchemaAlreadyExists(name.to_string()).into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut membership = Query::insert()
        .into_table(domain.schema_identifier_table())
        .columns([
            SchemaIdentifierCol::SchemaId,
            SchemaIdentifierCol::IdentifierId,
            SchemaIdentifierCol::Ordinal,
        ])
        .to_owned();
    for (ordinal, identifier) in identifiers.iter().enumerate() {
        membership.values_panic([schema_id.into(), identifier.id.into(), (ordinal as i32).into()]);
    }
    let backend = db.get_database_backend();
    db.execute(backend.build(&membership)).await?;

    tracing::debug!(schema = name, identifiers = identifiers.len(), "created schema");
    Ok(schema_id)
}

/// Fetch a schema with its identifiers resolved, in canonical order
pub async fn get_details<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<SchemaDetails> {
    let summary = find_by_name(db, domain, name)
        .await?
        .ok_or_else(|| GemeloError::SchemaNotFound(name.to_string()))?;
    let identifiers = schema_identifiers(db, domain, summary.id).await?;

    Ok(SchemaDetails {
        id: summary.id,
        name: summary.name,
        description: summary.description,
        identifiers,
    })
}

/// Delete a schema by name
pub async fn delete<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<()> {
    let summary = find_by_name(db, domain, name)
        .await?
        .ok_or_else(|| GemeloError::SchemaNotFound(name.to_string()))?;

    // Count both dependent kinds concurrently; only one applies per flavor.
    let (entities, subjects) = tokio::join!(
        dependent_count(db, domain, summary.id, Dependent::Entity),
        dependent_count(db, domain, summary.id, Dependent::Subject),
    );
    let dependents = entities? + subjects?;
    if dependents > 0 {
        return Err(GemeloError::SchemaInUse {
            schema: name.to_string(),
            dependents,
        }
        .into());
    }

    let backend = db.get_database_backend();
    let memberships = Query::delete()
        .from_table(domain.schema_identifier_table())
        .and_where(Expr::col(SchemaIdentifierCol::SchemaId).eq(summary.id))
        .to_owned();
    db.execute(backend.build(&memberships)).await?;

    let schema = Query::delete()
        .from_table(domain.schema_table())
        .and_where(Expr::col(SchemaCol::Id).eq(summary.id))
        .to_owned();
    db.execute(backend.build(&schema)).await?;
    Ok(())
}

/// List all schemas in creation order
pub async fn list<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
) -> anyhow::Result<Vec<SchemaSummary>> {
    let stmt = Query::select()
        .columns([SchemaCol::Id, SchemaCol::Name, SchemaCol::Description])
        .from(domain.schema_table())
        .order_by(SchemaCol::Id, Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    rows.iter().map(summary_from_row).collect()
}

pub(crate) async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<Option<SchemaSummary>> {
    let stmt = Query::select()
        .columns([SchemaCol::Id, SchemaCol::Name, SchemaCol::Description])
        .from(domain.schema_table())
        .and_where(Expr::col(SchemaCol::Name).eq(name))
        .to_owned();

    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => Ok(Some(summary_from_row(&row)?)),
        None => Ok(None),
    }
}

/// True when the schema includes the given identifier
pub(crate) async fn includes_identifier<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_id: i64,
    identifier_id: i64,
) -> anyhow::Result<bool> {
    let stmt = Query::select()
        .expr_as(
            Expr::col(SchemaIdentifierCol::Id).count(),
            Alias::new("count"),
        )
        .from(domain.schema_identifier_table())
        .and_where(Expr::col(SchemaIdentifierCol::SchemaId).eq(schema_id))
        .and_where(Expr::col(SchemaIdentifierCol::IdentifierId).eq(identifier_id))
        .to_owned();
    Ok(fetch_count(db, stmt).await? > 0)
}

async fn schema_identifiers<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_id: i64,
) -> anyhow::Result<Vec<AttributeIdentifier>> {
    let membership = Alias::new("m");
    let identifier = Alias::new("i");
    let stmt = Query::select()
        .expr_as(
            Expr::col((identifier.clone(), IdentifierCol::Id)),
            Alias::new("id"),
        )
        .expr_as(
            Expr::col((identifier.clone(), IdentifierCol::Name)),
            Alias::new("name"),
        )
        .expr_as(
            Expr::col((identifier.clone(), IdentifierCol::Unit)),
            Alias::new("unit"),
        )
        .expr_as(
            Expr::col((identifier.clone(), IdentifierCol::Datatype)),
            Alias::new("datatype"),
        )
        .from_as(domain.schema_identifier_table(), membership.clone())
        .join_as(
            JoinType::InnerJoin,
            domain.identifier_table(),
            identifier.clone(),
            Expr::col((membership.clone(), SchemaIdentifierCol::IdentifierId))
                .equals((identifier, IdentifierCol::Id)),
        )
        .and_where(Expr::col((membership.clone(), SchemaIdentifierCol::SchemaId)).eq(schema_id))
        .order_by((membership, SchemaIdentifierCol::Ordinal), Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    rows.iter().map(attribute::identifier_from_row).collect()
}

enum Dependent {
    Entity,
    Subject,
}

async fn dependent_count<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_id: i64,
    dependent: Dependent,
) -> anyhow::Result<i64> {
    let stmt = match dependent {
        Dependent::Entity => {
            if !domain.has_composite_entities() {
                return Ok(0);
            }
            Query::select()
                .expr_as(Expr::col(EntityCol::Id).count(), Alias::new("count"))
                .from(domain.entity_table())
                .and_where(Expr::col(EntityCol::SchemaId).eq(schema_id))
                .to_owned()
        }
        Dependent::Subject => {
            if !domain.has_readings() {
                return Ok(0);
            }
            Query::select()
                .expr_as(Expr::col(SubjectCol::Id).count(), Alias::new("count"))
                .from(domain.subject_table())
                .and_where(Expr::col(SubjectCol::SchemaId).eq(schema_id))
                .to_owned()
        }
    };
    Ok(fetch_count(db, stmt).await?)
}

fn summary_from_row(row: &QueryResult) -> anyhow::Result<SchemaSummary> {
    Ok(SchemaSummary {
        id: row.try_get("", "id")?,
        name: row.try_get("", "name")?,
        description: row.try_get("", "description")?,
    })
}
