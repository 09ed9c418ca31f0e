//! Subject registry for readings domains
//!
//! A subject (sensor, model run) carries the schema declaring which
//! measures it may report. The readings service validates every batch
//! against that declaration.

use chrono::Utc;
use sea_orm::ConnectionTrait;
use sea_orm::QueryResult;
use sea_orm::sea_query::{Expr, Order, Query};

use gemelo_common::GemeloError;
use gemelo_persistence::domain::{DomainDef, SubjectCol};
use gemelo_persistence::sql::{insert_returning_id, is_unique_violation};

use crate::model::Subject;
use crate::service::schema;

/// Register a subject under the schema naming its measures
pub async fn register<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
    schema_name: &str,
) -> anyhow::Result<i64> {
    let summary = schema::find_by_name(db, domain, schema_name)
        .await?
        .ok_or_else(|| GemeloError::SchemaNotFound(schema_name.to_string()))?;

    if find_by_name(db, domain, name).await?.is_some() {
        return Err(GemeloError::SubjectAlreadyExists(name.to_string()).into());
    }

    let stmt = Query::insert()
        .into_table(domain.subject_table())
        .columns([SubjectCol::Name, SubjectCol::SchemaId, SubjectCol::CreatedAt])
        .values_panic([name.into(), summary.id.into(), Utc::now().into()])
        .to_owned();

    match insert_returning_id(db, stmt, SubjectCol::Id).await {
        Ok(id) => Ok(id),
        Err(e) if is_unique_violation(&e) => {
            Err(GemeloError::SubjectAlreadyExists(name.to_string()).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch a subject by id
pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    id: i64,
) -> anyhow::Result<Subject> {
    let stmt = Query::select()
        .columns([SubjectCol::Id, SubjectCol::Name, SubjectCol::SchemaId])
        .from(domain.subject_table())
        .and_where(Expr::col(SubjectCol::Id).eq(id))
        .to_owned();

    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => subject_from_row(&row),
        None => Err(GemeloError::SubjectNotFound(id).into()),
    }
}

/// List all subjects in registration order
pub async fn list<C: ConnectionTrait>(db: &C, domain: &DomainDef) -> anyhow::Result<Vec<Subject>> {
    let stmt = Query::select()
        .columns([SubjectCol::Id, SubjectCol::Name, SubjectCol::SchemaId])
        .from(domain.subject_table())
        .order_by(SubjectCol::Id, Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    rows.iter().map(subject_from_row).collect()
}

async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    name: &str,
) -> anyhow::Result<Option<Subject>> {
    let stmt = Query::select()
        .columns([SubjectCol::Id, SubjectCol::Name, SubjectCol::SchemaId])
        .from(domain.subject_table())
        .and_where(Expr::col(SubjectCol::Name).eq(name))
        .to_owned();

    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => Ok(Some(subject_from_row(&row)?)),
        None => Ok(None),
    }
}

fn subject_from_row(row: &QueryResult) -> anyhow::Result<Subject> {
    Ok(Subject {
        id: row.try_get("", "id")?,
        name: row.try_get("", "name")?,
        schema_id: row.try_get("", "schema_id")?,
    })
}
