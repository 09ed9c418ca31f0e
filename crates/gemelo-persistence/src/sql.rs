//! Low-level statement helpers shared by the service layer
//!
//! Everything here is backend-agnostic: statements are rendered through
//! the connection's own query builder, and backend differences (id
//! generation, unique-violation reporting) are folded into one place.

use sea_orm::sea_query::{InsertStatement, IntoColumnRef, SelectStatement};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, QueryResult, SqlErr, Value};

use gemelo_common::{Datatype, TypedValue};

/// Convert a typed value into its SQL binding
pub fn db_value(value: &TypedValue) -> Value {
    match value {
        TypedValue::String(v) => v.clone().into(),
        TypedValue::Integer(v) => (*v).into(),
        TypedValue::Float(v) => (*v).into(),
        TypedValue::Boolean(v) => (*v).into(),
    }
}

/// Read one typed value back out of a result row
pub fn read_value(row: &QueryResult, column: &str, datatype: Datatype) -> Result<TypedValue, DbErr> {
    Ok(match datatype {
        Datatype::String => TypedValue::String(row.try_get("", column)?),
        Datatype::Integer => TypedValue::Integer(row.try_get("", column)?),
        Datatype::Float => TypedValue::Float(row.try_get("", column)?),
        Datatype::Boolean => TypedValue::Boolean(row.try_get("", column)?),
    })
}

/// True when the error is the storage layer rejecting a duplicate key
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Execute an insert and return the generated id
///
/// MySQL reports the id through `last_insert_id`; PostgreSQL and SQLite
/// get an explicit RETURNING clause instead.
pub async fn insert_returning_id<C, I>(
    db: &C,
    mut stmt: InsertStatement,
    id_col: I,
) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
    I: IntoColumnRef,
{
    let backend = db.get_database_backend();
    match backend {
        DbBackend::MySql => {
            let result = db.execute(backend.build(&stmt)).await?;
            Ok(result.last_insert_id() as i64)
        }
        _ => {
            stmt.returning_col(id_col);
            let row = db
                .query_one(backend.build(&stmt))
                .await?
                .ok_or(DbErr::RecordNotInserted)?;
            row.try_get("", "id")
        }
    }
}

/// Execute a `COUNT(..) AS count` select and return the count
pub async fn fetch_count<C: ConnectionTrait>(db: &C, stmt: SelectStatement) -> Result<i64, DbErr> {
    let backend = db.get_database_backend();
    match db.query_one(backend.build(&stmt)).await? {
        Some(row) => row.try_get("", "count"),
        None => Ok(0),
    }
}
