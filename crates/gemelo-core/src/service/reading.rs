//! Time-series attachment
//!
//! Bulk append of typed readings keyed by (subject, measure, timestamp)
//! plus inclusive range queries, partitioned by the measure's declared
//! datatype. A batch inserts completely or fails completely: any
//! duplicate key rejects the whole statement and the caller's
//! transaction decides what survives.

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Expr, Order, Query};

use gemelo_common::{GemeloError, TypedValue};
use gemelo_persistence::domain::{DomainDef, ReadingCol};
use gemelo_persistence::sql::{db_value, is_unique_violation, read_value};

use crate::model::ReadingPoint;
use crate::service::{attribute, schema, subject};

/// Append a batch of readings for one subject and measure
pub async fn attach<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    subject_id: i64,
    measure_name: &str,
    values: &[TypedValue],
    timestamps: &[DateTime<Utc>],
) -> anyhow::Result<()> {
    if values.len() != timestamps.len() {
        return Err(GemeloError::LengthMismatch {
            values: values.len(),
            timestamps: timestamps.len(),
        }
        .into());
    }
    if values.is_empty() {
        return Ok(());
    }

    let measure = attribute::resolve(db, domain, measure_name).await?;
    for value in values {
        if value.datatype() != measure.datatype {
            return Err(GemeloError::DatatypeMismatch {
                attribute: measure.name.clone(),
                expected: measure.datatype,
                actual: value.datatype(),
            }
            .into());
        }
    }

    let subject = subject::find_by_id(db, domain, subject_id).await?;
    if !schema::includes_identifier(db, domain, subject.schema_id, measure.id).await? {
        return Err(GemeloError::InvalidMeasure {
            subject: subject_id,
            measure: measure.name.clone(),
        }
        .into());
    }

    let mut stmt = Query::insert()
        .into_table(domain.reading_table(measure.datatype))
        .columns([
            ReadingCol::SubjectId,
            ReadingCol::IdentifierId,
            ReadingCol::Ts,
            ReadingCol::Value,
        ])
        .to_owned();
    for (value, timestamp) in values.iter().zip(timestamps) {
        stmt.values_panic([
            subject_id.into(),
            measure.id.into(),
            (*timestamp).into(),
            db_value(value).into(),
        ]);
    }

    let backend = db.get_database_backend();
    match db.execute(backend.build(&stmt)).await {
        Ok(_) => {
            tracing::debug!(
                subject_id,
                measure = %measure.name,
                points = values.len(),
                "attached readings"
            );
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => Err(GemeloError::ReadingAlreadyExists.into()),
        Err(e) => Err(e.into()),
    }
}

/// Fetch one subject+measure series inside an inclusive time range,
/// ordered by timestamp ascending
pub async fn query<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    subject_id: i64,
    measure_name: &str,
    time_from: DateTime<Utc>,
    time_to: DateTime<Utc>,
) -> anyhow::Result<Vec<ReadingPoint>> {
    let measure = attribute::resolve(db, domain, measure_name).await?;

    let stmt = Query::select()
        .columns([ReadingCol::Value, ReadingCol::Ts])
        .from(domain.reading_table(measure.datatype))
        .and_where(Expr::col(ReadingCol::SubjectId).eq(subject_id))
        .and_where(Expr::col(ReadingCol::IdentifierId).eq(measure.id))
        .and_where(Expr::col(ReadingCol::Ts).gte(time_from))
        .and_where(Expr::col(ReadingCol::Ts).lte(time_to))
        .order_by(ReadingCol::Ts, Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&stmt)).await?;
    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        points.push(ReadingPoint {
            value: read_value(&row, "value", measure.datatype)?,
            timestamp: row.try_get("", "ts")?,
        });
    }
    Ok(points)
}
