//! Dynamic reconstruction of composite rows
//!
//! The number and type of joined partitions is not fixed at compile
//! time: it is derived from the schema at call time. A `JoinPlan` lists,
//! for each schema attribute, the partition to join and the optional
//! exact-match filter; the plan is built purely from schema metadata and
//! then rendered into a single select with one aliased inner join per
//! attribute.

use std::collections::HashMap;

use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Alias, Condition, Expr, JoinType, Order, Query, SelectStatement};

use gemelo_common::{GemeloError, TypedValue};
use gemelo_persistence::domain::{DomainDef, EntityCol, ValueCol};
use gemelo_persistence::sql::{db_value, read_value};

use crate::model::{AttributeIdentifier, CompositeRecord, SchemaDetails};

/// Alias of the entity table every partition joins back to
const BASE: &str = "e";

/// Column name the base entity id is projected under
const ENTITY_ID: &str = "entity_id";

/// One join term: an attribute's partition plus its optional filter
#[derive(Clone, Debug)]
pub struct JoinTerm {
    pub attribute: AttributeIdentifier,
    pub filter: Option<TypedValue>,
}

/// The per-schema join plan, executed as one select
#[derive(Clone, Debug)]
pub struct JoinPlan {
    pub schema_id: i64,
    pub terms: Vec<JoinTerm>,
}

/// Build the join plan for a schema and a set of exact-match filters
///
/// Every filter key must name an attribute of the schema, and every
/// filter value must carry the attribute's declared datatype - a
/// mismatched filter selects a partition the attribute never writes to,
/// so it is a caller bug rather than an empty result.
pub fn build_plan(
    schema: &SchemaDetails,
    filters: &HashMap<String, TypedValue>,
) -> Result<JoinPlan, GemeloError> {
    for name in filters.keys() {
        if schema.identifier(name).is_none() {
            return Err(GemeloError::UnknownAttribute {
                schema: schema.name.clone(),
                attribute: name.clone(),
            });
        }
    }

    let mut terms = Vec::with_capacity(schema.identifiers.len());
    for attribute in &schema.identifiers {
        let filter = filters.get(&attribute.name).cloned();
        if let Some(value) = &filter {
            if value.datatype() != attribute.datatype {
                return Err(GemeloError::DatatypeMismatch {
                    attribute: attribute.name.clone(),
                    expected: attribute.datatype,
                    actual: value.datatype(),
                });
            }
        }
        terms.push(JoinTerm {
            attribute: attribute.clone(),
            filter,
        });
    }

    Ok(JoinPlan {
        schema_id: schema.id,
        terms,
    })
}

/// Render the plan into one select over the partitions it touches
///
/// Each term contributes an inner join of its datatype's partition,
/// constrained to the term's attribute id (and filter value, when
/// given), plus one projected column named after the attribute. Rows
/// come back ordered by the base entity id.
pub fn build_select(domain: &DomainDef, plan: &JoinPlan) -> SelectStatement {
    let base = Alias::new(BASE);
    let mut select = Query::select();
    select
        .expr_as(Expr::col((base.clone(), EntityCol::Id)), Alias::new(ENTITY_ID))
        .from_as(domain.entity_table(), base.clone())
        .and_where(Expr::col((base.clone(), EntityCol::SchemaId)).eq(plan.schema_id))
        .order_by((base.clone(), EntityCol::Id), Order::Asc);

    for (index, term) in plan.terms.iter().enumerate() {
        let partition = Alias::new(format!("v{index}"));
        let mut on = Condition::all()
            .add(
                Expr::col((partition.clone(), ValueCol::EntityId))
                    .equals((base.clone(), EntityCol::Id)),
            )
            .add(Expr::col((partition.clone(), ValueCol::IdentifierId)).eq(term.attribute.id));
        if let Some(value) = &term.filter {
            on = on.add(Expr::col((partition.clone(), ValueCol::Value)).eq(db_value(value)));
        }
        select
            .join_as(
                JoinType::InnerJoin,
                domain.value_table(term.attribute.datatype),
                partition.clone(),
                on,
            )
            .expr_as(
                Expr::col((partition, ValueCol::Value)),
                Alias::new(term.attribute.name.as_str()),
            );
    }

    select
}

/// Execute a plan and decode one composite record per matching entity
pub async fn execute<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    plan: &JoinPlan,
) -> anyhow::Result<Vec<CompositeRecord>> {
    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&build_select(domain, plan))).await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.try_get("", ENTITY_ID)?;
        let mut values = HashMap::with_capacity(plan.terms.len());
        for term in &plan.terms {
            let value = read_value(&row, &term.attribute.name, term.attribute.datatype)?;
            values.insert(term.attribute.name.clone(), value);
        }
        records.push(CompositeRecord { id, values });
    }
    Ok(records)
}
