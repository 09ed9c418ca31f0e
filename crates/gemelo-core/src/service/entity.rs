//! Composite entity service
//!
//! Validates whole composite rows against their schema before touching
//! storage: strict attribute-set equality, per-value datatype checks and
//! duplicate-by-value detection, then one entity row plus one typed
//! value per attribute. The caller owns the surrounding transaction; any
//! failure leaves it to the caller to roll back.

use std::collections::{HashMap, HashSet};

use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Expr, Query};

use gemelo_common::{GemeloError, TypedValue};
use gemelo_persistence::domain::{DomainDef, EntityCol};
use gemelo_persistence::sql::insert_returning_id;

use crate::model::{AttributeIdentifier, AttributeValueSpec, CompositeRecord, SchemaDetails};
use crate::query;
use crate::service::{attribute, schema};
use crate::store;

/// Insert one composite entity into an existing schema
pub async fn create<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_name: &str,
    values: &HashMap<String, TypedValue>,
) -> anyhow::Result<i64> {
    let schema = schema::get_details(db, domain, schema_name).await?;
    let pairs = pair_with_schema(&schema, values)?;
    for (attribute, value) in &pairs {
        if value.datatype() != attribute.datatype {
            return Err(GemeloError::DatatypeMismatch {
                attribute: attribute.name.clone(),
                expected: attribute.datatype,
                actual: value.datatype(),
            }
            .into());
        }
    }

    // Duplicate check: an entity matching every provided value already
    // represents this tuple.
    let plan = query::build_plan(&schema, values)?;
    if !query::execute(db, domain, &plan).await?.is_empty() {
        return Err(GemeloError::EntityAlreadyExists(schema.name.clone()).into());
    }

    let entity_id = insert_entity_row(db, domain, schema.id).await?;
    for (attribute, value) in pairs {
        store::put(db, domain, entity_id, attribute, value).await?;
    }

    tracing::debug!(schema = %schema.name, entity_id, "inserted composite entity");
    Ok(entity_id)
}

/// Insert one composite entity, declaring its identifiers inline
///
/// Identifiers are registered idempotently and the schema is derived
/// from the sorted identifier names, created on first use. Callers who
/// supply the same identifier set in different order converge on the
/// same schema.
pub async fn create_with_identifiers<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    specs: &[AttributeValueSpec],
) -> anyhow::Result<i64> {
    if specs.is_empty() {
        return Err(
            GemeloError::IllegalArgument("at least one attribute is required".to_string()).into(),
        );
    }
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(GemeloError::IllegalArgument(format!(
                "attribute '{}' appears more than once",
                spec.name
            ))
            .into());
        }
        if spec.value.datatype() != spec.datatype {
            return Err(GemeloError::DatatypeMismatch {
                attribute: spec.name.clone(),
                expected: spec.datatype,
                actual: spec.value.datatype(),
            }
            .into());
        }
    }

    for spec in specs {
        attribute::register_if_absent(db, domain, &spec.name, spec.unit.as_deref(), spec.datatype)
            .await?;
    }

    let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let schema_name = schema::canonical_name(&names);
    if schema::find_by_name(db, domain, &schema_name).await?.is_none() {
        match schema::create(db, domain, &schema_name, None, &names).await {
            Ok(_) => {}
            Err(e) => {
                // Lost a race to a concurrent caller creating the same
                // schema; proceed against theirs.
                if !matches!(
                    e.downcast_ref::<GemeloError>(),
                    Some(GemeloError::SchemaAlreadyExists(_))
                ) {
                    return Err(e);
                }
            }
        }
    }

    let values: HashMap<String, TypedValue> = specs
        .iter()
        .map(|s| (s.name.clone(), s.value.clone()))
        .collect();
    create(db, domain, &schema_name, &values).await
}

/// List a schema's composite entities, optionally filtered by exact
/// attribute values
pub async fn list<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_name: &str,
    filters: &HashMap<String, TypedValue>,
) -> anyhow::Result<Vec<CompositeRecord>> {
    let schema = schema::get_details(db, domain, schema_name).await?;
    let plan = query::build_plan(&schema, filters)?;
    query::execute(db, domain, &plan).await
}

/// Delete the entity identified by its full attribute-value tuple
///
/// Zero matches is NotFound. More than one match means the insert-time
/// uniqueness invariant was violated; fail loudly instead of deleting an
/// arbitrary row.
pub async fn delete_by_values<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_name: &str,
    values: &HashMap<String, TypedValue>,
) -> anyhow::Result<()> {
    let schema = schema::get_details(db, domain, schema_name).await?;
    let pairs = pair_with_schema(&schema, values)?;
    for (attribute, value) in &pairs {
        if value.datatype() != attribute.datatype {
            return Err(GemeloError::DatatypeMismatch {
                attribute: attribute.name.clone(),
                expected: attribute.datatype,
                actual: value.datatype(),
            }
            .into());
        }
    }

    let plan = query::build_plan(&schema, values)?;
    let matches = query::execute(db, domain, &plan).await?;
    let entity_id = match matches.as_slice() {
        [] => return Err(GemeloError::EntityNotFound(schema.name.clone()).into()),
        [record] => record.id,
        _ => {
            tracing::warn!(
                schema = %schema.name,
                count = matches.len(),
                "value tuple matches more than one entity"
            );
            return Err(GemeloError::EntityNotUnique {
                schema: schema.name.clone(),
                count: matches.len(),
            }
            .into());
        }
    };

    store::delete_all_for_entity(db, domain, entity_id).await?;

    let stmt = Query::delete()
        .from_table(domain.entity_table())
        .and_where(Expr::col(EntityCol::Id).eq(entity_id))
        .to_owned();
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn insert_entity_row<C: ConnectionTrait>(
    db: &C,
    domain: &DomainDef,
    schema_id: i64,
) -> anyhow::Result<i64> {
    let stmt = Query::insert()
        .into_table(domain.entity_table())
        .columns([EntityCol::SchemaId])
        .values_panic([schema_id.into()])
        .to_owned();
    Ok(insert_returning_id(db, stmt, EntityCol::Id).await?)
}

/// Pair every schema attribute with its provided value, enforcing strict
/// set equality between the schema and the provided keys
fn pair_with_schema<'a>(
    schema: &'a SchemaDetails,
    values: &'a HashMap<String, TypedValue>,
) -> Result<Vec<(&'a AttributeIdentifier, &'a TypedValue)>, GemeloError> {
    let mut missing = Vec::new();
    let mut pairs = Vec::with_capacity(schema.identifiers.len());
    for attribute in &schema.identifiers {
        match values.get(&attribute.name) {
            Some(value) => pairs.push((attribute, value)),
            None => missing.push(attribute.name.clone()),
        }
    }

    let known: HashSet<&str> = schema.identifiers.iter().map(|a| a.name.as_str()).collect();
    let mut unexpected: Vec<String> = values
        .keys()
        .filter(|name| !known.contains(name.as_str()))
        .cloned()
        .collect();
    unexpected.sort();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(GemeloError::AttributeSetMismatch {
            schema: schema.name.clone(),
            missing,
            unexpected,
        });
    }
    Ok(pairs)
}
