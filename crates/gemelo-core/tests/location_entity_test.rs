//! Integration tests for composite entity insertion, listing and
//! deletion in the locations domain

mod common;

use std::collections::HashMap;

use sea_orm::TransactionTrait;

use gemelo_common::{Datatype, GemeloError, TypedValue};
use gemelo_core::LOCATIONS;
use gemelo_core::model::AttributeValueSpec;
use gemelo_core::service::{attribute, entity, schema};

async fn create_latlong_schema(db: &sea_orm::DatabaseConnection) {
    attribute::register(db, &LOCATIONS, "latitude", None, Datatype::Float)
        .await
        .unwrap();
    attribute::register(db, &LOCATIONS, "longitude", None, Datatype::Float)
        .await
        .unwrap();
    schema::create(
        db,
        &LOCATIONS,
        "latlong",
        None,
        &["latitude".to_string(), "longitude".to_string()],
    )
    .await
    .unwrap();
}

fn latlong(latitude: f64, longitude: f64) -> HashMap<String, TypedValue> {
    HashMap::from([
        ("latitude".to_string(), TypedValue::Float(latitude)),
        ("longitude".to_string(), TypedValue::Float(longitude)),
    ])
}

#[tokio::test]
async fn test_insert_list_and_duplicate_detection() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();

    let records = entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("latitude"), Some(&TypedValue::Float(-2.0)));
    assert_eq!(records[0].value("longitude"), Some(&TypedValue::Float(23.5)));

    // the same coordinate pair cannot be inserted twice
    let err = entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::EntityAlreadyExists(name)) if name == "latlong"
    ));

    // filtering on one attribute narrows to the matching record
    let filtered = entity::list(
        &db,
        &LOCATIONS,
        "latlong",
        &HashMap::from([("latitude".to_string(), TypedValue::Float(-2.0))]),
    )
    .await
    .unwrap();
    assert_eq!(filtered.len(), 1);

    let empty = entity::list(
        &db,
        &LOCATIONS,
        "latlong",
        &HashMap::from([("latitude".to_string(), TypedValue::Float(99.0))]),
    )
    .await
    .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_filters_select_the_exact_subset() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 24.5))
        .await
        .unwrap();
    entity::create(&db, &LOCATIONS, "latlong", &latlong(40.0, 24.5))
        .await
        .unwrap();

    let all = entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let filters = HashMap::from([("latitude".to_string(), TypedValue::Float(-2.0))]);
    let filtered = entity::list(&db, &LOCATIONS, "latlong", &filters)
        .await
        .unwrap();
    let expected: Vec<_> = all
        .iter()
        .filter(|record| record.value("latitude") == Some(&TypedValue::Float(-2.0)))
        .cloned()
        .collect();
    assert_eq!(filtered, expected);
}

#[tokio::test]
async fn test_attribute_set_must_match_exactly() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    // missing key
    let missing = HashMap::from([("latitude".to_string(), TypedValue::Float(-2.0))]);
    let err = entity::create(&db, &LOCATIONS, "latlong", &missing)
        .await
        .unwrap_err();
    match err.downcast_ref::<GemeloError>() {
        Some(GemeloError::AttributeSetMismatch { missing, .. }) => {
            assert_eq!(missing, &vec!["longitude".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // extra key
    let mut extra = latlong(-2.0, 23.5);
    extra.insert("altitude".to_string(), TypedValue::Float(120.0));
    let err = entity::create(&db, &LOCATIONS, "latlong", &extra)
        .await
        .unwrap_err();
    match err.downcast_ref::<GemeloError>() {
        Some(GemeloError::AttributeSetMismatch { unexpected, .. }) => {
            assert_eq!(unexpected, &vec!["altitude".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_value_types_must_match_the_declared_datatype() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    let values = HashMap::from([
        ("latitude".to_string(), TypedValue::from("south")),
        ("longitude".to_string(), TypedValue::Float(23.5)),
    ]);
    let err = entity::create(&db, &LOCATIONS, "latlong", &values)
        .await
        .unwrap_err();
    match err.downcast_ref::<GemeloError>() {
        Some(GemeloError::DatatypeMismatch {
            attribute,
            expected,
            actual,
        }) => {
            assert_eq!(attribute, "latitude");
            assert_eq!(*expected, Datatype::Float);
            assert_eq!(*actual, Datatype::String);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // nothing was written
    assert!(
        entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_mixed_type_schema_round_trips_every_partition() {
    let db = common::setup().await;

    attribute::register(&db, &LOCATIONS, "name", None, Datatype::String)
        .await
        .unwrap();
    attribute::register(&db, &LOCATIONS, "floor", None, Datatype::Integer)
        .await
        .unwrap();
    attribute::register(&db, &LOCATIONS, "area", Some("m2"), Datatype::Float)
        .await
        .unwrap();
    attribute::register(&db, &LOCATIONS, "indoor", None, Datatype::Boolean)
        .await
        .unwrap();
    schema::create(
        &db,
        &LOCATIONS,
        "room",
        None,
        &[
            "name".to_string(),
            "floor".to_string(),
            "area".to_string(),
            "indoor".to_string(),
        ],
    )
    .await
    .unwrap();

    let values = HashMap::from([
        ("name".to_string(), TypedValue::from("lab-3")),
        ("floor".to_string(), TypedValue::Integer(3)),
        ("area".to_string(), TypedValue::Float(42.5)),
        ("indoor".to_string(), TypedValue::Boolean(true)),
    ]);
    entity::create(&db, &LOCATIONS, "room", &values).await.unwrap();

    let records = entity::list(&db, &LOCATIONS, "room", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].values, values);

    let filters = HashMap::from([("floor".to_string(), TypedValue::Integer(3))]);
    assert_eq!(
        entity::list(&db, &LOCATIONS, "room", &filters)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_filters_reject_unknown_attributes_and_wrong_types() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    let unknown = HashMap::from([("altitude".to_string(), TypedValue::Float(1.0))]);
    let err = entity::list(&db, &LOCATIONS, "latlong", &unknown)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::UnknownAttribute { attribute, .. }) if attribute == "altitude"
    ));

    let mistyped = HashMap::from([("latitude".to_string(), TypedValue::from("north"))]);
    let err = entity::list(&db, &LOCATIONS, "latlong", &mistyped)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::DatatypeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_deletion_cascades_and_is_not_repeatable() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
    entity::create(&db, &LOCATIONS, "latlong", &latlong(1.0, 2.0))
        .await
        .unwrap();

    entity::delete_by_values(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();

    let records = entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("latitude"), Some(&TypedValue::Float(1.0)));

    let err = entity::delete_by_values(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::EntityNotFound(_))
    ));

    // the freed tuple can be inserted again
    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_inline_identifier_insert_converges_on_one_schema() {
    let db = common::setup().await;

    let forward = vec![
        AttributeValueSpec {
            name: "latitude".to_string(),
            unit: None,
            datatype: Datatype::Float,
            value: TypedValue::Float(-2.0),
        },
        AttributeValueSpec {
            name: "longitude".to_string(),
            unit: None,
            datatype: Datatype::Float,
            value: TypedValue::Float(23.5),
        },
    ];
    entity::create_with_identifiers(&db, &LOCATIONS, &forward)
        .await
        .unwrap();

    // the same identifier set in reverse order lands in the same schema,
    // so the duplicate tuple is rejected rather than re-created
    let backward: Vec<AttributeValueSpec> = forward.iter().rev().cloned().collect();
    let err = entity::create_with_identifiers(&db, &LOCATIONS, &backward)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::EntityAlreadyExists(_))
    ));

    let schemas = schema::list(&db, &LOCATIONS).await.unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "latitude-longitude");

    // a different tuple in the same schema is fine
    let mut other = forward.clone();
    other[0].value = TypedValue::Float(40.0);
    entity::create_with_identifiers(&db, &LOCATIONS, &other)
        .await
        .unwrap();
    let records = entity::list(&db, &LOCATIONS, "latitude-longitude", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_insert_requires_an_existing_schema() {
    let db = common::setup().await;
    let err = entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::SchemaNotFound(_))
    ));
}

#[tokio::test]
async fn test_schema_deletion_is_blocked_by_entities() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    entity::create(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();

    let err = schema::delete(&db, &LOCATIONS, "latlong").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GemeloError>(),
        Some(GemeloError::SchemaInUse { dependents: 1, .. })
    ));

    entity::delete_by_values(&db, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
    schema::delete(&db, &LOCATIONS, "latlong").await.unwrap();
}

#[tokio::test]
async fn test_caller_owned_transaction_rolls_back_partial_work() {
    let db = common::setup().await;
    create_latlong_schema(&db).await;

    let txn = db.begin().await.unwrap();
    entity::create(&txn, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
    txn.rollback().await.unwrap();

    assert!(
        entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
            .await
            .unwrap()
            .is_empty()
    );

    // a committed transaction sticks
    let txn = db.begin().await.unwrap();
    entity::create(&txn, &LOCATIONS, "latlong", &latlong(-2.0, 23.5))
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(
        entity::list(&db, &LOCATIONS, "latlong", &HashMap::new())
            .await
            .unwrap()
            .len(),
        1
    );
}
