//! JSON descriptors run end to end.

mod common;

use serde_json::{Value, json};

use common::{book, database, seed_ward};
use hms_persistence::descriptor::Query;
use hms_persistence::error::{StorageError, ValidationError};
use hms_persistence::schema::Entity;

async fn run(db: &hms_persistence::Database, entity: Entity, op: &str, args: Value) -> Value {
    Query::parse(entity, op, &args)
        .expect("valid descriptor")
        .execute(&db.entity(entity))
        .await
        .expect("query succeeds")
}

#[tokio::test]
async fn test_doctor_dashboard_query() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    for day in 1..=6 {
        book(&db, &ward, &format!("2024-07-0{}T10:00:00.000Z", day)).await;
    }

    let doctor = run(
        &db,
        Entity::Doctor,
        "findUnique",
        json!({
            "where": {"userId": ward.doctor_user},
            "include": {
                "user": {"select": {"name": true}},
                "appointments": {
                    "orderBy": {"startsAt": "desc"},
                    "take": 5,
                    "include": {"patient": {"include": {"user": true}}}
                }
            }
        }),
    )
    .await;

    assert_eq!(doctor["user"], json!({"name": "Dr. Okafor"}));
    let appointments = doctor["appointments"].as_array().unwrap();
    assert_eq!(appointments.len(), 5);
    assert_eq!(appointments[0]["startsAt"], json!("2024-07-06T10:00:00.000Z"));
    assert_eq!(appointments[0]["patient"]["user"]["email"], json!("ada@ward.example"));
}

#[tokio::test]
async fn test_select_with_relation_entry() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    book(&db, &ward, "2024-07-01T10:00:00.000Z").await;

    let rows = run(
        &db,
        Entity::Appointment,
        "findMany",
        json!({"select": {"startsAt": true, "doctor": {"select": {"specialization": true}}}}),
    )
    .await;

    assert_eq!(
        rows,
        json!([{"startsAt": "2024-07-01T10:00:00.000Z", "doctor": {"specialization": "Cardiology"}}])
    );
}

#[tokio::test]
async fn test_search_by_insensitive_substring() {
    let db = database().await;
    seed_ward(&db).await;

    let rows = run(
        &db,
        Entity::User,
        "findMany",
        json!({"where": {"name": {"contains": "OKAFOR", "mode": "insensitive"}}, "select": {"email": true}}),
    )
    .await;
    assert_eq!(rows, json!([{"email": "okafor@ward.example"}]));
}

#[tokio::test]
async fn test_bulk_operations_report_counts() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    for day in 1..=3 {
        book(&db, &ward, &format!("2024-07-0{}T10:00:00.000Z", day)).await;
    }

    let updated = run(
        &db,
        Entity::Appointment,
        "updateMany",
        json!({"where": {"startsAt": {"gte": "2024-07-02"}}, "data": {"status": "CONFIRMED"}}),
    )
    .await;
    assert_eq!(updated, json!({"count": 2}));

    let pending = run(
        &db,
        Entity::Appointment,
        "count",
        json!({"where": {"status": {"not": "CONFIRMED"}}}),
    )
    .await;
    assert_eq!(pending, json!({"count": 1}));

    let deleted = run(&db, Entity::Appointment, "deleteMany", json!({"where": {"status": "CONFIRMED"}})).await;
    assert_eq!(deleted, json!({"count": 2}));
}

#[tokio::test]
async fn test_unknown_relation_descriptor_fails_validation() {
    let err = Query::parse(
        Entity::Patient,
        "findMany",
        &json!({"include": {"appointments": {"include": {"ward": true}}}}),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::UnknownRelation { ref relation, .. } if relation == "ward"));

    let storage: StorageError = err.into();
    assert!(!storage.is_unavailable());
}

#[tokio::test]
async fn test_malformed_id_in_descriptor_is_null() {
    let db = database().await;
    seed_ward(&db).await;

    let found = run(&db, Entity::User, "findUnique", json!({"where": {"id": "42"}})).await;
    assert_eq!(found, Value::Null);
    let deleted = run(&db, Entity::User, "delete", json!({"where": {"id": "42"}})).await;
    assert_eq!(deleted, Value::Null);
}
