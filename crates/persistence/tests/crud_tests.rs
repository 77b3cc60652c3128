//! Query façade integration tests over the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{data, database, id_of, seed_ward, slow_database};
use hms_persistence::backends::memory::MemoryStore;
use hms_persistence::client::{Database, UPDATED_AT_FIELD};
use hms_persistence::error::{StorageError, ValidationError};
use hms_persistence::schema::Role;
use hms_persistence::types::{
    Filter, FindManyArgs, FindUniqueArgs, Include, SortDirective, UniqueWhere, UpdateArgs,
    UpdateData,
};

// ============================================================================
// Create / Read
// ============================================================================

#[tokio::test]
async fn test_find_unique_by_id_and_natural_key() {
    let db = database().await;
    let ward = seed_ward(&db).await;

    let by_id = db
        .user()
        .find_unique(FindUniqueArgs::by_id(&ward.doctor_user))
        .await
        .unwrap()
        .expect("doctor user by id");
    let by_email = db
        .user()
        .find_unique(FindUniqueArgs::by_key("email", "okafor@ward.example"))
        .await
        .unwrap()
        .expect("doctor user by email");

    assert_eq!(by_id, by_email);
    assert_eq!(by_id["id"], json!(ward.doctor_user));
    assert!(!by_id.contains_key("_id"));
}

#[tokio::test]
async fn test_find_unique_is_idempotent() {
    let db = database().await;
    let ward = seed_ward(&db).await;

    let first = db.patient().find_unique(FindUniqueArgs::by_id(&ward.patient)).await.unwrap();
    let second = db.patient().find_unique(FindUniqueArgs::by_id(&ward.patient)).await.unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_find_many_sorts_before_windowing() {
    let db = database().await;
    for (name, quantity) in [("Gauze", 40), ("Saline", 12), ("Syringe", 90), ("Iodine", 3)] {
        db.inventory()
            .create(data(json!({"name": name, "quantity": quantity})))
            .await
            .unwrap();
    }

    let items = db
        .inventory()
        .find_many(
            FindManyArgs::new()
                .with_sort(SortDirective::desc("quantity"))
                .with_skip(1)
                .with_take(2),
        )
        .await
        .unwrap();
    let names: Vec<_> = items.iter().map(|i| i["name"].clone()).collect();
    assert_eq!(names, vec![json!("Gauze"), json!("Saline")]);

    let first = db
        .inventory()
        .find_first(FindManyArgs::new().with_sort(SortDirective::asc("quantity")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first["name"], json!("Iodine"));

    let none = db
        .inventory()
        .find_many(FindManyArgs::new().with_take(0))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_duplicate_email_is_a_constraint_error() {
    let db = database().await;
    db.user()
        .create(data(json!({"email": "a@ward.example"})))
        .await
        .unwrap();

    let err = db
        .user()
        .create(data(json!({"email": "a@ward.example"})))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
    assert!(!err.is_unavailable());
    assert_eq!(db.user().count(Filter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_rejects_out_of_domain_status() {
    let db = database().await;
    let err = db
        .bill()
        .create(data(json!({"amount": 120, "status": "LOST"})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidEnumValue { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_create_survives_outage_during_relation_lookup() {
    let latency = Duration::from_millis(50);
    let (db, store) = slow_database(latency).await;

    let outage = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            // after the insert lands, before the relation lookup runs
            tokio::time::sleep(latency + latency / 2).await;
            store.set_online(false);
        })
    };
    let created = db
        .appointment()
        .create(
            data(json!({"doctorId": "65a1f0c2e4b0a1b2c3d4e5f6", "startsAt": "2024-05-01T09:00:00.000Z"}))
                .with_include(Include::new().relation("doctor")),
        )
        .await
        .unwrap();
    outage.await.unwrap();

    assert!(!created.contains_key("doctor"));
    assert_eq!(created["status"], json!("PENDING"));
    store.set_online(true);
    let stored = db
        .appointment()
        .find_unique(FindUniqueArgs::by_id(id_of(&created)))
        .await
        .unwrap();
    assert!(stored.is_some());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_is_a_partial_merge() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    let before = db
        .patient()
        .find_unique(FindUniqueArgs::by_id(&ward.patient))
        .await
        .unwrap()
        .unwrap();

    let updated = db
        .patient()
        .update(UpdateArgs::new(
            UniqueWhere::id(&ward.patient),
            UpdateData::new().set("disease", "flu"),
        ))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated["age"], json!(34));
    assert_eq!(updated["name"], json!("Ada"));
    assert_eq!(updated["disease"], json!("flu"));
    assert_eq!(updated["createdAt"], before["createdAt"]);
    assert!(updated[UPDATED_AT_FIELD].as_str() >= before[UPDATED_AT_FIELD].as_str());
}

#[tokio::test]
async fn test_update_missing_document_is_none() {
    let db = database().await;
    let result = db
        .patient()
        .update(UpdateArgs::new(
            UniqueWhere::id("65a1f0c2e4b0a1b2c3d4e5f6"),
            UpdateData::new().set("disease", "flu"),
        ))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_increment_and_decrement() {
    let db = database().await;
    let item = db
        .inventory()
        .create(data(json!({"name": "Gauze", "quantity": 10})))
        .await
        .unwrap();
    let id = id_of(&item);

    db.inventory()
        .update(UpdateArgs::new(UniqueWhere::id(&id), UpdateData::new().increment("quantity", 5)))
        .await
        .unwrap();
    let item = db
        .inventory()
        .update(UpdateArgs::new(UniqueWhere::id(&id), UpdateData::new().decrement("quantity", 3)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item["quantity"], json!(12));
}

#[tokio::test]
async fn test_update_many_marks_notifications_read() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    for message in ["Appointment confirmed", "Lab result ready", "Bill issued"] {
        db.notification()
            .create(data(json!({"userId": ward.patient_user, "message": message})))
            .await
            .unwrap();
    }
    db.notification()
        .create(data(json!({"userId": ward.doctor_user, "message": "New booking"})))
        .await
        .unwrap();

    let unread = Filter::eq("userId", ward.patient_user.as_str()).and(Filter::eq("read", false));
    let changed = db
        .notification()
        .update_many(unread.clone(), UpdateData::new().set("read", true))
        .await
        .unwrap();

    assert_eq!(changed, 3);
    assert_eq!(db.notification().count(unread).await.unwrap(), 0);
    assert_eq!(
        db.notification().count(Filter::eq("read", false)).await.unwrap(),
        1
    );
}

// ============================================================================
// Delete / Count
// ============================================================================

#[tokio::test]
async fn test_delete_then_find_is_none() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    let note = db
        .notification()
        .create(data(json!({"userId": ward.patient_user, "message": "Hello"})))
        .await
        .unwrap();
    let id = id_of(&note);

    let deleted = db.notification().delete(UniqueWhere::id(&id)).await.unwrap();
    assert_eq!(deleted.as_ref().map(id_of), Some(id.clone()));

    assert!(db.notification().find_unique(FindUniqueArgs::by_id(&id)).await.unwrap().is_none());
    assert!(db.notification().delete(UniqueWhere::id(&id)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_many_and_count() {
    let db = database().await;
    let ward = seed_ward(&db).await;
    for day in 1..=4 {
        common::book(&db, &ward, &format!("2024-04-0{}T09:00:00.000Z", day)).await;
    }

    let early = Filter::field(
        "startsAt",
        hms_persistence::types::Condition::Lt(json!("2024-04-03")),
    );
    assert_eq!(db.appointment().count(early.clone()).await.unwrap(), 2);
    assert_eq!(db.appointment().delete_many(early).await.unwrap(), 2);
    assert_eq!(db.appointment().count(Filter::All).await.unwrap(), 2);
}

// ============================================================================
// Identifiers
// ============================================================================

#[tokio::test]
async fn test_malformed_identifier_matches_nothing() {
    let db = database().await;
    seed_ward(&db).await;

    for bad in ["abc", "", "65a1f0c2e4b0a1b2c3d4e5fZ", "65A1F0C2E4B0A1B2C3D4E5F6AA"] {
        assert!(db.user().find_unique(FindUniqueArgs::by_id(bad)).await.unwrap().is_none());
        assert!(
            db.user()
                .update(UpdateArgs::new(UniqueWhere::id(bad), UpdateData::new().set("name", "x")))
                .await
                .unwrap()
                .is_none()
        );
        assert!(db.user().delete(UniqueWhere::id(bad)).await.unwrap().is_none());
        assert_eq!(db.user().count(Filter::id(bad)).await.unwrap(), 0);
    }
    assert_eq!(db.user().count(Filter::All).await.unwrap(), 3);
}

#[tokio::test]
async fn test_id_in_skips_malformed_entries() {
    let db = database().await;
    let ward = seed_ward(&db).await;

    let users = db
        .user()
        .find_many(FindManyArgs::new().with_filter(Filter::id_in([
            ward.admin_user.as_str(),
            "junk",
            ward.patient_user.as_str(),
        ])))
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
}

// ============================================================================
// Roles
// ============================================================================

#[tokio::test]
async fn test_admin_lookup_covers_both_spellings() {
    let db = database().await;
    seed_ward(&db).await;
    db.user()
        .create(data(json!({"email": "legacy@ward.example", "role": "admin"})))
        .await
        .unwrap();

    let exact = db.user().count(Filter::eq("role", "ADMIN")).await.unwrap();
    let any_spelling = db
        .user()
        .count(Filter::is_in("role", Role::Admin.stored_variants().iter().copied()))
        .await
        .unwrap();
    assert_eq!(exact, 1);
    assert_eq!(any_spelling, 2);
}

// ============================================================================
// Availability
// ============================================================================

#[tokio::test]
async fn test_unavailable_store_is_distinguishable_from_absence() {
    let store = Arc::new(MemoryStore::new());
    let db = Database::new(store.clone());
    db.initialize().await.unwrap();

    store.set_online(false);
    let err = db
        .user()
        .find_unique(FindUniqueArgs::by_id("65a1f0c2e4b0a1b2c3d4e5f6"))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(db.health_check().await.is_err());

    store.set_online(true);
    let found = db
        .user()
        .find_unique(FindUniqueArgs::by_id("65a1f0c2e4b0a1b2c3d4e5f6"))
        .await
        .unwrap();
    assert!(found.is_none());
}
