//! Concurrent writers racing on unique keys.

mod common;

use serde_json::json;

use common::{data, database};
use hms_persistence::client::Database;
use hms_persistence::error::StorageResult;
use hms_persistence::types::{Document, Filter, FindUniqueArgs};

// Fetches the user, creating it when missing. A lost creation race falls
// back to reading the winner.
async fn user_by_email(db: &Database, email: &str) -> StorageResult<Document> {
    let users = db.user();
    if let Some(existing) = users.find_unique(FindUniqueArgs::by_key("email", email)).await? {
        return Ok(existing);
    }
    match users.create(data(json!({"email": email}))).await {
        Err(e) if e.is_duplicate_key() => Ok(users
            .find_unique(FindUniqueArgs::by_key("email", email))
            .await?
            .expect("winner is visible")),
        other => other,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_email() {
    let db = database().await;

    let attempts: Vec<_> = (0..2)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.user()
                    .create(data(json!({"email": "race@ward.example", "name": format!("Attempt {}", i)})))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) if e.is_duplicate_key() => duplicates += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(db.user().count(Filter::eq("email", "race@ward.example")).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_if_missing_settles_on_one_document() {
    let db = database().await;

    let racers: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { user_by_email(&db, "shared@ward.example").await })
        })
        .collect();

    let mut ids = Vec::new();
    for racer in racers {
        let user = racer.await.unwrap().unwrap();
        ids.push(user["id"].clone());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let db = database().await;
    let item = db
        .inventory()
        .create(data(json!({"name": "Gloves", "quantity": 0})))
        .await
        .unwrap();
    let id = item["id"].as_str().unwrap().to_string();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let db = db.clone();
            let id = id.clone();
            tokio::spawn(async move {
                db.inventory()
                    .update(hms_persistence::types::UpdateArgs::new(
                        hms_persistence::types::UniqueWhere::id(id),
                        hms_persistence::types::UpdateData::new().increment("quantity", 1),
                    ))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let item = db
        .inventory()
        .find_unique(FindUniqueArgs::by_id(&id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item["quantity"], json!(20));
}
