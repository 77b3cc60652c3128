//! Hospital fixtures.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use hms_persistence::backends::memory::MemoryStore;
use hms_persistence::client::Database;
use hms_persistence::types::{CreateArgs, Document};

/// Identifiers of a small seeded ward.
#[derive(Debug, Clone)]
pub struct Ward {
    /// Admin user.
    pub admin_user: String,
    /// Doctor's user account.
    pub doctor_user: String,
    /// Doctor profile.
    pub doctor: String,
    /// Patient's user account.
    pub patient_user: String,
    /// Patient profile.
    pub patient: String,
}

/// A fresh in-memory database with its unique indexes in place.
pub async fn database() -> Database {
    let db = Database::in_memory();
    db.initialize().await.expect("initialize");
    db
}

/// A database over a store whose every call takes `latency`.
pub async fn slow_database(latency: Duration) -> (Database, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new().with_latency(latency));
    let db = Database::new(store.clone());
    db.initialize().await.expect("initialize");
    (db, store)
}

/// Create arguments from a JSON object literal.
pub fn data(value: Value) -> CreateArgs {
    CreateArgs::from_value(value).expect("object literal")
}

/// The `id` of a returned document.
pub fn id_of(doc: &Document) -> String {
    doc["id"].as_str().expect("string id").to_string()
}

/// Seeds one admin, one doctor and one patient.
pub async fn seed_ward(db: &Database) -> Ward {
    let admin = db
        .user()
        .create(data(json!({"email": "admin@ward.example", "name": "Admin", "role": "ADMIN"})))
        .await
        .expect("admin");
    let doctor_user = db
        .user()
        .create(data(json!({"email": "okafor@ward.example", "name": "Dr. Okafor", "role": "DOCTOR"})))
        .await
        .expect("doctor user");
    let doctor = db
        .doctor()
        .create(data(json!({"userId": doctor_user["id"], "specialization": "Cardiology"})))
        .await
        .expect("doctor");
    let patient_user = db
        .user()
        .create(data(json!({"email": "ada@ward.example", "name": "Ada", "role": "PATIENT"})))
        .await
        .expect("patient user");
    let patient = db
        .patient()
        .create(data(json!({"userId": patient_user["id"], "name": "Ada", "age": 34})))
        .await
        .expect("patient");

    Ward {
        admin_user: id_of(&admin),
        doctor_user: id_of(&doctor_user),
        doctor: id_of(&doctor),
        patient_user: id_of(&patient_user),
        patient: id_of(&patient),
    }
}

/// Books an appointment for the ward's patient with its doctor.
pub async fn book(db: &Database, ward: &Ward, starts_at: &str) -> Document {
    db.appointment()
        .create(data(json!({
            "patientId": ward.patient,
            "doctorId": ward.doctor,
            "startsAt": starts_at,
            "reason": "Checkup"
        })))
        .await
        .expect("appointment")
}

/// Returns `true` if no object anywhere in `value` carries `_id`, and every
/// object carrying an identifier exposes it as a string `id`.
pub fn normalized_everywhere(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            !map.contains_key("_id")
                && map.get("id").is_none_or(Value::is_string)
                && map.values().all(normalized_everywhere)
        }
        Value::Array(items) => items.iter().all(normalized_everywhere),
        _ => true,
    }
}
