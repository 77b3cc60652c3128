//! Demo ward seeding.

use anyhow::Context;
use hms_events::{NewNotification, Notifier};
use hms_persistence::Database;
use hms_persistence::types::{CreateArgs, Document, FindUniqueArgs};
use serde_json::{Value, json};
use tracing::info;

/// What `seed` inserted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Users created (accounts that already existed are reused).
    pub users: usize,
    /// Other documents created.
    pub documents: usize,
}

/// Inserts a small demo ward: an admin, a doctor with availability, a
/// patient with appointments and a bill, and some inventory.
///
/// Users are looked up by email first, so seeding twice does not fail on
/// the unique email index.
pub async fn seed(db: &Database, notifier: &Notifier) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    let admin = user(db, &mut report, "admin@ward.example", "Ward Admin", "ADMIN").await?;
    let doctor_user = user(db, &mut report, "okafor@ward.example", "Dr. Okafor", "DOCTOR").await?;
    let patient_user = user(db, &mut report, "ada@ward.example", "Ada Byron", "PATIENT").await?;

    let doctor = profile(
        db,
        &mut report,
        "doctor",
        json!({"userId": id(&doctor_user)?, "specialization": "Cardiology", "phone": "555-0101"}),
    )
    .await?;
    let patient = profile(
        db,
        &mut report,
        "patient",
        json!({"userId": id(&patient_user)?, "age": 34, "gender": "F", "bloodGroup": "O+"}),
    )
    .await?;

    for (day, reason) in [(3, "Chest pain follow-up"), (10, "ECG review"), (17, "Routine checkup")] {
        db.appointment()
            .create(args(json!({
                "patientId": id(&patient)?,
                "doctorId": id(&doctor)?,
                "startsAt": format!("2024-09-{:02}T09:30:00.000Z", day),
                "reason": reason
            }))?)
            .await?;
        report.documents += 1;
    }

    for weekday in ["MONDAY", "WEDNESDAY", "FRIDAY"] {
        db.availability()
            .create(args(json!({
                "doctorId": id(&doctor)?,
                "dayOfWeek": weekday,
                "startTime": "09:00",
                "endTime": "17:00"
            }))?)
            .await?;
        report.documents += 1;
    }

    db.bill()
        .create(args(json!({
            "patientId": id(&patient)?,
            "amount": 180.0,
            "description": "Cardiology consultation",
            "dueDate": "2024-10-01T00:00:00.000Z"
        }))?)
        .await?;
    report.documents += 1;

    for (name, quantity, unit) in [("Gauze", 400, "pack"), ("Saline 0.9%", 60, "bag"), ("Syringe 5ml", 1200, "piece")] {
        db.inventory()
            .create(args(json!({"name": name, "quantity": quantity, "unit": unit}))?)
            .await?;
        report.documents += 1;
    }

    notifier
        .notify(
            id(&patient_user)?,
            &NewNotification::new("APPOINTMENT", "Appointments booked", "Three appointments with Dr. Okafor")
                .with_link("/appointments"),
        )
        .await?;
    notifier
        .notify_admins(&NewNotification::new("SYSTEM", "Demo ward seeded", "Demo data is ready"))
        .await?;
    report.documents += 2;

    let admin_id = id(&admin)?;
    info!(
        admin = admin_id,
        users = report.users,
        documents = report.documents,
        "Demo ward seeded"
    );
    Ok(report)
}

async fn user(
    db: &Database,
    report: &mut SeedReport,
    email: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Document> {
    if let Some(existing) = db.user().find_unique(FindUniqueArgs::by_key("email", email)).await? {
        return Ok(existing);
    }
    let created = db
        .user()
        .create(args(json!({"email": email, "name": name, "role": role}))?)
        .await?;
    report.users += 1;
    Ok(created)
}

async fn profile(db: &Database, report: &mut SeedReport, entity: &str, data: Value) -> anyhow::Result<Document> {
    let handler = db.entity(entity.parse()?);
    let user_id = data["userId"].clone();
    if let Some(existing) = handler.find_unique(FindUniqueArgs::by_key("userId", user_id)).await? {
        return Ok(existing);
    }
    let created = handler.create(args(data)?).await?;
    report.documents += 1;
    Ok(created)
}

fn args(data: Value) -> anyhow::Result<CreateArgs> {
    CreateArgs::from_value(data).context("seed data must be a JSON object")
}

fn id(doc: &Document) -> anyhow::Result<&str> {
    doc.get("id")
        .and_then(Value::as_str)
        .context("document has no id")
}
