//! Persist-then-publish notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use hms_persistence::client::Database;
use hms_persistence::error::StorageResult;
use hms_persistence::schema::Role;
use hms_persistence::types::{CreateArgs, Document, Filter, FindManyArgs, SortDirective};

use crate::bus::EventBus;
use crate::room::Room;

/// Name of the event published for a new notification.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Content of a notification to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Category, e.g. `APPOINTMENT` or `BILL`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional in-app link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl NewNotification {
    /// A notification without a link.
    pub fn new(kind: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: kind.into(),
            link: None,
        }
    }

    /// Attaches an in-app link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    fn to_document(&self, user_id: &str) -> Document {
        let mut doc = Document::new();
        doc.insert("userId".to_string(), Value::String(user_id.to_string()));
        doc.insert("title".to_string(), Value::String(self.title.clone()));
        doc.insert("message".to_string(), Value::String(self.message.clone()));
        doc.insert("type".to_string(), Value::String(self.kind.clone()));
        if let Some(link) = &self.link {
            doc.insert("link".to_string(), Value::String(link.clone()));
        }
        doc
    }
}

/// Stores notifications and pushes them to the recipients' sessions.
///
/// The document is stored first; the event is published only once the
/// write succeeded, so a session never sees a notification that a later
/// read cannot find.
#[derive(Debug, Clone)]
pub struct Notifier {
    db: Database,
    bus: EventBus,
}

impl Notifier {
    /// Creates a notifier.
    pub fn new(db: Database, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// The bus events are published on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Notifies one user. Returns the stored notification.
    pub async fn notify(&self, user_id: &str, notification: &NewNotification) -> StorageResult<Document> {
        let stored = self
            .db
            .notification()
            .create(CreateArgs::new(notification.to_document(user_id)))
            .await?;
        let delivered = self.bus.publish(
            &Room::User(user_id.to_string()),
            NOTIFICATION_EVENT,
            Value::Object(stored.clone()),
        );
        debug!(user_id, delivered, "Notification sent");
        Ok(stored)
    }

    /// Notifies every user holding `role`, whatever spelling their role is
    /// stored with. Returns the stored notifications.
    pub async fn notify_role(
        &self,
        role: Role,
        notification: &NewNotification,
    ) -> StorageResult<Vec<Document>> {
        let users = self
            .db
            .user()
            .find_many(
                FindManyArgs::new()
                    .with_filter(Filter::is_in("role", role.stored_variants().iter().copied()))
                    .with_sort(SortDirective::asc("id")),
            )
            .await?;

        let mut sent = Vec::with_capacity(users.len());
        for user in &users {
            if let Some(user_id) = user.get("id").and_then(Value::as_str) {
                sent.push(self.notify(user_id, notification).await?);
            }
        }
        info!(role = %role, recipients = sent.len(), "Role notification sent");
        Ok(sent)
    }

    /// Notifies every administrator.
    pub async fn notify_admins(&self, notification: &NewNotification) -> StorageResult<Vec<Document>> {
        self.notify_role(Role::Admin, notification).await
    }
}
