//! The query façade.
//!
//! [`Database`] is the one service object the application holds. It wraps
//! the process-wide document store (one pooled client, established lazily
//! by the backend) and hands out an [`EntityHandler`] per entity:
//!
//! ```
//! use hms_persistence::client::Database;
//! use hms_persistence::types::{CreateArgs, FindUniqueArgs, UniqueWhere, UpdateArgs, UpdateData};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let db = Database::in_memory();
//! db.initialize().await.unwrap();
//!
//! let patient = db
//!     .patient()
//!     .create(CreateArgs::from_value(json!({"name": "Ada", "age": 34})).unwrap())
//!     .await
//!     .unwrap();
//! let id = patient["id"].as_str().unwrap();
//!
//! db.patient()
//!     .update(UpdateArgs::new(UniqueWhere::id(id), UpdateData::new().set("disease", "flu")))
//!     .await
//!     .unwrap();
//!
//! let fetched = db.patient().find_unique(FindUniqueArgs::by_id(id)).await.unwrap().unwrap();
//! assert_eq!(fetched["age"], json!(34));
//! assert_eq!(fetched["disease"], json!("flu"));
//! # });
//! ```
//!
//! Reads spanning several documents (a root plus its relations) are not
//! transactional. A relation may reflect a later write than its root.

mod handler;

use std::sync::Arc;

pub use handler::{CREATED_AT_FIELD, EntityHandler, UPDATED_AT_FIELD, timestamp};

use crate::backends::memory::MemoryStore;
use crate::core::DocumentStore;
use crate::error::StorageResult;
use crate::resolver::Resolver;
use crate::schema::Entity;

/// Handle to the document store, shared by every entity handler.
///
/// Cheap to clone; all clones share the same store.
#[derive(Debug, Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    resolver: Resolver,
}

impl Database {
    /// Wraps a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let resolver = Resolver::new(Arc::clone(&store));
        Self { store, resolver }
    }

    /// A database over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(crate) fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Ensures the unique indexes every entity declares.
    pub async fn initialize(&self) -> StorageResult<()> {
        for entity in Entity::ALL {
            for field in entity.unique_fields() {
                self.store
                    .ensure_unique_index(entity.collection(), field)
                    .await?;
            }
        }
        tracing::info!(backend = %self.store.kind(), "Database initialized");
        Ok(())
    }

    /// Checks that the store is reachable.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.store.health_check().await
    }

    /// The handler for an entity.
    pub fn entity(&self, entity: Entity) -> EntityHandler<'_> {
        EntityHandler::new(self, entity)
    }

    /// Users.
    pub fn user(&self) -> EntityHandler<'_> {
        self.entity(Entity::User)
    }

    /// Patients.
    pub fn patient(&self) -> EntityHandler<'_> {
        self.entity(Entity::Patient)
    }

    /// Doctors.
    pub fn doctor(&self) -> EntityHandler<'_> {
        self.entity(Entity::Doctor)
    }

    /// Appointments.
    pub fn appointment(&self) -> EntityHandler<'_> {
        self.entity(Entity::Appointment)
    }

    /// Doctor availability windows.
    pub fn availability(&self) -> EntityHandler<'_> {
        self.entity(Entity::Availability)
    }

    /// Medical records.
    pub fn medical_record(&self) -> EntityHandler<'_> {
        self.entity(Entity::MedicalRecord)
    }

    /// Prescriptions.
    pub fn prescription(&self) -> EntityHandler<'_> {
        self.entity(Entity::Prescription)
    }

    /// Lab tests.
    pub fn lab_test(&self) -> EntityHandler<'_> {
        self.entity(Entity::LabTest)
    }

    /// Bills.
    pub fn bill(&self) -> EntityHandler<'_> {
        self.entity(Entity::Bill)
    }

    /// Inventory items.
    pub fn inventory(&self) -> EntityHandler<'_> {
        self.entity(Entity::Inventory)
    }

    /// Notifications.
    pub fn notification(&self) -> EntityHandler<'_> {
        self.entity(Entity::Notification)
    }
}
