//! Hospital Management System Persistence Layer
//!
//! This crate lets application code written against a relational-mapper
//! vocabulary (`findUnique`, `findMany`, `create`, `update`, `delete`,
//! `count`, with `where`, `include`, `select`, `orderBy` and `take`) run
//! unchanged against a schema-less document store.
//!
//! # Features
//!
//! - **Identifier translation**: application code sees 24-hex string `id`s;
//!   the store keeps native identifiers under `_id`
//! - **Normalization**: every returned document, at every depth, carries
//!   `id` and never `_id`
//! - **Relation resolution**: `include` is served by separate lookups, run
//!   concurrently for siblings
//! - **Typed failures**: store outages are distinguishable from absence and
//!   from unique-key violations
//!
//! # Backend Features
//!
//! - in-memory (always available) - used by tests and local runs
//! - `mongodb` - MongoDB via the official driver, one lazily-connected pool
//!
//! # Architecture
//!
//! - [`id`] - identifier codec
//! - [`normalize`] - document normalizer
//! - [`types`] - descriptor types (`where`, `include`, `select`, ...)
//! - [`schema`] - entities, relation tables, enumerated domains
//! - [`resolver`] - relation resolver
//! - [`client`] - the per-entity query façade
//! - [`descriptor`] - JSON descriptor parsing
//! - [`core`] - the document store trait
//! - [`backends`] - store implementations
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use hms_persistence::client::Database;
//! use hms_persistence::types::{CreateArgs, FindManyArgs, Filter, Include};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let db = Database::in_memory();
//! db.initialize().await.unwrap();
//!
//! let user = db
//!     .user()
//!     .create(CreateArgs::from_value(json!({"email": "okafor@ward.example", "name": "Dr. Okafor", "role": "DOCTOR"})).unwrap())
//!     .await
//!     .unwrap();
//! db.doctor()
//!     .create(CreateArgs::from_value(json!({"userId": user["id"], "specialization": "Cardiology"})).unwrap())
//!     .await
//!     .unwrap();
//!
//! let doctors = db
//!     .doctor()
//!     .find_many(
//!         FindManyArgs::new()
//!             .with_filter(Filter::eq("specialization", "Cardiology"))
//!             .with_include(Include::new().relation("user")),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(doctors[0]["user"]["name"], json!("Dr. Okafor"));
//! # });
//! ```
//!
//! # Consistency
//!
//! Relation lookups are separate reads. A document and its relations are
//! not read from a single snapshot.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod client;
pub mod config;
pub mod core;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod normalize;
pub mod principal;
pub mod resolver;
pub mod schema;
pub mod types;

// Re-export commonly used types at crate root
pub use client::{Database, EntityHandler};
pub use config::StoreConfig;
pub use descriptor::Query;
pub use error::{StorageError, StorageResult};
pub use id::InternalId;
pub use principal::Principal;
pub use schema::{Entity, Role};
pub use types::Document;

// Re-export core traits
pub use core::{BackendKind, DocumentStore, FindOptions};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
