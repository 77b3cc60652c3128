//! Document-store backend implementations.
//!
//! Each backend implements [`DocumentStore`](crate::core::DocumentStore).
//! The in-memory backend is always available; the others are gated behind
//! feature flags.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (always) | In-process store for tests and local runs |
//! | MongoDB | `mongodb` | Production document store, lazily connected pooled client |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "mongodb")]
//! use hms_persistence::backends::mongodb::MongoStore;
//! # #[cfg(feature = "mongodb")]
//! use hms_persistence::config::StoreConfig;
//!
//! # #[cfg(feature = "mongodb")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // No connection is made until the first operation.
//! let store = MongoStore::new(StoreConfig::default());
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;
