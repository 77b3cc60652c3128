//! In-memory backend.
//!
//! Always compiled. It backs the test suites and the `memory` backend of the
//! `hms` binary, and follows the same query semantics as the MongoDB
//! backend: missing fields equal `null`, range comparisons stay within one
//! type bracket, unique indexes are sparse.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hms_persistence::backends::memory::MemoryStore;
//! use hms_persistence::core::DocumentStore;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! assert!(store.health_check().await.is_ok());
//!
//! store.set_online(false);
//! assert!(store.health_check().await.unwrap_err().is_unavailable());
//! # });
//! ```

mod matcher;
mod store;

pub use store::MemoryStore;
