//! Core storage traits and abstractions.
//!
//! - [`DocumentStore`] - the document database seam (one trait object per process)
//! - [`BackendKind`] - backend identification
//! - [`FindOptions`] - native sort/skip/limit cursor options
//!
//! # Example: Implementing a Store
//!
//! ```ignore
//! use async_trait::async_trait;
//! use hms_persistence::core::{BackendKind, DocumentStore, FindOptions};
//! use hms_persistence::error::StorageResult;
//! use hms_persistence::types::{Document, Filter};
//!
//! #[derive(Debug)]
//! struct MyStore;
//!
//! #[async_trait]
//! impl DocumentStore for MyStore {
//!     fn kind(&self) -> BackendKind {
//!         BackendKind::Custom("my-store")
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "my-store"
//!     }
//!
//!     async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
//!         todo!()
//!     }
//!
//!     // ... implement the other required methods
//! }
//! ```

pub mod backend;
pub mod store;

pub use backend::BackendKind;
pub use store::{DocumentStore, FindOptions};
