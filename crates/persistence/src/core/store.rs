//! The document-store trait.
//!
//! [`DocumentStore`] is the only thing the query layer knows about the
//! database: single-collection fetches and single- or multi-document writes.
//! There are no joins here; the relation resolver stitches collections
//! together on top of this trait.

use std::fmt::Debug;

use async_trait::async_trait;

use super::BackendKind;
use crate::error::StorageResult;
use crate::types::{Document, Filter, SortDirective, UpdateData};

/// Native cursor options for a `find`.
///
/// The store applies `sort` first, then `skip`, then `limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort directives, in priority order.
    pub sort: Vec<SortDirective>,
    /// Number of leading documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// No sort, no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort directives.
    pub fn with_sort(mut self, sort: Vec<SortDirective>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the skip count.
    pub fn with_skip(mut self, skip: Option<u64>) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the limit.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

/// A schema-less document database, one collection per entity.
///
/// Raw documents carry their identifier under `_id` in extended-JSON form
/// (`{"$oid": "..."}`). Each single-document write is atomic; nothing spans
/// documents.
///
/// # Example
///
/// ```
/// use hms_persistence::backends::memory::MemoryStore;
/// use hms_persistence::core::{DocumentStore, FindOptions};
/// use hms_persistence::types::Filter;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let docs = store.find("User", &Filter::All, &FindOptions::new()).await.unwrap();
/// assert!(docs.is_empty());
/// # });
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Checks that the store is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Ensures a unique index on `field` of `collection`.
    ///
    /// Documents where the field is absent or `null` are not indexed.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StorageResult<()>;

    /// Returns the first document matching `filter`, in natural order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>>;

    /// Returns all documents matching `filter`, sorted then windowed.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>>;

    /// Inserts a document that already carries its `_id`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Constraint(DuplicateKey)` - a unique index rejected it
    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()>;

    /// Applies `update` to the first matching document and returns it as it
    /// is after the update, or `None` if nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<Option<Document>>;

    /// Applies `update` to every matching document and returns how many matched.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<u64>;

    /// Removes the first matching document and returns it.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>>;

    /// Removes every matching document and returns how many were removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;

    /// Counts matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;
}
