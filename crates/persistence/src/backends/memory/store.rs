//! In-process [`DocumentStore`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::matcher::{compare_documents, matches, values_equal};
use crate::core::{BackendKind, DocumentStore, FindOptions};
use crate::error::{BackendError, ConstraintError, StorageError, StorageResult};
use crate::id::INTERNAL_ID_FIELD;
use crate::types::{Document, Filter, UpdateData};

const BACKEND_NAME: &str = "memory";

/// An in-process document store.
///
/// Collections are vectors of raw documents in insertion order, which is
/// the natural order `find_one` and unsorted `find` return. Every write
/// takes the single write lock, so unique-index checks and the write they
/// guard are atomic.
///
/// The store can be switched offline to exercise connectivity failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique_indexes: RwLock<HashMap<String, BTreeSet<String>>>,
    offline: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation by `latency` before it runs.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Takes the store offline (`false`) or back online (`true`).
    ///
    /// While offline every operation fails with `BackendError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
        tracing::info!(online, "Memory store availability changed");
    }

    /// Inserts raw documents without index checks. Used to plant fixtures
    /// such as dangling references.
    pub fn insert_raw(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Returns `true` if the collection is empty or missing.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    async fn enter(&self) -> StorageResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: "store is offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.unique_indexes
            .read()
            .get(collection)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }
}

// Checks `candidate` against every other document for each unique field.
// Absent and null values are not indexed.
fn check_unique(
    collection: &str,
    docs: &[Document],
    candidate: &Document,
    skip: Option<usize>,
    unique_fields: &[String],
) -> StorageResult<()> {
    for field in unique_fields {
        let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = docs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .any(|(_, other)| other.get(field).is_some_and(|o| values_equal(o, value)));
        if clash {
            return Err(duplicate(collection, field, value));
        }
    }
    Ok(())
}

fn duplicate(collection: &str, field: &str, value: &Value) -> StorageError {
    ConstraintError::DuplicateKey {
        collection: collection.to_string(),
        field: field.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
    .into()
}

fn apply_update(doc: &mut Document, update: &UpdateData) -> StorageResult<()> {
    update
        .apply_to(doc)
        .map_err(|message| BackendError::QueryError { message }.into())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.enter().await
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StorageResult<()> {
        self.enter().await?;
        let collections = self.collections.read();
        if let Some(docs) = collections.get(collection) {
            let fields = [field.to_string()];
            for (i, doc) in docs.iter().enumerate() {
                check_unique(collection, &docs[..i], doc, None, &fields)?;
            }
        }
        self.unique_indexes
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        tracing::debug!(collection, field, "Ensured unique index");
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        self.enter().await?;
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, filter)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>> {
        self.enter().await?;
        let mut found: Vec<Document> = {
            let collections = self.collections.read();
            collections
                .get(collection)
                .map(|docs| docs.iter().filter(|doc| matches(doc, filter)).cloned().collect())
                .unwrap_or_default()
        };
        if !options.sort.is_empty() {
            // stable, so ties keep natural order
            found.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()> {
        self.enter().await?;
        let mut unique_fields = self.unique_fields(collection);
        unique_fields.push(INTERNAL_ID_FIELD.to_string());

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        check_unique(collection, docs, &document, None, &unique_fields)?;
        docs.push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<Option<Document>> {
        self.enter().await?;
        let unique_fields = self.unique_fields(collection);

        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = docs.iter().position(|doc| matches(doc, filter)) else {
            return Ok(None);
        };
        let mut updated = docs[index].clone();
        apply_update(&mut updated, update)?;
        check_unique(collection, docs, &updated, Some(index), &unique_fields)?;
        docs[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<u64> {
        self.enter().await?;
        let unique_fields = self.unique_fields(collection);

        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let targets: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches(doc, filter))
            .map(|(i, _)| i)
            .collect();

        // Documents are written one at a time; a failure leaves earlier
        // ones updated.
        for &index in &targets {
            let mut updated = docs[index].clone();
            apply_update(&mut updated, update)?;
            check_unique(collection, docs, &updated, Some(index), &unique_fields)?;
            docs[index] = updated;
        }
        Ok(targets.len() as u64)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        self.enter().await?;
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|doc| matches(doc, filter))
            .map(|index| docs.remove(index)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        self.enter().await?;
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches(doc, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        self.enter().await?;
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|doc| matches(doc, filter)).count()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{internal_id_value, new_internal_id};
    use crate::types::SortDirective;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        let mut doc = value.as_object().cloned().unwrap();
        doc.insert("_id".to_string(), internal_id_value(&new_internal_id()));
        doc
    }

    // ===== CRUD =====

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let store = MemoryStore::new();
        store.insert_one("User", doc(json!({"email": "a@x.io"}))).await.unwrap();

        let found = store
            .find_one("User", &Filter::eq("email", "a@x.io"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["email"], json!("a@x.io"));
        assert!(found.contains_key("_id"));
        assert!(store.find_one("Doctor", &Filter::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_sorts_then_windows() {
        let store = MemoryStore::new();
        for day in ["03", "01", "02", "05", "04"] {
            store
                .insert_one("Appointment", doc(json!({"startsAt": format!("2024-01-{}", day)})))
                .await
                .unwrap();
        }
        let options = FindOptions::new()
            .with_sort(vec![SortDirective::desc("startsAt")])
            .with_skip(Some(1))
            .with_limit(Some(2));
        let found = store.find("Appointment", &Filter::All, &options).await.unwrap();
        let days: Vec<_> = found.iter().map(|d| d["startsAt"].as_str().unwrap()).collect();
        assert_eq!(days, vec!["2024-01-04", "2024-01-03"]);
    }

    #[tokio::test]
    async fn test_update_one_returns_post_image() {
        let store = MemoryStore::new();
        store
            .insert_one("Patient", doc(json!({"name": "Ada", "age": 33})))
            .await
            .unwrap();
        let updated = store
            .update_one(
                "Patient",
                &Filter::eq("name", "Ada"),
                &UpdateData::new().increment("age", 1),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], json!(34));
        assert_eq!(updated["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let store = MemoryStore::new();
        for read in [true, false, false] {
            store
                .insert_one("Notification", doc(json!({"read": read})))
                .await
                .unwrap();
        }
        assert_eq!(store.count("Notification", &Filter::eq("read", false)).await.unwrap(), 2);
        assert_eq!(
            store.delete_many("Notification", &Filter::eq("read", false)).await.unwrap(),
            2
        );
        assert!(store.delete_one("Notification", &Filter::eq("read", false)).await.unwrap().is_none());
        assert_eq!(store.len("Notification"), 1);
    }

    // ===== Unique indexes =====

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store.ensure_unique_index("User", "email").await.unwrap();
        store.insert_one("User", doc(json!({"email": "a@x.io"}))).await.unwrap();

        let err = store
            .insert_one("User", doc(json!({"email": "a@x.io"})))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.len("User"), 1);
    }

    #[tokio::test]
    async fn test_unique_index_is_sparse() {
        let store = MemoryStore::new();
        store.ensure_unique_index("Doctor", "userId").await.unwrap();
        store.insert_one("Doctor", doc(json!({"name": "A"}))).await.unwrap();
        store
            .insert_one("Doctor", doc(json!({"name": "B", "userId": null})))
            .await
            .unwrap();
        assert_eq!(store.len("Doctor"), 2);
    }

    #[tokio::test]
    async fn test_update_into_duplicate_is_rejected() {
        let store = MemoryStore::new();
        store.ensure_unique_index("User", "email").await.unwrap();
        store.insert_one("User", doc(json!({"email": "a@x.io"}))).await.unwrap();
        store.insert_one("User", doc(json!({"email": "b@x.io"}))).await.unwrap();

        let err = store
            .update_one(
                "User",
                &Filter::eq("email", "b@x.io"),
                &UpdateData::new().set("email", "a@x.io"),
            )
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    // ===== Availability =====

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = MemoryStore::new();
        store.set_online(false);
        let err = store.count("User", &Filter::All).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.health_check().await.is_err());

        store.set_online(true);
        assert!(store.health_check().await.is_ok());
    }
}
