//! MongoDB [`DocumentStore`].

use std::fmt::Debug;
use std::sync::LazyLock;

use async_trait::async_trait;
use bson::{Document as BsonDocument, doc};
use futures_util::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use regex::Regex;
use tokio::sync::OnceCell;

use super::query_builder::{
    filter_document, from_bson_document, sort_document, to_bson_document, update_document,
};
use crate::config::StoreConfig;
use crate::core::{BackendKind, DocumentStore, FindOptions};
use crate::error::{BackendError, ConstraintError, StorageError, StorageResult};
use crate::types::{Document, Filter, UpdateData};

const BACKEND_NAME: &str = "mongodb";

const DUPLICATE_KEY_CODE: i32 = 11000;

static DUPLICATE_KEY_MESSAGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"collection: [^.\s]+\.(\S+) index: \S+ dup key: \{ ?(\w+): (.*?) ?\}").ok()
});

/// MongoDB-backed document store.
///
/// Holds one pooled client for the whole process. The client is built on
/// first use, not at construction, so a process can start while the
/// database is down; failed initialization is retried by the next
/// operation.
pub struct MongoStore {
    config: StoreConfig,
    client: OnceCell<Client>,
}

impl Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.config.database_name)
            .field("connected", &self.client.initialized())
            .finish_non_exhaustive()
    }
}

impl MongoStore {
    /// Creates a store. No connection is attempted yet.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn client(&self) -> StorageResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(
                    database = %self.config.database_name,
                    max_pool_size = self.config.max_pool_size,
                    "Connecting to MongoDB"
                );
                let mut options = ClientOptions::parse(&self.config.connection_string)
                    .await
                    .map_err(classify_error)?;
                options.max_pool_size = Some(self.config.max_pool_size);
                options.min_pool_size = Some(self.config.min_pool_size);
                options.connect_timeout = Some(self.config.connect_timeout());
                options.server_selection_timeout = Some(self.config.server_selection_timeout());
                options.app_name = Some(self.config.app_name.clone());
                Client::with_options(options).map_err(classify_error)
            })
            .await
    }

    async fn collection(&self, name: &str) -> StorageResult<Collection<BsonDocument>> {
        let client = self.client().await?;
        Ok(client
            .database(&self.config.database_name)
            .collection::<BsonDocument>(name))
    }
}

/// Maps a driver error onto the storage taxonomy.
///
/// Unique-index violations become `DuplicateKey`; server selection and I/O
/// failures become connectivity errors; everything else is internal.
pub fn classify_error(err: MongoError) -> StorageError {
    let classified = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            Some(duplicate_key(&write.message))
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY_CODE => {
            Some(duplicate_key(&command.message))
        }
        ErrorKind::ServerSelection { message, .. } => Some(
            BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: message.clone(),
            }
            .into(),
        ),
        ErrorKind::Io(io) => Some(
            BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: io.to_string(),
            }
            .into(),
        ),
        ErrorKind::ConnectionPoolCleared { message, .. } => Some(
            BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: message.clone(),
            }
            .into(),
        ),
        _ => None,
    };
    classified.unwrap_or_else(|| {
        BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
        .into()
    })
}

fn duplicate_key(message: &str) -> StorageError {
    let parsed = DUPLICATE_KEY_MESSAGE
        .as_ref()
        .and_then(|re| re.captures(message))
        .map(|caps| {
            (
                caps[1].to_string(),
                caps[2].to_string(),
                caps[3].trim_matches('"').to_string(),
            )
        });
    let (collection, field, value) =
        parsed.unwrap_or_else(|| (String::new(), String::new(), message.to_string()));
    ConstraintError::DuplicateKey {
        collection,
        field,
        value,
    }
    .into()
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDB
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn health_check(&self) -> StorageResult<()> {
        let client = self.client().await?;
        client
            .database(&self.config.database_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StorageResult<()> {
        // Only string values are indexed, so absent and null keys never clash.
        let mut partial = BsonDocument::new();
        partial.insert(field, doc! { "$type": "string" });
        let mut keys = BsonDocument::new();
        keys.insert(field, 1);

        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(partial)
                    .build(),
            )
            .build();
        self.collection(collection)
            .await?
            .create_index(index)
            .await
            .map_err(classify_error)?;
        tracing::debug!(collection, field, "Ensured unique index");
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let query = filter_document(filter)?;
        let found = self
            .collection(collection)
            .await?
            .find_one(query)
            .await
            .map_err(classify_error)?;
        found.map(from_bson_document).transpose()
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>> {
        // the server reads a zero limit as "no limit"
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }
        let query = filter_document(filter)?;
        let coll = self.collection(collection).await?;
        let mut action = coll.find(query);
        if !options.sort.is_empty() {
            action = action.sort(sort_document(&options.sort));
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = action.await.map_err(classify_error)?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await.map_err(classify_error)?;
        docs.into_iter().map(from_bson_document).collect()
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()> {
        let document = to_bson_document(document)?;
        self.collection(collection)
            .await?
            .insert_one(document)
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<Option<Document>> {
        let Some(changes) = update_document(update)? else {
            return self.find_one(collection, filter).await;
        };
        let query = filter_document(filter)?;
        let updated = self
            .collection(collection)
            .await?
            .find_one_and_update(query, changes)
            .return_document(ReturnDocument::After)
            .await
            .map_err(classify_error)?;
        updated.map(from_bson_document).transpose()
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateData,
    ) -> StorageResult<u64> {
        let Some(changes) = update_document(update)? else {
            return self.count(collection, filter).await;
        };
        let query = filter_document(filter)?;
        let result = self
            .collection(collection)
            .await?
            .update_many(query, changes)
            .await
            .map_err(classify_error)?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let query = filter_document(filter)?;
        let deleted = self
            .collection(collection)
            .await?
            .find_one_and_delete(query)
            .await
            .map_err(classify_error)?;
        deleted.map(from_bson_document).transpose()
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        let query = filter_document(filter)?;
        let result = self
            .collection(collection)
            .await?
            .delete_many(query)
            .await
            .map_err(classify_error)?;
        Ok(result.deleted_count)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        let query = filter_document(filter)?;
        self.collection(collection)
            .await?
            .count_documents(query)
            .await
            .map_err(classify_error)
    }
}
