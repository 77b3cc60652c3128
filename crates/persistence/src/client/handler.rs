//! Per-entity query handler.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::Database;
use crate::core::FindOptions;
use crate::error::{StorageResult, ValidationError};
use crate::id::{
    ID_FIELD, INTERNAL_ID_FIELD, canonical_reference, internal_id_value, new_internal_id,
};
use crate::normalize::normalize;
use crate::resolver::Resolver;
use crate::schema::Entity;
use crate::types::{
    CreateArgs, Document, FieldUpdate, Filter, FindManyArgs, FindUniqueArgs, Shape, UniqueWhere,
    UpdateArgs, UpdateData,
};

/// Creation timestamp field.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Update timestamp field.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// The relational-style operations on one entity's collection.
///
/// Every document returned is normalized (string `id`, no `_id`), at every
/// depth. Absence is `None` or an empty `Vec`, never an error, and a
/// malformed identifier in the criteria simply matches nothing.
///
/// Obtained from [`Database::entity`] or one of its per-entity shortcuts.
#[derive(Debug, Clone, Copy)]
pub struct EntityHandler<'a> {
    db: &'a Database,
    entity: Entity,
}

impl<'a> EntityHandler<'a> {
    pub(super) fn new(db: &'a Database, entity: Entity) -> Self {
        Self { db, entity }
    }

    /// The entity this handler operates on.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    fn collection(&self) -> &'static str {
        self.entity.collection()
    }

    /// Finds a document by identifier or natural key.
    ///
    /// When the criteria carry an `id`, it takes priority over every other
    /// criterion.
    pub async fn find_unique(&self, args: FindUniqueArgs) -> StorageResult<Option<Document>> {
        Resolver::validate(self.entity, &args.shape)?;
        let filter = args.criteria.to_filter();
        if filter.is_unsatisfiable() {
            debug!(entity = %self.entity, "find_unique criteria match nothing");
            return Ok(None);
        }

        debug!(entity = %self.entity, ?filter, "find_unique");
        match self.db.store().find_one(self.collection(), &filter).await? {
            Some(raw) => Ok(Some(self.db.resolver().shape(self.entity, raw, &args.shape).await?)),
            None => Ok(None),
        }
    }

    /// Finds the first document matching the arguments, after sorting.
    pub async fn find_first(&self, args: FindManyArgs) -> StorageResult<Option<Document>> {
        let args = FindManyArgs {
            take: Some(args.take.map_or(1, |take| take.min(1))),
            ..args
        };
        Ok(self.find_many(args).await?.into_iter().next())
    }

    /// Finds every document matching the filter.
    ///
    /// Sorting happens in the store, strictly before `skip` and `take`.
    pub async fn find_many(&self, args: FindManyArgs) -> StorageResult<Vec<Document>> {
        Resolver::validate(self.entity, &args.shape)?;
        if args.filter.is_unsatisfiable() || args.take == Some(0) {
            return Ok(Vec::new());
        }

        let options = FindOptions::new()
            .with_sort(args.order_by.clone())
            .with_skip(args.skip)
            .with_limit(args.take);
        debug!(entity = %self.entity, filter = ?args.filter, ?options, "find_many");
        let raws = self
            .db
            .store()
            .find(self.collection(), &args.filter, &options)
            .await?;
        self.db
            .resolver()
            .shape_many(self.entity, raws, &args.shape)
            .await
    }

    /// Inserts a new document and returns it.
    ///
    /// A fresh identifier is assigned, create-time defaults fill in missing
    /// fields, enumerated fields are validated, and `createdAt`/`updatedAt`
    /// are stamped unless supplied. Foreign keys are stored in canonical
    /// lowercase form.
    ///
    /// Once the document is written the call succeeds: if the store becomes
    /// unavailable while included relations are fetched, the created document
    /// is returned without them.
    ///
    /// # Errors
    ///
    /// * `ValidationError::ImmutableField` - the data carries an identifier
    /// * `ValidationError::InvalidEnumValue` - an enumerated field is out of domain
    /// * `ConstraintError::DuplicateKey` - a unique key already holds the value
    pub async fn create(&self, args: CreateArgs) -> StorageResult<Document> {
        Resolver::validate(self.entity, &args.shape)?;
        let mut data = args.data;
        reject_identifier(data.keys().map(String::as_str))?;
        self.entity.apply_defaults(&mut data);
        self.entity.validate_document(&data)?;
        for field in self.entity.foreign_keys() {
            if let Some(value) = data.get_mut(field) {
                *value = canonical_reference(value.take());
            }
        }

        let now = timestamp();
        data.entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(now.clone()));
        data.entry(UPDATED_AT_FIELD).or_insert_with(|| Value::String(now));

        let id = new_internal_id();
        data.insert(INTERNAL_ID_FIELD.to_string(), internal_id_value(&id));

        debug!(entity = %self.entity, id = %id, "create");
        self.db
            .store()
            .insert_one(self.collection(), data.clone())
            .await?;
        match self.db.resolver().shape(self.entity, data.clone(), &args.shape).await {
            Err(e) if e.is_unavailable() => {
                warn!(entity = %self.entity, id = %id, error = %e, "Created; relations omitted");
                let bare = Shape {
                    select: args.shape.select.clone(),
                    ..Shape::default()
                };
                self.db.resolver().shape(self.entity, data, &bare).await
            }
            shaped => shaped,
        }
    }

    /// Applies a partial merge to one document and returns it as updated.
    ///
    /// Returns `None` when nothing matched. Fields not named in the data
    /// are preserved; `updatedAt` is refreshed.
    pub async fn update(&self, args: UpdateArgs) -> StorageResult<Option<Document>> {
        Resolver::validate(self.entity, &args.shape)?;
        let data = self.prepare_update(args.data)?;
        let filter = args.criteria.to_filter();
        if filter.is_unsatisfiable() {
            return Ok(None);
        }

        debug!(entity = %self.entity, ?filter, "update");
        match self
            .db
            .store()
            .update_one(self.collection(), &filter, &data)
            .await?
        {
            Some(raw) => Ok(Some(self.db.resolver().shape(self.entity, raw, &args.shape).await?)),
            None => Ok(None),
        }
    }

    /// Applies a partial merge to every matching document and returns how
    /// many matched.
    pub async fn update_many(&self, filter: Filter, data: UpdateData) -> StorageResult<u64> {
        let data = self.prepare_update(data)?;
        if filter.is_unsatisfiable() {
            return Ok(0);
        }
        debug!(entity = %self.entity, ?filter, "update_many");
        self.db
            .store()
            .update_many(self.collection(), &filter, &data)
            .await
    }

    /// Removes one document and returns it as it was before deletion.
    pub async fn delete(&self, criteria: UniqueWhere) -> StorageResult<Option<Document>> {
        let filter = criteria.to_filter();
        if filter.is_unsatisfiable() {
            return Ok(None);
        }
        debug!(entity = %self.entity, ?filter, "delete");
        let deleted = self
            .db
            .store()
            .delete_one(self.collection(), &filter)
            .await?;
        Ok(deleted.map(normalize))
    }

    /// Removes every matching document and returns how many were removed.
    pub async fn delete_many(&self, filter: Filter) -> StorageResult<u64> {
        if filter.is_unsatisfiable() {
            return Ok(0);
        }
        debug!(entity = %self.entity, ?filter, "delete_many");
        self.db.store().delete_many(self.collection(), &filter).await
    }

    /// Counts matching documents. `Filter::All` counts the collection.
    pub async fn count(&self, filter: Filter) -> StorageResult<u64> {
        if filter.is_unsatisfiable() {
            return Ok(0);
        }
        self.db.store().count(self.collection(), &filter).await
    }

    fn prepare_update(&self, mut data: UpdateData) -> StorageResult<UpdateData> {
        reject_identifier(data.iter().map(|(field, _)| field))?;
        for field in self.entity.foreign_keys() {
            if let Some(FieldUpdate::Set(value)) = data.get(field) {
                let canonical = canonical_reference(value.clone());
                data.push(field, FieldUpdate::Set(canonical));
            }
        }
        for (field, change) in data.iter() {
            if let FieldUpdate::Set(value) = change {
                self.entity.validate_field(field, value)?;
            } else if self.entity.has_enum_domain(field) {
                return Err(ValidationError::InvalidEnumValue {
                    entity: self.entity.name().to_string(),
                    field: field.to_string(),
                    value: "increment".to_string(),
                }
                .into());
            }
        }
        data.push(UPDATED_AT_FIELD, FieldUpdate::Set(Value::String(timestamp())));
        Ok(data)
    }
}

fn reject_identifier<'f>(mut fields: impl Iterator<Item = &'f str>) -> Result<(), ValidationError> {
    match fields.find(|f| *f == ID_FIELD || *f == INTERNAL_ID_FIELD) {
        Some(field) => Err(ValidationError::ImmutableField {
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

/// Current time as stored in timestamp fields: RFC 3339, milliseconds, UTC.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
