//! Relation resolution.
//!
//! The document store has no joins, so related documents are fetched with
//! separate single-collection lookups and attached to their parent:
//!
//! - **forward** (`BelongsTo`): the parent holds the foreign key; one point
//!   lookup by identifier
//! - **reverse** (`HasOne`, `HasMany`): the child holds a key pointing back;
//!   a lookup by that key, windowed for to-many relations
//!
//! Sibling relations of one document are fetched concurrently. A nested
//! relation is fetched only after its parent has been found. Every attached
//! document is normalized, at every depth.
//!
//! A to-one relation that resolves to nothing (no key, malformed key,
//! dangling key) is left out of the result rather than set to `null`.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::{DocumentStore, FindOptions};
use crate::error::{StorageError, StorageResult, ValidationError};
use crate::id::{ID_FIELD, id_string_from_value, internal_id_value, to_internal_id};
use crate::normalize::normalize;
use crate::schema::{Entity, Relation, RelationKind};
use crate::types::{Document, Filter, RelationArgs, Shape};

/// Fetches and attaches related documents.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Arc<dyn DocumentStore>,
}

impl Resolver {
    /// Creates a resolver over a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Checks every relation named in `shape`, at every depth, against the
    /// relation tables.
    ///
    /// Filtering, ordering and windowing are only meaningful on to-many
    /// relations and are rejected elsewhere.
    pub fn validate(entity: Entity, shape: &Shape) -> Result<(), ValidationError> {
        for (name, args) in shape.include.iter() {
            let relation = entity.require_relation(name)?;
            if !relation.kind.is_to_many() && !args.is_plain() {
                return Err(ValidationError::InvalidDescriptor {
                    path: format!("include.{}", name),
                    message: "where, orderBy, take and skip are only allowed on to-many relations"
                        .to_string(),
                });
            }
            Self::validate(relation.target, &args.shape)?;
        }
        Ok(())
    }

    /// Normalizes a raw document, attaches its relations and applies the
    /// projection.
    ///
    /// The projection is applied after relations are resolved, so foreign
    /// keys remain available to the lookups even when they are not selected.
    pub fn shape<'a>(
        &'a self,
        entity: Entity,
        raw: Document,
        shape: &'a Shape,
    ) -> BoxFuture<'a, StorageResult<Document>> {
        async move {
            let doc = normalize(raw);
            if shape.include.is_empty() {
                return Ok(project(doc, shape));
            }

            let root = &doc;
            let lookups = shape.include.iter().map(move |(name, args)| async move {
                let result = match entity.require_relation(name) {
                    Ok(relation) => self.resolve(entity, relation, root, args).await,
                    Err(e) => Err(e.into()),
                };
                (name, result)
            });
            let resolved = join_all(lookups).await;

            let mut doc = project(doc, shape);
            let mut unavailable = None;
            for (name, result) in resolved {
                match result {
                    Ok(Some(value)) => {
                        doc.insert(name.to_string(), value);
                    }
                    Ok(None) => {}
                    Err(e) if e.is_unavailable() => {
                        if unavailable.is_none() {
                            unavailable = Some(e);
                        }
                    }
                    Err(StorageError::Validation(e)) => return Err(e.into()),
                    Err(e) => {
                        warn!(
                            entity = %entity,
                            relation = %name,
                            error = %e,
                            "Relation lookup failed; relation omitted"
                        );
                    }
                }
            }

            match unavailable {
                Some(e) => Err(e),
                None => Ok(doc),
            }
        }
        .boxed()
    }

    /// Shapes a batch of raw documents, concurrently, keeping their order.
    pub async fn shape_many(
        &self,
        entity: Entity,
        raws: Vec<Document>,
        shape: &Shape,
    ) -> StorageResult<Vec<Document>> {
        if shape.include.is_empty() {
            return Ok(raws
                .into_iter()
                .map(|raw| project(normalize(raw), shape))
                .collect());
        }
        join_all(raws.into_iter().map(|raw| self.shape(entity, raw, shape)))
            .await
            .into_iter()
            .collect()
    }

    async fn resolve(
        &self,
        entity: Entity,
        relation: &Relation,
        parent: &Document,
        args: &RelationArgs,
    ) -> StorageResult<Option<Value>> {
        debug!(
            entity = %entity,
            relation = relation.name,
            target = %relation.target,
            kind = ?relation.kind,
            "Resolving relation"
        );
        match relation.kind {
            RelationKind::BelongsTo => self.resolve_forward(relation, parent, args).await,
            RelationKind::HasOne => self.resolve_reverse_one(relation, parent, args).await,
            RelationKind::HasMany => self.resolve_reverse_many(relation, parent, args).await,
        }
    }

    async fn resolve_forward(
        &self,
        relation: &Relation,
        parent: &Document,
        args: &RelationArgs,
    ) -> StorageResult<Option<Value>> {
        let Some(key) = parent
            .get(relation.foreign_key)
            .and_then(id_string_from_value)
        else {
            trace!(relation = relation.name, "No foreign key on parent");
            return Ok(None);
        };
        let filter = Filter::id(&key);
        if filter.is_unsatisfiable() {
            trace!(relation = relation.name, key = %key, "Malformed foreign key");
            return Ok(None);
        }

        let collection = relation.target.collection();
        match self.store.find_one(collection, &filter).await? {
            Some(raw) => {
                let child = self.shape(relation.target, raw, &args.shape).await?;
                Ok(Some(Value::Object(child)))
            }
            None => {
                debug!(relation = relation.name, key = %key, "Dangling foreign key");
                Ok(None)
            }
        }
    }

    async fn resolve_reverse_one(
        &self,
        relation: &Relation,
        parent: &Document,
        args: &RelationArgs,
    ) -> StorageResult<Option<Value>> {
        let Some(filter) = back_reference(relation, parent) else {
            return Ok(None);
        };
        let collection = relation.target.collection();
        match self.store.find_one(collection, &filter).await? {
            Some(raw) => {
                let child = self.shape(relation.target, raw, &args.shape).await?;
                Ok(Some(Value::Object(child)))
            }
            None => Ok(None),
        }
    }

    async fn resolve_reverse_many(
        &self,
        relation: &Relation,
        parent: &Document,
        args: &RelationArgs,
    ) -> StorageResult<Option<Value>> {
        let Some(filter) = back_reference(relation, parent) else {
            return Ok(Some(Value::Array(Vec::new())));
        };
        let filter = filter.and(args.filter.clone());
        if filter.is_unsatisfiable() || args.take == Some(0) {
            return Ok(Some(Value::Array(Vec::new())));
        }

        let options = FindOptions::new()
            .with_sort(args.order_by.clone())
            .with_skip(args.skip)
            .with_limit(args.take);
        let raws = self
            .store
            .find(relation.target.collection(), &filter, &options)
            .await?;
        trace!(relation = relation.name, count = raws.len(), "Fetched related documents");

        let children = self.shape_many(relation.target, raws, &args.shape).await?;
        Ok(Some(Value::Array(
            children.into_iter().map(Value::Object).collect(),
        )))
    }
}

// Children point back with the parent's identifier, stored either as the
// hex string or as a native identifier.
fn back_reference(relation: &Relation, parent: &Document) -> Option<Filter> {
    let id = parent.get(ID_FIELD).and_then(Value::as_str)?;
    let oid = to_internal_id(id)?;
    Some(Filter::is_in(
        relation.foreign_key,
        [Value::String(oid.to_hex()), internal_id_value(&oid)],
    ))
}

fn project(doc: Document, shape: &Shape) -> Document {
    match &shape.select {
        Some(mask) => mask.apply(doc),
        None => doc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryStore;
    use crate::id::new_internal_id;
    use crate::types::{FieldMask, Include, SortDirective};
    use serde_json::json;

    fn raw(id: &str, value: Value) -> Document {
        let mut doc = value.as_object().cloned().unwrap();
        doc.insert("_id".to_string(), json!({"$oid": id}));
        doc
    }

    fn hex() -> String {
        new_internal_id().to_hex()
    }

    #[tokio::test]
    async fn test_forward_relation_is_attached_and_normalized() {
        let store = Arc::new(MemoryStore::new());
        let (doctor, user) = (hex(), hex());
        store.insert_raw("User", [raw(&user, json!({"name": "Dr. Okafor"}))]);
        store.insert_raw("Doctor", [raw(&doctor, json!({"userId": user}))]);
        let resolver = Resolver::new(store.clone());

        let shape = Shape {
            select: None,
            include: Include::new().relation("user"),
        };
        let doc = resolver
            .shape(Entity::Doctor, raw(&doctor, json!({"userId": user})), &shape)
            .await
            .unwrap();

        assert_eq!(doc["id"], json!(doctor));
        assert_eq!(doc["user"]["id"], json!(user));
        assert_eq!(doc["user"]["name"], json!("Dr. Okafor"));
        assert!(!doc["user"].as_object().unwrap().contains_key("_id"));
    }

    #[tokio::test]
    async fn test_malformed_foreign_key_omits_relation() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(store);
        let shape = Shape {
            select: None,
            include: Include::new().relation("user"),
        };
        let doc = resolver
            .shape(Entity::Doctor, raw(&hex(), json!({"userId": "nope"})), &shape)
            .await
            .unwrap();
        assert!(!doc.contains_key("user"));
    }

    #[tokio::test]
    async fn test_reverse_many_is_windowed() {
        let store = Arc::new(MemoryStore::new());
        let patient = hex();
        for day in 1..=7 {
            store.insert_raw(
                "Appointment",
                [raw(
                    &hex(),
                    json!({"patientId": patient, "startsAt": format!("2024-03-0{}", day)}),
                )],
            );
        }
        let resolver = Resolver::new(store);
        let shape = Shape {
            select: Some(FieldMask::from_fields(["name"])),
            include: Include::new().with(
                "appointments",
                RelationArgs::new()
                    .with_sort(SortDirective::desc("startsAt"))
                    .with_take(2),
            ),
        };
        let doc = resolver
            .shape(Entity::Patient, raw(&patient, json!({"name": "Ada"})), &shape)
            .await
            .unwrap();

        let days: Vec<_> = doc["appointments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["startsAt"].clone())
            .collect();
        assert_eq!(days, vec![json!("2024-03-07"), json!("2024-03-06")]);
        // closed-world projection keeps only selected scalars plus relations
        assert_eq!(doc.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let resolver = Resolver::new(store);
        let shape = Shape {
            select: None,
            include: Include::new().relation("user"),
        };
        let err = resolver
            .shape(Entity::Doctor, raw(&hex(), json!({"userId": hex()})), &shape)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_take_zero_skips_the_lookup() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let resolver = Resolver::new(store);
        let shape = Shape {
            select: None,
            include: Include::new().with("appointments", RelationArgs::new().with_take(0)),
        };
        let doc = resolver
            .shape(Entity::Patient, raw(&hex(), json!({"name": "Ada"})), &shape)
            .await
            .unwrap();
        assert_eq!(doc["appointments"], json!([]));
    }

    #[test]
    fn test_validate_rejects_windowing_on_to_one_relation() {
        let shape = Shape {
            select: None,
            include: Include::new().with("doctor", RelationArgs::new().with_take(1)),
        };
        let err = Resolver::validate(Entity::Appointment, &shape).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDescriptor { .. }));

        let plain = Shape {
            select: None,
            include: Include::new().with(
                "doctor",
                RelationArgs::new().with_include(Include::new().relation("user")),
            ),
        };
        assert!(Resolver::validate(Entity::Appointment, &plain).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_nested_relation() {
        let shape = Shape {
            select: None,
            include: Include::new().with(
                "doctor",
                RelationArgs::new().with_include(Include::new().relation("ward")),
            ),
        };
        let err = Resolver::validate(Entity::Appointment, &shape).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownRelation { .. }));
    }
}
