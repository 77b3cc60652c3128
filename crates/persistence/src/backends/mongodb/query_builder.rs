//! Translation of filters, sorts and updates into MongoDB documents.

use bson::{Bson, Document as BsonDocument, doc};
use serde_json::Value;

use crate::error::{BackendError, StorageResult};
use crate::types::{Condition, Document, Filter, FieldUpdate, SortDirective, UpdateData};

/// Converts a JSON value (extended JSON for identifiers) into BSON.
pub(crate) fn to_bson(value: &Value) -> StorageResult<Bson> {
    Bson::try_from(value.clone()).map_err(|e| {
        BackendError::SerializationError {
            message: format!("cannot convert {} to BSON: {}", value, e),
        }
        .into()
    })
}

/// Converts a raw JSON document into a BSON document.
pub(crate) fn to_bson_document(document: Document) -> StorageResult<BsonDocument> {
    match to_bson(&Value::Object(document))? {
        Bson::Document(doc) => Ok(doc),
        other => Err(BackendError::SerializationError {
            message: format!("expected a document, got {:?}", other.element_type()),
        }
        .into()),
    }
}

/// Converts a BSON document back into JSON, identifiers as `{"$oid": ...}`.
pub(crate) fn from_bson_document(document: BsonDocument) -> StorageResult<Document> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::SerializationError {
            message: format!("expected an object, got {}", other),
        }
        .into()),
    }
}

/// Builds a query document.
pub(crate) fn filter_document(filter: &Filter) -> StorageResult<BsonDocument> {
    Ok(match filter {
        Filter::All => doc! {},
        Filter::Never => doc! { "_id": { "$in": [] } },
        Filter::Field { field, condition } => {
            let mut query = BsonDocument::new();
            query.insert(field.clone(), condition_document(condition)?);
            query
        }
        Filter::And(parts) if parts.is_empty() => doc! {},
        Filter::And(parts) => doc! { "$and": clauses(parts)? },
        Filter::Or(parts) if parts.is_empty() => doc! { "_id": { "$in": [] } },
        Filter::Or(parts) => doc! { "$or": clauses(parts)? },
        Filter::Not(inner) => doc! { "$nor": vec![filter_document(inner)?] },
    })
}

fn clauses(parts: &[Filter]) -> StorageResult<Vec<BsonDocument>> {
    parts.iter().map(filter_document).collect()
}

fn condition_document(condition: &Condition) -> StorageResult<BsonDocument> {
    let values = |vs: &[Value]| vs.iter().map(to_bson).collect::<StorageResult<Vec<_>>>();
    Ok(match condition {
        Condition::Equals(v) => doc! { "$eq": to_bson(v)? },
        Condition::NotEquals(v) => doc! { "$ne": to_bson(v)? },
        Condition::In(vs) => doc! { "$in": values(vs)? },
        Condition::NotIn(vs) => doc! { "$nin": values(vs)? },
        Condition::Gt(v) => doc! { "$gt": to_bson(v)? },
        Condition::Gte(v) => doc! { "$gte": to_bson(v)? },
        Condition::Lt(v) => doc! { "$lt": to_bson(v)? },
        Condition::Lte(v) => doc! { "$lte": to_bson(v)? },
        Condition::Contains {
            value,
            case_insensitive,
        } => regex(regex::escape(value), *case_insensitive),
        Condition::StartsWith {
            value,
            case_insensitive,
        } => regex(format!("^{}", regex::escape(value)), *case_insensitive),
        Condition::EndsWith {
            value,
            case_insensitive,
        } => regex(format!("{}$", regex::escape(value)), *case_insensitive),
        Condition::Exists(present) => doc! { "$exists": *present },
    })
}

fn regex(pattern: String, case_insensitive: bool) -> BsonDocument {
    let options = if case_insensitive { "i" } else { "" };
    doc! { "$regex": pattern, "$options": options }
}

/// Builds a sort document, mapping `id` onto `_id`.
pub(crate) fn sort_document(sort: &[SortDirective]) -> BsonDocument {
    let mut document = BsonDocument::new();
    for directive in sort {
        let direction = if directive.is_descending() { -1 } else { 1 };
        document.insert(directive.store_field().to_string(), direction);
    }
    document
}

/// Builds an update document from `$set` and `$inc` parts.
///
/// Returns `None` when there is nothing to change.
pub(crate) fn update_document(update: &UpdateData) -> StorageResult<Option<BsonDocument>> {
    let mut set = BsonDocument::new();
    let mut inc = BsonDocument::new();
    for (field, change) in update.iter() {
        match change {
            FieldUpdate::Set(value) => {
                set.insert(field.to_string(), to_bson(value)?);
            }
            FieldUpdate::Increment(by) => {
                inc.insert(field.to_string(), to_bson(&Value::Number(by.clone()))?);
            }
        }
    }

    let mut document = BsonDocument::new();
    if !set.is_empty() {
        document.insert("$set", set);
    }
    if !inc.is_empty() {
        document.insert("$inc", inc);
    }
    Ok((!document.is_empty()).then_some(document))
}
