//! Document normalizer.
//!
//! Rewrites a raw stored document into its application-facing form: the
//! internal `_id` field is removed and replaced by a string `id`. Nothing
//! else is touched. Arrays are normalized element-wise; nested objects are
//! left alone, because the resolver normalizes every relation it attaches
//! before attaching it.
//!
//! Normalization is idempotent: a document without `_id` comes back as is.
//!
//! ```
//! use hms_persistence::normalize::normalize_value;
//! use serde_json::json;
//!
//! let raw = json!({"_id": {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}, "name": "Ada"});
//! let once = normalize_value(raw);
//! assert_eq!(once, json!({"id": "65a1f0c2e4b0a1b2c3d4e5f6", "name": "Ada"}));
//! assert_eq!(normalize_value(once.clone()), once);
//! ```

use serde_json::Value;

use crate::id::{ID_FIELD, INTERNAL_ID_FIELD, id_string_from_value};
use crate::types::Document;

/// Normalizes a single document.
pub fn normalize(mut doc: Document) -> Document {
    if let Some(internal) = doc.remove(INTERNAL_ID_FIELD) {
        let id = id_string_from_value(&internal).unwrap_or_else(|| internal.to_string());
        doc.insert(ID_FIELD.to_string(), Value::String(id));
    }
    doc
}

/// Normalizes every document of a result set.
pub fn normalize_many(docs: Vec<Document>) -> Vec<Document> {
    docs.into_iter().map(normalize).collect()
}

/// Normalizes an arbitrary JSON value.
///
/// Objects are normalized, arrays are normalized element-wise, and every
/// other value (including `null`) is returned unchanged.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}

/// Returns `true` if the document exposes a string `id` and no `_id`.
pub fn is_normalized(doc: &Document) -> bool {
    !doc.contains_key(INTERNAL_ID_FIELD) && doc.get(ID_FIELD).is_some_and(Value::is_string)
}
