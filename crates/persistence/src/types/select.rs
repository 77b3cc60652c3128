//! Closed-world field projection.

use std::collections::BTreeSet;

use super::Document;

/// The set of fields a `select` keeps.
///
/// Projection is closed-world: a field that is not named is dropped, and
/// that includes `id`.
///
/// ```
/// use hms_persistence::types::FieldMask;
/// use serde_json::json;
///
/// let mask = FieldMask::from_fields(["name", "email"]);
/// let doc = json!({"id": "1", "name": "Ada", "email": "a@x.org", "role": "ADMIN"});
/// let projected = mask.apply(doc.as_object().unwrap().clone());
/// assert_eq!(projected.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask(BTreeSet<String>);

impl FieldMask {
    /// An empty mask (keeps nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mask from field names.
    pub fn from_fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Adds a field to the mask.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into());
        self
    }

    /// Returns `true` if the mask keeps `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    /// Iterates over the kept field names.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of kept fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the mask keeps nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops every field the mask does not name.
    pub fn apply(&self, mut doc: Document) -> Document {
        doc.retain(|key, _| self.0.contains(key));
        doc
    }
}
