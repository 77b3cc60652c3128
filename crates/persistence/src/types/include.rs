//! Relation include descriptors.

use super::{FieldMask, Filter, Shape, SortDirective};

/// The relations to attach to a document, by relation name.
///
/// Entries keep insertion order; adding a relation twice replaces the
/// earlier entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Include {
    relations: Vec<(String, RelationArgs)>,
}

impl Include {
    /// An empty include.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a relation.
    pub fn with(mut self, relation: impl Into<String>, args: RelationArgs) -> Self {
        self.insert(relation, args);
        self
    }

    /// Adds a relation with default arguments (the `relation: true` form).
    pub fn relation(self, relation: impl Into<String>) -> Self {
        self.with(relation, RelationArgs::new())
    }

    /// Adds (or replaces) a relation in place.
    pub fn insert(&mut self, relation: impl Into<String>, args: RelationArgs) {
        let relation = relation.into();
        match self.relations.iter_mut().find(|(name, _)| *name == relation) {
            Some(entry) => entry.1 = args,
            None => self.relations.push((relation, args)),
        }
    }

    /// Returns the arguments of a relation, if included.
    pub fn get(&self, relation: &str) -> Option<&RelationArgs> {
        self.relations
            .iter()
            .find(|(name, _)| name == relation)
            .map(|(_, args)| args)
    }

    /// Iterates over `(relation, args)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationArgs)> {
        self.relations.iter().map(|(name, args)| (name.as_str(), args))
    }

    /// Returns `true` if no relation is included.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Number of included relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }
}

/// Arguments for one included relation.
///
/// `filter`, `order_by`, `take` and `skip` only affect to-many relations;
/// a to-one relation is a single point lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationArgs {
    /// Extra criteria on the related documents.
    pub filter: Filter,
    /// Sort applied before `skip`/`take`.
    pub order_by: Vec<SortDirective>,
    /// Maximum number of related documents.
    pub take: Option<u64>,
    /// Number of related documents to skip.
    pub skip: Option<u64>,
    /// Projection and nested includes of the related documents.
    pub shape: Shape,
}

impl RelationArgs {
    /// Default arguments: every field, no nested relations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no filter, ordering or window is set.
    pub fn is_plain(&self) -> bool {
        matches!(self.filter, Filter::All)
            && self.order_by.is_empty()
            && self.take.is_none()
            && self.skip.is_none()
    }

    /// Restricts the related documents.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a sort directive.
    pub fn with_sort(mut self, sort: SortDirective) -> Self {
        self.order_by.push(sort);
        self
    }

    /// Limits the number of related documents.
    pub fn with_take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Skips related documents.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Projects the related documents.
    pub fn with_select(mut self, select: FieldMask) -> Self {
        self.shape.select = Some(select);
        self
    }

    /// Nests further relations under the related documents.
    pub fn with_include(mut self, include: Include) -> Self {
        self.shape.include = include;
        self
    }
}
