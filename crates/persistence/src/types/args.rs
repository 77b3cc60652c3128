//! Per-operation argument bundles.

use serde_json::Value;

use super::{Document, FieldMask, Filter, Include, SortDirective, UpdateData};
use crate::error::ValidationError;

/// How a result document is shaped: projection plus attached relations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    /// Closed-world projection of scalar fields.
    pub select: Option<FieldMask>,
    /// Relations to attach.
    pub include: Include,
}

impl Shape {
    /// Returns `true` if the shape leaves documents untouched.
    pub fn is_identity(&self) -> bool {
        self.select.is_none() && self.include.is_empty()
    }
}

/// Criteria that identify at most one document.
///
/// Exactly one style is active: when an `id` is supplied it takes priority
/// over every other criterion in the same object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueWhere {
    /// The application-facing identifier.
    pub id: Option<String>,
    /// Natural-key (or any other) criteria, used when `id` is absent.
    pub filter: Filter,
}

impl UniqueWhere {
    /// Targets a document by identifier.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            filter: Filter::All,
        }
    }

    /// Targets a document by a natural key such as `email`.
    pub fn key(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::filter(Filter::eq(field, value))
    }

    /// Targets the first document matching `filter`.
    pub fn filter(filter: Filter) -> Self {
        Self { id: None, filter }
    }

    /// The effective filter.
    pub fn to_filter(&self) -> Filter {
        match &self.id {
            Some(id) => Filter::id(id),
            None => self.filter.clone(),
        }
    }
}

/// Arguments for `find_unique`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindUniqueArgs {
    /// Which document.
    pub criteria: UniqueWhere,
    /// How to shape it.
    pub shape: Shape,
}

impl FindUniqueArgs {
    /// Looks a document up by identifier.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new(UniqueWhere::id(id))
    }

    /// Looks a document up by a natural key.
    pub fn by_key(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(UniqueWhere::key(field, value))
    }

    /// Looks a document up by arbitrary criteria.
    pub fn new(criteria: UniqueWhere) -> Self {
        Self {
            criteria,
            shape: Shape::default(),
        }
    }

    /// Projects the result.
    pub fn with_select(mut self, select: FieldMask) -> Self {
        self.shape.select = Some(select);
        self
    }

    /// Attaches relations.
    pub fn with_include(mut self, include: Include) -> Self {
        self.shape.include = include;
        self
    }
}

/// Arguments for `find_many` and `find_first`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    /// The `where` criteria.
    pub filter: Filter,
    /// Sort applied before `skip`/`take`.
    pub order_by: Vec<SortDirective>,
    /// Maximum number of documents.
    pub take: Option<u64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// How to shape each document.
    pub shape: Shape,
}

impl FindManyArgs {
    /// Matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the criteria.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a sort directive.
    pub fn with_sort(mut self, sort: SortDirective) -> Self {
        self.order_by.push(sort);
        self
    }

    /// Limits the result count.
    pub fn with_take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Skips leading results.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Projects each result.
    pub fn with_select(mut self, select: FieldMask) -> Self {
        self.shape.select = Some(select);
        self
    }

    /// Attaches relations to each result.
    pub fn with_include(mut self, include: Include) -> Self {
        self.shape.include = include;
        self
    }
}

/// Arguments for `create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateArgs {
    /// The new document's fields.
    pub data: Document,
    /// How to shape the created document.
    pub shape: Shape,
}

impl CreateArgs {
    /// Creates arguments from a document.
    pub fn new(data: Document) -> Self {
        Self {
            data,
            shape: Shape::default(),
        }
    }

    /// Creates arguments from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(data) => Ok(Self::new(data)),
            other => Err(ValidationError::InvalidDocument {
                message: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Projects the created document.
    pub fn with_select(mut self, select: FieldMask) -> Self {
        self.shape.select = Some(select);
        self
    }

    /// Attaches relations to the created document.
    pub fn with_include(mut self, include: Include) -> Self {
        self.shape.include = include;
        self
    }
}

/// Arguments for `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateArgs {
    /// Which document.
    pub criteria: UniqueWhere,
    /// The partial merge to apply.
    pub data: UpdateData,
    /// How to shape the updated document.
    pub shape: Shape,
}

impl UpdateArgs {
    /// Creates arguments.
    pub fn new(criteria: UniqueWhere, data: UpdateData) -> Self {
        Self {
            criteria,
            data,
            shape: Shape::default(),
        }
    }

    /// Projects the updated document.
    pub fn with_select(mut self, select: FieldMask) -> Self {
        self.shape.select = Some(select);
        self
    }

    /// Attaches relations to the updated document.
    pub fn with_include(mut self, include: Include) -> Self {
        self.shape.include = include;
        self
    }
}
