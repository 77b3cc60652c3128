//! Sort directives.

use serde::{Deserialize, Serialize};

use crate::id::{ID_FIELD, INTERNAL_ID_FIELD};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Descending order.
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Parses a direction keyword. Anything other than `desc` is ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Creates a directive.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    /// Descending on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Parses a sort parameter value (e.g., "-startsAt" for descending).
    pub fn parse(s: &str) -> Self {
        if let Some(stripped) = s.strip_prefix('-') {
            Self::desc(stripped)
        } else {
            Self::asc(s)
        }
    }

    /// The field name as stored (`id` sorts on the internal identifier).
    pub fn store_field(&self) -> &str {
        if self.field == ID_FIELD {
            INTERNAL_ID_FIELD
        } else {
            &self.field
        }
    }

    /// Returns `true` for descending directives.
    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Descending
    }
}
