//! Filter algebra.

use serde_json::Value;

use crate::id::{ID_FIELD, INTERNAL_ID_FIELD, internal_id_value, to_internal_id};

/// A `where` criterion.
///
/// Filters on the application-facing `id` field are rewritten onto the
/// internal identifier when they are built, so backends only ever see
/// `_id`. Identifier strings that are not id-shaped make the filter match
/// nothing instead of raising an error.
///
/// # Examples
///
/// ```
/// use hms_persistence::types::{Condition, Filter};
///
/// let filter = Filter::eq("status", "PENDING")
///     .and(Filter::field("startsAt", Condition::Gte("2024-01-01".into())));
/// assert!(!filter.is_unsatisfiable());
///
/// // A malformed id silently matches nothing.
/// assert!(Filter::id("not-an-id").is_unsatisfiable());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    /// Matches no document.
    Never,
    /// A condition on a single (possibly dotted) field path.
    Field { field: String, condition: Condition },
    /// All sub-filters must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
    /// The sub-filter must not match.
    Not(Box<Filter>),
}

/// A condition applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value (a missing field equals `null`).
    Equals(Value),
    /// Field differs from the value.
    NotEquals(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
    /// Field equals none of the values.
    NotIn(Vec<Value>),
    /// Field is greater than the value.
    Gt(Value),
    /// Field is greater than or equal to the value.
    Gte(Value),
    /// Field is less than the value.
    Lt(Value),
    /// Field is less than or equal to the value.
    Lte(Value),
    /// String field contains the substring.
    Contains { value: String, case_insensitive: bool },
    /// String field starts with the prefix.
    StartsWith { value: String, case_insensitive: bool },
    /// String field ends with the suffix.
    EndsWith { value: String, case_insensitive: bool },
    /// Field is present (`true`) or absent (`false`).
    Exists(bool),
}

impl Filter {
    /// A filter matching every document.
    pub fn all() -> Self {
        Filter::All
    }

    /// A condition on `field`.
    ///
    /// `id` is mapped onto the internal identifier.
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        let field = field.into();
        if field == ID_FIELD || field == INTERNAL_ID_FIELD {
            return id_filter(condition);
        }
        Filter::Field { field, condition }
    }

    /// Field equals value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Equals(value.into()))
    }

    /// Field differs from value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::NotEquals(value.into()))
    }

    /// Field equals one of the values.
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(field, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    /// Document has the given identifier.
    pub fn id(id: &str) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Document has one of the given identifiers (malformed ones are dropped).
    pub fn id_in<S: AsRef<str>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self::field(
            ID_FIELD,
            Condition::In(
                ids.into_iter()
                    .map(|id| Value::String(id.as_ref().to_string()))
                    .collect(),
            ),
        )
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Filter) -> Self {
        Filter::And(vec![self, other]).simplify()
    }

    /// Disjunction of `self` and `other`.
    pub fn or(self, other: Filter) -> Self {
        Filter::Or(vec![self, other]).simplify()
    }

    /// Negation of `self`.
    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self)).simplify()
    }

    /// Flattens nested conjunctions/disjunctions and folds `All`/`Never`.
    pub fn simplify(self) -> Self {
        match self {
            Filter::And(parts) => {
                let mut flat = Vec::with_capacity(parts.len());
                for part in parts.into_iter().map(Filter::simplify) {
                    match part {
                        Filter::All => {}
                        Filter::Never => return Filter::Never,
                        Filter::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => Filter::All,
                    1 => flat.remove(0),
                    _ => Filter::And(flat),
                }
            }
            Filter::Or(parts) => {
                let mut flat = Vec::with_capacity(parts.len());
                for part in parts.into_iter().map(Filter::simplify) {
                    match part {
                        Filter::Never => {}
                        Filter::All => return Filter::All,
                        Filter::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => Filter::Never,
                    1 => flat.remove(0),
                    _ => Filter::Or(flat),
                }
            }
            Filter::Not(inner) => match inner.simplify() {
                Filter::All => Filter::Never,
                Filter::Never => Filter::All,
                Filter::Not(double) => *double,
                other => Filter::Not(Box::new(other)),
            },
            Filter::Field {
                condition: Condition::In(values),
                ..
            } if values.is_empty() => Filter::Never,
            Filter::Field {
                condition: Condition::NotIn(values),
                ..
            } if values.is_empty() => Filter::All,
            other => other,
        }
    }

    /// Returns `true` if the filter provably matches nothing.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self.clone().simplify(), Filter::Never)
    }

    /// Returns `true` if the filter matches everything.
    pub fn is_all(&self) -> bool {
        matches!(self.clone().simplify(), Filter::All)
    }
}

// Rewrites a condition on `id` into one on `_id`, coercing every string
// through the identifier codec.
fn id_filter(condition: Condition) -> Filter {
    let coerce = |value: &Value| match value {
        Value::String(s) => to_internal_id(s).map(|oid| internal_id_value(&oid)),
        Value::Object(_) => crate::id::internal_id_from_value(value).map(|oid| internal_id_value(&oid)),
        _ => None,
    };
    let internal = |condition| Filter::Field {
        field: INTERNAL_ID_FIELD.to_string(),
        condition,
    };

    match condition {
        Condition::Equals(value) => match coerce(&value) {
            Some(oid) => internal(Condition::Equals(oid)),
            None => Filter::Never,
        },
        Condition::NotEquals(value) => match coerce(&value) {
            Some(oid) => internal(Condition::NotEquals(oid)),
            None => Filter::All,
        },
        Condition::In(values) => {
            internal(Condition::In(values.iter().filter_map(coerce).collect())).simplify()
        }
        Condition::NotIn(values) => {
            internal(Condition::NotIn(values.iter().filter_map(coerce).collect())).simplify()
        }
        Condition::Gt(value) => coerce(&value).map_or(Filter::Never, |v| internal(Condition::Gt(v))),
        Condition::Gte(value) => coerce(&value).map_or(Filter::Never, |v| internal(Condition::Gte(v))),
        Condition::Lt(value) => coerce(&value).map_or(Filter::Never, |v| internal(Condition::Lt(v))),
        Condition::Lte(value) => coerce(&value).map_or(Filter::Never, |v| internal(Condition::Lte(v))),
        Condition::Exists(present) => internal(Condition::Exists(present)),
        // Substring matching has no meaning on an opaque identifier.
        Condition::Contains { .. } | Condition::StartsWith { .. } | Condition::EndsWith { .. } => {
            Filter::Never
        }
    }
}
