//! Filter evaluation and value ordering for the in-memory store.
//!
//! Semantics follow the document databases the layer targets: a missing
//! field equals `null`, equality against an array field matches any
//! element, and range comparisons only match values of the same type
//! bracket.

use std::cmp::Ordering;

use serde_json::Value;

use crate::id::internal_id_from_value;
use crate::types::{Condition, Document, Filter, SortDirective};

/// Returns `true` if `doc` satisfies `filter`.
pub(crate) fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Never => false,
        Filter::Field { field, condition } => matches_condition(lookup(doc, field), condition),
        Filter::And(parts) => parts.iter().all(|part| matches(doc, part)),
        Filter::Or(parts) => parts.iter().any(|part| matches(doc, part)),
        Filter::Not(inner) => !matches(doc, inner),
    }
}

/// Resolves a dotted path. Returns `None` if any segment is missing.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn matches_condition(value: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Equals(expected) => equals(value, expected),
        Condition::NotEquals(expected) => !equals(value, expected),
        Condition::In(candidates) => candidates.iter().any(|c| equals(value, c)),
        Condition::NotIn(candidates) => !candidates.iter().any(|c| equals(value, c)),
        Condition::Gt(bound) => any_compares(value, bound, |o| o == Ordering::Greater),
        Condition::Gte(bound) => any_compares(value, bound, |o| o != Ordering::Less),
        Condition::Lt(bound) => any_compares(value, bound, |o| o == Ordering::Less),
        Condition::Lte(bound) => any_compares(value, bound, |o| o != Ordering::Greater),
        Condition::Contains {
            value: needle,
            case_insensitive,
        } => any_string(value, |s| fold(s, *case_insensitive).contains(&fold(needle, *case_insensitive))),
        Condition::StartsWith {
            value: prefix,
            case_insensitive,
        } => any_string(value, |s| {
            fold(s, *case_insensitive).starts_with(&fold(prefix, *case_insensitive))
        }),
        Condition::EndsWith {
            value: suffix,
            case_insensitive,
        } => any_string(value, |s| {
            fold(s, *case_insensitive).ends_with(&fold(suffix, *case_insensitive))
        }),
        Condition::Exists(present) => value.is_some() == *present,
    }
}

fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(actual) => {
            values_equal(actual, expected)
                || matches!(actual, Value::Array(items) if items.iter().any(|i| values_equal(i, expected)))
        }
    }
}

fn any_compares(value: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = value else {
        return false;
    };
    let check = |v: &Value| type_rank(v) == type_rank(bound) && accept(compare_values(v, bound));
    match value {
        Value::Array(items) if !bound.is_array() => items.iter().any(check),
        other => check(other),
    }
}

fn any_string(value: Option<&Value>, accept: impl Fn(&str) -> bool) -> bool {
    match value {
        Some(Value::String(s)) => accept(s),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(accept),
        _ => false,
    }
}

fn fold(s: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

/// Structural equality with numeric widening and identifier folding.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Object(_), Value::Object(_)) => {
            match (internal_id_from_value(a), internal_id_from_value(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

// Cross-type ordering bracket. Identifiers sort after plain objects.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) if internal_id_from_value(value).is_some() => 5,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 6,
    }
}

/// Total order over JSON values.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Value::Object(_), Value::Object(_)) => {
            match (internal_id_from_value(a), internal_id_from_value(b)) {
                (Some(x), Some(y)) => x.bytes().cmp(&y.bytes()),
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
        _ => Ordering::Equal,
    }
}

/// Compares two documents under a list of sort directives.
pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &[SortDirective]) -> Ordering {
    for directive in sort {
        let field = directive.store_field();
        let left = lookup(a, field).unwrap_or(&Value::Null);
        let right = lookup(b, field).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right);
        let ordering = if directive.is_descending() {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_field_equals_null() {
        let d = doc(json!({"name": "Ada"}));
        assert!(matches(&d, &Filter::eq("phone", Value::Null)));
        assert!(!matches(&d, &Filter::eq("phone", "555")));
        assert!(matches(&d, &Filter::ne("phone", "555")));
    }

    #[test]
    fn test_numeric_equality_widens() {
        let d = doc(json!({"age": 34}));
        assert!(matches(&d, &Filter::eq("age", 34.0)));
        assert!(matches(&d, &Filter::field("age", Condition::Gt(json!(30)))));
        assert!(!matches(&d, &Filter::field("age", Condition::Gt(json!("30")))));
    }

    #[test]
    fn test_array_field_matches_any_element() {
        let d = doc(json!({"tags": ["flu", "fever"]}));
        assert!(matches(&d, &Filter::eq("tags", "flu")));
        assert!(matches(&d, &Filter::is_in("tags", ["cold", "fever"])));
    }

    #[test]
    fn test_dotted_path() {
        let d = doc(json!({"address": {"city": "Lagos"}}));
        assert!(matches(&d, &Filter::eq("address.city", "Lagos")));
        assert!(matches(&d, &Filter::field("address.zip", Condition::Exists(false))));
    }

    #[test]
    fn test_string_conditions() {
        let d = doc(json!({"email": "Ada@Example.com"}));
        let ci = Filter::field(
            "email",
            Condition::Contains {
                value: "example".to_string(),
                case_insensitive: true,
            },
        );
        let cs = Filter::field(
            "email",
            Condition::StartsWith {
                value: "ada".to_string(),
                case_insensitive: false,
            },
        );
        assert!(matches(&d, &ci));
        assert!(!matches(&d, &cs));
    }

    #[test]
    fn test_identifier_equality_ignores_hex_case() {
        let a = json!({"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"});
        let b = json!({"$oid": "65A1F0C2E4B0A1B2C3D4E5F6"});
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn test_sort_puts_missing_first_ascending() {
        let a = doc(json!({"startsAt": "2024-02-01"}));
        let b = doc(json!({}));
        let asc = [SortDirective::asc("startsAt")];
        let desc = [SortDirective::desc("startsAt")];
        assert_eq!(compare_documents(&a, &b, &asc), Ordering::Greater);
        assert_eq!(compare_documents(&a, &b, &desc), Ordering::Less);
    }
}
