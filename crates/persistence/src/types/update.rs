//! Partial-merge update descriptors.

use serde_json::{Number, Value};

use super::Document;

/// A change to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field (setting `null` stores `null`).
    Set(Value),
    /// Add a number to the field (a missing field starts from zero).
    Increment(Number),
}

/// The fields an update touches. Unnamed fields are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateData {
    fields: Vec<(String, FieldUpdate)>,
}

impl UpdateData {
    /// No changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns every field of `doc` into a `Set`.
    pub fn from_document(doc: Document) -> Self {
        let mut data = Self::new();
        for (field, value) in doc {
            data.push(field, FieldUpdate::Set(value));
        }
        data
    }

    /// Sets a field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, FieldUpdate::Set(value.into()));
        self
    }

    /// Increments a numeric field.
    pub fn increment(mut self, field: impl Into<String>, by: impl Into<Number>) -> Self {
        self.push(field, FieldUpdate::Increment(by.into()));
        self
    }

    /// Decrements a numeric field.
    pub fn decrement(mut self, field: impl Into<String>, by: impl Into<Number>) -> Self {
        self.push(field, FieldUpdate::Increment(negate(&by.into())));
        self
    }

    /// Adds (or replaces) the change for `field`.
    pub fn push(&mut self, field: impl Into<String>, update: FieldUpdate) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = update,
            None => self.fields.push((field, update)),
        }
    }

    /// Removes the change for `field`, returning it.
    pub fn remove(&mut self, field: &str) -> Option<FieldUpdate> {
        let index = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(index).1)
    }

    /// Returns the change for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, update)| update)
    }

    /// Returns `true` if `field` is touched.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates over `(field, change)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
        self.fields.iter().map(|(name, update)| (name.as_str(), update))
    }

    /// Returns `true` if nothing changes.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Applies the changes to `doc` in place.
    ///
    /// Fails (leaving `doc` partially untouched only on the failing field)
    /// when incrementing a non-numeric value.
    pub fn apply_to(&self, doc: &mut Document) -> Result<(), String> {
        for (field, update) in &self.fields {
            match update {
                FieldUpdate::Set(value) => {
                    doc.insert(field.clone(), value.clone());
                }
                FieldUpdate::Increment(by) => {
                    let next = match doc.get(field) {
                        None | Some(Value::Null) => Value::Number(by.clone()),
                        Some(Value::Number(current)) => Value::Number(add(current, by)),
                        Some(other) => {
                            return Err(format!(
                                "cannot increment non-numeric field '{}' ({})",
                                field, other
                            ));
                        }
                    };
                    doc.insert(field.clone(), next);
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn negate(n: &Number) -> Number {
    if let Some(i) = n.as_i64() {
        return Number::from(-i);
    }
    Number::from_f64(-n.as_f64().unwrap_or(0.0)).unwrap_or_else(|| Number::from(0))
}

fn add(a: &Number, b: &Number) -> Number {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = x.checked_add(y)
    {
        return Number::from(sum);
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| Number::from(0))
}
