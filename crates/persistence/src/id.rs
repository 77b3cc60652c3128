//! Identifier codec.
//!
//! Every stored document is keyed by the store's native object identifier
//! ([`InternalId`], a 12-byte ObjectId). Application code only ever sees the
//! 24-character lowercase hexadecimal string form. This module converts
//! between the two and never fails loudly: a string that is not id-shaped
//! coerces to `None`, which the query layer treats as "matches nothing".
//!
//! Inside raw documents the identifier is carried in extended-JSON form,
//! `{"$oid": "<hex>"}`, which is also how the MongoDB driver renders it.
//!
//! # Examples
//!
//! ```
//! use hms_persistence::id::{is_valid_id, to_internal_id};
//!
//! assert!(is_valid_id("65a1f0c2e4b0a1b2c3d4e5f6"));
//! assert!(to_internal_id("not-an-id").is_none());
//!
//! let oid = to_internal_id("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
//! assert_eq!(oid.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
//! ```

use serde_json::{Map, Value, json};

/// The store's native identifier type.
pub type InternalId = bson::oid::ObjectId;

/// Name of the internal identifier field in stored documents.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Name of the application-facing identifier field.
pub const ID_FIELD: &str = "id";

/// Extended-JSON key wrapping an ObjectId.
const OID_KEY: &str = "$oid";

/// Length of the hexadecimal identifier form.
const HEX_LEN: usize = 24;

/// Returns `true` if `value` has the exact shape of an identifier string.
pub fn is_valid_id(value: &str) -> bool {
    value.len() == HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Coerces a string into an [`InternalId`].
///
/// Returns `None` (never panics) for anything that is not exactly 24
/// hexadecimal characters.
pub fn to_internal_id(value: &str) -> Option<InternalId> {
    if !is_valid_id(value) {
        return None;
    }
    InternalId::parse_str(value).ok()
}

/// Generates a fresh identifier.
pub fn new_internal_id() -> InternalId {
    InternalId::new()
}

/// Renders an identifier as it is stored inside a raw document.
pub fn internal_id_value(id: &InternalId) -> Value {
    json!({ OID_KEY: id.to_hex() })
}

/// Reads the string form of an identifier out of a stored `_id` value.
///
/// Accepts the extended-JSON object form as well as a bare string, which
/// documents written by other tools sometimes carry.
pub fn id_string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => oid_hex(map).map(str::to_ascii_lowercase),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Reads an [`InternalId`] out of a stored `_id` value.
pub fn internal_id_from_value(value: &Value) -> Option<InternalId> {
    match value {
        Value::Object(map) => oid_hex(map).and_then(to_internal_id),
        Value::String(s) => to_internal_id(s),
        _ => None,
    }
}

/// Rewrites a reference to another document into the canonical string form.
///
/// Id-shaped strings (either case) and `{"$oid"}` values become the
/// lowercase hex string. Anything else is returned unchanged.
pub fn canonical_reference(value: Value) -> Value {
    match internal_id_from_value(&value) {
        Some(oid) => Value::String(oid.to_hex()),
        None => value,
    }
}

fn oid_hex(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(OID_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_id_shape() {
        assert!(is_valid_id("65a1f0c2e4b0a1b2c3d4e5f6"));
        assert!(is_valid_id("65A1F0C2E4B0A1B2C3D4E5F6"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("65a1f0c2e4b0a1b2c3d4e5f"));
        assert!(!is_valid_id("65a1f0c2e4b0a1b2c3d4e5f6a"));
        assert!(!is_valid_id("zza1f0c2e4b0a1b2c3d4e5f6"));
        // 12-byte strings are ObjectId-constructible elsewhere, but not id-shaped
        assert!(!is_valid_id("abcdefghijkl"));
    }

    #[test]
    fn test_to_internal_id_never_panics() {
        assert!(to_internal_id("undefined").is_none());
        assert!(to_internal_id("../etc/passwd").is_none());
        assert!(to_internal_id("ééééééééééééééééééééééé").is_none());
    }

    #[test]
    fn test_uppercase_hex_normalizes_to_lowercase() {
        let oid = to_internal_id("65A1F0C2E4B0A1B2C3D4E5F6").unwrap();
        assert_eq!(oid.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_internal_id_value_round_trip() {
        let oid = new_internal_id();
        let stored = internal_id_value(&oid);
        assert_eq!(stored["$oid"], Value::String(oid.to_hex()));
        assert_eq!(internal_id_from_value(&stored), Some(oid));
        assert_eq!(id_string_from_value(&stored), Some(oid.to_hex()));
    }

    #[test]
    fn test_canonical_reference() {
        let hex = "65a1f0c2e4b0a1b2c3d4e5f6";
        assert_eq!(canonical_reference(json!("65A1F0C2E4B0A1B2C3D4E5F6")), json!(hex));
        assert_eq!(canonical_reference(json!({"$oid": hex})), json!(hex));
        assert_eq!(canonical_reference(json!("legacy-key")), json!("legacy-key"));
        assert_eq!(canonical_reference(Value::Null), Value::Null);
    }

    #[test]
    fn test_id_string_from_unusual_values() {
        assert_eq!(
            id_string_from_value(&json!("legacy-key")),
            Some("legacy-key".to_string())
        );
        assert_eq!(id_string_from_value(&json!(42)), None);
        assert_eq!(id_string_from_value(&json!({"$oid": 1})), None);
        assert_eq!(
            id_string_from_value(&json!({"$oid": "65a1f0c2e4b0a1b2c3d4e5f6", "x": 1})),
            None
        );
    }
}
