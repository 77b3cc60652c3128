//! Error types for the persistence layer.
//!
//! Absence is never an error here: a lookup that finds nothing returns
//! `None` (or an empty `Vec`), and a malformed identifier simply matches
//! nothing. What remains is split into three categories:
//!
//! - [`BackendError`] - the document store misbehaved or could not be reached
//! - [`ConstraintError`] - the store rejected a write (unique keys)
//! - [`ValidationError`] - the caller handed in something the layer cannot run

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend and connectivity errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Store-enforced constraint violations
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// Malformed descriptors and documents
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StorageError {
    /// Returns `true` if the document store could not be reached.
    ///
    /// Callers use this to render a degraded-mode message instead of a
    /// generic failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::Backend(
                BackendError::Unavailable { .. }
                    | BackendError::ConnectionFailed { .. }
                    | BackendError::Timeout { .. }
            )
        )
    }

    /// Returns `true` if a unique key rejected the write.
    ///
    /// A caller racing another "create if missing" sequence should treat this
    /// as "fetch the winner's document".
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            StorageError::Constraint(ConstraintError::DuplicateKey { .. })
        )
    }
}

/// Errors originating from the document store.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The store is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the store failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// The store did not answer in time.
    #[error("operation on {backend_name} timed out after {timeout_ms}ms")]
    Timeout { backend_name: String, timeout_ms: u64 },

    /// Internal store error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Errors raised when the store refuses a write.
#[derive(Error, Debug)]
pub enum ConstraintError {
    /// A unique key already holds the value.
    #[error("duplicate key in {collection}: {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },
}

/// Errors in caller-supplied descriptors or documents.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The descriptor does not have the expected shape.
    #[error("invalid descriptor at '{path}': {message}")]
    InvalidDescriptor { path: String, message: String },

    /// The relation is not declared on the entity.
    #[error("unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },

    /// The entity name is not known.
    #[error("unknown entity: {name}")]
    UnknownEntity { name: String },

    /// An enumerated field holds a value outside its domain.
    #[error("invalid value '{value}' for {entity}.{field}")]
    InvalidEnumValue {
        entity: String,
        field: String,
        value: String,
    },

    /// The field may not be written by callers.
    #[error("field '{field}' cannot be written")]
    ImmutableField { field: String },

    /// The document is not a JSON object (or is otherwise unusable).
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        crate::backends::mongodb::classify_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_display() {
        let err = StorageError::Constraint(ConstraintError::DuplicateKey {
            collection: "User".to_string(),
            field: "email".to_string(),
            value: "a@example.com".to_string(),
        });
        assert_eq!(err.to_string(), "duplicate key in User: email = a@example.com");
        assert!(err.is_duplicate_key());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_unavailable_classification() {
        let unavailable: StorageError = BackendError::Unavailable {
            backend_name: "memory".to_string(),
            message: "offline".to_string(),
        }
        .into();
        let timeout: StorageError = BackendError::Timeout {
            backend_name: "mongodb".to_string(),
            timeout_ms: 30000,
        }
        .into();
        let query: StorageError = BackendError::QueryError {
            message: "bad".to_string(),
        }
        .into();

        assert!(unavailable.is_unavailable());
        assert!(timeout.is_unavailable());
        assert!(!query.is_unavailable());
        assert!(!unavailable.is_duplicate_key());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::UnknownRelation {
            entity: "Appointment".to_string(),
            relation: "nurse".to_string(),
        };
        assert_eq!(err.to_string(), "unknown relation 'nurse' on Appointment");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::SerializationError { .. })
        ));
    }
}
