//! Engine error taxonomy
//!
//! Every facade operation returns [`EngineResult`]. All variants except
//! `StorageFailure` are expected outcomes of a well-formed call and are
//! reported back to the caller. None of them is process-fatal on its own;
//! callers check [`EngineError::is_fatal`] for storage corruption.

use std::fmt;

use thiserror::Error;

use crate::codec::TypeMismatch;
use crate::store::{ConstraintViolation, StorageError};

/// Kind of entity a lookup or delete referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Model,
    Field,
    Record,
    Value,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Model => "model",
            EntityKind::Field => "field",
            EntityKind::Record => "record",
            EntityKind::Value => "value",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, engine healthy
    Reject,
    /// Operation failed in the store
    Error,
    /// Store is unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors returned by the schema registry and record engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced model, field, record or value does not exist
    #[error("{entity} '{key}' not found")]
    NotFound { entity: EntityKind, key: String },

    /// Model name already taken
    #[error("model '{name}' already exists")]
    Conflict { name: String },

    /// Malformed request shape
    #[error("invalid request: {reason}")]
    Invalid {
        reason: String,
        /// Offending field name, when one is known
        field: Option<String>,
    },

    /// Raw value does not parse under its field's declared type
    #[error("type mismatch: {0}")]
    TypeMismatch(#[from] TypeMismatch),

    /// Field still referenced by stored values
    #[error("field '{field}' is referenced by {references} stored value(s)")]
    Restricted { field: String, references: usize },

    /// Opaque storage-layer failure; the batch was not committed
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl EngineError {
    pub fn not_found(entity: EntityKind, key: impl fmt::Display) -> Self {
        EngineError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        EngineError::Invalid {
            reason: reason.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Invalid {
            reason: reason.into(),
            field: Some(field.into()),
        }
    }

    /// Wraps a storage error, letting `translate` claim the constraint
    /// violations the caller anticipates. Anything unclaimed is a
    /// `StorageFailure`.
    pub(crate) fn from_storage(
        err: StorageError,
        translate: impl FnOnce(&ConstraintViolation) -> Option<EngineError>,
    ) -> Self {
        let translated = err.violation().and_then(translate);
        match translated {
            Some(mapped) => mapped,
            None => EngineError::StorageFailure(err),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "FORGE_NOT_FOUND",
            EngineError::Conflict { .. } => "FORGE_CONFLICT",
            EngineError::Invalid { .. } => "FORGE_INVALID",
            EngineError::TypeMismatch(_) => "FORGE_TYPE_MISMATCH",
            EngineError::Restricted { .. } => "FORGE_RESTRICTED",
            EngineError::StorageFailure(_) => "FORGE_STORAGE_FAILURE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            EngineError::StorageFailure(e) if e.is_fatal() => Severity::Fatal,
            EngineError::StorageFailure(_) => Severity::Error,
            _ => Severity::Reject,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Field or model name the error points at, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            EngineError::NotFound { key, .. } => Some(key),
            EngineError::Conflict { name } => Some(name),
            EngineError::Invalid { field, .. } => field.as_deref(),
            EngineError::TypeMismatch(m) => Some(&m.field),
            EngineError::Restricted { field, .. } => Some(field),
            EngineError::StorageFailure(_) => None,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
