//! Storage error types
//!
//! Error codes:
//! - FORGE_STORAGE_IO_ERROR (ERROR severity)
//! - FORGE_STORAGE_WRITE_FAILED (ERROR severity)
//! - FORGE_STORAGE_READ_FAILED (ERROR severity)
//! - FORGE_CONSTRAINT_VIOLATION (ERROR severity)
//! - FORGE_LOCK_POISONED (FATAL severity)
//! - FORGE_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use thiserror::Error;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the store stays usable
    Error,
    /// The store must not be used further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A relational constraint rejected a mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    /// Primary key already present
    #[error("duplicate key {key} in {table}")]
    DuplicateKey { table: &'static str, key: String },

    /// Model name already taken
    #[error("model name '{name}' already exists")]
    DuplicateModelName { name: String },

    /// Field name already used within the same model
    #[error("field name '{name}' already exists in model {model_id}")]
    DuplicateFieldName { model_id: String, name: String },

    /// Referenced parent row does not exist
    #[error("foreign key {column} references missing row {key}")]
    ForeignKey { column: &'static str, key: String },

    /// Value's field belongs to a different model than its record
    #[error("field {field_id} does not belong to the model of record {record_id}")]
    CrossModelReference { field_id: String, record_id: String },

    /// Record already holds a value for the field
    #[error("record {record_id} already has a value for field {field_id}")]
    DuplicateAttribute { record_id: String, field_id: String },

    /// Row is still referenced by dependent rows
    #[error("{table} row {key} is referenced by {references} dependent row(s)")]
    Restricted {
        table: &'static str,
        key: String,
        references: usize,
    },

    /// Delete targets a row that does not exist
    #[error("no row {key} in {table}")]
    MissingRow { table: &'static str, key: String },
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure
    ForgeStorageIoError,
    /// Journal write failed
    ForgeStorageWriteFailed,
    /// Journal read failed
    ForgeStorageReadFailed,
    /// Batch rejected by a table constraint
    ForgeConstraintViolation,
    /// A writer panicked while holding the table lock
    ForgeLockPoisoned,
    /// Journal checksum or replay failure
    ForgeDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::ForgeStorageIoError => "FORGE_STORAGE_IO_ERROR",
            StorageErrorCode::ForgeStorageWriteFailed => "FORGE_STORAGE_WRITE_FAILED",
            StorageErrorCode::ForgeStorageReadFailed => "FORGE_STORAGE_READ_FAILED",
            StorageErrorCode::ForgeConstraintViolation => "FORGE_CONSTRAINT_VIOLATION",
            StorageErrorCode::ForgeLockPoisoned => "FORGE_LOCK_POISONED",
            StorageErrorCode::ForgeDataCorruption => "FORGE_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::ForgeLockPoisoned | StorageErrorCode::ForgeDataCorruption => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error type with full context
#[derive(Debug)]
pub struct StorageError {
    /// Error code
    code: StorageErrorCode,
    /// Human-readable message
    message: String,
    /// Optional details about the error context
    details: Option<String>,
    /// Rejected constraint, for `ForgeConstraintViolation`
    violation: Option<ConstraintViolation>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            violation: None,
            source: None,
        }
    }

    /// Create a new storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::ForgeStorageIoError, message)
        }
    }

    /// Create a new journal write failed error
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::ForgeStorageWriteFailed, message)
        }
    }

    /// Create a journal write failed error without IO source
    pub fn write_failed_no_source(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::ForgeStorageWriteFailed, message)
    }

    /// Create a new journal read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::ForgeStorageReadFailed, message)
        }
    }

    /// Create a constraint violation error
    pub fn constraint(violation: ConstraintViolation) -> Self {
        Self {
            violation: Some(violation.clone()),
            ..Self::new(StorageErrorCode::ForgeConstraintViolation, violation.to_string())
        }
    }

    /// Create a poisoned lock error
    pub fn lock_poisoned(resource: &str) -> Self {
        Self::new(
            StorageErrorCode::ForgeLockPoisoned,
            format!("{} lock poisoned by a panicked writer", resource),
        )
    }

    /// Create a new data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::ForgeDataCorruption, message)
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::new(StorageErrorCode::ForgeDataCorruption, reason)
        }
    }

    /// Create a data corruption error with journal sequence context
    pub fn corruption_at_sequence(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("sequence: {}", sequence)),
            ..Self::new(StorageErrorCode::ForgeDataCorruption, reason)
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns the rejected constraint, if this is a constraint violation
    pub fn violation(&self) -> Option<&ConstraintViolation> {
        self.violation.as_ref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ConstraintViolation> for StorageError {
    fn from(violation: ConstraintViolation) -> Self {
        Self::constraint(violation)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
