//! Meta-table store for modelforge
//!
//! Holds the four tables every model and record lives in and enforces their
//! relational constraints at the storage layer:
//!
//! - `model_definitions.name` is unique
//! - fields and records cascade with their model
//! - values cascade with their record
//! - a field cannot be deleted while values reference it
//! - a value's field belongs to its record's model, at most once per record
//!
//! # Backends
//!
//! - [`MemoryBackend`]: process-local, for tests and ephemeral use
//! - [`FileBackend`]: replays and appends a checksummed journal
//!
//! Both apply a [`Batch`] all-or-nothing under a single writer lock.

mod backend;
mod batch;
mod checksum;
mod errors;
mod file;
mod ids;
mod journal;
mod memory;
mod rows;
mod tables;

pub use backend::{AnyBackend, Backend, CommitReceipt};
pub use batch::{Batch, Mutation};
pub use checksum::compute_checksum;
pub use errors::{ConstraintViolation, Severity, StorageError, StorageErrorCode, StorageResult};
pub use file::{FileBackend, ReplaySummary};
pub use ids::{FieldId, ModelId, Owner, RecordId, ValueId};
pub use journal::journal_path;
pub use memory::MemoryBackend;
pub use rows::{
    FieldRow, ModelRow, RecordRow, ValueRow, FIELD_DEFINITIONS, FIELD_VALUES, MODEL_DEFINITIONS,
    MODEL_RECORDS,
};
pub use tables::{Tables, UndoLog};
