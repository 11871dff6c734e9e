//! Persistence seam used by the schema and record layers

use super::batch::Batch;
use super::errors::StorageResult;
use super::file::FileBackend;
use super::memory::MemoryBackend;
use super::tables::Tables;

/// Outcome of a committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Position of the batch in commit order, starting at 1
    pub sequence: u64,
    /// Journal bytes written for the batch (0 for non-durable backends)
    pub bytes_written: usize,
}

/// A shared meta-table store.
///
/// Implementations serialize commits: the constraint checks of a batch and
/// its application happen inside one critical section, so concurrent
/// callers never interleave a check with another caller's insert.
pub trait Backend: Send + Sync {
    /// Runs `f` against a consistent view of the tables.
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StorageResult<R>;

    /// Applies `batch` atomically.
    ///
    /// # Errors
    ///
    /// `FORGE_CONSTRAINT_VIOLATION` if any mutation violates a table
    /// constraint, or an I/O error code if the batch could not be made
    /// durable. In both cases no part of the batch is visible.
    fn commit(&self, batch: Batch) -> StorageResult<CommitReceipt>;
}

/// Backend selected at runtime from configuration.
pub enum AnyBackend {
    Memory(MemoryBackend),
    File(FileBackend),
}

impl Backend for AnyBackend {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StorageResult<R> {
        match self {
            AnyBackend::Memory(b) => b.read(f),
            AnyBackend::File(b) => b.read(f),
        }
    }

    fn commit(&self, batch: Batch) -> StorageResult<CommitReceipt> {
        match self {
            AnyBackend::Memory(b) => b.commit(batch),
            AnyBackend::File(b) => b.commit(batch),
        }
    }
}
