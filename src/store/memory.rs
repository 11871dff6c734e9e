//! Non-durable backend holding the tables in process memory

use std::sync::RwLock;

use super::backend::{Backend, CommitReceipt};
use super::batch::Batch;
use super::errors::{StorageError, StorageResult};
use super::tables::Tables;

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    last_sequence: u64,
}

/// In-memory meta-table store.
///
/// Same constraint semantics as the file backend; state is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StorageResult<R> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::lock_poisoned("memory tables"))?;
        Ok(f(&state.tables))
    }

    fn commit(&self, batch: Batch) -> StorageResult<CommitReceipt> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::lock_poisoned("memory tables"))?;
        let _undo = state.tables.apply(&batch)?;
        state.last_sequence += 1;
        Ok(CommitReceipt {
            sequence: state.last_sequence,
            bytes_written: 0,
        })
    }
}
