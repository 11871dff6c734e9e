//! Durable backend: in-memory tables rebuilt from an fsynced journal
//!
//! Open replays every journal entry through the same constraint-checked
//! apply used for live commits. A commit applies the batch to the tables,
//! appends it to the journal and fsyncs. If the append fails the tables are
//! rolled back and the journal is cut back to its last committed entry.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::backend::{Backend, CommitReceipt};
use super::batch::Batch;
use super::errors::{StorageError, StorageResult};
use super::journal::{journal_path, truncate_journal, JournalReader, JournalWriter, ReadOutcome};
use super::tables::Tables;
use crate::observability::{Event, Logger};

/// What open found in the journal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Entries replayed
    pub entries: u64,
    /// Bytes of an incomplete trailing entry that were cut off
    pub discarded_tail_bytes: u64,
}

struct FileState {
    tables: Tables,
    journal: JournalWriter,
}

/// Journaled meta-table store rooted at a data directory.
pub struct FileBackend {
    state: RwLock<FileState>,
    path: PathBuf,
    replay: ReplaySummary,
}

impl FileBackend {
    /// Opens the store, replaying `<data_dir>/journal/meta.journal`.
    ///
    /// # Errors
    ///
    /// `FORGE_DATA_CORRUPTION` if an entry fails its checksum, is out of
    /// sequence, cannot be decoded or violates a constraint on replay.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = journal_path(data_dir);
        let mut tables = Tables::new();
        let mut replay = ReplaySummary::default();
        let mut last_sequence = 0;

        if path.exists() {
            let mut reader = JournalReader::open(&path)?;
            loop {
                match reader.read_next()? {
                    ReadOutcome::Entry(entry) => {
                        let expected = last_sequence + 1;
                        if entry.sequence != expected {
                            return Err(StorageError::corruption_at_sequence(
                                entry.sequence,
                                format!("Journal out of sequence, expected {}", expected),
                            ));
                        }
                        let batch = entry.batch()?;
                        let _undo = tables.apply(&batch).map_err(|violation| {
                            StorageError::corruption_at_sequence(
                                entry.sequence,
                                format!("Replayed batch violates constraint: {}", violation),
                            )
                        })?;
                        last_sequence = entry.sequence;
                        replay.entries += 1;
                    }
                    ReadOutcome::End => break,
                    ReadOutcome::TornTail { offset } => {
                        replay.discarded_tail_bytes = reader.file_size() - offset;
                        truncate_journal(&path, offset)?;
                        let bytes = replay.discarded_tail_bytes.to_string();
                        let offset = offset.to_string();
                        Logger::warn(
                            Event::JournalTailDiscarded.as_str(),
                            &[("bytes", bytes.as_str()), ("offset", offset.as_str())],
                        );
                        break;
                    }
                }
            }
        }

        let journal = JournalWriter::open(&path, last_sequence + 1)?;
        let entries = replay.entries.to_string();
        let shown = path.display().to_string();
        Logger::info(
            Event::JournalReplayed.as_str(),
            &[("entries", entries.as_str()), ("path", shown.as_str())],
        );

        Ok(Self {
            state: RwLock::new(FileState {
                tables,
                journal,
            }),
            path,
            replay,
        })
    }

    /// Returns the journal file path.
    pub fn journal_path(&self) -> &Path {
        &self.path
    }

    /// Returns what was replayed when the store was opened.
    pub fn replay_summary(&self) -> ReplaySummary {
        self.replay
    }
}

impl Backend for FileBackend {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StorageResult<R> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::lock_poisoned("journaled tables"))?;
        Ok(f(&state.tables))
    }

    fn commit(&self, batch: Batch) -> StorageResult<CommitReceipt> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::lock_poisoned("journaled tables"))?;
        let state = &mut *guard;

        let undo = state.tables.apply(&batch)?;
        match state.journal.append(&batch) {
            Ok((sequence, bytes_written)) => Ok(CommitReceipt {
                sequence,
                bytes_written,
            }),
            Err(e) => {
                state.tables.rollback(undo);
                Err(e)
            }
        }
    }
}
