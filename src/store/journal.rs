//! Append-only journal of committed batches
//!
//! Entry format:
//!
//! ```text
//! +------------------+
//! | Entry Length     | (u32 LE, whole entry including this field)
//! +------------------+
//! | Sequence         | (u64 LE, starts at 1, strictly increasing)
//! +------------------+
//! | Header Checksum  | (u32 LE, CRC32 over length + sequence)
//! +------------------+
//! | Batch            | (JSON bytes)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over everything above)
//! +------------------+
//! ```
//!
//! An entry is committed once it is fully written and fsynced. A trailing
//! entry cut short by a crash was never acknowledged and is discarded on
//! open. Only an entry whose header verifies can be torn: a header that
//! fails its checksum, or a complete entry with a bad checksum, is
//! corruption.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use super::batch::Batch;
use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StorageError, StorageResult};

/// Length + sequence + header checksum
pub const HEADER_SIZE: u64 = 4 + 8 + 4;

/// Header + trailing checksum, with an empty body
pub const MIN_ENTRY_SIZE: u64 = HEADER_SIZE + 4;

/// Journal file location under a data directory
pub fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join("journal").join("meta.journal")
}

/// One committed batch as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub sequence: u64,
    pub body: Vec<u8>,
}

impl JournalEntry {
    /// Encodes a batch as a journal entry.
    pub fn from_batch(sequence: u64, batch: &Batch) -> StorageResult<Self> {
        let body = serde_json::to_vec(batch).map_err(|e| {
            StorageError::write_failed_no_source(format!(
                "Failed to encode batch {}: {}",
                sequence, e
            ))
        })?;
        Ok(Self { sequence, body })
    }

    /// Decodes the batch carried by this entry.
    pub fn batch(&self) -> StorageResult<Batch> {
        serde_json::from_slice(&self.body).map_err(|e| {
            StorageError::corruption_at_sequence(self.sequence, format!("Undecodable batch: {}", e))
        })
    }

    /// Serializes the complete entry to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let entry_length = (MIN_ENTRY_SIZE as usize + self.body.len()) as u32;

        let mut entry = Vec::with_capacity(entry_length as usize);
        entry.extend_from_slice(&entry_length.to_le_bytes());
        entry.extend_from_slice(&self.sequence.to_le_bytes());
        let header_checksum = compute_checksum(&entry);
        entry.extend_from_slice(&header_checksum.to_le_bytes());
        entry.extend_from_slice(&self.body);

        let checksum = compute_checksum(&entry);
        entry.extend_from_slice(&checksum.to_le_bytes());
        entry
    }
}

/// Result of reading the next entry
#[derive(Debug)]
pub enum ReadOutcome {
    Entry(JournalEntry),
    /// Clean end of journal
    End,
    /// Incomplete entry starting at `offset`, running to end of file
    TornTail { offset: u64 },
}

/// Sequential journal reader used for replay.
pub struct JournalReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl JournalReader {
    /// Opens the journal file for reading.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            StorageError::read_failed(format!("Failed to open journal: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read journal metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Returns the offset of the next unread byte.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns the journal size observed at open.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads the next entry, verifying both of its checksums.
    ///
    /// # Errors
    ///
    /// Returns `FORGE_DATA_CORRUPTION` if the header fails its checksum,
    /// declares an impossible length, or a complete entry fails its checksum.
    pub fn read_next(&mut self) -> StorageResult<ReadOutcome> {
        let remaining = self.file_size - self.current_offset;
        if remaining == 0 {
            return Ok(ReadOutcome::End);
        }
        if remaining < HEADER_SIZE {
            return Ok(ReadOutcome::TornTail {
                offset: self.current_offset,
            });
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        self.read_exact(&mut header)?;
        let (covered, header_checksum) = header.split_at(12);
        if !verify_checksum(covered, le_u32(header_checksum)) {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                "Journal entry header checksum mismatch",
            ));
        }

        let entry_length = le_u32(&header[..4]) as u64;
        if entry_length < MIN_ENTRY_SIZE {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Entry length {} below minimum {}",
                    entry_length, MIN_ENTRY_SIZE
                ),
            ));
        }
        if entry_length > remaining {
            return Ok(ReadOutcome::TornTail {
                offset: self.current_offset,
            });
        }

        let mut rest = vec![0u8; (entry_length - HEADER_SIZE) as usize];
        self.read_exact(&mut rest)?;
        let (body, checksum_bytes) = rest.split_at(rest.len() - 4);

        let mut checksum_data = Vec::with_capacity(entry_length as usize - 4);
        checksum_data.extend_from_slice(&header);
        checksum_data.extend_from_slice(body);
        if !verify_checksum(&checksum_data, le_u32(checksum_bytes)) {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                "Journal entry checksum mismatch",
            ));
        }

        let mut seq_buf = [0u8; 8];
        seq_buf.copy_from_slice(&header[4..12]);
        let entry = JournalEntry {
            sequence: u64::from_le_bytes(seq_buf),
            body: body.to_vec(),
        };

        self.current_offset += entry_length;
        Ok(ReadOutcome::Entry(entry))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        self.reader.read_exact(buf).map_err(|e| {
            StorageError::read_failed(
                format!("Failed to read journal at offset {}", self.current_offset),
                e,
            )
        })
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

/// Journal writer that fsyncs after every append.
///
/// A failed append cuts the file back to its last committed length, so an
/// entry whose fsync failed is never replayed. If that cut fails too the
/// writer is poisoned and refuses every later append.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    committed_len: u64,
    poisoned: bool,
}

impl JournalWriter {
    /// Opens the journal for appending, creating it and its directory if
    /// missing. `next_sequence` continues the replayed sequence.
    pub fn open(path: &Path, next_sequence: u64) -> StorageResult<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create journal directory: {}", dir.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StorageError::write_failed(format!("Failed to open journal: {}", path.display()), e)
            })?;
        let committed_len = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
            committed_len,
            poisoned: false,
        })
    }

    /// Returns the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the sequence the next append will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Returns true once a failed append could not be cut back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Appends a batch and fsyncs. Returns the assigned sequence number and
    /// the number of bytes written.
    ///
    /// On failure nothing of the entry remains in the file.
    pub fn append(&mut self, batch: &Batch) -> StorageResult<(u64, usize)> {
        if self.poisoned {
            return Err(StorageError::write_failed_no_source(
                "Journal unusable after a failed append; reopen the store",
            ));
        }

        let sequence = self.next_sequence;
        let bytes = JournalEntry::from_batch(sequence, batch)?.serialize();

        let written = self
            .file
            .write_all(&bytes)
            .map_err(|e| {
                StorageError::write_failed(format!("Failed to append journal entry {}", sequence), e)
            })
            .and_then(|()| {
                self.file.sync_all().map_err(|e| {
                    StorageError::write_failed(
                        format!("fsync failed after journal entry {}", sequence),
                        e,
                    )
                })
            });
        if let Err(e) = written {
            self.discard_uncommitted();
            return Err(e);
        }

        self.committed_len += bytes.len() as u64;
        self.next_sequence += 1;
        Ok((sequence, bytes.len()))
    }

    /// Cuts the file back to the last committed entry.
    fn discard_uncommitted(&mut self) {
        let cut = self
            .file
            .set_len(self.committed_len)
            .and_then(|()| self.file.sync_all());
        if cut.is_err() {
            self.poisoned = true;
        }
    }
}

/// Cuts the journal back to `len` bytes and fsyncs.
pub fn truncate_journal(path: &Path, len: u64) -> StorageResult<()> {
    let file = OpenOptions::new().write(true).open(path).map_err(|e| {
        StorageError::io_error(format!("Failed to open journal for truncation: {}", path.display()), e)
    })?;
    file.set_len(len)
        .and_then(|()| file.sync_all())
        .map_err(|e| StorageError::io_error(format!("Failed to truncate journal to {} bytes", len), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ids::ModelId;
    use tempfile::TempDir;

    fn sample_batch() -> Batch {
        let mut batch = Batch::new();
        batch.delete_model(ModelId::generate());
        batch
    }

    #[test]
    fn test_entry_layout() {
        let batch = sample_batch();
        let entry = JournalEntry::from_batch(7, &batch).unwrap();
        let bytes = entry.serialize();

        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(len, bytes.len());
        assert_eq!(&bytes[4..12], &7u64.to_le_bytes());
        assert_eq!(&bytes[12..16], &compute_checksum(&bytes[..12]).to_le_bytes());
        assert_eq!(entry.batch().unwrap(), batch);
    }

    #[test]
    fn test_append_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        let first = sample_batch();
        let second = sample_batch();

        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            assert_eq!(writer.append(&first).unwrap().0, 1);
            assert_eq!(writer.append(&second).unwrap().0, 2);
            assert_eq!(writer.next_sequence(), 3);
        }

        let mut reader = JournalReader::open(&path).unwrap();
        match reader.read_next().unwrap() {
            ReadOutcome::Entry(e) => {
                assert_eq!(e.sequence, 1);
                assert_eq!(e.batch().unwrap(), first);
            }
            other => panic!("expected entry, got {:?}", other),
        }
        match reader.read_next().unwrap() {
            ReadOutcome::Entry(e) => assert_eq!(e.batch().unwrap(), second),
            other => panic!("expected entry, got {:?}", other),
        }
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::End));
    }

    #[test]
    fn test_torn_tail_detected() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            writer.append(&sample_batch()).unwrap();
            writer.append(&sample_batch()).unwrap();
        }
        let full = fs::read(&path).unwrap();
        fs::write(&path, &full[..full.len() - 3]).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
        let boundary = reader.current_offset();
        match reader.read_next().unwrap() {
            ReadOutcome::TornTail { offset } => assert_eq!(offset, boundary),
            other => panic!("expected torn tail, got {:?}", other),
        }
    }

    #[test]
    fn test_checksum_mismatch_is_corruption() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            writer.append(&sample_batch()).unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        let err = reader.read_next().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "FORGE_DATA_CORRUPTION");
    }

    #[test]
    fn test_truncate_journal() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            writer.append(&sample_batch()).unwrap();
        }
        truncate_journal(&path, 0).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_damaged_length_in_middle_entry_is_corruption() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            for _ in 0..3 {
                writer.append(&sample_batch()).unwrap();
            }
        }
        let mut bytes = fs::read(&path).unwrap();
        let first_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        // Length now runs far past the end of the file
        bytes[first_len + 3] ^= 0x01;
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
        let err = reader.read_next().unwrap_err();
        assert_eq!(err.code().code(), "FORGE_DATA_CORRUPTION");
    }

    #[test]
    fn test_partial_header_is_torn_tail() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        {
            let mut writer = JournalWriter::open(&path, 1).unwrap();
            writer.append(&sample_batch()).unwrap();
        }
        let one = fs::metadata(&path).unwrap().len();
        let second = JournalEntry::from_batch(2, &sample_batch()).unwrap().serialize();
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&second[..10]);
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
        match reader.read_next().unwrap() {
            ReadOutcome::TornTail { offset } => assert_eq!(offset, one),
            other => panic!("expected torn tail, got {:?}", other),
        }
    }

    #[test]
    fn test_unsynced_bytes_cut_back_after_failed_append() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        let mut writer = JournalWriter::open(&path, 1).unwrap();
        writer.append(&sample_batch()).unwrap();
        let committed = fs::metadata(&path).unwrap().len();

        // A complete entry written whose fsync then failed
        let orphan = JournalEntry::from_batch(2, &sample_batch()).unwrap().serialize();
        writer.file.write_all(&orphan).unwrap();
        writer.discard_uncommitted();

        assert!(!writer.is_poisoned());
        assert_eq!(fs::metadata(&path).unwrap().len(), committed);

        let replacement = sample_batch();
        assert_eq!(writer.append(&replacement).unwrap().0, 2);
        drop(writer);

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
        match reader.read_next().unwrap() {
            ReadOutcome::Entry(e) => assert_eq!(e.batch().unwrap(), replacement),
            other => panic!("expected entry, got {:?}", other),
        }
        assert!(matches!(reader.read_next().unwrap(), ReadOutcome::End));
    }

    #[test]
    fn test_failed_append_that_cannot_be_cut_poisons_writer() {
        let tmp = TempDir::new().unwrap();
        let path = journal_path(tmp.path());
        drop(JournalWriter::open(&path, 1).unwrap());

        // Read-only handle: both the write and the cut back fail
        let mut writer = JournalWriter {
            path: path.clone(),
            file: File::open(&path).unwrap(),
            next_sequence: 1,
            committed_len: 0,
            poisoned: false,
        };
        assert!(writer.append(&sample_batch()).is_err());
        assert!(writer.is_poisoned());
        assert!(writer.append(&sample_batch()).is_err());
        assert_eq!(writer.next_sequence(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
