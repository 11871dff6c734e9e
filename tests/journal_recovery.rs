//! Journal Recovery Tests
//!
//! - Committed state survives reopen
//! - A complete entry with a bad checksum aborts open
//! - A damaged length prefix aborts open instead of passing for a torn tail
//! - An incomplete trailing entry is discarded and the file truncated
//! - A replayed batch that violates a constraint aborts open

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use modelforge::codec::FieldType;
use modelforge::record::RecordEngine;
use modelforge::schema::{FieldSpec, ModelDefinition, SchemaRegistry};
use modelforge::store::{
    compute_checksum, journal_path, Backend, Batch, FieldId, FieldRow, FileBackend, ModelId,
};
use modelforge::EngineError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open(dir: &Path) -> Arc<FileBackend> {
    Arc::new(FileBackend::open(dir).unwrap())
}

fn define_invoice(backend: &Arc<FileBackend>) -> ModelDefinition {
    SchemaRegistry::new(Arc::clone(backend))
        .define_model(
            "Invoice",
            &[
                FieldSpec::new("amount", FieldType::Float),
                FieldSpec::new("note", FieldType::String),
            ],
            None,
        )
        .unwrap()
}

/// Encodes one journal entry exactly as the writer lays it out.
fn encode_entry(sequence: u64, batch: &Batch) -> Vec<u8> {
    let body = serde_json::to_vec(batch).unwrap();
    let length = (4 + 8 + 4 + body.len() + 4) as u32;

    let mut entry = Vec::new();
    entry.extend_from_slice(&length.to_le_bytes());
    entry.extend_from_slice(&sequence.to_le_bytes());
    let header_checksum = compute_checksum(&entry);
    entry.extend_from_slice(&header_checksum.to_le_bytes());
    entry.extend_from_slice(&body);
    let checksum = compute_checksum(&entry);
    entry.extend_from_slice(&checksum.to_le_bytes());
    entry
}

fn append_raw(dir: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(journal_path(dir))
        .unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn journal_len(dir: &Path) -> u64 {
    fs::metadata(journal_path(dir)).unwrap().len()
}

// =============================================================================
// Durability Tests
// =============================================================================

/// Models and records committed before close are present after reopen.
#[test]
fn test_state_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let (model, record_id) = {
        let backend = open(tmp.path());
        let model = define_invoice(&backend);
        let mut values = BTreeMap::new();
        values.insert("amount".to_string(), "12.50".to_string());
        let record = RecordEngine::new(Arc::clone(&backend))
            .create_record(model.id, &values, None)
            .unwrap();
        (model, record.id)
    };

    let backend = open(tmp.path());
    assert_eq!(backend.replay_summary().entries, 2);
    assert_eq!(backend.replay_summary().discarded_tail_bytes, 0);

    let registry = SchemaRegistry::new(Arc::clone(&backend));
    assert_eq!(registry.find_model_by_name("Invoice").unwrap(), model);

    let record = RecordEngine::new(Arc::clone(&backend))
        .get_record(record_id)
        .unwrap();
    assert_eq!(record.get("amount"), Some("12.50"));
}

/// Uniqueness still holds against replayed state.
#[test]
fn test_uniqueness_holds_after_reopen() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));

    let backend = open(tmp.path());
    let err = SchemaRegistry::new(backend)
        .define_model("Invoice", &[], None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));
}

/// Deletes are replayed too.
#[test]
fn test_cascade_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let backend = open(tmp.path());
        let model = define_invoice(&backend);
        SchemaRegistry::new(backend).delete_model(model.id).unwrap();
    }

    let backend = open(tmp.path());
    let counts = backend
        .read(|t| (t.model_count(), t.field_count()))
        .unwrap();
    assert_eq!(counts, (0, 0));
}

/// Rejected operations write nothing to the journal.
#[test]
fn test_rejections_are_not_journaled() {
    let tmp = TempDir::new().unwrap();
    let backend = open(tmp.path());
    let model = define_invoice(&backend);
    let before = journal_len(tmp.path());

    let mut values = BTreeMap::new();
    values.insert("amount".to_string(), "twelve".to_string());
    assert!(RecordEngine::new(Arc::clone(&backend))
        .create_record(model.id, &values, None)
        .is_err());
    assert!(SchemaRegistry::new(Arc::clone(&backend))
        .define_model("Invoice", &[], None)
        .is_err());

    assert_eq!(journal_len(tmp.path()), before);
}

// =============================================================================
// Corruption Tests
// =============================================================================

/// A flipped byte inside a complete entry is fatal corruption.
#[test]
fn test_checksum_mismatch_aborts_open() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));

    let path = journal_path(tmp.path());
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    let err = FileBackend::open(tmp.path()).err().unwrap();
    assert!(err.is_fatal());
    assert_eq!(err.code().code(), "FORGE_DATA_CORRUPTION");
}

/// A flipped bit in a middle entry's length must not truncate the entries
/// after it.
#[test]
fn test_damaged_length_prefix_aborts_open() {
    let tmp = TempDir::new().unwrap();
    let entry_offsets = {
        let backend = open(tmp.path());
        let registry = SchemaRegistry::new(Arc::clone(&backend));
        let mut offsets = Vec::new();
        for name in ["A", "B", "C"] {
            offsets.push(journal_len(tmp.path()));
            registry.define_model(name, &[], None).unwrap();
        }
        offsets
    };
    let before = journal_len(tmp.path());

    let path = journal_path(tmp.path());
    let mut bytes = fs::read(&path).unwrap();
    bytes[entry_offsets[1] as usize + 3] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    let err = FileBackend::open(tmp.path()).err().unwrap();
    assert!(err.is_fatal());
    assert_eq!(err.code().code(), "FORGE_DATA_CORRUPTION");
    assert_eq!(journal_len(tmp.path()), before);
}

/// A well-formed entry whose batch breaks a constraint is fatal corruption.
#[test]
fn test_replay_constraint_violation_aborts_open() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));

    let mut batch = Batch::new();
    batch.insert_field(FieldRow {
        id: FieldId::generate(),
        model_id: ModelId::generate(),
        name: "orphan".to_string(),
        field_type: FieldType::String,
        position: 0,
    });
    append_raw(tmp.path(), &encode_entry(2, &batch));

    let err = FileBackend::open(tmp.path()).err().unwrap();
    assert!(err.is_fatal());
}

/// Sequence numbers must continue without gaps.
#[test]
fn test_sequence_gap_aborts_open() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));

    let mut batch = Batch::new();
    batch.delete_model(ModelId::generate());
    append_raw(tmp.path(), &encode_entry(5, &batch));

    let err = FileBackend::open(tmp.path()).err().unwrap();
    assert!(err.is_fatal());
}

// =============================================================================
// Torn Tail Tests
// =============================================================================

/// A partially written final entry is discarded and the store stays usable.
#[test]
fn test_torn_tail_is_discarded() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));
    let committed = journal_len(tmp.path());

    let mut batch = Batch::new();
    batch.delete_model(ModelId::generate());
    let entry = encode_entry(2, &batch);
    append_raw(tmp.path(), &entry[..entry.len() - 5]);

    let backend = open(tmp.path());
    let summary = backend.replay_summary();
    assert_eq!(summary.entries, 1);
    assert_eq!(summary.discarded_tail_bytes, (entry.len() - 5) as u64);
    assert_eq!(journal_len(tmp.path()), committed);

    // New commits continue the sequence after the last complete entry
    SchemaRegistry::new(Arc::clone(&backend))
        .define_model("Customer", &[], None)
        .unwrap();
    drop(backend);

    let backend = open(tmp.path());
    assert_eq!(backend.replay_summary().entries, 2);
    assert_eq!(backend.read(|t| t.model_count()).unwrap(), 2);
}

/// Fewer bytes than a length prefix also count as a torn tail.
#[test]
fn test_short_tail_is_discarded() {
    let tmp = TempDir::new().unwrap();
    define_invoice(&open(tmp.path()));
    append_raw(tmp.path(), &[0x2a, 0x00]);

    let backend = open(tmp.path());
    assert_eq!(backend.replay_summary().discarded_tail_bytes, 2);
    assert_eq!(backend.read(|t| t.model_count()).unwrap(), 1);
}
