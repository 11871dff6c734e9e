//! Persistence of records and field values in the meta-tables

use std::sync::Arc;

use super::types::{ModelRecord, ResolvedValue};
use crate::store::{
    Backend, Batch, CommitReceipt, RecordId, RecordRow, StorageResult, ValueId, ValueRow,
};

/// Reads and writes `model_records` and `field_values` rows.
pub struct RecordStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for RecordStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> RecordStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Loads a record with its values joined to their fields, in field
    /// position order.
    pub fn load(&self, id: RecordId) -> StorageResult<Option<ModelRecord>> {
        self.backend.read(|tables| {
            let header = tables.record(id)?;
            let mut joined: Vec<(u32, ResolvedValue)> = tables
                .values_of(id)
                .into_iter()
                .filter_map(|row| {
                    let field = tables.field(row.field_id)?;
                    Some((
                        field.position,
                        ResolvedValue {
                            id: row.id,
                            field_id: field.id,
                            field_name: field.name.clone(),
                            field_type: field.field_type,
                            value: row.value.clone(),
                        },
                    ))
                })
                .collect();
            joined.sort_by_key(|(position, _)| *position);

            Some(ModelRecord {
                id: header.id,
                model_id: header.model_id,
                values: joined.into_iter().map(|(_, value)| value).collect(),
                owner: header.owner.clone(),
                created_at: header.created_at,
            })
        })
    }

    /// Persists a record header and its values in one batch.
    pub fn insert(&self, header: RecordRow, values: Vec<ValueRow>) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.insert_record(header);
        for value in values {
            batch.insert_value(value);
        }
        self.backend.commit(batch)
    }

    /// Deletes a record; the store cascades to its values.
    pub fn delete(&self, id: RecordId) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.delete_record(id);
        self.backend.commit(batch)
    }

    pub fn delete_value(&self, id: ValueId) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.delete_value(id);
        self.backend.commit(batch)
    }
}
