//! Persistence of model definitions in the meta-tables

use std::sync::Arc;

use super::types::{FieldDefinition, ModelDefinition};
use crate::store::{Backend, Batch, CommitReceipt, FieldId, ModelId, StorageResult};

/// Reads and writes model and field definition rows.
///
/// Holds no cache: every load reads the backend's current state.
pub struct SchemaStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for SchemaStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> SchemaStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn load(&self, id: ModelId) -> StorageResult<Option<ModelDefinition>> {
        self.backend.read(|tables| {
            tables
                .model(id)
                .map(|model| ModelDefinition::from_rows(model, &tables.fields_of(id)))
        })
    }

    pub fn load_by_name(&self, name: &str) -> StorageResult<Option<ModelDefinition>> {
        self.backend.read(|tables| {
            tables
                .model_by_name(name)
                .map(|model| ModelDefinition::from_rows(model, &tables.fields_of(model.id)))
        })
    }

    pub fn load_field(&self, id: FieldId) -> StorageResult<Option<FieldDefinition>> {
        self.backend
            .read(|tables| tables.field(id).map(FieldDefinition::from))
    }

    /// Persists a model row and all its field rows in one batch.
    pub fn insert(&self, model: &ModelDefinition) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.insert_model(model.to_row());
        for field in &model.fields {
            batch.insert_field(field.to_row());
        }
        self.backend.commit(batch)
    }

    /// Deletes a model; the store cascades to its fields, records and values.
    pub fn delete(&self, id: ModelId) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.delete_model(id);
        self.backend.commit(batch)
    }

    pub fn delete_field(&self, id: FieldId) -> StorageResult<CommitReceipt> {
        let mut batch = Batch::new();
        batch.delete_field(id);
        self.backend.commit(batch)
    }
}
