//! Mutation batches
//!
//! A batch is the unit of atomicity: the store applies every mutation in it
//! or none of them. Batches are also the journal payload.

use serde::{Deserialize, Serialize};

use super::ids::{FieldId, ModelId, RecordId, ValueId};
use super::rows::{FieldRow, ModelRow, RecordRow, ValueRow};

/// A single row-level change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    InsertModel(ModelRow),
    InsertField(FieldRow),
    InsertRecord(RecordRow),
    InsertValue(ValueRow),
    /// Cascades to fields, records and values of the model
    DeleteModel { id: ModelId },
    /// Restricted while any value references the field
    DeleteField { id: FieldId },
    /// Cascades to the record's values
    DeleteRecord { id: RecordId },
    DeleteValue { id: ValueId },
}

/// Ordered list of mutations committed as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    mutations: Vec<Mutation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn insert_model(&mut self, row: ModelRow) -> &mut Self {
        self.push(Mutation::InsertModel(row))
    }

    pub fn insert_field(&mut self, row: FieldRow) -> &mut Self {
        self.push(Mutation::InsertField(row))
    }

    pub fn insert_record(&mut self, row: RecordRow) -> &mut Self {
        self.push(Mutation::InsertRecord(row))
    }

    pub fn insert_value(&mut self, row: ValueRow) -> &mut Self {
        self.push(Mutation::InsertValue(row))
    }

    pub fn delete_model(&mut self, id: ModelId) -> &mut Self {
        self.push(Mutation::DeleteModel { id })
    }

    pub fn delete_field(&mut self, id: FieldId) -> &mut Self {
        self.push(Mutation::DeleteField { id })
    }

    pub fn delete_record(&mut self, id: RecordId) -> &mut Self {
        self.push(Mutation::DeleteRecord { id })
    }

    pub fn delete_value(&mut self, id: ValueId) -> &mut Self {
        self.push(Mutation::DeleteValue { id })
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }
}

impl From<Vec<Mutation>> for Batch {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }
}
