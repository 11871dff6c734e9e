//! Record engine: the facade for creating and removing records

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::store::RecordStore;
use super::types::{ModelRecord, ResolvedValue};
use crate::codec;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::observability::{Event, Logger};
use crate::schema::{missing_as_not_found, owner_label, ModelDefinition, SchemaStore};
use crate::store::{
    Backend, ConstraintViolation, ModelId, Owner, RecordId, RecordRow, ValueId, ValueRow,
    MODEL_RECORDS,
};

/// Creates, reads and deletes records of runtime-defined models.
pub struct RecordEngine<B> {
    schema: SchemaStore<B>,
    records: RecordStore<B>,
}

impl<B> Clone for RecordEngine<B> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            records: self.records.clone(),
        }
    }
}

impl<B: Backend> RecordEngine<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            schema: SchemaStore::new(Arc::clone(&backend)),
            records: RecordStore::new(backend),
        }
    }

    /// Creates a record from a field-name to raw-value map.
    ///
    /// Fields missing from `values` get no stored value. The record and all
    /// of its values commit as one batch, so a rejected value leaves nothing
    /// behind.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the model does not exist
    /// - `Invalid` if a key names no field of the model (first in key order),
    ///   or a field is deleted before the record commits
    /// - `TypeMismatch` for the first value, in field order, that does not
    ///   parse under its field's type
    pub fn create_record(
        &self,
        model_id: ModelId,
        values: &BTreeMap<String, String>,
        owner: Option<Owner>,
    ) -> EngineResult<ModelRecord> {
        let model = self
            .schema
            .load(model_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Model, model_id))?;

        let (header, rows, record) = prepare_record(&model, values, owner)?;
        self.commit_record(header, rows, record)
    }

    fn commit_record(
        &self,
        header: RecordRow,
        rows: Vec<ValueRow>,
        record: ModelRecord,
    ) -> EngineResult<ModelRecord> {
        let model_id = record.model_id;
        self.records.insert(header, rows).map_err(|err| {
            EngineError::from_storage(err, |violation| match violation {
                // Model deleted between the schema read and the commit
                ConstraintViolation::ForeignKey { column, .. } if column.starts_with(MODEL_RECORDS) => {
                    Some(EngineError::not_found(EntityKind::Model, model_id))
                }
                // Field deleted between the schema read and the commit
                ConstraintViolation::ForeignKey { column, key } if *column == VALUE_FIELD_COLUMN => {
                    let name = record
                        .values
                        .iter()
                        .find(|value| value.field_id.to_string() == *key)
                        .map_or_else(|| key.clone(), |value| value.field_name.clone());
                    let reason = format!("unknown field '{}' for model {}", name, model_id);
                    Some(EngineError::invalid_field(name, reason))
                }
                _ => None,
            })
        })?;

        let id = record.id.to_string();
        let model_label = model_id.to_string();
        let value_count = record.values.len().to_string();
        Logger::info(
            Event::RecordCreated.as_str(),
            &[
                ("model_id", model_label.as_str()),
                ("owner", owner_label(record.owner.as_ref())),
                ("record_id", id.as_str()),
                ("values", value_count.as_str()),
            ],
        );

        Ok(record)
    }

    pub fn get_record(&self, id: RecordId) -> EngineResult<ModelRecord> {
        self.records
            .load(id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Record, id))
    }

    /// Deletes a record and all of its values.
    pub fn delete_record(&self, id: RecordId) -> EngineResult<()> {
        self.records
            .delete(id)
            .map_err(|err| missing_as_not_found(err, EntityKind::Record, id))?;

        let id = id.to_string();
        Logger::info(Event::RecordDeleted.as_str(), &[("record_id", id.as_str())]);
        Ok(())
    }

    /// Deletes one stored field value.
    pub fn delete_value(&self, id: ValueId) -> EngineResult<()> {
        self.records
            .delete_value(id)
            .map_err(|err| missing_as_not_found(err, EntityKind::Value, id))?;

        let id = id.to_string();
        Logger::info(Event::ValueDeleted.as_str(), &[("value_id", id.as_str())]);
        Ok(())
    }
}

const VALUE_FIELD_COLUMN: &str = "field_values.field_id";

/// Checks `values` against `model` and builds the rows of a new record.
fn prepare_record(
    model: &ModelDefinition,
    values: &BTreeMap<String, String>,
    owner: Option<Owner>,
) -> EngineResult<(RecordRow, Vec<ValueRow>, ModelRecord)> {
    if let Some(unknown) = values.keys().find(|key| model.field(key).is_none()) {
        return Err(EngineError::invalid_field(
            unknown.clone(),
            format!("unknown field '{}' for model '{}'", unknown, model.name),
        ));
    }

    let record_id = RecordId::generate();
    let mut rows = Vec::with_capacity(values.len());
    let mut resolved = Vec::with_capacity(values.len());
    for field in &model.fields {
        let Some(raw) = values.get(&field.name) else {
            continue;
        };
        codec::validate(raw, &field.name, field.field_type)?;

        let value_id = ValueId::generate();
        rows.push(ValueRow {
            id: value_id,
            field_id: field.id,
            record_id,
            value: raw.clone(),
        });
        resolved.push(ResolvedValue {
            id: value_id,
            field_id: field.id,
            field_name: field.name.clone(),
            field_type: field.field_type,
            value: raw.clone(),
        });
    }

    let header = RecordRow {
        id: record_id,
        model_id: model.id,
        owner,
        created_at: Utc::now(),
    };
    let record = ModelRecord {
        id: record_id,
        model_id: model.id,
        values: resolved,
        owner: header.owner.clone(),
        created_at: header.created_at,
    };
    Ok((header, rows, record))
}
