//! Constraint-checked meta-tables
//!
//! `Tables` holds the rows of all four tables plus the secondary indexes
//! needed to enforce their constraints. Batches are applied all-or-nothing:
//! every applied change is recorded in an undo log, and a constraint failure
//! part way through replays the log backwards before returning.

use std::collections::{BTreeMap, BTreeSet};

use super::batch::{Batch, Mutation};
use super::errors::ConstraintViolation;
use super::ids::{FieldId, ModelId, RecordId, ValueId};
use super::rows::{
    FieldRow, ModelRow, RecordRow, ValueRow, FIELD_DEFINITIONS, FIELD_VALUES, MODEL_DEFINITIONS,
    MODEL_RECORDS,
};

#[derive(Debug, Clone)]
enum Row {
    Model(ModelRow),
    Field(FieldRow),
    Record(RecordRow),
    Value(ValueRow),
}

#[derive(Debug, Clone, Copy)]
enum RowKey {
    Model(ModelId),
    Field(FieldId),
    Record(RecordId),
    Value(ValueId),
}

#[derive(Debug)]
enum Undo {
    /// Row was inserted; undo removes it
    Inserted(RowKey),
    /// Row was removed; undo puts it back
    Removed(Row),
}

/// Changes made by one applied batch, newest last.
///
/// Passing it to [`Tables::rollback`] restores the state before the batch.
#[derive(Debug, Default)]
#[must_use = "dropping an undo log makes the batch irrevocable"]
pub struct UndoLog {
    entries: Vec<Undo>,
}

impl UndoLog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory image of the four meta-tables
#[derive(Debug, Default, Clone)]
pub struct Tables {
    models: BTreeMap<ModelId, ModelRow>,
    model_names: BTreeMap<String, ModelId>,
    fields: BTreeMap<FieldId, FieldRow>,
    fields_by_model: BTreeMap<ModelId, BTreeSet<FieldId>>,
    records: BTreeMap<RecordId, RecordRow>,
    records_by_model: BTreeMap<ModelId, BTreeSet<RecordId>>,
    values: BTreeMap<ValueId, ValueRow>,
    /// UNIQUE (record_id, field_id)
    values_by_record: BTreeMap<RecordId, BTreeMap<FieldId, ValueId>>,
    values_by_field: BTreeMap<FieldId, BTreeSet<ValueId>>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================
    // Reads
    // ==================

    pub fn model(&self, id: ModelId) -> Option<&ModelRow> {
        self.models.get(&id)
    }

    pub fn model_by_name(&self, name: &str) -> Option<&ModelRow> {
        self.model_names.get(name).and_then(|id| self.models.get(id))
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldRow> {
        self.fields.get(&id)
    }

    /// Fields of a model in declaration order
    pub fn fields_of(&self, model_id: ModelId) -> Vec<&FieldRow> {
        let mut fields: Vec<&FieldRow> = self
            .fields_by_model
            .get(&model_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.fields.get(id))
            .collect();
        fields.sort_by_key(|f| f.position);
        fields
    }

    pub fn record(&self, id: RecordId) -> Option<&RecordRow> {
        self.records.get(&id)
    }

    pub fn records_of(&self, model_id: ModelId) -> Vec<&RecordRow> {
        self.records_by_model
            .get(&model_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    pub fn value(&self, id: ValueId) -> Option<&ValueRow> {
        self.values.get(&id)
    }

    /// Values stored on a record, unordered
    pub fn values_of(&self, record_id: RecordId) -> Vec<&ValueRow> {
        self.values_by_record
            .get(&record_id)
            .into_iter()
            .flat_map(|by_field| by_field.values())
            .filter_map(|id| self.values.get(id))
            .collect()
    }

    /// Number of values referencing a field
    pub fn references_to(&self, field_id: FieldId) -> usize {
        self.values_by_field.get(&field_id).map_or(0, BTreeSet::len)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    // ==================
    // Writes
    // ==================

    /// Applies every mutation of `batch` or none of them.
    ///
    /// # Errors
    ///
    /// Returns the first `ConstraintViolation` encountered. The tables are
    /// left exactly as they were before the call.
    pub fn apply(&mut self, batch: &Batch) -> Result<UndoLog, ConstraintViolation> {
        let mut undo = UndoLog::default();
        for mutation in batch.iter() {
            if let Err(violation) = self.apply_one(mutation, &mut undo) {
                self.rollback(undo);
                return Err(violation);
            }
        }
        Ok(undo)
    }

    /// Reverts a previously applied batch.
    pub fn rollback(&mut self, undo: UndoLog) {
        for entry in undo.entries.into_iter().rev() {
            match entry {
                Undo::Inserted(key) => {
                    self.remove_row(key);
                }
                Undo::Removed(row) => self.insert_row(row),
            }
        }
    }

    fn apply_one(&mut self, mutation: &Mutation, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        match mutation {
            Mutation::InsertModel(row) => self.insert_model(row, undo),
            Mutation::InsertField(row) => self.insert_field(row, undo),
            Mutation::InsertRecord(row) => self.insert_record(row, undo),
            Mutation::InsertValue(row) => self.insert_value(row, undo),
            Mutation::DeleteModel { id } => self.delete_model(*id, undo),
            Mutation::DeleteField { id } => self.delete_field(*id, undo),
            Mutation::DeleteRecord { id } => self.delete_record(*id, undo),
            Mutation::DeleteValue { id } => self.delete_value(*id, undo),
        }
    }

    fn insert_model(&mut self, row: &ModelRow, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if self.models.contains_key(&row.id) {
            return Err(ConstraintViolation::DuplicateKey {
                table: MODEL_DEFINITIONS,
                key: row.id.to_string(),
            });
        }
        if self.model_names.contains_key(&row.name) {
            return Err(ConstraintViolation::DuplicateModelName {
                name: row.name.clone(),
            });
        }
        self.insert_row(Row::Model(row.clone()));
        undo.entries.push(Undo::Inserted(RowKey::Model(row.id)));
        Ok(())
    }

    fn insert_field(&mut self, row: &FieldRow, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if self.fields.contains_key(&row.id) {
            return Err(ConstraintViolation::DuplicateKey {
                table: FIELD_DEFINITIONS,
                key: row.id.to_string(),
            });
        }
        if !self.models.contains_key(&row.model_id) {
            return Err(ConstraintViolation::ForeignKey {
                column: "field_definitions.model_id",
                key: row.model_id.to_string(),
            });
        }
        if self.fields_of(row.model_id).iter().any(|f| f.name == row.name) {
            return Err(ConstraintViolation::DuplicateFieldName {
                model_id: row.model_id.to_string(),
                name: row.name.clone(),
            });
        }
        self.insert_row(Row::Field(row.clone()));
        undo.entries.push(Undo::Inserted(RowKey::Field(row.id)));
        Ok(())
    }

    fn insert_record(&mut self, row: &RecordRow, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if self.records.contains_key(&row.id) {
            return Err(ConstraintViolation::DuplicateKey {
                table: MODEL_RECORDS,
                key: row.id.to_string(),
            });
        }
        if !self.models.contains_key(&row.model_id) {
            return Err(ConstraintViolation::ForeignKey {
                column: "model_records.model_id",
                key: row.model_id.to_string(),
            });
        }
        self.insert_row(Row::Record(row.clone()));
        undo.entries.push(Undo::Inserted(RowKey::Record(row.id)));
        Ok(())
    }

    fn insert_value(&mut self, row: &ValueRow, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if self.values.contains_key(&row.id) {
            return Err(ConstraintViolation::DuplicateKey {
                table: FIELD_VALUES,
                key: row.id.to_string(),
            });
        }
        let field = self.fields.get(&row.field_id).ok_or_else(|| ConstraintViolation::ForeignKey {
            column: "field_values.field_id",
            key: row.field_id.to_string(),
        })?;
        let record = self.records.get(&row.record_id).ok_or_else(|| ConstraintViolation::ForeignKey {
            column: "field_values.record_id",
            key: row.record_id.to_string(),
        })?;
        if field.model_id != record.model_id {
            return Err(ConstraintViolation::CrossModelReference {
                field_id: row.field_id.to_string(),
                record_id: row.record_id.to_string(),
            });
        }
        let taken = self
            .values_by_record
            .get(&row.record_id)
            .is_some_and(|by_field| by_field.contains_key(&row.field_id));
        if taken {
            return Err(ConstraintViolation::DuplicateAttribute {
                record_id: row.record_id.to_string(),
                field_id: row.field_id.to_string(),
            });
        }
        self.insert_row(Row::Value(row.clone()));
        undo.entries.push(Undo::Inserted(RowKey::Value(row.id)));
        Ok(())
    }

    fn delete_value(&mut self, id: ValueId, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        let row = self.remove_row(RowKey::Value(id)).ok_or_else(|| ConstraintViolation::MissingRow {
            table: FIELD_VALUES,
            key: id.to_string(),
        })?;
        undo.entries.push(Undo::Removed(row));
        Ok(())
    }

    fn delete_record(&mut self, id: RecordId, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if !self.records.contains_key(&id) {
            return Err(ConstraintViolation::MissingRow {
                table: MODEL_RECORDS,
                key: id.to_string(),
            });
        }
        // ON DELETE CASCADE: field_values.record_id
        let value_ids: Vec<ValueId> = self
            .values_by_record
            .get(&id)
            .map(|by_field| by_field.values().copied().collect())
            .unwrap_or_default();
        for value_id in value_ids {
            self.delete_value(value_id, undo)?;
        }
        if let Some(row) = self.remove_row(RowKey::Record(id)) {
            undo.entries.push(Undo::Removed(row));
        }
        Ok(())
    }

    fn delete_field(&mut self, id: FieldId, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if !self.fields.contains_key(&id) {
            return Err(ConstraintViolation::MissingRow {
                table: FIELD_DEFINITIONS,
                key: id.to_string(),
            });
        }
        // ON DELETE RESTRICT: field_values.field_id
        let references = self.references_to(id);
        if references > 0 {
            return Err(ConstraintViolation::Restricted {
                table: FIELD_DEFINITIONS,
                key: id.to_string(),
                references,
            });
        }
        if let Some(row) = self.remove_row(RowKey::Field(id)) {
            undo.entries.push(Undo::Removed(row));
        }
        Ok(())
    }

    fn delete_model(&mut self, id: ModelId, undo: &mut UndoLog) -> Result<(), ConstraintViolation> {
        if !self.models.contains_key(&id) {
            return Err(ConstraintViolation::MissingRow {
                table: MODEL_DEFINITIONS,
                key: id.to_string(),
            });
        }
        // Records first so their values release the restrict on fields
        let record_ids: Vec<RecordId> = self
            .records_by_model
            .get(&id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for record_id in record_ids {
            self.delete_record(record_id, undo)?;
        }
        let field_ids: Vec<FieldId> = self
            .fields_by_model
            .get(&id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for field_id in field_ids {
            self.delete_field(field_id, undo)?;
        }
        if let Some(row) = self.remove_row(RowKey::Model(id)) {
            undo.entries.push(Undo::Removed(row));
        }
        Ok(())
    }

    // ==================
    // Raw row maintenance (no constraint checks)
    // ==================

    fn insert_row(&mut self, row: Row) {
        match row {
            Row::Model(row) => {
                self.model_names.insert(row.name.clone(), row.id);
                self.models.insert(row.id, row);
            }
            Row::Field(row) => {
                self.fields_by_model.entry(row.model_id).or_default().insert(row.id);
                self.fields.insert(row.id, row);
            }
            Row::Record(row) => {
                self.records_by_model.entry(row.model_id).or_default().insert(row.id);
                self.records.insert(row.id, row);
            }
            Row::Value(row) => {
                self.values_by_record
                    .entry(row.record_id)
                    .or_default()
                    .insert(row.field_id, row.id);
                self.values_by_field.entry(row.field_id).or_default().insert(row.id);
                self.values.insert(row.id, row);
            }
        }
    }

    fn remove_row(&mut self, key: RowKey) -> Option<Row> {
        match key {
            RowKey::Model(id) => {
                let row = self.models.remove(&id)?;
                self.model_names.remove(&row.name);
                self.fields_by_model.remove(&id);
                self.records_by_model.remove(&id);
                Some(Row::Model(row))
            }
            RowKey::Field(id) => {
                let row = self.fields.remove(&id)?;
                detach(&mut self.fields_by_model, &row.model_id, &id);
                self.values_by_field.remove(&id);
                Some(Row::Field(row))
            }
            RowKey::Record(id) => {
                let row = self.records.remove(&id)?;
                detach(&mut self.records_by_model, &row.model_id, &id);
                self.values_by_record.remove(&id);
                Some(Row::Record(row))
            }
            RowKey::Value(id) => {
                let row = self.values.remove(&id)?;
                if let Some(by_field) = self.values_by_record.get_mut(&row.record_id) {
                    by_field.remove(&row.field_id);
                    if by_field.is_empty() {
                        self.values_by_record.remove(&row.record_id);
                    }
                }
                detach(&mut self.values_by_field, &row.field_id, &id);
                Some(Row::Value(row))
            }
        }
    }
}

/// Removes `child` from a parent's index set, dropping empty sets.
fn detach<P: Ord, C: Ord>(index: &mut BTreeMap<P, BTreeSet<C>>, parent: &P, child: &C) {
    if let Some(children) = index.get_mut(parent) {
        children.remove(child);
        if children.is_empty() {
            index.remove(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldType;
    use chrono::Utc;

    fn model_row(name: &str) -> ModelRow {
        ModelRow {
            id: ModelId::generate(),
            name: name.to_string(),
            owner: None,
            created_at: Utc::now(),
        }
    }

    fn field_row(model_id: ModelId, name: &str, position: u32) -> FieldRow {
        FieldRow {
            id: FieldId::generate(),
            model_id,
            name: name.to_string(),
            field_type: FieldType::String,
            position,
        }
    }

    fn record_row(model_id: ModelId) -> RecordRow {
        RecordRow {
            id: RecordId::generate(),
            model_id,
            owner: None,
            created_at: Utc::now(),
        }
    }

    fn value_row(field_id: FieldId, record_id: RecordId, value: &str) -> ValueRow {
        ValueRow {
            id: ValueId::generate(),
            field_id,
            record_id,
            value: value.to_string(),
        }
    }

    /// One model with two fields and one record holding a value for each.
    fn populated() -> (Tables, ModelRow, Vec<FieldRow>, RecordRow, Vec<ValueRow>) {
        let mut tables = Tables::new();
        let model = model_row("Invoice");
        let fields = vec![field_row(model.id, "amount", 0), field_row(model.id, "note", 1)];
        let record = record_row(model.id);
        let values = vec![
            value_row(fields[0].id, record.id, "12.50"),
            value_row(fields[1].id, record.id, "paid"),
        ];

        let mut batch = Batch::new();
        batch.insert_model(model.clone());
        for f in &fields {
            batch.insert_field(f.clone());
        }
        batch.insert_record(record.clone());
        for v in &values {
            batch.insert_value(v.clone());
        }
        let _ = tables.apply(&batch).unwrap();
        (tables, model, fields, record, values)
    }

    #[test]
    fn test_insert_and_read_back() {
        let (tables, model, fields, record, _) = populated();
        assert_eq!(tables.model_by_name("Invoice").map(|m| m.id), Some(model.id));
        assert_eq!(tables.fields_of(model.id).len(), 2);
        assert_eq!(tables.fields_of(model.id)[0].name, "amount");
        assert_eq!(tables.record(record.id).map(|r| r.model_id), Some(model.id));
        assert_eq!(tables.values_of(record.id).len(), 2);
        assert_eq!(tables.references_to(fields[0].id), 1);
    }

    #[test]
    fn test_fields_ordered_by_position() {
        let mut tables = Tables::new();
        let model = model_row("Ordered");
        let mut batch = Batch::new();
        batch.insert_model(model.clone());
        for (position, name) in ["z", "a", "m"].iter().enumerate() {
            batch.insert_field(field_row(model.id, name, position as u32));
        }
        let _ = tables.apply(&batch).unwrap();

        let names: Vec<_> = tables.fields_of(model.id).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_duplicate_model_name_rejected() {
        let (mut tables, ..) = populated();
        let mut batch = Batch::new();
        batch.insert_model(model_row("Invoice"));

        let err = tables.apply(&batch).unwrap_err();
        assert_eq!(err, ConstraintViolation::DuplicateModelName { name: "Invoice".into() });
        assert_eq!(tables.model_count(), 1);
    }

    #[test]
    fn test_model_names_are_case_sensitive() {
        let (mut tables, ..) = populated();
        let mut batch = Batch::new();
        batch.insert_model(model_row("invoice"));
        assert!(tables.apply(&batch).is_ok());
        assert_eq!(tables.model_count(), 2);
    }

    #[test]
    fn test_duplicate_field_name_within_model_rejected() {
        let (mut tables, model, ..) = populated();
        let mut batch = Batch::new();
        batch.insert_field(field_row(model.id, "amount", 5));
        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::DuplicateFieldName { .. })
        ));
    }

    #[test]
    fn test_field_requires_model() {
        let mut tables = Tables::new();
        let mut batch = Batch::new();
        batch.insert_field(field_row(ModelId::generate(), "orphan", 0));
        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::ForeignKey { column: "field_definitions.model_id", .. })
        ));
    }

    #[test]
    fn test_cross_model_value_rejected() {
        let (mut tables, _, fields, ..) = populated();
        let other = model_row("Other");
        let other_record = record_row(other.id);
        let mut batch = Batch::new();
        batch
            .insert_model(other.clone())
            .insert_record(other_record.clone())
            .insert_value(value_row(fields[0].id, other_record.id, "1"));

        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::CrossModelReference { .. })
        ));
        // The model and record inserted earlier in the batch are gone too
        assert!(tables.model_by_name("Other").is_none());
        assert!(tables.record(other_record.id).is_none());
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let (mut tables, _, fields, record, _) = populated();
        let mut batch = Batch::new();
        batch.insert_value(value_row(fields[0].id, record.id, "99"));
        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::DuplicateAttribute { .. })
        ));
        assert_eq!(tables.value_count(), 2);
    }

    #[test]
    fn test_delete_field_restricted_while_referenced() {
        let (mut tables, _, fields, _, values) = populated();
        let mut batch = Batch::new();
        batch.delete_field(fields[0].id);

        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::Restricted { references: 1, .. })
        ));
        assert!(tables.field(fields[0].id).is_some());

        let mut batch = Batch::new();
        batch.delete_value(values[0].id).delete_field(fields[0].id);
        let _ = tables.apply(&batch).unwrap();
        assert!(tables.field(fields[0].id).is_none());
    }

    #[test]
    fn test_delete_record_cascades_to_values() {
        let (mut tables, _, fields, record, _) = populated();
        let mut batch = Batch::new();
        batch.delete_record(record.id);
        let undo = tables.apply(&batch).unwrap();

        assert_eq!(undo.len(), 3);
        assert_eq!(tables.record_count(), 0);
        assert_eq!(tables.value_count(), 0);
        assert_eq!(tables.references_to(fields[0].id), 0);
        assert_eq!(tables.field_count(), 2);
    }

    #[test]
    fn test_delete_model_cascades_everything() {
        let (mut tables, model, ..) = populated();
        let mut batch = Batch::new();
        batch.delete_model(model.id);
        let _ = tables.apply(&batch).unwrap();

        assert_eq!(tables.model_count(), 0);
        assert_eq!(tables.field_count(), 0);
        assert_eq!(tables.record_count(), 0);
        assert_eq!(tables.value_count(), 0);
        assert!(tables.model_by_name("Invoice").is_none());
    }

    #[test]
    fn test_delete_missing_row() {
        let mut tables = Tables::new();
        let mut batch = Batch::new();
        batch.delete_record(RecordId::generate());
        assert!(matches!(
            tables.apply(&batch),
            Err(ConstraintViolation::MissingRow { table: MODEL_RECORDS, .. })
        ));
    }

    #[test]
    fn test_failed_batch_restores_cascaded_rows() {
        let (mut tables, model, fields, record, _) = populated();
        let mut batch = Batch::new();
        // Cascade succeeds, then the second delete fails on a missing row
        batch.delete_model(model.id).delete_value(ValueId::generate());

        assert!(tables.apply(&batch).is_err());
        assert_eq!(tables.model_by_name("Invoice").map(|m| m.id), Some(model.id));
        assert_eq!(tables.fields_of(model.id).len(), 2);
        assert_eq!(tables.records_of(model.id).len(), 1);
        assert_eq!(tables.values_of(record.id).len(), 2);
        assert_eq!(tables.references_to(fields[1].id), 1);
    }

    #[test]
    fn test_explicit_rollback() {
        let (mut tables, ..) = populated();
        let mut batch = Batch::new();
        batch.insert_model(model_row("Draft"));
        let undo = tables.apply(&batch).unwrap();
        assert!(tables.model_by_name("Draft").is_some());

        tables.rollback(undo);
        assert!(tables.model_by_name("Draft").is_none());
        assert_eq!(tables.model_count(), 1);
    }
}
