//! Model and field definitions as seen by callers

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::FieldType;
use crate::store::{FieldId, FieldRow, ModelId, ModelRow, Owner};

/// A field requested in a model definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A named, typed attribute belonging to one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    pub model_id: ModelId,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Declaration order within the model, starting at 0
    pub position: u32,
}

impl From<&FieldRow> for FieldDefinition {
    fn from(row: &FieldRow) -> Self {
        Self {
            id: row.id,
            model_id: row.model_id,
            name: row.name.clone(),
            field_type: row.field_type,
            position: row.position,
        }
    }
}

impl FieldDefinition {
    pub(crate) fn to_row(&self) -> FieldRow {
        FieldRow {
            id: self.id,
            model_id: self.model_id,
            name: self.name.clone(),
            field_type: self.field_type,
            position: self.position,
        }
    }
}

/// A user-defined model: a name and its ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDefinition {
    pub id: ModelId,
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
}

impl ModelDefinition {
    /// Assembles a definition from its model row and field rows.
    ///
    /// `fields` must already be in declaration order.
    pub(crate) fn from_rows(model: &ModelRow, fields: &[&FieldRow]) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            fields: fields.iter().map(|row| FieldDefinition::from(*row)).collect(),
            owner: model.owner.clone(),
            created_at: model.created_at,
        }
    }

    pub(crate) fn to_row(&self) -> ModelRow {
        ModelRow {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
        }
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
