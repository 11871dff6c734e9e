//! Row types of the four meta-tables
//!
//! ```text
//! model_definitions  (id PK, name UNIQUE)
//! field_definitions  (id PK, model_id FK -> model_definitions ON DELETE CASCADE)
//! model_records      (id PK, model_id FK -> model_definitions ON DELETE CASCADE)
//! field_values       (id PK, field_id FK -> field_definitions ON DELETE RESTRICT,
//!                     record_id FK -> model_records ON DELETE CASCADE,
//!                     UNIQUE (record_id, field_id))
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FieldId, ModelId, Owner, RecordId, ValueId};
use crate::codec::FieldType;

pub const MODEL_DEFINITIONS: &str = "model_definitions";
pub const FIELD_DEFINITIONS: &str = "field_definitions";
pub const MODEL_RECORDS: &str = "model_records";
pub const FIELD_VALUES: &str = "field_values";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRow {
    pub id: ModelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub id: FieldId,
    pub model_id: ModelId,
    pub name: String,
    pub field_type: FieldType,
    /// Declaration order within the model
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: RecordId,
    pub model_id: ModelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRow {
    pub id: ValueId,
    pub field_id: FieldId,
    pub record_id: RecordId,
    /// Canonical string form, decodable under the field's type
    pub value: String,
}
