//! Records and their resolved field values

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::{self, DecodedValue, FieldType, TypeMismatch};
use crate::store::{FieldId, ModelId, Owner, RecordId, ValueId};

/// A stored value joined with the field it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    pub id: ValueId,
    pub field_id: FieldId,
    pub field_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Canonical string form, exactly as supplied at creation
    pub value: String,
}

impl ResolvedValue {
    /// Decodes the stored string under the field's type.
    pub fn decode(&self) -> Result<DecodedValue, TypeMismatch> {
        codec::decode(&self.value, &self.field_name, self.field_type)
    }
}

/// One instance of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRecord {
    pub id: RecordId,
    pub model_id: ModelId,
    /// Ordered by field position; absent fields have no entry
    pub values: Vec<ResolvedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
}

impl ModelRecord {
    /// Raw value stored for `field`, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.field_name == field)
            .map(|v| v.value.as_str())
    }

    /// Field name to raw value
    pub fn to_map(&self) -> BTreeMap<&str, &str> {
        self.values
            .iter()
            .map(|v| (v.field_name.as_str(), v.value.as_str()))
            .collect()
    }
}
