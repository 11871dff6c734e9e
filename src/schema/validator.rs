//! Shape checks for model definitions
//!
//! Run before anything reaches the store. Name uniqueness across models is
//! not checked here; the store enforces it when the definition commits.

use std::collections::HashSet;

use super::types::FieldSpec;
use crate::error::{EngineError, EngineResult};

/// Rejects empty names and duplicate field names.
pub fn validate_definition(name: &str, fields: &[FieldSpec]) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::invalid("model name must not be empty"));
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            return Err(EngineError::invalid(format!(
                "field name at position {} must not be empty",
                position
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(EngineError::invalid_field(
                field.name.clone(),
                format!("duplicate field name '{}'", field.name),
            ));
        }
    }

    Ok(())
}
