//! Schema registry: the facade for defining and removing models

use std::sync::Arc;

use chrono::Utc;

use super::store::SchemaStore;
use super::types::{FieldDefinition, FieldSpec, ModelDefinition};
use super::validator::validate_definition;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::observability::{Event, Logger};
use crate::store::{Backend, ConstraintViolation, FieldId, ModelId, Owner};

/// Defines, looks up and deletes models.
///
/// Safe to share across threads. Uniqueness of model names is decided by
/// the store inside the commit, never by a prior lookup.
pub struct SchemaRegistry<B> {
    store: SchemaStore<B>,
}

impl<B> Clone for SchemaRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<B: Backend> SchemaRegistry<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            store: SchemaStore::new(backend),
        }
    }

    pub fn store(&self) -> &SchemaStore<B> {
        &self.store
    }

    /// Creates a model and its fields in one atomic batch.
    ///
    /// # Errors
    ///
    /// - `Invalid` for an empty model or field name, or a repeated field name
    /// - `Conflict` if the name is already taken
    pub fn define_model(
        &self,
        name: &str,
        fields: &[FieldSpec],
        owner: Option<Owner>,
    ) -> EngineResult<ModelDefinition> {
        validate_definition(name, fields)?;

        let model_id = ModelId::generate();
        let definition = ModelDefinition {
            id: model_id,
            name: name.to_string(),
            fields: fields
                .iter()
                .zip(0u32..)
                .map(|(spec, position)| FieldDefinition {
                    id: FieldId::generate(),
                    model_id,
                    name: spec.name.clone(),
                    field_type: spec.field_type,
                    position,
                })
                .collect(),
            owner,
            created_at: Utc::now(),
        };

        self.store.insert(&definition).map_err(|err| {
            EngineError::from_storage(err, |violation| match violation {
                ConstraintViolation::DuplicateModelName { name } => {
                    Some(EngineError::Conflict { name: name.clone() })
                }
                _ => None,
            })
        })?;

        let id = definition.id.to_string();
        let field_count = definition.fields.len().to_string();
        Logger::info(
            Event::ModelDefined.as_str(),
            &[
                ("model_id", id.as_str()),
                ("name", definition.name.as_str()),
                ("fields", field_count.as_str()),
                ("owner", owner_label(definition.owner.as_ref())),
            ],
        );

        Ok(definition)
    }

    pub fn find_model_by_name(&self, name: &str) -> EngineResult<ModelDefinition> {
        self.store
            .load_by_name(name)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Model, name))
    }

    pub fn get_model(&self, id: ModelId) -> EngineResult<ModelDefinition> {
        self.store
            .load(id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Model, id))
    }

    /// Deletes a model together with its fields, records and values.
    pub fn delete_model(&self, id: ModelId) -> EngineResult<()> {
        self.store
            .delete(id)
            .map_err(|err| missing_as_not_found(err, EntityKind::Model, id))?;

        let id = id.to_string();
        Logger::info(Event::ModelDeleted.as_str(), &[("model_id", id.as_str())]);
        Ok(())
    }

    /// Deletes one field definition.
    ///
    /// # Errors
    ///
    /// `Restricted` while any stored value references the field.
    pub fn delete_field(&self, id: FieldId) -> EngineResult<()> {
        let field = self
            .store
            .load_field(id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Field, id))?;

        self.store.delete_field(id).map_err(|err| {
            EngineError::from_storage(err, |violation| match violation {
                ConstraintViolation::Restricted { references, .. } => {
                    Some(EngineError::Restricted {
                        field: field.name.clone(),
                        references: *references,
                    })
                }
                ConstraintViolation::MissingRow { .. } => {
                    Some(EngineError::not_found(EntityKind::Field, id))
                }
                _ => None,
            })
        })?;

        let id = id.to_string();
        let model_id = field.model_id.to_string();
        Logger::info(
            Event::FieldDeleted.as_str(),
            &[
                ("field_id", id.as_str()),
                ("model_id", model_id.as_str()),
                ("name", field.name.as_str()),
            ],
        );
        Ok(())
    }
}

/// Maps a delete of an absent row to `NotFound`.
pub(crate) fn missing_as_not_found(
    err: crate::store::StorageError,
    entity: EntityKind,
    key: impl std::fmt::Display,
) -> EngineError {
    EngineError::from_storage(err, |violation| match violation {
        ConstraintViolation::MissingRow { .. } => Some(EngineError::not_found(entity, key)),
        _ => None,
    })
}

pub(crate) fn owner_label(owner: Option<&Owner>) -> &str {
    owner.map(Owner::as_str).unwrap_or("-")
}
