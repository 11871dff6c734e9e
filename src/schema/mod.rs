//! Runtime model definitions
//!
//! A model is a name plus an ordered list of typed fields, stored as rows
//! of `model_definitions` and `field_definitions`.
//!
//! - Model names are unique and case-sensitive
//! - Field names are unique within their model
//! - Fields are created only with their model
//! - A field cannot be deleted while values reference it

mod registry;
mod store;
mod types;
mod validator;

pub(crate) use registry::{missing_as_not_found, owner_label};
pub use registry::SchemaRegistry;
pub use store::SchemaStore;
pub use types::{FieldDefinition, FieldSpec, ModelDefinition};
pub use validator::validate_definition;
