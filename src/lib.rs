//! modelforge - runtime-defined models and records
//!
//! Models (named, ordered lists of typed fields) are defined at runtime and
//! stored as rows of four meta-tables, together with the records that
//! instantiate them:
//!
//! ```text
//! model_definitions ─┬─< field_definitions ──┐ (restrict)
//!                    └─< model_records ─────<┴ field_values
//! ```
//!
//! - [`schema::SchemaRegistry`] defines, finds and deletes models
//! - [`record::RecordEngine`] creates, reads and deletes records
//! - [`codec`] validates raw strings against a field's declared type
//! - [`store`] holds the tables and enforces their constraints atomically

pub mod api;
pub mod cli;
pub mod codec;
pub mod error;
pub mod observability;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{EngineError, EngineResult, EntityKind};
