//! Records of runtime-defined models
//!
//! A record is a header row in `model_records` plus one `field_values` row
//! per supplied field. Values are validated against their field's declared
//! type before anything is written.

mod engine;
mod store;
mod types;

pub use engine::RecordEngine;
pub use store::RecordStore;
pub use types::{ModelRecord, ResolvedValue};
