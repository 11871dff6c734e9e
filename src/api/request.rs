//! API request types
//!
//! One JSON object per request, selected by `op`:
//!
//! ```text
//! {"op": "define_model", "caller": "u-1", "name": "Invoice",
//!  "fields": [{"name": "amount", "type": "float"}]}
//! {"op": "create_record", "model_id": "...", "values": {"amount": "12.50"}}
//! ```
//!
//! `caller` is optional on every request and is recorded as the owner of
//! anything the request creates.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use super::errors::{ApiError, ApiResult};
use crate::codec::FieldType;
use crate::error::EngineError;
use crate::schema::FieldSpec;
use crate::store::{FieldId, ModelId, Owner, RecordId, ValueId};

/// A parsed operation
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    DefineModel { name: String, fields: Vec<FieldSpec> },
    FindModel { name: String },
    GetModel { id: ModelId },
    DeleteModel { id: ModelId },
    DeleteField { id: FieldId },
    CreateRecord {
        model_id: ModelId,
        values: BTreeMap<String, String>,
    },
    GetRecord { id: RecordId },
    DeleteRecord { id: RecordId },
    DeleteValue { id: ValueId },
    /// Counter snapshot
    Metrics,
}

impl Request {
    /// Operation name as it appears in `op`
    pub fn op(&self) -> &'static str {
        match self {
            Request::DefineModel { .. } => "define_model",
            Request::FindModel { .. } => "find_model",
            Request::GetModel { .. } => "get_model",
            Request::DeleteModel { .. } => "delete_model",
            Request::DeleteField { .. } => "delete_field",
            Request::CreateRecord { .. } => "create_record",
            Request::GetRecord { .. } => "get_record",
            Request::DeleteRecord { .. } => "delete_record",
            Request::DeleteValue { .. } => "delete_value",
            Request::Metrics => "metrics",
        }
    }
}

/// A request plus the identity of whoever sent it
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub caller: Option<Owner>,
    pub request: Request,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

/// Raw request for parsing
#[derive(Debug, Deserialize)]
struct RawRequest {
    op: String,
    #[serde(default)]
    caller: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fields: Option<Vec<RawField>>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    values: Option<BTreeMap<String, String>>,
}

impl Envelope {
    /// Parse a request from a JSON string
    pub fn parse(json: &str) -> ApiResult<Self> {
        let raw: RawRequest = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        let request = match raw.op.as_str() {
            "define_model" => {
                let name = required(raw.name, "name")?;
                let fields = required(raw.fields, "fields")?
                    .into_iter()
                    .map(|field| {
                        let field_type = FieldType::from_str(&field.field_type).map_err(|e| {
                            ApiError::from_engine(&EngineError::invalid_field(
                                field.name.clone(),
                                e.to_string(),
                            ))
                        })?;
                        Ok(FieldSpec::new(field.name, field_type))
                    })
                    .collect::<ApiResult<Vec<_>>>()?;
                Request::DefineModel { name, fields }
            }
            "find_model" => Request::FindModel {
                name: required(raw.name, "name")?,
            },
            "get_model" => Request::GetModel {
                id: parse_id(raw.id, "id")?,
            },
            "delete_model" => Request::DeleteModel {
                id: parse_id(raw.id, "id")?,
            },
            "delete_field" => Request::DeleteField {
                id: parse_id(raw.id, "id")?,
            },
            "create_record" => Request::CreateRecord {
                model_id: parse_id(raw.model_id, "model_id")?,
                values: raw.values.unwrap_or_default(),
            },
            "get_record" => Request::GetRecord {
                id: parse_id(raw.id, "id")?,
            },
            "delete_record" => Request::DeleteRecord {
                id: parse_id(raw.id, "id")?,
            },
            "delete_value" => Request::DeleteValue {
                id: parse_id(raw.id, "id")?,
            },
            "metrics" => Request::Metrics,
            other => return Err(ApiError::unknown_operation(other)),
        };

        Ok(Envelope {
            caller: raw.caller.map(Owner::new),
            request,
        })
    }
}

fn required<T>(value: Option<T>, member: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::invalid_request(format!("Missing {}", member)))
}

fn parse_id<T: FromStr>(value: Option<String>, member: &str) -> ApiResult<T> {
    let raw = required(value, member)?;
    raw.parse()
        .map_err(|_| ApiError::invalid_request(format!("Malformed {}: '{}'", member, raw)))
}
