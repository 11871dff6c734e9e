//! API response types
//!
//! One JSON object per response: `{"status":"ok","data":...}` or
//! `{"status":"error","code":"FORGE_...","message":"..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiError;

/// Rendered when a response cannot be serialized
const UNRENDERABLE: &str =
    r#"{"status":"error","code":"FORGE_INTERNAL","message":"response could not be rendered"}"#;

/// `{"status":"ok","data":...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub data: Value,
}

impl SuccessResponse {
    /// Wraps a payload
    pub fn new(data: Value) -> Self {
        Self {
            status: "ok".to_string(),
            data,
        }
    }

    /// Success with `data: null`
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }
}

/// `{"status":"error","code":...,"message":...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    /// Renders an API error
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            status: "error".to_string(),
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }
}

/// Unified response type
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    /// Success carrying `data`
    pub fn success(data: Value) -> Self {
        Response::Success(SuccessResponse::new(data))
    }

    /// Success with no payload
    pub fn ok() -> Self {
        Response::Success(SuccessResponse::empty())
    }

    /// Error response for `err`
    pub fn error(err: &ApiError) -> Self {
        Response::Error(ErrorResponse::from_error(err))
    }

    /// Single-line JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| UNRENDERABLE.to_string())
    }

    /// True for `status: ok`
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Error code, for error responses
    pub fn code(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error(e) => Some(&e.code),
        }
    }
}
