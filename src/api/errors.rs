//! API error types
//!
//! API errors are pass-through: engine errors keep their `FORGE_*` code and
//! message. Only requests that never reach the engine get API-level codes.

use std::fmt;

use crate::error::EngineError;

/// API error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected or failed, engine still usable
    Error,
    /// Store is unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// API-level error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Malformed JSON, missing or mistyped member
    ForgeInvalidRequest,
    /// `op` names no supported operation
    ForgeUnknownOperation,
    /// Response could not be rendered
    ForgeInternal,
}

impl ApiErrorCode {
    /// Wire code string
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::ForgeInvalidRequest => "FORGE_INVALID_REQUEST",
            ApiErrorCode::ForgeUnknownOperation => "FORGE_UNKNOWN_OPERATION",
            ApiErrorCode::ForgeInternal => "FORGE_INTERNAL",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned to an API caller
#[derive(Debug)]
pub struct ApiError {
    code: String,
    message: String,
    severity: Severity,
}

impl ApiError {
    /// Malformed envelope or missing member
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::with_code(ApiErrorCode::ForgeInvalidRequest, reason)
    }

    /// Unrecognized `op`
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_code(
            ApiErrorCode::ForgeUnknownOperation,
            format!("Unknown operation: {}", op),
        )
    }

    /// Failure outside any subsystem taxonomy
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::with_code(ApiErrorCode::ForgeInternal, reason)
    }

    fn with_code(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code().to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Passes an engine error through with its code and message
    pub fn from_engine(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            severity: if err.is_fatal() {
                Severity::Fatal
            } else {
                Severity::Error
            },
        }
    }

    /// Returns the error code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
