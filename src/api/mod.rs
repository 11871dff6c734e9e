//! Request/response layer for modelforge
//!
//! Translates JSON requests into schema registry and record engine calls
//! and renders their results.
//!
//! # Supported Operations
//!
//! - define_model, find_model, get_model, delete_model
//! - delete_field
//! - create_record, get_record, delete_record
//! - delete_value
//! - metrics

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult, Severity};
pub use handler::ApiHandler;
pub use request::{Envelope, Request};
pub use response::{ErrorResponse, Response, SuccessResponse};
