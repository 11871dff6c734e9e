//! Value codec for field values
//!
//! Field values are persisted as canonical strings keyed by the declared
//! field type of the owning field. This module is the only place that
//! interprets those strings.
//!
//! # Rules
//!
//! - `string` accepts any UTF-8 string, including the empty string
//! - `integer` accepts a signed base-10 whole number within i64 range
//! - `float` accepts a finite decimal or exponential literal
//! - No coercion across types (`"3.5"` is never an integer)
//! - `encode(decode(s)) == s` byte for byte

mod types;
mod validator;

pub use types::{DecodedValue, FieldType, TypeMismatch, UnknownFieldType, Value};
pub use validator::{decode, encode, validate};
