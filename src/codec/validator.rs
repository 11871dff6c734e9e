//! Literal validation through a dispatch table keyed by field type

use std::sync::OnceLock;

use regex::Regex;

use super::types::{DecodedValue, FieldType, TypeMismatch, Value};

type Decoder = fn(&str) -> Option<Value>;

/// One decoder per field type, indexed by the type's discriminant.
const DISPATCH: [(FieldType, Decoder); FieldType::COUNT] = [
    (FieldType::String, decode_string),
    (FieldType::Integer, decode_integer),
    (FieldType::Float, decode_float),
];

fn integer_literal() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?[0-9]+$").expect("integer literal pattern is valid")
    })
}

fn float_literal() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$")
            .expect("float literal pattern is valid")
    })
}

fn decode_string(raw: &str) -> Option<Value> {
    Some(Value::String(raw.to_string()))
}

fn decode_integer(raw: &str) -> Option<Value> {
    if !integer_literal().is_match(raw) {
        return None;
    }
    // Out of i64 range is a mismatch, not a clamp
    raw.parse::<i64>().ok().map(Value::Integer)
}

fn decode_float(raw: &str) -> Option<Value> {
    if !float_literal().is_match(raw) {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

/// Checks that `raw` is a valid literal of `field_type`.
///
/// # Errors
///
/// Returns `TypeMismatch` naming `field` if the literal does not parse.
pub fn validate(raw: &str, field: &str, field_type: FieldType) -> Result<(), TypeMismatch> {
    decode(raw, field, field_type).map(|_| ())
}

/// Decodes a stored literal under its field type.
pub fn decode(raw: &str, field: &str, field_type: FieldType) -> Result<DecodedValue, TypeMismatch> {
    let (_, decoder) = DISPATCH[field_type.index()];
    decoder(raw)
        .map(|value| DecodedValue::new(raw, value))
        .ok_or_else(|| TypeMismatch {
            field: field.to_string(),
            expected: field_type,
            value: raw.to_string(),
        })
}

/// Encodes a decoded value back to its storage literal.
pub fn encode(value: &DecodedValue) -> String {
    value.literal().to_string()
}
