//! Field type tags and decoded values

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared type of a field.
///
/// The discriminant doubles as the index into the decoder dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FieldType {
    /// UTF-8 text, stored verbatim
    String = 0,
    /// Signed 64-bit whole number
    Integer = 1,
    /// Finite 64-bit floating point number
    Float = 2,
}

impl FieldType {
    /// Number of supported field types
    pub const COUNT: usize = 3;

    /// All supported field types in tag order
    pub const ALL: [FieldType; FieldType::COUNT] =
        [FieldType::String, FieldType::Integer, FieldType::Float];

    /// Returns the type name as used on the wire and in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A type tag outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.type_name() == s)
            .ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

/// Typed view of a stored field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Returns the field type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::String(_) => FieldType::String,
            Value::Integer(_) => FieldType::Integer,
            Value::Float(_) => FieldType::Float,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// A decoded value together with the literal it was decoded from.
///
/// The literal is the canonical storage form. Numeric values keep it so
/// that `"12.50"` is not re-encoded as `"12.5"`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    literal: String,
    value: Value,
}

impl DecodedValue {
    pub(crate) fn new(literal: impl Into<String>, value: Value) -> Self {
        Self {
            literal: literal.into(),
            value,
        }
    }

    /// Returns the stored literal
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Returns the typed value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the field type of the value
    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }
}

/// A raw value that does not parse under its field's declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}': expected {expected}, got '{value}'")]
pub struct TypeMismatch {
    /// Name of the offending field
    pub field: String,
    /// Declared type of the field
    pub expected: FieldType,
    /// Raw value as supplied
    pub value: String,
}
