//! Core types for the settings client.

use crate::error::{Result, SettingsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type of a schema entry, written as a single character in schema files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signature {
    /// `s`
    String,
    /// `b`
    Boolean,
    /// `i`
    Int,
}

impl Signature {
    /// Parse a signature tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(Signature::String),
            "b" => Some(Signature::Boolean),
            "i" => Some(Signature::Int),
            _ => None,
        }
    }

    /// The single-character tag.
    pub fn tag(self) -> char {
        match self {
            Signature::String => 's',
            Signature::Boolean => 'b',
            Signature::Int => 'i',
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A typed setting value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Boolean(bool),
    Int(i32),
}

impl Value {
    pub fn signature(&self) -> Signature {
        match self {
            Value::String(_) => Signature::String,
            Value::Boolean(_) => Signature::Boolean,
            Value::Int(_) => Signature::Int,
        }
    }

    /// Decode wire text according to a signature.
    pub fn decode(signature: Signature, text: &str) -> Result<Self> {
        match signature {
            Signature::String => Ok(Value::String(text.to_string())),
            Signature::Boolean => decode_boolean(text).map(Value::Boolean),
            Signature::Int => decode_integer(text).map(Value::Int),
        }
    }

    /// Wire text for this value.
    pub fn encode(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => encode_boolean(*b).to_string(),
            Value::Int(i) => i.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

/// Decode a boolean from its wire text.
///
/// Only the exact spellings `true`, `TRUE`, `True`, `1` and `false`, `FALSE`,
/// `False`, `0` are accepted.
pub fn decode_boolean(text: &str) -> Result<bool> {
    match text {
        "true" | "TRUE" | "True" | "1" => Ok(true),
        "false" | "FALSE" | "False" | "0" => Ok(false),
        _ => Err(SettingsError::InvalidBoolean(text.to_string())),
    }
}

pub fn encode_boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Decode a signed decimal integer that fits in an `i32`.
pub fn decode_integer(text: &str) -> Result<i32> {
    let digits = text.strip_prefix(&['-', '+'][..]).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SettingsError::InvalidInteger(text.to_string()));
    }
    text.parse::<i32>()
        .map_err(|_| SettingsError::InvalidInteger(text.to_string()))
}

/// One configurable key described by the schema file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Full key path, e.g. `/daemon/TimedLoginEnable`.
    pub key: String,
    pub signature: Signature,
    /// Wire text used when the bus has no value.
    pub default_value: String,
    /// Last value seen in a change notification (initially the default).
    pub value: String,
}

impl SchemaEntry {
    pub fn new(
        key: impl Into<String>,
        signature: Signature,
        default_value: impl Into<String>,
    ) -> Self {
        let default_value = default_value.into();
        Self {
            key: key.into(),
            signature,
            value: default_value.clone(),
            default_value,
        }
    }

    /// Decoded default value.
    ///
    /// Defaults are validated when the schema is parsed, so this only fails for
    /// entries built by hand with a bad default.
    pub fn default_typed(&self) -> Result<Value> {
        Value::decode(self.signature, &self.default_value)
    }

    /// Decoded cached value.
    pub fn value_typed(&self) -> Result<Value> {
        Value::decode(self.signature, &self.value)
    }
}

/// Handle for a change-notification registration. Always positive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotifyId(pub i32);

impl NotifyId {
    pub const FIRST: NotifyId = NotifyId(1);

    /// The id after this one, wrapping back to 1 instead of going non-positive.
    pub fn next(self) -> Self {
        match self.0.checked_add(1) {
            Some(n) if n > 0 => NotifyId(n),
            _ => NotifyId::FIRST,
        }
    }
}

impl fmt::Debug for NotifyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotifyId({})", self.0)
    }
}

impl fmt::Display for NotifyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `ValueChanged` broadcast from the settings service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    pub key: String,
    pub old_value: String,
    pub new_value: String,
}
