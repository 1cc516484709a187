//! Typed views over the raw record strings.

use crate::{
    core::set::{decode_set, encode_set, is_valid_element},
    types::ValueType,
};

/// A Rust type that can be stored in a record.
///
/// `encode` must produce a string that `decode` accepts, so that a set
/// followed by a get returns the same value.
pub trait PrefType: Sized {
    /// Tag written next to values of this type.
    const VALUE_TYPE: ValueType;

    /// Canonical raw form.
    fn encode(&self) -> String;

    /// Parses a raw value. `None` means the stored text is corrupt.
    fn decode(raw: &str) -> Option<Self>;

    /// First element that cannot be encoded, for types that have elements.
    fn invalid_element(&self) -> Option<&str> {
        None
    }
}

impl PrefType for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl PrefType for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int;

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl PrefType for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    // `Display` for f32 is the shortest text that parses back to the same bits.
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl PrefType for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl PrefType for Vec<String> {
    const VALUE_TYPE: ValueType = ValueType::Set;

    fn encode(&self) -> String {
        encode_set(self)
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(decode_set(raw))
    }

    fn invalid_element(&self) -> Option<&str> {
        self.iter().map(String::as_str).find(|e| !is_valid_element(e))
    }
}

/// Decoded record value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i32),
    /// Float value.
    Float(f32),
    /// Text value.
    String(String),
    /// Set elements in stored order.
    Set(Vec<String>),
}

impl PrefValue {
    /// Tag matching this variant.
    pub fn value_type(&self) -> ValueType {
        match self {
            PrefValue::Bool(_) => ValueType::Bool,
            PrefValue::Int(_) => ValueType::Int,
            PrefValue::Float(_) => ValueType::Float,
            PrefValue::String(_) => ValueType::String,
            PrefValue::Set(_) => ValueType::Set,
        }
    }

    /// Canonical raw form.
    pub fn encode(&self) -> String {
        match self {
            PrefValue::Bool(v) => v.encode(),
            PrefValue::Int(v) => v.encode(),
            PrefValue::Float(v) => v.encode(),
            PrefValue::String(v) => v.clone(),
            PrefValue::Set(v) => v.encode(),
        }
    }

    /// Parses `raw` as `value_type`. `None` when the text is corrupt.
    pub fn decode(value_type: ValueType, raw: &str) -> Option<Self> {
        match value_type {
            ValueType::Bool => bool::decode(raw).map(PrefValue::Bool),
            ValueType::Int => i32::decode(raw).map(PrefValue::Int),
            ValueType::Float => f32::decode(raw).map(PrefValue::Float),
            ValueType::String => String::decode(raw).map(PrefValue::String),
            ValueType::Set => Vec::<String>::decode(raw).map(PrefValue::Set),
        }
    }

    /// First set element that cannot be encoded.
    pub fn invalid_element(&self) -> Option<&str> {
        match self {
            PrefValue::Set(v) => v.invalid_element(),
            _ => None,
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Bool(value)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        PrefValue::Int(value)
    }
}

impl From<f32> for PrefValue {
    fn from(value: f32) -> Self {
        PrefValue::Float(value)
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        PrefValue::String(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::String(value.to_owned())
    }
}

impl From<Vec<String>> for PrefValue {
    fn from(value: Vec<String>) -> Self {
        PrefValue::Set(value)
    }
}
