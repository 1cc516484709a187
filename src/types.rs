//! Shared primitive aliases and the value type tag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque version tag stamped when a store is first created.
pub type Revision = i32;

/// Value type tag carried by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    /// `true` / `false`.
    #[default]
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Raw text.
    String,
    /// Ordered set of distinct, `;`-free strings.
    Set,
}

impl ValueType {
    /// Canonical raw value for a freshly retyped or blank record.
    pub fn blank_raw(self) -> &'static str {
        match self {
            ValueType::Bool => "false",
            ValueType::Int => "0",
            ValueType::Float => "0",
            ValueType::String | ValueType::Set => "",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Float => "Float",
            ValueType::String => "String",
            ValueType::Set => "Set",
        };
        f.write_str(name)
    }
}
