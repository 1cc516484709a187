//! Persisted record type.

use serde::{Deserialize, Serialize};

use crate::{
    core::set::sort_encoded,
    types::ValueType,
    value::PrefValue,
};

/// One key-tagged, type-tagged persisted value.
///
/// The value is kept as its raw text so that a hand-edited file with a
/// corrupt value still loads; typed readers fall back to their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Lookup key, unique within a store.
    pub key: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Raw encoded value.
    pub value: String,
}

impl Record {
    /// Builds a record from already-encoded parts.
    pub fn new(key: impl Into<String>, value_type: ValueType, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_type,
            value: value.into(),
        }
    }

    /// Builds a record holding `value`.
    pub fn from_value(key: impl Into<String>, value: &PrefValue) -> Self {
        Self::new(key, value.value_type(), value.encode())
    }

    /// A `false` boolean record, used for freshly added editor rows.
    pub fn blank(key: impl Into<String>) -> Self {
        Self::new(key, ValueType::Bool, ValueType::Bool.blank_raw())
    }

    /// Decodes the raw value according to the declared type.
    pub fn decode(&self) -> Option<PrefValue> {
        PrefValue::decode(self.value_type, &self.value)
    }

    /// Sorts set elements in place. Returns true if the raw value changed.
    pub fn sort(&mut self) -> bool {
        if self.value_type != ValueType::Set {
            return false;
        }
        let sorted = sort_encoded(&self.value);
        if sorted == self.value {
            return false;
        }
        self.value = sorted;
        true
    }
}
