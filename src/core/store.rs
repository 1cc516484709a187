use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    core::set::{add_to_encoded, encoded_contains, is_valid_element, remove_from_encoded},
    persist::PersistError,
    record::Record,
    types::{Revision, ValueType},
    value::{PrefType, PrefValue},
};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Keys must be non-empty.
    #[error("record key must not be empty")]
    EmptyKey,
    /// Another record already uses this key.
    #[error("record key {0:?} already exists")]
    DuplicateKey(String),
    /// Set elements must be non-empty and free of `;`.
    #[error("invalid set element {0:?}")]
    InvalidSetElement(String),
    /// Accessor type does not match the stored record type.
    #[error("preference {key:?} is stored as {found}, accessed as {expected}")]
    TypeMismatch {
        /// Offending key.
        key: String,
        /// Type requested by the caller.
        expected: ValueType,
        /// Type of the stored record.
        found: ValueType,
    },
    /// Record index past the end of the sequence.
    #[error("record index {index} out of range for {len} records")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current record count.
        len: usize,
    },
    /// Durable storage failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Serializable image of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    /// Revision stamped at creation.
    pub revision: Revision,
    /// Records in display order.
    pub records: Vec<Record>,
}

/// Ordered, key-unique record collection.
///
/// Every mutating method reports whether it changed anything and bumps
/// [`PrefStore::generation`] when it did; persistence is layered on top by
/// [`crate::prefs::Prefs`].
#[derive(Debug, Default)]
pub struct PrefStore {
    records: Vec<Record>,
    pos: HashMap<String, usize>,
    revision: Revision,
    generation: u64,
}

impl PrefStore {
    /// Creates an empty store stamped with `revision`.
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    /// Rebuilds a store from a snapshot.
    ///
    /// Duplicate keys are merged: the first record wins and later ones are
    /// dropped with a warning.
    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Self {
        let mut store = Self::new(snapshot.revision);
        for rec in snapshot.records {
            if store.pos.contains_key(&rec.key) {
                warn!(key = %rec.key, value = %rec.value, "dropping duplicate preference record");
                continue;
            }
            store.pos.insert(rec.key.clone(), store.records.len());
            store.records.push(rec);
        }
        store
    }

    /// Captures the current state for persistence.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            revision: self.revision,
            records: self.records.clone(),
        }
    }

    /// Revision stamped at creation.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Counter bumped by every mutation that changed state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records in display order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record stored under `key`.
    pub fn get_record(&self, key: &str) -> Option<&Record> {
        self.pos.get(key).map(|&i| &self.records[i])
    }

    /// Index of the record stored under `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.pos.get(key).copied()
    }

    /// True when a record exists for `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.pos.contains_key(key)
    }

    /// Inserts or overwrites the record for `key`.
    ///
    /// Returns `Ok(false)` without touching anything when the stored type and
    /// value are already identical.
    pub fn set_record(
        &mut self,
        key: &str,
        value_type: ValueType,
        value: String,
    ) -> Result<bool, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        match self.pos.get(key) {
            Some(&i) => {
                let rec = &mut self.records[i];
                if rec.value_type == value_type && rec.value == value {
                    return Ok(false);
                }
                rec.value_type = value_type;
                rec.value = value;
            }
            None => {
                self.pos.insert(key.to_owned(), self.records.len());
                self.records.push(Record::new(key, value_type, value));
            }
        }

        self.touch();
        Ok(true)
    }

    /// Removes the record for `key`. Returns true if one existed.
    pub fn delete_key(&mut self, key: &str) -> bool {
        let Some(i) = self.pos.get(key).copied() else {
            return false;
        };
        self.records.remove(i);
        self.reindex();
        self.touch();
        true
    }

    /// Checked typed read.
    ///
    /// `Ok(None)` when the key is absent or the stored text does not parse;
    /// the latter is logged.
    pub fn try_get<T: PrefType>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_record(key) {
            Some(rec) => decode_checked(rec),
            None => Ok(None),
        }
    }

    /// Typed read with default fallback.
    ///
    /// # Panics
    ///
    /// Panics when the record exists with a different type.
    pub fn get<T: PrefType>(&self, key: &str, default: T) -> T {
        match assert_type(self.try_get::<T>(key)) {
            Ok(Some(value)) => value,
            _ => default,
        }
    }

    /// Typed write through [`PrefStore::set_record`].
    pub fn set<T: PrefType>(&mut self, key: &str, value: &T) -> Result<bool, StoreError> {
        if let Some(elem) = value.invalid_element() {
            return Err(StoreError::InvalidSetElement(elem.to_owned()));
        }
        self.set_record(key, T::VALUE_TYPE, value.encode())
    }

    /// Writes a decoded value through [`PrefStore::set_record`].
    pub fn set_value(&mut self, key: &str, value: &PrefValue) -> Result<bool, StoreError> {
        if let Some(elem) = value.invalid_element() {
            return Err(StoreError::InvalidSetElement(elem.to_owned()));
        }
        self.set_record(key, value.value_type(), value.encode())
    }

    /// True when the set at `key` contains `value`; false when absent.
    ///
    /// # Panics
    ///
    /// Panics when `key` holds a non-set record.
    pub fn set_contains(&self, key: &str, value: &str) -> bool {
        match self.get_record(key) {
            Some(rec) => {
                if let Err(err) = check_type(rec, ValueType::Set) {
                    panic!("{err}");
                }
                encoded_contains(&rec.value, value)
            }
            None => false,
        }
    }

    /// Adds `value` to the set at `key`, creating the record if needed.
    ///
    /// # Panics
    ///
    /// Panics when `key` holds a non-set record.
    pub fn add_to_set(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        assert_type(self.try_add_to_set(key, value))
    }

    /// Removes every occurrence of `value` from the set at `key`.
    ///
    /// # Panics
    ///
    /// Panics when `key` holds a non-set record.
    pub fn remove_from_set(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        assert_type(self.try_remove_from_set(key, value))
    }

    /// Checked [`PrefStore::add_to_set`]; a non-set record yields
    /// [`StoreError::TypeMismatch`].
    pub fn try_add_to_set(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        if !is_valid_element(value) {
            return Err(StoreError::InvalidSetElement(value.to_owned()));
        }

        let Some(i) = self.pos.get(key).copied() else {
            return self.set_record(key, ValueType::Set, value.to_owned());
        };

        let rec = &mut self.records[i];
        check_type(rec, ValueType::Set)?;
        let Some(updated) = add_to_encoded(&rec.value, value) else {
            return Ok(false);
        };
        rec.value = updated;
        self.touch();
        Ok(true)
    }

    /// Checked [`PrefStore::remove_from_set`].
    pub fn try_remove_from_set(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        let Some(i) = self.pos.get(key).copied() else {
            return Ok(false);
        };

        let rec = &mut self.records[i];
        check_type(rec, ValueType::Set)?;
        let Some(updated) = remove_from_encoded(&rec.value, value) else {
            return Ok(false);
        };
        rec.value = updated;
        self.touch();
        Ok(true)
    }

    /// Record at `index` in display order.
    pub fn record_at(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// First free key of the form `base`, `base+`, `base++`, ...
    pub fn unique_key(&self, base: &str) -> String {
        let mut key = base.to_owned();
        while self.pos.contains_key(&key) {
            key.push('+');
        }
        key
    }

    /// Appends a blank record under a fresh key derived from `base`.
    pub fn push_blank(&mut self, base: &str) -> String {
        let key = self.unique_key(base);
        self.pos.insert(key.clone(), self.records.len());
        self.records.push(Record::blank(key.clone()));
        self.touch();
        key
    }

    /// Swaps the record at `index` with its predecessor.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.records.len() {
            return false;
        }
        self.swap(index - 1, index);
        true
    }

    /// Swaps the record at `index` with its successor.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.records.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    /// Removes and returns the record at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Record, StoreError> {
        self.check_index(index)?;
        let rec = self.records.remove(index);
        self.reindex();
        self.touch();
        Ok(rec)
    }

    /// Changes the key of the record at `index`.
    pub fn rename(&mut self, index: usize, new_key: &str) -> Result<bool, StoreError> {
        self.check_index(index)?;
        if new_key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if self.records[index].key == new_key {
            return Ok(false);
        }
        if self.pos.contains_key(new_key) {
            return Err(StoreError::DuplicateKey(new_key.to_owned()));
        }

        let old = std::mem::replace(&mut self.records[index].key, new_key.to_owned());
        self.pos.remove(&old);
        self.pos.insert(new_key.to_owned(), index);
        self.touch();
        Ok(true)
    }

    /// Changes the declared type of the record at `index`.
    ///
    /// The raw value is kept when it still parses under the new type,
    /// otherwise it is reset to the type's blank value.
    pub fn retype(&mut self, index: usize, value_type: ValueType) -> Result<bool, StoreError> {
        self.check_index(index)?;
        let rec = &mut self.records[index];
        if rec.value_type == value_type {
            return Ok(false);
        }
        rec.value_type = value_type;
        if PrefValue::decode(value_type, &rec.value).is_none() {
            rec.value = value_type.blank_raw().to_owned();
        }
        self.touch();
        Ok(true)
    }

    /// Overwrites the raw text of the record at `index` without validation.
    pub fn set_raw(&mut self, index: usize, raw: &str) -> Result<bool, StoreError> {
        self.check_index(index)?;
        let rec = &mut self.records[index];
        if rec.value == raw {
            return Ok(false);
        }
        rec.value = raw.to_owned();
        self.touch();
        Ok(true)
    }

    /// Sorts records by key and the elements of every set record.
    pub fn sort_all(&mut self) -> bool {
        let before = self.records.clone();
        self.records.sort_by(|a, b| a.key.cmp(&b.key));
        for rec in &mut self.records {
            rec.sort();
        }
        if self.records == before {
            return false;
        }
        self.reindex();
        self.touch();
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.records.swap(a, b);
        self.pos.insert(self.records[a].key.clone(), a);
        self.pos.insert(self.records[b].key.clone(), b);
        self.touch();
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index < self.records.len() {
            Ok(())
        } else {
            Err(StoreError::IndexOutOfRange {
                index,
                len: self.records.len(),
            })
        }
    }

    fn reindex(&mut self) {
        self.pos.clear();
        for (i, rec) in self.records.iter().enumerate() {
            self.pos.insert(rec.key.clone(), i);
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}

/// Decodes `rec` as `T`, failing on a type mismatch and logging corrupt text.
pub(crate) fn decode_checked<T: PrefType>(rec: &Record) -> Result<Option<T>, StoreError> {
    check_type(rec, T::VALUE_TYPE)?;
    let decoded = T::decode(&rec.value);
    if decoded.is_none() {
        warn!(
            key = %rec.key,
            value = %rec.value,
            value_type = %rec.value_type,
            "cannot parse stored preference value, using default"
        );
    }
    Ok(decoded)
}

/// Turns a type mismatch into a panic; accessing a key with the wrong type is
/// a caller bug, not a runtime condition.
pub(crate) fn assert_type<T>(result: Result<T, StoreError>) -> Result<T, StoreError> {
    match result {
        Err(err @ StoreError::TypeMismatch { .. }) => panic!("{err}"),
        other => other,
    }
}

fn check_type(rec: &Record, expected: ValueType) -> Result<(), StoreError> {
    if rec.value_type == expected {
        Ok(())
    } else {
        Err(StoreError::TypeMismatch {
            key: rec.key.clone(),
            expected,
            found: rec.value_type,
        })
    }
}
