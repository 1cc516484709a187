//! File-backed preference store.

use std::fs;

use tracing::{info, warn};

use crate::{
    config::{Backend, PrefsConfig},
    core::store::{PrefStore, StoreError, assert_type},
    editor::Editor,
    persist::{PrefSink, json::JsonFileSink, sqlite::SqliteSink},
    record::Record,
    types::{Revision, ValueType},
    value::{PrefType, PrefValue},
};

/// A [`PrefStore`] bound to durable storage.
///
/// Every accessor that changes state saves before returning; calls that
/// change nothing do not touch the sink. Use [`Prefs::batch`] to apply
/// several changes with a single save, or [`Prefs::editor`] for manual
/// maintenance with an explicit save.
///
/// Reading a key with the wrong typed accessor panics.
pub struct Prefs {
    store: PrefStore,
    sink: Box<dyn PrefSink>,
    dirty: bool,
    flush_on_drop: bool,
}

impl Prefs {
    /// Opens the store described by `config`, creating and saving it when
    /// nothing exists at the configured path.
    pub fn open(config: &PrefsConfig) -> Result<Self, StoreError> {
        let sink: Box<dyn PrefSink> = match config.backend {
            Backend::Json => Box::new(JsonFileSink::new(&config.path).pretty(config.pretty)),
            Backend::Sqlite => {
                if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(crate::persist::PersistError::from)?;
                }
                Box::new(SqliteSink::open(&config.path)?)
            }
        };

        let mut prefs = Self::with_sink(sink, config.initial_revision)?;
        prefs.flush_on_drop = config.flush_on_drop;
        Ok(prefs)
    }

    /// Opens a JSON store at `path`.
    pub fn open_path(
        path: impl Into<std::path::PathBuf>,
        initial_revision: Revision,
    ) -> Result<Self, StoreError> {
        Self::open(&PrefsConfig::new(path).with_initial_revision(initial_revision))
    }

    /// Loads from `sink`, or creates an empty store stamped with
    /// `initial_revision` and saves it immediately.
    pub fn with_sink(mut sink: Box<dyn PrefSink>, initial_revision: Revision) -> Result<Self, StoreError> {
        let (store, dirty) = match sink.load()? {
            Some(snapshot) => {
                let stored = snapshot.records.len();
                let store = PrefStore::from_snapshot(snapshot);
                let merged = store.len() != stored;
                (store, merged)
            }
            None => {
                let store = PrefStore::new(initial_revision);
                sink.save(&store.export_snapshot())?;
                info!(revision = initial_revision, "created preference store");
                (store, false)
            }
        };

        Ok(Self {
            store,
            sink,
            dirty,
            flush_on_drop: true,
        })
    }

    /// Read-only view of the underlying store.
    pub fn store(&self) -> &PrefStore {
        &self.store
    }

    /// Records in display order.
    pub fn records(&self) -> &[Record] {
        self.store.records()
    }

    /// Revision stamped at creation.
    pub fn revision(&self) -> Revision {
        self.store.revision()
    }

    /// True when in-memory state has changes the sink has not seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// See [`PrefStore::generation`].
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    /// Record stored under `key`.
    pub fn get_record(&self, key: &str) -> Option<&Record> {
        self.store.get_record(key)
    }

    /// True when a record exists for `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.store.has_key(key)
    }

    /// Typed read with default fallback; see [`PrefStore::get`].
    pub fn get<T: PrefType>(&self, key: &str, default: T) -> T {
        self.store.get(key, default)
    }

    /// Checked typed read; see [`PrefStore::try_get`].
    pub fn try_get<T: PrefType>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store.try_get(key)
    }

    /// Reads a boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default)
    }

    /// Reads an integer.
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key, default)
    }

    /// Reads a float.
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get(key, default)
    }

    /// Reads a string.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match assert_type(self.store.try_get::<String>(key)) {
            Ok(Some(value)) => value,
            _ => default.to_owned(),
        }
    }

    /// Reads a set's elements in stored order.
    pub fn get_set(&self, key: &str, default: Vec<String>) -> Vec<String> {
        self.get(key, default)
    }

    /// True when the set at `key` contains `value`.
    pub fn set_contains(&self, key: &str, value: &str) -> bool {
        self.store.set_contains(key, value)
    }

    /// Typed write.
    pub fn set<T: PrefType>(&mut self, key: &str, value: T) -> Result<(), StoreError> {
        self.apply(|store| store.set(key, &value).map(drop))
    }

    /// Writes a boolean.
    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set(key, value)
    }

    /// Writes an integer.
    pub fn set_int(&mut self, key: &str, value: i32) -> Result<(), StoreError> {
        self.set(key, value)
    }

    /// Writes a float.
    pub fn set_float(&mut self, key: &str, value: f32) -> Result<(), StoreError> {
        self.set(key, value)
    }

    /// Writes a string.
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set(key, value.to_owned())
    }

    /// Replaces the whole set at `key`.
    pub fn set_set<S: AsRef<str>>(&mut self, key: &str, elements: &[S]) -> Result<(), StoreError> {
        let elements: Vec<String> = elements.iter().map(|e| e.as_ref().to_owned()).collect();
        self.set(key, elements)
    }

    /// Writes a decoded value.
    pub fn set_value(&mut self, key: &str, value: &PrefValue) -> Result<(), StoreError> {
        self.apply(|store| store.set_value(key, value).map(drop))
    }

    /// Writes already-encoded parts; see [`PrefStore::set_record`].
    pub fn set_record(
        &mut self,
        key: &str,
        value_type: ValueType,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let value = value.into();
        self.apply(|store| store.set_record(key, value_type, value).map(drop))
    }

    /// Removes the record for `key`, if any.
    pub fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.apply(|store| {
            store.delete_key(key);
            Ok(())
        })
    }

    /// Adds `value` to the set at `key`, creating the set if needed.
    pub fn add_to_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(|store| store.add_to_set(key, value).map(drop))
    }

    /// Removes `value` from the set at `key`.
    pub fn remove_from_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(|store| store.remove_from_set(key, value).map(drop))
    }

    /// Sorts records by key and every set's elements.
    pub fn sort_all(&mut self) -> Result<(), StoreError> {
        self.apply(|store| {
            store.sort_all();
            Ok(())
        })
    }

    /// Runs `f` against the store and saves once if anything changed.
    ///
    /// Changes applied before `f` returns an error stay in memory and are
    /// marked dirty but are not saved.
    pub fn batch<F, R>(&mut self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut PrefStore) -> Result<R, StoreError>,
    {
        self.apply(f)
    }

    /// Starts a manual editing session. Edits are saved by
    /// [`Editor::save`], or when the session is dropped.
    pub fn editor(&mut self) -> Editor<'_> {
        Editor::new(self)
    }

    /// Writes the current state to the sink.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.sink.save(&self.store.export_snapshot())?;
        self.dirty = false;
        Ok(())
    }

    /// Saves pending changes and releases the store.
    pub fn close(mut self) -> Result<(), StoreError> {
        if self.dirty {
            self.save()?;
        }
        Ok(())
    }

    /// Saves pending edits unless drop flushing is disabled; failures are
    /// logged since there is no caller to report them to.
    pub(crate) fn flush_pending(&mut self) {
        if !(self.dirty && self.flush_on_drop) {
            return;
        }
        if let Err(err) = self.save() {
            warn!(error = %err, "failed to save preferences on drop");
        }
    }

    /// Applies `f` without saving, marking the store dirty if it changed.
    pub(crate) fn edit<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut PrefStore) -> R,
    {
        let before = self.store.generation();
        let out = f(&mut self.store);
        if self.store.generation() != before {
            self.dirty = true;
        }
        out
    }

    pub(crate) fn stage<F, R>(&mut self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut PrefStore) -> Result<R, StoreError>,
    {
        assert_type(self.edit(f))
    }

    fn apply<F, R>(&mut self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut PrefStore) -> Result<R, StoreError>,
    {
        let before = self.store.generation();
        let out = self.stage(f)?;
        if self.store.generation() != before {
            self.save()?;
        }
        Ok(out)
    }
}

impl Drop for Prefs {
    fn drop(&mut self) {
        self.flush_pending();
    }
}
