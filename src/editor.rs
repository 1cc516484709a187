//! Manual maintenance operations behind a property-grid style editor.
//!
//! An [`Editor`] stages changes in memory and saves them once, on
//! [`Editor::save`] or when the session is dropped.

use crate::{
    core::store::StoreError,
    prefs::Prefs,
    record::Record,
    types::ValueType,
};

/// Key prefix for records added through [`Editor::add_record`].
pub const NEW_RECORD_KEY: &str = "NewRecord";

/// Editing session over a [`Prefs`] instance.
pub struct Editor<'a> {
    prefs: &'a mut Prefs,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(prefs: &'a mut Prefs) -> Self {
        Self { prefs }
    }

    /// Records in display order.
    pub fn records(&self) -> &[Record] {
        self.prefs.records()
    }

    /// True when edits are waiting for [`Editor::save`].
    pub fn is_dirty(&self) -> bool {
        self.prefs.is_dirty()
    }

    /// Appends a blank boolean record under a fresh `NewRecord`, `NewRecord+`,
    /// ... key and returns that key.
    pub fn add_record(&mut self) -> String {
        self.prefs.edit(|store| store.push_blank(NEW_RECORD_KEY))
    }

    /// Moves the record at `index` one position up. No-op at the top.
    pub fn move_up(&mut self, index: usize) -> bool {
        self.prefs.edit(|store| store.move_up(index))
    }

    /// Moves the record at `index` one position down. No-op at the bottom.
    pub fn move_down(&mut self, index: usize) -> bool {
        self.prefs.edit(|store| store.move_down(index))
    }

    /// Deletes and returns the record at `index`.
    pub fn delete(&mut self, index: usize) -> Result<Record, StoreError> {
        self.prefs.stage(|store| store.remove_at(index))
    }

    /// Renames the record at `index`; fails if the key is taken or empty.
    pub fn rename(&mut self, index: usize, key: &str) -> Result<(), StoreError> {
        self.prefs.stage(|store| store.rename(index, key).map(drop))
    }

    /// Changes the type of the record at `index`.
    pub fn set_type(&mut self, index: usize, value_type: ValueType) -> Result<(), StoreError> {
        self.prefs.stage(|store| store.retype(index, value_type).map(drop))
    }

    /// Replaces the raw text of the record at `index`.
    pub fn set_raw(&mut self, index: usize, raw: &str) -> Result<(), StoreError> {
        self.prefs.stage(|store| store.set_raw(index, raw).map(drop))
    }

    /// Sorts records by key, then each set's elements.
    pub fn sort_all(&mut self) {
        self.prefs.edit(|store| store.sort_all());
    }

    /// Saves every staged edit.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.prefs.save()
    }
}

impl Drop for Editor<'_> {
    fn drop(&mut self) {
        self.prefs.flush_pending();
    }
}
