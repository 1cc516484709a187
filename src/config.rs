//! Open-time configuration.

use std::path::PathBuf;

use crate::types::Revision;

/// Default store location, relative to the working directory.
pub const DEFAULT_PATH: &str = "prefs.json";

/// Revision stamped when the host does not supply one.
pub const UNKNOWN_REVISION: Revision = -1;

/// Storage backend used for the durable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One JSON document, readable and editable by hand.
    #[default]
    Json,
    /// One SQLite database holding the latest JSON snapshot.
    Sqlite,
}

/// Settings for [`crate::prefs::Prefs::open`].
#[derive(Debug, Clone)]
pub struct PrefsConfig {
    /// Location of the durable file.
    pub path: PathBuf,
    /// Revision stamped when the file does not exist yet.
    pub initial_revision: Revision,
    /// File format.
    pub backend: Backend,
    /// Indent JSON output. Ignored by the SQLite backend.
    pub pretty: bool,
    /// Save pending edits when the store is dropped.
    pub flush_on_drop: bool,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            initial_revision: UNKNOWN_REVISION,
            backend: Backend::Json,
            pretty: true,
            flush_on_drop: true,
        }
    }
}

impl PrefsConfig {
    /// Config for `path` with every other setting at its default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the revision stamped on first creation.
    pub fn with_initial_revision(mut self, revision: Revision) -> Self {
        self.initial_revision = revision;
        self
    }

    /// Selects the storage backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Toggles JSON indentation.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Toggles saving pending edits on drop.
    pub fn with_flush_on_drop(mut self, enabled: bool) -> Self {
        self.flush_on_drop = enabled;
        self
    }
}
