//! Durable storage for store snapshots.

/// Single JSON file sink.
pub mod json;
/// SQLite snapshot sink.
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::store::StoreSnapshotV1;

/// Version number written into every persisted snapshot envelope.
pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// Errors raised while reading or writing durable storage.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed or unserializable JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Snapshot written by an incompatible version.
    #[error("unsupported snapshot format version {0}")]
    UnsupportedFormat(u16),
}

/// Result alias for persistence calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Versioned on-disk wrapper around a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped snapshot.
    pub snapshot: StoreSnapshotV1,
}

impl SnapshotEnvelope {
    /// Wraps `snapshot` with [`SNAPSHOT_FORMAT_VERSION`].
    pub fn new(snapshot: StoreSnapshotV1) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
        }
    }

    /// Unwraps the snapshot, rejecting unknown format versions.
    pub fn into_snapshot(self) -> PersistResult<StoreSnapshotV1> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistError::UnsupportedFormat(self.format_version));
        }
        Ok(self.snapshot)
    }
}

/// Backing storage for a [`crate::prefs::Prefs`] instance.
///
/// `save` must be durable when it returns; callers never buffer.
pub trait PrefSink: Send {
    /// Loads the stored snapshot, or `None` if nothing has been written yet.
    fn load(&mut self) -> PersistResult<Option<StoreSnapshotV1>>;
    /// Replaces the stored snapshot.
    fn save(&mut self, snapshot: &StoreSnapshotV1) -> PersistResult<()>;
}
