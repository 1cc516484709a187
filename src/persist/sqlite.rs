//! SQLite-backed snapshot sink.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::core::store::StoreSnapshotV1;

use super::{PersistResult, PrefSink, SnapshotEnvelope};

/// SQLite implementation of [`crate::persist::PrefSink`].
///
/// Each save appends a JSON snapshot row and prunes older rows in the same
/// transaction, so the file always holds exactly one current snapshot.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(Self { conn })
    }

    /// Number of snapshot rows currently stored.
    pub fn snapshot_count(&self) -> PersistResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl PrefSink for SqliteSink {
    fn load(&mut self) -> PersistResult<Option<StoreSnapshotV1>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let env: SnapshotEnvelope = serde_json::from_slice(&payload)?;
        Ok(Some(env.into_snapshot()?))
    }

    fn save(&mut self, snapshot: &StoreSnapshotV1) -> PersistResult<()> {
        let payload = serde_json::to_vec(&SnapshotEnvelope::new(snapshot.clone()))?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots(ts_ms, payload) VALUES (?1, ?2)",
            params![now_ms() as i64, payload],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute("DELETE FROM snapshots WHERE id < ?1", params![id])?;
        tx.commit()?;

        debug!(snapshot_id = id, records = snapshot.records.len(), "saved preferences snapshot");
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
