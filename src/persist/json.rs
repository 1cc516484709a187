//! Human-readable JSON file sink.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::core::store::StoreSnapshotV1;

use super::{PersistResult, PrefSink, SnapshotEnvelope};

/// Stores the snapshot as one JSON document at a fixed path.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the
/// target, so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileSink {
    /// Creates a sink for `path`. Nothing is touched until the first load/save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
        }
    }

    /// Toggles indented output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Target file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl PrefSink for JsonFileSink {
    fn load(&mut self) -> PersistResult<Option<StoreSnapshotV1>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let env: SnapshotEnvelope = serde_json::from_slice(&bytes)?;
        let snapshot = env.into_snapshot()?;
        debug!(path = %self.path.display(), records = snapshot.records.len(), "loaded preferences");
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &StoreSnapshotV1) -> PersistResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let env = SnapshotEnvelope::new(snapshot.clone());
        let mut payload = if self.pretty {
            serde_json::to_vec_pretty(&env)?
        } else {
            serde_json::to_vec(&env)?
        };
        payload.push(b'\n');

        let tmp = self.tmp_path();
        let mut file = File::create(&tmp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), records = snapshot.records.len(), "saved preferences");
        Ok(())
    }
}
